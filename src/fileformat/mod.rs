pub mod bowtie;
pub mod count_table;
pub mod fasta;
pub mod fastq;
pub mod parsed;

pub use bowtie::BowtieHit;
pub use bowtie::BowtieMismatch;
pub use bowtie::read_bowtie_hits;

pub use count_table::CountTable;
pub use count_table::CountKey;

pub use parsed::Mutation;
pub use parsed::MutationSet;
pub use parsed::MismatchCall;

pub use fastq::open_fastq;
pub use fastq::count_records;

pub use fasta::read_reference;

use std::path::Path;

///////////////////////////////
/// Sample name of an input file: the file name up to the first '.'
pub fn sample_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_names() {
        assert_eq!(sample_name("/data/liver_1.trimmed.fastq.gz"), "liver_1");
        assert_eq!(sample_name("out/liver_1.bowtie_mapped.parsed.txt"), "liver_1");
        assert_eq!(sample_name("plain"), "plain");
    }
}
