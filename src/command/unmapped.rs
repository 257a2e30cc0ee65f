use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use seq_io::fastq::OwnedRecord;
use seq_io::fastq::Record as FastqRecord;

use crate::fileformat::fastq::write_fastq_record;
use crate::fileformat::open_fastq;
use crate::fileformat::read_bowtie_hits;
use crate::runtime::Error;

#[derive(Args)]
pub struct UnmappedCMD {
    #[arg(long = "fq", value_parser)]
    /// FASTQ file used for the bowtie mapping
    pub path_fastq: PathBuf,

    #[arg(long = "mapped", value_parser)]
    /// Default output file from bowtie
    pub path_bowtie: PathBuf,

    #[arg(short = 'o', value_parser)]
    /// FASTQ file to store unmapped reads in
    pub path_out: PathBuf,
}

impl UnmappedCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let stats = ExtractUnmapped::run(&ExtractUnmapped {
            path_fastq: self.path_fastq.clone(),
            path_bowtie: self.path_bowtie.clone(),
            path_out: self.path_out.clone(),
        })?;
        log::info!(
            "Wrote {} unmapped reads ({} reads belonged to mapped sequences)",
            stats.num_unmapped,
            stats.num_mapped
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnmappedStats {
    pub num_mapped: u64,
    pub num_unmapped: u64,
}

///////////////////////////////
/// Write the FASTQ reads whose sequence bowtie did not align anything to
pub struct ExtractUnmapped {
    pub path_fastq: PathBuf,
    pub path_bowtie: PathBuf,
    pub path_out: PathBuf,
}

impl ExtractUnmapped {
    pub fn run(params: &ExtractUnmapped) -> Result<UnmappedStats> {
        //Any alignment on any strand counts as mapped
        let mapped: FxHashSet<Vec<u8>> = read_bowtie_hits(&params.path_bowtie)?
            .into_iter()
            .map(|h| h.read_seq.into_bytes())
            .collect();

        //Group records by sequence, keeping the order in which sequences first appear
        let mut reader = open_fastq(&params.path_fastq)?;
        let mut groups: Vec<Vec<OwnedRecord>> = Vec::new();
        let mut group_of_seq: FxHashMap<Vec<u8>, usize> = FxHashMap::default();
        let mut stats = UnmappedStats::default();
        while let Some(record) = reader.next() {
            let record = record
                .map_err(|e| Error::file_not_valid(&params.path_fastq, Some(e.to_string())))?;
            if mapped.contains(record.seq()) {
                stats.num_mapped += 1;
                continue;
            }
            let index = *group_of_seq.entry(record.seq().to_vec()).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[index].push(record.to_owned_record());
        }

        let file = File::create(&params.path_out)?;
        let mut writer = BufWriter::new(file);
        for record in groups.iter().flatten() {
            write_fastq_record(&mut writer, &record.head, &record.seq, &record.qual)?;
            stats.num_unmapped += 1;
        }
        writer.flush()?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_sequences_are_removed_and_groups_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path_fastq = dir.path().join("s1.fastq");
        std::fs::write(
            &path_fastq,
            "@r1\nAAAA\n+\nIIII\n@r2\nCCCC\n+\nIIII\n@r3\nGGGG\n+\nIIII\n@r4\nAAAA\n+\nHHHH\n@r5\nCCCC\n+\nIIII\n",
        )
        .unwrap();

        let path_bowtie = dir.path().join("s1.bowtie_mapped.txt");
        std::fs::write(&path_bowtie, "mir-1\t+\tCCCC#2\t0\tCCC\tIII\t0\t\n").unwrap();

        let path_out = dir.path().join("s1.bowtie_unmapped.fastq");
        let stats = ExtractUnmapped::run(&ExtractUnmapped {
            path_fastq,
            path_bowtie,
            path_out: path_out.clone(),
        })
        .unwrap();

        assert_eq!(stats, UnmappedStats { num_mapped: 2, num_unmapped: 3 });
        assert_eq!(
            std::fs::read_to_string(&path_out).unwrap(),
            "@r1\nAAAA\n+\nIIII\n@r4\nAAAA\n+\nHHHH\n@r3\nGGGG\n+\nIIII\n"
        );
    }
}
