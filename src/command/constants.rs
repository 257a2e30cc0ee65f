pub const DEFAULT_PATH_INPUT_DIR: &str = "./";
pub const DEFAULT_PATH_OUTPUT_DIR: &str = "./";

pub const DEFAULT_WORKERS: usize = 4;

/// Mismatched bases need at least this Phred quality to be counted
pub const DEFAULT_MIN_QUALITY: u8 = 38;
pub const MAX_QUALITY: u8 = 41;

/// bowtie -l: seed length
pub const DEFAULT_SEED_LENGTH: u32 = 7;
/// bowtie -n: mismatches allowed in the seed
pub const DEFAULT_SEED_MISMATCHES: u32 = 2;

pub const FASTQ_SUFFIXES: [&str; 4] = [".fq", ".fastq", ".fq.gz", ".fastq.gz"];
pub const PARSED_MARKER: &str = ".parsed.txt";

pub const SUFFIX_COLLAPSED: &str = ".col.fa";
pub const SUFFIX_BOWTIE_MAPPED: &str = ".bowtie_mapped.txt";
pub const SUFFIX_BOWTIE_PARSED: &str = ".bowtie_mapped.parsed.txt";
pub const SUFFIX_BOWTIE_UNMAPPED: &str = ".bowtie_unmapped.fastq";

pub const DEFAULT_VIEWER_TITLE: &str = "miRNA mismatch figures";
pub const FIGURE_EXTENSIONS: [&str; 4] = ["png", "svg", "jpg", "jpeg"];

pub fn count_table_name(min_quality: u8) -> String {
    format!("miRNA_count.Q{}.txt", min_quality)
}

pub fn summary_table_name(min_quality: u8) -> String {
    format!("Mapping_summary.Q{}.txt", min_quality)
}
