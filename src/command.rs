use clap::Subcommand;

// Module declarations (alphabetical)
pub mod collapse;
pub mod constants;
pub mod count;
pub mod map;
pub mod mismatch;
pub mod parse;
pub mod summary;
pub mod threadcount;
pub mod unmapped;
pub mod viewer;

pub use collapse::{Collapse, CollapseCMD};
pub use count::{CountCMD, CountMirna};
pub use map::{MapCMD, MapMirna};
pub use mismatch::{MismatchCMD, MismatchDistribution};
pub use parse::{ParseBowtie, ParseCMD};
pub use summary::{MappingSummary, SummaryCMD};
pub use threadcount::determine_worker_count;
pub use unmapped::{ExtractUnmapped, UnmappedCMD};
pub use viewer::{Viewer, ViewerCMD};

///////////////////////////////
/// Possible subcommands to parse
#[derive(Subcommand)]
pub enum Commands {
    /// Collapse identical reads of a FASTQ into a counted FASTA
    Collapse(CollapseCMD),
    /// Resolve bowtie hits into one alignment row per read
    Parse(ParseCMD),
    /// Write the reads of a FASTQ that did not map
    Unmapped(UnmappedCMD),
    /// Merge parsed alignments of several samples into a count table
    Count(CountCMD),
    /// Mapping rate per sample
    Summary(SummaryCMD),
    /// Full pipeline: collapse, bowtie, parse, count and summarize all samples
    Map(MapCMD),
    /// Per-position mismatch distribution of one miRNA
    Mismatch(MismatchCMD),
    /// Static HTML page listing figures
    Viewer(ViewerCMD),
}

impl std::fmt::Display for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Commands::Collapse(_) => "collapse",
            Commands::Parse(_) => "parse",
            Commands::Unmapped(_) => "unmapped",
            Commands::Count(_) => "count",
            Commands::Summary(_) => "summary",
            Commands::Map(_) => "map",
            Commands::Mismatch(_) => "mismatch",
            Commands::Viewer(_) => "viewer",
        };
        write!(f, "{}", name)
    }
}
