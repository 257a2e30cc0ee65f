use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rustc_hash::FxHashMap;
use seq_io::fastq::Record as FastqRecord;

use crate::fileformat::fasta::write_collapsed_record;
use crate::fileformat::open_fastq;
use crate::runtime::Error;

#[derive(Args)]
pub struct CollapseCMD {
    #[arg(short = 'i', value_parser)]
    /// FASTQ file, optionally compressed
    pub path_in: PathBuf,

    #[arg(short = 'o', value_parser)]
    /// Collapsed FASTA to write. Standard output if not given
    pub path_out: Option<PathBuf>,
}

impl CollapseCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let stats = match &self.path_out {
            Some(path_out) => Collapse::run(&Collapse {
                path_in: self.path_in.clone(),
                path_out: path_out.clone(),
            })?,
            None => {
                let reads = Collapse::collapse_reads(&self.path_in)?;
                let stdout = std::io::stdout();
                let mut writer = BufWriter::new(stdout.lock());
                Collapse::write_collapsed(&mut writer, &reads)?
            }
        };

        log::info!(
            "Collapsed {} reads into {} unique sequences",
            stats.num_reads,
            stats.num_unique
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollapseStats {
    pub num_reads: u64,
    pub num_unique: u64,
}

/// Merge identical FASTQ reads into a FASTA of unique sequences named "sequence#count"
pub struct Collapse {
    pub path_in: PathBuf,
    pub path_out: PathBuf,
}

impl Collapse {
    pub fn run(params: &Collapse) -> Result<CollapseStats> {
        let reads = Self::collapse_reads(&params.path_in)?;

        let file = File::create(&params.path_out)?;
        let mut writer = BufWriter::new(file);
        Self::write_collapsed(&mut writer, &reads)
    }

    ///////////////////////////////
    /// Unique sequences with their counts, most frequent first. Equal counts are in sequence order
    pub fn collapse_reads(path_in: &PathBuf) -> Result<Vec<(Vec<u8>, u64)>> {
        let mut reader = open_fastq(path_in)?;

        let mut counts: FxHashMap<Vec<u8>, u64> = FxHashMap::default();
        while let Some(record) = reader.next() {
            let record = record.map_err(|e| Error::file_not_valid(path_in, Some(e.to_string())))?;
            *counts.entry(record.seq().to_vec()).or_insert(0) += 1;
        }

        let mut reads: Vec<(Vec<u8>, u64)> = counts.into_iter().collect();
        reads.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(reads)
    }

    pub fn write_collapsed<W: Write>(writer: &mut W, reads: &[(Vec<u8>, u64)]) -> Result<CollapseStats> {
        let mut stats = CollapseStats::default();
        for (seq, count) in reads {
            write_collapsed_record(writer, seq, *count)?;
            stats.num_reads += count;
            stats.num_unique += 1;
        }
        writer.flush()?;
        Ok(stats)
    }
}
