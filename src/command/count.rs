use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Result;
use clap::Args;
use log::info;
use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use walkdir::WalkDir;

use crate::command::constants::{DEFAULT_MIN_QUALITY, MAX_QUALITY, PARSED_MARKER};
use crate::fileformat::parsed::parsed_reader;
use crate::fileformat::sample_name;
use crate::fileformat::CountKey;
use crate::fileformat::CountTable;
use crate::fileformat::MismatchCall;
use crate::runtime::Error;

#[derive(Args)]
pub struct CountCMD {
    #[arg(short = 'i', value_parser, num_args = 1.., conflicts_with = "path_dir")]
    /// Parsed bowtie result files
    pub path_in: Vec<PathBuf>,

    #[arg(short = 'd', value_parser)]
    /// Directory with parsed bowtie result files (names containing ".parsed.txt")
    pub path_dir: Option<PathBuf>,

    #[arg(short = 'o', value_parser)]
    /// Count table to write
    pub path_out: PathBuf,

    #[arg(short = 'q', value_parser = clap::value_parser!(u8).range(0..=MAX_QUALITY as i64), default_value_t = DEFAULT_MIN_QUALITY)]
    /// Minimum Phred quality of every mismatched base
    pub min_quality: u8,
}

impl CountCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let path_in = match &self.path_dir {
            Some(dir) => list_parsed_files(dir)?,
            None => self.path_in.clone(),
        };
        if path_in.is_empty() {
            bail!("No parsed bowtie files given. Use -i or -d");
        }

        let table = CountMirna::run(&CountMirna {
            path_in,
            path_out: self.path_out.clone(),
            min_quality: self.min_quality,
        })?;

        info!(
            "Counted {} miRNA/mismatch combinations over {} samples",
            table.rows.len(),
            table.samples.len()
        );
        Ok(())
    }
}

///////////////////////////////
/// Merge parsed alignment tables of several samples into one count table
pub struct CountMirna {
    pub path_in: Vec<PathBuf>,
    pub path_out: PathBuf,
    pub min_quality: u8,
}

impl CountMirna {
    pub fn run(params: &CountMirna) -> Result<CountTable> {
        let table = Self::build_table(&params.path_in, params.min_quality)?;
        table.write_tsv(&params.path_out)?;
        Ok(table)
    }

    pub fn build_table(path_in: &[PathBuf], min_quality: u8) -> Result<CountTable> {
        //Reject duplicate files, and different files that would end up in the same column
        let mut seen_paths = FxHashSet::default();
        let mut samples = Vec::with_capacity(path_in.len());
        for p in path_in {
            if !seen_paths.insert(p.clone()) {
                return Err(Error::duplicate_input("Input file", p.display().to_string()).into());
            }
            let name = sample_name(p);
            if samples.contains(&name) {
                return Err(Error::duplicate_input("Sample", name).into());
            }
            samples.push(name);
        }

        let mut table = CountTable::new(samples);
        for (sample_index, p) in path_in.iter().enumerate() {
            let counts = count_parsed_file(p, min_quality)?;
            info!("{}: {} rows passed Q>={}", p.display(), counts.values().sum::<u64>(), min_quality);
            for (key, count) in counts {
                table.add(sample_index, key, count);
            }
        }
        Ok(table)
    }
}

///////////////////////////////
/// Number of reads per (miRNA, mismatches) whose mismatched bases all pass the quality filter
pub fn count_parsed_file<P: AsRef<Path>>(path: P, min_quality: u8) -> Result<FxHashMap<CountKey, u64>> {
    let path = path.as_ref();
    let mut reader = parsed_reader(path)?;

    let mut counts: FxHashMap<CountKey, u64> = FxHashMap::default();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let (mirna, call) = match (record.get(0), record.get(1)) {
            (Some(m), Some(c)) => (m, c),
            _ => {
                return Err(Error::file_not_valid(
                    path,
                    Some(format!("row {} has fewer than 2 columns", line + 1)),
                )
                .into())
            }
        };
        let call: MismatchCall = call
            .parse()
            .map_err(|e: Error| Error::file_not_valid(path, Some(e.to_string())))?;

        if call.passes_quality(min_quality) {
            *counts
                .entry((mirna.to_string(), call.without_quality()))
                .or_insert(0) += 1;
        }
    }
    Ok(counts)
}

///////////////////////////////
/// Parsed tables in a directory, in name order
pub fn list_parsed_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::file_not_found(dir).into());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_string_lossy().contains(PARSED_MARKER))
        .map(|entry| entry.into_path())
        .collect();
    files.dedup();
    Ok(files)
}
