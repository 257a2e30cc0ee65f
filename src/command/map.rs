use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Args;
use log::debug;
use log::info;
use log::warn;
use walkdir::WalkDir;

use crate::command::collapse::Collapse;
use crate::command::constants::*;
use crate::command::count::CountMirna;
use crate::command::parse::ParseBowtie;
use crate::command::parse::ParseStats;
use crate::command::summary::MappingSummary;
use crate::command::threadcount::determine_worker_count;
use crate::command::unmapped::ExtractUnmapped;
use crate::fileformat::sample_name;
use crate::runtime::Error;
use crate::utils;

#[derive(Args)]
pub struct MapCMD {
    #[arg(short = 'r', value_parser)]
    /// miRNA sequences (FASTA)
    pub path_mirna: PathBuf,

    #[arg(short = 'i', value_parser, num_args = 1..)]
    /// FASTQ files. If not given, all FASTQ files in the input directory are used
    pub path_in: Vec<PathBuf>,

    #[arg(short = 'd', value_parser, default_value = DEFAULT_PATH_INPUT_DIR)]
    /// Directory to look for FASTQ files in
    pub path_dir: PathBuf,

    #[arg(short = 'o', value_parser, default_value = DEFAULT_PATH_OUTPUT_DIR)]
    /// Output directory
    pub path_out: PathBuf,

    #[arg(short = 'p', value_parser = clap::value_parser!(usize))]
    /// Number of samples processed at once [default: 4]
    pub num_workers: Option<usize>,

    #[arg(short = 'q', value_parser = clap::value_parser!(u8).range(0..=MAX_QUALITY as i64), default_value_t = DEFAULT_MIN_QUALITY)]
    /// Minimum Phred quality of every mismatched base for a read to be counted
    pub min_quality: u8,

    #[arg(long = "un")]
    /// Also save the reads that did not map, as FASTQ
    pub save_unmapped: bool,

    #[arg(short = 'l', value_parser, default_value_t = DEFAULT_SEED_LENGTH)]
    /// bowtie seed length
    pub seed_length: u32,

    #[arg(short = 'n', value_parser = clap::value_parser!(u32).range(0..=3), default_value_t = DEFAULT_SEED_MISMATCHES)]
    /// bowtie mismatches allowed in the seed
    pub seed_mismatches: u32,
}

impl MapCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let path_fastq = if self.path_in.is_empty() {
            list_fastq_files(&self.path_dir)?
        } else {
            select_fastq_inputs(&self.path_in)
        };
        if path_fastq.is_empty() {
            bail!("No FASTQ files (suffix .fq or .fastq, optionally .gz) to map");
        }

        let num_workers = determine_worker_count(self.num_workers, DEFAULT_WORKERS, path_fastq.len())?;

        let outcome = MapMirna::run(MapMirna {
            path_mirna: self.path_mirna.clone(),
            path_fastq,
            path_out: utils::expand_and_resolve(&self.path_out)?,
            num_workers,
            min_quality: self.min_quality,
            save_unmapped: self.save_unmapped,
            seed_length: self.seed_length,
            seed_mismatches: self.seed_mismatches,
        })?;

        info!("Count table: {}", outcome.path_counts.display());
        info!("Mapping summary: {}", outcome.path_summary.display());
        info!("Map has finished successfully");
        Ok(())
    }
}

///////////////////////////////
/// Files belonging to one input sample. All outputs share the prefix "<output dir>/<sample>"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFiles {
    pub name: String,
    pub path_fastq: PathBuf,
    pub prefix: PathBuf,
}

impl SampleFiles {
    pub fn new(path_fastq: &Path, dir_out: &Path) -> SampleFiles {
        let name = sample_name(path_fastq);
        SampleFiles {
            prefix: dir_out.join(&name),
            name,
            path_fastq: path_fastq.to_path_buf(),
        }
    }

    pub fn path_collapsed(&self) -> PathBuf {
        utils::with_suffix(&self.prefix, SUFFIX_COLLAPSED)
    }

    pub fn path_mapped(&self) -> PathBuf {
        utils::with_suffix(&self.prefix, SUFFIX_BOWTIE_MAPPED)
    }

    pub fn path_parsed(&self) -> PathBuf {
        utils::with_suffix(&self.prefix, SUFFIX_BOWTIE_PARSED)
    }

    pub fn path_unmapped(&self) -> PathBuf {
        utils::with_suffix(&self.prefix, SUFFIX_BOWTIE_UNMAPPED)
    }
}

#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub sample: SampleFiles,
    /// None if bowtie found no alignment at all
    pub parse_stats: Option<ParseStats>,
}

#[derive(Debug, Clone)]
pub struct MapOutcome {
    pub samples: Vec<SampleOutcome>,
    pub path_counts: PathBuf,
    pub path_summary: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MapMirna {
    pub path_mirna: PathBuf,
    pub path_fastq: Vec<PathBuf>,
    pub path_out: PathBuf,
    pub num_workers: usize,
    pub min_quality: u8,
    pub save_unmapped: bool,
    pub seed_length: u32,
    pub seed_mismatches: u32,
}

impl MapMirna {
    pub fn run(params: MapMirna) -> Result<MapOutcome> {
        utils::check_bowtie()?;
        if !params.path_mirna.exists() {
            return Err(Error::file_not_found(&params.path_mirna).into());
        }
        fs::create_dir_all(&params.path_out)
            .with_context(|| format!("Failed to create output directory {}", params.path_out.display()))?;

        let samples = Self::prepare_samples(&params.path_fastq, &params.path_out)?;
        info!("Mapping {} samples using {} workers", samples.len(), params.num_workers);

        let params = Arc::new(params);
        let thread_pool = threadpool::ThreadPool::new(params.num_workers);
        let (tx, rx) = crossbeam::channel::unbounded::<(usize, Result<SampleOutcome>)>();

        for (index, sample) in samples.iter().cloned().enumerate() {
            let tx = tx.clone();
            let params = Arc::clone(&params);
            thread_pool.execute(move || {
                let result = map_sample(&params, &sample);
                _ = tx.send((index, result));
            });
        }
        drop(tx);
        thread_pool.join();

        //Report failures, in input order
        let mut results: Vec<(usize, Result<SampleOutcome>)> = rx.iter().collect();
        if results.len() != samples.len() {
            bail!("A mapping worker stopped without reporting back");
        }
        results.sort_by_key(|(index, _)| *index);
        let mut outcomes = Vec::with_capacity(results.len());
        for (index, result) in results {
            let outcome = result.with_context(|| format!("Mapping of sample {} failed", samples[index].name))?;
            outcomes.push(outcome);
        }

        //Count all samples with at least one alignment
        let path_parsed: Vec<PathBuf> = outcomes
            .iter()
            .filter(|o| o.parse_stats.is_some())
            .map(|o| o.sample.path_parsed())
            .collect();
        if path_parsed.is_empty() {
            warn!("No sample had any miRNA alignment");
        }
        let path_counts = params.path_out.join(count_table_name(params.min_quality));
        let table = CountMirna::run(&CountMirna {
            path_in: path_parsed,
            path_out: path_counts.clone(),
            min_quality: params.min_quality,
        })?;

        let path_summary = params.path_out.join(summary_table_name(params.min_quality));
        MappingSummary::run(
            &MappingSummary {
                path_fastq: samples.iter().map(|s| s.path_fastq.clone()).collect(),
                path_out: path_summary.clone(),
            },
            &table,
        )?;

        Ok(MapOutcome {
            samples: outcomes,
            path_counts,
            path_summary,
        })
    }

    /// Two inputs with the same sample name would overwrite each other's outputs
    pub fn prepare_samples(path_fastq: &[PathBuf], dir_out: &Path) -> Result<Vec<SampleFiles>> {
        let mut samples: Vec<SampleFiles> = Vec::with_capacity(path_fastq.len());
        for p in path_fastq {
            let sample = SampleFiles::new(p, dir_out);
            if samples.iter().any(|s| s.name == sample.name) {
                return Err(Error::duplicate_input("Sample", sample.name).into());
            }
            samples.push(sample);
        }
        Ok(samples)
    }

    pub fn bowtie_build_command(sample: &SampleFiles) -> Command {
        let mut cmd = Command::new("bowtie-build");
        cmd.arg("-q").arg(sample.path_collapsed()).arg(&sample.prefix);
        cmd
    }

    /// The collapsed reads are the index; the miRNAs are aligned to them as FASTA reads
    pub fn bowtie_command(params: &MapMirna, sample: &SampleFiles) -> Command {
        let mut cmd = Command::new("bowtie");
        cmd.arg(&sample.prefix)
            .arg("--norc")
            .arg("-l")
            .arg(params.seed_length.to_string())
            .arg("-n")
            .arg(params.seed_mismatches.to_string())
            .arg("-a")
            .arg("-f")
            .arg(&params.path_mirna);
        cmd
    }
}

///////////////////////////////
/// Collapse, index, align and parse one sample
fn map_sample(params: &MapMirna, sample: &SampleFiles) -> Result<SampleOutcome> {
    info!("Collapsing {}", sample.path_fastq.display());
    let collapse_stats = Collapse::run(&Collapse {
        path_in: sample.path_fastq.clone(),
        path_out: sample.path_collapsed(),
    })?;
    debug!("{}: {} reads, {} unique", sample.name, collapse_stats.num_reads, collapse_stats.num_unique);

    //bowtie-build warns about reference sequences with only gaps; the warnings are dropped
    let mut build = MapMirna::bowtie_build_command(sample);
    build.stdout(Stdio::null()).stderr(Stdio::piped());
    utils::run_checked("bowtie-build", &mut build)?;

    let path_mapped = sample.path_mapped();
    let file_mapped = File::create(&path_mapped)?;
    let mut bowtie = MapMirna::bowtie_command(params, sample);
    bowtie.stdout(Stdio::from(file_mapped)).stderr(Stdio::piped());
    utils::run_checked("bowtie", &mut bowtie)?;

    if fs::metadata(&path_mapped)?.len() == 0 {
        info!("{}: no miRNA aligned", sample.name);
        return Ok(SampleOutcome {
            sample: sample.clone(),
            parse_stats: None,
        });
    }

    let parse_stats = ParseBowtie::run(&ParseBowtie {
        path_bowtie: path_mapped.clone(),
        path_fastq: sample.path_fastq.clone(),
        path_out: sample.path_parsed(),
    })?;
    info!(
        "{}: {} uniquely mapped sequences, {} multi-mapped",
        sample.name, parse_stats.num_unique, parse_stats.num_multimapped
    );

    if params.save_unmapped {
        let stats = ExtractUnmapped::run(&ExtractUnmapped {
            path_fastq: sample.path_fastq.clone(),
            path_bowtie: path_mapped,
            path_out: sample.path_unmapped(),
        })?;
        debug!("{}: {} unmapped reads saved", sample.name, stats.num_unmapped);
    }

    Ok(SampleOutcome {
        sample: sample.clone(),
        parse_stats: Some(parse_stats),
    })
}

pub fn has_fastq_suffix(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    FASTQ_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Inputs given on the command line that look like FASTQ. Others are left out with a warning
pub fn select_fastq_inputs(path_in: &[PathBuf]) -> Vec<PathBuf> {
    path_in
        .iter()
        .filter(|p| {
            let keep = has_fastq_suffix(p);
            if !keep {
                warn!("Skipping {}: not a .fq/.fastq file (optionally .gz)", p.display());
            }
            keep
        })
        .cloned()
        .collect()
}

///////////////////////////////
/// FASTQ files directly in a directory, in name order
pub fn list_fastq_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::file_not_found(dir).into());
    }
    let files = WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_fastq_suffix(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::command_to_string;

    fn params() -> MapMirna {
        MapMirna {
            path_mirna: PathBuf::from("mature.fa"),
            path_fastq: vec![],
            path_out: PathBuf::from("out"),
            num_workers: 1,
            min_quality: 38,
            save_unmapped: false,
            seed_length: DEFAULT_SEED_LENGTH,
            seed_mismatches: DEFAULT_SEED_MISMATCHES,
        }
    }

    #[test]
    fn sample_file_names() {
        let s = SampleFiles::new(Path::new("/data/liver_1.fastq.gz"), Path::new("out"));
        assert_eq!(s.name, "liver_1");
        assert_eq!(s.path_collapsed(), PathBuf::from("out/liver_1.col.fa"));
        assert_eq!(s.path_mapped(), PathBuf::from("out/liver_1.bowtie_mapped.txt"));
        assert_eq!(s.path_parsed(), PathBuf::from("out/liver_1.bowtie_mapped.parsed.txt"));
        assert_eq!(s.path_unmapped(), PathBuf::from("out/liver_1.bowtie_unmapped.fastq"));
    }

    #[test]
    fn bowtie_command_lines() {
        let s = SampleFiles::new(Path::new("liver_1.fq"), Path::new("out"));
        assert_eq!(
            command_to_string(&MapMirna::bowtie_build_command(&s)),
            "bowtie-build -q out/liver_1.col.fa out/liver_1"
        );
        assert_eq!(
            command_to_string(&MapMirna::bowtie_command(&params(), &s)),
            "bowtie out/liver_1 --norc -l 7 -n 2 -a -f mature.fa"
        );
    }

    #[test]
    fn duplicate_sample_names_are_rejected() {
        let inputs = vec![PathBuf::from("a/s1.fastq"), PathBuf::from("b/s1.fq.gz")];
        assert!(MapMirna::prepare_samples(&inputs, Path::new("out")).is_err());
    }

    #[test]
    fn non_fastq_inputs_are_skipped() {
        let inputs = vec![
            PathBuf::from("in/s1.fastq"),
            PathBuf::from("in/s1.col.fa"),
            PathBuf::from("in/s2.fq.gz"),
            PathBuf::from("in/notes.txt"),
        ];
        assert_eq!(
            select_fastq_inputs(&inputs),
            vec![PathBuf::from("in/s1.fastq"), PathBuf::from("in/s2.fq.gz")]
        );
    }

    #[test]
    fn fastq_listing() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.fastq", "a.fq.gz", "c.txt", "d.fasta"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let files = list_fastq_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.fq.gz", "b.fastq"]);
    }
}
