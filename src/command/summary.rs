use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::info;
use rayon::prelude::*;

use crate::fileformat::count_records;
use crate::fileformat::sample_name;
use crate::fileformat::CountTable;

pub const SUMMARY_HEADER: [&str; 8] = [
    "File name",
    "Total read",
    "PM read",
    "%",
    "1MM read",
    "%",
    "2MM read",
    "%",
];

#[derive(Args)]
pub struct SummaryCMD {
    #[arg(short = 'c', value_parser)]
    /// Count table made by the count command
    pub path_counts: PathBuf,

    #[arg(short = 'i', value_parser, num_args = 1.., required = true)]
    /// The FASTQ files of all samples, mapped or not
    pub path_fastq: Vec<PathBuf>,

    #[arg(short = 'o', value_parser)]
    /// Summary table to write
    pub path_out: PathBuf,
}

impl SummaryCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let table = CountTable::read_tsv(&self.path_counts)?;
        let rows = MappingSummary::run(&MappingSummary {
            path_fastq: self.path_fastq.clone(),
            path_out: self.path_out.clone(),
        }, &table)?;
        info!("Wrote mapping summary of {} samples to {}", rows.len(), self.path_out.display());
        Ok(())
    }
}

/// Reads of one sample mapped with 0, 1 and 2 mismatches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub sample: String,
    pub total_reads: u64,
    pub mapped: [u64; 3],
}

impl SummaryRow {
    pub fn to_record(&self) -> Vec<String> {
        let mut record = vec![self.sample.clone(), self.total_reads.to_string()];
        for mapped in self.mapped {
            record.push(mapped.to_string());
            record.push(format_percent(mapped, self.total_reads));
        }
        record
    }
}

pub fn format_percent(part: u64, total: u64) -> String {
    if total == 0 {
        return "0".to_string();
    }
    format!("{:.2}", part as f64 / total as f64 * 100.0)
}

///////////////////////////////
/// Per-sample mapping rates: total reads counted from the FASTQ, mapped reads from the count table
pub struct MappingSummary {
    pub path_fastq: Vec<PathBuf>,
    pub path_out: PathBuf,
}

impl MappingSummary {
    pub fn run(params: &MappingSummary, table: &CountTable) -> Result<Vec<SummaryRow>> {
        //Counting reads is I/O bound and independent per file
        let totals: Vec<u64> = params
            .path_fastq
            .par_iter()
            .map(count_records)
            .collect::<Result<Vec<u64>>>()?;

        let mapped = mapped_per_sample(table);
        let rows: Vec<SummaryRow> = params
            .path_fastq
            .iter()
            .zip(totals)
            .map(|(path, total_reads)| {
                let sample = sample_name(path);
                SummaryRow {
                    mapped: mapped.get(&sample).copied().unwrap_or([0; 3]),
                    sample,
                    total_reads,
                }
            })
            .collect();

        write_summary(&params.path_out, &rows)?;
        Ok(rows)
    }
}

///////////////////////////////
/// PM, 1MM and 2MM read counts per sample. Patterns with more mismatches are not reported
pub fn mapped_per_sample(table: &CountTable) -> BTreeMap<String, [u64; 3]> {
    let per_class = table.totals_per_mismatch_count();

    let mut mapped = BTreeMap::new();
    for (sample_index, sample) in table.samples.iter().enumerate() {
        let mut counts = [0; 3];
        for (num_mismatches, slot) in counts.iter_mut().enumerate() {
            if let Some(class_counts) = per_class.get(&num_mismatches) {
                *slot = class_counts[sample_index];
            }
        }
        mapped.insert(sample.clone(), counts);
    }
    mapped
}

pub fn write_summary(path_out: &PathBuf, rows: &[SummaryRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path_out)?;
    writer.write_record(SUMMARY_HEADER)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentages() {
        assert_eq!(format_percent(1, 3), "33.33");
        assert_eq!(format_percent(0, 10), "0.00");
        assert_eq!(format_percent(5, 0), "0");
    }

    #[test]
    fn classes_per_sample() {
        let mut table = CountTable::new(vec!["s1".to_string(), "s2".to_string()]);
        table.add(0, ("let-7a".to_string(), "PM".parse().unwrap()), 6);
        table.add(0, ("let-7a".to_string(), "3:GT".parse().unwrap()), 2);
        table.add(1, ("miR-1".to_string(), "3:GT,9:CA".parse().unwrap()), 1);
        table.add(1, ("miR-1".to_string(), "1:AC,3:GT,9:CA".parse().unwrap()), 4);

        let mapped = mapped_per_sample(&table);
        assert_eq!(mapped["s1"], [6, 2, 0]);
        assert_eq!(mapped["s2"], [0, 0, 1]);
    }

    #[test]
    fn summary_rows_include_unmapped_samples() {
        let dir = tempfile::tempdir().unwrap();
        let s1 = dir.path().join("s1.fastq");
        let s2 = dir.path().join("s2.fq");
        std::fs::write(&s1, "@a\nACGT\n+\nIIII\n@b\nACGT\n+\nIIII\n@c\nTTTT\n+\nIIII\n@d\nGGGG\n+\nIIII\n").unwrap();
        std::fs::write(&s2, "@a\nACGT\n+\nIIII\n").unwrap();

        let mut table = CountTable::new(vec!["s1".to_string()]);
        table.add(0, ("let-7a".to_string(), "PM".parse().unwrap()), 2);
        table.add(0, ("let-7a".to_string(), "3:GT".parse().unwrap()), 1);

        let path_out = dir.path().join("Mapping_summary.Q38.txt");
        let rows = MappingSummary::run(
            &MappingSummary { path_fastq: vec![s1, s2], path_out: path_out.clone() },
            &table,
        )
        .unwrap();
        assert_eq!(rows[1].mapped, [0, 0, 0]);

        let text = std::fs::read_to_string(&path_out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "File name\tTotal read\tPM read\t%\t1MM read\t%\t2MM read\t%");
        assert_eq!(lines[1], "s1\t4\t2\t50.00\t1\t25.00\t0\t0.00");
        assert_eq!(lines[2], "s2\t1\t0\t0.00\t0\t0.00\t0\t0.00");
    }
}
