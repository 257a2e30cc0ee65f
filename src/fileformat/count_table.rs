use std::collections::BTreeMap;
use std::path::Path;

use crate::fileformat::parsed::MutationSet;
use crate::runtime::Error;

pub const COLUMN_MIRNA: &str = "miRNA name";
pub const COLUMN_MUTATION: &str = "pos:mut";

/// Appended to a sample name for its per-miRNA total column
pub const TOTAL_SUFFIX: &str = " (PM+1MM+2MM)";

pub type CountKey = (String, MutationSet);

///////////////////////////////
/// Read counts per (miRNA, mismatch pattern) and sample.
/// Rows sort by miRNA name, number of mismatches, then position by position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountTable {
    pub samples: Vec<String>,
    pub rows: BTreeMap<CountKey, Vec<u64>>,
}

impl CountTable {
    pub fn new(samples: Vec<String>) -> CountTable {
        CountTable {
            samples,
            rows: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, sample_index: usize, key: CountKey, count: u64) {
        let num_samples = self.samples.len();
        let counts = self.rows.entry(key).or_insert_with(|| vec![0; num_samples]);
        counts[sample_index] += count;
    }

    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == sample)
    }

    /// Sum over all rows of each miRNA, per sample
    pub fn totals_per_mirna(&self) -> BTreeMap<String, Vec<u64>> {
        let mut totals: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for ((mirna, _), counts) in &self.rows {
            let t = totals
                .entry(mirna.clone())
                .or_insert_with(|| vec![0; self.samples.len()]);
            for (acc, c) in t.iter_mut().zip(counts) {
                *acc += c;
            }
        }
        totals
    }

    /// Sum over all miRNAs per number of mismatches, per sample
    pub fn totals_per_mismatch_count(&self) -> BTreeMap<usize, Vec<u64>> {
        let mut totals: BTreeMap<usize, Vec<u64>> = BTreeMap::new();
        for ((_, mutations), counts) in &self.rows {
            let t = totals
                .entry(mutations.num_mismatches())
                .or_insert_with(|| vec![0; self.samples.len()]);
            for (acc, c) in t.iter_mut().zip(counts) {
                *acc += c;
            }
        }
        totals
    }

    pub fn rows_for_mirna<'a>(
        &'a self,
        mirna: &'a str,
    ) -> impl Iterator<Item = (&'a MutationSet, &'a Vec<u64>)> + 'a {
        self.rows
            .iter()
            .filter(move |((name, _), _)| name == mirna)
            .map(|((_, mutations), counts)| (mutations, counts))
    }

    ///////////////////////////////
    /// Write as TSV: name, mutations, one count column per sample, then one total column per sample
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_path(path.as_ref())?;

        let mut header = vec![COLUMN_MIRNA.to_string(), COLUMN_MUTATION.to_string()];
        header.extend(self.samples.iter().cloned());
        header.extend(self.samples.iter().map(|s| format!("{}{}", s, TOTAL_SUFFIX)));
        writer.write_record(&header)?;

        let totals = self.totals_per_mirna();
        for ((mirna, mutations), counts) in &self.rows {
            let mut record = vec![mirna.clone(), mutations.to_string()];
            record.extend(counts.iter().map(|c| c.to_string()));
            record.extend(totals[mirna].iter().map(|c| c.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    ///////////////////////////////
    /// Read a table written by write_tsv. Total columns are recomputed, not read
    pub fn read_tsv<P: AsRef<Path>>(path: P) -> anyhow::Result<CountTable> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::file_not_found(path).into());
        }
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .from_path(path)?;

        let header = reader.headers()?.clone();
        if header.get(0) != Some(COLUMN_MIRNA) || header.get(1) != Some(COLUMN_MUTATION) {
            return Err(Error::file_not_valid(
                path,
                Some(format!(
                    "expected the first columns to be '{}' and '{}'",
                    COLUMN_MIRNA, COLUMN_MUTATION
                )),
            )
            .into());
        }

        //Sample columns are all columns that are not totals
        let sample_columns: Vec<(usize, String)> = header
            .iter()
            .enumerate()
            .skip(2)
            .filter(|(_, name)| !name.ends_with(TOTAL_SUFFIX))
            .map(|(i, name)| (i, name.to_string()))
            .collect();

        let mut table = CountTable::new(sample_columns.iter().map(|(_, s)| s.clone()).collect());
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let invalid = |msg: String| Error::file_not_valid(path, Some(format!("row {}: {}", line + 1, msg)));

            let mirna = record.get(0).ok_or_else(|| invalid("missing miRNA name".into()))?;
            let mutations: MutationSet = record
                .get(1)
                .ok_or_else(|| invalid("missing mutation column".into()))?
                .parse()
                .map_err(|e: Error| invalid(e.to_string()))?;

            for (sample_index, (column, _)) in sample_columns.iter().enumerate() {
                let value = record.get(*column).unwrap_or("0");
                let count = parse_count(value).ok_or_else(|| invalid(format!("bad count '{}'", value)))?;
                table.add(sample_index, (mirna.to_string(), mutations.clone()), count);
            }
        }
        Ok(table)
    }
}

/// Counts may have been written as floats by other tools, e.g. "3.0"
fn parse_count(value: &str) -> Option<u64> {
    if let Ok(v) = value.parse::<u64>() {
        return Some(v);
    }
    match value.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(mirna: &str, mutations: &str) -> CountKey {
        (mirna.to_string(), mutations.parse().unwrap())
    }

    fn example() -> CountTable {
        let mut table = CountTable::new(vec!["s1".to_string(), "s2".to_string()]);
        table.add(0, key("let-7a", "PM"), 5);
        table.add(1, key("let-7a", "PM"), 7);
        table.add(0, key("let-7a", "3:GT"), 2);
        table.add(1, key("let-7a", "3:GT,8:GT"), 1);
        table.add(1, key("miR-1", "PM"), 4);
        table
    }

    #[test]
    fn totals() {
        let table = example();
        let per_mirna = table.totals_per_mirna();
        assert_eq!(per_mirna["let-7a"], vec![7, 8]);
        assert_eq!(per_mirna["miR-1"], vec![0, 4]);

        let per_class = table.totals_per_mismatch_count();
        assert_eq!(per_class[&0], vec![5, 11]);
        assert_eq!(per_class[&1], vec![2, 0]);
        assert_eq!(per_class[&2], vec![0, 1]);
    }

    #[test]
    fn tsv_layout_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("miRNA_count.Q38.txt");
        let table = example();
        table.write_tsv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "miRNA name\tpos:mut\ts1\ts2\ts1 (PM+1MM+2MM)\ts2 (PM+1MM+2MM)"
        );
        assert_eq!(lines[1], "let-7a\tPM\t5\t7\t7\t8");
        assert_eq!(lines[2], "let-7a\t3:GT\t2\t0\t7\t8");
        assert_eq!(lines[3], "let-7a\t3:GT,8:GT\t0\t1\t7\t8");
        assert_eq!(lines[4], "miR-1\tPM\t0\t4\t0\t4");

        let back = CountTable::read_tsv(&path).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn float_counts_are_accepted() {
        assert_eq!(parse_count("3.0"), Some(3));
        assert_eq!(parse_count("3.5"), None);
        assert_eq!(parse_count("abc"), None);
    }
}
