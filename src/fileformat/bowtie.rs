use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use crate::fileformat::fasta::split_collapsed_name;
use crate::runtime::Error;

/*
 * Default bowtie output, one alignment per line, tab separated:
 *
 * mir-1   +   GTATGCAGGCTT#11   0   GTATGC   IIIIII   2   4:A>G
 *
 * 1. query name (here: the miRNA, maybe with a description after a space)
 * 2. strand
 * 3. reference name (here: the collapsed read, "sequence#count")
 * 4. 0-based offset of the alignment into the reference
 * 5. query sequence
 * 6. query qualities
 * 7. number of other alignments
 * 8. mismatch descriptors "offset:reference>query", comma separated, empty for a perfect match
 */

/// One forward or reverse alignment of a miRNA onto a collapsed read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BowtieHit {
    pub mirna: String,
    pub forward: bool,
    pub read_seq: String,
    pub read_count: u64,
    pub start: usize,
    pub end: usize,
    pub mismatches: String,
}

impl BowtieHit {
    pub fn parse_line(line: &str) -> Result<BowtieHit, Error> {
        let cols: Vec<&str> = line.trim_end_matches(['\n', '\r']).split('\t').collect();
        if cols.len() < 7 {
            return Err(Error::parse_error(
                "bowtie alignment",
                Some(format!("expected 8 columns, found {} in '{}'", cols.len(), line)),
            ));
        }

        let forward = match cols[1] {
            "+" => true,
            "-" => false,
            other => {
                return Err(Error::parse_error(
                    "bowtie alignment",
                    Some(format!("unknown strand '{}'", other)),
                ))
            }
        };

        let mirna = cols[0].split_whitespace().next().unwrap_or_default().to_string();
        let (read_seq, read_count) = split_collapsed_name(cols[2])?;
        let start: usize = cols[3].parse().map_err(|_| {
            Error::parse_error("bowtie alignment", Some(format!("bad offset '{}'", cols[3])))
        })?;
        let end = start + cols[4].len();

        Ok(BowtieHit {
            mirna,
            forward,
            read_seq: read_seq.to_string(),
            read_count,
            start,
            end,
            mismatches: cols.get(7).copied().unwrap_or_default().to_string(),
        })
    }

    /// 0 for a perfect match
    pub fn num_mismatches(&self) -> usize {
        self.mismatches.matches('>').count()
    }

    pub fn is_perfect_match(&self) -> bool {
        self.mismatches.is_empty()
    }
}

///////////////////////////////
/// One mismatch as reported by bowtie. The offset counts from the 5' end of the miRNA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BowtieMismatch {
    pub offset: usize,
    pub read_base: u8,
    pub mirna_base: u8,
}

pub fn parse_mismatches(descriptors: &str) -> Result<Vec<BowtieMismatch>, Error> {
    if descriptors.is_empty() {
        return Ok(Vec::new());
    }

    descriptors
        .split(',')
        .map(|desc| {
            let bad = || {
                Error::parse_error(
                    "bowtie mismatch descriptor",
                    Some(format!("'{}' is not of the form offset:R>Q", desc)),
                )
            };
            let (offset, change) = desc.split_once(':').ok_or_else(bad)?;
            let (read_base, mirna_base) = change.split_once('>').ok_or_else(bad)?;
            if read_base.len() != 1 || mirna_base.len() != 1 {
                return Err(bad());
            }
            Ok(BowtieMismatch {
                offset: offset.parse().map_err(|_| bad())?,
                read_base: read_base.as_bytes()[0],
                mirna_base: mirna_base.as_bytes()[0],
            })
        })
        .collect()
}

///////////////////////////////
/// Read all alignments of a bowtie output file, in file order
pub fn read_bowtie_hits<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<BowtieHit>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|_| Error::file_not_found(path))?;
    let reader = BufReader::new(file);

    let mut hits = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let hit = BowtieHit::parse_line(&line).map_err(|e| {
            Error::file_not_valid(path, Some(format!("line {}: {}", index + 1, e)))
        })?;
        hits.push(hit);
    }
    Ok(hits)
}
