use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use log::debug;
use log::info;
use log::warn;
use rustc_hash::FxHashMap;
use seq_io::fastq::Record as FastqRecord;

use crate::fileformat::bowtie::parse_mismatches;
use crate::fileformat::fastq::phred_score;
use crate::fileformat::parsed::parsed_writer;
use crate::fileformat::read_bowtie_hits;
use crate::fileformat::BowtieHit;
use crate::fileformat::MismatchCall;
use crate::fileformat::Mutation;
use crate::fileformat::open_fastq;
use crate::runtime::Error;
use crate::utils::with_suffix;

#[derive(Args)]
pub struct ParseCMD {
    #[arg(short = 'i', value_parser)]
    /// bowtie result in its default table format
    pub path_bowtie: PathBuf,

    #[arg(long = "fq", value_parser)]
    /// FASTQ file used to build the bowtie index
    pub path_fastq: PathBuf,

    #[arg(short = 'o', value_parser)]
    /// Output table. Defaults to the bowtie file name with ".parsed" added
    pub path_out: Option<PathBuf>,
}

impl ParseCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let path_out = self
            .path_out
            .clone()
            .unwrap_or_else(|| with_suffix(&self.path_bowtie, ".parsed"));

        let stats = ParseBowtie::run(&ParseBowtie {
            path_bowtie: self.path_bowtie.clone(),
            path_fastq: self.path_fastq.clone(),
            path_out,
        })?;

        info!(
            "Uniquely mapped sequences: {} (of which concatemers: {}), multi-mapped and discarded: {}, rows written: {}",
            stats.num_unique, stats.num_concatemer, stats.num_multimapped, stats.num_rows
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseStats {
    pub num_unique: usize,
    pub num_concatemer: usize,
    pub num_multimapped: usize,
    pub num_rows: usize,
}

/// How the best alignments of one read were resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Unique(BowtieHit),
    /// The same miRNA, with the same mismatches, several times in one read. The leftmost copy is kept
    Concatemer(BowtieHit),
    MultiMapped(Vec<BowtieHit>),
}

/// Hits per read sequence, then per number of mismatches, in file order
pub type GroupedHits = BTreeMap<String, BTreeMap<usize, Vec<BowtieHit>>>;

///////////////////////////////
/// Turn bowtie output into one row per FASTQ read with a unique best miRNA alignment
pub struct ParseBowtie {
    pub path_bowtie: PathBuf,
    pub path_fastq: PathBuf,
    pub path_out: PathBuf,
}

impl ParseBowtie {
    pub fn run(params: &ParseBowtie) -> Result<ParseStats> {
        let hits = read_bowtie_hits(&params.path_bowtie)?;
        debug!("Read {} alignments from {}", hits.len(), params.path_bowtie.display());

        let grouped = group_hits(hits);

        let mut stats = ParseStats::default();
        let mut unique: BTreeMap<String, BowtieHit> = BTreeMap::new();
        for (read_seq, by_mismatch) in grouped {
            match resolve_read(by_mismatch) {
                Some(Resolution::Unique(hit)) => {
                    stats.num_unique += 1;
                    unique.insert(read_seq, hit);
                }
                Some(Resolution::Concatemer(hit)) => {
                    stats.num_unique += 1;
                    stats.num_concatemer += 1;
                    unique.insert(read_seq, hit);
                }
                Some(Resolution::MultiMapped(hits)) => {
                    stats.num_multimapped += 1;
                    debug!("Discarding {} mapped ambiguously to {} miRNAs", read_seq, hits.len());
                }
                None => {}
            }
        }

        //Several FASTQ records can share a sequence; each gets its own row
        let qualities = collect_qualities(&params.path_fastq, &unique)?;

        let mut writer = parsed_writer(&params.path_out)?;
        for (read_seq, hit) in &unique {
            let list_qual = match qualities.get(read_seq.as_bytes()) {
                Some(list_qual) => list_qual,
                None => {
                    warn!(
                        "Sequence {} is mapped but has no record in {}",
                        read_seq,
                        params.path_fastq.display()
                    );
                    continue;
                }
            };

            for qual in list_qual {
                let row = make_row(hit, read_seq.as_bytes(), qual)
                    .map_err(|e| Error::file_not_valid(&params.path_fastq, Some(e.to_string())))?;
                writer.write_record(&row)?;
                stats.num_rows += 1;
            }
        }
        writer.flush()?;

        Ok(stats)
    }
}

///////////////////////////////
/// Keep forward hits only, grouped by read and mismatch count
pub fn group_hits(hits: Vec<BowtieHit>) -> GroupedHits {
    let mut grouped: GroupedHits = BTreeMap::new();
    for hit in hits.into_iter().filter(|h| h.forward) {
        grouped
            .entry(hit.read_seq.clone())
            .or_default()
            .entry(hit.num_mismatches())
            .or_default()
            .push(hit);
    }
    grouped
}

///////////////////////////////
/// Only the hits with the fewest mismatches compete: PM beats 1MM beats 2MM
pub fn resolve_read(by_mismatch: BTreeMap<usize, Vec<BowtieHit>>) -> Option<Resolution> {
    let (_, mut best) = by_mismatch.into_iter().next()?;

    if best.len() == 1 {
        return best.pop().map(Resolution::Unique);
    }

    let first = &best[0];
    let is_concatemer = best
        .iter()
        .all(|h| h.mirna == first.mirna && h.mismatches == first.mismatches);

    if is_concatemer {
        best.into_iter()
            .min_by_key(|h| h.start)
            .map(Resolution::Concatemer)
    } else {
        Some(Resolution::MultiMapped(best))
    }
}

///////////////////////////////
/// Quality strings of all FASTQ records whose sequence is in `wanted`
pub fn collect_qualities(
    path_fastq: &PathBuf,
    wanted: &BTreeMap<String, BowtieHit>,
) -> Result<FxHashMap<Vec<u8>, Vec<Vec<u8>>>> {
    let mut reader = open_fastq(path_fastq)?;

    let mut qualities: FxHashMap<Vec<u8>, Vec<Vec<u8>>> = FxHashMap::default();
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| Error::file_not_valid(path_fastq, Some(e.to_string())))?;
        let seq = record.seq();
        let is_wanted = std::str::from_utf8(seq)
            .map(|s| wanted.contains_key(s))
            .unwrap_or(false);
        if is_wanted {
            qualities
                .entry(seq.to_vec())
                .or_default()
                .push(record.qual().to_vec());
        }
    }
    Ok(qualities)
}

///////////////////////////////
/// Mismatches of a hit with the read quality at each of them. The quality of a
/// mismatched base is blanked out of the returned quality string
pub fn correct_mismatch_quality(hit: &BowtieHit, qual: &[u8]) -> Result<(MismatchCall, Vec<u8>), Error> {
    let mismatches = parse_mismatches(&hit.mismatches)?;
    let mut new_qual = qual.to_vec();

    let mut calls = Vec::with_capacity(mismatches.len());
    for mm in mismatches {
        let qual_pos = hit.start + mm.offset;
        let c = *qual.get(qual_pos).ok_or_else(|| {
            Error::parse_error(
                "quality string",
                Some(format!("mismatch at read position {} but only {} quality values", qual_pos, qual.len())),
            )
        })?;
        new_qual[qual_pos] = b' ';

        let mutation = Mutation {
            position: mm.offset + 1,
            change: format!("{}{}", mm.mirna_base as char, mm.read_base as char),
        };
        calls.push((mutation, phred_score(c)?));
    }
    Ok((MismatchCall(calls), new_qual))
}

///////////////////////////////
/// miRNA name, mismatch call, aligned quality, then 5' and 3' flanks of the read with their qualities
pub fn make_row(hit: &BowtieHit, read_seq: &[u8], qual: &[u8]) -> Result<[String; 7], Error> {
    if hit.end > read_seq.len() || hit.end > qual.len() {
        return Err(Error::parse_error(
            "alignment",
            Some(format!(
                "{} ends at {} beyond the read of length {}",
                hit.mirna,
                hit.end,
                read_seq.len().min(qual.len())
            )),
        ));
    }
    let (call, qual) = correct_mismatch_quality(hit, qual)?;
    let (start, end) = (hit.start, hit.end);
    let text = |b: &[u8]| String::from_utf8_lossy(b).into_owned();

    Ok([
        hit.mirna.clone(),
        call.to_string(),
        text(&qual[start..end]),
        text(&read_seq[..start]),
        text(&qual[..start]),
        text(&read_seq[end..]),
        text(&qual[end..]),
    ])
}
