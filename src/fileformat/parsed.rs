use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;

use crate::runtime::Error;

pub const PERFECT_MATCH: &str = "PM";

/// Header of the parsed alignment table. It starts with '#' so readers can skip it as a comment
pub const PARSED_HEADER: [&str; 7] = [
    "# miRNA_name",
    "pos:mut:Q-score",
    "Q-score",
    "5p_sequence",
    "5p_Q-score",
    "3p_sequence",
    "3p_Q-score",
];

///////////////////////////////
/// A substitution at a 1-based miRNA position; `change` is the miRNA base followed by the read base
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mutation {
    pub position: usize,
    pub change: String,
}

impl Mutation {
    pub fn canonical_base(&self) -> Option<char> {
        self.change.chars().next()
    }

    pub fn observed_base(&self) -> Option<char> {
        self.change.chars().nth(1)
    }
}

///////////////////////////////
/// The mismatches of one alignment without their qualities. Empty means perfect match.
/// Sorts by number of mismatches first, then position by position
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MutationSet(pub Vec<Mutation>);

impl MutationSet {
    pub fn is_perfect_match(&self) -> bool {
        self.0.is_empty()
    }

    pub fn num_mismatches(&self) -> usize {
        self.0.len()
    }
}

impl Ord for MutationSet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for MutationSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MutationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "{}", PERFECT_MATCH);
        }
        let parts = self
            .0
            .iter()
            .map(|m| format!("{}:{}", m.position, m.change))
            .join(",");
        write!(f, "{}", parts)
    }
}

impl FromStr for MutationSet {
    type Err = Error;

    /// Accepts "PM" (or "0") and lists such as "3:GA,7:AG"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == PERFECT_MATCH || s == "0" {
            return Ok(MutationSet::default());
        }
        let mut mutations = Vec::new();
        for part in s.split(',') {
            let (pos, change) = part.split_once(':').ok_or_else(|| {
                Error::parse_error("mutation", Some(format!("'{}' is not pos:mut", part)))
            })?;
            let position = pos.parse().map_err(|_| {
                Error::parse_error("mutation", Some(format!("bad position in '{}'", part)))
            })?;
            mutations.push(Mutation {
                position,
                change: change.to_string(),
            });
        }
        Ok(MutationSet(mutations))
    }
}

///////////////////////////////
/// Mismatch call of one read, with the Phred quality of the read base at each mismatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MismatchCall(pub Vec<(Mutation, u8)>);

impl MismatchCall {
    pub fn perfect() -> Self {
        MismatchCall(Vec::new())
    }

    /// Perfect matches always pass; otherwise every mismatched base needs quality >= min_quality
    pub fn passes_quality(&self, min_quality: u8) -> bool {
        self.0.iter().all(|(_, q)| *q >= min_quality)
    }

    pub fn without_quality(&self) -> MutationSet {
        MutationSet(self.0.iter().map(|(m, _)| m.clone()).collect())
    }
}

impl fmt::Display for MismatchCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "{}", PERFECT_MATCH);
        }
        let parts = self
            .0
            .iter()
            .map(|(m, q)| format!("{}:{}:{}", m.position, m.change, q))
            .join(",");
        write!(f, "{}", parts)
    }
}

impl FromStr for MismatchCall {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == PERFECT_MATCH {
            return Ok(MismatchCall::perfect());
        }
        let mut calls = Vec::new();
        for part in s.split(',') {
            let bad = || {
                Error::parse_error("mismatch call", Some(format!("'{}' is not pos:mut:Q", part)))
            };
            let mut fields = part.split(':');
            let (pos, change, quality) = match (fields.next(), fields.next(), fields.next()) {
                (Some(p), Some(c), Some(q)) => (p, c, q),
                _ => return Err(bad()),
            };
            calls.push((
                Mutation {
                    position: pos.parse().map_err(|_| bad())?,
                    change: change.to_string(),
                },
                quality.parse().map_err(|_| bad())?,
            ));
        }
        Ok(MismatchCall(calls))
    }
}

///////////////////////////////
/// Open a parsed alignment table. The '#' header is skipped, quality strings are taken verbatim
pub fn parsed_reader<P: AsRef<Path>>(path: P) -> anyhow::Result<csv::Reader<std::fs::File>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::file_not_found(path).into());
    }
    let reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .quoting(false)
        .flexible(true)
        .from_path(path)?;
    Ok(reader)
}

/// Writer for a parsed alignment table; quality strings may contain quote characters
pub fn parsed_writer<P: AsRef<Path>>(path: P) -> anyhow::Result<csv::Writer<std::fs::File>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path)?;
    writer.write_record(PARSED_HEADER)?;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_set_round_trip_and_order() {
        let pm: MutationSet = "PM".parse().unwrap();
        let one: MutationSet = "3:GA".parse().unwrap();
        let two_a: MutationSet = "3:GA,7:AG".parse().unwrap();
        let two_b: MutationSet = "2:CT,9:GT".parse().unwrap();
        let late_one: MutationSet = "21:TC".parse().unwrap();

        assert_eq!(pm.to_string(), "PM");
        assert_eq!(two_a.to_string(), "3:GA,7:AG");

        let mut sets = vec![two_a.clone(), late_one.clone(), pm.clone(), two_b.clone(), one.clone()];
        sets.sort();
        assert_eq!(sets, vec![pm, one, late_one, two_b, two_a]);
    }

    #[test]
    fn quality_filter() {
        let call: MismatchCall = "3:GA:38,7:AG:12".parse().unwrap();
        assert!(call.passes_quality(12));
        assert!(!call.passes_quality(38));
        assert_eq!(call.without_quality().to_string(), "3:GA,7:AG");

        let pm: MismatchCall = "PM".parse().unwrap();
        assert!(pm.passes_quality(41));
        assert_eq!(pm.to_string(), "PM");
    }

    #[test]
    fn mutation_bases() {
        let m = Mutation { position: 3, change: "GT".to_string() };
        assert_eq!(m.canonical_base(), Some('G'));
        assert_eq!(m.observed_base(), Some('T'));
    }

    #[test]
    fn reject_malformed() {
        assert!("3GA".parse::<MutationSet>().is_err());
        assert!("x:GA".parse::<MutationSet>().is_err());
        assert!("3:GA".parse::<MismatchCall>().is_err());
    }
}
