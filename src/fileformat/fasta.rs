use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use seq_io::fasta::Reader as FastaReader;
use seq_io::fasta::Record as FastaRecord;

use crate::runtime::Error;

/// Separates sequence and read count in the name of a collapsed read, as in ">ACGT#12"
pub const COLLAPSED_COUNT_SEPARATOR: char = '#';

///////////////////////////////
/// Read reference miRNA sequences. The name is the first word of the header,
/// so ">mmu-let-7g-5p MIMAT0000121 Mus musculus let-7g-5p" becomes "mmu-let-7g-5p"
pub fn read_reference<P: AsRef<Path>>(path: P) -> anyhow::Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::file_not_found(path).into());
    }
    let mut reader = FastaReader::from_path(path)
        .with_context(|| format!("Failed to open FASTA file {}", path.display()))?;

    let mut sequences = BTreeMap::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;
        let name = record
            .id()
            .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?
            .to_string();
        let seq = record.full_seq();

        //Headers without any sequence lines are not kept
        if seq.is_empty() {
            log::debug!("Skipping empty reference sequence {}", name);
            continue;
        }
        sequences.insert(name, String::from_utf8_lossy(&seq).into_owned());
    }
    Ok(sequences)
}

///////////////////////////////
/// Write one collapsed read; the name carries the sequence and how often it was seen
pub fn write_collapsed_record<W: Write>(
    writer: &mut W,
    seq: &[u8],
    count: u64,
) -> std::io::Result<()> {
    writer.write_all(b">")?;
    writer.write_all(seq)?;
    write!(writer, "{}{}\n", COLLAPSED_COUNT_SEPARATOR, count)?;
    writer.write_all(seq)?;
    writer.write_all(b"\n")?;
    Ok(())
}

///////////////////////////////
/// Split "ACGT#12" into ("ACGT", 12). Names that were never collapsed count once
pub fn split_collapsed_name(name: &str) -> Result<(&str, u64), Error> {
    match name.split_once(COLLAPSED_COUNT_SEPARATOR) {
        Some((seq, _)) => {
            let count_str = name
                .rsplit(COLLAPSED_COUNT_SEPARATOR)
                .next()
                .unwrap_or_default();
            let count = count_str.parse::<u64>().map_err(|_| {
                Error::parse_error(
                    "collapsed read name",
                    Some(format!("'{}' has no valid read count", name)),
                )
            })?;
            Ok((seq, count))
        }
        None => Ok((name, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapsed_record_layout() {
        let mut buf = Vec::new();
        write_collapsed_record(&mut buf, b"TGAGGTAG", 11).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), ">TGAGGTAG#11\nTGAGGTAG\n");
    }

    #[test]
    fn split_names() {
        assert_eq!(split_collapsed_name("GTATGC#11").unwrap(), ("GTATGC", 11));
        assert_eq!(split_collapsed_name("GTATGC").unwrap(), ("GTATGC", 1));
        assert!(split_collapsed_name("GTATGC#x").is_err());
    }

    #[test]
    fn reference_uses_first_word_and_joins_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mir.fa");
        std::fs::write(
            &path,
            ">mmu-let-7g-5p MIMAT0000121 Mus musculus\nTGAGGTAGTAG\nTTTGTACAGTT\n>empty\n>mmu-miR-1a-3p\nTGGAATGTAAAGAAGTATGTAT\n",
        )
        .unwrap();

        let refs = read_reference(&path).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs["mmu-let-7g-5p"], "TGAGGTAGTAGTTTGTACAGTT");
        assert_eq!(refs["mmu-miR-1a-3p"], "TGGAATGTAAAGAAGTATGTAT");
    }
}
