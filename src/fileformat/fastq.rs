use std::io::Write;
use std::path::Path;

use anyhow::Context;
use seq_io::fastq::Reader as FastqReader;

use crate::runtime::Error;

/// Illumina 1.8+ encodes quality as Phred+33, from '!' (Q0) to 'J' (Q41)
pub const PHRED_OFFSET: u8 = b'!';
pub const PHRED_MAX: u8 = 41;

pub type BoxedFastqReader = FastqReader<Box<dyn std::io::Read>>;

///////////////////////////////
/// Open a FASTQ file for streaming. Compression is detected from the magic bytes
pub fn open_fastq<P: AsRef<Path>>(path: P) -> anyhow::Result<BoxedFastqReader> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::file_not_found(path).into());
    }

    //Too short for niffler to sniff the magic bytes; can only be empty or plain text
    let file_len = std::fs::metadata(path)?.len();
    if file_len < 5 {
        let file = std::fs::File::open(path)?;
        return Ok(FastqReader::new(Box::new(file)));
    }

    let (reader, format) = niffler::from_path(path)
        .with_context(|| format!("Failed to open FASTQ file {}", path.display()))?;
    log::debug!("Opened {} (compression: {:?})", path.display(), format);

    Ok(FastqReader::new(reader))
}

///////////////////////////////
/// Number of records in a FASTQ file
pub fn count_records<P: AsRef<Path>>(path: P) -> anyhow::Result<u64> {
    let path = path.as_ref();
    let mut reader = open_fastq(path)?;

    let mut num_records = 0;
    while let Some(record) = reader.next() {
        record.map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;
        num_records += 1;
    }
    Ok(num_records)
}

///////////////////////////////
/// Decode one Phred+33 quality character
pub fn phred_score(c: u8) -> Result<u8, Error> {
    if c < PHRED_OFFSET || c - PHRED_OFFSET > PHRED_MAX {
        return Err(Error::parse_error(
            "quality score",
            Some(format!(
                "character '{}' is outside the Illumina 1.8+ range",
                c as char
            )),
        ));
    }
    Ok(c - PHRED_OFFSET)
}

///////////////////////////////
/// Write one FASTQ record. The separator line is always a bare '+'
pub fn write_fastq_record<W: Write>(
    writer: &mut W,
    head: &[u8],
    seq: &[u8],
    qual: &[u8],
) -> std::io::Result<()> {
    writer.write_all(b"@")?;
    writer.write_all(head)?;
    writer.write_all(b"\n")?;
    writer.write_all(seq)?;
    writer.write_all(b"\n+\n")?;
    writer.write_all(qual)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seq_io::fastq::Record;

    #[test]
    fn phred_bounds() {
        assert_eq!(phred_score(b'!').unwrap(), 0);
        assert_eq!(phred_score(b'I').unwrap(), 40);
        assert_eq!(phred_score(b'J').unwrap(), 41);
        assert!(phred_score(b'K').is_err());
        assert!(phred_score(b' ').is_err());
    }

    #[test]
    fn written_record_reads_back() {
        let mut buf = Vec::new();
        write_fastq_record(&mut buf, b"r1 extra", b"ACGT", b"IIII").unwrap();
        assert_eq!(buf, b"@r1 extra\nACGT\n+\nIIII\n");

        let mut reader = FastqReader::new(buf.as_slice());
        let rec = reader.next().unwrap().unwrap();
        assert_eq!(rec.seq(), b"ACGT");
        assert_eq!(rec.qual(), b"IIII");
    }
}
