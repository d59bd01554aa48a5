use crate::error::{Error, Result};
use crate::window::PositionRecord;
use needletail::{parse_fastx_file, parse_fastx_stdin, FastxReader};
use std::io::{BufRead, Write};
use std::sync::Arc;

/// Open a fastx parser on a file (optionally compressed) or `-` for stdin.
pub fn open_fastx(path: &str) -> Result<Box<dyn FastxReader>> {
    let reader = if path == "-" {
        parse_fastx_stdin()?
    } else {
        parse_fastx_file(path)?
    };
    Ok(reader)
}

/// First whitespace separated token of a fasta header.
fn record_name(id: &[u8]) -> String {
    let id = String::from_utf8_lossy(id);
    id.split_whitespace().next().unwrap_or("").to_string()
}

/// One position record per base of every sequence in a fastx stream.
///
/// Positions restart at 0 for each sequence and names are cut at the first
/// whitespace. Only the current sequence is held in memory.
///
/// A record named like the record right before it is an error, since its
/// windows would continue the previous record's run.
pub struct FastaBases {
    reader: Box<dyn FastxReader>,
    name: Option<Arc<str>>,
    seq: Vec<u8>,
    idx: usize,
}

impl FastaBases {
    pub fn new(reader: Box<dyn FastxReader>) -> Self {
        FastaBases {
            reader,
            name: None,
            seq: Vec::new(),
            idx: 0,
        }
    }
}

impl Iterator for FastaBases {
    type Item = Result<PositionRecord<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.idx >= self.seq.len() {
            let record = match self.reader.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            let name = record_name(record.id());
            if self.name.as_deref() == Some(name.as_str()) {
                let header = format!(">{}", String::from_utf8_lossy(record.id()));
                return Some(Err(Error::invalid_input(
                    record.start_line_number() as usize,
                    &header,
                    format!("sequence {} repeats the name of the previous record", name),
                )));
            }
            self.seq = record.seq().into_owned();
            self.idx = 0;
            log::debug!("Read {} ({} bp)", name, self.seq.len());
            self.name = Some(Arc::from(name));
        }
        let name = self.name.clone()?;
        let rec = PositionRecord::new(name, self.idx as u64, self.seq[self.idx]);
        self.idx += 1;
        Some(Ok(rec))
    }
}

/// Names and lengths of every sequence in a fastx file.
/// # Example
/// ```
/// let lengths = gdatools::fastx::sequence_lengths(".test/small.fa").unwrap();
/// assert_eq!(lengths[0], ("scaffold_1".to_string(), 20));
/// ```
pub fn sequence_lengths(path: &str) -> Result<Vec<(String, usize)>> {
    let mut reader = open_fastx(path)?;
    let mut lengths = Vec::new();
    while let Some(record) = reader.next() {
        let record = record?;
        lengths.push((record_name(record.id()), record.seq().len()));
    }
    Ok(lengths)
}

/// Cut fasta header lines at the first occurrence of `delimiter`, passing
/// every other line through unchanged. Returns the number of headers seen.
pub fn shorten_fasta_headers<R: BufRead, W: Write>(
    reader: R,
    out: &mut W,
    delimiter: &str,
) -> Result<usize> {
    if delimiter.is_empty() {
        return Err(Error::InvalidConfig(
            "header delimiter must not be empty".to_string(),
        ));
    }
    let mut n_headers = 0;
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('>') {
            n_headers += 1;
            let short = line.split(delimiter).next().unwrap_or(line.as_str());
            writeln!(out, "{}", short)?;
        } else {
            writeln!(out, "{}", line)?;
        }
    }
    out.flush()?;
    Ok(n_headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use needletail::parse_fastx_reader;
    use std::io::Cursor;

    fn bases(text: &str) -> FastaBases {
        let reader = parse_fastx_reader(Cursor::new(text.as_bytes().to_vec())).unwrap();
        FastaBases::new(reader)
    }

    #[test]
    fn test_fasta_bases() {
        let recs: Vec<PositionRecord<u8>> = bases(">a desc\nACG\nT\n>b\nGG\n")
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(recs.len(), 6);
        assert_eq!(recs[0].sequence_id.as_ref(), "a");
        assert_eq!(recs[3].position, 3);
        assert_eq!(recs[3].value, b'T');
        assert_eq!(recs[4].sequence_id.as_ref(), "b");
        assert_eq!(recs[4].position, 0);
    }

    #[test]
    fn test_repeated_record_name_fails() {
        let mut recs = bases(">a\nAC\n>b\nGG\n>b second\nTT\n");
        for _ in 0..4 {
            assert!(recs.next().unwrap().is_ok());
        }
        match recs.next() {
            Some(Err(Error::InvalidInput {
                line_number, line, ..
            })) => {
                assert_eq!(line_number, 5);
                assert_eq!(line, ">b second");
            }
            other => panic!("expected a repeated name error, got {:?}", other),
        }
    }

    #[test]
    fn test_shorten_headers() {
        let fasta = ">scaffold_1 length=100 cov=3\nACGT\n>scaffold_2|x\nGG\n";
        let mut out = Vec::new();
        let n = shorten_fasta_headers(fasta.as_bytes(), &mut out, " ").unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ">scaffold_1\nACGT\n>scaffold_2|x\nGG\n"
        );

        let mut out = Vec::new();
        shorten_fasta_headers(fasta.as_bytes(), &mut out, "|").unwrap();
        assert!(String::from_utf8(out).unwrap().contains(">scaffold_2\n"));
    }

    #[test]
    fn test_empty_delimiter_is_rejected() {
        let mut out = Vec::new();
        let err = shorten_fasta_headers(">a\n".as_bytes(), &mut out, "").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
