use flate2::read;
use flate2::write;
use flate2::Compression;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const BUFFER_SIZE: usize = 128 * 1024;

/// Write normal or compressed files seamlessly.
/// Uses the presence of a `.gz` extension to decide, and `-` for stdout.
pub fn writer(filename: &str) -> io::Result<Box<dyn Write + Send>> {
    if filename == "-" {
        return Ok(Box::new(BufWriter::with_capacity(BUFFER_SIZE, io::stdout())));
    }
    let path = Path::new(filename);
    let file = File::create(path).map_err(|e| with_path(e, path))?;

    if path.extension() == Some(OsStr::new("gz")) {
        Ok(Box::new(BufWriter::with_capacity(
            BUFFER_SIZE,
            write::GzEncoder::new(file, Compression::default()),
        )))
    } else {
        Ok(Box::new(BufWriter::with_capacity(BUFFER_SIZE, file)))
    }
}

/// Read normal or compressed files seamlessly.
/// Uses the presence of a `.gz` extension to decide, and `-` for stdin.
/// Multi-member (bgzip) files are read to the end.
/// # Example
/// ```
/// use std::io::BufRead;
/// let lines: Vec<String> = gdatools::myio::reader(".test/small.depth.gz")
///     .unwrap()
///     .lines()
///     .map(|l| l.unwrap())
///     .collect();
/// assert_eq!(lines.len(), 9);
/// ```
pub fn reader(filename: &str) -> io::Result<Box<dyn BufRead>> {
    if filename == "-" {
        return Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, io::stdin())));
    }
    let path = Path::new(filename);
    let file = File::open(path).map_err(|e| with_path(e, path))?;

    if path.extension() == Some(OsStr::new("gz")) {
        Ok(Box::new(BufReader::with_capacity(
            BUFFER_SIZE,
            read::MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
}

fn with_path(e: io::Error, path: &Path) -> io::Error {
    io::Error::new(e.kind(), format!("couldn't open {}: {}", path.display(), e))
}
