use crate::bedgraph;
use crate::error::{Error, Result};
use crate::window::{Mean, PositionRecord, WindowReducer};
use rust_htslib::bam::{self, Read};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Position records from `samtools depth` output.
///
/// Lines are `name pos depth ...` split on whitespace. Positions are 1-based
/// in the file and 0-based in the records.
pub struct DepthRecords<R> {
    lines: io::Lines<R>,
    line_number: usize,
    last_id: Option<Arc<str>>,
}

impl<R: BufRead> DepthRecords<R> {
    pub fn new(reader: R) -> Self {
        DepthRecords {
            lines: reader.lines(),
            line_number: 0,
            last_id: None,
        }
    }

    fn parse(&mut self, line: &str) -> Result<PositionRecord<f64>> {
        let mut fields = line.split_whitespace();
        let (name, pos, depth) = match (fields.next(), fields.next(), fields.next()) {
            (Some(name), Some(pos), Some(depth)) => (name, pos, depth),
            _ => {
                return Err(Error::invalid_input(
                    self.line_number,
                    line,
                    "expected at least 3 fields",
                ))
            }
        };
        let position = match pos.parse::<u64>() {
            Ok(p) if p > 0 => p - 1,
            _ => {
                return Err(Error::invalid_input(
                    self.line_number,
                    line,
                    format!("position must be a positive integer, found '{}'", pos),
                ))
            }
        };
        let value = match depth.parse::<f64>() {
            Ok(d) if d.is_finite() => d,
            _ => {
                return Err(Error::invalid_input(
                    self.line_number,
                    line,
                    format!("depth must be a finite number, found '{}'", depth),
                ))
            }
        };

        // reuse the name allocation for the rest of the scaffold
        if let Some(id) = &self.last_id {
            if id.as_ref() == name {
                return Ok(PositionRecord::new(id.clone(), position, value));
            }
        }
        log::debug!("Reading depth for {}", name);
        let sequence_id: Arc<str> = Arc::from(name);
        self.last_id = Some(sequence_id.clone());
        Ok(PositionRecord::new(sequence_id, position, value))
    }
}

impl<R: BufRead> Iterator for DepthRecords<R> {
    type Item = Result<PositionRecord<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };
        self.line_number += 1;
        Some(self.parse(&line))
    }
}

/// Mean depth in fixed size chunks of each scaffold, written as bedgraph.
/// # Example
/// ```
/// let mut out = Vec::new();
/// let reader = gdatools::myio::reader(".test/small.depth").unwrap();
/// let n = gdatools::coverage::depth_to_bedgraph(reader, &mut out, Some("depth"), 3).unwrap();
/// assert_eq!(n, 4);
/// ```
pub fn depth_to_bedgraph<R: BufRead, W: Write>(
    reader: R,
    out: &mut W,
    title: Option<&str>,
    chunk_size: usize,
) -> Result<usize> {
    let windows = WindowReducer::new(DepthRecords::new(reader), Mean, chunk_size)?;
    bedgraph::write_windows(out, title, windows)
}

/// A pileup column reduced to (target id, 0-based position, depth).
pub type DepthColumn = (usize, u64, f64);

/// Fills the positions missing from a stream of depth columns with zeros, so
/// that every base of every target is reported (like `samtools depth -aa`).
///
/// Columns must be sorted by target id and then position.
pub struct ZeroFilled<I> {
    columns: I,
    names: Vec<Arc<str>>,
    lengths: Vec<u64>,
    tid: usize,
    pos: u64,
    pending: Option<DepthColumn>,
    columns_done: bool,
}

impl<I: Iterator<Item = Result<DepthColumn>>> ZeroFilled<I> {
    pub fn new(columns: I, names: Vec<Arc<str>>, lengths: Vec<u64>) -> Self {
        ZeroFilled {
            columns,
            names,
            lengths,
            tid: 0,
            pos: 0,
            pending: None,
            columns_done: false,
        }
    }

    fn emit(&mut self, depth: f64) -> PositionRecord<f64> {
        let rec = PositionRecord::new(self.names[self.tid].clone(), self.pos, depth);
        self.pos += 1;
        rec
    }
}

impl<I: Iterator<Item = Result<DepthColumn>>> Iterator for ZeroFilled<I> {
    type Item = Result<PositionRecord<f64>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.tid >= self.lengths.len() {
                return None;
            }
            if self.pending.is_none() && !self.columns_done {
                match self.columns.next() {
                    Some(Ok(column)) => self.pending = Some(column),
                    Some(Err(e)) => {
                        self.tid = self.lengths.len();
                        return Some(Err(e));
                    }
                    None => self.columns_done = true,
                }
            }
            if self.pos >= self.lengths[self.tid] {
                self.tid += 1;
                self.pos = 0;
                continue;
            }
            match self.pending {
                Some((tid, pos, depth)) if tid == self.tid && pos == self.pos => {
                    self.pending = None;
                    return Some(Ok(self.emit(depth)));
                }
                // out of order or past the end of its target
                Some((tid, pos, _)) if tid < self.tid || (tid == self.tid && pos < self.pos) => {
                    log::warn!("Ignoring unsorted pileup column {}:{}", tid, pos);
                    self.pending = None;
                }
                _ => return Some(Ok(self.emit(0.0))),
            }
        }
    }
}

/// Reads counted towards depth: mapped, primary, not failing QC, not
/// duplicates, and with at least `min_mapq` mapping quality.
fn counts_towards_depth(record: &bam::Record, min_mapq: u8) -> bool {
    !record.is_unmapped()
        && !record.is_secondary()
        && !record.is_supplementary()
        && !record.is_quality_check_failed()
        && !record.is_duplicate()
        && record.mapq() >= min_mapq
}

/// Per base depth of a coordinate sorted BAM, windowed into mean coverage.
pub fn bam_coverage<W: Write>(
    path: &str,
    threads: usize,
    min_mapq: u8,
    out: &mut W,
    title: Option<&str>,
    chunk_size: usize,
) -> Result<usize> {
    let mut reader = if path == "-" {
        bam::Reader::from_stdin()?
    } else {
        bam::Reader::from_path(path)?
    };
    reader.set_threads(threads)?;

    let header = reader.header().clone();
    let names: Vec<Arc<str>> = header
        .target_names()
        .iter()
        .map(|name| Arc::from(String::from_utf8_lossy(name).as_ref()))
        .collect();
    let lengths: Vec<u64> = (0..header.target_count())
        .map(|tid| header.target_len(tid).unwrap_or(0))
        .collect();

    let mut pileups = reader.pileup();
    pileups.set_max_depth(i32::MAX as u32);
    let columns = pileups.map(|pileup| -> Result<DepthColumn> {
        let pileup = pileup?;
        let depth = pileup
            .alignments()
            .filter(|aln| {
                !aln.is_del() && !aln.is_refskip() && counts_towards_depth(&aln.record(), min_mapq)
            })
            .count();
        Ok((pileup.tid() as usize, pileup.pos() as u64, depth as f64))
    });

    let records = ZeroFilled::new(columns, names, lengths);
    let windows = WindowReducer::new(records, Mean, chunk_size)?;
    bedgraph::write_windows(out, title, windows)
}
