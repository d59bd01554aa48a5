use crate::error::{Error, Result};
use crate::window::{PositionRecord, Reduction, Window, WindowReducer};
use itertools::Itertools;
use num_format::{Locale, ToFormattedString};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Leading columns of a merged table: window name, start, end, species, scaffold.
const KEY_COLUMNS: usize = 5;

/// One row of a merged bedgraph table, keyed by its scaffold.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub window_name: String,
    pub start: i64,
    pub end: i64,
    pub species: String,
    pub values: Vec<f64>,
}

/// A group of merged rows collapsed into one.
#[derive(Debug, Clone, PartialEq)]
pub struct DownsampledRow {
    pub window_name: String,
    pub start: i64,
    pub end: i64,
    pub species: String,
    pub scaffold: Arc<str>,
    pub means: Vec<f64>,
}

impl fmt::Display for DownsampledRow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.window_name,
            self.start,
            self.end,
            self.species,
            self.scaffold,
            self.means.iter().join("\t")
        )
    }
}

/// Column-wise mean of a group of rows. The first row names the group, and the
/// group covers `rows` chunks of the first row's size.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowMean;

impl Reduction for RowMean {
    type Value = MergedRow;
    type Output = DownsampledRow;

    fn reduce(&self, window: &Window<MergedRow>) -> Option<DownsampledRow> {
        let rows = window.values();
        let first = rows.first()?;
        let chunk_size = first.end - first.start + 1;
        let n_rows = rows.len() as f64;
        let means = (0..first.values.len())
            .map(|col| rows.iter().map(|row| row.values[col]).sum::<f64>() / n_rows)
            .collect();
        Some(DownsampledRow {
            window_name: first.window_name.clone(),
            start: first.start,
            end: first.start + chunk_size * rows.len() as i64 - 1,
            species: first.species.clone(),
            scaffold: Arc::from(window.sequence_id()),
            means,
        })
    }
}

/// Data rows of a merged table, after its header line.
pub struct MergedRows<R> {
    lines: io::Lines<R>,
    n_columns: usize,
    line_number: usize,
}

impl<R: BufRead> MergedRows<R> {
    /// `n_columns` is the width of the header; every row must match it.
    pub fn new(lines: io::Lines<R>, n_columns: usize) -> Self {
        MergedRows {
            lines,
            n_columns,
            line_number: 1,
        }
    }

    fn parse(&self, line: &str) -> Result<PositionRecord<MergedRow>> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != self.n_columns {
            return Err(Error::invalid_input(
                self.line_number,
                line,
                format!(
                    "expected {} columns, found {}",
                    self.n_columns,
                    fields.len()
                ),
            ));
        }
        let coordinate = |field: &str| {
            field.parse::<i64>().map_err(|_| {
                Error::invalid_input(
                    self.line_number,
                    line,
                    format!("coordinate must be an integer, found '{}'", field),
                )
            })
        };
        let start = coordinate(fields[1])?;
        let end = coordinate(fields[2])?;
        let values = fields[KEY_COLUMNS..]
            .iter()
            .map(|field| {
                field.trim().parse::<f64>().map_err(|_| {
                    Error::invalid_input(
                        self.line_number,
                        line,
                        format!("value must be numeric, found '{}'", field),
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let row = MergedRow {
            window_name: fields[0].to_string(),
            start,
            end,
            species: fields[3].to_string(),
            values,
        };
        let position = start.max(0) as u64;
        Ok(PositionRecord::new(Arc::from(fields[4]), position, row))
    }
}

impl<R: BufRead> Iterator for MergedRows<R> {
    type Item = Result<PositionRecord<MergedRow>>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };
        self.line_number += 1;
        Some(self.parse(&line))
    }
}

/// Average every `factor` consecutive rows of each scaffold in a merged table.
/// The header line is copied to the output. Returns the number of rows written.
/// # Example
/// ```
/// let table = "name\tstart\tend\tspecies\tscaffold\tgc\n\
///     w1\t1\t5000\tsp\tchr1\t0.5\n\
///     w2\t5001\t10000\tsp\tchr1\t0.25\n";
/// let mut out = Vec::new();
/// gdatools::downsample::downsample(table.as_bytes(), &mut out, 2).unwrap();
/// let text = String::from_utf8(out).unwrap();
/// assert_eq!(text.lines().nth(1), Some("w1\t1\t10000\tsp\tchr1\t0.375"));
/// ```
pub fn downsample<R: BufRead, W: Write>(reader: R, out: &mut W, factor: usize) -> Result<usize> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Ok(0),
    };
    let n_columns = header.split('\t').count();
    if n_columns < KEY_COLUMNS {
        return Err(Error::invalid_input(
            1,
            &header,
            format!("expected at least {} columns", KEY_COLUMNS),
        ));
    }
    let rows = WindowReducer::new(MergedRows::new(lines, n_columns), RowMean, factor)?;
    writeln!(out, "{}", header)?;

    let mut n = 0;
    for row in rows {
        writeln!(out, "{}", row?.value)?;
        n += 1;
    }
    out.flush()?;
    log::info!("Wrote {} downsampled rows", n.to_formatted_string(&Locale::en));
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "window\tstart\tend\tspecies\tscaffold\ta\tb";

    fn table(rows: &[&str]) -> String {
        let mut text = HEADER.to_string();
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text.push('\n');
        text
    }

    fn run(text: &str, factor: usize) -> Vec<String> {
        let mut out = Vec::new();
        downsample(text.as_bytes(), &mut out, factor).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_groups_restart_per_scaffold() {
        let text = table(&[
            "w1\t1\t100\tsp\tchr1\t1\t10",
            "w2\t101\t200\tsp\tchr1\t2\t20",
            "w3\t201\t300\tsp\tchr1\t3\t30",
            "w4\t1\t100\tsp\tchr2\t4\t40",
        ]);
        let out = run(&text, 2);
        assert_eq!(
            out,
            vec![
                HEADER,
                "w1\t1\t200\tsp\tchr1\t1.5\t15",
                "w3\t201\t300\tsp\tchr1\t3\t30",
                "w4\t1\t100\tsp\tchr2\t4\t40",
            ]
        );
    }

    #[test]
    fn test_factor_one_copies_rows() {
        let text = table(&["w1\t1\t100\tsp\tchr1\t1\t10", "w2\t101\t200\tsp\tchr1\t2\t20"]);
        let out = run(&text, 1);
        assert_eq!(out.len(), 3);
        assert_eq!(out[2], "w2\t101\t200\tsp\tchr1\t2\t20");
    }

    #[test]
    fn test_ragged_row_fails() {
        let text = table(&["w1\t1\t100\tsp\tchr1\t1"]);
        let err = downsample(text.as_bytes(), &mut Vec::<u8>::new(), 2).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { line_number: 2, .. }));
    }

    #[test]
    fn test_non_numeric_value_fails() {
        let text = table(&["w1\t1\t100\tsp\tchr1\t1\t10", "w2\t101\t200\tsp\tchr1\tx\t20"]);
        let err = downsample(text.as_bytes(), &mut Vec::<u8>::new(), 2).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { line_number: 3, .. }));
    }

    #[test]
    fn test_empty_input() {
        assert!(run("", 3).is_empty());
    }

    #[test]
    fn test_zero_factor_is_rejected() {
        let mut out = Vec::new();
        let err = downsample(table(&["w1\t1\t100\tsp\tchr1\t1\t10"]).as_bytes(), &mut out, 0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(out.is_empty());
    }
}
