use crate::error::{Error, Result};
use crate::myio;
use crate::window::WindowResult;
use num_format::{Locale, ToFormattedString};
use rayon::prelude::*;
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

/// The `track` line that starts a bedgraph file.
/// # Example
/// ```
/// let header = gdatools::bedgraph::track_header("coverage");
/// assert!(header.starts_with("track type=bedGraph name=\"coverage\" description=\"coverage\""));
/// ```
pub fn track_header(title: &str) -> String {
    format!(
        "track type=bedGraph name=\"{}\" description=\"{}\" visibility=full color=0,0,255 altColor=0,100,200 priority=20",
        title, title
    )
}

/// Write the optional header and then every window, stopping at the first error.
/// Returns the number of windows written.
pub fn write_windows<W, I>(out: &mut W, title: Option<&str>, windows: I) -> Result<usize>
where
    W: Write,
    I: Iterator<Item = Result<WindowResult<f64>>>,
{
    if let Some(title) = title {
        writeln!(out, "{}", track_header(title))?;
    }
    let mut n = 0;
    for window in windows {
        writeln!(out, "{}", window?)?;
        n += 1;
    }
    out.flush()?;
    log::info!("Wrote {} windows", n.to_formatted_string(&Locale::en));
    Ok(n)
}

/// A tab separated feature table with `scaffold`, `start_pos` and `end_pos` columns.
#[derive(Debug)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    scaffold: usize,
    start: usize,
    end: usize,
}

impl FeatureTable {
    pub fn from_reader<R: BufRead>(reader: R) -> Result<FeatureTable> {
        let mut lines = reader.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::invalid_input(1, "", "missing header line")),
        };
        let columns: Vec<String> = header.split('\t').map(|c| c.to_string()).collect();
        let find = |name: &str| {
            columns.iter().position(|c| c == name).ok_or_else(|| {
                Error::InvalidConfig(format!("feature table has no '{}' column", name))
            })
        };
        let scaffold = find("scaffold")?;
        let start = find("start_pos")?;
        let end = find("end_pos")?;

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let line = line?;
            let row: Vec<String> = line.split('\t').map(|c| c.to_string()).collect();
            if row.len() != columns.len() {
                return Err(Error::invalid_input(
                    idx + 2,
                    &line,
                    format!("expected {} columns, found {}", columns.len(), row.len()),
                ));
            }
            rows.push(row);
        }
        log::debug!("Read {} feature table rows", rows.len());
        Ok(FeatureTable {
            columns,
            rows,
            scaffold,
            start,
            end,
        })
    }

    /// Indexes of the feature columns, every column after the first three.
    pub fn feature_columns(&self) -> std::ops::Range<usize> {
        3.min(self.columns.len())..self.columns.len()
    }

    /// Write one bedgraph track for a feature column, skipping non-numeric cells.
    /// Returns the number of data lines written.
    pub fn write_track<W: Write>(&self, column: usize, out: &mut W) -> Result<usize> {
        let name = &self.columns[column];
        writeln!(out, "{}", track_header(name))?;
        let mut n = 0;
        for row in &self.rows {
            let value = &row[column];
            if value.trim().parse::<f64>().is_err() {
                log::warn!(
                    "Non-numeric value encountered ({}): {}",
                    name,
                    row.join("\t")
                );
                continue;
            }
            let scaffold = row[self.scaffold].split_whitespace().next().unwrap_or("");
            writeln!(
                out,
                "{} {} {} {}",
                scaffold, row[self.start], row[self.end], value
            )?;
            n += 1;
        }
        out.flush()?;
        Ok(n)
    }
}

/// File name up to its first `.`, e.g. `asm` for `/data/asm.v2.fa.gz`.
/// # Example
/// ```
/// assert_eq!(gdatools::bedgraph::file_basename("/data/asm.v2.fa.gz"), "asm");
/// ```
pub fn file_basename(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}

/// Split a feature table into one `<basename>_<column>.bedgraph` file per feature column.
/// Returns the paths written.
pub fn tsv_to_bedgraph(table: &str, out_folder: &str, fasta: &str) -> Result<Vec<String>> {
    let table = FeatureTable::from_reader(myio::reader(table)?)?;
    fs::create_dir_all(out_folder)?;
    let basename = file_basename(fasta);

    table
        .feature_columns()
        .into_par_iter()
        .map(|column| -> Result<String> {
            let path = Path::new(out_folder)
                .join(format!("{}_{}.bedgraph", basename, table.columns[column]))
                .to_string_lossy()
                .to_string();
            let mut out = myio::writer(&path)?;
            let n = table.write_track(column, &mut out)?;
            log::info!(
                "Wrote {} lines to {}",
                n.to_formatted_string(&Locale::en),
                path
            );
            Ok(path)
        })
        .collect()
}
