use crate::error::{Error, Result};
use bio_types::strand::Strand;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};

lazy_static! {
    static ref ID_RE: Regex = Regex::new(r"ID=([^;]*)").unwrap();
    static ref PARENT_RE: Regex = Regex::new(r";Parent=([^;]*)").unwrap();
}

/// `##gff-version 3` followed by a `##sequence-region` line per sequence.
pub fn write_gff_header<W: Write>(out: &mut W, lengths: &[(String, usize)]) -> Result<()> {
    writeln!(out, "##gff-version 3")?;
    for (name, length) in lengths {
        writeln!(out, "##sequence-region {} 1 {}", name, length)?;
    }
    Ok(())
}

/// Convert the BED file written by tRNAscan into GFF3 `tRNA` features.
/// Returns the number of features written.
/// # Example
/// ```
/// let bed = "chr1\t99\t171\tchr1.tRNA1-LeuCAA\t64\t+\n";
/// let mut out = Vec::new();
/// gdatools::gff::trnascan_bed_to_gff(bed.as_bytes(), &mut out).unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "chr1\ttRNAscan\ttRNA\t100\t171\t64\t+\t.\tID=chr1.tRNA1-LeuCAA\n"
/// );
/// ```
pub fn trnascan_bed_to_gff<R: BufRead, W: Write>(reader: R, out: &mut W) -> Result<usize> {
    let mut n = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            return Err(Error::invalid_input(
                idx + 1,
                &line,
                "expected at least 6 BED fields",
            ));
        }
        let start = fields[1].parse::<u64>().map_err(|_| {
            Error::invalid_input(idx + 1, &line, "start must be a non-negative integer")
        })?;
        let strand = match fields[5] {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            "." => Strand::Unknown,
            _ => {
                return Err(Error::invalid_input(
                    idx + 1,
                    &line,
                    "strand must be +, - or .",
                ))
            }
        };
        writeln!(
            out,
            "{}\ttRNAscan\ttRNA\t{}\t{}\t{}\t{}\t.\tID={}",
            fields[0],
            start + 1,
            fields[2],
            fields[4],
            strand.strand_symbol(),
            fields[3]
        )?;
        n += 1;
    }
    out.flush()?;
    Ok(n)
}

/// A non-comment GFF line split into its columns.
fn gff_columns<'a>(line: &'a str, line_number: usize) -> Result<Option<Vec<&'a str>>> {
    if line.starts_with('#') || line.trim().is_empty() {
        return Ok(None);
    }
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < 9 {
        return Err(Error::invalid_input(
            line_number,
            line,
            format!("expected 9 GFF columns, found {}", columns.len()),
        ));
    }
    Ok(Some(columns))
}

fn attribute<'a>(re: &Regex, attributes: &'a str) -> Option<&'a str> {
    re.captures(attributes)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// IDs of CDS features whose parent is not an mRNA in the same file.
pub fn orphan_cds_ids(lines: &[String]) -> Result<HashSet<String>> {
    let mut mrna_ids = HashSet::new();
    let mut cds_parents: HashMap<String, Option<String>> = HashMap::new();
    let mut cds_order = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let columns = match gff_columns(line, idx + 1)? {
            Some(columns) => columns,
            None => continue,
        };
        let attributes = columns[8];
        match columns[2] {
            "CDS" => {
                let cds_id = attribute(&ID_RE, attributes).unwrap_or("").to_string();
                let parent = attribute(&PARENT_RE, attributes).map(|p| p.to_string());
                match cds_parents.get(&cds_id) {
                    Some(existing) if *existing != parent => {
                        return Err(Error::invalid_input(
                            idx + 1,
                            line,
                            format!(
                                "the same CDS ID ({}) appears to correspond to multiple parents ({} and {})",
                                cds_id,
                                existing.as_deref().unwrap_or("none"),
                                parent.as_deref().unwrap_or("none")
                            ),
                        ));
                    }
                    Some(_) => (),
                    None => {
                        cds_order.push(cds_id.clone());
                        cds_parents.insert(cds_id, parent);
                    }
                }
            }
            "mRNA" => {
                if let Some(id) = attribute(&ID_RE, attributes) {
                    mrna_ids.insert(id.to_string());
                }
            }
            _ => (),
        }
    }

    let mut orphans = HashSet::new();
    for cds_id in cds_order {
        let has_mrna_parent = cds_parents[&cds_id]
            .as_ref()
            .map_or(false, |p| mrna_ids.contains(p));
        if !has_mrna_parent {
            log::warn!("CDS {} does not appear to have an mRNA parent", cds_id);
            orphans.insert(cds_id);
        }
    }
    Ok(orphans)
}

/// Copy a GFF3, dropping CDS features whose parent is not an mRNA.
/// Returns the number of CDS lines removed.
pub fn remove_non_mrna_cds<R: BufRead, W: Write>(reader: R, out: &mut W) -> Result<usize> {
    let lines = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
    let orphans = orphan_cds_ids(&lines)?;

    let mut removed = 0;
    for (idx, line) in lines.iter().enumerate() {
        if let Some(columns) = gff_columns(line, idx + 1)? {
            if columns[2] == "CDS" {
                let cds_id = attribute(&ID_RE, columns[8]).unwrap_or("");
                if orphans.contains(cds_id) {
                    removed += 1;
                    continue;
                }
            }
        }
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    log::info!("Removed {} CDS lines", removed);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GFF: &str = "##gff-version 3\n\
        chr1\tsrc\tgene\t1\t90\t.\t+\t.\tID=gene1\n\
        chr1\tsrc\tmRNA\t1\t90\t.\t+\t.\tID=mrna1;Parent=gene1\n\
        chr1\tsrc\tCDS\t1\t90\t.\t+\t0\tID=cds1;Parent=mrna1\n\
        chr1\tsrc\ttRNA\t100\t170\t.\t+\t.\tID=trna1;Parent=gene2\n\
        chr1\tsrc\tCDS\t100\t170\t.\t+\t0\tID=cds2;Parent=trna1\n\
        chr1\tsrc\tCDS\t200\t260\t.\t+\t0\tID=cds2;Parent=trna1\n";

    #[test]
    fn test_orphan_cds_ids() {
        let lines: Vec<String> = GFF.lines().map(|l| l.to_string()).collect();
        let orphans = orphan_cds_ids(&lines).unwrap();
        assert_eq!(orphans.len(), 1);
        assert!(orphans.contains("cds2"));
    }

    #[test]
    fn test_remove_non_mrna_cds() {
        let mut out = Vec::new();
        let removed = remove_non_mrna_cds(GFF.as_bytes(), &mut out).unwrap();
        assert_eq!(removed, 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("ID=cds1;Parent=mrna1"));
        assert!(!text.contains("ID=cds2"));
    }

    #[test]
    fn test_conflicting_cds_parents_fail() {
        let gff = "chr1\tsrc\tCDS\t1\t9\t.\t+\t0\tID=cds1;Parent=a\n\
            chr1\tsrc\tCDS\t10\t19\t.\t+\t0\tID=cds1;Parent=b\n";
        let err = remove_non_mrna_cds(gff.as_bytes(), &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { line_number: 2, .. }));
    }

    #[test]
    fn test_trnascan_strand_and_fields() {
        let bed = "chr1\t0\t72\ttrna1\t40\t-\nchr2\t5\t80\ttrna2\t51.3\t+\textra\n";
        let mut out = Vec::new();
        let n = trnascan_bed_to_gff(bed.as_bytes(), &mut out).unwrap();
        assert_eq!(n, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "chr1\ttRNAscan\ttRNA\t1\t72\t40\t-\t.\tID=trna1");
        assert_eq!(lines[1], "chr2\ttRNAscan\ttRNA\t6\t80\t51.3\t+\t.\tID=trna2");
    }

    #[test]
    fn test_trnascan_bad_lines() {
        let short = "chr1\t0\t72\ttrna1\n";
        let err = trnascan_bed_to_gff(short.as_bytes(), &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { line_number: 1, .. }));

        for strand in ["x", "?", "+-"] {
            let bed = format!("chr1\t0\t72\ttrna1\t40\t{}\n", strand);
            let mut out = Vec::new();
            let err = trnascan_bed_to_gff(bed.as_bytes(), &mut out).unwrap_err();
            assert!(matches!(err, Error::InvalidInput { .. }));
            assert!(out.is_empty());
        }

        let unknown = "chr1\t0\t72\ttrna1\t40\t.\n";
        let mut out = Vec::new();
        trnascan_bed_to_gff(unknown.as_bytes(), &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\t40\t.\t.\t"));
    }

    #[test]
    fn test_gff_header() {
        let mut out = Vec::new();
        write_gff_header(&mut out, &[("chr1".to_string(), 1000), ("chr2".to_string(), 20)])
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "##gff-version 3\n##sequence-region chr1 1 1000\n##sequence-region chr2 1 20\n"
        );
    }
}
