use crate::bedgraph;
use crate::error::{Error, Result};
use crate::fastx::FastaBases;
use crate::window::{Reduction, Window, WindowReducer};
use bio::alphabets::dna::revcomp;
use needletail::FastxReader;
use std::collections::BTreeMap;
use std::io::Write;

/// Expected frequency of each nucleotide given the GC content of a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Background {
    pub at: f64,
    pub gc: f64,
}

impl Background {
    /// GC ratio over the A/C/G/T bases of `seq`, split evenly between G and C
    /// (and the rest between A and T). `None` if there are no A/C/G/T bases.
    /// # Example
    /// ```
    /// use gdatools::kmer::Background;
    /// let bg = Background::from_seq(b"GGCA").unwrap();
    /// assert_eq!(bg.frequency(b'G'), 0.375);
    /// assert_eq!(bg.frequency(b'A'), 0.125);
    /// assert!(Background::from_seq(b"NNNN").is_none());
    /// ```
    pub fn from_seq(seq: &[u8]) -> Option<Background> {
        let (mut at, mut gc) = (0_usize, 0_usize);
        for base in seq {
            match base.to_ascii_uppercase() {
                b'A' | b'T' => at += 1,
                b'G' | b'C' => gc += 1,
                _ => (),
            }
        }
        let total = at + gc;
        if total == 0 {
            return None;
        }
        let gc_ratio = gc as f64 / total as f64;
        Some(Background {
            at: (1.0 - gc_ratio) / 2.0,
            gc: gc_ratio / 2.0,
        })
    }

    pub fn frequency(&self, base: u8) -> f64 {
        match base {
            b'A' | b'T' => self.at,
            b'G' | b'C' => self.gc,
            _ => 0.0,
        }
    }

    /// Chance of seeing a canonical k-mer: the product of its base
    /// frequencies, doubled for the two strands.
    pub fn kmer_likelihood(&self, kmer: &[u8]) -> f64 {
        kmer.iter().map(|b| self.frequency(*b)).product::<f64>() * 2.0
    }
}

/// Count canonical k-mers (the smaller of a k-mer and its reverse complement).
/// K-mers with anything other than A/C/G/T are not counted.
/// # Example
/// ```
/// let counts = gdatools::kmer::count_canonical_kmers(b"acgt", 2);
/// assert_eq!(counts[&b"AC"[..]], 2);
/// assert_eq!(counts[&b"CG"[..]], 1);
/// ```
pub fn count_canonical_kmers(seq: &[u8], kmer_size: usize) -> BTreeMap<Vec<u8>, u64> {
    let mut counts = BTreeMap::new();
    if kmer_size == 0 {
        return counts;
    }
    let seq = seq.to_ascii_uppercase();
    for kmer in seq.windows(kmer_size) {
        if !kmer.iter().all(|b| matches!(*b, b'A' | b'C' | b'G' | b'T')) {
            continue;
        }
        let rc = revcomp(kmer);
        let canonical = if rc.as_slice() < kmer { rc } else { kmer.to_vec() };
        *counts.entry(canonical).or_insert(0) += 1;
    }
    counts
}

/// Sum of |observed - expected| over the distinct canonical k-mers of a chunk,
/// or `None` for chunks no longer than `kmer_size` or without A/C/G/T bases.
pub fn kmer_deviation(seq: &[u8], kmer_size: usize) -> Option<f64> {
    if seq.len() <= kmer_size {
        return None;
    }
    let background = Background::from_seq(seq)?;
    let counts = count_canonical_kmers(seq, kmer_size);
    let total: u64 = counts.values().sum();
    let deviation: f64 = counts
        .iter()
        .map(|(kmer, observed)| {
            let expected = background.kmer_likelihood(kmer) * total as f64;
            (*observed as f64 - expected).abs()
        })
        .sum();
    Some(deviation)
}

/// Composition deviation of the bases in a window.
#[derive(Debug, Clone, Copy)]
pub struct KmerDeviation {
    kmer_size: usize,
}

impl KmerDeviation {
    pub fn new(kmer_size: usize) -> Result<Self> {
        if kmer_size == 0 {
            return Err(Error::InvalidConfig(
                "k-mer size must be at least 1".to_string(),
            ));
        }
        Ok(KmerDeviation { kmer_size })
    }
}

impl Reduction for KmerDeviation {
    type Value = u8;
    type Output = f64;

    fn reduce(&self, window: &Window<u8>) -> Option<f64> {
        let deviation = kmer_deviation(window.values(), self.kmer_size);
        if deviation.is_none() {
            log::trace!(
                "Skipping {}:{}-{}, too short or no A/C/G/T",
                window.sequence_id(),
                window.start(),
                window.end()
            );
        }
        deviation
    }
}

/// Track name used for the k-mer deviation bedgraph.
pub fn track_title(kmer_size: usize) -> String {
    format!("kmer_deviation_kmer_size_{}", kmer_size)
}

/// k-mer composition deviation in fixed size chunks of every sequence, written as bedgraph.
pub fn kmer_deviation_bedgraph<W: Write>(
    reader: Box<dyn FastxReader>,
    out: &mut W,
    header: bool,
    chunk_size: usize,
    kmer_size: usize,
) -> Result<usize> {
    let reduction = KmerDeviation::new(kmer_size)?;
    let windows = WindowReducer::new(FastaBases::new(reader), reduction, chunk_size)?;
    let title = track_title(kmer_size);
    bedgraph::write_windows(out, header.then(|| title.as_str()), windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use needletail::parse_fastx_reader;
    use std::io::Cursor;

    fn run(fasta: &str, chunk_size: usize, kmer_size: usize) -> Vec<String> {
        let reader = parse_fastx_reader(Cursor::new(fasta.as_bytes().to_vec())).unwrap();
        let mut out = Vec::new();
        kmer_deviation_bedgraph(reader, &mut out, false, chunk_size, kmer_size).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_homopolymer_deviation() {
        // AA x3, expected 0.5 * 0.5 * 2 * 3 = 1.5
        assert_eq!(kmer_deviation(b"AAAA", 2), Some(1.5));
    }

    #[test]
    fn test_balanced_deviation() {
        // AC x2 (AC + GT), CG x1; every k-mer expected 0.125 * 3
        assert_eq!(kmer_deviation(b"ACGT", 2), Some(2.25));
    }

    #[test]
    fn test_lowercase_matches_uppercase() {
        assert_eq!(
            kmer_deviation(b"acgtTTgca", 3),
            kmer_deviation(b"ACGTTTGCA", 3)
        );
    }

    #[test]
    fn test_reverse_complement_gives_same_deviation() {
        let seq = b"ATGCGGATTACAGGCTTA";
        let rc = revcomp(&seq[..]);
        assert_eq!(kmer_deviation(seq, 3), kmer_deviation(&rc, 3));
    }

    #[test]
    fn test_degenerate_chunks_are_skipped() {
        assert_eq!(kmer_deviation(b"ACG", 3), None);
        assert_eq!(kmer_deviation(b"ACGT", 4), None);
        assert_eq!(kmer_deviation(b"NNNNNNNN", 3), None);
    }

    #[test]
    fn test_n_kmers_are_not_counted() {
        let counts = count_canonical_kmers(b"AANAA", 2);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&b"AA"[..]], 2);
    }

    #[test]
    fn test_chunks_restart_per_sequence() {
        let out = run(">s1 desc\nAAAAAAAAAC\n>s2\nAAAA\n>s3\nNNNNNN\n", 4, 2);
        assert_eq!(
            out,
            vec!["s1 0 4 1.5", "s1 4 8 1.5", "s2 0 4 1.5"],
            "s1:8-10 and s3 are skipped"
        );
    }

    #[test]
    fn test_header_title() {
        let reader = parse_fastx_reader(Cursor::new(b">a\nACGTACGT\n".to_vec())).unwrap();
        let mut out = Vec::new();
        let n = kmer_deviation_bedgraph(reader, &mut out, true, 5000, 3).unwrap();
        assert_eq!(n, 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("track type=bedGraph name=\"kmer_deviation_kmer_size_3\""));
        assert!(text.lines().nth(1).unwrap().starts_with("a 0 8 "));
    }

    #[test]
    fn test_zero_kmer_size_is_rejected() {
        assert!(matches!(KmerDeviation::new(0), Err(Error::InvalidConfig(_))));
    }
}
