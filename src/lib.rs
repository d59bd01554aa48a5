//! # Command line interface for gdatools
//! [gdatools command line interface, subcommands, and options.](cli::Commands)
//! # README for gdatools
#![doc = include_str!("../README.md")]
/// Bedgraph writing and splitting feature tables into bedgraph tracks.
pub mod bedgraph;
/// Command line interface for gdatools.
pub mod cli;
/// Windowed mean coverage from depth files and BAMs.
pub mod coverage;
/// Averaging rows of merged bedgraph tables.
pub mod downsample;
/// Error type shared by every stage.
pub mod error;
/// Functions for fastx files.
pub mod fastx;
/// GFF3 conversion and filtering.
pub mod gff;
/// k-mer composition deviation.
pub mod kmer;
/// Module for automatically reading a writing compressed or uncompressed files.
pub mod myio;
/// Fixed size windows over per-position values.
pub mod window;
