use clap::{AppSettings, CommandFactory, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    propagate_version = true,
    subcommand_required = true,
    infer_subcommands = true,
    arg_required_else_help = true,
    help_expected = true
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
pub struct Cli {
    /// Threads for BAM decompression and writing per-feature files.
    #[clap(short, long, default_value_t = 8)]
    pub threads: usize,

    /// Logging level [-v: Info, -vv: Debug, -vvv: Trace].
    #[clap(short, long, parse(from_occurrences), help_heading = "DEBUG")]
    pub verbose: usize,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

///
/// This structure contains all the subcommands for gdatools and their help descriptions.
///
/// Because of naming conventions for rust enums the commands names have
/// different capitalization than on the command line.
/// For example, the `DepthToBedgraph` enum is invoked using `gdatools depth-to-bedgraph`.
///
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mean coverage of fixed length chunks of scaffolds from `samtools depth` output, as bedgraph.
    ///
    /// Positions in the depth file are 1-based; bedgraph intervals are 0-based and half-open.
    /// Windows never span two scaffolds, and the last window of a scaffold may be shorter than the chunk size.
    #[clap(visible_aliases = &["depth2bg", "d2b"])]
    DepthToBedgraph {
        /// SAMtools depth file (optionally gzipped).
        depth: String,
        /// Title for the bedgraph header.
        title: String,
        /// Chunk size (sliding window step size) in base pairs.
        #[clap(short, long, default_value_t = 5000)]
        chunk_size: usize,
        /// Do not write the bedgraph track line.
        #[clap(short, long)]
        no_header: bool,
    },
    /// Mean coverage of fixed length chunks of scaffolds computed directly from a sorted BAM, as bedgraph.
    ///
    /// Every base of every reference sequence is reported, including zero coverage.
    /// Unmapped, secondary, supplementary, QC failed and duplicate reads are ignored.
    #[clap(visible_aliases = &["bamcov", "bc"])]
    BamCoverage {
        /// Coordinate sorted sam/bam/cram file.
        bam: String,
        /// Title for the bedgraph header.
        title: String,
        /// Chunk size (sliding window step size) in base pairs.
        #[clap(short, long, default_value_t = 5000)]
        chunk_size: usize,
        /// Minimum mapping quality of reads counted towards depth.
        #[clap(short, long, default_value_t = 60)]
        min_mapq: u8,
        /// Do not write the bedgraph track line.
        #[clap(short, long)]
        no_header: bool,
    },
    /// k-mer composition deviation in fixed length chunks of each sequence, as bedgraph.
    ///
    /// For each chunk canonical k-mers are counted and compared to the counts expected
    /// from the chunk's GC content. The reported value is the sum of absolute differences.
    /// Chunks no longer than the k-mer size or without A/C/G/T bases are skipped.
    #[clap(visible_aliases = &["kmer", "kd"])]
    KmerDeviation {
        /// Assembly fasta file.
        #[clap(default_value = "-")]
        fasta: String,
        /// Chunk size (sliding window step size) in base pairs.
        #[clap(short, long, default_value_t = 5000)]
        chunk_size: usize,
        /// k-mer size.
        #[clap(short, long, default_value_t = 3)]
        kmer_size: usize,
        /// Do not write the bedgraph track line.
        #[clap(short, long)]
        no_header: bool,
    },
    /// Split a table of sliding window features into one bedgraph file per feature.
    ///
    /// The table must have `scaffold`, `start_pos` and `end_pos` columns; every column after the
    /// third is a feature. Rows with non-numeric values are skipped with a warning.
    #[clap(visible_aliases = &["tsv2bg", "t2b"])]
    TsvToBedgraph {
        /// Tab separated feature table.
        tsv: String,
        /// Folder for the output bedgraph files.
        out_folder: String,
        /// Assembly fasta file, used to name the output files.
        fasta: String,
    },
    /// Downsample a merged bedgraph table by averaging consecutive rows of each scaffold.
    #[clap(visible_aliases = &["ds"])]
    Downsample {
        /// Merged table: window name, start, end, species, scaffold, then feature columns.
        #[clap(default_value = "-")]
        tsv: String,
        /// Number of rows to merge into one.
        #[clap(short, long)]
        factor: usize,
    },
    /// Shorten fasta headers to the text before the first delimiter.
    #[clap(visible_aliases = &["shorten", "sh"])]
    ShortenHeaders {
        /// Input fasta file.
        #[clap(default_value = "-")]
        fasta: String,
        /// Delimiter for splitting fasta headers.
        #[clap(short, long, default_value = " ")]
        delimiter: String,
    },
    /// Convert a tRNAscan BED file into GFF3.
    #[clap(visible_aliases = &["trna2gff"])]
    TrnascanToGff {
        /// Assembly fasta file, used for the sequence-region header lines.
        fasta: String,
        /// tRNAscan output BED file.
        bed: String,
    },
    /// Remove CDS features whose parent feature is not an mRNA from a GFF3.
    #[clap(visible_aliases = &["fcds"])]
    FilterCds {
        /// Input GFF3 file.
        #[clap(default_value = "-")]
        gff: String,
    },
}

impl Commands {
    /// Name of the subcommand as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::DepthToBedgraph { .. } => "depth-to-bedgraph",
            Commands::BamCoverage { .. } => "bam-coverage",
            Commands::KmerDeviation { .. } => "kmer-deviation",
            Commands::TsvToBedgraph { .. } => "tsv-to-bedgraph",
            Commands::Downsample { .. } => "downsample",
            Commands::ShortenHeaders { .. } => "shorten-headers",
            Commands::TrnascanToGff { .. } => "trnascan-to-gff",
            Commands::FilterCds { .. } => "filter-cds",
        }
    }
}

pub fn make_cli_parse() -> Cli {
    Cli::parse()
}

pub fn make_cli_app() -> clap::Command<'static> {
    Cli::command()
}
