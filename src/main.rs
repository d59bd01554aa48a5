use anyhow::{Context, Result};
use colored::Colorize;
use env_logger::{Builder, Target};
use gdatools::cli::Commands;
use gdatools::*;
use log::LevelFilter;
use std::io::{self, BufWriter};
use std::time::Instant;

fn main() -> Result<()> {
    parse_cli()
}

pub fn parse_cli() -> Result<()> {
    let pg_start = Instant::now();
    let args = cli::make_cli_parse();

    // set the logging level
    let min_log_level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new()
        .target(Target::Stderr)
        .filter(None, min_log_level)
        .init();

    log::debug!("DEBUG logging enabled");
    log::trace!("TRACE logging enabled");

    // set up number of threads to use globally
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("Failed to build the global thread pool")?;

    let command = match &args.command {
        Some(command) => command,
        None => return Ok(()),
    };
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match command {
        //
        // Run DepthToBedgraph
        //
        Commands::DepthToBedgraph {
            depth,
            title,
            chunk_size,
            no_header,
        } => {
            let reader = myio::reader(depth)?;
            let title = (!*no_header).then(|| title.as_str());
            coverage::depth_to_bedgraph(reader, &mut out, title, *chunk_size)
                .with_context(|| format!("Failed to convert {} to bedgraph", depth))?;
        }
        //
        // Run BamCoverage
        //
        Commands::BamCoverage {
            bam,
            title,
            chunk_size,
            min_mapq,
            no_header,
        } => {
            let title = (!*no_header).then(|| title.as_str());
            coverage::bam_coverage(bam, args.threads, *min_mapq, &mut out, title, *chunk_size)
                .with_context(|| format!("Failed to compute coverage from {}", bam))?;
        }
        //
        // Run KmerDeviation
        //
        Commands::KmerDeviation {
            fasta,
            chunk_size,
            kmer_size,
            no_header,
        } => {
            let reader = fastx::open_fastx(fasta)?;
            kmer::kmer_deviation_bedgraph(reader, &mut out, !*no_header, *chunk_size, *kmer_size)
                .with_context(|| format!("Failed to count k-mers in {}", fasta))?;
        }
        //
        // Run TsvToBedgraph
        //
        Commands::TsvToBedgraph {
            tsv,
            out_folder,
            fasta,
        } => {
            let paths = bedgraph::tsv_to_bedgraph(tsv, out_folder, fasta)
                .with_context(|| format!("Failed to split {} into bedgraph files", tsv))?;
            log::info!("Wrote {} bedgraph files to {}", paths.len(), out_folder);
        }
        //
        // Run Downsample
        //
        Commands::Downsample { tsv, factor } => {
            let reader = myio::reader(tsv)?;
            downsample::downsample(reader, &mut out, *factor)
                .with_context(|| format!("Failed to downsample {}", tsv))?;
        }
        //
        // Run ShortenHeaders
        //
        Commands::ShortenHeaders { fasta, delimiter } => {
            let reader = myio::reader(fasta)?;
            let n = fastx::shorten_fasta_headers(reader, &mut out, delimiter)?;
            log::info!("Shortened {} fasta headers", n);
        }
        //
        // Run TrnascanToGff
        //
        Commands::TrnascanToGff { fasta, bed } => {
            let lengths = fastx::sequence_lengths(fasta)
                .with_context(|| format!("Failed to read sequence lengths from {}", fasta))?;
            gff::write_gff_header(&mut out, &lengths)?;
            let reader = myio::reader(bed)?;
            gff::trnascan_bed_to_gff(reader, &mut out)
                .with_context(|| format!("Failed to convert {} to GFF3", bed))?;
        }
        //
        // Run FilterCds
        //
        Commands::FilterCds { gff: path } => {
            let reader = myio::reader(path)?;
            gff::remove_non_mrna_cds(reader, &mut out)
                .with_context(|| format!("Failed to filter CDS features in {}", path))?;
        }
    };

    let duration = pg_start.elapsed();
    log::info!(
        "{} done! Time elapsed: {}",
        command.name().bright_green().bold(),
        format!("{:.2?}", duration).bright_yellow().bold()
    );
    Ok(())
}
