//! vcfstore: region handling and globally ordered record merging
//!
//! Usage: vcfstore <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;

use vcfstore_merge::bed::BedError;
use vcfstore_merge::genome::{ContigOffsets, Genome};
use vcfstore_merge::merge::{MergeCommand, MergeError, DEFAULT_ANCHOR_GAP};
use vcfstore_merge::record_heap::NodeType;
use vcfstore_merge::region::{Region, RegionError, RegionType};
use vcfstore_merge::vcf::VcfSource;
use vcfstore_merge::{config, logging, parallel};

#[derive(Parser)]
#[command(name = "vcfstore")]
#[command(version)]
#[command(about = "Region handling and globally ordered record merging for variant storage", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Only log errors (overridden by RUST_LOG)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Accept more than one pending record per sample in the merge heap
    /// instead of failing. Output order is then no longer guaranteed.
    #[arg(long, global = true)]
    allow_duplicate_pending: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, convert and globally sort regions
    Regions {
        /// Region string, NAME or NAME:START-END (repeatable)
        #[arg(short, long = "region")]
        regions: Vec<String>,

        /// Region file (.bed is 0-based half-open, otherwise 1-based CHROM POS [END])
        #[arg(short = 'R', long)]
        regions_file: Option<PathBuf>,

        /// Convention of --region strings: 0-inclusive, 0-half-open, 1-inclusive
        #[arg(long, default_value = "1-inclusive")]
        from: RegionType,

        /// Convention of printed regions
        #[arg(long, default_value = "1-inclusive")]
        to: RegionType,

        /// Genome file (chrom\tsize); when given, regions are sorted in genome order
        #[arg(short = 'g', long)]
        genome: Option<PathBuf>,
    },

    /// Merge single-sample VCFs into one position-ordered event stream
    Merge {
        /// Input VCF files; sample ids follow argument order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Genome file (chrom\tsize) defining contig order and offsets
        #[arg(short = 'g', long)]
        genome: PathBuf,

        /// Distance between anchors of long records (0 disables anchors)
        #[arg(long, default_value_t = DEFAULT_ANCHOR_GAP)]
        anchor_gap: u32,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print merge statistics to stderr
        #[arg(long)]
        stats: bool,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Bed(#[from] BedError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to initialize thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Too many input files: {0}")]
    TooManySamples(usize),
}

fn main() {
    let cli = Cli::parse();

    logging::init(logging::default_filter(cli.verbose, cli.quiet));

    // Must be set before any heap is built
    if cli.allow_duplicate_pending {
        config::set_strict_pending(false);
    }

    let result = parallel::init_thread_pool(cli.threads)
        .map_err(CliError::from)
        .and_then(|()| match cli.command {
            Commands::Regions {
                regions,
                regions_file,
                from,
                to,
                genome,
            } => run_regions(regions, regions_file, from, to, genome),

            Commands::Merge {
                inputs,
                genome,
                anchor_gap,
                output,
                stats,
            } => run_merge(inputs, genome, anchor_gap, output, stats),
        });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_offsets(genome_path: &Path) -> Result<ContigOffsets, CliError> {
    let genome = Genome::from_file(genome_path).map_err(|e| {
        BedError::InvalidFormat(format!("Failed to load genome file: {}", e))
    })?;
    debug!(
        "Loaded {} contigs from {}",
        genome.len(),
        genome_path.display()
    );
    Ok(genome.contig_offsets()?)
}

fn run_regions(
    region_strs: Vec<String>,
    regions_file: Option<PathBuf>,
    from: RegionType,
    to: RegionType,
    genome_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut regions = Vec::with_capacity(region_strs.len());
    for s in &region_strs {
        regions.push(Region::parse(s, from)?);
    }
    if let Some(path) = regions_file {
        let added = Region::parse_bed_file(&path, &mut regions)?;
        info!("Read {} regions from {}", added, path.display());
    }

    if let Some(ref gp) = genome_path {
        let offsets = load_offsets(gp)?;
        Region::sort(&offsets, &mut regions)?;
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for region in &regions {
        writeln!(out, "{}", region.to_string_as(to))?;
    }
    out.flush()?;
    Ok(())
}

fn run_merge(
    inputs: Vec<PathBuf>,
    genome_path: PathBuf,
    anchor_gap: u32,
    output: Option<PathBuf>,
    stats: bool,
) -> Result<(), CliError> {
    let offsets = load_offsets(&genome_path)?;

    let mut sources = Vec::with_capacity(inputs.len());
    for (idx, path) in inputs.iter().enumerate() {
        let sample_id = u32::try_from(idx).map_err(|_| CliError::TooManySamples(inputs.len()))?;
        sources.push(VcfSource::from_path(path, sample_id, &offsets)?);
    }
    let sample_names: Vec<String> = sources.iter().map(|s| s.sample_name().to_string()).collect();

    let sink: Box<dyn Write> = match output {
        Some(ref path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::with_capacity(256 * 1024, sink);
    let mut itoa_buf = itoa::Buffer::new();

    let cmd = MergeCommand::new().with_anchor_gap(anchor_gap);
    let merge_stats = cmd.run(&mut sources, |node| {
        let rec = &node.record;
        writer.write_all(itoa_buf.format(node.start_pos).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(itoa_buf.format(node.end_pos).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(sample_names[node.source].as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(match node.node_type {
            NodeType::Record => b"RECORD",
            NodeType::Anchor => b"ANCHOR",
        })?;
        writer.write_all(b"\t")?;
        writer.write_all(rec.chrom.as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(itoa_buf.format(rec.pos).as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(rec.id.as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(rec.ref_allele.as_bytes())?;
        writer.write_all(b"\t")?;
        writer.write_all(rec.alt.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    })?;
    writer.flush()?;

    info!(
        "Merged {} records from {} samples",
        merge_stats.records,
        sample_names.len()
    );
    if stats {
        eprintln!("Merge statistics:");
        eprintln!("  Samples:        {}", sample_names.len());
        eprintln!("  Records:        {}", merge_stats.records);
        eprintln!("  Anchors:        {}", merge_stats.anchors);
        eprintln!("  Events written: {}", merge_stats.events());
        eprintln!("  Max pending:    {}", merge_stats.max_pending);
    }

    Ok(())
}
