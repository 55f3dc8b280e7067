#![allow(clippy::too_many_arguments)]

//! gat: genomic association tester.
//!
//! Tests observed overlap between a set of genomic segments and one or more
//! annotation tracks against an empirical null built by randomizing segment
//! placement within a workspace.

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process;

use gat_core::commands::run::write_results_table;
use gat_core::commands::{run_pipeline, RunConfig};
use gat_core::Result;

#[derive(Parser)]
#[command(name = "gat")]
#[command(author = "Manish Kumar Bobbili")]
#[command(version)]
#[command(about = "Genomic interval enrichment via Monte Carlo resampling", long_about = None)]
struct Cli {
    /// Boundary BED file of observed segments (a name column splits the file
    /// into per-name tracks)
    #[arg(short, long)]
    segments: PathBuf,

    /// Annotation BED file(s). A single BED4 file's name column splits into
    /// per-annotation tracks; multiple files each become one track named
    /// after the file stem.
    #[arg(short, long, num_args = 1..)]
    annotations: Vec<PathBuf>,

    /// Workspace BED file bounding where sampling may occur
    #[arg(short, long)]
    workspace: PathBuf,

    /// BED4 file partitioning the genome into isochores (name column is the
    /// isochore tag)
    #[arg(long)]
    isochores: Option<PathBuf>,

    /// Counter(s) to compute: nucleotide-overlap, segment-overlap,
    /// annotation-overlap, nucleotide-density
    #[arg(long, default_value = "nucleotide-overlap")]
    counter: Vec<String>,

    /// Workspace generator: unconditional, conditional,
    /// conditional-segment-only, segment-overlap, centered:<radius>,
    /// padded:<left>,<right>
    #[arg(long, default_value = "unconditional")]
    workspace_generator: String,

    /// Number of Monte Carlo samples per track
    #[arg(short = 'n', long, default_value = "1000")]
    num_samples: usize,

    /// Master RNG seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Pseudo-count used in fold-change and p-value computation
    #[arg(long, default_value = "1.0")]
    pseudo_count: f64,

    /// Directory to cache generated samples in across runs
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Pre-generated sample file(s), as `track=path`, read instead of sampling
    #[arg(long, value_parser = parse_sample_file, num_args = 1..)]
    sample_file: Vec<(String, PathBuf)>,

    /// Output pattern (with `%s` for track) to dump drawn samples to
    #[arg(long)]
    output_samples_pattern: Option<String>,

    /// Output pattern (with `%s` for counter name) to dump counts tables to
    #[arg(long)]
    output_counts_pattern: Option<String>,

    /// Path to write the sample-stats TSV to
    #[arg(long)]
    outfile_sample_stats: Option<PathBuf>,

    /// A prior counts-dump file to re-center this run's test against
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Multiple-testing correction method
    #[arg(long, default_value = "BH")]
    fdr: String,

    /// Number of worker threads to use (default: number of CPUs)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Suppress progress reporting on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn parse_sample_file(s: &str) -> std::result::Result<(String, PathBuf), String> {
    let (track, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected 'track=path', got '{s}'"))?;
    Ok((track.to_string(), PathBuf::from(path)))
}

fn main() {
    let cli = Cli::parse();

    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
            eprintln!("Error: failed to initialize thread pool: {e}");
            process::exit(1);
        }
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = RunConfig {
        segments: cli.segments,
        annotations: cli.annotations,
        workspace: cli.workspace,
        isochores: cli.isochores,
        counters: cli.counter,
        workspace_generator: cli.workspace_generator,
        num_samples: cli.num_samples,
        seed: cli.seed,
        pseudo_count: cli.pseudo_count,
        cache: cli.cache,
        sample_files: cli.sample_file,
        output_samples_pattern: cli.output_samples_pattern,
        output_counts_pattern: cli.output_counts_pattern,
        outfile_sample_stats: cli.outfile_sample_stats,
        reference: cli.reference,
        fdr: cli.fdr,
        quiet: cli.quiet,
    };

    let (results, counts) = run_pipeline(&config)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_results_table(&mut handle, &results)?;

    if !cli.quiet {
        eprintln!("{counts}");
    }

    Ok(())
}
