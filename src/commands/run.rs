//! Wires parsed CLI options onto the engine: loads boundary files into
//! [`IntervalCollection`]s, builds the counter/sampler/store/workspace-
//! generator trait objects, drives [`orchestrator::run`], applies FDR, and
//! writes the §6 output sinks.

use crate::bed;
use crate::collection::{IntervalCollection, IsochoreMap};
use crate::context::{RunContext, SilentProgress};
use crate::counter::{AnnotationOverlap, Counter, NucleotideDensity, NucleotideOverlap, SegmentOverlap as SegmentOverlapCounter};
use crate::error::{ConfigError, EngineError, Result};
use crate::fdr::{self, FdrMethod};
use crate::orchestrator::{self, Counts, RunOptions};
use crate::result::AnnotatorResult;
use crate::sample_store::{CachedOnDisk, Ephemeral, PreGeneratedFromFiles, SampleStore};
use crate::sampler::{Sampler, SegmentLengthPreservingSampler};
use crate::sinks::{self, SampleDumpSink, SampleStatsSink};
use crate::workspace::{
    Centered, Conditional, ConditionalFlavor, Padded, SegmentOverlap as SegmentOverlapWorkspace,
    Unconditional, WorkspaceGenerator,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Fully resolved configuration for one pipeline run, built from CLI flags.
pub struct RunConfig {
    pub segments: PathBuf,
    pub annotations: Vec<PathBuf>,
    pub workspace: PathBuf,
    pub isochores: Option<PathBuf>,
    pub counters: Vec<String>,
    pub workspace_generator: String,
    pub num_samples: usize,
    pub seed: u64,
    pub pseudo_count: f64,
    pub cache: Option<PathBuf>,
    pub sample_files: Vec<(String, PathBuf)>,
    pub output_samples_pattern: Option<String>,
    pub output_counts_pattern: Option<String>,
    pub outfile_sample_stats: Option<PathBuf>,
    pub reference: Option<PathBuf>,
    pub fdr: String,
    pub quiet: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            segments: PathBuf::new(),
            annotations: Vec::new(),
            workspace: PathBuf::new(),
            isochores: None,
            counters: vec!["nucleotide-overlap".to_string()],
            workspace_generator: "unconditional".to_string(),
            num_samples: 1000,
            seed: 0,
            pseudo_count: 1.0,
            cache: None,
            sample_files: Vec::new(),
            output_samples_pattern: None,
            output_counts_pattern: None,
            outfile_sample_stats: None,
            reference: None,
            fdr: "BH".to_string(),
            quiet: false,
        }
    }
}

fn build_counter(name: &str) -> Result<Box<dyn Counter>> {
    let counter: Box<dyn Counter> = match name {
        "nucleotide-overlap" => Box::new(NucleotideOverlap),
        "segment-overlap" => Box::new(SegmentOverlapCounter),
        "annotation-overlap" => Box::new(AnnotationOverlap),
        "nucleotide-density" => Box::new(NucleotideDensity),
        other => return Err(EngineError::Config(ConfigError::UnknownCounter(other.to_string()))),
    };
    Ok(counter)
}

fn build_workspace_generator(spec: &str) -> Result<Box<dyn WorkspaceGenerator>> {
    let (name, arg) = spec.split_once(':').unwrap_or((spec, ""));
    let wsgen: Box<dyn WorkspaceGenerator> = match name {
        "unconditional" => Box::new(Unconditional),
        "conditional" => Box::new(Conditional::new(ConditionalFlavor::SegmentAndAnnotation)),
        "conditional-segment-only" => Box::new(Conditional::new(ConditionalFlavor::SegmentOnly)),
        "segment-overlap" => Box::new(SegmentOverlapWorkspace),
        "centered" => {
            let radius: u64 = arg
                .parse()
                .map_err(|_| EngineError::Config(ConfigError::UnknownWorkspaceGenerator(spec.to_string())))?;
            Box::new(Centered { radius })
        }
        "padded" => {
            let (left, right) = arg
                .split_once(',')
                .ok_or_else(|| EngineError::Config(ConfigError::UnknownWorkspaceGenerator(spec.to_string())))?;
            let left: u64 = left
                .parse()
                .map_err(|_| EngineError::Config(ConfigError::UnknownWorkspaceGenerator(spec.to_string())))?;
            let right: u64 = right
                .parse()
                .map_err(|_| EngineError::Config(ConfigError::UnknownWorkspaceGenerator(spec.to_string())))?;
            Box::new(Padded { left, right })
        }
        other => return Err(EngineError::Config(ConfigError::UnknownWorkspaceGenerator(other.to_string()))),
    };
    Ok(wsgen)
}

fn track_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "annotation".to_string())
}

/// Turns a flat `tag -> contig -> SegmentList` [`IntervalCollection`] (as
/// produced by [`bed::load_multi_track`] over a BED4 isochore file, where
/// the name column holds the isochore tag) into the `contig -> tag ->
/// SegmentList` shape [`IntervalCollection::to_isochores`] expects.
fn build_isochore_map(by_tag: &IntervalCollection) -> IsochoreMap {
    let mut map: IsochoreMap = rustc_hash::FxHashMap::default();
    for tag in by_tag.tracks() {
        let Some(contigs) = by_tag.get(tag) else {
            continue;
        };
        for (contig, segs) in contigs {
            map.entry(contig.clone())
                .or_default()
                .insert(tag.clone(), segs.clone());
        }
    }
    map
}

/// Load a prior run's counts-dump as reference results. The counts-dump
/// format carries no counter column (it's one file per counter already), so
/// the counter is filled in as `"na"`, matching the original's `fromCounts`
/// placeholder — reference lookup matches on track/annotation alone.
fn load_reference(path: &Path) -> Result<Vec<AnnotatorResult>> {
    let file = File::open(path)?;
    let rows = sinks::read_counts_dump(BufReader::new(file))?;
    Ok(rows
        .into_iter()
        .map(|row| AnnotatorResult::new(row.track, row.annotation, "na", row.observed, row.samples, 1.0, None))
        .collect())
}

fn writer_for(path: &Path) -> Result<Box<dyn Write + Send>> {
    Ok(Box::new(BufWriter::new(File::create(path)?)))
}

/// Run the full enrichment pipeline: load inputs, sample, count, correct for
/// multiple testing, write output. Returns the assembled results and the run
/// bookkeeping counts (§7) for the caller to report.
pub fn run_pipeline(config: &RunConfig) -> Result<(Vec<AnnotatorResult>, Counts)> {
    if config.num_samples == 0 {
        return Err(EngineError::Config(ConfigError::ZeroSamples));
    }
    if config.pseudo_count <= 0.0 {
        return Err(EngineError::Config(ConfigError::NonPositivePseudoCount(config.pseudo_count)));
    }
    if !config.sample_files.is_empty() && config.output_samples_pattern.is_some() {
        return Err(EngineError::Config(ConfigError::SampleFilesWithoutPattern));
    }
    let fdr_method = FdrMethod::parse(&config.fdr)
        .ok_or_else(|| EngineError::Config(ConfigError::UnknownFdrMethod(config.fdr.clone())))?;

    let mut segments = IntervalCollection::new();
    bed::load_multi_track(&config.segments, "segments", &mut segments)?;

    let mut annotations = IntervalCollection::new();
    if config.annotations.len() == 1 {
        bed::load_multi_track(&config.annotations[0], "annotation", &mut annotations)?;
    } else {
        for path in &config.annotations {
            bed::load_into_collection(path, &track_name_for(path), &mut annotations)?;
        }
    }

    let mut workspace = IntervalCollection::new();
    bed::load_into_collection(&config.workspace, "workspace", &mut workspace)?;

    let (segments, annotations, workspace) = if let Some(isochore_path) = &config.isochores {
        let mut by_tag = IntervalCollection::new();
        bed::load_multi_track(isochore_path, "isochore", &mut by_tag)?;
        let isochore_map = build_isochore_map(&by_tag);
        let mut segments = segments;
        let mut annotations = annotations;
        let mut workspace = workspace;
        (
            segments.to_isochores(&isochore_map),
            annotations.to_isochores(&isochore_map),
            workspace.to_isochores(&isochore_map),
        )
    } else {
        (segments, annotations, workspace)
    };

    let counters: Vec<Box<dyn Counter>> = config
        .counters
        .iter()
        .map(|name| build_counter(name))
        .collect::<Result<_>>()?;
    let wsgen = build_workspace_generator(&config.workspace_generator)?;
    let sampler: Box<dyn Sampler> = Box::new(SegmentLengthPreservingSampler::new());

    let store: Box<dyn SampleStore> = if !config.sample_files.is_empty() {
        Box::new(PreGeneratedFromFiles::from_files(&config.sample_files)?)
    } else if let Some(dir) = &config.cache {
        Box::new(CachedOnDisk::new(dir.as_path())?)
    } else {
        Box::new(Ephemeral)
    };

    let mut ctx = RunContext::new(config.seed, config.pseudo_count);
    if config.quiet {
        ctx = ctx.with_progress(SilentProgress);
    }

    let reference = config.reference.as_deref().map(load_reference).transpose()?;

    let stats_sink = config
        .outfile_sample_stats
        .as_deref()
        .map(|p| writer_for(p).and_then(|w| SampleStatsSink::new(w).map_err(EngineError::from)))
        .transpose()?;
    let dump_sink = config
        .output_samples_pattern
        .as_deref()
        .map(|pattern| writer_for(Path::new(&pattern.replace("%s", "all"))).map(SampleDumpSink::new))
        .transpose()?;

    let options = RunOptions {
        num_samples: config.num_samples,
        pseudo_count: config.pseudo_count,
    };

    let (mut results, counts) = orchestrator::run(
        &segments,
        &annotations,
        &workspace,
        &counters,
        wsgen.as_ref(),
        sampler.as_ref(),
        store.as_ref(),
        &ctx,
        &options,
        reference.as_deref(),
        stats_sink,
        dump_sink,
    );

    fdr::apply(&mut results, fdr_method);

    if let Some(pattern) = &config.output_counts_pattern {
        let mut by_counter: std::collections::BTreeMap<String, Vec<AnnotatorResult>> = std::collections::BTreeMap::new();
        for r in results.iter().cloned() {
            by_counter.entry(r.counter.clone()).or_default().push(r);
        }
        for (counter, rows) in by_counter {
            let path = PathBuf::from(pattern.replace("%s", &counter));
            let mut file = File::create(&path)?;
            sinks::write_counts_dump(&mut file, &rows)?;
        }
    }

    Ok((results, counts))
}

/// Writes the final result table to `writer` as a tab-separated file with a
/// header, one row per `AnnotatorResult`, matching the original's
/// `.tsv` report format.
pub fn write_results_table(writer: &mut dyn Write, results: &[AnnotatorResult]) -> Result<()> {
    writeln!(
        writer,
        "track\tannotation\tcounter\tobserved\texpected\tCI95low\tCI95high\tstddev\tfold\tp\tqvalue"
    )?;
    for r in results {
        writeln!(
            writer,
            "{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4e}\t{}",
            r.track,
            r.annotation,
            r.counter,
            r.observed,
            r.expected,
            r.lower95,
            r.upper95,
            r.stddev,
            r.fold,
            r.pvalue,
            r.qvalue.map(|q| format!("{q:.4e}")).unwrap_or_else(|| "NA".to_string())
        )?;
    }
    Ok(())
}
