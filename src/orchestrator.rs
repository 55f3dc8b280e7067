//! SamplingOrchestrator (C7): drives N samples per track, aggregates
//! per-(track, annotation, counter) empirical null distributions.
//!
//! Two regimes, matching the original's `UnconditionalSampler` (implemented)
//! and `ConditionalSampler` (unimplemented upstream, §9 Open Question): when
//! the workspace generator is unconditional, one sample per `sample_id`
//! suffices for every annotation. When it is conditional, the restricted
//! workspace can depend on the annotation itself (`Conditional` with
//! `SegmentAndAnnotation`), so a fresh sample is drawn per
//! `(track, annotation)` pair instead of being shared.

use crate::collection::IntervalCollection;
use crate::context::{ProgressEvent, RunContext};
use crate::counter::Counter;
use crate::result::AnnotatorResult;
use crate::sample_store::SampleStore;
use crate::sampler::Sampler;
use crate::segment_list::SegmentList;
use crate::sinks::{SampleDumpSink, SampleStatsSink};
use crate::workspace::WorkspaceGenerator;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Mutex;

/// Run bookkeeping (§7): pairs considered, isochores skipped as empty,
/// samples served from the store, samples freshly drawn, and draws that
/// exhausted the sampler's retry budget.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counts {
    pub pairs: usize,
    pub skipped: usize,
    pub loaded: usize,
    pub sampled: usize,
    pub incomplete: usize,
}

impl Counts {
    fn merge(&mut self, other: Counts) {
        self.pairs += other.pairs;
        self.skipped += other.skipped;
        self.loaded += other.loaded;
        self.sampled += other.sampled;
        self.incomplete += other.incomplete;
    }
}

impl std::fmt::Display for Counts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pairs={} skipped={} loaded={} sampled={} incomplete={}",
            self.pairs, self.skipped, self.loaded, self.sampled, self.incomplete
        )
    }
}

/// Options controlling one orchestration run, mapping onto §6's recognized
/// configuration: `num_samples` and `pseudo_count` live here; sinks and the
/// sample store are passed in separately since they carry I/O handles.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub num_samples: usize,
    pub pseudo_count: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            num_samples: 1000,
            pseudo_count: 1.0,
        }
    }
}

/// One write destined for the sample-stats and/or sample-dump sinks,
/// queued by a rayon worker and drained by a single writer thread (§5: "a
/// single writer thread consuming a queue ... from workers is the
/// recommended discipline").
enum SinkEvent {
    Isochore { sample_id: usize, isochore: String, sample: SegmentList },
    Summary { sample_id: usize },
    Sample { sample_id: usize, isochore: String, sample: SegmentList },
}

/// Spawns the single writer thread owning both optional sinks and returns
/// the channel workers queue writes on, plus a join handle. `None` if
/// neither sink is configured, so callers skip the channel entirely.
fn spawn_sink_writer(
    stats_sink: Option<SampleStatsSink>,
    dump_sink: Option<SampleDumpSink>,
) -> Option<(crossbeam_channel::Sender<SinkEvent>, std::thread::JoinHandle<()>)> {
    if stats_sink.is_none() && dump_sink.is_none() {
        return None;
    }
    let (tx, rx) = crossbeam_channel::unbounded::<SinkEvent>();
    let handle = std::thread::spawn(move || {
        let mut stats_sink = stats_sink;
        let mut dump_sink = dump_sink;
        for event in rx {
            match event {
                SinkEvent::Isochore { sample_id, isochore, mut sample } => {
                    if let Some(sink) = stats_sink.as_mut() {
                        sink.write_isochore(sample_id, &isochore, &mut sample);
                    }
                }
                SinkEvent::Summary { sample_id } => {
                    if let Some(sink) = stats_sink.as_mut() {
                        sink.write_summary_row(sample_id);
                    }
                }
                SinkEvent::Sample { sample_id, isochore, mut sample } => {
                    if let Some(sink) = dump_sink.as_mut() {
                        sink.write_sample(sample_id, &isochore, &mut sample);
                    }
                }
            }
        }
        if let Some(sink) = stats_sink.as_mut() {
            let _ = sink.flush();
        }
        if let Some(sink) = dump_sink.as_mut() {
            let _ = sink.flush();
        }
    });
    Some((tx, handle))
}

/// `counter_index -> annotation -> null vector in sample_id order`.
type NullByAnnotation = Vec<rustc_hash::FxHashMap<String, Vec<f64>>>;

fn empty_null_by_annotation(num_counters: usize) -> NullByAnnotation {
    vec![rustc_hash::FxHashMap::default(); num_counters]
}

fn contig_map(collection: &IntervalCollection, track: &str) -> rustc_hash::FxHashMap<String, SegmentList> {
    collection.get(track).cloned().unwrap_or_default()
}

/// Collapses a possibly isochore-keyed (`contig@tag`) map down to plain
/// contig keys, unioning pieces that share a contig (via
/// [`IntervalCollection::from_isochores`]). A no-op, besides a clone, when
/// no key carries the isochore separator.
fn collapse_to_contigs(
    map: &rustc_hash::FxHashMap<String, SegmentList>,
) -> rustc_hash::FxHashMap<String, SegmentList> {
    let mut tmp = IntervalCollection::new();
    for (key, segs) in map {
        tmp.add("x", key.clone(), segs.clone());
    }
    contig_map(&tmp.from_isochores(), "x")
}

/// Compute observed counts for every (counter, track, annotation) triple up
/// front, applying the same workspace generator used during sampling so
/// observed and null are computed against the same restricted workspace.
///
/// Restriction happens at isochore grain (matching §4.3's per-isochore
/// stratification), but counting happens after collapsing each of
/// segs/annos/workspace back to contig grain — the same collapse-before-
/// count discipline §4.7 specifies for sampled draws, needed so a
/// non-additive counter (`NucleotideDensity`) sees the whole contig's
/// workspace mass rather than a per-isochore slice of it.
fn compute_observed(
    segments: &IntervalCollection,
    annotations: &IntervalCollection,
    workspace: &IntervalCollection,
    counters: &[Box<dyn Counter>],
    wsgen: &dyn WorkspaceGenerator,
) -> Vec<rustc_hash::FxHashMap<String, rustc_hash::FxHashMap<String, f64>>> {
    let mut out = vec![rustc_hash::FxHashMap::default(); counters.len()];
    let Some(ws_track) = workspace.tracks().next().cloned() else {
        return out;
    };

    for track in segments.tracks() {
        let seg_contigs = contig_map(segments, track);
        for annotation in annotations.tracks() {
            let anno_contigs = contig_map(annotations, annotation);
            let mut restricted_segs: rustc_hash::FxHashMap<String, SegmentList> = rustc_hash::FxHashMap::default();
            let mut restricted_annos: rustc_hash::FxHashMap<String, SegmentList> = rustc_hash::FxHashMap::default();
            let mut restricted_ws: rustc_hash::FxHashMap<String, SegmentList> = rustc_hash::FxHashMap::default();

            for (key, mut segs) in seg_contigs.clone() {
                let Some(mut ws) = workspace.get(&ws_track).and_then(|m| m.get(&key)).cloned() else {
                    continue;
                };
                let mut annos = anno_contigs.get(&key).cloned().unwrap_or_default();
                let restricted = wsgen.apply(&mut segs, &mut annos, &mut ws);
                restricted_segs.insert(key.clone(), restricted.segs);
                restricted_annos.insert(key.clone(), restricted.annos);
                restricted_ws.insert(key, restricted.workspace);
            }

            let segs_by_contig = collapse_to_contigs(&restricted_segs);
            let annos_by_contig = collapse_to_contigs(&restricted_annos);
            let ws_by_contig = collapse_to_contigs(&restricted_ws);

            let mut per_counter_sum = vec![0.0f64; counters.len()];
            for (contig, mut segs) in segs_by_contig {
                let mut annos = annos_by_contig.get(&contig).cloned().unwrap_or_default();
                let mut ws = ws_by_contig.get(&contig).cloned().unwrap_or_default();
                for (ci, counter) in counters.iter().enumerate() {
                    per_counter_sum[ci] += counter.count(&mut segs, &mut annos, &mut ws);
                }
            }

            for (ci, sum) in per_counter_sum.into_iter().enumerate() {
                out[ci]
                    .entry(track.clone())
                    .or_default()
                    .insert(annotation.clone(), sum);
            }
        }
    }
    out
}

/// Draw `num_samples` length-preserving resamples of `(segs, ws)` per
/// isochore key (already wsgen-restricted by the caller), collapse each
/// draw's isochore pieces back to contig space, and count every counter
/// against `anno_contigs`/`contig_ws` — both already at contig grain (see
/// [`collapse_to_contigs`]), matching [`compute_observed`]'s collapse so a
/// non-additive counter sees the whole contig's mass on both sides. Shared
/// by both the unconditional and conditional paths — the only difference
/// between them is what `segs`/`ws`/`anno_contigs`/`contig_ws` already had
/// applied before this was called.
#[allow(clippy::too_many_arguments)]
fn sample_and_count(
    track: &str,
    track_index: usize,
    segs: &rustc_hash::FxHashMap<String, SegmentList>,
    ws: &rustc_hash::FxHashMap<String, SegmentList>,
    anno_contigs: &rustc_hash::FxHashMap<String, SegmentList>,
    contig_ws: &rustc_hash::FxHashMap<String, SegmentList>,
    counters: &[Box<dyn Counter>],
    sampler: &dyn Sampler,
    store: &dyn SampleStore,
    ctx: &RunContext,
    sample_id_offset: usize,
    num_samples: usize,
    sink_tx: Option<&crossbeam_channel::Sender<SinkEvent>>,
) -> (NullByAnnotation, Counts) {
    let counts = Mutex::new(Counts::default());

    let per_sample: Vec<Vec<f64>> = (0..num_samples)
        .into_par_iter()
        .map(|local_id| {
            let sample_id = sample_id_offset + local_id;
            ctx.progress.report(ProgressEvent::SampleProgress {
                track,
                sample_id,
                num_samples,
            });
            let mut rng = SmallRng::seed_from_u64(ctx.seed_for(track_index as u64, sample_id as u64));
            let mut local_counts = Counts::default();
            let mut per_isochore_samples: Vec<(String, SegmentList)> = Vec::new();

            for (key, seg_list) in segs {
                local_counts.pairs += 1;
                let mut seg_clone = seg_list.clone();
                let Some(ws_list) = ws.get(key) else {
                    local_counts.skipped += 1;
                    continue;
                };
                let mut ws_clone = ws_list.clone();
                if ws_clone.is_empty() || seg_clone.is_empty() {
                    local_counts.skipped += 1;
                    continue;
                }

                let mut sample = if store.has_sample(track, sample_id, key) {
                    local_counts.loaded += 1;
                    store.load(track, sample_id, key).unwrap_or_default()
                } else {
                    local_counts.sampled += 1;
                    let outcome = sampler.sample(&mut seg_clone, &mut ws_clone, &mut rng);
                    if outcome.incomplete {
                        local_counts.incomplete += 1;
                    }
                    let mut drawn = outcome.sample;
                    store.save(track, sample_id, key, &mut drawn);
                    drawn
                };

                if let Some(tx) = sink_tx {
                    let _ = tx.send(SinkEvent::Sample {
                        sample_id,
                        isochore: key.clone(),
                        sample: sample.clone(),
                    });
                    let _ = tx.send(SinkEvent::Isochore {
                        sample_id,
                        isochore: key.clone(),
                        sample: sample.clone(),
                    });
                }

                per_isochore_samples.push((key.clone(), sample));
            }

            if let Some(tx) = sink_tx {
                let _ = tx.send(SinkEvent::Summary { sample_id });
            }

            let mut by_contig = IntervalCollection::new();
            for (key, sample) in per_isochore_samples {
                by_contig.add("sample", key, sample);
            }
            let collapsed = by_contig.from_isochores();
            let collapsed_contigs = contig_map(&collapsed, "sample");

            let totals: Vec<f64> = counters
                .iter()
                .map(|counter| {
                    let mut total = 0.0f64;
                    for (contig, sample) in &collapsed_contigs {
                        let mut sample_clone = sample.clone();
                        let mut anno_clone = anno_contigs.get(contig).cloned().unwrap_or_default();
                        let mut ws_for_contig = contig_ws.get(contig).cloned().unwrap_or_default();
                        total += counter.count(&mut sample_clone, &mut anno_clone, &mut ws_for_contig);
                    }
                    total
                })
                .collect();

            counts.lock().unwrap().merge(local_counts);
            totals
        })
        .collect();

    let mut null_by_annotation = empty_null_by_annotation(counters.len());
    for totals in per_sample {
        for (ci, value) in totals.into_iter().enumerate() {
            null_by_annotation[ci]
                .entry(String::new())
                .or_default()
                .push(value);
        }
    }

    (null_by_annotation, counts.into_inner().unwrap())
}

/// Drive sampling across all tracks (and, for conditional generators, all
/// annotations) and assemble the final `AnnotatorResult` table, per
/// §4.7/§4.8.
#[allow(clippy::too_many_arguments)]
pub fn run(
    segments: &IntervalCollection,
    annotations: &IntervalCollection,
    workspace: &IntervalCollection,
    counters: &[Box<dyn Counter>],
    wsgen: &dyn WorkspaceGenerator,
    sampler: &dyn Sampler,
    store: &dyn SampleStore,
    ctx: &RunContext,
    options: &RunOptions,
    reference: Option<&[AnnotatorResult]>,
    mut stats_sink: Option<SampleStatsSink>,
    mut dump_sink: Option<SampleDumpSink>,
) -> (Vec<AnnotatorResult>, Counts) {
    let observed = compute_observed(segments, annotations, workspace, counters, wsgen);

    let mut total_counts = Counts::default();
    // counter_index -> track -> annotation -> null vector
    let mut nulls: Vec<rustc_hash::FxHashMap<String, rustc_hash::FxHashMap<String, Vec<f64>>>> =
        vec![rustc_hash::FxHashMap::default(); counters.len()];

    let track_names: Vec<String> = segments.tracks().cloned().collect();
    let annotation_names: Vec<String> = annotations.tracks().cloned().collect();
    let Some(ws_track_name) = workspace.tracks().next().cloned() else {
        ctx.progress
            .report(ProgressEvent::Warning("no workspace track configured".to_string()));
        return (Vec::new(), total_counts);
    };

    let writer = spawn_sink_writer(stats_sink.take(), dump_sink.take());
    let sink_tx = writer.as_ref().map(|(tx, _)| tx);

    for (track_index, track) in track_names.iter().enumerate() {
        ctx.progress.report(ProgressEvent::TrackStarted {
            track,
            index: track_index,
            total: track_names.len(),
        });

        let seg_contigs = contig_map(segments, track);
        let raw_ws_contigs = contig_map(workspace, &ws_track_name);

        let total_ws: u64 = raw_ws_contigs.values().cloned().map(|mut s| s.sum()).sum();
        if total_ws == 0 || seg_contigs.is_empty() {
            ctx.progress
                .report(ProgressEvent::Warning(format!("empty workspace or segments for track {track}")));
            continue;
        }

        if !wsgen.is_conditional() {
            // Shared-sample path: restriction doesn't depend on annotation,
            // so one draw per sample_id serves every annotation. An
            // unconditional generator's contract is annotation-independent
            // (`annos' = annos`), so annotations are collapsed to contig
            // grain directly rather than routed through `wsgen.apply`.
            let mut restricted_segs = rustc_hash::FxHashMap::default();
            let mut restricted_ws = rustc_hash::FxHashMap::default();
            for (key, mut segs) in seg_contigs.clone() {
                let Some(mut ws) = raw_ws_contigs.get(&key).cloned() else {
                    continue;
                };
                let mut dummy_annos = SegmentList::new();
                let r = wsgen.apply(&mut segs, &mut dummy_annos, &mut ws);
                restricted_segs.insert(key.clone(), r.segs);
                restricted_ws.insert(key, r.workspace);
            }
            let contig_ws = collapse_to_contigs(&restricted_ws);
            let annotations_by_contig = annotations.from_isochores();

            let (per_annotation_null, track_counts) = sample_and_count_all_annotations(
                track,
                track_index,
                &restricted_segs,
                &restricted_ws,
                &contig_ws,
                &annotations_by_contig,
                &annotation_names,
                counters,
                sampler,
                store,
                ctx,
                options.num_samples,
                sink_tx,
            );
            total_counts.merge(track_counts);

            for (ci, map) in per_annotation_null.into_iter().enumerate() {
                nulls[ci].insert(track.clone(), map);
            }
        } else {
            // Per-annotation path: each annotation can induce a distinct
            // restricted workspace, so resample once per (track, annotation).
            for annotation in &annotation_names {
                let anno_contigs = contig_map(annotations, annotation);
                let mut restricted_segs = rustc_hash::FxHashMap::default();
                let mut restricted_ws = rustc_hash::FxHashMap::default();
                let mut restricted_annos = rustc_hash::FxHashMap::default();
                for (key, mut segs) in seg_contigs.clone() {
                    let Some(mut ws) = raw_ws_contigs.get(&key).cloned() else {
                        continue;
                    };
                    let mut annos = anno_contigs.get(&key).cloned().unwrap_or_default();
                    let r = wsgen.apply(&mut segs, &mut annos, &mut ws);
                    restricted_segs.insert(key.clone(), r.segs);
                    restricted_ws.insert(key.clone(), r.workspace);
                    restricted_annos.insert(key, r.annos);
                }
                let contig_ws = collapse_to_contigs(&restricted_ws);
                let contig_annos = collapse_to_contigs(&restricted_annos);

                let (null_for_pair, pair_counts) = sample_and_count(
                    track,
                    track_index,
                    &restricted_segs,
                    &restricted_ws,
                    &contig_annos,
                    &contig_ws,
                    counters,
                    sampler,
                    store,
                    ctx,
                    0,
                    options.num_samples,
                    sink_tx,
                );
                total_counts.merge(pair_counts);

                for (ci, map) in null_for_pair.into_iter().enumerate() {
                    let values = map.get("").cloned().unwrap_or_default();
                    nulls[ci]
                        .entry(track.clone())
                        .or_default()
                        .insert(annotation.clone(), values);
                }
            }
        }

        ctx.progress.report(ProgressEvent::TrackFinished { track });
    }

    // drop the sender so the writer thread's channel closes, then join it
    // to make sure every queued write lands before the sinks are reported
    // finished to the caller.
    if let Some((tx, handle)) = writer {
        drop(tx);
        let _ = handle.join();
    }

    let mut results = Vec::new();
    for (ci, counter) in counters.iter().enumerate() {
        for track in &track_names {
            let Some(per_track_observed) = observed[ci].get(track) else {
                continue;
            };
            for annotation in &annotation_names {
                let Some(&obs) = per_track_observed.get(annotation) else {
                    continue;
                };
                let samples = nulls[ci]
                    .get(track)
                    .and_then(|m| m.get(annotation))
                    .cloned()
                    .unwrap_or_default();

                // matches on track/annotation alone, not counter: the
                // reference table is loaded from a single counts-dump file
                // (one counter already) and carries no counter column,
                // mirroring the original's `ref = reference[track][annotation]`.
                let reference_result = reference
                    .and_then(|refs| refs.iter().find(|r| r.track == *track && r.annotation == *annotation));

                let result = if samples.is_empty() {
                    AnnotatorResult::empty(track.clone(), annotation.clone(), counter.name())
                } else {
                    AnnotatorResult::new(
                        track.clone(),
                        annotation.clone(),
                        counter.name(),
                        obs,
                        samples,
                        options.pseudo_count,
                        reference_result,
                    )
                };
                results.push(result);
            }
        }
    }

    // lexicographic order by (counter, track, annotation), §5 ordering
    // guarantee, regardless of sampling/scheduling order.
    results.sort_by(|a, b| {
        a.counter
            .cmp(&b.counter)
            .then(a.track.cmp(&b.track))
            .then(a.annotation.cmp(&b.annotation))
    });

    (results, total_counts)
}

/// Unconditional-path helper: draws one shared sample per `sample_id` (not
/// per annotation) and counts every annotation against it, so the null
/// vectors line up across annotations without redrawing.
#[allow(clippy::too_many_arguments)]
fn sample_and_count_all_annotations(
    track: &str,
    track_index: usize,
    segs: &rustc_hash::FxHashMap<String, SegmentList>,
    ws: &rustc_hash::FxHashMap<String, SegmentList>,
    contig_ws: &rustc_hash::FxHashMap<String, SegmentList>,
    annotations: &IntervalCollection,
    annotation_names: &[String],
    counters: &[Box<dyn Counter>],
    sampler: &dyn Sampler,
    store: &dyn SampleStore,
    ctx: &RunContext,
    num_samples: usize,
    sink_tx: Option<&crossbeam_channel::Sender<SinkEvent>>,
) -> (Vec<rustc_hash::FxHashMap<String, Vec<f64>>>, Counts) {
    let counts = Mutex::new(Counts::default());
    let anno_maps: Vec<rustc_hash::FxHashMap<String, SegmentList>> = annotation_names
        .iter()
        .map(|a| contig_map(annotations, a))
        .collect();

    let per_sample: Vec<Vec<Vec<f64>>> = (0..num_samples)
        .into_par_iter()
        .map(|sample_id| {
            ctx.progress.report(ProgressEvent::SampleProgress {
                track,
                sample_id,
                num_samples,
            });
            let mut rng = SmallRng::seed_from_u64(ctx.seed_for(track_index as u64, sample_id as u64));
            let mut local_counts = Counts::default();
            let mut per_isochore_samples: Vec<(String, SegmentList)> = Vec::new();

            for (key, seg_list) in segs {
                local_counts.pairs += 1;
                let mut seg_clone = seg_list.clone();
                let Some(ws_list) = ws.get(key) else {
                    local_counts.skipped += 1;
                    continue;
                };
                let mut ws_clone = ws_list.clone();
                if ws_clone.is_empty() || seg_clone.is_empty() {
                    local_counts.skipped += 1;
                    continue;
                }

                let mut sample = if store.has_sample(track, sample_id, key) {
                    local_counts.loaded += 1;
                    store.load(track, sample_id, key).unwrap_or_default()
                } else {
                    local_counts.sampled += 1;
                    let outcome = sampler.sample(&mut seg_clone, &mut ws_clone, &mut rng);
                    if outcome.incomplete {
                        local_counts.incomplete += 1;
                    }
                    let mut drawn = outcome.sample;
                    store.save(track, sample_id, key, &mut drawn);
                    drawn
                };

                if let Some(tx) = sink_tx {
                    let _ = tx.send(SinkEvent::Sample {
                        sample_id,
                        isochore: key.clone(),
                        sample: sample.clone(),
                    });
                    let _ = tx.send(SinkEvent::Isochore {
                        sample_id,
                        isochore: key.clone(),
                        sample: sample.clone(),
                    });
                }

                per_isochore_samples.push((key.clone(), sample));
            }

            if let Some(tx) = sink_tx {
                let _ = tx.send(SinkEvent::Summary { sample_id });
            }

            let mut by_contig = IntervalCollection::new();
            for (key, sample) in per_isochore_samples {
                by_contig.add("sample", key, sample);
            }
            let collapsed = by_contig.from_isochores();
            let collapsed_contigs = contig_map(&collapsed, "sample");

            let per_annotation_totals: Vec<Vec<f64>> = anno_maps
                .iter()
                .map(|anno_contigs| {
                    counters
                        .iter()
                        .map(|counter| {
                            let mut total = 0.0f64;
                            for (contig, sample) in &collapsed_contigs {
                                let mut sample_clone = sample.clone();
                                let mut anno_clone = anno_contigs.get(contig).cloned().unwrap_or_default();
                                let mut ws_for_contig = contig_ws.get(contig).cloned().unwrap_or_default();
                                total +=
                                    counter.count(&mut sample_clone, &mut anno_clone, &mut ws_for_contig);
                            }
                            total
                        })
                        .collect()
                })
                .collect();

            counts.lock().unwrap().merge(local_counts);
            per_annotation_totals
        })
        .collect();

    let mut null_by_annotation = vec![rustc_hash::FxHashMap::default(); counters.len()];
    for per_annotation_totals in per_sample {
        for (anno_idx, totals) in per_annotation_totals.into_iter().enumerate() {
            let annotation = &annotation_names[anno_idx];
            for (ci, value) in totals.into_iter().enumerate() {
                null_by_annotation[ci]
                    .entry(annotation.clone())
                    .or_insert_with(Vec::new)
                    .push(value);
            }
        }
    }

    (null_by_annotation, counts.into_inner().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SilentProgress;
    use crate::counter::NucleotideOverlap;
    use crate::sample_store::Ephemeral;
    use crate::sampler::SegmentLengthPreservingSampler;
    use crate::workspace::{Conditional, ConditionalFlavor, Unconditional};

    fn single_track_setup() -> (IntervalCollection, IntervalCollection, IntervalCollection) {
        let mut segments = IntervalCollection::new();
        segments.add("trackA", "chr1", SegmentList::from_spans(vec![(100, 110), (300, 320)]));

        let mut annotations = IntervalCollection::new();
        annotations.add("annoA", "chr1", SegmentList::from_spans(vec![(105, 115)]));

        let mut workspace = IntervalCollection::new();
        workspace.add("workspace", "chr1", SegmentList::from_spans(vec![(0, 1000)]));

        (segments, annotations, workspace)
    }

    #[test]
    fn scenario_s1_enrichment_within_tolerance() {
        let (segments, annotations, workspace) = single_track_setup();
        let counters: Vec<Box<dyn Counter>> = vec![Box::new(NucleotideOverlap)];
        let wsgen = Unconditional;
        let sampler = SegmentLengthPreservingSampler::new();
        let store = Ephemeral;
        let ctx = RunContext::new(1, 1.0).with_progress(SilentProgress);
        let options = RunOptions {
            num_samples: 2000,
            pseudo_count: 1.0,
        };

        let (results, counts) = run(
            &segments, &annotations, &workspace, &counters, &wsgen, &sampler, &store, &ctx,
            &options, None, None, None,
        );

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.observed, 5.0);
        assert!((r.expected - 3.0).abs() < 0.5, "expected ~3.0, got {}", r.expected);
        assert!(r.pvalue <= 0.5);
        assert!(counts.sampled > 0);
    }

    #[test]
    fn determinism_under_fixed_seed() {
        let (segments, annotations, workspace) = single_track_setup();
        let counters: Vec<Box<dyn Counter>> = vec![Box::new(NucleotideOverlap)];
        let wsgen = Unconditional;
        let sampler = SegmentLengthPreservingSampler::new();
        let store = Ephemeral;
        let options = RunOptions {
            num_samples: 200,
            pseudo_count: 1.0,
        };

        let ctx1 = RunContext::new(99, 1.0).with_progress(SilentProgress);
        let (r1, _) = run(
            &segments, &annotations, &workspace, &counters, &wsgen, &sampler, &store, &ctx1,
            &options, None, None, None,
        );

        let ctx2 = RunContext::new(99, 1.0).with_progress(SilentProgress);
        let (r2, _) = run(
            &segments, &annotations, &workspace, &counters, &wsgen, &sampler, &store, &ctx2,
            &options, None, None, None,
        );

        assert_eq!(r1.len(), r2.len());
        for (a, b) in r1.iter().zip(r2.iter()) {
            assert_eq!(a.samples, b.samples);
            assert_eq!(a.expected, b.expected);
            assert_eq!(a.pvalue, b.pvalue);
        }
    }

    #[test]
    fn skips_track_with_empty_workspace() {
        let mut segments = IntervalCollection::new();
        segments.add("trackA", "chr1", SegmentList::from_spans(vec![(0, 10)]));
        let annotations = IntervalCollection::new();
        let workspace = IntervalCollection::new(); // no workspace track at all

        let counters: Vec<Box<dyn Counter>> = vec![Box::new(NucleotideOverlap)];
        let wsgen = Unconditional;
        let sampler = SegmentLengthPreservingSampler::new();
        let store = Ephemeral;
        let ctx = RunContext::new(1, 1.0).with_progress(SilentProgress);
        let options = RunOptions {
            num_samples: 10,
            pseudo_count: 1.0,
        };

        let (results, _counts) = run(
            &segments, &annotations, &workspace, &counters, &wsgen, &sampler, &store, &ctx,
            &options, None, None, None,
        );
        assert!(results.is_empty());
    }

    #[test]
    fn conditional_workspace_collapses_to_empty_result() {
        let mut segments = IntervalCollection::new();
        segments.add("trackA", "chr1", SegmentList::from_spans(vec![(10, 20)]));
        let mut annotations = IntervalCollection::new();
        annotations.add("annoA", "chr1", SegmentList::from_spans(vec![(500, 520)]));
        let mut workspace = IntervalCollection::new();
        workspace.add("workspace", "chr1", SegmentList::from_spans(vec![(0, 1000)]));

        let counters: Vec<Box<dyn Counter>> = vec![Box::new(NucleotideOverlap)];
        let wsgen = Conditional::new(ConditionalFlavor::SegmentAndAnnotation);
        let sampler = SegmentLengthPreservingSampler::new();
        let store = Ephemeral;
        let ctx = RunContext::new(1, 1.0).with_progress(SilentProgress);
        let options = RunOptions {
            num_samples: 20,
            pseudo_count: 1.0,
        };

        let (results, _counts) = run(
            &segments, &annotations, &workspace, &counters, &wsgen, &sampler, &store, &ctx,
            &options, None, None, None,
        );

        assert_eq!(results.len(), 1);
        // segment and annotation never share a workspace component, so the
        // restricted workspace is empty and sampling is infeasible.
        assert_eq!(results[0].expected, 0.0);
    }

    /// `Write + Send` handle backed by a shared buffer, so a test can hand
    /// an owned sink to the writer thread and still inspect what it wrote.
    #[derive(Clone)]
    struct SharedBuf(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_writer_thread_drains_both_sinks_before_run_returns() {
        let (segments, annotations, workspace) = single_track_setup();
        let counters: Vec<Box<dyn Counter>> = vec![Box::new(NucleotideOverlap)];
        let wsgen = Unconditional;
        let sampler = SegmentLengthPreservingSampler::new();
        let store = Ephemeral;
        let ctx = RunContext::new(3, 1.0).with_progress(SilentProgress);
        let options = RunOptions {
            num_samples: 5,
            pseudo_count: 1.0,
        };

        let stats_buf = std::sync::Arc::new(Mutex::new(Vec::new()));
        let dump_buf = std::sync::Arc::new(Mutex::new(Vec::new()));
        let stats_sink = SampleStatsSink::new(Box::new(SharedBuf(stats_buf.clone()))).unwrap();
        let dump_sink = SampleDumpSink::new(Box::new(SharedBuf(dump_buf.clone())));

        let (results, _counts) = run(
            &segments,
            &annotations,
            &workspace,
            &counters,
            &wsgen,
            &sampler,
            &store,
            &ctx,
            &options,
            None,
            Some(stats_sink),
            Some(dump_sink),
        );
        assert_eq!(results.len(), 1);

        let stats_text = String::from_utf8(stats_buf.lock().unwrap().clone()).unwrap();
        assert!(stats_text.starts_with("sample\tisochore\tnsegments"));
        // one isochore row + one "all" summary row per sample_id
        assert_eq!(stats_text.lines().count(), 1 + 5 * 2);

        let dump_text = String::from_utf8(dump_buf.lock().unwrap().clone()).unwrap();
        for sample_id in 0..5 {
            assert!(dump_text.contains(&format!("track name={sample_id}")));
        }
    }
}
