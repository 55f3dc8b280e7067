//! SampleStore (C6): optional persistence/reloading of generated samples
//! keyed by `(track, sample_id, isochore)`.
//!
//! The orchestrator treats presence in the store as authoritative: a loaded
//! sample is used verbatim and the sampler is not invoked for that key.

use crate::segment_list::SegmentList;
use rustc_hash::FxHashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait SampleStore: Send + Sync {
    fn has_sample(&self, track: &str, sample_id: usize, isochore: &str) -> bool;
    fn load(&self, track: &str, sample_id: usize, isochore: &str) -> Option<SegmentList>;
    fn save(&self, track: &str, sample_id: usize, isochore: &str, sample: &mut SegmentList);
}

/// Never reports a hit; `save` is a no-op. The default when no `cache` or
/// `sample_files` option is given.
#[derive(Debug, Default)]
pub struct Ephemeral;

impl SampleStore for Ephemeral {
    fn has_sample(&self, _track: &str, _sample_id: usize, _isochore: &str) -> bool {
        false
    }

    fn load(&self, _track: &str, _sample_id: usize, _isochore: &str) -> Option<SegmentList> {
        None
    }

    fn save(&self, _track: &str, _sample_id: usize, _isochore: &str, _sample: &mut SegmentList) {}
}

/// Content-addressed, explicit-key persistence under a cache directory.
/// Never evicts during a run.
pub struct CachedOnDisk {
    dir: PathBuf,
    /// In-memory index of keys already known to exist, to avoid a syscall
    /// per `has_sample` probe once a key has been seen this run.
    seen: Mutex<FxHashMap<String, bool>>,
}

impl CachedOnDisk {
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            seen: Mutex::new(FxHashMap::default()),
        })
    }

    fn key(track: &str, sample_id: usize, isochore: &str) -> String {
        format!("{track}__{sample_id}__{isochore}")
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.spans"))
    }
}

impl SampleStore for CachedOnDisk {
    fn has_sample(&self, track: &str, sample_id: usize, isochore: &str) -> bool {
        let key = Self::key(track, sample_id, isochore);
        if let Some(&hit) = self.seen.lock().unwrap().get(&key) {
            return hit;
        }
        let hit = self.path(&key).exists();
        self.seen.lock().unwrap().insert(key, hit);
        hit
    }

    fn load(&self, track: &str, sample_id: usize, isochore: &str) -> Option<SegmentList> {
        let key = Self::key(track, sample_id, isochore);
        let contents = fs::read_to_string(self.path(&key)).ok()?;
        let spans: Vec<(u64, u64)> = contents
            .lines()
            .filter_map(|line| {
                let mut parts = line.split('\t');
                let s: u64 = parts.next()?.parse().ok()?;
                let e: u64 = parts.next()?.parse().ok()?;
                Some((s, e))
            })
            .collect();
        Some(SegmentList::from_spans(spans))
    }

    fn save(&self, track: &str, sample_id: usize, isochore: &str, sample: &mut SegmentList) {
        let key = Self::key(track, sample_id, isochore);
        let mut int_buf = itoa::Buffer::new();
        let mut body = String::with_capacity(sample.counts() * 16);
        for &(s, e) in sample.spans() {
            body.push_str(int_buf.format(s));
            body.push('\t');
            body.push_str(int_buf.format(e));
            body.push('\n');
        }
        if fs::write(self.path(&key), body).is_ok() {
            self.seen.lock().unwrap().insert(key, true);
        }
    }
}

/// Read-only view backed by already-parsed sample-dump files (§6), matched
/// via a filename pattern where `%s` denotes the track name. Samples are
/// parsed once at construction into an in-memory index.
pub struct PreGeneratedFromFiles {
    samples: FxHashMap<String, SegmentList>,
}

impl PreGeneratedFromFiles {
    /// Parse `filenames` (one per track, as written by the sample-dump
    /// sink's `track name=<sample_id>` / `isochore\tstart\tend` format) into
    /// an in-memory `(track, sample_id, isochore) -> SegmentList` index.
    pub fn from_files(filenames: &[(String, PathBuf)]) -> io::Result<Self> {
        let mut samples: FxHashMap<String, Vec<(u64, u64)>> = FxHashMap::default();
        for (track, path) in filenames {
            let contents = fs::read_to_string(path)?;
            let mut current_sample: Option<String> = None;
            for line in contents.lines() {
                if let Some(rest) = line.strip_prefix("track name=") {
                    current_sample = Some(rest.trim().to_string());
                    continue;
                }
                let Some(sample_id) = &current_sample else {
                    continue;
                };
                let mut parts = line.split('\t');
                let (Some(isochore), Some(s), Some(e)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    continue;
                };
                let (Ok(s), Ok(e)) = (s.parse::<u64>(), e.parse::<u64>()) else {
                    continue;
                };
                let key = Self::key(track, sample_id, isochore);
                samples.entry(key).or_default().push((s, e));
            }
        }
        Ok(Self {
            samples: samples
                .into_iter()
                .map(|(k, v)| (k, SegmentList::from_spans(v)))
                .collect(),
        })
    }

    fn key(track: &str, sample_id: &str, isochore: &str) -> String {
        format!("{track}__{sample_id}__{isochore}")
    }

    /// Build a filename from an `output_samples_pattern`-style `%s`
    /// template and a track name, matching the original's regex
    /// construction (`re.sub("%s", track, pattern)`).
    pub fn resolve_pattern(pattern: &str, track: &str) -> PathBuf {
        PathBuf::from(pattern.replace("%s", track))
    }
}

impl SampleStore for PreGeneratedFromFiles {
    fn has_sample(&self, track: &str, sample_id: usize, isochore: &str) -> bool {
        let key = Self::key(track, &sample_id.to_string(), isochore);
        self.samples.contains_key(&key)
    }

    fn load(&self, track: &str, sample_id: usize, isochore: &str) -> Option<SegmentList> {
        let key = Self::key(track, &sample_id.to_string(), isochore);
        self.samples.get(&key).cloned()
    }

    fn save(&self, _track: &str, _sample_id: usize, _isochore: &str, _sample: &mut SegmentList) {
        // read-only store
    }
}

pub fn path_exists(path: &Path) -> bool {
    path.exists()
}
