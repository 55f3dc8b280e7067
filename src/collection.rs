//! `track -> contig -> SegmentList` maps, with isochore expansion/collapse.

use crate::segment_list::SegmentList;
use rustc_hash::FxHashMap;

/// Opaque categorical label partitioning the genome (by GC content or a
/// similar covariate). `IntervalCollection::to_isochores` intersects every
/// contig's segments against each isochore's region, producing synthetic
/// keys of the form `contig@isochore`.
pub type IsochoreTag = String;

/// A mapping from an isochore tag to the `SegmentList` of positions on a
/// contig that belong to that isochore.
pub type IsochoreMap = FxHashMap<String, FxHashMap<IsochoreTag, SegmentList>>;

const ISOCHORE_SEP: char = '@';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Contig,
    Isochore,
}

/// `track -> key -> SegmentList`, where `key` is a contig name or, after
/// [`IntervalCollection::to_isochores`], a synthetic `contig@isochore` key.
#[derive(Debug, Clone)]
pub struct IntervalCollection {
    tracks: FxHashMap<String, FxHashMap<String, SegmentList>>,
    view: View,
}

impl Default for IntervalCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl IntervalCollection {
    pub fn new() -> Self {
        Self {
            tracks: FxHashMap::default(),
            view: View::Contig,
        }
    }

    pub fn add(&mut self, track: impl Into<String>, contig: impl Into<String>, segs: SegmentList) {
        self.tracks
            .entry(track.into())
            .or_default()
            .insert(contig.into(), segs);
    }

    pub fn get(&self, track: &str) -> Option<&FxHashMap<String, SegmentList>> {
        self.tracks.get(track)
    }

    pub fn get_mut(&mut self, track: &str) -> Option<&mut FxHashMap<String, SegmentList>> {
        self.tracks.get_mut(track)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &String> {
        self.tracks.keys()
    }

    /// Keys present at the inner level across all tracks (contigs, or
    /// contig@isochore keys if expanded).
    pub fn keys(&self) -> Vec<String> {
        let mut set: Vec<String> = self
            .tracks
            .values()
            .flat_map(|m| m.keys().cloned())
            .collect();
        set.sort_unstable();
        set.dedup();
        set
    }

    pub fn is_conditional_view(&self) -> bool {
        self.view == View::Isochore
    }

    pub fn clone_deep(&self) -> IntervalCollection {
        self.clone()
    }

    pub fn counts(&mut self) -> usize {
        self.tracks
            .values_mut()
            .flat_map(|m| m.values_mut())
            .map(|s| s.counts())
            .sum()
    }

    pub fn sum(&mut self) -> u64 {
        self.tracks
            .values_mut()
            .flat_map(|m| m.values_mut())
            .map(|s| s.sum())
            .sum()
    }

    /// Intersect every contig's `SegmentList` against each isochore's region,
    /// producing synthetic `contig@isochore` keys. Pure set operation:
    /// `segs ∩ workspace_per_isochore`.
    pub fn to_isochores(&mut self, isochore_map: &IsochoreMap) -> IntervalCollection {
        let mut out = IntervalCollection {
            tracks: FxHashMap::default(),
            view: View::Isochore,
        };
        for (track, contigs) in &self.tracks {
            let mut out_contigs: FxHashMap<String, SegmentList> = FxHashMap::default();
            for (contig, segs) in contigs {
                let Some(isochores) = isochore_map.get(contig) else {
                    continue;
                };
                for (tag, region) in isochores {
                    let mut segs_clone = segs.clone();
                    let mut region_clone = region.clone();
                    let piece = segs_clone.intersect(&mut region_clone);
                    let key = format!("{contig}{ISOCHORE_SEP}{tag}");
                    out_contigs.insert(key, piece);
                }
            }
            out.tracks.insert(track.clone(), out_contigs);
        }
        out
    }

    /// Inverse of [`to_isochores`]: groups synthetic keys by their prefix
    /// before `@` and unions the `SegmentList`s back onto plain contig keys.
    pub fn from_isochores(&self) -> IntervalCollection {
        let mut out = IntervalCollection {
            tracks: FxHashMap::default(),
            view: View::Contig,
        };
        for (track, contigs) in &self.tracks {
            let mut out_contigs: FxHashMap<String, SegmentList> = FxHashMap::default();
            for (key, segs) in contigs {
                let contig = key.split(ISOCHORE_SEP).next().unwrap_or(key).to_string();
                let mut segs_clone = segs.clone();
                match out_contigs.get_mut(&contig) {
                    Some(existing) => {
                        let unioned = existing.union(&mut segs_clone);
                        *existing = unioned;
                    }
                    None => {
                        out_contigs.insert(contig, segs_clone);
                    }
                }
            }
            out.tracks.insert(track.clone(), out_contigs);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn isochore_map_for_chr1() -> IsochoreMap {
        let mut m: IsochoreMap = FxHashMap::default();
        let mut chr1: FxHashMap<String, SegmentList> = FxHashMap::default();
        chr1.insert("lo".to_string(), SegmentList::from_spans(vec![(0, 500)]));
        chr1.insert(
            "hi".to_string(),
            SegmentList::from_spans(vec![(500, 1000)]),
        );
        m.insert("chr1".to_string(), chr1);
        m
    }

    #[test]
    fn isochore_round_trip_preserves_bases() {
        let mut coll = IntervalCollection::new();
        coll.add("segs", "chr1", SegmentList::from_spans(vec![(400, 600)]));

        let isochores = isochore_map_for_chr1();
        let mut expanded = coll.to_isochores(&isochores);

        let lo = expanded
            .get_mut("segs")
            .unwrap()
            .get_mut("chr1@lo")
            .unwrap();
        assert_eq!(lo.spans().to_vec(), vec![(400, 500)]);

        let collapsed = expanded.from_isochores();
        let mut collapsed_segs = collapsed.get("segs").unwrap().get("chr1").unwrap().clone();
        let mut original_segs = coll.get("segs").unwrap().get("chr1").unwrap().clone();
        assert_eq!(collapsed_segs.sum(), original_segs.sum());
        assert_eq!(collapsed_segs.spans(), original_segs.spans());
    }

    #[test]
    fn keys_and_tracks_reflect_contents() {
        let mut coll = IntervalCollection::new();
        coll.add("a", "chr1", SegmentList::from_spans(vec![(0, 10)]));
        coll.add("b", "chr2", SegmentList::from_spans(vec![(0, 10)]));
        let mut tracks: Vec<&String> = coll.tracks().collect();
        tracks.sort();
        assert_eq!(tracks, vec!["a", "b"]);
        assert_eq!(coll.keys(), vec!["chr1".to_string(), "chr2".to_string()]);
    }
}
