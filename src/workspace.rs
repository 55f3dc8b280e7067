//! Workspace generators (C3): derive the effective workspace — and
//! optionally restrict segments/annotations — from a raw workspace, under
//! conditional or unconditional regimes.
//!
//! The contract is purely set-algebraic and side-effect-free: a
//! [`WorkspaceGenerator`] is a function object, parameterized at
//! construction, with no shared mutable state.

use crate::segment_list::SegmentList;

/// Output of applying a [`WorkspaceGenerator`]: a restricted
/// `(segments, annotation, workspace)` triple for one isochore/contig key.
pub struct Restricted {
    pub segs: SegmentList,
    pub annos: SegmentList,
    pub workspace: SegmentList,
}

pub trait WorkspaceGenerator: Send + Sync {
    /// Apply the generator to one key's segments, annotation and workspace.
    fn apply(&self, segs: &mut SegmentList, annos: &mut SegmentList, ws: &mut SegmentList) -> Restricted;

    /// Whether this generator requires a distinct workspace per annotation
    /// (driving the orchestrator's outer loop over annotations rather than
    /// tracks alone).
    fn is_conditional(&self) -> bool;
}

/// `ws' = ws`, `segs' = segs`, `annos' = annos`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unconditional;

impl WorkspaceGenerator for Unconditional {
    fn apply(&self, segs: &mut SegmentList, annos: &mut SegmentList, ws: &mut SegmentList) -> Restricted {
        Restricted {
            segs: segs.clone_normalized(),
            annos: annos.clone_normalized(),
            workspace: ws.clone_normalized(),
        }
    }

    fn is_conditional(&self) -> bool {
        false
    }
}

/// Which collection(s) must contain a base in a workspace region for that
/// region to survive conditioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalFlavor {
    /// Keep regions containing at least one segment AND one annotation base.
    SegmentAndAnnotation,
    /// Keep regions containing at least one segment base only.
    SegmentOnly,
}

/// Restricts `ws'` to the union of workspace regions that contain at least
/// one segment base (and, depending on flavor, at least one annotation
/// base too).
#[derive(Debug, Clone, Copy)]
pub struct Conditional {
    pub flavor: ConditionalFlavor,
}

impl Conditional {
    pub fn new(flavor: ConditionalFlavor) -> Self {
        Self { flavor }
    }
}

impl WorkspaceGenerator for Conditional {
    fn apply(&self, segs: &mut SegmentList, annos: &mut SegmentList, ws: &mut SegmentList) -> Restricted {
        let mut ws_touched_by_segs = ws.clone_normalized().intersect(&mut segs.clone_normalized());
        let mut occupied = match self.flavor {
            ConditionalFlavor::SegmentAndAnnotation => {
                // a region qualifies only if it holds both a segment and an
                // annotation base; approximate "region" at interval grain by
                // intersecting the occupied-by-segment set with one extended to
                // cover any workspace interval also touched by an annotation.
                let mut ws_touched_by_annos = ws.clone_normalized().intersect(&mut annos.clone_normalized());
                restrict_to_components_touching_both(ws, &mut ws_touched_by_segs, &mut ws_touched_by_annos)
            }
            ConditionalFlavor::SegmentOnly => {
                // whole workspace components touched by a segment base, same
                // helper with both occupancy sets equal to the segment
                // footprint so it keeps the entire component rather than
                // just the segment's own interval.
                let mut ws_touched_by_segs_2 = ws_touched_by_segs.clone();
                restrict_to_components_touching_both(ws, &mut ws_touched_by_segs, &mut ws_touched_by_segs_2)
            }
        };
        let restricted_ws = ws.clone_normalized().intersect(&mut occupied);
        let mut restricted_ws = restricted_ws;
        let restricted_segs = segs.clone_normalized().intersect(&mut restricted_ws.clone_normalized());
        let restricted_annos = annos.clone_normalized().intersect(&mut restricted_ws.clone_normalized());
        Restricted {
            segs: restricted_segs,
            annos: restricted_annos,
            workspace: restricted_ws.clone_normalized(),
        }
    }

    fn is_conditional(&self) -> bool {
        true
    }
}

/// Restricts to whole workspace *components* (not sub-intervals) that touch
/// both of two occupancy sets.
fn restrict_to_components_touching_both(
    ws: &mut SegmentList,
    touched_a: &mut SegmentList,
    touched_b: &mut SegmentList,
) -> SegmentList {
    let mut keep = Vec::new();
    for &(start, end) in ws.spans().to_vec().iter() {
        let mut component = SegmentList::from_spans(vec![(start, end)]);
        let has_a = component.clone_normalized().intersect(touched_a).sum() > 0;
        let has_b = component.clone_normalized().intersect(touched_b).sum() > 0;
        if has_a && has_b {
            keep.push((start, end));
        }
    }
    SegmentList::from_spans(keep)
}

/// Restricts `ws'` to windows of a fixed radius around each segment.
#[derive(Debug, Clone, Copy)]
pub struct Centered {
    pub radius: u64,
}

impl WorkspaceGenerator for Centered {
    fn apply(&self, segs: &mut SegmentList, annos: &mut SegmentList, ws: &mut SegmentList) -> Restricted {
        let mut windows = Vec::new();
        for &(s, e) in segs.spans().to_vec().iter() {
            let mid = s + (e - s) / 2;
            windows.push((mid.saturating_sub(self.radius), mid + self.radius));
        }
        let mut windows = SegmentList::from_spans(windows);
        let restricted_ws = ws.clone_normalized().intersect(&mut windows);
        let mut restricted_ws = restricted_ws;
        Restricted {
            segs: segs.clone_normalized().intersect(&mut restricted_ws.clone_normalized()),
            annos: annos.clone_normalized().intersect(&mut restricted_ws.clone_normalized()),
            workspace: restricted_ws.clone_normalized(),
        }
    }

    fn is_conditional(&self) -> bool {
        true
    }
}

/// Restricts `ws'` to a fixed-size pad on either side of each segment.
#[derive(Debug, Clone, Copy)]
pub struct Padded {
    pub left: u64,
    pub right: u64,
}

impl WorkspaceGenerator for Padded {
    fn apply(&self, segs: &mut SegmentList, annos: &mut SegmentList, ws: &mut SegmentList) -> Restricted {
        let mut padded = segs.clone_normalized();
        padded.extend(self.left, self.right);
        let restricted_ws = ws.clone_normalized().intersect(&mut padded);
        let mut restricted_ws = restricted_ws;
        Restricted {
            segs: segs.clone_normalized().intersect(&mut restricted_ws.clone_normalized()),
            annos: annos.clone_normalized().intersect(&mut restricted_ws.clone_normalized()),
            workspace: restricted_ws.clone_normalized(),
        }
    }

    fn is_conditional(&self) -> bool {
        true
    }
}

/// Restricts `ws'` to the union of annotation intervals that overlap at
/// least one segment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SegmentOverlap;

impl WorkspaceGenerator for SegmentOverlap {
    fn apply(&self, segs: &mut SegmentList, annos: &mut SegmentList, ws: &mut SegmentList) -> Restricted {
        let touching = annos.clone_normalized().intersect(&mut segs.clone_normalized());
        let mut touching = touching;
        let restricted_ws = ws.clone_normalized().intersect(&mut touching);
        let mut restricted_ws = restricted_ws;
        Restricted {
            segs: segs.clone_normalized().intersect(&mut restricted_ws.clone_normalized()),
            annos: annos.clone_normalized().intersect(&mut restricted_ws.clone_normalized()),
            workspace: restricted_ws.clone_normalized(),
        }
    }

    fn is_conditional(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_is_identity() {
        let gen = Unconditional;
        let mut segs = SegmentList::from_spans(vec![(10, 20)]);
        let mut annos = SegmentList::from_spans(vec![(15, 25)]);
        let mut ws = SegmentList::from_spans(vec![(0, 100)]);
        let r = gen.apply(&mut segs, &mut annos, &mut ws);
        let mut ws2 = ws.clone();
        assert_eq!(r.workspace.clone().sum(), ws2.sum());
        assert!(!gen.is_conditional());
    }

    #[test]
    fn conditional_shrinks_to_empty_when_annotation_elsewhere() {
        let gen = Conditional::new(ConditionalFlavor::SegmentAndAnnotation);
        let mut segs = SegmentList::from_spans(vec![(10, 20)]);
        let mut annos = SegmentList::from_spans(vec![(500, 520)]);
        let mut ws = SegmentList::from_spans(vec![(0, 1000)]);
        let mut r = gen.apply(&mut segs, &mut annos, &mut ws);
        assert_eq!(r.workspace.sum(), 0);
        assert!(gen.is_conditional());
    }

    #[test]
    fn conditional_keeps_component_with_both() {
        let gen = Conditional::new(ConditionalFlavor::SegmentAndAnnotation);
        let mut segs = SegmentList::from_spans(vec![(10, 20)]);
        let mut annos = SegmentList::from_spans(vec![(15, 25)]);
        let mut ws = SegmentList::from_spans(vec![(0, 100), (1000, 1100)]);
        let mut r = gen.apply(&mut segs, &mut annos, &mut ws);
        assert_eq!(r.workspace.sum(), 100);
    }

    #[test]
    fn conditional_segment_only_keeps_whole_component_not_just_segment_span() {
        let gen = Conditional::new(ConditionalFlavor::SegmentOnly);
        let mut segs = SegmentList::from_spans(vec![(10, 20)]);
        let mut annos = SegmentList::from_spans(vec![(500, 520)]);
        let mut ws = SegmentList::from_spans(vec![(0, 100), (1000, 1100)]);
        let mut r = gen.apply(&mut segs, &mut annos, &mut ws);
        // the whole (0,100) component survives, not just the segment's own
        // (10,20) span, so there's room for the sampler to actually reshuffle.
        assert_eq!(r.workspace.sum(), 100);
        assert_eq!(r.workspace.spans(), &[(0, 100)]);
        // the unrelated (1000,1100) component, touched by no segment base,
        // is dropped.
        assert!(!r.workspace.spans().contains(&(1000, 1100)));
    }
}
