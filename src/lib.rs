#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! gat: a genomic interval enrichment engine.
//!
//! Tests observed overlap between a set of genomic segments and one or more
//! annotation tracks against an empirical null built by randomizing segment
//! placement within a workspace, optionally conditioned or stratified by an
//! isochore covariate.
//!
//! # Example
//!
//! ```rust,no_run
//! use gat_core::prelude::*;
//!
//! let mut segments = IntervalCollection::new();
//! bed::load_into_collection("segments.bed", "trackA", &mut segments).unwrap();
//! ```

pub mod bed;
pub mod collection;
pub mod commands;
pub mod context;
pub mod counter;
pub mod error;
pub mod fdr;
pub mod orchestrator;
pub mod result;
pub mod sample_store;
pub mod sampler;
pub mod segment_list;
pub mod sinks;
pub mod workspace;

pub use collection::IntervalCollection;
pub use error::{EngineError, Result};
pub use result::AnnotatorResult;
pub use segment_list::SegmentList;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bed;
    pub use crate::collection::IntervalCollection;
    pub use crate::context::{ProgressEvent, ProgressSink, RunContext};
    pub use crate::counter::{AnnotationOverlap, Counter, NucleotideDensity, NucleotideOverlap, SegmentOverlap};
    pub use crate::error::{EngineError, Result};
    pub use crate::fdr::{self, FdrMethod};
    pub use crate::orchestrator::{self, Counts, RunOptions};
    pub use crate::result::AnnotatorResult;
    pub use crate::sample_store::{CachedOnDisk, Ephemeral, PreGeneratedFromFiles, SampleStore};
    pub use crate::sampler::{Sampler, SegmentLengthPreservingSampler};
    pub use crate::segment_list::SegmentList;
    pub use crate::workspace::{Conditional, ConditionalFlavor, Unconditional, WorkspaceGenerator};
}
