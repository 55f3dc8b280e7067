//! Error taxonomy for the enrichment engine.
//!
//! Mirrors the fatal/recoverable split described by the run design: fatal
//! conditions (bad configuration, malformed input, sink I/O failures) are
//! returned as errors; recoverable conditions (`InfeasibleSample`,
//! `IncompleteSample`, `StoreMiss`) are never exceptions and are instead
//! recorded in [`crate::orchestrator::Counts`].

use std::io;
use thiserror::Error;

/// Inconsistent or invalid run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("sample_files given without output_samples_pattern")]
    SampleFilesWithoutPattern,

    #[error("unknown FDR method: {0}")]
    UnknownFdrMethod(String),

    #[error("unknown counter: {0}")]
    UnknownCounter(String),

    #[error("unknown workspace generator: {0}")]
    UnknownWorkspaceGenerator(String),

    #[error("pseudo_count must be positive, got {0}")]
    NonPositivePseudoCount(f64),

    #[error("num_samples must be at least 1")]
    ZeroSamples,

    #[error("output_samples_pattern/output_counts_pattern must contain a '%s' placeholder: {0}")]
    MissingPlaceholder(String),
}

/// Malformed interval or counts-file input.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("not a counts file: expected header {expected:?}, got {got:?}")]
    BadCountsHeader { expected: String, got: String },
}

/// Top-level error returned by [`crate::orchestrator::run`] and the CLI.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("I/O error writing sink: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
