//! Error taxonomy for profiling runs and series derivation
//!
//! Invocation and load failures are scoped to a single repetition and carry
//! enough context (repetition index, command line, captured output) to be
//! reported on their own. Sample shape errors are fatal to one derivation and
//! are tagged with the run they came from once that run is known.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while orchestrating profiler runs or deriving power series
#[derive(Error, Debug)]
pub enum EnergiError {
    #[error(
        "Profiler invocation failed on repetition {repetition}: {reason}\n  command: {command}{}",
        format_captured(.stdout, .stderr)
    )]
    ProfilerInvocation {
        repetition: usize,
        command: String,
        reason: String,
        stdout: String,
        stderr: String,
    },

    #[error("Failed to load measurements{} from {}: {reason}", format_repetition(.repetition), .path.display())]
    MeasurementLoad {
        repetition: Option<usize>,
        path: PathBuf,
        reason: String,
    },

    #[error("Malformed sample set{}: {reason}", format_repetition(.repetition))]
    MalformedSample {
        repetition: Option<usize>,
        reason: String,
    },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Failed to extract code from notebook {}: {reason}", .path.display())]
    Notebook { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for profiling and extraction operations
pub type Result<T> = std::result::Result<T, EnergiError>;

impl EnergiError {
    /// Sample shape error not yet tied to a run
    pub fn malformed(reason: impl Into<String>) -> Self {
        EnergiError::MalformedSample {
            repetition: None,
            reason: reason.into(),
        }
    }

    /// Attach a repetition index to a load or sample error raised outside the
    /// orchestrator
    pub fn with_repetition(self, index: usize) -> Self {
        match self {
            EnergiError::MeasurementLoad { path, reason, .. } => EnergiError::MeasurementLoad {
                repetition: Some(index),
                path,
                reason,
            },
            EnergiError::MalformedSample { reason, .. } => EnergiError::MalformedSample {
                repetition: Some(index),
                reason,
            },
            other => other,
        }
    }

    /// Repetition the error belongs to, if it is scoped to one
    pub fn repetition(&self) -> Option<usize> {
        match self {
            EnergiError::ProfilerInvocation { repetition, .. } => Some(*repetition),
            EnergiError::MeasurementLoad { repetition, .. }
            | EnergiError::MalformedSample { repetition, .. } => *repetition,
            _ => None,
        }
    }
}

fn format_repetition(repetition: &Option<usize>) -> String {
    repetition
        .map(|r| format!(" for repetition {}", r))
        .unwrap_or_default()
}

fn format_captured(stdout: &str, stderr: &str) -> String {
    let mut out = String::new();
    if !stdout.trim().is_empty() {
        out.push_str("\n  stdout: ");
        out.push_str(stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        out.push_str("\n  stderr: ");
        out.push_str(stderr.trim_end());
    }
    out
}
