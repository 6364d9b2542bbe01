use std::path::PathBuf;

use thiserror::Error;

/// Failures of the DVH core. Everything except `Io` and `InvalidInput` is
/// scoped to a single structure or export and is skipped by batch callers.
#[derive(Debug, Error)]
pub enum DvhError {
    #[error("cannot resolve transform chain: {0}")]
    TransformResolution(String),

    #[error("structure '{name}' has no voxels overlapping the dose grid")]
    EmptyStructure { name: String },

    #[error("metric precondition failed for '{name}': {reason}")]
    MetricPrecondition { name: String, reason: String },

    #[error("inconsistent curve length for '{plot}': expected {expected} points, got {found}")]
    InconsistentCurveLength {
        plot: String,
        expected: usize,
        found: usize,
    },

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl DvhError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly label used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransformResolution(_) => "transform_resolution",
            Self::EmptyStructure { .. } => "empty_structure",
            Self::MetricPrecondition { .. } => "metric_precondition",
            Self::InconsistentCurveLength { .. } => "inconsistent_curve_length",
            Self::Io { .. } => "io",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

pub type DvhResult<T> = std::result::Result<T, DvhError>;
