use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// AnalysisError – everything the analysis engine surfaces to its caller
// ---------------------------------------------------------------------------

/// Failures surfaced by the analysis engine.
///
/// Malformed scan lines never show up here: they are dropped by the parser.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("wavelength {0} nm not found in the loaded data")]
    WavelengthNotFound(f64),

    #[error("could not detect activation (activation: {activation:?}, deactivation: {deactivation:?})")]
    ActivationNotDetected {
        activation: Option<u32>,
        deactivation: Option<u32>,
    },

    #[error("activation window {activation}..{deactivation} is too narrow for a margin of {margin} files")]
    WindowTooNarrow {
        activation: u32,
        deactivation: u32,
        margin: u32,
    },

    #[error("section count must be at least 2, got {0}")]
    InvalidSectionCount(usize),

    #[error("{len} samples cannot be split into {sections} sections")]
    InsufficientSamples { len: usize, sections: usize },

    #[error("mean of {label} is zero; stability is undefined")]
    ZeroMean { label: String },

    #[error("no scan files matching <name>_S<index>.txt in {}", .0.display())]
    NoScanFiles(PathBuf),

    #[error("no analysis results yet; run an analysis first")]
    NoResults,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}
