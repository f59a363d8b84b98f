//! Error types for model setup and stepping.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by model construction, configuration and stepping.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// Body density is not a positive finite number.
    #[error("invalid density: {0} (must be > 0)")]
    InvalidDensity(f32),

    /// Shape has a zero, negative or non-finite extent.
    #[error("degenerate shape: {0}")]
    DegenerateShape(String),

    /// Step size is not a positive finite number.
    #[error("invalid time step: {0} (must be > 0)")]
    InvalidTimeStep(f32),

    /// End time is negative or NaN.
    #[error("invalid end time: {0} (must be >= 0)")]
    InvalidEndTime(f32),

    /// Substep count is zero.
    #[error("substep count must be at least 1")]
    InvalidSubsteps,

    /// No built-in sample with this id.
    #[error("unknown model sample: {0}")]
    UnknownSample(u32),

    /// `step` was called before `init`.
    #[error("model is not initialized")]
    NotInitialized,

    /// Bodies or generators were added, or `init` was called, after `init`.
    #[error("model is already initialized")]
    AlreadyInitialized,

    /// `step` was called after the end time was reached.
    #[error("simulation finished at t = {0}")]
    Finished(f32),

    /// Malformed scenario description.
    #[error("invalid scenario config: {0}")]
    Config(#[from] serde_json::Error),

    /// Scenario file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// No compatible GPU adapter.
    #[cfg(feature = "gpu")]
    #[error("no compatible GPU available")]
    GpuUnavailable,

    /// Device request failed.
    #[cfg(feature = "gpu")]
    #[error("GPU device request failed: {0}")]
    GpuDevice(String),

    /// Reading results back from the GPU failed.
    #[cfg(feature = "gpu")]
    #[error("GPU buffer readback failed: {0}")]
    GpuReadback(String),
}

/// Result type for simulation operations.
pub type SimResult<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::InvalidDensity(-0.5);
        assert!(format!("{err}").contains("-0.5"));

        let err = SimError::InvalidSubsteps;
        assert_eq!(format!("{err}"), "substep count must be at least 1");

        let err = SimError::Finished(1.0);
        assert_eq!(format!("{err}"), "simulation finished at t = 1");
    }
}
