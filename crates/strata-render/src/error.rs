//! Render error taxonomy.

use std::fmt;

use strata_test_utils::GpuError;

/// Errors produced by the frame renderer.
///
/// [`RenderError::Gpu`] is fatal: a pipeline, sampler or buffer slot could not
/// be created. The other variants are transient and only cost the current
/// frame's submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// GPU object creation failed.
    Gpu(GpuError),
    /// The drawable surface could not be acquired this frame.
    SurfaceUnavailable(String),
    /// The backend rejected the frame's submission.
    Submission(String),
}

impl RenderError {
    /// True when the engine should skip the frame and keep running.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SurfaceUnavailable(_) | Self::Submission(_))
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(err) => write!(f, "GPU initialization error: {}", err),
            Self::SurfaceUnavailable(msg) => write!(f, "Surface unavailable: {}", msg),
            Self::Submission(msg) => write!(f, "Frame submission failed: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GpuError> for RenderError {
    fn from(err: GpuError) -> Self {
        match err {
            GpuError::SurfaceUnavailable(msg) => Self::SurfaceUnavailable(msg),
            other => Self::Gpu(other),
        }
    }
}
