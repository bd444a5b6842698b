use std::fmt;

use strata_render::RenderError;

/// Errors that end an engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A fatal render error; transient ones never surface here.
    Render(RenderError),
    /// The simulation thread panicked.
    SimulationPanicked,
    /// The simulation thread could not be started.
    Simulation(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(err) => write!(f, "Render error: {}", err),
            Self::SimulationPanicked => write!(f, "Simulation thread panicked"),
            Self::Simulation(msg) => write!(f, "Simulation error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RenderError> for EngineError {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}
