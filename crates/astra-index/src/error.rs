//! Error types for index builds.

use thiserror::Error;

use crate::progress::BuildPhase;

/// Errors surfaced by an index build.
///
/// Search-pattern problems and validation findings are never errors; they
/// are reported as data on the respective result types.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndexError {
    #[error("Build cancelled during {0}")]
    Cancelled(BuildPhase),

    #[error("Index invariant violated during {phase}: {message}")]
    Invariant { phase: BuildPhase, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IndexError {
    /// Phase the error occurred in, if known.
    pub fn phase(&self) -> Option<BuildPhase> {
        match self {
            IndexError::Cancelled(phase) => Some(*phase),
            IndexError::Invariant { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

impl From<astra_config::ConfigError> for IndexError {
    fn from(err: astra_config::ConfigError) -> Self {
        IndexError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
