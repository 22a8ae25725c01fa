//! Error handling for beamline-sim
//!
//! Each subsystem has its own error enum; this module defines the crate-wide
//! error that wraps them for project loading and the binary.

use crate::binding::{AttributeError, BindingError};
use crate::pipeline::PipelineError;
use crate::transform::FrameError;
use thiserror::Error;

/// Main error type for beamline-sim operations
#[derive(Error, Debug)]
pub enum BeamlineError {
    /// Errors building or running a pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors converting poses between frames
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Errors resolving parameter bindings
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    /// Errors compiling or evaluating derived-attribute expressions
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to project loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<BeamlineError>,
    },
}

impl BeamlineError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        BeamlineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<AttributeError> for BeamlineError {
    fn from(err: AttributeError) -> Self {
        BeamlineError::Script(err.to_string())
    }
}

/// Result type alias for beamline-sim operations
pub type Result<T> = std::result::Result<T, BeamlineError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<BeamlineError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}
