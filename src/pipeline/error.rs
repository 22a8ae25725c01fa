//! Pipeline-specific error types.

use crate::binding::BindingError;
use crate::component::{ActivationError, ActivationStage, ComponentError};
use crate::transform::FrameError;
use thiserror::Error;

/// Problems with a layout definition, found while building.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("component name '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("'{node}' names '{upstream}' as upstream, which is declared after it")]
    ForwardReference { node: String, upstream: String },

    #[error("'{node}' names unknown upstream '{upstream}'")]
    UnknownUpstream { node: String, upstream: String },

    #[error("source '{0}' cannot have an upstream")]
    SourceWithUpstream(String),

    #[error("'{0}' gives both an explicit origin and a placement")]
    ConflictingPlacement(String),

    #[error("cannot place '{node}': {source}")]
    Placement { node: String, source: FrameError },

    #[error("invalid bindings for '{node}': {source}")]
    Binding { node: String, source: BindingError },

    #[error("invalid component '{node}': {source}")]
    Component { node: String, source: ComponentError },
}

/// Errors that can occur while building or running a pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("'{node}' failed at {stage}: {source}")]
    Activation {
        node: String,
        stage: ActivationStage,
        source: ActivationError,
    },

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("unknown node '{0}'")]
    UnknownNode(String),
}

impl PipelineError {
    /// Name of the node the error is about, if any.
    pub fn node(&self) -> Option<&str> {
        match self {
            PipelineError::Activation { node, .. } => Some(node),
            PipelineError::UnknownNode(node) => Some(node),
            PipelineError::Layout(_) => None,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
