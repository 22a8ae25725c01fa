//! Component nodes: one stage of the beam path.
//!
//! A [`ComponentNode`] is a single type for every stage. Its
//! [`ComponentKind`] selects which [`PhysicsEngine`](crate::physics::PhysicsEngine)
//! operation recomputes it. Each activation resolves the node's bindings,
//! converts position and orientation into the device frame, compares the
//! result with the cached [`ComponentState`] and only calls the engine when
//! something changed, the caller forces it, or the previous recompute failed.

pub mod kind;
pub mod node;
pub mod state;

pub use kind::ComponentKind;
pub use node::ComponentNode;
pub use state::ComponentState;

use crate::binding::{BindingError, Parameter};
use crate::physics::{PhysicsError, PhysicsOperation};
use crate::transform::FrameError;
use std::fmt;
use thiserror::Error;

/// Rejection of a component at construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{parameter}' cannot be set on a {kind} component")]
    NotSettable {
        parameter: Parameter,
        kind: ComponentKind,
    },

    #[error("invalid binding: {0}")]
    Binding(#[from] BindingError),

    #[error("invalid origin: {0}")]
    Origin(#[source] FrameError),

    #[error("invalid nominal center: {0}")]
    Center(#[source] FrameError),
}

/// Where in an activation a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStage {
    /// Reading bindings.
    Resolve,
    /// Converting into the device frame.
    Transform,
    /// Fetching the upstream beam or calling the engine.
    Propagate,
}

impl fmt::Display for ActivationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationStage::Resolve => "resolve",
            ActivationStage::Transform => "transform",
            ActivationStage::Propagate => "propagate",
        };
        write!(f, "{}", name)
    }
}

/// Failure of a single activation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivationError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("{kind} component has no upstream beam to work on")]
    UpstreamNotReady { kind: ComponentKind },

    #[error("{operation} failed: {source}")]
    Propagation {
        operation: PhysicsOperation,
        source: PhysicsError,
    },
}

impl ActivationError {
    pub fn stage(&self) -> ActivationStage {
        match self {
            ActivationError::Binding(_) => ActivationStage::Resolve,
            ActivationError::Frame(_) => ActivationStage::Transform,
            ActivationError::UpstreamNotReady { .. } | ActivationError::Propagation { .. } => {
                ActivationStage::Propagate
            }
        }
    }
}
