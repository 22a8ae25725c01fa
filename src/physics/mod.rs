//! The seam to the external physics engine.
//!
//! Ray generation, mirror reflection, aperture clipping and screen exposure
//! are opaque and possibly expensive. A component node only decides *whether*
//! to call them; the [`PhysicsEngine`] implementation decides *what* they do.
//! Every call receives a [`StageContext`] carrying the node's resolved
//! native-frame state, which stands in for "the pose applied to the physical
//! model".

pub mod dry_run;

pub use dry_run::{BeamTrace, DryRunEngine};

use crate::component::{ComponentKind, ComponentState};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure reported by a physics-engine operation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct PhysicsError {
    pub message: String,
}

impl PhysicsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The four engine operations, one per component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicsOperation {
    Generate,
    Reflect,
    Clip,
    Expose,
}

impl PhysicsOperation {
    pub fn name(&self) -> &'static str {
        match self {
            PhysicsOperation::Generate => "generate",
            PhysicsOperation::Reflect => "reflect",
            PhysicsOperation::Clip => "clip",
            PhysicsOperation::Expose => "expose",
        }
    }
}

impl fmt::Display for PhysicsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What the engine sees of the stage it is working on.
#[derive(Debug, Clone, PartialEq)]
pub struct StageContext {
    pub name: String,
    pub kind: ComponentKind,
    /// Resolved native-frame state of the stage.
    pub state: ComponentState,
}

/// Output of a reflection: the beam in device-global coordinates and in the
/// mirror's own frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection<A> {
    pub global: A,
    pub local: A,
}

/// Beam physics, keyed by component kind.
#[cfg_attr(test, mockall::automock(type Artifact = u32;))]
pub trait PhysicsEngine {
    /// Beam ensemble produced at one stage.
    type Artifact;

    /// Create a beam at a source.
    fn generate(&mut self, stage: &StageContext) -> Result<Self::Artifact, PhysicsError>;

    /// Reflect `incoming` off a mirror surface.
    fn reflect(
        &mut self,
        stage: &StageContext,
        incoming: &Self::Artifact,
    ) -> Result<Reflection<Self::Artifact>, PhysicsError>;

    /// Clip `incoming` by an aperture.
    fn clip(
        &mut self,
        stage: &StageContext,
        incoming: &Self::Artifact,
    ) -> Result<Self::Artifact, PhysicsError>;

    /// Form an image of `incoming` on a screen.
    fn expose(
        &mut self,
        stage: &StageContext,
        incoming: &Self::Artifact,
    ) -> Result<Self::Artifact, PhysicsError>;
}
