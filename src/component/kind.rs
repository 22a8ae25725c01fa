//! Component kinds and the physics operation each one delegates to.

use crate::binding::Parameter;
use crate::physics::PhysicsOperation;
use serde::{Deserialize, Serialize};

/// The kind of stage a component node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Beam origin; has no upstream.
    Source,
    /// Mirror that redirects the beam.
    Reflector,
    /// Slits or baffles cutting the beam.
    Aperture,
    /// Detector screen where the beam is imaged.
    Screen,
}

const COMMON_PARAMETERS: &[Parameter] = &[Parameter::Center, Parameter::Angles];
const SOURCE_PARAMETERS: &[Parameter] = &[
    Parameter::Center,
    Parameter::Angles,
    Parameter::Energy,
    Parameter::Bandwidth,
];
const APERTURE_PARAMETERS: &[Parameter] =
    &[Parameter::Center, Parameter::Angles, Parameter::Opening];

impl ComponentKind {
    pub fn all() -> &'static [ComponentKind] {
        &[
            ComponentKind::Source,
            ComponentKind::Reflector,
            ComponentKind::Aperture,
            ComponentKind::Screen,
        ]
    }

    /// Get the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentKind::Source => "Source",
            ComponentKind::Reflector => "Reflector",
            ComponentKind::Aperture => "Aperture",
            ComponentKind::Screen => "Screen",
        }
    }

    /// Whether activation needs the upstream artifact.
    pub fn requires_upstream(&self) -> bool {
        !matches!(self, ComponentKind::Source)
    }

    /// The engine operation used to recompute this kind.
    pub fn operation(&self) -> PhysicsOperation {
        match self {
            ComponentKind::Source => PhysicsOperation::Generate,
            ComponentKind::Reflector => PhysicsOperation::Reflect,
            ComponentKind::Aperture => PhysicsOperation::Clip,
            ComponentKind::Screen => PhysicsOperation::Expose,
        }
    }

    /// Parameters a binding map may drive on this kind.
    pub fn settable_parameters(&self) -> &'static [Parameter] {
        match self {
            ComponentKind::Source => SOURCE_PARAMETERS,
            ComponentKind::Aperture => APERTURE_PARAMETERS,
            ComponentKind::Reflector | ComponentKind::Screen => COMMON_PARAMETERS,
        }
    }

    pub fn is_settable(&self, parameter: Parameter) -> bool {
        self.settable_parameters().contains(&parameter)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
