//! The closed set of settable component parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parameter a binding map may drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    /// Position in the component's facility-local frame.
    Center,
    /// Orientation in the component's facility-local frame (degrees).
    Angles,
    /// Aperture edges.
    Opening,
    /// Source photon energy.
    Energy,
    /// Source energy bandwidth.
    Bandwidth,
}

const CENTER_AXES: &[&str] = &["x", "y", "z"];
const ANGLE_AXES: &[&str] = &["Rx", "Ry", "Rz"];
const OPENING_AXES: &[&str] = &["left", "right", "bottom", "top"];

impl Parameter {
    pub fn all() -> &'static [Parameter] {
        &[
            Parameter::Center,
            Parameter::Angles,
            Parameter::Opening,
            Parameter::Energy,
            Parameter::Bandwidth,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Center => "center",
            Parameter::Angles => "angles",
            Parameter::Opening => "opening",
            Parameter::Energy => "energy",
            Parameter::Bandwidth => "bandwidth",
        }
    }

    pub fn from_name(name: &str) -> Option<Parameter> {
        Self::all().iter().copied().find(|p| p.name() == name)
    }

    /// Canonical axis order for composite parameters, `None` for scalars.
    pub fn axes(&self) -> Option<&'static [&'static str]> {
        match self {
            Parameter::Center => Some(CENTER_AXES),
            Parameter::Angles => Some(ANGLE_AXES),
            Parameter::Opening => Some(OPENING_AXES),
            Parameter::Energy | Parameter::Bandwidth => None,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
