//! Deflection direction convention.
//!
//! Every component is placed with one of four beam-redirection conventions.
//! The convention fixes the rotation between the device-global frame and the
//! device-local frame the physics engine works in, and the constant angular
//! offset that turns device-local angles into pitch/roll/yaw.

use super::FrameError;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

/// Direction in which a component redirects the beam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeflectionDirection {
    /// Towards the ring centre.
    Inboard,
    /// Away from the ring centre.
    Outboard,
    /// Vertically upwards.
    Upward,
    /// Vertically downwards.
    Downward,
    /// Non-deflecting (pass-through) component.
    #[default]
    None,
}

impl DeflectionDirection {
    /// Convention used for pass-through components when a device-local
    /// rotation is needed.
    pub const PASS_THROUGH_CONVENTION: DeflectionDirection = DeflectionDirection::Upward;

    /// All directions, including `None`.
    pub fn all() -> &'static [DeflectionDirection] {
        &[
            DeflectionDirection::Inboard,
            DeflectionDirection::Outboard,
            DeflectionDirection::Upward,
            DeflectionDirection::Downward,
            DeflectionDirection::None,
        ]
    }

    /// The four deflecting directions.
    pub fn deflecting() -> &'static [DeflectionDirection] {
        &[
            DeflectionDirection::Inboard,
            DeflectionDirection::Outboard,
            DeflectionDirection::Upward,
            DeflectionDirection::Downward,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeflectionDirection::Inboard => "inboard",
            DeflectionDirection::Outboard => "outboard",
            DeflectionDirection::Upward => "upward",
            DeflectionDirection::Downward => "downward",
            DeflectionDirection::None => "none",
        }
    }

    /// Collapse `None` onto the pass-through convention.
    pub fn resolved(self) -> DeflectionDirection {
        match self {
            DeflectionDirection::None => Self::PASS_THROUGH_CONVENTION,
            other => other,
        }
    }

    /// Rotation from device-global axes to device-local axes.
    ///
    /// A rotation about the device beam axis (y): 0° upward, 180° downward,
    /// +90° inboard, -90° outboard. Entries are exact so the inverse is the
    /// transpose with no rounding.
    pub fn matrix(&self) -> Matrix3<f64> {
        match self.resolved() {
            DeflectionDirection::Inboard => Matrix3::new(
                0.0, 0.0, 1.0, //
                0.0, 1.0, 0.0, //
                -1.0, 0.0, 0.0,
            ),
            DeflectionDirection::Outboard => Matrix3::new(
                0.0, 0.0, -1.0, //
                0.0, 1.0, 0.0, //
                1.0, 0.0, 0.0,
            ),
            DeflectionDirection::Downward => Matrix3::new(
                -1.0, 0.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, -1.0,
            ),
            DeflectionDirection::Upward | DeflectionDirection::None => Matrix3::identity(),
        }
    }

    /// Offset (radians) added to device-local angles to express them as
    /// pitch/roll/yaw.
    pub fn angle_offset(&self) -> Vector3<f64> {
        match self.resolved() {
            DeflectionDirection::Inboard => Vector3::new(0.0, FRAC_PI_2, 0.0),
            DeflectionDirection::Outboard => Vector3::new(0.0, -FRAC_PI_2, 0.0),
            DeflectionDirection::Downward => Vector3::new(0.0, PI, 0.0),
            DeflectionDirection::Upward | DeflectionDirection::None => Vector3::zeros(),
        }
    }

    /// Change of the facility-frame beam angles (degrees) produced by a
    /// deflection of `angle` degrees in this direction.
    pub fn beam_angles(&self, angle: f64) -> Vector3<f64> {
        match self {
            DeflectionDirection::Upward => Vector3::new(-angle, 0.0, 0.0),
            DeflectionDirection::Downward => Vector3::new(angle, 0.0, 0.0),
            DeflectionDirection::Inboard => Vector3::new(0.0, -angle, 0.0),
            DeflectionDirection::Outboard => Vector3::new(0.0, angle, 0.0),
            DeflectionDirection::None => Vector3::zeros(),
        }
    }
}

impl fmt::Display for DeflectionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeflectionDirection {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inboard" => Ok(DeflectionDirection::Inboard),
            "outboard" => Ok(DeflectionDirection::Outboard),
            "upward" => Ok(DeflectionDirection::Upward),
            "downward" => Ok(DeflectionDirection::Downward),
            "none" | "" => Ok(DeflectionDirection::None),
            _ => Err(FrameError::UnknownDeflection(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeflectionDirection {
    type Error = FrameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeflectionDirection> for String {
    fn from(value: DeflectionDirection) -> Self {
        value.as_str().to_string()
    }
}
