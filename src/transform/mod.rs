//! Coordinate-frame transforms between facility and device frames.
//!
//! A [`Pose6`] is `(x, y, z, Rx, Ry, Rz)`: a position in length units and three
//! axis angles. It only has meaning together with a [`Frame`]:
//!
//! ```text
//! LocalA ──(origin)──► GlobalA ──(axis swap)──► GlobalB ──(origin, deflection)──► LocalB
//! ```
//!
//! - **LocalA**: component-local facility frame, z along the incoming beam,
//!   y nominally vertical. Angles in degrees.
//! - **GlobalA**: facility-wide frame. Angles in degrees.
//! - **GlobalB**: device-native global frame used by the physics engine,
//!   related to GlobalA by a fixed axis relabeling. Angles in degrees.
//! - **LocalB**: device-native frame of one component. Angles in radians.
//!
//! Orientation is combined by adding angle vectors, not by composing
//! rotations. This holds only because local frames are beam aligned.
//!
//! All functions are pure and total for finite input.

pub mod deflection;
pub mod placement;

pub use deflection::DeflectionDirection;
pub use placement::{place_component, Placement};

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by frame conversions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("non-finite value in {what}")]
    NonFinite { what: &'static str },

    #[error(
        "unknown deflection direction '{0}' (expected inboard, outboard, upward, downward or none)"
    )]
    UnknownDeflection(String),
}

/// A named coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    LocalA,
    GlobalA,
    GlobalB,
    LocalB,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Frame::LocalA => "facility-local",
            Frame::GlobalA => "facility-global",
            Frame::GlobalB => "device-global",
            Frame::LocalB => "device-local",
        };
        write!(f, "{}", name)
    }
}

/// Position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Pose6 {
    pub position: Vector3<f64>,
    pub angles: Vector3<f64>,
}

impl Pose6 {
    pub fn new(x: f64, y: f64, z: f64, rx: f64, ry: f64, rz: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            angles: Vector3::new(rx, ry, rz),
        }
    }

    pub fn zero() -> Self {
        Self::from_parts(Vector3::zeros(), Vector3::zeros())
    }

    pub fn from_parts(position: Vector3<f64>, angles: Vector3<f64>) -> Self {
        Self { position, angles }
    }

    /// Pose with the given position and zero angles.
    pub fn at(position: [f64; 3]) -> Self {
        Self::from_parts(Vector3::from(position), Vector3::zeros())
    }

    /// Pose at the frame origin with the given angles.
    pub fn oriented(angles: [f64; 3]) -> Self {
        Self::from_parts(Vector3::zeros(), Vector3::from(angles))
    }

    pub fn to_array(&self) -> [f64; 6] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.angles.x,
            self.angles.y,
            self.angles.z,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.angles.iter()).all(|v| v.is_finite())
    }

    /// Fail with [`FrameError::NonFinite`] naming `what` if any component is NaN or infinite.
    pub fn ensure_finite(&self, what: &'static str) -> Result<(), FrameError> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(FrameError::NonFinite { what })
        }
    }

    /// Largest absolute component-wise difference to `other`.
    pub fn max_abs_diff(&self, other: &Pose6) -> f64 {
        let dp = (self.position - other.position).amax();
        let da = (self.angles - other.angles).amax();
        dp.max(da)
    }
}

impl Default for Pose6 {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<[f64; 6]> for Pose6 {
    fn from(v: [f64; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }
}

impl From<Pose6> for [f64; 6] {
    fn from(pose: Pose6) -> Self {
        pose.to_array()
    }
}

/// Origin and deflection of one component: everything a local-frame
/// conversion needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Component origin in GlobalA.
    pub origin: Pose6,
    pub deflection: DeflectionDirection,
}

impl FrameContext {
    pub fn new(origin: Pose6, deflection: DeflectionDirection) -> Self {
        Self { origin, deflection }
    }
}

/// Rotation matrix for angles (degrees) about x, then y, then z: `Rz·Ry·Rx`.
pub fn rotation_matrix(angles: &Vector3<f64>) -> Matrix3<f64> {
    let (sx, cx) = angles.x.to_radians().sin_cos();
    let (sy, cy) = angles.y.to_radians().sin_cos();
    let (sz, cz) = angles.z.to_radians().sin_cos();

    let rot_x = Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, cx, -sx, //
        0.0, sx, cx,
    );
    let rot_y = Matrix3::new(
        cy, 0.0, sy, //
        0.0, 1.0, 0.0, //
        -sy, 0.0, cy,
    );
    let rot_z = Matrix3::new(
        cz, -sz, 0.0, //
        sz, cz, 0.0, //
        0.0, 0.0, 1.0,
    );

    rot_z * rot_y * rot_x
}

/// Axis relabeling between GlobalA and GlobalB: the device x axis is the
/// negated facility x, device y is facility z (beam) and device z is facility
/// y (vertical). The matrix is its own inverse.
pub fn axis_swap_matrix() -> Matrix3<f64> {
    Matrix3::new(
        -1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, //
        0.0, 1.0, 0.0,
    )
}

fn swap_axes(pose: &Pose6) -> Result<Pose6, FrameError> {
    pose.ensure_finite("pose")?;
    let swap = axis_swap_matrix();
    Ok(Pose6::from_parts(swap * pose.position, swap * pose.angles))
}

/// LocalA → GlobalA.
pub fn local_a_to_global_a(pose: &Pose6, origin: &Pose6) -> Result<Pose6, FrameError> {
    pose.ensure_finite("pose")?;
    origin.ensure_finite("origin")?;

    let rotation = rotation_matrix(&origin.angles);
    Ok(Pose6::from_parts(
        origin.position + rotation * pose.position,
        origin.angles + pose.angles,
    ))
}

/// GlobalA → LocalA.
pub fn global_a_to_local_a(pose: &Pose6, origin: &Pose6) -> Result<Pose6, FrameError> {
    pose.ensure_finite("pose")?;
    origin.ensure_finite("origin")?;

    let rotation = rotation_matrix(&origin.angles);
    Ok(Pose6::from_parts(
        rotation.transpose() * (pose.position - origin.position),
        pose.angles - origin.angles,
    ))
}

/// GlobalA → GlobalB.
pub fn global_a_to_global_b(pose: &Pose6) -> Result<Pose6, FrameError> {
    swap_axes(pose)
}

/// GlobalB → GlobalA.
pub fn global_b_to_global_a(pose: &Pose6) -> Result<Pose6, FrameError> {
    swap_axes(pose)
}

/// GlobalB → LocalB. `origin` is the component origin in GlobalA.
pub fn global_b_to_local_b(
    pose: &Pose6,
    origin: &Pose6,
    deflection: DeflectionDirection,
) -> Result<Pose6, FrameError> {
    pose.ensure_finite("pose")?;
    let device_origin = global_a_to_global_b(origin)?;
    let rotation = deflection.matrix();

    let position = rotation * (pose.position - device_origin.position);
    let angles = rotation * (pose.angles - device_origin.angles);
    Ok(Pose6::from_parts(position, angles.map(f64::to_radians)))
}

/// LocalB → GlobalB. `origin` is the component origin in GlobalA.
pub fn local_b_to_global_b(
    pose: &Pose6,
    origin: &Pose6,
    deflection: DeflectionDirection,
) -> Result<Pose6, FrameError> {
    pose.ensure_finite("pose")?;
    let device_origin = global_a_to_global_b(origin)?;
    let inverse = deflection.matrix().transpose();

    let position = inverse * pose.position + device_origin.position;
    let angles = inverse * pose.angles.map(f64::to_degrees) + device_origin.angles;
    Ok(Pose6::from_parts(position, angles))
}

/// LocalA → LocalB, through both global frames.
pub fn local_a_to_local_b(
    pose: &Pose6,
    origin: &Pose6,
    deflection: DeflectionDirection,
) -> Result<Pose6, FrameError> {
    let global_a = local_a_to_global_a(pose, origin)?;
    let global_b = global_a_to_global_b(&global_a)?;
    global_b_to_local_b(&global_b, origin, deflection)
}

/// LocalB → LocalA, inverse of [`local_a_to_local_b`].
pub fn local_b_to_local_a(
    pose: &Pose6,
    origin: &Pose6,
    deflection: DeflectionDirection,
) -> Result<Pose6, FrameError> {
    let global_a = local_b_to_global_a(pose, origin, deflection)?;
    global_a_to_local_a(&global_a, origin)
}

/// GlobalA → LocalB.
pub fn global_a_to_local_b(
    pose: &Pose6,
    origin: &Pose6,
    deflection: DeflectionDirection,
) -> Result<Pose6, FrameError> {
    let global_b = global_a_to_global_b(pose)?;
    global_b_to_local_b(&global_b, origin, deflection)
}

/// LocalB → GlobalA.
pub fn local_b_to_global_a(
    pose: &Pose6,
    origin: &Pose6,
    deflection: DeflectionDirection,
) -> Result<Pose6, FrameError> {
    let global_b = local_b_to_global_b(pose, origin, deflection)?;
    global_b_to_global_a(&global_b)
}

/// Convert `pose` between any two frames, routed through GlobalA.
pub fn convert(
    pose: &Pose6,
    from: Frame,
    to: Frame,
    ctx: &FrameContext,
) -> Result<Pose6, FrameError> {
    if from == to {
        pose.ensure_finite("pose")?;
        return Ok(*pose);
    }

    let global_a = match from {
        Frame::LocalA => local_a_to_global_a(pose, &ctx.origin)?,
        Frame::GlobalA => {
            pose.ensure_finite("pose")?;
            *pose
        }
        Frame::GlobalB => global_b_to_global_a(pose)?,
        Frame::LocalB => local_b_to_global_a(pose, &ctx.origin, ctx.deflection)?,
    };

    match to {
        Frame::LocalA => global_a_to_local_a(&global_a, &ctx.origin),
        Frame::GlobalA => Ok(global_a),
        Frame::GlobalB => global_a_to_global_b(&global_a),
        Frame::LocalB => global_a_to_local_b(&global_a, &ctx.origin, ctx.deflection),
    }
}

/// Device pitch/roll/yaw (radians) for facility-local angles (degrees).
pub fn device_angles(
    local_angles: &Vector3<f64>,
    origin: &Pose6,
    deflection: DeflectionDirection,
) -> Result<Vector3<f64>, FrameError> {
    let pose = Pose6::from_parts(Vector3::zeros(), *local_angles);
    let device = local_a_to_local_b(&pose, origin, deflection)?;
    Ok(device.angles + deflection.angle_offset())
}
