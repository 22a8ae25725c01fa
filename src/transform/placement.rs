//! Component placement along the beam path.
//!
//! Origins can be derived instead of written out: each component sits a
//! distance downstream of its upstream component's exit pose, and a
//! deflecting component turns the beam for everything after it.

use super::{local_a_to_global_a, DeflectionDirection, FrameError, Pose6};
use nalgebra::Vector3;

/// Where a component sits and where its outgoing beam points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Component origin in GlobalA, z along the incoming beam.
    pub origin: Pose6,
    /// Origin rotated to the outgoing beam direction.
    pub exit: Pose6,
}

impl Placement {
    /// Placement of the first component of a beam path.
    pub fn facility_origin() -> Self {
        Self {
            origin: Pose6::zero(),
            exit: Pose6::zero(),
        }
    }
}

/// Place a component `distance` downstream of `upstream_exit`, deflecting
/// the beam by `angle` degrees in `direction`.
pub fn place_component(
    upstream_exit: &Pose6,
    distance: f64,
    direction: DeflectionDirection,
    angle: f64,
) -> Result<Placement, FrameError> {
    if !distance.is_finite() {
        return Err(FrameError::NonFinite { what: "distance" });
    }
    if !angle.is_finite() {
        return Err(FrameError::NonFinite {
            what: "deflection angle",
        });
    }

    let along_beam = Pose6::from_parts(Vector3::new(0.0, 0.0, distance), Vector3::zeros());
    let origin = local_a_to_global_a(&along_beam, upstream_exit)?;
    let exit = Pose6::from_parts(
        origin.position,
        origin.angles + direction.beam_angles(angle),
    );

    Ok(Placement { origin, exit })
}
