//! Cached per-node parameter state used for change detection.

use crate::binding::Parameter;
use crate::transform::Pose6;
use nalgebra::Vector3;

/// Last-resolved values of a node's settable parameters.
///
/// Positions and angles are in the device frame: `center` in the
/// component's device-local frame, `angles` as device pitch/roll/yaw in
/// radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ComponentState {
    pub center: Vector3<f64>,
    /// Same point in the device-global frame. Derived from `center`, so it
    /// takes no part in change detection.
    pub center_global: Vector3<f64>,
    pub angles: Vector3<f64>,
    /// Aperture edges: left, right, bottom, top.
    pub opening: Option<[f64; 4]>,
    pub energy: Option<f64>,
    pub bandwidth: Option<f64>,
}

impl ComponentState {
    /// Device-local pose of the component.
    pub fn native_pose(&self) -> Pose6 {
        Pose6::from_parts(self.center, self.angles)
    }

    /// Device-global pose of the component.
    pub fn global_pose(&self) -> Pose6 {
        Pose6::from_parts(self.center_global, self.angles)
    }

    /// Parameters carrying a value in this state.
    pub fn present_parameters(&self) -> Vec<Parameter> {
        let mut present = vec![Parameter::Center, Parameter::Angles];
        if self.opening.is_some() {
            present.push(Parameter::Opening);
        }
        if self.energy.is_some() {
            present.push(Parameter::Energy);
        }
        if self.bandwidth.is_some() {
            present.push(Parameter::Bandwidth);
        }
        present
    }

    /// Compare `resolved` field by field (exact equality), overwrite the
    /// fields that differ and return the parameters that changed.
    pub fn merge(&mut self, resolved: &ComponentState) -> Vec<Parameter> {
        let mut changed = Vec::new();

        if self.center != resolved.center {
            self.center = resolved.center;
            changed.push(Parameter::Center);
        }
        self.center_global = resolved.center_global;

        if self.angles != resolved.angles {
            self.angles = resolved.angles;
            changed.push(Parameter::Angles);
        }
        if self.opening != resolved.opening {
            self.opening = resolved.opening;
            changed.push(Parameter::Opening);
        }
        if self.energy != resolved.energy {
            self.energy = resolved.energy;
            changed.push(Parameter::Energy);
        }
        if self.bandwidth != resolved.bandwidth {
            self.bandwidth = resolved.bandwidth;
            changed.push(Parameter::Bandwidth);
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ComponentState {
        ComponentState {
            center: Vector3::new(0.0, 0.0, 1.0),
            center_global: Vector3::new(0.0, 26591.24, 0.0),
            angles: Vector3::new(0.0, 0.1, 0.0),
            opening: Some([-10.0, 10.0, -20.0, 20.0]),
            energy: None,
            bandwidth: None,
        }
    }

    #[test]
    fn test_merge_identical_reports_nothing() {
        let mut cached = sample();
        assert!(cached.merge(&sample()).is_empty());
        assert_eq!(cached, sample());
    }

    #[test]
    fn test_merge_updates_changed_fields() {
        let mut cached = sample();
        let mut resolved = sample();
        resolved.angles.y = 0.2;
        resolved.opening = Some([-10.0, 10.0, -20.0, 21.0]);

        let changed = cached.merge(&resolved);
        assert_eq!(changed, vec![Parameter::Angles, Parameter::Opening]);
        assert_eq!(cached, resolved);
    }

    #[test]
    fn test_merge_is_exact() {
        let mut cached = sample();
        let mut resolved = sample();
        resolved.center.z += f64::EPSILON;
        assert_eq!(cached.merge(&resolved), vec![Parameter::Center]);
    }

    #[test]
    fn test_present_parameters() {
        let state = ComponentState {
            energy: Some(850.0),
            ..ComponentState::default()
        };
        assert_eq!(
            state.present_parameters(),
            vec![Parameter::Center, Parameter::Angles, Parameter::Energy]
        );
    }
}
