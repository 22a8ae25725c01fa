//! Layout definitions: the ordered component records a pipeline is built from.

use crate::binding::{BindingMap, BindingSpec};
use crate::component::ComponentKind;
use crate::transform::{DeflectionDirection, Pose6};
use serde::{Deserialize, Serialize};

/// Ordered list of component records. Declaration order is the processing
/// order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutDefinition {
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

impl LayoutDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, spec: ComponentSpec) -> Self {
        self.components.push(spec);
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Origin derived from the upstream component's exit pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementSpec {
    /// Distance along the incoming beam.
    pub distance: f64,
    /// Deflection angle in degrees, applied in the component's deflection
    /// direction.
    #[serde(default)]
    pub angle: f64,
}

/// One component record.
///
/// The origin is either given in the facility-global frame (`origin`) or
/// derived (`placement`). With neither, the component sits at its upstream's
/// exit, or at the facility origin for the first component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
    #[serde(default)]
    pub deflection: DeflectionDirection,
    /// Nominal facility-local center, used while `center` is unbound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Pose6>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementSpec>,
    #[serde(default, skip_serializing_if = "BindingMap::is_empty")]
    pub bindings: BindingMap,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            upstream: None,
            deflection: DeflectionDirection::None,
            center: None,
            origin: None,
            placement: None,
            bindings: BindingMap::new(),
        }
    }

    pub fn upstream(mut self, upstream: impl Into<String>) -> Self {
        self.upstream = Some(upstream.into());
        self
    }

    pub fn deflection(mut self, deflection: DeflectionDirection) -> Self {
        self.deflection = deflection;
        self
    }

    pub fn center(mut self, center: [f64; 3]) -> Self {
        self.center = Some(center);
        self
    }

    pub fn origin(mut self, origin: Pose6) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn placement(mut self, distance: f64, angle: f64) -> Self {
        self.placement = Some(PlacementSpec { distance, angle });
        self
    }

    pub fn bind(mut self, parameter: impl Into<String>, spec: BindingSpec) -> Self {
        self.bindings.insert(parameter.into(), spec);
        self
    }
}
