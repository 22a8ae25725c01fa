//! Test data builders for layouts and binding sources

use beamline_sim::{
    binding::{BindingSpec, ParameterStore, SourceRegistry},
    component::ComponentKind,
    pipeline::{ComponentSpec, LayoutDefinition},
    transform::DeflectionDirection,
};
use std::sync::Arc;

/// Distance from the source to the first mirror
pub const M1_DISTANCE: f64 = 26591.24;
/// Distance from the first mirror to the baffles
pub const BAFFLES_DISTANCE: f64 = 2798.6;
/// Distance from the baffles to the diagnostic screen
pub const DIAG_DISTANCE: f64 = 593.0;
/// Deflection angle of the first mirror in degrees
pub const M1_ANGLE: f64 = 4.0;

/// Motor stand-ins for the test beamline
pub struct TestSources {
    pub registry: SourceRegistry,
    pub m1: Arc<ParameterStore>,
    pub baffles: Arc<ParameterStore>,
}

impl TestSources {
    pub fn new() -> Self {
        let m1 = Arc::new(
            ParameterStore::with_attributes([
                ("x", 0.0),
                ("y", 0.0),
                ("Rx", 0.0),
                ("Ry_coarse", 0.0),
                ("Ry_fine", 0.0),
                ("Rz", 0.0),
            ])
            .with_derived("Ry", "Ry_coarse + Ry_fine")
            .unwrap(),
        );
        let baffles = Arc::new(ParameterStore::with_attributes([
            ("left", -10.0),
            ("right", 10.0),
            ("bottom", -20.0),
            ("top", 20.0),
        ]));

        let registry = SourceRegistry::new()
            .with_source("m1", m1.clone())
            .with_source("baffles", baffles.clone());

        Self {
            registry,
            m1,
            baffles,
        }
    }
}

/// The `center` binding of a motorized component
pub fn center_binding(source: &str) -> BindingSpec {
    BindingSpec::composite([
        ("x", BindingSpec::reference(source, "x")),
        ("y", BindingSpec::reference(source, "y")),
        ("z", BindingSpec::literal(0.0)),
    ])
}

/// The `angles` binding of a motorized component
pub fn angles_binding(source: &str) -> BindingSpec {
    BindingSpec::composite([
        ("Rx", BindingSpec::reference(source, "Rx")),
        ("Ry", BindingSpec::reference(source, "Ry")),
        ("Rz", BindingSpec::reference(source, "Rz")),
    ])
}

/// The `opening` binding of a four-blade aperture
pub fn opening_binding(source: &str) -> BindingSpec {
    BindingSpec::composite([
        ("left", BindingSpec::reference(source, "left")),
        ("right", BindingSpec::reference(source, "right")),
        ("bottom", BindingSpec::reference(source, "bottom")),
        ("top", BindingSpec::reference(source, "top")),
    ])
}

/// source → m1 (inboard mirror) → baffles → diag
pub fn branch_layout() -> LayoutDefinition {
    LayoutDefinition::new()
        .with_component(
            ComponentSpec::new("source", ComponentKind::Source)
                .bind("energy", BindingSpec::literal(850.0))
                .bind("bandwidth", BindingSpec::literal(5.0)),
        )
        .with_component(
            ComponentSpec::new("m1", ComponentKind::Reflector)
                .upstream("source")
                .deflection(DeflectionDirection::Inboard)
                .placement(M1_DISTANCE, M1_ANGLE)
                .bind("center", center_binding("m1"))
                .bind("angles", angles_binding("m1")),
        )
        .with_component(
            ComponentSpec::new("baffles", ComponentKind::Aperture)
                .upstream("m1")
                .placement(BAFFLES_DISTANCE, 0.0)
                .bind("opening", opening_binding("baffles")),
        )
        .with_component(
            ComponentSpec::new("diag", ComponentKind::Screen)
                .upstream("baffles")
                .placement(DIAG_DISTANCE, 0.0),
        )
}
