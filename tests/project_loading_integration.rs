//! Integration tests for project files: load → build → run

mod common;

use beamline_sim::{
    config::{BeamlineProject, SourceConfig},
    error::BeamlineError,
    physics::{DryRunEngine, PhysicsOperation},
    pipeline::{LayoutError, PipelineError},
    transform::Frame,
};
use common::assert_float_eq;
use common::engines::CountingEngine;
use std::path::Path;
use tempfile::tempdir;

const ARI_TOML: &str = r#"
version = 1
name = "ARI M1 branch"

[logging]
filter = "warn"

[[sources]]
name = "m1"
attributes = { x = 0.0, y = 0.0, Rx = 0.0, Ry_coarse = -0.5, Ry_fine = 0.0, Rz = 0.0 }
derived = { Ry = "Ry_coarse + Ry_fine" }

[[sources]]
name = "baffles"
attributes = { left = -10.0, right = 10.0, bottom = -20.0, top = 20.0 }

[[components]]
name = "source"
kind = "source"
[components.bindings]
energy = 850.0
bandwidth = 5.0

[[components]]
name = "m1"
kind = "reflector"
upstream = "source"
deflection = "inboard"
placement = { distance = 26591.24, angle = 4.0 }
[components.bindings]
center = { x = ["m1", "x"], y = ["m1", "y"], z = 0.0 }
angles = { Rx = ["m1", "Rx"], Ry = ["m1", "Ry"], Rz = ["m1", "Rz"] }

[[components]]
name = "baffles"
kind = "aperture"
upstream = "m1"
placement = { distance = 2798.6 }
[components.bindings]
opening = { left = ["baffles", "left"], right = ["baffles", "right"], bottom = ["baffles", "bottom"], top = ["baffles", "top"] }

[[components]]
name = "diag"
kind = "screen"
upstream = "baffles"
placement = { distance = 593.0 }
"#;

fn write(dir: &Path, file: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_build_and_run_toml_project() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "ari.toml", ARI_TOML);

    let project = BeamlineProject::load(&path).unwrap();
    assert_eq!(project.name, "ARI M1 branch");
    assert_eq!(project.logging.filter, "warn");
    assert_eq!(project.sources.len(), 2);
    assert_eq!(project.components.len(), 4);

    let mut pipeline = project.build_pipeline(DryRunEngine::new()).unwrap();
    assert!(pipeline.run(false).unwrap());
    assert!(!pipeline.run(false).unwrap());

    let engine = pipeline.engine();
    assert_eq!(engine.total_calls(), 4);
    assert_eq!(engine.call_count(PhysicsOperation::Reflect), 1);

    let screen = pipeline.artifact("diag").unwrap().unwrap();
    assert_eq!(screen.lineage, vec!["source", "m1", "baffles", "diag"]);
    assert_eq!(screen.operation, PhysicsOperation::Expose);

    let mirror = pipeline.node_by_name("m1").unwrap();
    let local = mirror.local_artifact().unwrap();
    assert_eq!(local.frame, Frame::LocalB);
}

#[test]
fn test_stores_drive_recompute_after_load() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "ari.toml", ARI_TOML);

    let parts = BeamlineProject::load(&path).unwrap().into_parts().unwrap();
    let m1 = parts.stores["m1"].clone();
    let mut pipeline =
        beamline_sim::Pipeline::build(&parts.layout, CountingEngine::new(), parts.sources).unwrap();
    pipeline.run(false).unwrap();
    let before = pipeline.engine().call_count();

    m1.set("Ry_fine", 0.02);
    pipeline.run(false).unwrap();
    assert_eq!(pipeline.engine().stages_since(before), vec!["m1", "baffles", "diag"]);
}

#[test]
fn test_json_project_matches_toml() {
    let dir = tempdir().unwrap();
    let toml_path = write(dir.path(), "ari.toml", ARI_TOML);
    let project = BeamlineProject::load(&toml_path).unwrap();

    let json_path = dir.path().join("ari.json");
    project.save(&json_path).unwrap();
    let reloaded = BeamlineProject::load(&json_path).unwrap();
    assert_eq!(reloaded, project);

    let mut pipeline = reloaded.build_pipeline(DryRunEngine::new()).unwrap();
    pipeline.run(false).unwrap();
    let baffles = pipeline.placement("baffles").unwrap();
    assert_float_eq(baffles.origin.position.x, -195.22, 1e-2);
}

#[test]
fn test_handwritten_json_project() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "slit.json",
        r#"{
            "name": "slit only",
            "components": [
                { "name": "source", "kind": "source" },
                {
                    "name": "slit",
                    "kind": "aperture",
                    "upstream": "source",
                    "origin": [0.0, 0.0, 1500.0, 0.0, 0.0, 0.0],
                    "bindings": { "opening": { "left": -1, "right": 1, "bottom": -2, "top": 2 } }
                }
            ]
        }"#,
    );

    let project = BeamlineProject::load(&path).unwrap();
    let mut pipeline = project.build_pipeline(DryRunEngine::new()).unwrap();
    pipeline.run(false).unwrap();

    let slit = pipeline.artifact("slit").unwrap().unwrap();
    assert_eq!(slit.state.opening, Some([-1.0, 1.0, -2.0, 2.0]));
    assert_float_eq(pipeline.placement("slit").unwrap().origin.position.z, 1500.0, 1e-12);
}

#[test]
fn test_forward_reference_rejected() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "forward.toml",
        r#"
[[components]]
name = "m1"
kind = "reflector"
upstream = "source"

[[components]]
name = "source"
kind = "source"
"#,
    );

    let project = BeamlineProject::load(&path).unwrap();
    let err = project.build_pipeline(DryRunEngine::new()).err().unwrap();
    match err {
        BeamlineError::WithContext { source, .. } => assert!(matches!(
            *source,
            BeamlineError::Pipeline(PipelineError::Layout(LayoutError::ForwardReference { .. }))
        )),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_binding_rejected() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "malformed.toml",
        r#"
[[components]]
name = "source"
kind = "source"
[components.bindings]
energy = "lots"
"#,
    );

    let project = BeamlineProject::load(&path).unwrap();
    let err = project.build_pipeline(DryRunEngine::new()).err().unwrap();
    let message = err.to_string();
    assert!(message.contains("source"), "{message}");
    assert!(message.contains("energy"), "{message}");
}

#[test]
fn test_unknown_kind_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "kind.toml",
        "[[components]]\nname = \"x\"\nkind = \"lens\"\n",
    );

    assert!(matches!(
        BeamlineProject::load(&path),
        Err(BeamlineError::Config(_))
    ));
}

#[test]
fn test_bad_derived_expression_fails_before_build() {
    let project = BeamlineProject::new("bad derived")
        .with_source(SourceConfig::new("m1").with_derived("Ry", "Ry_coarse +"));

    assert!(project.build_pipeline(DryRunEngine::new()).is_err());
}

#[test]
fn test_saved_project_reloads_identically() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "ari.toml", ARI_TOML);
    let project = BeamlineProject::load(&path).unwrap();

    let copy = dir.path().join("sub").join("copy.toml");
    project.save(&copy).unwrap();
    assert_eq!(BeamlineProject::load(&copy).unwrap(), project);
}
