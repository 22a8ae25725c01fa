//! # beamline-sim: incremental beamline positioning engine
//!
//! Positions a chain of optical components (sources, mirrors, apertures,
//! screens) along a simulated beam path and re-evaluates each stage only when
//! something it depends on changed.
//!
//! ## Architecture
//!
//! - **Transform**: pure pose conversions between facility and device frames
//! - **Binding**: declarative parameter bindings read from named sources
//! - **Component**: one stage with cached state and cached beam artifact
//! - **Physics**: the seam to the (external) ray-tracing engine
//! - **Pipeline**: builds components from a layout and drives activation
//! - **Config**: project files holding layout, sources and log settings
//!
//! ## Example
//!
//! ```
//! use beamline_sim::{
//!     binding::{BindingSpec, ParameterStore, SourceRegistry},
//!     component::ComponentKind,
//!     physics::DryRunEngine,
//!     pipeline::{ComponentSpec, LayoutDefinition, Pipeline},
//! };
//! use std::sync::Arc;
//!
//! let m1 = Arc::new(ParameterStore::with_attributes([("Ry", 0.0)]));
//! let sources = SourceRegistry::new().with_source("m1", m1.clone());
//!
//! let layout = LayoutDefinition::new()
//!     .with_component(ComponentSpec::new("source", ComponentKind::Source))
//!     .with_component(
//!         ComponentSpec::new("m1", ComponentKind::Reflector)
//!             .upstream("source")
//!             .placement(26591.24, 0.0)
//!             .bind(
//!                 "angles",
//!                 BindingSpec::composite([
//!                     ("Rx", BindingSpec::literal(0.0)),
//!                     ("Ry", BindingSpec::reference("m1", "Ry")),
//!                     ("Rz", BindingSpec::literal(0.0)),
//!                 ]),
//!             ),
//!     );
//!
//! let mut pipeline = Pipeline::build(&layout, DryRunEngine::new(), sources).unwrap();
//! assert!(pipeline.run(false).unwrap());
//! assert!(!pipeline.run(false).unwrap());
//!
//! m1.set("Ry", 0.25);
//! assert!(pipeline.run(false).unwrap());
//! ```

pub mod binding;
pub mod component;
pub mod config;
pub mod error;
pub mod physics;
pub mod pipeline;
pub mod transform;

// Re-export commonly used types
pub use binding::{BindingMap, BindingSpec, ParameterStore, SourceRegistry};
pub use component::{ComponentKind, ComponentNode, ComponentState};
pub use config::BeamlineProject;
pub use error::{BeamlineError, Result};
pub use physics::{DryRunEngine, PhysicsEngine};
pub use pipeline::{LayoutDefinition, Pipeline, PipelineError};
pub use transform::{DeflectionDirection, Frame, FrameContext, Pose6};
