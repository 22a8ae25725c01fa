//! Beamline pipeline: ordered component nodes and the activation loop.
//!
//! A pipeline is built once from a [`LayoutDefinition`] and then run any
//! number of times. Each run walks the nodes in declaration order and only
//! calls the physics engine where something changed.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──► [Reflector] ──► [Aperture] ──► [Screen]
//!    generate      reflect         clip          expose
//! ```
//!
//! # Design
//!
//! - **Declaration order is processing order** — upstream references may only
//!   point backwards, so no topological sort is needed.
//! - **Index ids** — `NodeId` is a direct index into the node vector.
//! - **Monotone dirty propagation** — once a node is rebuilt, every later node
//!   is forced for the rest of the run.
//! - **Single threaded** — `run` is a plain loop; the engine blocks it.

pub mod builder;
pub mod error;
pub mod executor;
pub mod id;
pub mod layout;

pub use builder::PipelineBuilder;
pub use error::{LayoutError, PipelineError, PipelineResult};
pub use executor::{Pipeline, RunStats};
pub use id::NodeId;
pub use layout::{ComponentSpec, LayoutDefinition, PlacementSpec};
