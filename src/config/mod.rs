//! Project files for beamline-sim
//!
//! A project file holds everything needed to build and run a pipeline:
//! - the ordered component layout
//! - binding source objects with their initial attribute values
//! - the default log filter for the binary
//!
//! TOML is the primary format; files with a `.json` extension are read and
//! written as JSON.
//!
//! # Example
//!
//! ```toml
//! version = 1
//! name = "ARI M1 branch"
//!
//! [logging]
//! filter = "info,beamline_sim=debug"
//!
//! [[sources]]
//! name = "m1"
//! attributes = { Ry_coarse = -2.0, Ry_fine = 0.0 }
//! derived = { Ry = "Ry_coarse + Ry_fine" }
//!
//! [[components]]
//! name = "source"
//! kind = "source"
//!
//! [[components]]
//! name = "m1"
//! kind = "reflector"
//! upstream = "source"
//! deflection = "inboard"
//! placement = { distance = 26591.24, angle = 4.0 }
//! [components.bindings]
//! angles = { Rx = 0.0, Ry = ["m1", "Ry"], Rz = 0.0 }
//! ```

use crate::binding::{AttributeSource, ParameterStore, SourceRegistry};
use crate::error::{BeamlineError, Result, ResultExt};
use crate::physics::PhysicsEngine;
use crate::pipeline::{ComponentSpec, LayoutDefinition, Pipeline, PipelineBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Project file format version written by this build
pub const PROJECT_FORMAT_VERSION: u32 = 1;

/// Log filter used when neither `RUST_LOG` nor the project sets one
pub const DEFAULT_LOG_FILTER: &str = "info,beamline_sim=debug";

fn default_project_version() -> u32 {
    PROJECT_FORMAT_VERSION
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Logging settings for the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive string
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// A binding source object: named attributes plus derived expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, f64>,

    /// Attribute name → Rhai expression over `attributes`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub derived: BTreeMap<String, String>,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            derived: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_derived(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.derived.insert(name.into(), expression.into());
        self
    }

    /// Create the parameter store this source describes
    pub fn to_store(&self) -> Result<ParameterStore> {
        let mut store = ParameterStore::with_attributes(
            self.attributes.iter().map(|(k, v)| (k.clone(), *v)),
        );
        for (name, expression) in &self.derived {
            store
                .define_derived(name.clone(), expression.clone())
                .with_context(|| format!("Derived attribute '{}.{}'", self.name, name))?;
        }
        Ok(store)
    }
}

/// Everything a pipeline is built from, taken out of a project
pub struct ProjectParts {
    pub layout: LayoutDefinition,
    pub sources: SourceRegistry,
    /// The same stores as in `sources`, for setting values between runs
    pub stores: BTreeMap<String, Arc<ParameterStore>>,
}

/// Project file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamlineProject {
    /// Project file format version for future compatibility
    #[serde(default = "default_project_version")]
    pub version: u32,

    /// Project name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceConfig>,

    /// Layout definition, in processing order
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
}

impl Default for BeamlineProject {
    fn default() -> Self {
        Self {
            version: PROJECT_FORMAT_VERSION,
            name: String::new(),
            logging: LoggingConfig::default(),
            sources: Vec::new(),
            components: Vec::new(),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

impl BeamlineProject {
    /// Create an empty project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: SourceConfig) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_component(mut self, component: ComponentSpec) -> Self {
        self.components.push(component);
        self
    }

    /// Load a project file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BeamlineError::Config(format!("Failed to read project file {:?}: {}", path, e))
        })?;

        let project: Self = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| {
                BeamlineError::Config(format!("Failed to parse project file {:?}: {}", path, e))
            })?
        } else {
            toml::from_str(&content).map_err(|e| {
                BeamlineError::Config(format!("Failed to parse project file {:?}: {}", path, e))
            })?
        };

        if project.version > PROJECT_FORMAT_VERSION {
            return Err(BeamlineError::Config(format!(
                "Project file {:?} has version {}, newest supported is {}",
                path, project.version, PROJECT_FORMAT_VERSION
            )));
        }

        tracing::info!(
            "Loaded project '{}' from {:?}: {} components, {} sources",
            project.name,
            path,
            project.components.len(),
            project.sources.len()
        );
        Ok(project)
    }

    /// Save the project to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                BeamlineError::Config(format!("Failed to create project directory: {}", e))
            })?;
        }

        let content = if is_json(path) {
            serde_json::to_string_pretty(self)
                .map_err(|e| BeamlineError::Config(format!("Failed to serialize project: {}", e)))?
        } else {
            toml::to_string_pretty(self)
                .map_err(|e| BeamlineError::Config(format!("Failed to serialize project: {}", e)))?
        };

        std::fs::write(path, content).map_err(|e| {
            BeamlineError::Config(format!("Failed to write project file {:?}: {}", path, e))
        })
    }

    /// Split into a layout and live binding sources
    pub fn into_parts(self) -> Result<ProjectParts> {
        let mut sources = SourceRegistry::new();
        let mut stores = BTreeMap::new();

        for source in &self.sources {
            if stores.contains_key(&source.name) {
                return Err(BeamlineError::Config(format!(
                    "Binding source '{}' is declared more than once",
                    source.name
                )));
            }
            let store = Arc::new(source.to_store()?);
            tracing::debug!(
                "Binding source '{}': {:?}",
                source.name,
                store.attribute_names()
            );
            sources.register(source.name.clone(), store.clone());
            stores.insert(source.name.clone(), store);
        }

        Ok(ProjectParts {
            layout: LayoutDefinition {
                components: self.components,
            },
            sources,
            stores,
        })
    }

    /// Build a pipeline for this project on `engine`
    pub fn build_pipeline<E: PhysicsEngine>(&self, engine: E) -> Result<Pipeline<E>> {
        let parts = self.clone().into_parts()?;
        let pipeline = PipelineBuilder::new(&parts.layout)
            .build(engine, parts.sources)
            .with_context(|| format!("Failed to build project '{}'", self.name))?;
        Ok(pipeline)
    }
}
