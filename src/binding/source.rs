//! Binding sources: objects exposing named numeric attributes.
//!
//! Sources are read-only from the pipeline's point of view. A
//! [`ParameterStore`] stands in for live control-system readbacks: values can
//! be set from outside between runs, and derived attributes are Rhai
//! expressions over the stored values and other derived attributes,
//! evaluated on every read.

use super::BindingError;
use rhai::{Dynamic, Engine, Scope, AST};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Failure reading one attribute from a source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttributeError {
    #[error("no such attribute")]
    Missing,

    #[error("{0}")]
    Evaluation(String),
}

/// Anything exposing named numeric attributes.
pub trait AttributeSource: Send + Sync {
    /// Read the current value of `attribute`.
    fn read_attribute(&self, attribute: &str) -> Result<f64, AttributeError>;

    /// Names of the attributes this source exposes, if known.
    fn attribute_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Named collection of binding sources.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn AttributeSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `name`, returning any source it replaces.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        source: Arc<dyn AttributeSource>,
    ) -> Option<Arc<dyn AttributeSource>> {
        self.sources.insert(name.into(), source)
    }

    pub fn with_source(mut self, name: impl Into<String>, source: Arc<dyn AttributeSource>) -> Self {
        self.register(name, source);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AttributeSource>> {
        self.sources.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Read `attribute` off the source registered as `source`.
    pub fn read(&self, source: &str, attribute: &str) -> Result<f64, BindingError> {
        let handle = self
            .sources
            .get(source)
            .ok_or_else(|| BindingError::UnknownSource(source.to_string()))?;

        handle.read_attribute(attribute).map_err(|e| match e {
            AttributeError::Missing => BindingError::UnknownAttribute {
                source_name: source.to_string(),
                attribute: attribute.to_string(),
            },
            AttributeError::Evaluation(message) => BindingError::Attribute {
                source_name: source.to_string(),
                attribute: attribute.to_string(),
                message,
            },
        })
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

/// Deepest chain of derived attributes referring to each other.
const MAX_DERIVED_DEPTH: usize = 8;

struct DerivedAttribute {
    expression: String,
    ast: AST,
    /// Identifiers appearing in `expression`.
    identifiers: BTreeSet<String>,
}

fn identifiers(expression: &str) -> BTreeSet<String> {
    expression
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|word| word.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_'))
        .map(str::to_string)
        .collect()
}

/// Settable attribute table with optional derived attributes.
pub struct ParameterStore {
    values: RwLock<BTreeMap<String, f64>>,
    derived: BTreeMap<String, DerivedAttribute>,
    engine: Engine,
}

impl ParameterStore {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine);

        Self {
            values: RwLock::new(BTreeMap::new()),
            derived: BTreeMap::new(),
            engine,
        }
    }

    /// Create a store holding the given attribute values.
    pub fn with_attributes<K, I>(attributes: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        let store = Self::new();
        for (name, value) in attributes {
            store.set(name, value);
        }
        store
    }

    /// Derived expressions are small arithmetic formulas; keep the engine tight.
    fn configure_engine(engine: &mut Engine) {
        engine.set_max_expr_depths(32, 32);
        engine.set_max_call_levels(8);
        engine.set_max_operations(1_000);
        engine.set_max_string_size(256);
    }

    /// Set a stored attribute.
    pub fn set(&self, name: impl Into<String>, value: f64) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(name.into(), value);
    }

    /// Current stored value (derived attributes are not included).
    pub fn get(&self, name: &str) -> Option<f64> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(name).copied()
    }

    /// Define `name` as a Rhai expression over the stored attributes and
    /// other derived attributes.
    pub fn define_derived(
        &mut self,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Result<(), AttributeError> {
        let name = name.into();
        let expression = expression.into();
        let ast = self
            .engine
            .compile_expression(&expression)
            .map_err(|e| AttributeError::Evaluation(format!("'{}': {}", expression, e)))?;

        tracing::debug!("Derived attribute '{}' = {}", name, expression);
        let identifiers = identifiers(&expression);
        self.derived.insert(
            name,
            DerivedAttribute {
                expression,
                ast,
                identifiers,
            },
        );
        Ok(())
    }

    pub fn with_derived(
        mut self,
        name: impl Into<String>,
        expression: impl Into<String>,
    ) -> Result<Self, AttributeError> {
        self.define_derived(name, expression)?;
        Ok(self)
    }

    /// Expression text of a derived attribute.
    pub fn derived_expression(&self, name: &str) -> Option<&str> {
        self.derived.get(name).map(|d| d.expression.as_str())
    }

    fn evaluate(&self, derived: &DerivedAttribute, depth: usize) -> Result<f64, AttributeError> {
        if depth > MAX_DERIVED_DEPTH {
            return Err(AttributeError::Evaluation(format!(
                "'{}': derived attributes nested deeper than {} (cyclic definition?)",
                derived.expression, MAX_DERIVED_DEPTH
            )));
        }

        let mut scope = Scope::new();
        {
            let values = self.values.read().unwrap_or_else(|e| e.into_inner());
            for (name, value) in values.iter() {
                scope.push(name.clone(), *value);
            }
        }
        // A derived attribute naming itself reads the stored value
        for name in &derived.identifiers {
            if let Some(input) = self
                .derived
                .get(name)
                .filter(|input| !std::ptr::eq(*input, derived))
            {
                let value = self.evaluate(input, depth + 1)?;
                scope.push(name.clone(), value);
            }
        }

        let result: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, &derived.ast)
            .map_err(|e| AttributeError::Evaluation(format!("'{}': {}", derived.expression, e)))?;

        if let Ok(value) = result.as_float() {
            Ok(value)
        } else if let Ok(value) = result.as_int() {
            Ok(value as f64)
        } else {
            Err(AttributeError::Evaluation(format!(
                "'{}' returned {} instead of a number",
                derived.expression,
                result.type_name()
            )))
        }
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeSource for ParameterStore {
    fn read_attribute(&self, attribute: &str) -> Result<f64, AttributeError> {
        if let Some(derived) = self.derived.get(attribute) {
            return self.evaluate(derived, 0);
        }
        self.get(attribute).ok_or(AttributeError::Missing)
    }

    fn attribute_names(&self) -> Vec<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.keys().chain(self.derived.keys()).cloned().collect()
    }
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("ParameterStore")
            .field("values", &*values)
            .field("derived", &self.derived.keys().collect::<Vec<_>>())
            .finish()
    }
}
