//! Declarative binding entries as they appear in a layout definition.
//!
//! ```toml
//! [components.bindings]
//! center = { x = ["m1", "x"], y = ["m1", "y"], z = 0.0 }
//! energy = 850.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter name → binding entry.
pub type BindingMap = BTreeMap<String, BindingSpec>;

/// One binding entry.
///
/// Anything that is not a number, a `[source, attribute]` pair or a map of
/// those deserializes into `Invalid` so resolution can report exactly which
/// entry is malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindingSpec {
    Literal(f64),
    Reference(Vec<String>),
    Composite(BTreeMap<String, BindingSpec>),
    Invalid(serde_json::Value),
}

impl BindingSpec {
    pub fn literal(value: f64) -> Self {
        BindingSpec::Literal(value)
    }

    pub fn reference(source: impl Into<String>, attribute: impl Into<String>) -> Self {
        BindingSpec::Reference(vec![source.into(), attribute.into()])
    }

    pub fn composite<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, BindingSpec)>,
    {
        BindingSpec::Composite(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, BindingSpec::Composite(_))
    }
}

impl From<f64> for BindingSpec {
    fn from(value: f64) -> Self {
        BindingSpec::Literal(value)
    }
}
