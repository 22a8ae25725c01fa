//! Parameter bindings.
//!
//! A component's settable parameters are driven by a declarative
//! [`BindingMap`]: each entry is a literal, a `[source, attribute]` reference
//! read off a registered [`AttributeSource`], or (for `center`, `angles` and
//! `opening`) a map of axis → literal-or-reference.
//!
//! ```
//! use beamline_sim::binding::{resolve, BindingMap, BindingSpec, ParameterStore, SourceRegistry};
//! use std::sync::Arc;
//!
//! let obj = Arc::new(ParameterStore::with_attributes([("attr", 3.2)]));
//! let sources = SourceRegistry::new().with_source("obj", obj);
//!
//! let mut bindings = BindingMap::new();
//! bindings.insert("x".into(), BindingSpec::literal(5.0));
//! bindings.insert("y".into(), BindingSpec::reference("obj", "attr"));
//!
//! let resolved = resolve(&bindings, &sources).unwrap();
//! assert_eq!(resolved["y"].as_scalar(), Some(3.2));
//! ```

pub mod parameter;
pub mod resolver;
pub mod source;
pub mod spec;

pub use parameter::Parameter;
pub use resolver::{check_shape, resolve, resolve_entry, validate, ResolvedMap, ResolvedValue};
pub use source::{AttributeError, AttributeSource, ParameterStore, SourceRegistry};
pub use spec::{BindingMap, BindingSpec};

use thiserror::Error;

/// Errors raised while checking or resolving bindings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("binding for '{parameter}' is not a number, a [source, attribute] pair or a map of those (found {found})")]
    Malformed { parameter: String, found: String },

    #[error("reference for '{parameter}' has {len} elements, expected [source, attribute]")]
    ReferenceArity { parameter: String, len: usize },

    #[error("composite binding '{parameter}' may only contain numbers or references")]
    NestedComposite { parameter: String },

    #[error("unknown axis '{axis}' in binding for '{parameter}'")]
    UnknownAxis { parameter: String, axis: String },

    #[error("binding for '{parameter}' is missing axis '{axis}'")]
    MissingAxis { parameter: String, axis: String },

    #[error("binding for '{parameter}' must be {expected}")]
    ShapeMismatch {
        parameter: String,
        expected: &'static str,
    },

    #[error("unknown binding source '{0}'")]
    UnknownSource(String),

    #[error("source '{source_name}' has no attribute '{attribute}'")]
    UnknownAttribute {
        source_name: String,
        attribute: String,
    },

    #[error("failed to read '{source_name}.{attribute}': {message}")]
    Attribute {
        source_name: String,
        attribute: String,
        message: String,
    },

    #[error("binding for '{parameter}' resolved to a non-finite value")]
    NonFinite { parameter: String },
}
