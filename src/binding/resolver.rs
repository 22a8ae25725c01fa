//! Evaluation of binding maps into concrete values.
//!
//! References are re-read on every call; nothing is cached here.

use super::{BindingError, BindingMap, BindingSpec, Parameter, SourceRegistry};
use nalgebra::Vector3;
use std::collections::BTreeMap;

/// A resolved binding entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Scalar(f64),
    /// Composite entry in axis order.
    Tuple(Vec<f64>),
}

impl ResolvedValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            ResolvedValue::Scalar(v) => Some(*v),
            ResolvedValue::Tuple(_) => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[f64]> {
        match self {
            ResolvedValue::Scalar(_) => None,
            ResolvedValue::Tuple(values) => Some(values),
        }
    }

    pub fn as_vector3(&self) -> Option<Vector3<f64>> {
        match self.as_tuple()? {
            [x, y, z] => Some(Vector3::new(*x, *y, *z)),
            _ => None,
        }
    }

    pub fn as_array4(&self) -> Option<[f64; 4]> {
        match self.as_tuple()? {
            [a, b, c, d] => Some([*a, *b, *c, *d]),
            _ => None,
        }
    }
}

/// Resolved parameter name → value.
pub type ResolvedMap = BTreeMap<String, ResolvedValue>;

/// Resolve every entry of `bindings`, reading references from `sources`.
pub fn resolve(bindings: &BindingMap, sources: &SourceRegistry) -> Result<ResolvedMap, BindingError> {
    bindings
        .iter()
        .map(|(name, spec)| Ok((name.clone(), resolve_entry(name, spec, sources)?)))
        .collect()
}

/// Resolve the single entry `spec` bound to parameter `name`.
pub fn resolve_entry(
    name: &str,
    spec: &BindingSpec,
    sources: &SourceRegistry,
) -> Result<ResolvedValue, BindingError> {
    walk_entry(name, spec, &mut |source: &str, attribute: &str| {
        sources.read(source, attribute)
    })
}

/// Check the shape of every entry and that each referenced source exists,
/// without reading any attribute.
pub fn validate(bindings: &BindingMap, sources: &SourceRegistry) -> Result<(), BindingError> {
    for (name, spec) in bindings {
        walk_entry(name, spec, &mut |source: &str, _: &str| {
            if sources.contains(source) {
                Ok(0.0)
            } else {
                Err(BindingError::UnknownSource(source.to_string()))
            }
        })?;
    }
    Ok(())
}

/// Check the shape of one entry only.
pub fn check_shape(name: &str, spec: &BindingSpec) -> Result<(), BindingError> {
    walk_entry(name, spec, &mut |_: &str, _: &str| Ok(0.0)).map(|_| ())
}

fn walk_entry<F>(name: &str, spec: &BindingSpec, read: &mut F) -> Result<ResolvedValue, BindingError>
where
    F: FnMut(&str, &str) -> Result<f64, BindingError>,
{
    let known = Parameter::from_name(name);

    match (spec, known.and_then(|p| p.axes())) {
        (BindingSpec::Composite(entries), Some(axes)) => {
            if let Some(axis) = entries.keys().find(|k| !axes.contains(&k.as_str())) {
                return Err(BindingError::UnknownAxis {
                    parameter: name.to_string(),
                    axis: axis.clone(),
                });
            }

            let mut values = Vec::with_capacity(axes.len());
            for axis in axes {
                let entry = entries.get(*axis).ok_or_else(|| BindingError::MissingAxis {
                    parameter: name.to_string(),
                    axis: axis.to_string(),
                })?;
                values.push(walk_scalar(&format!("{}.{}", name, axis), entry, read)?);
            }
            Ok(ResolvedValue::Tuple(values))
        }
        (BindingSpec::Composite(entries), None) => {
            if known.is_some() {
                return Err(BindingError::ShapeMismatch {
                    parameter: name.to_string(),
                    expected: "a scalar",
                });
            }

            // unknown composites keep key order
            let values = entries
                .iter()
                .map(|(axis, entry)| walk_scalar(&format!("{}.{}", name, axis), entry, read))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ResolvedValue::Tuple(values))
        }
        (BindingSpec::Invalid(_), _) => walk_scalar(name, spec, read).map(ResolvedValue::Scalar),
        (_, Some(_)) => Err(BindingError::ShapeMismatch {
            parameter: name.to_string(),
            expected: "a composite map",
        }),
        (_, None) => walk_scalar(name, spec, read).map(ResolvedValue::Scalar),
    }
}

fn walk_scalar<F>(parameter: &str, spec: &BindingSpec, read: &mut F) -> Result<f64, BindingError>
where
    F: FnMut(&str, &str) -> Result<f64, BindingError>,
{
    let value = match spec {
        BindingSpec::Literal(value) => *value,
        BindingSpec::Reference(parts) => match parts.as_slice() {
            [source, attribute] => read(source, attribute)?,
            _ => {
                return Err(BindingError::ReferenceArity {
                    parameter: parameter.to_string(),
                    len: parts.len(),
                })
            }
        },
        BindingSpec::Composite(_) => {
            return Err(BindingError::NestedComposite {
                parameter: parameter.to_string(),
            })
        }
        BindingSpec::Invalid(found) => {
            return Err(BindingError::Malformed {
                parameter: parameter.to_string(),
                found: found.to_string(),
            })
        }
    };

    if !value.is_finite() {
        return Err(BindingError::NonFinite {
            parameter: parameter.to_string(),
        });
    }
    Ok(value)
}
