//! Builds a [`Pipeline`] from a [`LayoutDefinition`].
//!
//! Components are constructed in declaration order. Each `upstream` name must
//! refer to a component declared earlier; the builder does no reordering and
//! no cycle detection, since a backward-only reference graph cannot contain
//! a cycle.

use super::error::{LayoutError, PipelineResult};
use super::executor::Pipeline;
use super::id::NodeId;
use super::layout::{ComponentSpec, LayoutDefinition};
use crate::binding::{self, SourceRegistry};
use crate::component::{ComponentKind, ComponentNode};
use crate::physics::PhysicsEngine;
use crate::transform::{place_component, FrameContext, Placement, Pose6};
use std::collections::{HashMap, HashSet};

/// Layout → pipeline builder.
#[derive(Debug, Clone)]
pub struct PipelineBuilder<'a> {
    definition: &'a LayoutDefinition,
    check_sources: bool,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(definition: &'a LayoutDefinition) -> Self {
        Self {
            definition,
            check_sources: true,
        }
    }

    /// Whether every referenced binding source must already be registered
    /// (default `true`). With `false`, a missing source only fails the
    /// activation that reads it.
    pub fn check_sources(mut self, check: bool) -> Self {
        self.check_sources = check;
        self
    }

    pub fn build<E: PhysicsEngine>(
        self,
        engine: E,
        sources: SourceRegistry,
    ) -> PipelineResult<Pipeline<E>> {
        let components = &self.definition.components;
        let declared: HashSet<&str> = components.iter().map(|c| c.name.as_str()).collect();

        let mut index: HashMap<String, NodeId> = HashMap::with_capacity(components.len());
        let mut placements: Vec<Placement> = Vec::with_capacity(components.len());
        let mut nodes = Vec::with_capacity(components.len());

        for (i, spec) in components.iter().enumerate() {
            if index.contains_key(&spec.name) {
                return Err(LayoutError::DuplicateName(spec.name.clone()).into());
            }

            let upstream = self.resolve_upstream(spec, &index, &declared)?;
            let upstream_exit = upstream
                .map(|id| placements[id.index()].exit)
                .unwrap_or_else(|| Placement::facility_origin().exit);
            let placement = Self::place(spec, &upstream_exit)?;

            let component_error = |source| LayoutError::Component {
                node: spec.name.clone(),
                source,
            };
            let frame = FrameContext::new(placement.origin, spec.deflection);
            let mut node = ComponentNode::new(spec.name.clone(), spec.kind, frame, &spec.bindings)
                .map_err(component_error)?;
            if let Some(center) = spec.center {
                node = node.with_nominal_center(center).map_err(component_error)?;
            }
            if let Some(upstream) = upstream {
                node = node.with_upstream(upstream);
            }
            if self.check_sources {
                binding::validate(&spec.bindings, &sources).map_err(|source| {
                    LayoutError::Binding {
                        node: spec.name.clone(),
                        source,
                    }
                })?;
            }

            tracing::debug!(
                "Built {} '{}' (upstream: {:?}, deflection: {}, origin: {:?})",
                spec.kind,
                spec.name,
                spec.upstream,
                spec.deflection,
                placement.origin.to_array()
            );

            index.insert(spec.name.clone(), NodeId(i as u32));
            placements.push(placement);
            nodes.push(node);
        }

        tracing::info!("Pipeline built: {} components", nodes.len());
        Ok(Pipeline::from_parts(nodes, index, placements, engine, sources))
    }

    fn resolve_upstream(
        &self,
        spec: &ComponentSpec,
        index: &HashMap<String, NodeId>,
        declared: &HashSet<&str>,
    ) -> Result<Option<NodeId>, LayoutError> {
        let Some(name) = spec.upstream.as_deref() else {
            if spec.kind.requires_upstream() {
                tracing::warn!(
                    "{} '{}' has no upstream and will fail on its first recompute",
                    spec.kind,
                    spec.name
                );
            }
            return Ok(None);
        };

        if spec.kind == ComponentKind::Source {
            return Err(LayoutError::SourceWithUpstream(spec.name.clone()));
        }

        match index.get(name) {
            Some(id) => Ok(Some(*id)),
            None if declared.contains(name) => Err(LayoutError::ForwardReference {
                node: spec.name.clone(),
                upstream: name.to_string(),
            }),
            None => Err(LayoutError::UnknownUpstream {
                node: spec.name.clone(),
                upstream: name.to_string(),
            }),
        }
    }

    fn place(spec: &ComponentSpec, upstream_exit: &Pose6) -> Result<Placement, LayoutError> {
        let placement_error = |source| LayoutError::Placement {
            node: spec.name.clone(),
            source,
        };

        match (spec.origin, spec.placement) {
            (Some(_), Some(_)) => Err(LayoutError::ConflictingPlacement(spec.name.clone())),
            (Some(origin), None) => {
                origin.ensure_finite("origin").map_err(placement_error)?;
                Ok(Placement {
                    origin,
                    exit: origin,
                })
            }
            (None, Some(placement)) => place_component(
                upstream_exit,
                placement.distance,
                spec.deflection,
                placement.angle,
            )
            .map_err(placement_error),
            (None, None) => place_component(upstream_exit, 0.0, spec.deflection, 0.0)
                .map_err(placement_error),
        }
    }
}
