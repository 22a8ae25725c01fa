//! The component node and its activation cycle.

use super::{ActivationError, ComponentError, ComponentKind, ComponentState};
use crate::binding::{
    check_shape, resolve_entry, BindingError, BindingMap, BindingSpec, Parameter, ResolvedValue,
    SourceRegistry,
};
use crate::physics::{PhysicsEngine, PhysicsOperation, StageContext};
use crate::pipeline::id::NodeId;
use crate::transform::{
    device_angles, global_a_to_global_b, local_a_to_global_a, local_a_to_local_b,
    DeflectionDirection, FrameContext, Pose6,
};
use nalgebra::Vector3;

/// One entry of the field table built at construction.
#[derive(Debug, Clone)]
struct BoundField {
    parameter: Parameter,
    spec: BindingSpec,
}

/// A stage of the beam path with cached state and cached output.
#[derive(Debug)]
pub struct ComponentNode<A> {
    name: String,
    kind: ComponentKind,
    frame: FrameContext,
    upstream: Option<NodeId>,
    /// Facility-local center used when `center` is not bound.
    nominal_center: Vector3<f64>,
    fields: Vec<BoundField>,
    cached: Option<ComponentState>,
    /// Set while a recompute is owed, cleared once the engine succeeds.
    stale: bool,
    artifact: Option<A>,
    local_artifact: Option<A>,
    activations: u64,
    recomputes: u64,
}

impl<A> ComponentNode<A> {
    /// Create a node, rejecting bindings for parameters this kind cannot set.
    pub fn new(
        name: impl Into<String>,
        kind: ComponentKind,
        frame: FrameContext,
        bindings: &BindingMap,
    ) -> Result<Self, ComponentError> {
        frame
            .origin
            .ensure_finite("origin")
            .map_err(ComponentError::Origin)?;

        let mut fields = Vec::with_capacity(bindings.len());
        for (parameter_name, spec) in bindings {
            let parameter = Parameter::from_name(parameter_name)
                .ok_or_else(|| ComponentError::UnknownParameter(parameter_name.clone()))?;
            if !kind.is_settable(parameter) {
                return Err(ComponentError::NotSettable { parameter, kind });
            }
            check_shape(parameter_name, spec)?;
            fields.push(BoundField {
                parameter,
                spec: spec.clone(),
            });
        }

        Ok(Self {
            name: name.into(),
            kind,
            frame,
            upstream: None,
            nominal_center: Vector3::zeros(),
            fields,
            cached: None,
            stale: false,
            artifact: None,
            local_artifact: None,
            activations: 0,
            recomputes: 0,
        })
    }

    pub fn with_upstream(mut self, upstream: NodeId) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Set the facility-local center used while `center` is unbound.
    pub fn with_nominal_center(mut self, center: [f64; 3]) -> Result<Self, ComponentError> {
        Pose6::at(center)
            .ensure_finite("nominal center")
            .map_err(ComponentError::Center)?;
        self.nominal_center = Vector3::from(center);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn origin(&self) -> &Pose6 {
        &self.frame.origin
    }

    pub fn deflection(&self) -> DeflectionDirection {
        self.frame.deflection
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    pub fn upstream(&self) -> Option<NodeId> {
        self.upstream
    }

    /// Bound parameters, in name order.
    pub fn parameters(&self) -> impl Iterator<Item = Parameter> + '_ {
        self.fields.iter().map(|f| f.parameter)
    }

    pub fn state(&self) -> Option<&ComponentState> {
        self.cached.as_ref()
    }

    pub fn artifact(&self) -> Option<&A> {
        self.artifact.as_ref()
    }

    /// Mirror-local artifact, only produced by reflectors.
    pub fn local_artifact(&self) -> Option<&A> {
        self.local_artifact.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Force a recompute on the next activation.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    pub fn activation_count(&self) -> u64 {
        self.activations
    }

    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }

    /// Resolve bindings, update the cached state and recompute the artifact
    /// if anything changed. Returns whether the artifact was rebuilt.
    pub fn activate<E>(
        &mut self,
        forced: bool,
        upstream: Option<&A>,
        engine: &mut E,
        sources: &SourceRegistry,
    ) -> Result<bool, ActivationError>
    where
        E: PhysicsEngine<Artifact = A> + ?Sized,
    {
        self.activations += 1;

        let resolved = self.resolve_state(sources)?;
        let changed_fields = match self.cached.as_mut() {
            Some(cached) => cached.merge(&resolved),
            None => {
                self.cached = Some(resolved);
                resolved.present_parameters()
            }
        };
        for parameter in &changed_fields {
            tracing::trace!("'{}' {} changed", self.name, parameter);
        }

        let changed = !changed_fields.is_empty() || forced || self.stale;
        if !changed {
            tracing::debug!("'{}' unchanged, keeping cached beam", self.name);
            return Ok(false);
        }

        tracing::debug!(
            "'{}' recomputing ({} field(s) changed, forced: {}, stale: {})",
            self.name,
            changed_fields.len(),
            forced,
            self.stale
        );

        self.stale = true;
        self.recompute(upstream, engine, resolved)?;
        self.stale = false;
        self.recomputes += 1;
        Ok(true)
    }

    fn resolve_state(&self, sources: &SourceRegistry) -> Result<ComponentState, ActivationError> {
        let mut center = self.nominal_center;
        let mut angles = Vector3::zeros();
        let mut state = ComponentState::default();

        for field in &self.fields {
            let name = field.parameter.name();
            let value = resolve_entry(name, &field.spec, sources)?;
            match field.parameter {
                Parameter::Center => center = vector3(name, &value)?,
                Parameter::Angles => angles = vector3(name, &value)?,
                Parameter::Opening => {
                    state.opening = Some(value.as_array4().ok_or_else(|| composite_shape(name))?)
                }
                Parameter::Energy => state.energy = Some(scalar(name, &value)?),
                Parameter::Bandwidth => state.bandwidth = Some(scalar(name, &value)?),
            }
        }

        let origin = &self.frame.origin;
        let deflection = self.frame.deflection;
        let center_pose = Pose6::from_parts(center, Vector3::zeros());

        state.center = local_a_to_local_b(&center_pose, origin, deflection)?.position;
        state.center_global =
            global_a_to_global_b(&local_a_to_global_a(&center_pose, origin)?)?.position;
        state.angles = device_angles(&angles, origin, deflection)?;
        Ok(state)
    }

    fn recompute<E>(
        &mut self,
        upstream: Option<&A>,
        engine: &mut E,
        state: ComponentState,
    ) -> Result<(), ActivationError>
    where
        E: PhysicsEngine<Artifact = A> + ?Sized,
    {
        let stage = StageContext {
            name: self.name.clone(),
            kind: self.kind,
            state,
        };
        let operation = self.kind.operation();

        let result = match operation {
            PhysicsOperation::Generate => engine.generate(&stage).map(|beam| (beam, None)),
            PhysicsOperation::Reflect => engine
                .reflect(&stage, self.require_upstream(upstream)?)
                .map(|reflection| (reflection.global, Some(reflection.local))),
            PhysicsOperation::Clip => engine
                .clip(&stage, self.require_upstream(upstream)?)
                .map(|beam| (beam, None)),
            PhysicsOperation::Expose => engine
                .expose(&stage, self.require_upstream(upstream)?)
                .map(|beam| (beam, None)),
        };

        let (artifact, local_artifact) =
            result.map_err(|source| ActivationError::Propagation { operation, source })?;
        self.artifact = Some(artifact);
        self.local_artifact = local_artifact;
        Ok(())
    }

    fn require_upstream<'a>(&self, upstream: Option<&'a A>) -> Result<&'a A, ActivationError> {
        upstream.ok_or(ActivationError::UpstreamNotReady { kind: self.kind })
    }
}

fn composite_shape(parameter: &str) -> BindingError {
    BindingError::ShapeMismatch {
        parameter: parameter.to_string(),
        expected: "a composite map",
    }
}

fn vector3(parameter: &str, value: &ResolvedValue) -> Result<Vector3<f64>, BindingError> {
    value.as_vector3().ok_or_else(|| composite_shape(parameter))
}

fn scalar(parameter: &str, value: &ResolvedValue) -> Result<f64, BindingError> {
    value.as_scalar().ok_or_else(|| BindingError::ShapeMismatch {
        parameter: parameter.to_string(),
        expected: "a scalar",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ParameterStore;
    use crate::component::ActivationStage;
    use crate::physics::{MockPhysicsEngine, PhysicsError, Reflection};
    use crate::transform::FrameError;
    use std::sync::Arc;

    fn frame() -> FrameContext {
        FrameContext::new(Pose6::zero(), DeflectionDirection::Upward)
    }

    fn node(kind: ComponentKind, bindings: &BindingMap) -> ComponentNode<u32> {
        ComponentNode::new("stage", kind, frame(), bindings).unwrap()
    }

    fn m1_sources() -> (SourceRegistry, Arc<ParameterStore>) {
        let store = Arc::new(ParameterStore::with_attributes([("x", 0.0), ("Ry", -2.0)]));
        (SourceRegistry::new().with_source("m1", store.clone()), store)
    }

    fn m1_bindings() -> BindingMap {
        let mut bindings = BindingMap::new();
        bindings.insert(
            "center".to_string(),
            BindingSpec::composite([
                ("x", BindingSpec::reference("m1", "x")),
                ("y", BindingSpec::literal(0.0)),
                ("z", BindingSpec::literal(0.0)),
            ]),
        );
        bindings.insert(
            "angles".to_string(),
            BindingSpec::composite([
                ("Rx", BindingSpec::literal(0.0)),
                ("Ry", BindingSpec::reference("m1", "Ry")),
                ("Rz", BindingSpec::literal(0.0)),
            ]),
        );
        bindings
    }

    #[test]
    fn test_source_recomputes_only_when_needed() {
        let sources = SourceRegistry::new();
        let mut source = node(ComponentKind::Source, &BindingMap::new());
        let mut engine = MockPhysicsEngine::new();
        engine.expect_generate().times(2).returning(|_| Ok(1));

        assert!(source.activate(false, None, &mut engine, &sources).unwrap());
        assert!(!source.activate(false, None, &mut engine, &sources).unwrap());
        assert!(source.activate(true, None, &mut engine, &sources).unwrap());

        assert_eq!(source.artifact(), Some(&1));
        assert_eq!(source.activation_count(), 3);
        assert_eq!(source.recompute_count(), 2);
    }

    #[test]
    fn test_reflector_without_upstream_is_not_ready() {
        let sources = SourceRegistry::new();
        let mut mirror = node(ComponentKind::Reflector, &BindingMap::new());
        let mut engine = MockPhysicsEngine::new();

        let err = mirror.activate(true, None, &mut engine, &sources).unwrap_err();
        assert_eq!(
            err,
            ActivationError::UpstreamNotReady {
                kind: ComponentKind::Reflector
            }
        );
        assert_eq!(err.stage(), ActivationStage::Propagate);
        assert!(mirror.artifact().is_none());
        assert!(mirror.is_stale());
    }

    #[test]
    fn test_reflector_keeps_local_artifact() {
        let sources = SourceRegistry::new();
        let mut mirror = node(ComponentKind::Reflector, &BindingMap::new());
        let mut engine = MockPhysicsEngine::new();
        engine
            .expect_reflect()
            .withf(|_, incoming| *incoming == 7)
            .times(1)
            .returning(|_, incoming| {
                Ok(Reflection {
                    global: *incoming + 1,
                    local: *incoming + 2,
                })
            });

        assert!(mirror.activate(false, Some(&7), &mut engine, &sources).unwrap());
        assert_eq!(mirror.artifact(), Some(&8));
        assert_eq!(mirror.local_artifact(), Some(&9));
    }

    #[test]
    fn test_binding_change_triggers_recompute() {
        let (sources, store) = m1_sources();
        let mut mirror = node(ComponentKind::Reflector, &m1_bindings());
        let mut engine = MockPhysicsEngine::new();
        engine
            .expect_reflect()
            .times(2)
            .returning(|_, _| Ok(Reflection { global: 1, local: 2 }));

        assert!(mirror.activate(false, Some(&0), &mut engine, &sources).unwrap());
        assert!(!mirror.activate(false, Some(&0), &mut engine, &sources).unwrap());

        store.set("Ry", -1.5);
        assert!(mirror.activate(false, Some(&0), &mut engine, &sources).unwrap());
        let expected = Vector3::new(0.0, 0.0, -1.5f64.to_radians());
        assert!((mirror.state().unwrap().angles - expected).amax() < 1e-12);
    }

    #[test]
    fn test_stage_receives_device_frame_state() {
        let sources = SourceRegistry::new();
        let mut screen = ComponentNode::<u32>::new(
            "screen",
            ComponentKind::Screen,
            frame(),
            &BindingMap::new(),
        )
        .unwrap()
        .with_nominal_center([1.0, 2.0, 3.0])
        .unwrap();

        let mut engine = MockPhysicsEngine::new();
        engine
            .expect_expose()
            .withf(|stage, _| {
                stage.name == "screen"
                    && stage.kind == ComponentKind::Screen
                    && stage.state.center == Vector3::new(-1.0, 3.0, 2.0)
                    && stage.state.center_global == Vector3::new(-1.0, 3.0, 2.0)
            })
            .times(1)
            .returning(|_, _| Ok(5));

        assert!(screen.activate(false, Some(&4), &mut engine, &sources).unwrap());
    }

    #[test]
    fn test_failed_recompute_is_retried() {
        let sources = SourceRegistry::new();
        let mut aperture = node(ComponentKind::Aperture, &BindingMap::new());

        let mut failing = MockPhysicsEngine::new();
        failing
            .expect_clip()
            .times(1)
            .returning(|_, _| Err(PhysicsError::new("surface not loaded")));
        let err = aperture
            .activate(false, Some(&1), &mut failing, &sources)
            .unwrap_err();
        assert!(matches!(
            err,
            ActivationError::Propagation {
                operation: PhysicsOperation::Clip,
                ..
            }
        ));
        assert!(aperture.is_stale());

        let mut working = MockPhysicsEngine::new();
        working.expect_clip().times(1).returning(|_, _| Ok(3));
        assert!(aperture.activate(false, Some(&1), &mut working, &sources).unwrap());
        assert!(!aperture.is_stale());
        assert_eq!(aperture.artifact(), Some(&3));
    }

    #[test]
    fn test_binding_error_surfaces_at_resolve_stage() {
        let sources = SourceRegistry::new();
        let mut mirror = node(ComponentKind::Reflector, &m1_bindings());
        let mut engine = MockPhysicsEngine::new();

        let err = mirror.activate(false, Some(&0), &mut engine, &sources).unwrap_err();
        assert_eq!(err, ActivationError::Binding(BindingError::UnknownSource("m1".to_string())));
        assert_eq!(err.stage(), ActivationStage::Resolve);
        assert!(mirror.state().is_none());
    }

    #[test]
    fn test_overflowing_center_surfaces_at_transform_stage() {
        let sources = SourceRegistry::new();
        let far = FrameContext::new(
            Pose6::new(1.7e308, 0.0, 0.0, 0.0, 0.0, 0.0),
            DeflectionDirection::Upward,
        );
        let mut source = ComponentNode::<u32>::new("source", ComponentKind::Source, far, &BindingMap::new())
            .unwrap()
            .with_nominal_center([1.7e308, 0.0, 0.0])
            .unwrap();
        let mut engine = MockPhysicsEngine::new();
        engine.expect_generate().times(0);

        let err = source.activate(true, None, &mut engine, &sources).unwrap_err();
        assert_eq!(err, ActivationError::Frame(FrameError::NonFinite { what: "pose" }));
        assert_eq!(err.stage(), ActivationStage::Transform);
        assert!(source.artifact().is_none());
        assert!(source.state().is_none());
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let mut bindings = BindingMap::new();
        bindings.insert("pitch".to_string(), BindingSpec::literal(1.0));
        let result = ComponentNode::<u32>::new("m1", ComponentKind::Reflector, frame(), &bindings);
        assert_eq!(
            result.unwrap_err(),
            ComponentError::UnknownParameter("pitch".to_string())
        );
    }

    #[test]
    fn test_parameter_not_settable_for_kind() {
        let mut bindings = BindingMap::new();
        bindings.insert("energy".to_string(), BindingSpec::literal(850.0));
        let result = ComponentNode::<u32>::new("m1", ComponentKind::Reflector, frame(), &bindings);
        assert_eq!(
            result.unwrap_err(),
            ComponentError::NotSettable {
                parameter: Parameter::Energy,
                kind: ComponentKind::Reflector,
            }
        );
    }

    #[test]
    fn test_malformed_binding_rejected_at_construction() {
        let mut bindings = BindingMap::new();
        bindings.insert("center".to_string(), BindingSpec::reference("m1", "x"));
        let result = ComponentNode::<u32>::new("m1", ComponentKind::Reflector, frame(), &bindings);
        assert!(matches!(
            result,
            Err(ComponentError::Binding(BindingError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn test_non_finite_origin_rejected() {
        let bad = FrameContext::new(
            Pose6::new(f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0),
            DeflectionDirection::None,
        );
        let result = ComponentNode::<u32>::new("m1", ComponentKind::Screen, bad, &BindingMap::new());
        assert!(matches!(result, Err(ComponentError::Origin(_))));
    }
}
