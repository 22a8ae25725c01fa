//! A physics engine that traces the beam path instead of tracing rays.
//!
//! Each operation returns a [`BeamTrace`] recording which stage produced it,
//! with which state, and which stages the beam passed through before. This
//! is enough to check positioning and recompute behavior end to end.

use super::{PhysicsEngine, PhysicsError, PhysicsOperation, Reflection, StageContext};
use crate::component::ComponentState;
use crate::transform::{Frame, Pose6};
use std::collections::{BTreeMap, BTreeSet};

/// Artifact produced by [`DryRunEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct BeamTrace {
    pub stage: String,
    pub operation: PhysicsOperation,
    /// Frame `pose` is expressed in.
    pub frame: Frame,
    pub pose: Pose6,
    pub state: ComponentState,
    /// Stages the beam passed through, source first, this stage last.
    pub lineage: Vec<String>,
    /// Engine call number that produced this trace.
    pub sequence: u64,
}

impl BeamTrace {
    fn downstream_of(incoming: Option<&BeamTrace>, stage: &StageContext) -> Vec<String> {
        let mut lineage = incoming.map(|t| t.lineage.clone()).unwrap_or_default();
        lineage.push(stage.name.clone());
        lineage
    }
}

/// Engine that records calls and returns [`BeamTrace`]s.
#[derive(Debug, Default)]
pub struct DryRunEngine {
    calls: BTreeMap<PhysicsOperation, u64>,
    sequence: u64,
    failing: BTreeSet<String>,
}

impl DryRunEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation on `stage` fail until cleared.
    pub fn fail_stage(&mut self, stage: impl Into<String>) {
        self.failing.insert(stage.into());
    }

    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    pub fn call_count(&self, operation: PhysicsOperation) -> u64 {
        self.calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u64 {
        self.calls.values().sum()
    }

    pub fn reset_counts(&mut self) {
        self.calls.clear();
    }

    fn record(
        &mut self,
        operation: PhysicsOperation,
        stage: &StageContext,
    ) -> Result<u64, PhysicsError> {
        *self.calls.entry(operation).or_insert(0) += 1;
        self.sequence += 1;

        if self.failing.contains(&stage.name) {
            tracing::warn!("Dry run: injected {} failure at '{}'", operation, stage.name);
            return Err(PhysicsError::new(format!(
                "injected failure at '{}'",
                stage.name
            )));
        }

        tracing::trace!(
            "Dry run: {} '{}' at {:?}",
            operation,
            stage.name,
            stage.state.native_pose().to_array()
        );
        Ok(self.sequence)
    }

    fn trace(
        &self,
        operation: PhysicsOperation,
        stage: &StageContext,
        incoming: Option<&BeamTrace>,
        frame: Frame,
        sequence: u64,
    ) -> BeamTrace {
        let pose = match frame {
            Frame::LocalB => stage.state.native_pose(),
            _ => stage.state.global_pose(),
        };
        BeamTrace {
            stage: stage.name.clone(),
            operation,
            frame,
            pose,
            state: stage.state,
            lineage: BeamTrace::downstream_of(incoming, stage),
            sequence,
        }
    }
}

impl PhysicsEngine for DryRunEngine {
    type Artifact = BeamTrace;

    fn generate(&mut self, stage: &StageContext) -> Result<BeamTrace, PhysicsError> {
        let sequence = self.record(PhysicsOperation::Generate, stage)?;
        Ok(self.trace(PhysicsOperation::Generate, stage, None, Frame::GlobalB, sequence))
    }

    fn reflect(
        &mut self,
        stage: &StageContext,
        incoming: &BeamTrace,
    ) -> Result<Reflection<BeamTrace>, PhysicsError> {
        let op = PhysicsOperation::Reflect;
        let sequence = self.record(op, stage)?;
        Ok(Reflection {
            global: self.trace(op, stage, Some(incoming), Frame::GlobalB, sequence),
            local: self.trace(op, stage, Some(incoming), Frame::LocalB, sequence),
        })
    }

    fn clip(&mut self, stage: &StageContext, incoming: &BeamTrace) -> Result<BeamTrace, PhysicsError> {
        let sequence = self.record(PhysicsOperation::Clip, stage)?;
        Ok(self.trace(PhysicsOperation::Clip, stage, Some(incoming), Frame::GlobalB, sequence))
    }

    fn expose(
        &mut self,
        stage: &StageContext,
        incoming: &BeamTrace,
    ) -> Result<BeamTrace, PhysicsError> {
        let sequence = self.record(PhysicsOperation::Expose, stage)?;
        Ok(self.trace(PhysicsOperation::Expose, stage, Some(incoming), Frame::GlobalB, sequence))
    }
}
