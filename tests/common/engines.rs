//! Fake physics engines

use beamline_sim::physics::{
    PhysicsEngine, PhysicsError, PhysicsOperation, Reflection, StageContext,
};
use std::collections::HashSet;

/// One recorded engine call
#[derive(Debug, Clone)]
pub struct Call {
    pub operation: PhysicsOperation,
    pub stage: StageContext,
}

/// Engine whose artifacts are call sequence numbers; records every call
#[derive(Debug, Default)]
pub struct CountingEngine {
    pub calls: Vec<Call>,
    failing: HashSet<String>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&mut self, stage: &str) {
        self.failing.insert(stage.to_string());
    }

    pub fn heal(&mut self) {
        self.failing.clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    /// Stage names called since call number `from`, in order
    pub fn stages_since(&self, from: usize) -> Vec<&str> {
        self.calls[from..]
            .iter()
            .map(|c| c.stage.name.as_str())
            .collect()
    }

    /// Most recent call for `stage`
    pub fn last_call(&self, stage: &str) -> Option<&Call> {
        self.calls.iter().rev().find(|c| c.stage.name == stage)
    }

    fn record(&mut self, operation: PhysicsOperation, stage: &StageContext) -> Result<u64, PhysicsError> {
        self.calls.push(Call {
            operation,
            stage: stage.clone(),
        });
        if self.failing.contains(&stage.name) {
            return Err(PhysicsError::new(format!("{} refused", stage.name)));
        }
        Ok(self.calls.len() as u64)
    }
}

impl PhysicsEngine for CountingEngine {
    type Artifact = u64;

    fn generate(&mut self, stage: &StageContext) -> Result<u64, PhysicsError> {
        self.record(PhysicsOperation::Generate, stage)
    }

    fn reflect(&mut self, stage: &StageContext, _incoming: &u64) -> Result<Reflection<u64>, PhysicsError> {
        let n = self.record(PhysicsOperation::Reflect, stage)?;
        Ok(Reflection {
            global: n,
            local: n + 1_000_000,
        })
    }

    fn clip(&mut self, stage: &StageContext, _incoming: &u64) -> Result<u64, PhysicsError> {
        self.record(PhysicsOperation::Clip, stage)
    }

    fn expose(&mut self, stage: &StageContext, _incoming: &u64) -> Result<u64, PhysicsError> {
        self.record(PhysicsOperation::Expose, stage)
    }
}
