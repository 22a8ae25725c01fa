//! Pipeline executor: the activation loop.
//!
//! Each `run`:
//! 1. Starts a propagated `pending` flag at `force_all`.
//! 2. Activates every node in declaration order with `forced = pending`.
//! 3. ORs the node's result into `pending`, so once anything changes every
//!    later node is rebuilt.
//! 4. Stops at the first failing node.
//!
//! A node reads its upstream's artifact directly out of `nodes`; the upstream
//! always sits at a lower index, and nothing else writes during a run.

use super::builder::PipelineBuilder;
use super::error::{PipelineError, PipelineResult};
use super::id::NodeId;
use super::layout::LayoutDefinition;
use crate::binding::SourceRegistry;
use crate::component::{ActivationError, ComponentNode};
use crate::physics::PhysicsEngine;
use crate::transform::Placement;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Counters for one run, or summed over all runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Nodes whose `activate` was called.
    pub activated: usize,
    /// Nodes whose artifact was rebuilt.
    pub recomputed: usize,
    /// Physics-engine calls made, including failed ones.
    pub physics_calls: usize,
    pub duration: Duration,
}

impl RunStats {
    fn accumulate(&mut self, other: &RunStats) {
        self.activated += other.activated;
        self.recomputed += other.recomputed;
        self.physics_calls += other.physics_calls;
        self.duration += other.duration;
    }
}

/// An ordered set of component nodes driven by one physics engine.
pub struct Pipeline<E: PhysicsEngine> {
    nodes: Vec<ComponentNode<E::Artifact>>,
    index: HashMap<String, NodeId>,
    placements: Vec<Placement>,
    /// Per-node result of the last run; `false` for nodes it never reached.
    last_changed: Vec<bool>,
    engine: E,
    sources: SourceRegistry,
    last_run: RunStats,
    totals: RunStats,
    runs: u64,
    failed_runs: u64,
}

impl<E: PhysicsEngine> Pipeline<E> {
    /// Build a pipeline from `definition`. See [`PipelineBuilder`].
    pub fn build(
        definition: &LayoutDefinition,
        engine: E,
        sources: SourceRegistry,
    ) -> PipelineResult<Self> {
        PipelineBuilder::new(definition).build(engine, sources)
    }

    pub(crate) fn from_parts(
        nodes: Vec<ComponentNode<E::Artifact>>,
        index: HashMap<String, NodeId>,
        placements: Vec<Placement>,
        engine: E,
        sources: SourceRegistry,
    ) -> Self {
        let last_changed = vec![false; nodes.len()];
        Self {
            nodes,
            index,
            placements,
            last_changed,
            engine,
            sources,
            last_run: RunStats::default(),
            totals: RunStats::default(),
            runs: 0,
            failed_runs: 0,
        }
    }

    /// Activate every node in order. Returns whether anything was rebuilt.
    pub fn run(&mut self, force_all: bool) -> PipelineResult<bool> {
        let started = Instant::now();
        let mut stats = RunStats::default();
        self.last_changed.iter_mut().for_each(|c| *c = false);

        let result = self.activate_all(force_all, &mut stats);

        stats.duration = started.elapsed();
        self.last_run = stats;
        self.totals.accumulate(&stats);
        self.runs += 1;

        match &result {
            Ok(changed) => tracing::info!(
                "Run {} complete: {}/{} recomputed, {} physics call(s), changed: {} ({:?})",
                self.runs,
                stats.recomputed,
                stats.activated,
                stats.physics_calls,
                changed,
                stats.duration
            ),
            Err(e) => {
                self.failed_runs += 1;
                tracing::error!("Run {} aborted: {}", self.runs, e);
            }
        }
        result
    }

    fn activate_all(&mut self, force_all: bool, stats: &mut RunStats) -> PipelineResult<bool> {
        let mut pending = force_all;

        for i in 0..self.nodes.len() {
            let (before, rest) = self.nodes.split_at_mut(i);
            let node = &mut rest[0];
            let upstream = node
                .upstream()
                .and_then(|id| before.get(id.index()))
                .and_then(|up| up.artifact());

            stats.activated += 1;
            match node.activate(pending, upstream, &mut self.engine, &self.sources) {
                Ok(changed) => {
                    if changed {
                        stats.recomputed += 1;
                        stats.physics_calls += 1;
                    }
                    self.last_changed[i] = changed;
                    pending = pending || changed;
                }
                Err(source) => {
                    if matches!(source, ActivationError::Propagation { .. }) {
                        stats.physics_calls += 1;
                    }
                    return Err(PipelineError::Activation {
                        node: node.name().to_string(),
                        stage: source.stage(),
                        source,
                    });
                }
            }
        }

        Ok(pending)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&ComponentNode<E::Artifact>> {
        self.nodes.get(id.index())
    }

    pub fn node_by_name(&self, name: &str) -> Option<&ComponentNode<E::Artifact>> {
        self.id_of(name).and_then(|id| self.node(id))
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &ComponentNode<E::Artifact>> {
        self.nodes.iter()
    }

    /// Cached artifact of `name`, `None` until it has been computed.
    pub fn artifact(&self, name: &str) -> PipelineResult<Option<&E::Artifact>> {
        self.node_by_name(name)
            .map(|node| node.artifact())
            .ok_or_else(|| PipelineError::UnknownNode(name.to_string()))
    }

    /// Placement `name` was built with.
    pub fn placement(&self, name: &str) -> PipelineResult<&Placement> {
        self.id_of(name)
            .and_then(|id| self.placements.get(id.index()))
            .ok_or_else(|| PipelineError::UnknownNode(name.to_string()))
    }

    /// Force `name` to recompute on the next run.
    pub fn invalidate(&mut self, name: &str) -> PipelineResult<()> {
        let id = self
            .id_of(name)
            .ok_or_else(|| PipelineError::UnknownNode(name.to_string()))?;
        self.nodes[id.index()].invalidate();
        Ok(())
    }

    /// Names of the nodes rebuilt in the last run, in order.
    pub fn changed_in_last_run(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .zip(&self.last_changed)
            .filter(|(_, changed)| **changed)
            .map(|(node, _)| node.name())
            .collect()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn last_run(&self) -> &RunStats {
        &self.last_run
    }

    /// Counters summed over every run.
    pub fn totals(&self) -> &RunStats {
        &self.totals
    }

    pub fn run_count(&self) -> u64 {
        self.runs
    }

    pub fn failed_run_count(&self) -> u64 {
        self.failed_runs
    }
}
