//! Simulation driver: processing and reset passes built on the traversal
//! engine.
//!
//! [`Factory::simulate`] runs [`Process`] from every resource node,
//! [`Factory::drain`] runs [`Reset`] over the same reach, and
//! [`Factory::purge`] resets every member directly, reachable or not.

use crate::component::Component;
use crate::factory::{Factory, FactoryError};
use crate::id::ComponentId;
use crate::traversal::{Flow, StepPhase, TraversalReport, Visitor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Visitors
// ---------------------------------------------------------------------------

/// Recompute a component's outputs from its inputs. A component that cannot
/// process is a soft stop: its outputs are cleared and nothing downstream of
/// it is fed on this pass. Its inputs keep what arrived, so `inbound()` on a
/// halted component shows what fell short. Components past it resolve dead
/// and are reset by the pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct Process;

impl Visitor for Process {
    fn visit(&self, component: &mut Component) -> Flow {
        component.clear_errors();
        if !component.can_process() {
            component.clear_outputs();
            debug!(component = %component.id(), name = component.name(), "soft stop");
            return Flow::Halt;
        }
        component.process();
        Flow::Continue
    }
}

/// Clear a component's traversal marker, errors and port flows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reset;

impl Visitor for Reset {
    fn visit(&self, component: &mut Component) -> Flow {
        component.reset_working_state();
        Flow::Continue
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub traversal: TraversalReport,
    /// Members the pass never handed to [`Process`]: unreachable, behind a
    /// soft stop, or stalled.
    pub untraversed: Vec<ComponentId>,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

impl Factory {
    /// Process every component reachable from a resource node, upstream
    /// first. Per-component problems are attached to the components and the
    /// pass always runs to the end.
    pub fn simulate(&self) -> SimulationReport {
        let traversal = self.traverse_all(&Process);
        self.summarize(traversal)
    }

    /// [`Factory::simulate`] starting from arbitrary components.
    pub fn simulate_multi(&self, roots: &[ComponentId]) -> Result<SimulationReport, FactoryError> {
        let traversal = self.traverse_multi(roots, &Process)?;
        Ok(self.summarize(traversal))
    }

    /// Single-threaded [`Factory::simulate`] that calls `hook` before and
    /// after processing each component.
    pub fn simulate_debug<H>(&self, hook: H) -> SimulationReport
    where
        H: FnMut(&Component, StepPhase),
    {
        let traversal = self.debug(&Process, hook);
        self.summarize(traversal)
    }

    /// Reset working state on everything reachable from a resource node.
    /// Disconnected components keep whatever they had; see
    /// [`Factory::purge`].
    pub fn drain(&self) -> TraversalReport {
        self.traverse_all(&Reset)
    }

    /// Reset working state on every member. Needs exclusive access, so it
    /// can never overlap a pass.
    pub fn purge(&mut self) {
        for node in self.nodes.values_mut() {
            node.get_mut().reset_working_state();
        }
        debug!(components = self.len(), "purged working state");
    }

    fn summarize(&self, traversal: TraversalReport) -> SimulationReport {
        let untraversed: Vec<ComponentId> = self
            .components()
            .filter(|c| c.traversed_pass() != traversal.pass)
            .map(|c| c.id())
            .collect();
        if !untraversed.is_empty() {
            warn!(
                pass = traversal.pass,
                count = untraversed.len(),
                "components were not traversed"
            );
        }
        info!(
            pass = traversal.pass,
            processed = traversal.visited,
            soft_stops = traversal.halted,
            "simulation finished"
        );
        SimulationReport {
            traversal,
            untraversed,
        }
    }
}
