//! Forward traversal passes with merge gates.
//!
//! A pass walks Output -> Input links from a set of roots and hands every
//! reachable component to a [`Visitor`] at most once. Each reachable
//! component gets a countdown gate seeded from the pass plan: one
//! count per input whose source the pass can reach. A component is only
//! dispatched once all of those sources have resolved, live or dead, so a
//! merge never sees half of its inputs. A component whose every source
//! resolved dead is not visited; its working state is reset instead, so no
//! flow from an earlier pass lingers behind a soft stop.
//!
//! Under [`Schedule::Parallel`] every branch past a fan-out runs as its own
//! rayon task. [`Schedule::Sequential`] and the debug entry points drain a
//! FIFO queue on the calling thread instead.

use crate::component::{Component, ComponentError, Resource};
use crate::factory::{Factory, FactoryError};
use crate::graph::{InputSource, TraversalPlan};
use crate::id::{ComponentId, NodeKey};
use crate::item::Ingredient;
use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Visitors
// ---------------------------------------------------------------------------

/// What a visitor tells the pass after seeing a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Downstream gates see this component as live.
    Continue,
    /// Soft stop: downstream gates see this edge as dead.
    Halt,
}

/// Called once per reachable component per pass, never concurrently for the
/// same component.
pub trait Visitor: Sync {
    fn visit(&self, component: &mut Component) -> Flow;
}

/// Plain closures never halt a pass.
impl<F> Visitor for F
where
    F: Fn(&mut Component) + Sync,
{
    fn visit(&self, component: &mut Component) -> Flow {
        self(component);
        Flow::Continue
    }
}

/// How a pass schedules ready components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    /// Branches run as rayon tasks. Falls back to sequential when the
    /// `parallel` feature is off.
    #[default]
    Parallel,
    Sequential,
}

/// When a debug hook is called relative to the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    Before,
    After,
}

pub type StepHook<'h> = dyn FnMut(&Component, StepPhase) + 'h;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Why a reachable component's gate never opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallCause {
    /// An input is linked to a component that is no longer in the factory.
    DanglingInput,
    /// The component is on a cycle, or fed only through one.
    Cycle,
    /// Waiting on a component that itself stalled.
    UpstreamStalled,
}

impl fmt::Display for StallCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StallCause::DanglingInput => "an input is linked to a missing component",
            StallCause::Cycle => "the component is part of a cycle",
            StallCause::UpstreamStalled => "an upstream component never resolved",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalledGate {
    pub component: ComponentId,
    pub name: String,
    /// Inputs still unresolved when the pass ended.
    pub pending: usize,
    pub cause: StallCause,
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalReport {
    pub pass: u64,
    /// Components handed to the visitor.
    pub visited: usize,
    /// Visited components whose visitor returned [`Flow::Halt`].
    pub halted: usize,
    /// Reachable components skipped because every upstream edge was dead.
    /// Their working state is reset.
    pub dead: usize,
    pub stalled: Vec<StalledGate>,
}

impl TraversalReport {
    pub fn is_complete(&self) -> bool {
        self.stalled.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

const UNRESOLVED: u8 = 0;
const RUNNING: u8 = 1;
const LIVE: u8 = 2;
const HALTED: u8 = 3;
const DEAD: u8 = 4;

#[derive(Debug)]
struct Gate {
    pending: AtomicUsize,
    /// Set by any predecessor that resolved live.
    live: AtomicBool,
    outcome: AtomicU8,
}

impl Gate {
    fn new(seed: usize) -> Self {
        Self {
            pending: AtomicUsize::new(seed),
            live: AtomicBool::new(false),
            outcome: AtomicU8::new(UNRESOLVED),
        }
    }
}

/// What to do with one input before the visitor runs.
enum Refresh {
    Keep,
    Clear,
    Copy(Vec<Ingredient>, Option<Resource>),
}

// ---------------------------------------------------------------------------
// Pass
// ---------------------------------------------------------------------------

struct Pass<'a, V: ?Sized> {
    factory: &'a Factory,
    plan: &'a TraversalPlan,
    gates: SecondaryMap<NodeKey, Gate>,
    visitor: &'a V,
    id: u64,
}

impl<'a, V: Visitor + ?Sized> Pass<'a, V> {
    fn new(factory: &'a Factory, plan: &'a TraversalPlan, visitor: &'a V) -> Self {
        let mut gates = SecondaryMap::new();
        for &key in &plan.order {
            gates.insert(key, Gate::new(plan.seeds.get(key).copied().unwrap_or(0)));
        }
        Self {
            factory,
            plan,
            gates,
            visitor,
            id: factory.next_pass(),
        }
    }

    fn run_sequential(&self, mut hook: Option<&mut StepHook<'_>>) {
        let mut queue: VecDeque<(NodeKey, bool)> = self.plan.ready().map(|k| (k, true)).collect();
        while let Some((key, live)) = queue.pop_front() {
            let emitted = self.resolve(key, live, hook.as_deref_mut());
            queue.extend(self.signal(key, emitted));
        }
    }

    #[cfg(feature = "parallel")]
    fn run_parallel(&self) {
        rayon::scope(|scope| {
            for key in self.plan.ready() {
                scope.spawn(move |s| self.step_parallel(s, key, true));
            }
        });
    }

    /// Walk a chain inline and fork a task for every extra gate it opens.
    #[cfg(feature = "parallel")]
    fn step_parallel<'s>(&'s self, scope: &rayon::Scope<'s>, key: NodeKey, live: bool) {
        let mut next = Some((key, live));
        while let Some((key, live)) = next.take() {
            let emitted = self.resolve(key, live, None);
            let mut ready = self.signal(key, emitted);
            next = ready.pop();
            for (fork, fork_live) in ready {
                scope.spawn(move |s| self.step_parallel(s, fork, fork_live));
            }
        }
    }

    /// Resolve one component whose gate has opened. Returns whether it
    /// resolved live.
    fn resolve(&self, key: NodeKey, live: bool, hook: Option<&mut StepHook<'_>>) -> bool {
        let Some(gate) = self.gates.get(key) else {
            return false;
        };
        let claimed = if live { RUNNING } else { DEAD };
        if gate
            .outcome
            .compare_exchange(UNRESOLVED, claimed, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        if !live {
            // Nothing live reached it this pass, so it carries nothing.
            if let Some(node) = self.factory.nodes.get(key) {
                node.write().reset_working_state();
            }
            return false;
        }
        let Some(node) = self.factory.nodes.get(key) else {
            gate.outcome.store(DEAD, Ordering::Release);
            return false;
        };

        let refresh = self.refresh_plan(key);
        let mut component = node.write();
        if !component.claim(self.id) {
            gate.outcome.store(DEAD, Ordering::Release);
            return false;
        }
        for (input, action) in component.inputs.iter_mut().zip(refresh) {
            match action {
                Refresh::Keep => {}
                Refresh::Clear => input.clear(),
                Refresh::Copy(ingredients, resource) => {
                    input.ingredients = ingredients;
                    input.resource = resource;
                }
            }
        }

        let flow = match hook {
            Some(hook) => {
                hook(&*component, StepPhase::Before);
                let flow = self.visitor.visit(&mut *component);
                hook(&*component, StepPhase::After);
                flow
            }
            None => self.visitor.visit(&mut *component),
        };
        let outcome = match flow {
            Flow::Continue => LIVE,
            Flow::Halt => HALTED,
        };
        gate.outcome.store(outcome, Ordering::Release);
        outcome == LIVE
    }

    /// Read what each input should carry. Every planned source has already
    /// resolved and released its lock.
    fn refresh_plan(&self, key: NodeKey) -> Vec<Refresh> {
        let Some(sources) = self.plan.sources.get(key) else {
            return Vec::new();
        };
        sources
            .iter()
            .map(|source| match *source {
                InputSource::Unlinked => Refresh::Keep,
                InputSource::Dangling => Refresh::Clear,
                InputSource::Planned { source, port } => {
                    let resolved_live = self
                        .gates
                        .get(source)
                        .is_some_and(|g| g.outcome.load(Ordering::Acquire) == LIVE);
                    if resolved_live {
                        self.copy_output(source, port)
                    } else {
                        Refresh::Clear
                    }
                }
                InputSource::Outside { source, port } => self.copy_output(source, port),
            })
            .collect()
    }

    fn copy_output(&self, source: NodeKey, port: usize) -> Refresh {
        self.factory
            .nodes
            .get(source)
            .and_then(|node| {
                let upstream = node.read();
                upstream
                    .outputs
                    .get(port)
                    .map(|o| Refresh::Copy(o.ingredients.clone(), o.resource.clone()))
            })
            .unwrap_or(Refresh::Clear)
    }

    /// Count down every gate fed by `key`. Returns the gates that opened,
    /// with whether any of their predecessors was live.
    fn signal(&self, key: NodeKey, emitted: bool) -> Vec<(NodeKey, bool)> {
        let mut ready = Vec::new();
        for &dest in self.plan.downstream.get(key).into_iter().flatten() {
            let Some(gate) = self.gates.get(dest) else {
                continue;
            };
            if emitted {
                gate.live.store(true, Ordering::Release);
            }
            if gate.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                ready.push((dest, gate.live.load(Ordering::Acquire)));
            }
        }
        ready
    }

    /// Tally outcomes and report gates that never opened.
    fn finish(self) -> TraversalReport {
        let mut report = TraversalReport {
            pass: self.id,
            ..TraversalReport::default()
        };
        for &key in &self.plan.order {
            let Some(gate) = self.gates.get(key) else {
                continue;
            };
            match gate.outcome.load(Ordering::Acquire) {
                LIVE => report.visited += 1,
                HALTED => {
                    report.visited += 1;
                    report.halted += 1;
                }
                DEAD => report.dead += 1,
                _ => {
                    if let Some(stalled) = self.stall(key, gate) {
                        report.stalled.push(stalled);
                    }
                }
            }
        }
        report
    }

    fn stall(&self, key: NodeKey, gate: &Gate) -> Option<StalledGate> {
        let node = self.factory.nodes.get(key)?;
        let cause = if self.plan.dangling.get(key).is_some_and(|&n| n > 0) {
            StallCause::DanglingInput
        } else if self.plan.cyclic.contains_key(key) {
            StallCause::Cycle
        } else {
            StallCause::UpstreamStalled
        };
        let pending = gate.pending.load(Ordering::Acquire);

        let mut component = node.write();
        let error = ComponentError::error(format!(
            "traversal stalled with {pending} unresolved input(s): {cause}"
        ));
        if !component.errors().contains(&error) {
            component.add_error(error);
        }
        warn!(
            pass = self.id,
            component = %component.id(),
            name = component.name(),
            pending,
            %cause,
            "merge gate never opened"
        );
        Some(StalledGate {
            component: component.id(),
            name: component.name().to_string(),
            pending,
            cause,
        })
    }
}

// ---------------------------------------------------------------------------
// Factory entry points
// ---------------------------------------------------------------------------

impl Factory {
    /// One pass from `cursor` over everything downstream of it.
    pub fn traverse<V>(&self, cursor: ComponentId, visitor: &V) -> Result<TraversalReport, FactoryError>
    where
        V: Visitor + ?Sized,
    {
        self.traverse_multi(&[cursor], visitor)
    }

    /// One pass over everything downstream of any of `roots`.
    pub fn traverse_multi<V>(
        &self,
        roots: &[ComponentId],
        visitor: &V,
    ) -> Result<TraversalReport, FactoryError>
    where
        V: Visitor + ?Sized,
    {
        let keys = self.root_keys(roots)?;
        Ok(self.run(&keys, visitor, None))
    }

    /// One pass rooted at every resource node.
    pub fn traverse_all<V>(&self, visitor: &V) -> TraversalReport
    where
        V: Visitor + ?Sized,
    {
        let roots = self.resource_keys();
        self.run(&roots, visitor, None)
    }

    /// [`Factory::traverse_all`] on the calling thread, calling `hook` just
    /// before and just after each visit.
    pub fn debug<V, H>(&self, visitor: &V, mut hook: H) -> TraversalReport
    where
        V: Visitor + ?Sized,
        H: FnMut(&Component, StepPhase),
    {
        let roots = self.resource_keys();
        self.run(&roots, visitor, Some(&mut hook as &mut StepHook<'_>))
    }

    /// [`Factory::debug`] from a single component.
    pub fn debug_from<V, H>(
        &self,
        cursor: ComponentId,
        visitor: &V,
        mut hook: H,
    ) -> Result<TraversalReport, FactoryError>
    where
        V: Visitor + ?Sized,
        H: FnMut(&Component, StepPhase),
    {
        let keys = self.root_keys(&[cursor])?;
        Ok(self.run(&keys, visitor, Some(&mut hook as &mut StepHook<'_>)))
    }

    fn root_keys(&self, roots: &[ComponentId]) -> Result<Vec<NodeKey>, FactoryError> {
        roots
            .iter()
            .map(|&id| self.key(id).ok_or(FactoryError::NotFound(id)))
            .collect()
    }

    fn resource_keys(&self) -> Vec<NodeKey> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.read().is_resource_node())
            .map(|(key, _)| key)
            .collect()
    }

    fn run<V>(&self, roots: &[NodeKey], visitor: &V, hook: Option<&mut StepHook<'_>>) -> TraversalReport
    where
        V: Visitor + ?Sized,
    {
        let plan = TraversalPlan::build(self, roots);
        let pass = Pass::new(self, &plan, visitor);
        debug!(
            pass = pass.id,
            roots = roots.len(),
            reachable = plan.order.len(),
            "traversal pass started"
        );

        match (hook, self.schedule()) {
            (Some(hook), _) => pass.run_sequential(Some(hook)),
            #[cfg(feature = "parallel")]
            (None, Schedule::Parallel) => pass.run_parallel(),
            (None, _) => pass.run_sequential(None),
        }

        let report = pass.finish();
        info!(
            pass = report.pass,
            visited = report.visited,
            halted = report.halted,
            dead = report.dead,
            stalled = report.stalled.len(),
            "traversal pass finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Purity;
    use crate::id::PortRef;
    use crate::test_utils::*;
    use parking_lot::Mutex;

    struct HaltOn(ComponentId);

    impl Visitor for HaltOn {
        fn visit(&self, component: &mut Component) -> Flow {
            if component.id() == self.0 { Flow::Halt } else { Flow::Continue }
        }
    }

    fn belt_chain(f: &mut Factory, n: usize) -> Vec<ComponentId> {
        let ids = f.add((0..n).map(|_| belt_mk1()).collect::<Vec<_>>()).unwrap();
        for pair in ids.windows(2) {
            f.link(PortRef::new(pair[0], 0), PortRef::new(pair[1], 0)).unwrap();
        }
        ids
    }

    /// Two belts feeding inputs 0 and 1 of a merger, then one belt after it.
    fn diamond(schedule: Schedule) -> (Factory, Vec<ComponentId>) {
        let mut f = Factory::default().with_schedule(schedule);
        let ids = f
            .add([belt_mk1(), belt_mk1(), belt_mk1(), merger(), belt_mk1()])
            .unwrap();
        f.link(PortRef::new(ids[0], 0), PortRef::new(ids[1], 0)).unwrap();
        f.link(PortRef::new(ids[1], 0), PortRef::new(ids[3], 0)).unwrap();
        f.link(PortRef::new(ids[2], 0), PortRef::new(ids[3], 1)).unwrap();
        f.link(PortRef::new(ids[3], 0), PortRef::new(ids[4], 0)).unwrap();
        (f, ids)
    }

    #[test]
    fn visits_each_reachable_component_once() {
        for schedule in [Schedule::Parallel, Schedule::Sequential] {
            let mut f = Factory::default().with_schedule(schedule);
            let ids = belt_chain(&mut f, 6);
            let count = AtomicUsize::new(0);
            let report = f
                .traverse(ids[0], &|_: &mut Component| {
                    count.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            assert_eq!(count.load(Ordering::Relaxed), 6);
            assert_eq!(report.visited, 6);
            assert!(report.is_complete());
        }
    }

    #[test]
    fn traversal_starts_at_the_cursor() {
        let mut f = Factory::default();
        let ids = belt_chain(&mut f, 4);
        let report = f.traverse(ids[2], &|_: &mut Component| {}).unwrap();
        assert_eq!(report.visited, 2);
        assert!(!f.get_component_by_id(ids[0]).unwrap().is_traversed());
        assert_eq!(
            f.get_component_by_id(ids[3]).unwrap().traversed_pass(),
            report.pass
        );
    }

    #[test]
    fn merge_waits_for_every_branch() {
        for schedule in [Schedule::Parallel, Schedule::Sequential] {
            let (f, ids) = diamond(schedule);
            let order = Mutex::new(Vec::new());
            let report = f
                .traverse_multi(&[ids[0], ids[2]], &|c: &mut Component| order.lock().push(c.id()))
                .unwrap();
            assert_eq!(report.visited, 5);
            let order = order.into_inner();
            let at = |id| order.iter().position(|&v| v == id).unwrap();
            assert!(at(ids[3]) > at(ids[1]));
            assert!(at(ids[3]) > at(ids[2]));
            assert!(at(ids[4]) > at(ids[3]));
        }
    }

    #[test]
    fn merge_does_not_wait_for_unreachable_inputs() {
        let (f, ids) = diamond(Schedule::Sequential);
        let report = f.traverse(ids[0], &|_: &mut Component| {}).unwrap();
        assert_eq!(report.visited, 4);
        assert!(report.is_complete());
    }

    #[test]
    fn halt_kills_a_branch_but_not_the_merge() {
        let (f, ids) = diamond(Schedule::Parallel);
        let report = f.traverse_multi(&[ids[0], ids[2]], &HaltOn(ids[0])).unwrap();
        // ids[0] halts, ids[1] is dead, the merger still has ids[2] live.
        assert_eq!(report.halted, 1);
        assert_eq!(report.dead, 1);
        assert_eq!(report.visited, 4);
        assert!(!f.get_component_by_id(ids[1]).unwrap().is_traversed());
        assert!(f.get_component_by_id(ids[3]).unwrap().is_traversed());
    }

    #[test]
    fn halt_on_every_branch_kills_the_merge() {
        let (f, ids) = diamond(Schedule::Sequential);
        struct HaltRoots(Vec<ComponentId>);
        impl Visitor for HaltRoots {
            fn visit(&self, c: &mut Component) -> Flow {
                if self.0.contains(&c.id()) { Flow::Halt } else { Flow::Continue }
            }
        }
        let report = f
            .traverse_multi(&[ids[0], ids[2]], &HaltRoots(vec![ids[0], ids[2]]))
            .unwrap();
        assert_eq!(report.halted, 2);
        assert_eq!(report.dead, 3);
        assert!(!f.get_component_by_id(ids[4]).unwrap().is_traversed());
    }

    #[test]
    fn dead_components_drop_earlier_flows() {
        for schedule in [Schedule::Parallel, Schedule::Sequential] {
            let (mut f, ids) = diamond(schedule);
            for &id in &ids[1..] {
                let c = f.component_mut(id).unwrap();
                c.outputs[0].ingredients.push(Ingredient::per_minute(iron_ore(), rate(10.0)));
                c.add_error(ComponentError::info("from an earlier pass"));
            }
            let first = f.traverse_multi(&[ids[0], ids[2]], &|_: &mut Component| {}).unwrap();
            assert_eq!(f.get_component_by_id(ids[4]).unwrap().traversed_pass(), first.pass);

            struct HaltBoth(ComponentId, ComponentId);
            impl Visitor for HaltBoth {
                fn visit(&self, c: &mut Component) -> Flow {
                    if c.id() == self.0 || c.id() == self.1 { Flow::Halt } else { Flow::Continue }
                }
            }
            let report = f
                .traverse_multi(&[ids[0], ids[2]], &HaltBoth(ids[0], ids[2]))
                .unwrap();
            assert_eq!(report.dead, 3);
            for &id in &[ids[1], ids[3], ids[4]] {
                let c = f.get_component_by_id(id).unwrap();
                assert!(c.inbound().is_empty());
                assert!(c.outbound().is_empty());
                assert!(c.errors().is_empty());
                assert!(!c.is_traversed());
            }
        }
    }

    #[test]
    fn cycles_are_reported_not_hung() {
        let mut f = Factory::default();
        let ids = f.add([belt_mk1(), merger(), belt_mk1(), belt_mk1()]).unwrap();
        // head -> merger -> b -> c -> merger
        f.link(PortRef::new(ids[0], 0), PortRef::new(ids[1], 0)).unwrap();
        f.link(PortRef::new(ids[1], 0), PortRef::new(ids[2], 0)).unwrap();
        f.link(PortRef::new(ids[2], 0), PortRef::new(ids[3], 0)).unwrap();
        f.link(PortRef::new(ids[3], 0), PortRef::new(ids[1], 1)).unwrap();

        let report = f.traverse(ids[0], &|_: &mut Component| {}).unwrap();
        assert_eq!(report.visited, 1);
        assert_eq!(report.stalled.len(), 3);
        assert!(report.stalled.iter().all(|s| s.cause == StallCause::Cycle));
        let merger = report.stalled.iter().find(|s| s.component == ids[1]).unwrap();
        assert_eq!(merger.pending, 1);

        // The stall is recorded once, however many passes see it.
        f.traverse(ids[0], &|_: &mut Component| {}).unwrap();
        assert_eq!(f.get_component_by_id(ids[1]).unwrap().errors().len(), 1);
    }

    #[test]
    fn dangling_inputs_stall_their_component() {
        let mut f = Factory::default();
        let ids = belt_chain(&mut f, 3);
        // Drop the middle belt without unlinking it.
        let key = f.index.remove(&ids[1]).unwrap();
        f.nodes.remove(key);

        let report = f.traverse_multi(&[ids[0], ids[2]], &|_: &mut Component| {}).unwrap();
        assert_eq!(report.visited, 1);
        assert_eq!(report.stalled.len(), 1);
        assert_eq!(report.stalled[0].component, ids[2]);
        assert_eq!(report.stalled[0].cause, StallCause::DanglingInput);
        let errors = f.get_errors();
        assert_eq!(errors[&ids[2]].len(), 1);
    }

    #[test]
    fn inputs_are_refreshed_from_live_sources() {
        let mut f = Factory::default();
        let ids = f.add([supply_node(iron_ore(), rate(30.0)), belt_mk1()]).unwrap();
        f.link(PortRef::new(ids[0], 0), PortRef::new(ids[1], 0)).unwrap();
        f.traverse_all(&|c: &mut Component| c.process());
        let belt = f.get_component_by_id(ids[1]).unwrap();
        assert_eq!(belt.inbound().len(), 1);
        assert!(belt.inbound()[0].is_item(&iron_ore()));
    }

    #[test]
    fn traverse_all_starts_at_resource_nodes() {
        let mut f = Factory::default();
        let ids = f.add([iron_node(Purity::Normal), miner(), belt_mk1()]).unwrap();
        f.link(PortRef::new(ids[0], 0), PortRef::new(ids[1], 0)).unwrap();
        let report = f.traverse_all(&|_: &mut Component| {});
        // The lone belt is not downstream of any resource node.
        assert_eq!(report.visited, 2);
    }

    #[test]
    fn debug_steps_in_order_on_one_thread() {
        let mut f = Factory::default();
        let ids = f.add([iron_node(Purity::Normal), miner()]).unwrap();
        f.link(PortRef::new(ids[0], 0), PortRef::new(ids[1], 0)).unwrap();
        let mut steps = Vec::new();
        let report = f.debug(&|_: &mut Component| {}, |c, phase| steps.push((c.id(), phase)));
        assert_eq!(report.visited, 2);
        assert_eq!(
            steps,
            vec![
                (ids[0], StepPhase::Before),
                (ids[0], StepPhase::After),
                (ids[1], StepPhase::Before),
                (ids[1], StepPhase::After),
            ]
        );
    }

    #[test]
    fn missing_roots_are_errors() {
        let f = Factory::default();
        let ghost = ComponentId::generate();
        assert!(matches!(
            f.traverse(ghost, &|_: &mut Component| {}),
            Err(FactoryError::NotFound(id)) if id == ghost
        ));
        assert!(f.debug_from(ghost, &|_: &mut Component| {}, |_, _| {}).is_err());
    }

    #[test]
    fn empty_factory_pass_is_complete() {
        let f = Factory::default();
        let report = f.traverse_all(&|_: &mut Component| {});
        assert_eq!(report.visited, 0);
        assert!(report.is_complete());
        assert!(report.pass > 0);
    }
}
