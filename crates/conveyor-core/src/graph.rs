//! Per-pass traversal plan.
//!
//! Before a pass the engine snapshots the link topology reachable from the
//! pass's roots: forward edges, each component's input sources, and the
//! merge-gate seed counts. Kahn's algorithm over the same edges tells which
//! components sit on (or behind) a cycle, so a gate that never opens can be
//! reported with a cause instead of hanging.

use crate::factory::Factory;
use crate::id::NodeKey;
use slotmap::SecondaryMap;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Input sources
// ---------------------------------------------------------------------------

/// Where one input of a planned component gets its flow from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputSource {
    Unlinked,
    /// Linked to an output on a component that is no longer in the factory.
    Dangling,
    /// Linked to output `port` of a component resolved in this pass.
    Planned { source: NodeKey, port: usize },
    /// Linked to output `port` of a component outside this pass.
    Outside { source: NodeKey, port: usize },
}

// ---------------------------------------------------------------------------
// TraversalPlan
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(crate) struct TraversalPlan {
    /// Every component reachable from the roots, in discovery order.
    pub order: Vec<NodeKey>,
    /// One entry per linked output, pointing at the component it feeds.
    pub downstream: SecondaryMap<NodeKey, Vec<NodeKey>>,
    pub sources: SecondaryMap<NodeKey, Vec<InputSource>>,
    /// Signals each gate waits for before it opens.
    pub seeds: SecondaryMap<NodeKey, usize>,
    /// Dangling inputs per component. Counted in `seeds`, never signalled.
    pub dangling: SecondaryMap<NodeKey, usize>,
    /// Components Kahn's algorithm could not order: on or behind a cycle.
    pub cyclic: SecondaryMap<NodeKey, ()>,
}

impl TraversalPlan {
    /// Plan a pass from `roots`. Takes a short read lock on each reachable
    /// component; none is held once this returns.
    pub fn build(factory: &Factory, roots: &[NodeKey]) -> Self {
        let mut plan = TraversalPlan::default();
        let mut queue: VecDeque<NodeKey> = VecDeque::new();
        let mut seen: SecondaryMap<NodeKey, ()> = SecondaryMap::new();

        for &root in roots {
            if factory.nodes.contains_key(root) && seen.insert(root, ()).is_none() {
                queue.push_back(root);
            }
        }

        // Reachability over forward edges.
        while let Some(key) = queue.pop_front() {
            plan.order.push(key);
            let Some(node) = factory.nodes.get(key) else {
                continue;
            };
            let component = node.read();
            let mut next = Vec::new();
            for output in &component.outputs {
                let Some(target) = output.target() else {
                    continue;
                };
                if let Some(down) = factory.key(target.component) {
                    next.push(down);
                    if seen.insert(down, ()).is_none() {
                        queue.push_back(down);
                    }
                }
            }
            plan.downstream.insert(key, next);
        }

        // Input sources and gate seeds, now that reachability is known.
        for &key in &plan.order {
            let Some(node) = factory.nodes.get(key) else {
                continue;
            };
            let component = node.read();
            let mut seed = 0;
            let mut dangling = 0;
            let sources = component
                .inputs
                .iter()
                .map(|input| match input.source() {
                    None => InputSource::Unlinked,
                    Some(port) => match factory.key(port.component) {
                        None => {
                            seed += 1;
                            dangling += 1;
                            InputSource::Dangling
                        }
                        Some(source) if seen.contains_key(source) => {
                            seed += 1;
                            InputSource::Planned {
                                source,
                                port: port.index,
                            }
                        }
                        Some(source) => InputSource::Outside {
                            source,
                            port: port.index,
                        },
                    },
                })
                .collect();
            plan.sources.insert(key, sources);
            plan.seeds.insert(key, seed);
            plan.dangling.insert(key, dangling);
        }

        plan.cyclic = plan.unordered();
        plan
    }

    /// Kahn's algorithm over planned edges only. Whatever is left over could
    /// never reach zero in-degree.
    fn unordered(&self) -> SecondaryMap<NodeKey, ()> {
        let mut in_degree: SecondaryMap<NodeKey, usize> = SecondaryMap::new();
        for &key in &self.order {
            let planned = self.seeds.get(key).copied().unwrap_or(0)
                - self.dangling.get(key).copied().unwrap_or(0);
            in_degree.insert(key, planned);
        }

        let mut queue: VecDeque<NodeKey> = self
            .order
            .iter()
            .copied()
            .filter(|&k| in_degree.get(k) == Some(&0))
            .collect();
        let mut ordered = 0;

        while let Some(key) = queue.pop_front() {
            ordered += 1;
            for &dest in self.downstream.get(key).into_iter().flatten() {
                if let Some(deg) = in_degree.get_mut(dest) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(dest);
                    }
                }
            }
        }

        let mut remaining = SecondaryMap::new();
        if ordered < self.order.len() {
            for (key, &deg) in &in_degree {
                if deg > 0 {
                    remaining.insert(key, ());
                }
            }
        }
        remaining
    }

    /// Components whose gate is open before any signal arrives.
    pub fn ready(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.order
            .iter()
            .copied()
            .filter(|&k| self.seeds.get(k) == Some(&0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::id::PortRef;
    use crate::test_utils::*;

    fn keys(f: &Factory, ids: &[crate::id::ComponentId]) -> Vec<NodeKey> {
        ids.iter().map(|&id| f.key(id).unwrap()).collect()
    }

    fn chain(n: usize) -> (Factory, Vec<NodeKey>) {
        let mut f = Factory::default();
        let ids = f
            .add((0..n).map(|_| belt_mk1()).collect::<Vec<Component>>())
            .unwrap();
        for pair in ids.windows(2) {
            f.link(PortRef::new(pair[0], 0), PortRef::new(pair[1], 0))
                .unwrap();
        }
        let k = keys(&f, &ids);
        (f, k)
    }

    #[test]
    fn linear_chain_plan() {
        let (f, k) = chain(4);
        let plan = TraversalPlan::build(&f, &[k[0]]);
        assert_eq!(plan.order, k);
        assert_eq!(plan.seeds[k[0]], 0);
        assert_eq!(plan.seeds[k[3]], 1);
        assert_eq!(plan.ready().collect::<Vec<_>>(), vec![k[0]]);
        assert!(plan.cyclic.is_empty());
    }

    #[test]
    fn plan_from_the_middle_sees_outside_sources() {
        let (f, k) = chain(3);
        let plan = TraversalPlan::build(&f, &[k[1]]);
        assert_eq!(plan.order, vec![k[1], k[2]]);
        assert_eq!(plan.seeds[k[1]], 0);
        assert!(matches!(plan.sources[k[1]][0], InputSource::Outside { .. }));
    }

    #[test]
    fn merge_gate_counts_reachable_inputs() {
        let mut f = Factory::default();
        let ids = f.add([belt_mk1(), belt_mk1(), merger()]).unwrap();
        f.link(PortRef::new(ids[0], 0), PortRef::new(ids[2], 0)).unwrap();
        f.link(PortRef::new(ids[1], 0), PortRef::new(ids[2], 1)).unwrap();
        let k = keys(&f, &ids);

        let both = TraversalPlan::build(&f, &[k[0], k[1]]);
        assert_eq!(both.seeds[k[2]], 2);

        // Only one branch reachable: the other input is proven unreachable.
        let one = TraversalPlan::build(&f, &[k[0]]);
        assert_eq!(one.seeds[k[2]], 1);
    }

    #[test]
    fn cycle_is_left_unordered() {
        let (mut f, k) = chain(3);
        let ids: Vec<_> = k.iter().map(|&key| f.nodes[key].read().id()).collect();
        // b0 -> merger -> b1 -> b2 -> merger
        let m = f.add([merger()]).unwrap()[0];
        f.unlink(PortRef::new(ids[0], 0)).unwrap();
        f.link(PortRef::new(ids[0], 0), PortRef::new(m, 0)).unwrap();
        f.link(PortRef::new(m, 0), PortRef::new(ids[1], 0)).unwrap();
        f.link(PortRef::new(ids[2], 0), PortRef::new(m, 1)).unwrap();

        let plan = TraversalPlan::build(&f, &[k[0]]);
        let mk = f.key(m).unwrap();
        assert!(!plan.cyclic.contains_key(k[0]));
        assert!(plan.cyclic.contains_key(mk));
        assert!(plan.cyclic.contains_key(k[1]));
        assert!(plan.cyclic.contains_key(k[2]));
    }

    #[test]
    fn dangling_input_counts_but_is_not_cyclic() {
        let (mut f, k) = chain(2);
        let head = f.nodes[k[0]].read().id();
        let tail = f.nodes[k[1]].read().id();
        // Forget the head without unlinking the tail's input.
        let key = f.index.remove(&head).unwrap();
        f.nodes.remove(key);
        let tail_key = f.key(tail).unwrap();
        let plan = TraversalPlan::build(&f, &[tail_key]);
        assert_eq!(plan.seeds[tail_key], 1);
        assert_eq!(plan.dangling[tail_key], 1);
        assert!(plan.cyclic.is_empty());
        assert_eq!(plan.ready().count(), 0);
    }
}
