use crate::component::Component;
use crate::id::{ComponentId, NodeKey, Port, PortRef};
use crate::item::Transport;
use crate::meta::Meta;
use crate::traversal::Schedule;
use parking_lot::{RwLock, RwLockReadGuard};
use slotmap::SlotMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Construction and topology errors. Fatal to the operation that raised
/// them; the factory is left unchanged.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("duplicate component id: {0}")]
    DuplicateId(ComponentId),
    #[error("component not found: {0}")]
    NotFound(ComponentId),
    #[error("no such port: {0:?}")]
    NoSuchPort(Port),
    #[error("port already linked: {0:?}")]
    PortInUse(Port),
    #[error("cannot link a {output:?} output to a {input:?} input")]
    TransportMismatch { output: Transport, input: Transport },
    #[error("component {0} cannot link to itself")]
    SelfLoop(ComponentId),
    #[error("component {component} has no free {transport:?} input")]
    NoFreeInput {
        component: ComponentId,
        transport: Transport,
    },
    #[error("component {component} has no free {transport:?} output")]
    NoFreeOutput {
        component: ComponentId,
        transport: Transport,
    },
    #[error("component {component} produces nothing a {transport:?} conveyance can carry")]
    IncompatibleConveyance {
        component: ComponentId,
        transport: Transport,
    },
    #[error("{0} is not a conveyance")]
    NotAConveyance(String),
}

// ---------------------------------------------------------------------------
// Members and directions
// ---------------------------------------------------------------------------

/// One entry handed to [`Factory::add`]: a component or a group of them.
#[derive(Debug)]
pub enum Member {
    One(Component),
    Many(Vec<Component>),
}

impl From<Component> for Member {
    fn from(component: Component) -> Self {
        Member::One(component)
    }
}

impl From<Vec<Component>> for Member {
    fn from(components: Vec<Component>) -> Self {
        Member::Many(components)
    }
}

/// Which side of a [`Factory::connect`] call is upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// `source` output feeds `target` input.
    #[default]
    Forward,
    /// `target` output feeds `source` input.
    Reverse,
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// An arena of components, unique by id. Links are stored on the ports as
/// [`PortRef`]s, so the graph is a set of edges over this index rather than
/// a pointer graph.
///
/// Each component sits behind its own lock so traversal passes can work on
/// disjoint components concurrently through `&self`. Structural changes
/// (`add`, `remove`, `link`, ...) and [`Factory::purge`] take `&mut self`.
#[derive(Debug)]
pub struct Factory {
    pub meta: Meta,
    pub(crate) nodes: SlotMap<NodeKey, RwLock<Component>>,
    pub(crate) index: HashMap<ComponentId, NodeKey>,
    schedule: Schedule,
    passes: AtomicU64,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new("Factory")
    }
}

impl Factory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: Meta::new(name),
            nodes: SlotMap::with_key(),
            index: HashMap::new(),
            schedule: Schedule::default(),
            passes: AtomicU64::new(0),
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.index.contains_key(&id)
    }

    /// Ids of every member, in arena order.
    pub fn ids(&self) -> Vec<ComponentId> {
        self.nodes.values().map(|node| node.read().id()).collect()
    }

    /// Read access to every member, in arena order.
    pub fn components(&self) -> impl Iterator<Item = RwLockReadGuard<'_, Component>> {
        self.nodes.values().map(|node| node.read())
    }

    pub(crate) fn key(&self, id: ComponentId) -> Option<NodeKey> {
        self.index.get(&id).copied()
    }

    /// A fresh, nonzero pass id.
    pub(crate) fn next_pass(&self) -> u64 {
        self.passes.fetch_add(1, Ordering::Relaxed) + 1
    }

    // -- membership ----------------------------------------------------------

    /// Add components, flattening one level of grouping. All or nothing: a
    /// duplicate id anywhere rejects the whole call.
    pub fn add<I, M>(&mut self, members: I) -> Result<Vec<ComponentId>, FactoryError>
    where
        I: IntoIterator<Item = M>,
        M: Into<Member>,
    {
        let mut flat = Vec::new();
        for member in members {
            match member.into() {
                Member::One(component) => flat.push(component),
                Member::Many(components) => flat.extend(components),
            }
        }

        let mut seen = HashSet::with_capacity(flat.len());
        for component in &flat {
            let id = component.id();
            if self.index.contains_key(&id) || !seen.insert(id) {
                return Err(FactoryError::DuplicateId(id));
            }
        }

        let mut ids = Vec::with_capacity(flat.len());
        for component in flat {
            let id = component.id();
            debug!(component = %id, name = component.name(), "added component");
            let key = self.nodes.insert(RwLock::new(component));
            self.index.insert(id, key);
            ids.push(id);
        }
        Ok(ids)
    }

    /// Unlink every port touching `id` and take it out of the factory.
    pub fn remove(&mut self, id: ComponentId) -> Result<Component, FactoryError> {
        let (outputs, inputs): (Vec<PortRef>, Vec<PortRef>) = {
            let component = self.component_mut(id)?;
            (
                (0..component.outputs.len()).map(|i| PortRef::new(id, i)).collect(),
                component.inputs.iter().filter_map(|i| i.source()).collect(),
            )
        };
        for output in outputs.into_iter().chain(inputs) {
            if self.contains(output.component) {
                self.unlink(output)?;
            }
        }
        let key = self.index.remove(&id).ok_or(FactoryError::NotFound(id))?;
        let node = self.nodes.remove(key).ok_or(FactoryError::NotFound(id))?;
        let mut component = node.into_inner();
        // Sources that were already gone leave dangling back-references.
        for input in &mut component.inputs {
            input.source = None;
        }
        debug!(component = %id, "removed component");
        Ok(component)
    }

    // -- linking -------------------------------------------------------------

    /// Join an output to an input on a different component. Both ports must
    /// be free and of the same transport class.
    pub fn link(&mut self, output: PortRef, input: PortRef) -> Result<(), FactoryError> {
        if output.component == input.component {
            return Err(FactoryError::SelfLoop(output.component));
        }
        let out_transport = {
            let from = self.component_mut(output.component)?;
            let port = from
                .outputs
                .get(output.index)
                .ok_or(FactoryError::NoSuchPort(Port::Output(output)))?;
            if port.is_linked() {
                return Err(FactoryError::PortInUse(Port::Output(output)));
            }
            port.transport
        };
        {
            let to = self.component_mut(input.component)?;
            let port = to
                .inputs
                .get_mut(input.index)
                .ok_or(FactoryError::NoSuchPort(Port::Input(input)))?;
            if port.is_linked() {
                return Err(FactoryError::PortInUse(Port::Input(input)));
            }
            if port.transport != out_transport {
                return Err(FactoryError::TransportMismatch {
                    output: out_transport,
                    input: port.transport,
                });
            }
            port.source = Some(output);
        }
        if let Some(port) = self
            .component_mut(output.component)?
            .outputs
            .get_mut(output.index)
        {
            port.target = Some(input);
        }
        debug!(from = %output.component, to = %input.component, transport = ?out_transport, "linked");
        Ok(())
    }

    /// Clear the link on `output` at both ends. Returns the input it fed.
    pub fn unlink(&mut self, output: PortRef) -> Result<Option<PortRef>, FactoryError> {
        let target = {
            let from = self.component_mut(output.component)?;
            let port = from
                .outputs
                .get_mut(output.index)
                .ok_or(FactoryError::NoSuchPort(Port::Output(output)))?;
            port.target.take()
        };
        if let Some(input) = target
            && let Some(&key) = self.index.get(&input.component)
            && let Some(node) = self.nodes.get_mut(key)
            && let Some(port) = node.get_mut().inputs.get_mut(input.index)
        {
            port.source = None;
        }
        Ok(target)
    }

    /// Build a conveyance between two components and link it in.
    ///
    /// The conveyance comes from `conveyance`. A free output of its transport
    /// class is taken on the upstream side and a free input on the downstream
    /// side; [`Direction::Reverse`] makes `target` the upstream side. An
    /// unnamed conveyance is named `"<upstream>" to "<downstream>"`. Nothing
    /// is changed if any check fails.
    pub fn connect<F>(
        &mut self,
        source: ComponentId,
        target: ComponentId,
        conveyance: F,
        direction: Direction,
    ) -> Result<ComponentId, FactoryError>
    where
        F: FnOnce() -> Component,
    {
        let (up, down) = match direction {
            Direction::Forward => (source, target),
            Direction::Reverse => (target, source),
        };
        if up == down {
            return Err(FactoryError::SelfLoop(up));
        }

        let mut conveyor = conveyance();
        let transport = conveyor
            .conveyance_ref()
            .map(|c| c.transport)
            .ok_or_else(|| FactoryError::NotAConveyance(conveyor.name().to_string()))?;

        let (up_port, up_name) = {
            let upstream = self.get_component_by_id(up)?;
            let compatible = match upstream.resource() {
                Some(node) => node.output_transport() == transport,
                None => upstream
                    .building_ref()
                    .and_then(|b| b.recipe())
                    .is_none_or(|r| r.produces_for(transport)),
            };
            if !compatible {
                return Err(FactoryError::IncompatibleConveyance {
                    component: up,
                    transport,
                });
            }
            let port = upstream
                .free_output(transport)
                .ok_or(FactoryError::NoFreeOutput {
                    component: up,
                    transport,
                })?;
            (port, upstream.name().to_string())
        };
        let (down_port, down_name) = {
            let downstream = self.get_component_by_id(down)?;
            let port = downstream
                .free_input(transport)
                .ok_or(FactoryError::NoFreeInput {
                    component: down,
                    transport,
                })?;
            (port, downstream.name().to_string())
        };

        let id = conveyor.id();
        let conv_in = conveyor.free_input(transport).ok_or(FactoryError::NoFreeInput {
            component: id,
            transport,
        })?;
        let conv_out = conveyor.free_output(transport).ok_or(FactoryError::NoFreeOutput {
            component: id,
            transport,
        })?;
        if conveyor.name().is_empty() {
            conveyor.meta.name = format!("\"{up_name}\" to \"{down_name}\"");
        }

        self.add([conveyor])?;
        self.link(PortRef::new(up, up_port), PortRef::new(id, conv_in))?;
        self.link(PortRef::new(id, conv_out), PortRef::new(down, down_port))?;
        Ok(id)
    }

    /// Free ports on other components that `port` could link to: inputs for
    /// an output, outputs for an input, same transport class. Keyed by the
    /// owning component.
    pub fn available_connections(
        &self,
        port: Port,
        ignore_conveyances: bool,
    ) -> Result<BTreeMap<ComponentId, Vec<PortRef>>, FactoryError> {
        let origin = port.port_ref();
        let transport = {
            let owner = self.get_component_by_id(origin.component)?;
            match port {
                Port::Output(p) => owner.outputs.get(p.index).map(|o| o.transport),
                Port::Input(p) => owner.inputs.get(p.index).map(|i| i.transport),
            }
            .ok_or(FactoryError::NoSuchPort(port))?
        };

        let mut available = BTreeMap::new();
        for component in self.components() {
            let id = component.id();
            if id == origin.component || (ignore_conveyances && component.is_conveyance()) {
                continue;
            }
            let ports: Vec<PortRef> = match port {
                Port::Output(_) => component
                    .inputs
                    .iter()
                    .enumerate()
                    .filter(|(_, i)| !i.is_linked() && i.transport == transport)
                    .map(|(index, _)| PortRef::new(id, index))
                    .collect(),
                Port::Input(_) => component
                    .outputs
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| !o.is_linked() && o.transport == transport)
                    .map(|(index, _)| PortRef::new(id, index))
                    .collect(),
            };
            if !ports.is_empty() {
                available.insert(id, ports);
            }
        }
        Ok(available)
    }

    // -- access --------------------------------------------------------------

    /// Exact lookup by id.
    pub fn get_component_by_id(
        &self,
        id: ComponentId,
    ) -> Result<RwLockReadGuard<'_, Component>, FactoryError> {
        self.key(id)
            .and_then(|key| self.nodes.get(key))
            .map(|node| node.read())
            .ok_or(FactoryError::NotFound(id))
    }

    /// Exclusive access outside of any traversal pass.
    pub fn component_mut(&mut self, id: ComponentId) -> Result<&mut Component, FactoryError> {
        let key = self.key(id).ok_or(FactoryError::NotFound(id))?;
        self.nodes
            .get_mut(key)
            .map(|node| node.get_mut())
            .ok_or(FactoryError::NotFound(id))
    }
}
