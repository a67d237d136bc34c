use crate::fixed::{Rate, f64_to_rate};
use crate::id::{ComponentId, PortRef};
use crate::item::{Ingredient, Item, Transport, merge_ingredients};
use crate::meta::Meta;
use crate::processor::{Building, Conveyance, Storage, StorageTiming};
use crate::recipe::BuildingType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// Errors attached to components
// ---------------------------------------------------------------------------

/// Severity of a processing anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorLevel {
    Info,
    Warning,
    Error,
}

/// A processing anomaly recorded on the component that produced it.
/// Never returned as `Err`; pulled afterwards through the factory's error
/// aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentError {
    pub level: ErrorLevel,
    pub message: String,
}

impl ComponentError {
    pub fn new(level: ErrorLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ErrorLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ErrorLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorLevel::Error, message)
    }
}

// ---------------------------------------------------------------------------
// Resource nodes
// ---------------------------------------------------------------------------

/// Richness of a resource node. Multiplies extractor output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purity {
    Impure,
    #[default]
    Normal,
    Pure,
}

impl Purity {
    pub fn multiplier(&self) -> Rate {
        match self {
            Purity::Impure => f64_to_rate(0.5),
            Purity::Normal => Rate::ONE,
            Purity::Pure => f64_to_rate(2.0),
        }
    }
}

/// What a resource node offers to the extractor linked to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub item: Arc<Item>,
    pub purity: Purity,
}

/// Origin of all flow. Has no inputs and exactly one output.
///
/// A plain node offers its resource to an extractor over a
/// [`Transport::ResourceNode`] link. A supply node (see [`ResourceNode::supply`])
/// stands in for an outside factory and emits the item directly at a fixed rate.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub item: Arc<Item>,
    pub purity: Purity,
    pub supply_rate: Option<Rate>,
}

impl ResourceNode {
    pub fn new(item: Arc<Item>, purity: Purity) -> Self {
        Self {
            item,
            purity,
            supply_rate: None,
        }
    }

    pub fn supply(item: Arc<Item>, rate: Rate) -> Self {
        Self {
            item,
            purity: Purity::Normal,
            supply_rate: Some(rate),
        }
    }

    /// Transport class of the node's single output.
    pub fn output_transport(&self) -> Transport {
        match self.supply_rate {
            Some(_) => self.item.transport.unwrap_or(Transport::ResourceNode),
            None => Transport::ResourceNode,
        }
    }
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Incoming port. `source` mirrors the output that targets this input and is
/// maintained only by the factory's link operations.
#[derive(Debug, Clone)]
pub struct Input {
    pub transport: Transport,
    pub ingredients: Vec<Ingredient>,
    pub resource: Option<Resource>,
    pub(crate) source: Option<PortRef>,
}

impl Input {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            ingredients: Vec::new(),
            resource: None,
            source: None,
        }
    }

    pub fn source(&self) -> Option<PortRef> {
        self.source
    }

    pub fn is_linked(&self) -> bool {
        self.source.is_some()
    }

    pub fn clear(&mut self) {
        self.ingredients.clear();
        self.resource = None;
    }
}

/// Outgoing port pointing at an input on a different component.
#[derive(Debug, Clone)]
pub struct Output {
    pub transport: Transport,
    pub ingredients: Vec<Ingredient>,
    pub resource: Option<Resource>,
    pub(crate) target: Option<PortRef>,
}

impl Output {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            ingredients: Vec::new(),
            resource: None,
            target: None,
        }
    }

    pub fn target(&self) -> Option<PortRef> {
        self.target
    }

    pub fn is_linked(&self) -> bool {
        self.target.is_some()
    }

    pub fn clear(&mut self) {
        self.ingredients.clear();
        self.resource = None;
    }

    /// Whether this port can carry the given item.
    pub fn carries(&self, item: &Item) -> bool {
        item.transport == Some(self.transport)
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Processing specialization. Dispatches via enum match (no trait objects).
#[derive(Debug, Clone)]
pub enum ComponentKind {
    ResourceNode(ResourceNode),
    Building(Building),
    Conveyance(Conveyance),
    Storage(Storage),
}

/// Physical footprint of a building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub length: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, length: f64, height: f64) -> Self {
        Self {
            width,
            length,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.length
    }

    pub fn volume(&self) -> f64 {
        self.area() * self.height
    }
}

/// Anything that can be placed in a factory.
///
/// `traversed`, `errors` and the ports' ingredient lists are working state:
/// written by traversal passes and cleared by the reset operations, never by
/// construction or linking.
#[derive(Debug)]
pub struct Component {
    pub meta: Meta,
    pub constructed: bool,
    /// Id of the pass that last claimed this component; 0 means not traversed.
    traversed: AtomicU64,
    errors: Vec<ComponentError>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub kind: ComponentKind,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        kind: ComponentKind,
        inputs: Vec<Input>,
        outputs: Vec<Output>,
    ) -> Self {
        Self {
            meta: Meta::new(name),
            constructed: false,
            traversed: AtomicU64::new(0),
            errors: Vec::new(),
            inputs,
            outputs,
            kind,
        }
    }

    pub fn resource_node(name: impl Into<String>, node: ResourceNode) -> Self {
        let output = Output::new(node.output_transport());
        Self::new(name, ComponentKind::ResourceNode(node), Vec::new(), vec![output])
    }

    /// A recipe-driven building with one port per listed transport class.
    pub fn building(
        name: impl Into<String>,
        building: Building,
        inputs: &[Transport],
        outputs: &[Transport],
    ) -> Self {
        Self::new(
            name,
            ComponentKind::Building(building),
            inputs.iter().copied().map(Input::new).collect(),
            outputs.iter().copied().map(Output::new).collect(),
        )
    }

    /// A pass-through transporter with `inputs` and `outputs` ports of its
    /// own transport class.
    pub fn conveyance(
        name: impl Into<String>,
        conveyance: Conveyance,
        inputs: usize,
        outputs: usize,
    ) -> Self {
        let t = conveyance.transport;
        Self::new(
            name,
            ComponentKind::Conveyance(conveyance),
            (0..inputs).map(|_| Input::new(t)).collect(),
            (0..outputs).map(|_| Output::new(t)).collect(),
        )
    }

    pub fn storage(name: impl Into<String>, storage: Storage, inputs: usize, outputs: usize) -> Self {
        let t = storage.conveyance.transport;
        Self::new(
            name,
            ComponentKind::Storage(storage),
            (0..inputs).map(|_| Input::new(t)).collect(),
            (0..outputs).map(|_| Output::new(t)).collect(),
        )
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_constructed(mut self, constructed: bool) -> Self {
        self.constructed = constructed;
        self
    }

    pub fn id(&self) -> ComponentId {
        self.meta.id()
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    // -- kind accessors ------------------------------------------------------

    pub fn is_resource_node(&self) -> bool {
        matches!(self.kind, ComponentKind::ResourceNode(_))
    }

    /// Conveyances and storage: components that move items unchanged.
    pub fn is_conveyance(&self) -> bool {
        matches!(self.kind, ComponentKind::Conveyance(_) | ComponentKind::Storage(_))
    }

    pub fn resource(&self) -> Option<&ResourceNode> {
        match &self.kind {
            ComponentKind::ResourceNode(node) => Some(node),
            _ => None,
        }
    }

    /// The building part of any processing specialization.
    pub fn building_ref(&self) -> Option<&Building> {
        match &self.kind {
            ComponentKind::ResourceNode(_) => None,
            ComponentKind::Building(b) => Some(b),
            ComponentKind::Conveyance(c) => Some(&c.building),
            ComponentKind::Storage(s) => Some(&s.conveyance.building),
        }
    }

    pub fn building_mut(&mut self) -> Option<&mut Building> {
        match &mut self.kind {
            ComponentKind::ResourceNode(_) => None,
            ComponentKind::Building(b) => Some(b),
            ComponentKind::Conveyance(c) => Some(&mut c.building),
            ComponentKind::Storage(s) => Some(&mut s.conveyance.building),
        }
    }

    pub fn conveyance_ref(&self) -> Option<&Conveyance> {
        match &self.kind {
            ComponentKind::Conveyance(c) => Some(c),
            ComponentKind::Storage(s) => Some(&s.conveyance),
            _ => None,
        }
    }

    pub fn building_type(&self) -> Option<BuildingType> {
        self.building_ref().map(|b| b.building_type)
    }

    pub fn is_standby(&self) -> bool {
        self.building_ref().is_some_and(|b| b.standby)
    }

    // -- working state -------------------------------------------------------

    pub fn is_traversed(&self) -> bool {
        self.traversed.load(Ordering::Acquire) != 0
    }

    pub fn traversed_pass(&self) -> u64 {
        self.traversed.load(Ordering::Acquire)
    }

    /// Claim this component for `pass`. Returns false if the pass already
    /// holds the claim.
    pub(crate) fn claim(&self, pass: u64) -> bool {
        self.traversed.swap(pass, Ordering::AcqRel) != pass
    }

    pub fn errors(&self) -> &[ComponentError] {
        &self.errors
    }

    pub fn add_error(&mut self, error: ComponentError) {
        self.errors.push(error);
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn clear_outputs(&mut self) {
        for output in &mut self.outputs {
            output.clear();
        }
    }

    /// Clear every piece of working state: traversal marker, errors and the
    /// flows and offers on all ports.
    pub fn reset_working_state(&mut self) {
        *self.traversed.get_mut() = 0;
        self.errors.clear();
        for input in &mut self.inputs {
            input.clear();
        }
        self.clear_outputs();
    }

    /// Everything currently arriving on all inputs, merged by item.
    pub fn inbound(&self) -> Vec<Ingredient> {
        merge_ingredients(self.inputs.iter().flat_map(|i| i.ingredients.iter()))
    }

    /// Everything currently leaving on all outputs, merged by item.
    pub fn outbound(&self) -> Vec<Ingredient> {
        merge_ingredients(self.outputs.iter().flat_map(|o| o.ingredients.iter()))
    }

    /// Minutes until this storage fills (from empty) and empties (from full)
    /// at its current flows. `None` for components that are not storage.
    pub fn storage_timing(&self) -> Option<StorageTiming> {
        match &self.kind {
            ComponentKind::Storage(storage) => {
                let inbound = self.inbound();
                let outbound = self.outbound();
                Some(StorageTiming {
                    until_full: storage.minutes_until_full(&inbound, &outbound),
                    until_empty: storage.minutes_until_empty(&inbound, &outbound),
                })
            }
            _ => None,
        }
    }

    /// Index of the first unlinked input of the given class.
    pub fn free_input(&self, transport: Transport) -> Option<usize> {
        self.inputs
            .iter()
            .position(|i| !i.is_linked() && i.transport == transport)
    }

    /// Index of the first unlinked output of the given class.
    pub fn free_output(&self, transport: Transport) -> Option<usize> {
        self.outputs
            .iter()
            .position(|o| !o.is_linked() && o.transport == transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_rate;
    use crate::test_utils::*;

    #[test]
    fn purity_multipliers() {
        assert_eq!(Purity::Impure.multiplier(), f64_to_rate(0.5));
        assert_eq!(Purity::Normal.multiplier(), Rate::ONE);
        assert_eq!(Purity::Pure.multiplier(), f64_to_rate(2.0));
    }

    #[test]
    fn resource_node_has_one_output_and_no_inputs() {
        let node = iron_node(Purity::Pure);
        assert!(node.inputs.is_empty());
        assert_eq!(node.outputs.len(), 1);
        assert_eq!(node.outputs[0].transport, Transport::ResourceNode);
        assert!(node.is_resource_node());
        assert!(node.building_type().is_none());
    }

    #[test]
    fn supply_node_outputs_on_item_transport() {
        let node = supply_node(iron_ore(), f64_to_rate(30.0));
        assert_eq!(node.outputs[0].transport, Transport::Belt);
    }

    #[test]
    fn claim_is_once_per_pass() {
        let c = belt_mk1();
        assert!(!c.is_traversed());
        assert!(c.claim(1));
        assert!(!c.claim(1));
        assert!(c.is_traversed());
        assert_eq!(c.traversed_pass(), 1);
        assert!(c.claim(2));
    }

    #[test]
    fn reset_clears_working_state() {
        let mut c = belt_mk1();
        c.claim(7);
        c.add_error(ComponentError::info("x"));
        c.inputs[0]
            .ingredients
            .push(Ingredient::per_minute(iron_ore(), f64_to_rate(1.0)));
        c.outputs[0]
            .ingredients
            .push(Ingredient::per_minute(iron_ore(), f64_to_rate(1.0)));
        c.reset_working_state();
        assert!(!c.is_traversed());
        assert!(c.errors().is_empty());
        assert!(c.inbound().is_empty());
        assert!(c.outbound().is_empty());
    }

    #[test]
    fn kind_accessors() {
        let storage = storage_container();
        assert!(storage.is_conveyance());
        assert_eq!(storage.building_type(), Some(BuildingType::Storage));
        assert!(storage.conveyance_ref().is_some());
        let smelter = smelter();
        assert!(!smelter.is_conveyance());
        assert_eq!(smelter.building_type(), Some(BuildingType::Smelter));
    }

    #[test]
    fn free_port_lookup_respects_transport() {
        let c = smelter();
        assert_eq!(c.free_input(Transport::Belt), Some(0));
        assert_eq!(c.free_input(Transport::Pipe), None);
        assert_eq!(c.free_output(Transport::Belt), Some(0));
    }

    #[test]
    fn dimensions_area_and_volume() {
        let d = Dimensions::new(6.0, 9.0, 9.0);
        assert_eq!(d.area(), 54.0);
        assert_eq!(d.volume(), 486.0);
    }

    #[test]
    fn error_level_serializes_screaming() {
        let json = serde_json::to_string(&ComponentError::warning("w")).unwrap();
        assert_eq!(json, r#"{"level":"WARNING","message":"w"}"#);
    }

    #[test]
    fn storage_timing_only_for_storage() {
        assert!(smelter().storage_timing().is_none());
        assert!(storage_container().storage_timing().is_some());
    }
}
