//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).
//!
//! Items and recipes come from one process-wide [`Registry`], so the same
//! item handle (and id) is returned on every call.

use crate::component::{Component, Purity, ResourceNode};
use crate::factory::{Direction, Factory};
use crate::fixed::{Rate, f64_to_rate};
use crate::id::{ComponentId, PortRef};
use crate::item::{Ingredient, Item, Transport};
use crate::processor::{Building, Conveyance, Storage};
use crate::recipe::{BuildingType, Recipe};
use crate::registry::{Registry, RegistryBuilder};
use std::sync::{Arc, OnceLock};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn rate(v: f64) -> Rate {
    f64_to_rate(v)
}

// ===========================================================================
// Catalog
// ===========================================================================

/// The test catalog: iron ore through screws, plus water.
pub fn catalog() -> &'static Registry {
    static CATALOG: OnceLock<Registry> = OnceLock::new();
    CATALOG.get_or_init(|| build_catalog().expect("test catalog is valid"))
}

fn build_catalog() -> Result<Registry, crate::registry::RegistryError> {
    let mut b = RegistryBuilder::new();
    let ore = b.register_item(Item::new("Iron Ore", Some(Transport::Belt)).with_stack_size(100).with_sink_value(1))?;
    let ingot = b.register_item(Item::new("Iron Ingot", Some(Transport::Belt)).with_stack_size(100).with_sink_value(2))?;
    let rod = b.register_item(Item::new("Iron Rod", Some(Transport::Belt)).with_stack_size(100).with_sink_value(4))?;
    let screw = b.register_item(Item::new("Screw", Some(Transport::Belt)).with_stack_size(500).with_sink_value(2))?;
    let water = b.register_item(Item::new("Water", Some(Transport::Pipe)))?;

    b.register_recipe(
        Recipe::new("Iron Ore", BuildingType::Miner).producing(Ingredient::per_minute(Arc::clone(&ore), rate(60.0))),
    )?;
    b.register_recipe(
        Recipe::new("Iron Ingot", BuildingType::Smelter)
            .consuming(Ingredient::per_minute(ore, rate(30.0)))
            .producing(Ingredient::per_minute(Arc::clone(&ingot), rate(30.0))),
    )?;
    b.register_recipe(
        Recipe::new("Iron Rod", BuildingType::Constructor)
            .consuming(Ingredient::per_minute(ingot, rate(15.0)))
            .producing(Ingredient::per_minute(Arc::clone(&rod), rate(15.0))),
    )?;
    b.register_recipe(
        Recipe::new("Screw", BuildingType::Constructor)
            .consuming(Ingredient::per_minute(rod, rate(10.0)))
            .producing(Ingredient::per_minute(screw, rate(40.0))),
    )?;
    b.register_recipe(
        Recipe::new("Water", BuildingType::WaterExtractor).producing(Ingredient::per_minute(water, rate(120.0))),
    )?;
    b.build()
}

fn item(name: &str) -> Arc<Item> {
    catalog().item(name).expect("item is in the test catalog")
}

fn recipe(name: &str) -> Arc<Recipe> {
    catalog().recipe(name).expect("recipe is in the test catalog")
}

// ===========================================================================
// Items
// ===========================================================================

pub fn iron_ore() -> Arc<Item> {
    item("Iron Ore")
}
pub fn iron_ingot() -> Arc<Item> {
    item("Iron Ingot")
}
pub fn iron_rod() -> Arc<Item> {
    item("Iron Rod")
}
pub fn screw() -> Arc<Item> {
    item("Screw")
}
pub fn water() -> Arc<Item> {
    item("Water")
}

// ===========================================================================
// Recipes
// ===========================================================================

pub fn iron_ore_recipe() -> Arc<Recipe> {
    recipe("Iron Ore")
}
pub fn iron_ingot_recipe() -> Arc<Recipe> {
    recipe("Iron Ingot")
}
pub fn iron_rod_recipe() -> Arc<Recipe> {
    recipe("Iron Rod")
}
pub fn screw_recipe() -> Arc<Recipe> {
    recipe("Screw")
}
pub fn water_recipe() -> Arc<Recipe> {
    recipe("Water")
}

// ===========================================================================
// Resource nodes
// ===========================================================================

pub fn iron_node(purity: Purity) -> Component {
    Component::resource_node("Iron Ore Node", ResourceNode::new(iron_ore(), purity))
}

/// Stand-in for another factory feeding `item` at `per_minute`.
pub fn supply_node(item: Arc<Item>, per_minute: Rate) -> Component {
    let name = format!("{} Supply", item.name());
    Component::resource_node(name, ResourceNode::supply(item, per_minute))
}

// ===========================================================================
// Buildings
// ===========================================================================

fn recipe_building(name: &str, recipe: Arc<Recipe>, inputs: &[Transport], outputs: &[Transport]) -> Component {
    let building = Building::new(recipe.building_type)
        .with_recipe(recipe)
        .expect("fixture recipe matches its building");
    Component::building(name, building, inputs, outputs)
}

pub fn miner() -> Component {
    recipe_building("Miner Mk.1", iron_ore_recipe(), &[Transport::ResourceNode], &[Transport::Belt])
}

pub fn smelter() -> Component {
    recipe_building("Smelter", iron_ingot_recipe(), &[Transport::Belt], &[Transport::Belt])
}

pub fn constructor_rod() -> Component {
    recipe_building("Constructor", iron_rod_recipe(), &[Transport::Belt], &[Transport::Belt])
}

pub fn constructor_screw() -> Component {
    recipe_building("Constructor", screw_recipe(), &[Transport::Belt], &[Transport::Belt])
}

pub fn water_extractor() -> Component {
    recipe_building("Water Extractor", water_recipe(), &[], &[Transport::Pipe])
}

// ===========================================================================
// Conveyances
// ===========================================================================

fn conveyance(name: &str, transport: Transport, per_minute: f64, inputs: usize, outputs: usize) -> Component {
    let conveyance = Conveyance::new(transport, rate(per_minute)).expect("fixture capacity is positive");
    Component::conveyance(name, conveyance, inputs, outputs)
}

pub fn belt_mk1() -> Component {
    conveyance("Conveyor Belt Mk.1", Transport::Belt, 60.0, 1, 1)
}

pub fn belt_mk2() -> Component {
    conveyance("Conveyor Belt Mk.2", Transport::Belt, 120.0, 1, 1)
}

pub fn pipeline_mk1() -> Component {
    conveyance("Pipeline Mk.1", Transport::Pipe, 300.0, 1, 1)
}

/// Three belt inputs into one output at 60 per minute.
pub fn merger() -> Component {
    merger_with_capacity(60.0)
}

pub fn merger_with_capacity(per_minute: f64) -> Component {
    conveyance("Conveyor Merger", Transport::Belt, per_minute, 3, 1)
}

/// One belt input split over three outputs.
pub fn splitter() -> Component {
    conveyance("Conveyor Splitter", Transport::Belt, 60.0, 1, 3)
}

pub fn storage_container() -> Component {
    let storage = Storage::new(Transport::Belt, rate(60.0), 24).expect("fixture capacity is positive");
    Component::storage("Storage Container", storage, 1, 1)
}

// ===========================================================================
// Scenarios
// ===========================================================================

/// Ids of the buildings in a [`screw_line`].
#[derive(Debug, Clone, Copy)]
pub struct ScrewLine {
    pub node: ComponentId,
    pub miner: ComponentId,
    pub smelter: ComponentId,
    pub rod: ComponentId,
    pub screw: ComponentId,
    pub storage: ComponentId,
}

/// Iron ore node -> miner -> smelter -> rod constructor -> screw
/// constructor -> storage, joined by Mk.1 belts.
pub fn screw_line(factory: &mut Factory, purity: Purity) -> ScrewLine {
    let ids = factory
        .add([
            iron_node(purity),
            miner(),
            smelter(),
            constructor_rod(),
            constructor_screw(),
            storage_container(),
        ])
        .expect("fresh fixture ids");
    factory
        .link(PortRef::new(ids[0], 0), PortRef::new(ids[1], 0))
        .expect("node feeds miner");
    for pair in ids[1..].windows(2) {
        factory
            .connect(pair[0], pair[1], belt_mk1, Direction::Forward)
            .expect("belt joins neighbours");
    }
    ScrewLine {
        node: ids[0],
        miner: ids[1],
        smelter: ids[2],
        rod: ids[3],
        screw: ids[4],
        storage: ids[5],
    }
}

/// Two 30/min iron ore supplies merged through a merger of `capacity`.
/// Returns the merger's id.
pub fn merger_oversupply(factory: &mut Factory, capacity: f64) -> ComponentId {
    let ids = factory
        .add([
            supply_node(iron_ore(), rate(30.0)),
            supply_node(iron_ore(), rate(30.0)),
            merger_with_capacity(capacity),
            storage_container(),
        ])
        .expect("fresh fixture ids");
    factory
        .link(PortRef::new(ids[0], 0), PortRef::new(ids[2], 0))
        .expect("first supply feeds merger");
    factory
        .link(PortRef::new(ids[1], 0), PortRef::new(ids[2], 1))
        .expect("second supply feeds merger");
    factory
        .link(PortRef::new(ids[2], 0), PortRef::new(ids[3], 0))
        .expect("merger feeds storage");
    ids[2]
}

/// `lines` independent screw lines in one factory.
pub fn screw_works(lines: usize) -> Factory {
    let mut factory = Factory::new("Screw Works");
    for _ in 0..lines {
        screw_line(&mut factory, Purity::Normal);
    }
    factory
}
