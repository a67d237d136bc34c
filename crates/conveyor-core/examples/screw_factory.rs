//! Screw factory example: load a catalog from JSON, lay out a screw line
//! with an over-supplied merger, simulate it and print the error report.
//!
//! Run with: `cargo run -p conveyor-core --example screw_factory --features data-loader`
//!
//! Set `RUST_LOG=conveyor_core=debug` to see every pass and soft stop.

use conveyor_core::component::{Component, Purity, ResourceNode};
use conveyor_core::data_loader::load_registry_json;
use conveyor_core::factory::{Direction, Factory};
use conveyor_core::fixed::{f64_to_rate, rate_to_f64};
use conveyor_core::id::PortRef;
use conveyor_core::item::Transport;
use conveyor_core::processor::{Building, Conveyance, Storage};
use conveyor_core::recipe::BuildingType;
use conveyor_core::traversal::StepPhase;
use std::error::Error;
use tracing_subscriber::EnvFilter;

const CATALOG: &str = r#"{
    "items": [
        { "name": "Iron Ore",   "transport": "Belt", "stack_size": 100, "sink_value": 1 },
        { "name": "Iron Ingot", "transport": "Belt", "stack_size": 100, "sink_value": 2 },
        { "name": "Iron Rod",   "transport": "Belt", "stack_size": 100, "sink_value": 4 },
        { "name": "Screw",      "transport": "Belt", "stack_size": 500, "sink_value": 2 }
    ],
    "recipes": [
        { "name": "Iron Ore", "building_type": "MINER",
          "produces": [{ "item": "Iron Ore", "rate": 60 }] },
        { "name": "Iron Ingot", "building_type": "SMELTER",
          "consumes": [{ "item": "Iron Ore", "rate": 30 }],
          "produces": [{ "item": "Iron Ingot", "rate": 30 }] },
        { "name": "Iron Rod", "building_type": "CONSTRUCTOR",
          "consumes": [{ "item": "Iron Ingot", "rate": 15 }],
          "produces": [{ "item": "Iron Rod", "rate": 15 }] },
        { "name": "Screw", "building_type": "CONSTRUCTOR",
          "consumes": [{ "item": "Iron Rod", "rate": 10 }],
          "produces": [{ "item": "Screw", "rate": 40 }] }
    ]
}"#;

fn belt() -> Component {
    let conveyance = Conveyance::new(Transport::Belt, f64_to_rate(60.0)).expect("positive capacity");
    Component::conveyance("Conveyor Belt Mk.1", conveyance, 1, 1)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = load_registry_json(CATALOG)?.build()?;
    let recipe = |name: &str| registry.recipe(name).ok_or_else(|| format!("missing recipe {name}"));
    let building = |bt: BuildingType, name: &str| -> Result<Building, Box<dyn Error>> {
        Ok(Building::new(bt).with_recipe(recipe(name)?)?)
    };
    let ore = registry.item("Iron Ore").ok_or("missing item Iron Ore")?;

    // --- Step 1: Lay out the line ---

    let mut factory = Factory::new("Screw Works");
    let ids = factory.add([
        Component::resource_node("Iron Ore Node", ResourceNode::new(ore.clone(), Purity::Normal)),
        Component::building(
            "Miner Mk.1",
            building(BuildingType::Miner, "Iron Ore")?,
            &[Transport::ResourceNode],
            &[Transport::Belt],
        ),
        Component::building(
            "Smelter",
            building(BuildingType::Smelter, "Iron Ingot")?,
            &[Transport::Belt],
            &[Transport::Belt],
        ),
        Component::building(
            "Rod Constructor",
            building(BuildingType::Constructor, "Iron Rod")?,
            &[Transport::Belt],
            &[Transport::Belt],
        ),
        Component::building(
            "Screw Constructor",
            building(BuildingType::Constructor, "Screw")?,
            &[Transport::Belt],
            &[Transport::Belt],
        ),
        Component::storage(
            "Screw Storage",
            Storage::new(Transport::Belt, f64_to_rate(60.0), 24)?,
            1,
            1,
        ),
    ])?;
    factory.link(PortRef::new(ids[0], 0), PortRef::new(ids[1], 0))?;
    for pair in ids[1..].windows(2) {
        factory.connect(pair[0], pair[1], belt, Direction::Forward)?;
    }

    // --- Step 2: A second, over-supplied line ---

    let merger = Component::conveyance(
        "Ore Merger",
        Conveyance::new(Transport::Belt, f64_to_rate(45.0))?,
        3,
        1,
    )
    .with_tag("area", "overflow");
    let extra = factory.add([
        Component::resource_node("Ore Import A", ResourceNode::supply(ore.clone(), f64_to_rate(30.0))),
        Component::resource_node("Ore Import B", ResourceNode::supply(ore, f64_to_rate(30.0))),
        merger,
    ])?;
    factory.link(PortRef::new(extra[0], 0), PortRef::new(extra[2], 0))?;
    factory.link(PortRef::new(extra[1], 0), PortRef::new(extra[2], 1))?;

    // --- Step 3: Simulate ---

    let report = factory.simulate();
    println!(
        "pass {}: {} processed, {} soft stops, {} untraversed",
        report.traversal.pass,
        report.traversal.visited,
        report.traversal.halted,
        report.untraversed.len()
    );

    let storage = factory.get_component_by_id(ids[5])?;
    for ingredient in storage.inbound() {
        if let Some(rate) = ingredient.rate() {
            println!("storage receives {} {}/min", rate_to_f64(rate), ingredient.item.name());
        }
    }
    if let Some(timing) = storage.storage_timing()
        && let Some(minutes) = timing.until_full
    {
        println!("storage full in {minutes:.0} minutes");
    }
    drop(storage);

    println!("{}", serde_json::to_string_pretty(&factory.get_errors_as_dict())?);

    // --- Step 4: Step through the line once more ---

    factory.purge();
    factory.simulate_debug(|component, phase| {
        if phase == StepPhase::After {
            let out: Vec<String> = component
                .outbound()
                .iter()
                .filter_map(|i| i.rate().map(|r| format!("{} {}", rate_to_f64(r), i.item.name())))
                .collect();
            println!("  {:<20} -> [{}]", component.name(), out.join(", "));
        }
    });

    Ok(())
}
