use crate::id::ComponentId;
use crate::item::{Ingredient, Item, Transport};
use crate::meta::Meta;
use serde::{Deserialize, Serialize};

/// The kind of building a recipe may run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildingType {
    Assembler,
    Blender,
    Constructor,
    Conveyance,
    Foundry,
    Manufacturer,
    Miner,
    OilExtractor,
    Packager,
    ParticleAccelerator,
    Refinery,
    ResourceWellPressurizer,
    Smelter,
    Storage,
    WaterExtractor,
}

impl BuildingType {
    /// Display form used in error reports, e.g. `"Water Extractor"`.
    pub fn title(&self) -> &'static str {
        match self {
            BuildingType::Assembler => "Assembler",
            BuildingType::Blender => "Blender",
            BuildingType::Constructor => "Constructor",
            BuildingType::Conveyance => "Conveyance",
            BuildingType::Foundry => "Foundry",
            BuildingType::Manufacturer => "Manufacturer",
            BuildingType::Miner => "Miner",
            BuildingType::OilExtractor => "Oil Extractor",
            BuildingType::Packager => "Packager",
            BuildingType::ParticleAccelerator => "Particle Accelerator",
            BuildingType::Refinery => "Refinery",
            BuildingType::ResourceWellPressurizer => "Resource Well Pressurizer",
            BuildingType::Smelter => "Smelter",
            BuildingType::Storage => "Storage",
            BuildingType::WaterExtractor => "Water Extractor",
        }
    }

    /// Types whose buildings move items instead of transforming them.
    pub fn is_pass_through(&self) -> bool {
        matches!(self, BuildingType::Conveyance | BuildingType::Storage)
    }
}

/// A transformation: what goes in, what comes out, and which building type
/// may run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub meta: Meta,
    pub building_type: BuildingType,
    pub consumes: Vec<Ingredient>,
    pub produces: Vec<Ingredient>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, building_type: BuildingType) -> Self {
        Self {
            meta: Meta::new(name),
            building_type,
            consumes: Vec::new(),
            produces: Vec::new(),
        }
    }

    pub fn consuming(mut self, ingredient: Ingredient) -> Self {
        self.consumes.push(ingredient);
        self
    }

    pub fn producing(mut self, ingredient: Ingredient) -> Self {
        self.produces.push(ingredient);
        self
    }

    pub fn id(&self) -> ComponentId {
        self.meta.id()
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// True for recipes that create items from nothing (miners, extractors).
    pub fn is_extraction(&self) -> bool {
        self.consumes.is_empty()
    }

    pub fn produces_item(&self, item: &Item) -> bool {
        self.produces.iter().any(|p| p.is_item(item))
    }

    /// Whether anything this recipe produces can ride the given transport.
    pub fn produces_for(&self, transport: Transport) -> bool {
        self.produces
            .iter()
            .any(|p| p.item.transport == Some(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_rate;
    use std::sync::Arc;

    #[test]
    fn titles_are_spaced() {
        assert_eq!(BuildingType::WaterExtractor.title(), "Water Extractor");
        assert_eq!(BuildingType::Smelter.title(), "Smelter");
    }

    #[test]
    fn building_type_serializes_screaming() {
        let json = serde_json::to_string(&BuildingType::OilExtractor).unwrap();
        assert_eq!(json, "\"OIL_EXTRACTOR\"");
    }

    #[test]
    fn extraction_recipes_consume_nothing() {
        let ore = Arc::new(Item::new("Iron Ore", Some(Transport::Belt)));
        let ingot = Arc::new(Item::new("Iron Ingot", Some(Transport::Belt)));
        let mine = Recipe::new("Iron Ore", BuildingType::Miner)
            .producing(Ingredient::per_minute(ore.clone(), f64_to_rate(60.0)));
        let smelt = Recipe::new("Iron Ingot", BuildingType::Smelter)
            .consuming(Ingredient::per_minute(ore.clone(), f64_to_rate(30.0)))
            .producing(Ingredient::per_minute(ingot.clone(), f64_to_rate(30.0)));
        assert!(mine.is_extraction());
        assert!(!smelt.is_extraction());
        assert!(smelt.produces_item(&ingot));
        assert!(!smelt.produces_item(&ore));
    }

    #[test]
    fn produces_for_checks_transport_class() {
        let water = Arc::new(Item::new("Water", Some(Transport::Pipe)));
        let pump = Recipe::new("Water", BuildingType::WaterExtractor)
            .producing(Ingredient::per_minute(water, f64_to_rate(120.0)));
        assert!(pump.produces_for(Transport::Pipe));
        assert!(!pump.produces_for(Transport::Belt));
    }
}
