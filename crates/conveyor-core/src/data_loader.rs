//! Data-driven catalog loading from JSON.
//!
//! Feature-gated behind `data-loader`. Provides JSON deserialization into
//! [`RegistryBuilder`] for item and recipe tables kept in data files.

use crate::fixed::{Rate, checked_f64_to_rate};
use crate::item::{Ingredient, Item, Transport};
use crate::meta::Availability;
use crate::recipe::{BuildingType, Recipe};
use crate::registry::{RegistryBuilder, RegistryError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("unknown item reference: {0}")]
    UnknownItemRef(String),
    #[error("ingredient {item} in recipe {recipe} must set exactly one of amount or rate")]
    AmbiguousQuantity { recipe: String, item: String },
    #[error("ingredient {item} in recipe {recipe} has invalid rate {rate}")]
    InvalidRate { recipe: String, item: String, rate: f64 },
}

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level catalog structure for JSON deserialization.
#[derive(Debug, serde::Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub items: Vec<ItemData>,
    #[serde(default)]
    pub recipes: Vec<RecipeData>,
}

/// JSON representation of an item.
#[derive(Debug, serde::Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default)]
    pub transport: Option<Transport>,
    #[serde(default)]
    pub stack_size: Option<u32>,
    #[serde(default)]
    pub sink_value: Option<u32>,
    #[serde(default)]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub wiki_path: Option<String>,
}

/// JSON representation of a recipe.
#[derive(Debug, serde::Deserialize)]
pub struct RecipeData {
    pub name: String,
    pub building_type: BuildingType,
    #[serde(default)]
    pub consumes: Vec<IngredientData>,
    #[serde(default)]
    pub produces: Vec<IngredientData>,
}

/// JSON representation of an ingredient. Exactly one of `amount` and `rate`
/// must be present.
#[derive(Debug, serde::Deserialize)]
pub struct IngredientData {
    pub item: String, // references item by name
    #[serde(default)]
    pub amount: Option<u32>,
    #[serde(default)]
    pub rate: Option<f64>,
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load a catalog from a JSON string.
pub fn load_registry_json(json: &str) -> Result<RegistryBuilder, DataLoadError> {
    let data: CatalogData = serde_json::from_str(json)?;
    build_registry(data)
}

/// Load a catalog from JSON bytes.
pub fn load_registry_json_bytes(bytes: &[u8]) -> Result<RegistryBuilder, DataLoadError> {
    let data: CatalogData = serde_json::from_slice(bytes)?;
    build_registry(data)
}

fn parse_ingredient(
    builder: &RegistryBuilder,
    recipe: &str,
    entry: &IngredientData,
) -> Result<Ingredient, DataLoadError> {
    let item = builder
        .item(&entry.item)
        .ok_or_else(|| DataLoadError::UnknownItemRef(entry.item.clone()))?;
    match (entry.amount, entry.rate) {
        (Some(amount), None) => Ok(Ingredient::per_operation(item, amount)),
        (None, Some(rate)) => checked_f64_to_rate(rate)
            .filter(|r| *r >= Rate::ZERO)
            .map(|r| Ingredient::per_minute(item, r))
            .ok_or_else(|| DataLoadError::InvalidRate {
                recipe: recipe.to_string(),
                item: entry.item.clone(),
                rate,
            }),
        _ => Err(DataLoadError::AmbiguousQuantity {
            recipe: recipe.to_string(),
            item: entry.item.clone(),
        }),
    }
}

fn build_registry(data: CatalogData) -> Result<RegistryBuilder, DataLoadError> {
    let mut builder = RegistryBuilder::new();

    // Phase 1: Register all items
    for entry in data.items {
        let mut item = Item::new(entry.name, entry.transport);
        item.stack_size = entry.stack_size;
        item.sink_value = entry.sink_value;
        if let Some(availability) = entry.availability {
            item.meta.availability = availability;
        }
        if let Some(path) = entry.wiki_path {
            item.meta.wiki_path = path;
        }
        builder.register_item(item)?;
    }

    // Phase 2: Register all recipes (resolve item refs by name)
    for entry in &data.recipes {
        let mut recipe = Recipe::new(entry.name.clone(), entry.building_type);
        for consumed in &entry.consumes {
            recipe.consumes.push(parse_ingredient(&builder, &entry.name, consumed)?);
        }
        for produced in &entry.produces {
            recipe.produces.push(parse_ingredient(&builder, &entry.name, produced)?);
        }
        builder.register_recipe(recipe)?;
    }

    Ok(builder)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_rate;
    use crate::item::Quantity;

    #[test]
    fn load_empty_json() {
        let reg = load_registry_json(r#"{"items": [], "recipes": []}"#)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(reg.item_count(), 0);
        assert_eq!(reg.recipe_count(), 0);
    }

    #[test]
    fn load_items_only() {
        let json = r#"{"items": [
            {"name": "Iron Ore", "transport": "Belt", "stack_size": 100, "sink_value": 1},
            {"name": "Water", "transport": "Pipe"}
        ]}"#;
        let reg = load_registry_json(json).unwrap().build().unwrap();
        assert_eq!(reg.item_count(), 2);
        let ore = reg.item("Iron Ore").unwrap();
        assert_eq!(ore.stack_size, Some(100));
        assert_eq!(ore.sink_value, Some(1));
        assert_eq!(reg.item("Water").unwrap().stacks(10), None);
    }

    #[test]
    fn load_full_catalog() {
        let json = r#"{
            "items": [
                {"name": "Iron Ore", "transport": "Belt", "stack_size": 100,
                 "availability": {"Milestone": {"tier": 0, "upgrade": 2}}, "wiki_path": "/Iron_Ore"},
                {"name": "Iron Ingot", "transport": "Belt", "stack_size": 100}
            ],
            "recipes": [
                {"name": "Iron Ore", "building_type": "MINER",
                 "produces": [{"item": "Iron Ore", "rate": 60}]},
                {"name": "Iron Ingot", "building_type": "SMELTER",
                 "consumes": [{"item": "Iron Ore", "rate": 30}],
                 "produces": [{"item": "Iron Ingot", "rate": 30}]}
            ]
        }"#;
        let reg = load_registry_json(json).unwrap().build().unwrap();
        assert_eq!(reg.recipe_count(), 2);
        let ore = reg.item("Iron Ore").unwrap();
        assert_eq!(
            ore.meta.availability,
            Availability::Milestone { tier: 0, upgrade: 2 }
        );
        assert_eq!(ore.meta.wiki_url(), "https://satisfactory.wiki.gg/wiki/Iron_Ore");
        let smelt = reg.recipe("Iron Ingot").unwrap();
        assert_eq!(smelt.consumes[0].quantity, Quantity::Rate(f64_to_rate(30.0)));
        assert!(reg.recipe("Iron Ore").unwrap().is_extraction());
    }

    #[test]
    fn load_amount_ingredient() {
        let json = r#"{
            "items": [{"name": "Iron Rod"}, {"name": "Beacon"}],
            "recipes": [{"name": "Beacon", "building_type": "MANUFACTURER",
                         "consumes": [{"item": "Iron Rod", "amount": 3}],
                         "produces": [{"item": "Beacon", "amount": 1}]}]
        }"#;
        let reg = load_registry_json(json).unwrap().build().unwrap();
        let recipe = reg.recipe("Beacon").unwrap();
        assert_eq!(recipe.consumes[0].quantity, Quantity::Amount(3));
    }

    #[test]
    fn load_unknown_item_fails() {
        let json = r#"{
            "items": [{"name": "Ore"}],
            "recipes": [{"name": "Bad", "building_type": "SMELTER",
                         "consumes": [{"item": "Nonexistent", "rate": 1}]}]
        }"#;
        let err = load_registry_json(json).unwrap_err();
        assert!(matches!(err, DataLoadError::UnknownItemRef(name) if name == "Nonexistent"));
    }

    #[test]
    fn ingredient_with_both_measures_fails() {
        let json = r#"{
            "items": [{"name": "Ore"}],
            "recipes": [{"name": "Bad", "building_type": "SMELTER",
                         "consumes": [{"item": "Ore", "amount": 1, "rate": 30}]}]
        }"#;
        assert!(matches!(
            load_registry_json(json).unwrap_err(),
            DataLoadError::AmbiguousQuantity { .. }
        ));
    }

    #[test]
    fn ingredient_with_no_measure_fails() {
        let json = r#"{
            "items": [{"name": "Ore"}],
            "recipes": [{"name": "Bad", "building_type": "SMELTER",
                         "consumes": [{"item": "Ore"}]}]
        }"#;
        assert!(matches!(
            load_registry_json(json).unwrap_err(),
            DataLoadError::AmbiguousQuantity { .. }
        ));
    }

    #[test]
    fn out_of_range_rates_fail() {
        for rate in ["1e12", "-30", "-1e12"] {
            let json = format!(
                r#"{{
                    "items": [{{"name": "Ore"}}],
                    "recipes": [{{"name": "Ore", "building_type": "MINER",
                                 "produces": [{{"item": "Ore", "rate": {rate}}}]}}]
                }}"#
            );
            assert!(matches!(
                load_registry_json_bytes(json.as_bytes()).unwrap_err(),
                DataLoadError::InvalidRate { item, .. } if item == "Ore"
            ));
        }
    }

    #[test]
    fn duplicate_item_surfaces_registry_error() {
        let json = r#"{"items": [{"name": "Ore"}, {"name": "Ore"}]}"#;
        assert!(matches!(
            load_registry_json(json).unwrap_err(),
            DataLoadError::Registry(RegistryError::DuplicateName(_))
        ));
    }

    #[test]
    fn load_invalid_json_fails() {
        let result = load_registry_json("not valid json {{{");
        assert!(matches!(result.unwrap_err(), DataLoadError::JsonParse(_)));
    }

    #[test]
    fn load_from_bytes() {
        let reg = load_registry_json_bytes(br#"{"items": [{"name": "Screw"}]}"#)
            .unwrap()
            .build()
            .unwrap();
        assert!(reg.item("Screw").is_some());
    }
}
