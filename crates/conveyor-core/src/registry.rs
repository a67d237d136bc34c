use crate::item::Item;
use crate::recipe::{BuildingType, Recipe};
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<Arc<Item>>,
    item_by_name: HashMap<String, usize>,
    recipes: Vec<Recipe>,
    recipe_by_name: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item. Returns the shared handle recipes should use.
    pub fn register_item(&mut self, item: Item) -> Result<Arc<Item>, RegistryError> {
        let name = item.name().to_string();
        if self.item_by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let item = Arc::new(item);
        self.item_by_name.insert(name, self.items.len());
        self.items.push(Arc::clone(&item));
        Ok(item)
    }

    /// Phase 1: Register a recipe.
    pub fn register_recipe(&mut self, recipe: Recipe) -> Result<(), RegistryError> {
        let name = recipe.name().to_string();
        if self.recipe_by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.recipe_by_name.insert(name, self.recipes.len());
        self.recipes.push(recipe);
        Ok(())
    }

    /// Phase 2: Mutate an existing recipe by name.
    pub fn mutate_recipe<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut Recipe),
    {
        let index = *self
            .recipe_by_name
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        f(&mut self.recipes[index]);
        Ok(())
    }

    /// Lookup a registered item by name.
    pub fn item(&self, name: &str) -> Option<Arc<Item>> {
        self.item_by_name
            .get(name)
            .map(|&i| Arc::clone(&self.items[i]))
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        // Every ingredient must point at an item registered here.
        for recipe in &self.recipes {
            for ingredient in recipe.consumes.iter().chain(recipe.produces.iter()) {
                let known = self
                    .items
                    .iter()
                    .any(|item| item.id() == ingredient.item.id());
                if !known {
                    return Err(RegistryError::InvalidItemRef {
                        recipe: recipe.name().to_string(),
                        item: ingredient.item.name().to_string(),
                    });
                }
            }
        }

        Ok(Registry {
            items: self.items,
            item_by_name: self.item_by_name,
            recipes: self.recipes.into_iter().map(Arc::new).collect(),
            recipe_by_name: self.recipe_by_name,
        })
    }
}

/// Immutable item and recipe catalog. Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Registry {
    items: Vec<Arc<Item>>,
    item_by_name: HashMap<String, usize>,
    recipes: Vec<Arc<Recipe>>,
    recipe_by_name: HashMap<String, usize>,
}

impl Registry {
    pub fn item(&self, name: &str) -> Option<Arc<Item>> {
        self.item_by_name
            .get(name)
            .map(|&i| Arc::clone(&self.items[i]))
    }

    pub fn recipe(&self, name: &str) -> Option<Arc<Recipe>> {
        self.recipe_by_name
            .get(name)
            .map(|&i| Arc::clone(&self.recipes[i]))
    }

    /// All recipes a building of the given type can run, in registration order.
    pub fn recipes_for(&self, building_type: BuildingType) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes
            .iter()
            .filter(move |r| r.building_type == building_type)
    }

    pub fn items(&self) -> &[Arc<Item>] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("recipe {recipe} references unregistered item {item}")]
    InvalidItemRef { recipe: String, item: String },
}
