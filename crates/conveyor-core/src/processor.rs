use crate::component::{Component, ComponentError, ComponentKind, Dimensions, Input, Output, ResourceNode};
use crate::fixed::{Rate, f64_to_rate, rate_to_f64, scale_rate};
use crate::item::{Ingredient, Quantity, Transport, merge_ingredients, total_rate};
use crate::recipe::{BuildingType, Recipe};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Highest clock factor a building accepts.
pub const MAX_CLOCK_RATE: f64 = 2.5;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("recipe {recipe} requires a {expected:?} but this building is a {actual:?}")]
    RecipeMismatch {
        recipe: String,
        expected: BuildingType,
        actual: BuildingType,
    },
    #[error("{0:?} buildings move items and cannot take a recipe")]
    RecipeOnPassThrough(BuildingType),
    #[error("clock rate {0} is outside (0, {MAX_CLOCK_RATE}]")]
    InvalidClockRate(f64),
    #[error("clock rate {0} needs an overclockable building")]
    NotOverclockable(f64),
    #[error("conveyance capacity must be positive, got {0}")]
    InvalidCapacity(f64),
}

// ---------------------------------------------------------------------------
// Output routing
// ---------------------------------------------------------------------------

/// How produced ingredients are spread over a component's outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OutputPolicy {
    /// Each product goes to the first compatible output not yet used,
    /// linked outputs first.
    #[default]
    Route,
    /// Each product is divided evenly over the compatible linked outputs.
    Split,
    /// Every compatible output carries a full copy of every product.
    Duplicate,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// The processing part shared by recipe buildings, conveyances and storage.
#[derive(Debug, Clone)]
pub struct Building {
    pub building_type: BuildingType,
    recipe: Option<Arc<Recipe>>,
    pub overclockable: bool,
    clock_rate: Rate,
    pub standby: bool,
    pub dimensions: Dimensions,
    /// Power line attachment points.
    pub power_connections: u8,
    /// Megawatts drawn at 100% clock.
    pub base_power_usage: Rate,
    pub output_policy: OutputPolicy,
}

impl Building {
    pub fn new(building_type: BuildingType) -> Self {
        Self {
            building_type,
            recipe: None,
            overclockable: true,
            clock_rate: Rate::ONE,
            standby: false,
            dimensions: Dimensions::default(),
            power_connections: 0,
            base_power_usage: Rate::ZERO,
            output_policy: OutputPolicy::default(),
        }
    }

    pub fn with_recipe(mut self, recipe: Arc<Recipe>) -> Result<Self, ConfigError> {
        self.set_recipe(Some(recipe))?;
        Ok(self)
    }

    pub fn with_clock_rate(mut self, clock_rate: Rate) -> Result<Self, ConfigError> {
        self.set_clock_rate(clock_rate)?;
        Ok(self)
    }

    pub fn with_standby(mut self, standby: bool) -> Self {
        self.standby = standby;
        self
    }

    pub fn with_policy(mut self, policy: OutputPolicy) -> Self {
        self.output_policy = policy;
        self
    }

    pub fn with_power(mut self, connections: u8, base_usage: Rate) -> Self {
        self.power_connections = connections;
        self.base_power_usage = base_usage;
        self
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn recipe(&self) -> Option<&Arc<Recipe>> {
        self.recipe.as_ref()
    }

    /// Assign or clear the recipe. The recipe's building type must match.
    pub fn set_recipe(&mut self, recipe: Option<Arc<Recipe>>) -> Result<(), ConfigError> {
        if let Some(r) = &recipe {
            if self.building_type.is_pass_through() {
                return Err(ConfigError::RecipeOnPassThrough(self.building_type));
            }
            if r.building_type != self.building_type {
                return Err(ConfigError::RecipeMismatch {
                    recipe: r.name().to_string(),
                    expected: r.building_type,
                    actual: self.building_type,
                });
            }
        }
        self.recipe = recipe;
        Ok(())
    }

    pub fn clock_rate(&self) -> Rate {
        self.clock_rate
    }

    pub fn set_clock_rate(&mut self, clock_rate: Rate) -> Result<(), ConfigError> {
        if clock_rate <= Rate::ZERO || clock_rate > f64_to_rate(MAX_CLOCK_RATE) {
            return Err(ConfigError::InvalidClockRate(rate_to_f64(clock_rate)));
        }
        if clock_rate > Rate::ONE && !self.overclockable {
            return Err(ConfigError::NotOverclockable(rate_to_f64(clock_rate)));
        }
        self.clock_rate = clock_rate;
        Ok(())
    }

    fn has_compatible_recipe(&self) -> bool {
        self.recipe
            .as_ref()
            .is_some_and(|r| r.building_type == self.building_type)
    }
}

// ---------------------------------------------------------------------------
// Conveyance and storage
// ---------------------------------------------------------------------------

/// A pass-through transporter: belts, pipes, lifts, mergers, splitters.
/// What leaves equals what arrives, capped at `max_rate`.
#[derive(Debug, Clone)]
pub struct Conveyance {
    pub building: Building,
    pub transport: Transport,
    max_rate: Rate,
}

impl Conveyance {
    pub fn new(transport: Transport, max_rate: Rate) -> Result<Self, ConfigError> {
        Self::with_type(BuildingType::Conveyance, transport, max_rate)
    }

    fn with_type(
        building_type: BuildingType,
        transport: Transport,
        max_rate: Rate,
    ) -> Result<Self, ConfigError> {
        if max_rate <= Rate::ZERO {
            return Err(ConfigError::InvalidCapacity(rate_to_f64(max_rate)));
        }
        let mut building = Building::new(building_type).with_policy(OutputPolicy::Split);
        building.overclockable = false;
        Ok(Self {
            building,
            transport,
            max_rate,
        })
    }

    pub fn max_rate(&self) -> Rate {
        self.max_rate
    }
}

/// A conveyance that also holds `stacks` inventory stacks.
#[derive(Debug, Clone)]
pub struct Storage {
    pub conveyance: Conveyance,
    pub stacks: u32,
}

/// Result of [`Component::storage_timing`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageTiming {
    pub until_full: Option<f64>,
    pub until_empty: Option<f64>,
}

impl Storage {
    pub fn new(transport: Transport, max_rate: Rate, stacks: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            conveyance: Conveyance::with_type(BuildingType::Storage, transport, max_rate)?,
            stacks,
        })
    }

    /// Net stacks gained per minute. Items that cannot be held are ignored.
    fn net_stacks_per_minute(&self, inbound: &[Ingredient], outbound: &[Ingredient]) -> f64 {
        let mut per_item: BTreeMap<crate::id::ComponentId, (f64, u32)> = BTreeMap::new();
        let flows = inbound
            .iter()
            .map(|i| (i, 1.0))
            .chain(outbound.iter().map(|o| (o, -1.0)));
        for (ingredient, sign) in flows {
            let (Some(rate), Some(stack)) = (ingredient.rate(), ingredient.item.stack_size) else {
                continue;
            };
            if stack == 0 {
                continue;
            }
            let entry = per_item.entry(ingredient.item.id()).or_insert((0.0, stack));
            entry.0 += sign * rate_to_f64(rate);
        }
        per_item
            .values()
            .map(|(net, stack)| net / f64::from(*stack))
            .sum()
    }

    /// Minutes to fill from empty, or `None` if the net flow never fills it.
    pub fn minutes_until_full(&self, inbound: &[Ingredient], outbound: &[Ingredient]) -> Option<f64> {
        let net = self.net_stacks_per_minute(inbound, outbound);
        (net > 0.0).then(|| f64::from(self.stacks) / net)
    }

    /// Minutes to drain from full, or `None` if the net flow never empties it.
    pub fn minutes_until_empty(&self, inbound: &[Ingredient], outbound: &[Ingredient]) -> Option<f64> {
        let net = self.net_stacks_per_minute(inbound, outbound);
        (net < 0.0).then(|| f64::from(self.stacks) / -net)
    }
}

// ---------------------------------------------------------------------------
// can_process / process
// ---------------------------------------------------------------------------

impl Component {
    /// Whether this component can run on what currently sits on its inputs.
    /// A false result is a soft stop, not an error.
    pub fn can_process(&self) -> bool {
        match &self.kind {
            ComponentKind::ResourceNode(_) => true,
            ComponentKind::Building(b) => can_process_building(b, &self.inputs),
            ComponentKind::Conveyance(c) => !c.building.standby,
            ComponentKind::Storage(s) => !s.conveyance.building.standby,
        }
    }

    /// Compute outbound flows from inbound flows and record anomalies.
    /// Callers check [`Component::can_process`] first.
    pub fn process(&mut self) {
        let errors = match &self.kind {
            ComponentKind::ResourceNode(node) => process_resource_node(node, &mut self.outputs),
            ComponentKind::Building(b) => process_building(b, &self.inputs, &mut self.outputs),
            ComponentKind::Conveyance(c) => process_conveyance(c, &self.inputs, &mut self.outputs, false),
            ComponentKind::Storage(s) => {
                process_conveyance(&s.conveyance, &self.inputs, &mut self.outputs, true)
            }
        };
        for error in errors {
            self.add_error(error);
        }
    }
}

// ---------------------------------------------------------------------------
// Resource node
// ---------------------------------------------------------------------------

fn process_resource_node(node: &ResourceNode, outputs: &mut [Output]) -> Vec<ComponentError> {
    let mut errors = Vec::new();
    for output in outputs.iter_mut() {
        output.ingredients.clear();
        output.resource = Some(crate::component::Resource {
            item: Arc::clone(&node.item),
            purity: node.purity,
        });
        if let Some(rate) = node.supply_rate {
            output
                .ingredients
                .push(Ingredient::per_minute(Arc::clone(&node.item), rate));
        }
        if !output.is_linked() {
            errors.push(ComponentError::warning("resource node is not connected"));
        }
    }
    errors
}

// ---------------------------------------------------------------------------
// Recipe building
// ---------------------------------------------------------------------------

fn can_process_building(building: &Building, inputs: &[Input]) -> bool {
    if building.standby || !building.has_compatible_recipe() {
        return false;
    }
    let Some(recipe) = building.recipe() else {
        return false;
    };
    if recipe.is_extraction() {
        return inputs.is_empty() || extraction_purity(recipe, inputs).is_some();
    }
    recipe.consumes.iter().all(|needed| {
        let Some(rate) = needed.rate() else {
            return false;
        };
        let required = rate.saturating_mul(building.clock_rate);
        inputs.iter().any(|input| {
            input
                .ingredients
                .iter()
                .filter(|i| i.is_item(&needed.item))
                .filter_map(Ingredient::rate)
                .any(|available| available >= required)
        })
    })
}

/// Purity multiplier of the first resource offer matching something the
/// recipe produces.
fn extraction_purity(recipe: &Recipe, inputs: &[Input]) -> Option<Rate> {
    inputs
        .iter()
        .filter_map(|i| i.resource.as_ref())
        .find(|offer| recipe.produces_item(&offer.item))
        .map(|offer| offer.purity.multiplier())
}

fn process_building(building: &Building, inputs: &[Input], outputs: &mut [Output]) -> Vec<ComponentError> {
    let Some(recipe) = building.recipe() else {
        return Vec::new();
    };
    let mut factor = building.clock_rate;
    if recipe.is_extraction() {
        factor = factor.saturating_mul(extraction_purity(recipe, inputs).unwrap_or(Rate::ONE));
    }
    let products = recipe.produces.iter().map(|p| scaled(p, factor)).collect();
    distribute(outputs, products, building.output_policy)
}

fn scaled(ingredient: &Ingredient, factor: Rate) -> Ingredient {
    match ingredient.quantity {
        Quantity::Rate(rate) => ingredient.with_rate(rate.saturating_mul(factor)),
        Quantity::Amount(_) => ingredient.clone(),
    }
}

// ---------------------------------------------------------------------------
// Conveyance
// ---------------------------------------------------------------------------

fn process_conveyance(
    conveyance: &Conveyance,
    inputs: &[Input],
    outputs: &mut [Output],
    holds: bool,
) -> Vec<ComponentError> {
    let mut errors = Vec::new();
    let mut flows = merge_ingredients(inputs.iter().flat_map(|i| i.ingredients.iter()));
    let total = total_rate(&flows);
    if total > conveyance.max_rate {
        errors.push(ComponentError::info(format!(
            "combined input rate exceeds output capacity ({} > {} per minute)",
            rate_to_f64(total),
            rate_to_f64(conveyance.max_rate)
        )));
        flows = flows
            .iter()
            .map(|f| match f.rate() {
                Some(rate) => f.with_rate(
                    scale_rate(rate, conveyance.max_rate, total).unwrap_or(conveyance.max_rate),
                ),
                None => f.clone(),
            })
            .collect();
    }
    // Storage keeps whatever it has nowhere to send.
    if holds && !outputs.iter().any(Output::is_linked) {
        for output in outputs.iter_mut() {
            output.clear();
        }
        return errors;
    }
    errors.extend(distribute(outputs, flows, conveyance.building.output_policy));
    errors
}

// ---------------------------------------------------------------------------
// Distribution over outputs
// ---------------------------------------------------------------------------

/// Place `products` onto `outputs` according to `policy`, replacing what the
/// outputs carried before.
fn distribute(outputs: &mut [Output], products: Vec<Ingredient>, policy: OutputPolicy) -> Vec<ComponentError> {
    for output in outputs.iter_mut() {
        output.clear();
    }
    let mut errors = Vec::new();
    let mut used = vec![false; outputs.len()];

    for product in products {
        // Linked outputs first, then the rest, each in port order.
        let mut candidates: Vec<usize> = (0..outputs.len())
            .filter(|&i| outputs[i].carries(&product.item))
            .collect();
        candidates.sort_by_key(|&i| !outputs[i].is_linked());

        if candidates.is_empty() {
            errors.push(ComponentError::error(format!(
                "no output can carry {}",
                product.item.name()
            )));
            continue;
        }

        match policy {
            OutputPolicy::Route => {
                let slot = candidates
                    .iter()
                    .copied()
                    .find(|&i| !used[i])
                    .unwrap_or(candidates[0]);
                used[slot] = true;
                outputs[slot].ingredients.push(product);
            }
            OutputPolicy::Split => {
                let linked: Vec<usize> = candidates
                    .iter()
                    .copied()
                    .filter(|&i| outputs[i].is_linked())
                    .collect();
                let targets = if linked.is_empty() { candidates } else { linked };
                match product.quantity {
                    Quantity::Rate(rate) => {
                        let share = rate / Rate::from_num(targets.len());
                        for i in targets {
                            outputs[i].ingredients.push(product.with_rate(share));
                        }
                    }
                    Quantity::Amount(_) => outputs[targets[0]].ingredients.push(product),
                }
            }
            OutputPolicy::Duplicate => {
                for i in candidates {
                    outputs[i].ingredients.push(product.clone());
                }
            }
        }
    }
    errors
}
