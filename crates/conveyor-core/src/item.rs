use crate::fixed::Rate;
use crate::id::ComponentId;
use crate::meta::Meta;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The mechanism by which something moves between two ports. Ports only
/// link to ports of the same class, and items only ride ports of their class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    Belt,
    Pipe,
    Vehicle,
    PowerLine,
    /// The link between a resource node and the extractor sitting on it.
    ResourceNode,
}

/// A resource kind. Catalog data: built once and shared behind an `Arc`.
///
/// `transport` is `None` for things that cannot be conveyed at all.
/// `stack_size` is `None` for things that cannot be held in an inventory,
/// `sink_value` is `None` for things that cannot be sunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub meta: Meta,
    pub transport: Option<Transport>,
    pub stack_size: Option<u32>,
    pub sink_value: Option<u32>,
}

impl Item {
    pub fn new(name: impl Into<String>, transport: Option<Transport>) -> Self {
        Self {
            meta: Meta::new(name),
            transport,
            stack_size: None,
            sink_value: None,
        }
    }

    pub fn with_stack_size(mut self, stack_size: u32) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn with_sink_value(mut self, sink_value: u32) -> Self {
        self.sink_value = Some(sink_value);
        self
    }

    pub fn id(&self) -> ComponentId {
        self.meta.id()
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Number of inventory stacks needed to hold `count` of this item.
    /// `None` when the item cannot be held.
    pub fn stacks(&self, count: u32) -> Option<u32> {
        match self.stack_size {
            Some(0) | None => None,
            Some(size) => Some(count.div_ceil(size)),
        }
    }
}

/// How much of an item an ingredient stands for. Exactly one of the two
/// measures is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    /// Items per single operation (workbench or build-gun style).
    Amount(u32),
    /// Items per minute of continuous operation.
    Rate(Rate),
}

/// An (item, quantity) pair used by recipes and carried by connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub item: Arc<Item>,
    pub quantity: Quantity,
}

impl Ingredient {
    pub fn per_minute(item: Arc<Item>, rate: Rate) -> Self {
        Self {
            item,
            quantity: Quantity::Rate(rate),
        }
    }

    pub fn per_operation(item: Arc<Item>, amount: u32) -> Self {
        Self {
            item,
            quantity: Quantity::Amount(amount),
        }
    }

    /// The per-minute rate, if this ingredient is rate-based.
    pub fn rate(&self) -> Option<Rate> {
        match self.quantity {
            Quantity::Rate(r) => Some(r),
            Quantity::Amount(_) => None,
        }
    }

    pub fn is_item(&self, item: &Item) -> bool {
        self.item.id() == item.id()
    }

    /// A copy of this ingredient with its rate replaced.
    pub fn with_rate(&self, rate: Rate) -> Self {
        Self::per_minute(Arc::clone(&self.item), rate)
    }
}

impl PartialEq for Ingredient {
    fn eq(&self, other: &Self) -> bool {
        self.item.id() == other.item.id() && self.quantity == other.quantity
    }
}

/// Combine ingredients of the same item, summing like measures with
/// saturation. First-seen order is kept so merges are deterministic.
pub fn merge_ingredients<'a>(ingredients: impl IntoIterator<Item = &'a Ingredient>) -> Vec<Ingredient> {
    let mut merged: Vec<Ingredient> = Vec::new();
    for ingredient in ingredients {
        let existing = merged.iter_mut().find(|m| {
            m.item.id() == ingredient.item.id()
                && matches!(
                    (m.quantity, ingredient.quantity),
                    (Quantity::Rate(_), Quantity::Rate(_)) | (Quantity::Amount(_), Quantity::Amount(_))
                )
        });
        match existing {
            Some(m) => {
                m.quantity = match (m.quantity, ingredient.quantity) {
                    (Quantity::Rate(a), Quantity::Rate(b)) => Quantity::Rate(a.saturating_add(b)),
                    (Quantity::Amount(a), Quantity::Amount(b)) => Quantity::Amount(a.saturating_add(b)),
                    (q, _) => q,
                };
            }
            None => merged.push(ingredient.clone()),
        }
    }
    merged
}

/// Total per-minute rate of the rate-based ingredients in a list.
pub fn total_rate<'a>(ingredients: impl IntoIterator<Item = &'a Ingredient>) -> Rate {
    crate::fixed::sum_rates(ingredients.into_iter().filter_map(Ingredient::rate))
}
