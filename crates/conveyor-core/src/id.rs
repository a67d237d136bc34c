use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;
use uuid::Uuid;

new_key_type! {
    /// Arena slot of a component inside a [`Factory`](crate::factory::Factory).
    /// Never leaves the factory that issued it.
    pub struct NodeKey;
}

/// Unique, immutable identity of a component, item or recipe.
///
/// Generated once at construction (UUID v4) and stable for the lifetime of
/// the value. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub Uuid);

impl ComponentId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A port on a component: the owning component plus the index into its
/// `inputs` or `outputs` list. Which list is implied by context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub component: ComponentId,
    pub index: usize,
}

impl PortRef {
    pub fn new(component: ComponentId, index: usize) -> Self {
        Self { component, index }
    }
}

/// Either side of a link. Used where a caller hands over a port without
/// the direction being implied by the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Port {
    Input(PortRef),
    Output(PortRef),
}

impl Port {
    pub fn port_ref(&self) -> PortRef {
        match self {
            Port::Input(p) | Port::Output(p) => *p,
        }
    }
}
