//! The identity record shared by components, items and recipes.

use crate::id::ComponentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const WIKI_URL_BASE: &str = "https://satisfactory.wiki.gg/wiki";
pub const IMAGE_URL_BASE: &str = "https://satisfactory.wiki.gg/images";

/// When something becomes available to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    /// Unlocked by a milestone: zero-based tier plus the upgrade within it.
    Milestone { tier: u8, upgrade: u8 },
    /// Unlocked through research rather than the milestone track.
    Research,
}

impl Default for Availability {
    fn default() -> Self {
        Availability::Milestone { tier: 0, upgrade: 0 }
    }
}

/// Identity and descriptive metadata.
///
/// `id` is generated once by [`Meta::new`] and never changes. `tags` is an
/// open-ended string map for caller-defined classification, searched by
/// [`Factory::get_components_by_tag`](crate::factory::Factory::get_components_by_tag).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    id: ComponentId,
    pub name: String,
    pub availability: Availability,
    pub wiki_path: String,
    pub image_path: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl Meta {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ComponentId::generate(), name)
    }

    /// Build a record around a caller-chosen id. Catalog loaders use this to
    /// keep ids stable across loads.
    pub fn with_id(id: ComponentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            availability: Availability::default(),
            wiki_path: "/Satisfactory_Wiki".to_string(),
            image_path: None,
            tags: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn wiki_url(&self) -> String {
        format!("{WIKI_URL_BASE}{}", self.wiki_path)
    }

    pub fn image_url(&self) -> Option<String> {
        self.image_path
            .as_ref()
            .map(|path| format!("{IMAGE_URL_BASE}{path}"))
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
