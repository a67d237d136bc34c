//! Read-only query API over a factory's members and their errors.
//!
//! Lookups hand back read guards on the live components; error reports are
//! owned copies suitable for rendering or serializing.

use crate::component::{Component, ComponentError, ErrorLevel};
use crate::factory::Factory;
use crate::id::ComponentId;
use crate::recipe::BuildingType;
use parking_lot::RwLockReadGuard;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Match mode
// ---------------------------------------------------------------------------

/// How a query string is compared against a name or tag value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    Exact,
    /// The query must appear somewhere in the candidate.
    Substring,
}

impl MatchMode {
    pub fn matches(&self, query: &str, candidate: &str) -> bool {
        match self {
            MatchMode::Exact => candidate == query,
            MatchMode::Substring => candidate.contains(query),
        }
    }
}

// ---------------------------------------------------------------------------
// Error reports
// ---------------------------------------------------------------------------

/// One serialized error: `{"level": "INFO", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub level: ErrorLevel,
    pub message: String,
}

impl From<&ComponentError> for ErrorRecord {
    fn from(error: &ComponentError) -> Self {
        Self {
            level: error.level,
            message: error.message.clone(),
        }
    }
}

/// Display record for one component's errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Component name.
    pub component: String,
    /// Title-case building type, `"Resource Node"` for resource nodes.
    pub building_type: String,
    pub errors: Vec<ErrorRecord>,
}

/// Title-case type label used in error reports.
pub fn type_title(component: &Component) -> &'static str {
    component
        .building_type()
        .map(|t| t.title())
        .unwrap_or("Resource Node")
}

// ---------------------------------------------------------------------------
// Factory queries
// ---------------------------------------------------------------------------

impl Factory {
    fn select<P>(&self, predicate: P) -> Vec<RwLockReadGuard<'_, Component>>
    where
        P: Fn(&Component) -> bool,
    {
        self.components().filter(|c| predicate(&**c)).collect()
    }

    pub fn resource_nodes(&self) -> Vec<RwLockReadGuard<'_, Component>> {
        self.select(Component::is_resource_node)
    }

    pub fn get_buildings_by_type(&self, building_type: BuildingType) -> Vec<RwLockReadGuard<'_, Component>> {
        self.select(|c| c.building_type() == Some(building_type))
    }

    pub fn get_components_by_name(&self, name: &str, mode: MatchMode) -> Vec<RwLockReadGuard<'_, Component>> {
        self.select(|c| mode.matches(name, c.name()))
    }

    /// Components carrying tag `key`. With no `value`, any value matches;
    /// otherwise the value is compared under `mode`. The key always matches
    /// exactly.
    pub fn get_components_by_tag(
        &self,
        key: &str,
        value: Option<&str>,
        mode: MatchMode,
    ) -> Vec<RwLockReadGuard<'_, Component>> {
        self.select(|c| match (c.meta.tag(key), value) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(tagged), Some(wanted)) => mode.matches(wanted, tagged),
        })
    }

    /// Errors per component, only for components that have any.
    pub fn get_errors(&self) -> BTreeMap<ComponentId, Vec<ComponentError>> {
        self.components()
            .filter(|c| !c.errors().is_empty())
            .map(|c| (c.id(), c.errors().to_vec()))
            .collect()
    }

    /// Display form of [`Factory::get_errors`].
    pub fn get_errors_as_dict(&self) -> BTreeMap<ComponentId, ErrorReport> {
        self.components()
            .filter(|c| !c.errors().is_empty())
            .map(|c| {
                let report = ErrorReport {
                    component: c.name().to_string(),
                    building_type: type_title(&c).to_string(),
                    errors: c.errors().iter().map(ErrorRecord::from).collect(),
                };
                (c.id(), report)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Purity;
    use crate::test_utils::*;

    fn tagged_factory() -> (Factory, Vec<ComponentId>) {
        let mut f = Factory::default();
        let ids = f
            .add([
                smelter().with_tag("line", "av1"),
                constructor_rod().with_tag("line", "b"),
                iron_node(Purity::Normal),
                belt_mk1(),
            ])
            .unwrap();
        (f, ids)
    }

    #[test]
    fn match_modes() {
        assert!(MatchMode::Exact.matches("Smelter", "Smelter"));
        assert!(!MatchMode::Exact.matches("Smelt", "Smelter"));
        assert!(MatchMode::Substring.matches("Smelt", "Smelter"));
    }

    #[test]
    fn tag_without_value_matches_key_only() {
        let (f, _) = tagged_factory();
        assert_eq!(f.get_components_by_tag("line", None, MatchMode::Exact).len(), 2);
        assert!(f.get_components_by_tag("zone", None, MatchMode::Substring).is_empty());
    }

    #[test]
    fn tag_value_fuzzy_and_exact() {
        let (f, ids) = tagged_factory();
        let fuzzy = f.get_components_by_tag("line", Some("v"), MatchMode::Substring);
        assert_eq!(fuzzy.len(), 1);
        assert_eq!(fuzzy[0].id(), ids[0]);
        assert!(f.get_components_by_tag("line", Some("v"), MatchMode::Exact).is_empty());
        assert_eq!(f.get_components_by_tag("line", Some("b"), MatchMode::Exact).len(), 1);
    }

    #[test]
    fn tag_key_is_never_fuzzy() {
        let (f, _) = tagged_factory();
        assert!(f.get_components_by_tag("lin", None, MatchMode::Substring).is_empty());
    }

    #[test]
    fn name_lookup() {
        let (f, _) = tagged_factory();
        assert_eq!(f.get_components_by_name("Smelter", MatchMode::Exact).len(), 1);
        assert!(f.get_components_by_name("Smelt", MatchMode::Exact).is_empty());
        assert_eq!(f.get_components_by_name("r", MatchMode::Substring).len(), 4);
    }

    #[test]
    fn type_lookups() {
        let (f, ids) = tagged_factory();
        let smelters = f.get_buildings_by_type(BuildingType::Smelter);
        assert_eq!(smelters.len(), 1);
        assert_eq!(smelters[0].id(), ids[0]);
        assert_eq!(f.get_buildings_by_type(BuildingType::Conveyance).len(), 1);
        let nodes = f.resource_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id(), ids[2]);
    }

    #[test]
    fn errors_only_list_components_with_errors() {
        let (mut f, ids) = tagged_factory();
        assert!(f.get_errors().is_empty());
        f.component_mut(ids[2])
            .unwrap()
            .add_error(ComponentError::warning("resource node is not connected"));
        let errors = f.get_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[&ids[2]].len(), 1);
    }

    #[test]
    fn errors_as_dict_shape() {
        let (mut f, ids) = tagged_factory();
        f.component_mut(ids[0])
            .unwrap()
            .add_error(ComponentError::info("slow"));
        f.component_mut(ids[2])
            .unwrap()
            .add_error(ComponentError::warning("lonely"));
        let dict = f.get_errors_as_dict();
        assert_eq!(dict[&ids[0]].building_type, "Smelter");
        assert_eq!(dict[&ids[2]].building_type, "Resource Node");

        let json = serde_json::to_value(&dict).unwrap();
        let entry = &json[ids[0].to_string()];
        assert_eq!(entry["component"], "Smelter");
        assert_eq!(entry["errors"][0]["level"], "INFO");
        assert_eq!(entry["errors"][0]["message"], "slow");
    }
}
