//! Component-type categories.
//!
//! A plain lookup table from component name to category. Hosts extend or
//! replace the defaults; the engine only ever asks "is this a container?".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category of a component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentCategory {
    /// Leaf widgets (button, text, icon, …).
    Atomic,
    /// Opaque business widgets rendered as a unit.
    Business,
    /// Named placeholders that receive arbitrary content.
    Slot,
    /// Layout containers (container, card, list, …).
    BasicContainer,
}

impl ComponentCategory {
    pub fn is_container(self) -> bool {
        matches!(self, Self::Slot | Self::BasicContainer)
    }
}

const DEFAULT_ATOMIC: &[&str] = &[
    "Button", "Text", "Icon", "Image", "Input", "Checkbox", "Radio", "Switch", "Tag", "Avatar",
    "Divider", "Link",
];
const DEFAULT_BUSINESS: &[&str] = &["Chart", "Map", "VideoPlayer", "RichEditor"];
const DEFAULT_SLOT: &[&str] = &["Slot", "HeaderSlot", "FooterSlot"];
const DEFAULT_CONTAINER: &[&str] = &[
    "Container", "Card", "List", "ListItem", "Grid", "Row", "Column", "Form", "Modal", "Tabs",
    "Section",
];

/// Lookup table from component name to category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentRegistry {
    categories: HashMap<String, ComponentCategory>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (names, category) in [
            (DEFAULT_ATOMIC, ComponentCategory::Atomic),
            (DEFAULT_BUSINESS, ComponentCategory::Business),
            (DEFAULT_SLOT, ComponentCategory::Slot),
            (DEFAULT_CONTAINER, ComponentCategory::BasicContainer),
        ] {
            for name in names {
                registry.register(name, category);
            }
        }
        registry
    }
}

impl ComponentRegistry {
    /// A registry with no entries; every component is treated as a leaf.
    pub fn empty() -> Self {
        Self {
            categories: HashMap::new(),
        }
    }

    /// Parse a `{ "Name": "category", … }` map.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let categories: HashMap<String, ComponentCategory> =
            serde_json::from_str(json).map_err(|e| format!("Invalid component registry: {e}"))?;
        Ok(Self { categories })
    }

    /// Add or override a component.
    pub fn register(&mut self, name: &str, category: ComponentCategory) {
        self.categories.insert(name.to_string(), category);
    }

    pub fn category(&self, component: &str) -> Option<ComponentCategory> {
        self.categories.get(component).copied()
    }

    /// Unknown components are never containers.
    pub fn is_container(&self, component: &str) -> bool {
        self.category(component)
            .is_some_and(ComponentCategory::is_container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_categories() {
        let reg = ComponentRegistry::default();
        assert!(reg.is_container("Card"));
        assert!(reg.is_container("Slot"));
        assert!(!reg.is_container("Button"));
        assert!(!reg.is_container("Chart"));
        assert!(!reg.is_container("SomethingUnknown"));
        assert_eq!(reg.category("Text"), Some(ComponentCategory::Atomic));
    }

    #[test]
    fn json_registry_overrides() {
        let reg = ComponentRegistry::from_json(r#"{ "Panel": "basicContainer", "Badge": "atomic" }"#)
            .unwrap();
        assert!(reg.is_container("Panel"));
        assert!(!reg.is_container("Badge"));
        assert!(!reg.is_container("Card"));
        assert!(ComponentRegistry::from_json(r#"{ "Panel": "nope" }"#).is_err());
    }
}
