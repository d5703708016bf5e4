//! Engine configuration.

use crate::component::ComponentRegistry;
use serde::{Deserialize, Serialize};

/// Tunables for the annotation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Rounded-Y distance under which two siblings count as the same row.
    pub row_tolerance: f32,
    /// Component name → category table.
    pub registry: ComponentRegistry,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            row_tolerance: 1.0,
            registry: ComponentRegistry::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid engine config: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json(r#"{ "rowTolerance": 4 }"#).unwrap();
        assert_eq!(cfg.row_tolerance, 4.0);
        assert!(cfg.registry.is_container("Card"));
    }
}
