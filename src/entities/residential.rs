// 🏘️ Residential Entity - One managed community
//
// The id is the identity used by every feed and member query;
// the display name is only a label and may change.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_UNKNOWN_LABEL;
use crate::error::{ConsoleError, ConsoleResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residential {
    /// Stable identity in the external store
    pub id: String,

    /// Human-readable name ("Los Pinos")
    #[serde(rename = "nombre", alias = "displayName", default)]
    pub display_name: String,

    /// Short access code handed out to residents at registration
    #[serde(rename = "codigo", alias = "code", default)]
    pub code: String,
}

impl Residential {
    pub fn new(id: &str, display_name: &str, code: &str) -> Self {
        Residential {
            id: id.to_string(),
            display_name: display_name.to_string(),
            code: code.to_string(),
        }
    }
}

// ============================================================================
// RESIDENTIAL REGISTRY
// ============================================================================

/// Known residential entities, in the order the directory returned them.
/// Resolves feed source ids to labels.
#[derive(Debug, Clone)]
pub struct ResidentialRegistry {
    entities: Vec<Residential>,
    unknown_label: String,
}

impl ResidentialRegistry {
    pub fn new() -> Self {
        Self::with_unknown_label(DEFAULT_UNKNOWN_LABEL)
    }

    pub fn with_unknown_label(label: &str) -> Self {
        ResidentialRegistry {
            entities: Vec::new(),
            unknown_label: label.to_string(),
        }
    }

    pub fn from_entities(entities: Vec<Residential>) -> Self {
        let mut registry = Self::new();
        registry.replace_all(entities);
        registry
    }

    /// Replace the whole list; a repeated id keeps its first position
    /// and the values of its last occurrence
    pub fn replace_all(&mut self, entities: Vec<Residential>) {
        self.entities.clear();
        for entity in entities {
            self.register(entity);
        }
    }

    /// Add an entity, or update the one with the same id in place
    pub fn register(&mut self, entity: Residential) {
        match self.entities.iter_mut().find(|e| e.id == entity.id) {
            Some(existing) => *existing = entity,
            None => self.entities.push(entity),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Residential> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn require(&self, id: &str) -> ConsoleResult<&Residential> {
        self.get(id)
            .ok_or_else(|| ConsoleError::EntityNotFound(id.to_string()))
    }

    /// Display name for an id; unknown ids and blank names get the unknown label
    pub fn label_for(&self, id: &str) -> String {
        self.get(id)
            .map(|e| e.display_name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(self.unknown_label.as_str())
            .to_string()
    }

    pub fn find_by_code(&self, code: &str) -> Option<&Residential> {
        let code = code.trim();
        self.entities
            .iter()
            .find(|e| e.code.trim().eq_ignore_ascii_case(code))
    }

    pub fn ids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.id.clone()).collect()
    }

    pub fn entities(&self) -> &[Residential] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for ResidentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ResidentialRegistry {
        ResidentialRegistry::from_entities(vec![
            Residential::new("R1", "Los Pinos", "PIN01"),
            Residential::new("R2", "  ", "OLM02"),
        ])
    }

    #[test]
    fn test_label_lookup() {
        let registry = registry();
        assert_eq!(registry.label_for("R1"), "Los Pinos");
        assert_eq!(registry.label_for("R2"), "unknown");
        assert_eq!(registry.label_for("R9"), "unknown");
    }

    #[test]
    fn test_custom_unknown_label() {
        let mut registry = ResidentialRegistry::with_unknown_label("Desconocido");
        registry.register(Residential::new("R1", "Los Pinos", ""));
        assert_eq!(registry.label_for("R7"), "Desconocido");
    }

    #[test]
    fn test_register_updates_in_place() {
        let mut registry = registry();
        registry.register(Residential::new("R1", "Pinos Altos", "PIN01"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), vec!["R1", "R2"]);
        assert_eq!(registry.label_for("R1"), "Pinos Altos");
    }

    #[test]
    fn test_replace_all_with_repeated_id() {
        let mut registry = registry();
        registry.replace_all(vec![
            Residential::new("R1", "Los Pinos", "PIN01"),
            Residential::new("R3", "Las Palmas", "PAL03"),
            Residential::new("R1", "Pinos Altos", "PIN01"),
        ]);

        assert_eq!(registry.ids(), vec!["R1", "R3"]);
        assert_eq!(registry.label_for("R1"), "Pinos Altos");
    }

    #[test]
    fn test_require_and_code_lookup() {
        let registry = registry();
        assert!(registry.require("R1").is_ok());
        assert!(matches!(
            registry.require("R3"),
            Err(ConsoleError::EntityNotFound(id)) if id == "R3"
        ));
        assert_eq!(registry.find_by_code("olm02").map(|e| e.id.as_str()), Some("R2"));
    }

    #[test]
    fn test_deserialize_store_field_names() {
        let json = r#"{"id":"R1","nombre":"Los Pinos","codigo":"PIN01"}"#;
        let entity: Residential = serde_json::from_str(json).unwrap();
        assert_eq!(entity, Residential::new("R1", "Los Pinos", "PIN01"));
    }
}
