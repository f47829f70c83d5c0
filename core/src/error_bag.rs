//! Field-keyed collection of validation messages.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::http::scalar_text;

/// Maps a field name to the ordered messages the server reported for it.
///
/// Insertion order follows the server payload so the first reported field
/// stays first when rendering a summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorBag {
    store: IndexMap<String, Vec<String>>,
}

impl ErrorBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.store.get(field).is_some_and(|messages| !messages.is_empty())
    }

    pub fn any(&self) -> bool {
        self.store.values().any(|messages| !messages.is_empty())
    }

    pub fn any_of<'a, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        fields.into_iter().any(|field| self.has(field))
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.store.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    pub fn all(&self) -> &IndexMap<String, Vec<String>> {
        &self.store
    }

    /// Replace the whole store.
    ///
    /// A value may be a single message or an array of messages. Non-string
    /// entries keep their JSON text; `null` and empty arrays are dropped.
    pub fn set(&mut self, errors: Map<String, Value>) {
        self.store = errors
            .into_iter()
            .filter_map(|(field, value)| {
                let messages = normalize(value);
                (!messages.is_empty()).then_some((field, messages))
            })
            .collect();
    }

    /// Remove one field's messages, or everything when `field` is `None`.
    pub fn clear(&mut self, field: Option<&str>) {
        match field {
            Some(field) => {
                self.store.shift_remove(field);
            }
            None => self.store.clear(),
        }
    }
}

fn normalize(value: Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(scalar_text)
            .collect(),
        other => vec![scalar_text(&other)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: Value) -> ErrorBag {
        let mut bag = ErrorBag::new();
        bag.set(value.as_object().cloned().unwrap());
        bag
    }

    #[test]
    fn empty_bag_answers_negatively() {
        let bag = ErrorBag::new();
        assert!(!bag.any());
        assert!(!bag.has("name"));
        assert!(bag.get("name").is_empty());
        assert_eq!(bag.first("name"), None);
        assert!(bag.all().is_empty());
    }

    #[test]
    fn set_normalizes_single_strings() {
        let bag = bag(json!({"name": "required", "email": ["invalid", "taken"]}));
        assert_eq!(bag.get("name"), ["required"]);
        assert_eq!(bag.get("email"), ["invalid", "taken"]);
        assert_eq!(bag.first("email"), Some("invalid"));
        assert!(bag.has("name"));
        assert!(bag.any());
    }

    #[test]
    fn set_drops_null_and_empty_entries() {
        let bag = bag(json!({"name": null, "email": [], "age": 18}));
        assert!(!bag.has("name"));
        assert!(!bag.has("email"));
        assert_eq!(bag.get("age"), ["18"]);
        assert_eq!(bag.all().len(), 1);
    }

    #[test]
    fn set_replaces_previous_contents() {
        let mut bag = bag(json!({"name": "required"}));
        bag.set(json!({"email": "invalid"}).as_object().cloned().unwrap());
        assert!(!bag.has("name"));
        assert!(bag.has("email"));
    }

    #[test]
    fn clear_single_field_keeps_others() {
        let mut bag = bag(json!({"name": "required", "email": "invalid"}));
        bag.clear(Some("name"));
        assert!(!bag.has("name"));
        assert!(bag.has("email"));
        bag.clear(Some("missing"));
        assert!(bag.has("email"));
    }

    #[test]
    fn clear_all_empties_bag() {
        let mut bag = bag(json!({"name": "required", "email": "invalid"}));
        bag.clear(None);
        assert!(!bag.any());
    }

    #[test]
    fn any_of_checks_listed_fields_only() {
        let bag = bag(json!({"email": "invalid"}));
        assert!(bag.any_of(["name", "email"]));
        assert!(!bag.any_of(["name", "age"]));
    }

    #[test]
    fn all_preserves_server_order() {
        let bag = bag(json!({"zeta": "z", "alpha": "a"}));
        let keys: Vec<&str> = bag.all().keys().map(String::as_str).collect();
        assert_eq!(keys, ["zeta", "alpha"]);
    }

    #[test]
    fn serializes_as_plain_mapping() {
        let bag = bag(json!({"name": "required"}));
        assert_eq!(serde_json::to_value(&bag).unwrap(), json!({"name": ["required"]}));
    }
}
