use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::product::EntityId;

/// A flat product document ready for the search index.
///
/// Keys are kept sorted so the same product always serializes to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductDocument {
    fields: BTreeMap<String, Value>,
}

impl ProductDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// True when the key is present and not null.
    pub fn has_value(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(v) if !v.is_null())
    }

    /// Overlay `other` on top of this document. Keys in `other` win.
    pub fn merge(&mut self, other: ProductDocument) {
        self.fields.extend(other.fields);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Numeric `entity_id` of the document, if present.
    pub fn entity_id(&self) -> Option<EntityId> {
        match self.fields.get("entity_id")? {
            Value::Number(n) => n.as_u64().and_then(|id| EntityId::try_from(id).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Identifier the document is stored under in the index.
    pub fn document_id(&self) -> Option<String> {
        match self.fields.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => self.entity_id().map(|id| id.to_string()),
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.fields
    }
}

impl From<BTreeMap<String, Value>> for ProductDocument {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}
