//! Attribute metadata as described by the catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::product::StoreId;

/// How the catalog renders an attribute in the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontendInput {
    #[default]
    Text,
    Textarea,
    Select,
    Multiselect,
    Boolean,
    Price,
    Weight,
    Date,
    Media,
}

/// One enumerated option of a source-backed attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub store_labels: BTreeMap<StoreId, String>,
}

impl AttributeOption {
    pub fn label_for(&self, store_id: StoreId) -> &str {
        self.store_labels
            .get(&store_id)
            .filter(|label| !label.is_empty())
            .map(String::as_str)
            .unwrap_or(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    pub attribute_id: u32,
    pub code: String,
    #[serde(default)]
    pub frontend_input: FrontendInput,
    #[serde(default)]
    pub default_label: Option<String>,
    #[serde(default)]
    pub store_labels: BTreeMap<StoreId, String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub options: Vec<AttributeOption>,
}

impl AttributeMetadata {
    /// Whether display values come from an enumerated source.
    pub fn uses_source(&self) -> bool {
        matches!(
            self.frontend_input,
            FrontendInput::Select | FrontendInput::Multiselect | FrontendInput::Boolean
        )
    }

    /// Store-scoped label, falling back to the default label and then the code.
    pub fn store_label(&self, store_id: StoreId) -> String {
        self.store_labels
            .get(&store_id)
            .filter(|label| !label.is_empty())
            .or(self.default_label.as_ref())
            .cloned()
            .unwrap_or_else(|| self.code.clone())
    }

    pub fn option(&self, value: &str) -> Option<&AttributeOption> {
        self.options.iter().find(|option| option.value == value)
    }
}
