//! Configurable option and variant summaries embedded in product documents.

use serde::{Deserialize, Serialize};

use crate::types::product::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwatchData {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurableOptionValue {
    pub value_index: i64,
    pub label: String,
    #[serde(default)]
    pub default_label: Option<String>,
    #[serde(default)]
    pub store_label: Option<String>,
    #[serde(default)]
    pub use_default_value: bool,
    #[serde(default)]
    pub swatch_data: Option<SwatchData>,
    #[serde(default)]
    pub uid: Option<String>,
}

/// A super attribute of a configurable product with the values its variants use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurableOption {
    pub attribute_id: u32,
    pub attribute_code: String,
    pub label: String,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub values: Vec<ConfigurableOptionValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantAttribute {
    pub label: String,
    pub code: String,
    pub use_default_value: bool,
    pub value_index: i64,
    pub attribute_id: u32,
    pub uid: String,
}

/// One child of a configurable product with the option values it selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub child_id: EntityId,
    pub attributes: Vec<VariantAttribute>,
}
