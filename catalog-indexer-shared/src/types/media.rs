//! Media gallery entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::product::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default = "default_media_type")]
    pub media_type: String,
    /// File path, or the resolved media URL once the gallery is assembled.
    pub file: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub disabled: bool,
    /// Image roles (`image`, `small_image`, `thumbnail`, ...).
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_content: Option<Value>,
}

fn default_media_type() -> String {
    "image".to_string()
}
