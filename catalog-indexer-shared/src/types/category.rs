//! Category lookup entries.

use serde::{Deserialize, Serialize};

use crate::types::product::CategoryId;

/// A category as seen from one store scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Store-scoped display name. Categories without one are never listed.
    #[serde(default)]
    pub name: Option<String>,
    /// Ancestor chain from the tree root down to and including this category.
    pub path: Vec<CategoryId>,
    #[serde(default = "default_true")]
    pub include_in_menu: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Category {
    /// Whether this category sits at or below `root_id`.
    pub fn is_under(&self, root_id: CategoryId) -> bool {
        self.path.contains(&root_id)
    }

    /// The non-empty display name, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}
