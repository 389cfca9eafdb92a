//! Store-scoped configuration.
//!
//! Values are looked up by path for a store and fall back to the default scope.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use catalog_indexer_shared::{CategoryId, StoreId};

use crate::IndexingError;

/// Scope whose values apply to every store without its own value.
pub const DEFAULT_SCOPE: StoreId = 0;

/// Configuration paths read by the indexer.
pub mod paths {
    pub const PRODUCTS_ENABLED: &str = "catalog_indexer/products/enabled";
    pub const PRODUCTS_SCHEMA: &str = "catalog_indexer/products/schema";
    pub const PRODUCTS_INDEX_ALL: &str = "catalog_indexer/products/index_all";
    pub const PRODUCTS_SHOW_OUT_OF_STOCK: &str = "catalog_indexer/products/show_out_of_stock";
    pub const CATEGORIES_ROOT_ID: &str = "catalog_indexer/categories/root_id";
    pub const CATEGORIES_FILTER_INCLUDE_IN_MENU: &str =
        "catalog_indexer/categories/filter_include_in_menu";
    pub const LOCALE_CODE: &str = "general/locale/code";
    pub const STORE_CODE: &str = "store/code";
    pub const BASE_URL: &str = "web/base_url";
    pub const PRODUCT_URL_SUFFIX: &str = "catalog/seo/product_url_suffix";
}

const DEFAULT_ROOT_CATEGORY_ID: CategoryId = 1;
const DEFAULT_PRODUCT_URL_SUFFIX: &str = ".html";

/// Key/value configuration keyed by scope.
pub trait ConfigStore: Send + Sync {
    /// Value set exactly at `scope`, without fallback.
    fn scoped_value(&self, scope: StoreId, path: &str) -> Option<String>;

    /// Value for a store, falling back to the default scope.
    fn value(&self, store_id: StoreId, path: &str) -> Option<String> {
        self.scoped_value(store_id, path).or_else(|| {
            if store_id == DEFAULT_SCOPE {
                None
            } else {
                self.scoped_value(DEFAULT_SCOPE, path)
            }
        })
    }

    fn flag(&self, store_id: StoreId, path: &str) -> bool {
        self.value(store_id, path)
            .map(|v| parse_flag(&Value::String(v)))
            .unwrap_or(false)
    }
}

/// Coerce a configuration value into a boolean.
///
/// Accepts booleans, numbers and the usual string spellings. Empty strings and
/// null are false; unrecognised non-empty strings are true.
pub fn parse_flag(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Configuration held in memory, loaded from a JSON document of the form
/// `{"0": {"path": value}, "1": {...}}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticConfigStore {
    scopes: BTreeMap<StoreId, BTreeMap<String, Value>>,
}

impl StaticConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self, IndexingError> {
        serde_json::from_str(raw)
            .map_err(|e| IndexingError::config(format!("Invalid store configuration: {}", e)))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IndexingError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            IndexingError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let store = Self::from_json(&raw)?;
        debug!(path = %path.display(), scopes = store.scopes.len(), "Loaded store configuration");
        Ok(store)
    }

    /// Set a value, builder style.
    pub fn with(mut self, scope: StoreId, path: &str, value: impl Into<Value>) -> Self {
        self.set(scope, path, value);
        self
    }

    pub fn set(&mut self, scope: StoreId, path: &str, value: impl Into<Value>) {
        self.scopes
            .entry(scope)
            .or_default()
            .insert(path.to_string(), value.into());
    }

    /// Store scopes with at least one value of their own.
    pub fn store_ids(&self) -> Vec<StoreId> {
        self.scopes
            .keys()
            .copied()
            .filter(|scope| *scope != DEFAULT_SCOPE)
            .collect()
    }
}

impl ConfigStore for StaticConfigStore {
    fn scoped_value(&self, scope: StoreId, path: &str) -> Option<String> {
        match self.scopes.get(&scope)?.get(path)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Typed view of the settings one indexing pass reads for a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub store_id: StoreId,
    pub enabled: bool,
    /// Serialized configured field list, if any.
    pub schema: Option<String>,
    pub index_all: bool,
    pub show_out_of_stock: bool,
    pub root_category_id: CategoryId,
    pub filter_include_in_menu: bool,
    pub locale: Option<String>,
    pub store_code: String,
    pub base_url: String,
    pub product_url_suffix: String,
}

impl StoreSettings {
    pub fn load(config: &dyn ConfigStore, store_id: StoreId) -> Self {
        let root_category_id = config
            .value(store_id, paths::CATEGORIES_ROOT_ID)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_ROOT_CATEGORY_ID);

        let mut base_url = config
            .value(store_id, paths::BASE_URL)
            .unwrap_or_default();
        if !base_url.is_empty() && !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            store_id,
            enabled: config.flag(store_id, paths::PRODUCTS_ENABLED),
            schema: config
                .value(store_id, paths::PRODUCTS_SCHEMA)
                .filter(|s| !s.trim().is_empty()),
            index_all: config.flag(store_id, paths::PRODUCTS_INDEX_ALL),
            show_out_of_stock: config.flag(store_id, paths::PRODUCTS_SHOW_OUT_OF_STOCK),
            root_category_id,
            filter_include_in_menu: config
                .flag(store_id, paths::CATEGORIES_FILTER_INCLUDE_IN_MENU),
            locale: config
                .value(store_id, paths::LOCALE_CODE)
                .filter(|s| !s.is_empty()),
            store_code: config
                .value(store_id, paths::STORE_CODE)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("store{}", store_id)),
            base_url,
            product_url_suffix: config
                .value(store_id, paths::PRODUCT_URL_SUFFIX)
                .unwrap_or_else(|| DEFAULT_PRODUCT_URL_SUFFIX.to_string()),
        }
    }
}
