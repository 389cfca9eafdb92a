//! Field schema resolution.
//!
//! The collection schema of a store is the fixed baseline field list merged with the
//! fields an administrator configured for that store.

use serde_json::Value;
use tracing::{debug, warn};

use catalog_indexer_shared::{FieldKind, FieldSpec, FieldType, StoreId};

use crate::config::{parse_flag, paths, ConfigStore};

/// Resolves the ordered field list of a store scope.
pub struct SchemaResolver;

impl SchemaResolver {
    /// The identity, content, pricing and relation fields every collection carries.
    pub fn baseline() -> Vec<FieldSpec> {
        use FieldKind::*;
        let scalar = FieldType::Scalar;
        let array = FieldType::Array;

        vec![
            FieldSpec::new("entity_id", scalar(Int32)),
            FieldSpec::new("uid", scalar(String)),
            FieldSpec::new("sku", scalar(String)),
            FieldSpec::new("store_id", scalar(Int32)).optional(true).indexed(false),
            FieldSpec::new("status", scalar(Int32)).optional(true).indexed(false),
            FieldSpec::new("visibility", scalar(Int32)).optional(true).indexed(false),
            FieldSpec::new("visibility_label", scalar(String)).optional(true).indexed(false),
            FieldSpec::new("name", scalar(String)),
            FieldSpec::new("url", scalar(String)),
            FieldSpec::new("url_key", scalar(String)),
            FieldSpec::new("type_id", scalar(String)).optional(true).indexed(false),
            FieldSpec::new("subproducts", array(String)).optional(true).indexed(false),
            FieldSpec::new("parent_ids", array(String)).optional(true).indexed(false),
            FieldSpec::new("description", scalar(String)).optional(true).indexed(false),
            FieldSpec::new("description_stripped", scalar(String)).optional(true),
            FieldSpec::new("short_description", scalar(String)).optional(true).indexed(false),
            FieldSpec::new("short_description_stripped", scalar(String)).optional(true),
            FieldSpec::new("meta_title", scalar(String)).optional(true),
            FieldSpec::new("meta_keywords", scalar(String)).optional(true),
            FieldSpec::new("meta_description", scalar(String)).optional(true),
            FieldSpec::new("category_ids", array(String)).optional(true),
            FieldSpec::new("category_uid", array(String)).optional(true).facet(true),
            FieldSpec::new("stock_status", scalar(String)).facet(true),
            FieldSpec::new("related_products_ids", array(String)).optional(true).indexed(false),
            FieldSpec::new("upsell_products_ids", array(String)).optional(true).indexed(false),
            FieldSpec::new("crossell_products_ids", array(String)).optional(true).indexed(false),
            FieldSpec::new("final_price", scalar(Float)).sortable(true),
        ]
    }

    /// Configured fields of a store. Absent or unreadable configuration yields no fields.
    pub fn configured(config: &dyn ConfigStore, store_id: StoreId) -> Vec<FieldSpec> {
        match config.value(store_id, paths::PRODUCTS_SCHEMA) {
            Some(raw) if !raw.trim().is_empty() => Self::parse_configured(&raw),
            _ => {
                debug!(store_id, "No configured schema for store");
                Vec::new()
            }
        }
    }

    /// Parse a serialized field list.
    ///
    /// Accepts a JSON list or an object of rows keyed by row id. Rows without a
    /// name or with an unknown type are skipped. A later row with the same name
    /// replaces the earlier one.
    pub fn parse_configured(raw: &str) -> Vec<FieldSpec> {
        let blob: Value = match serde_json::from_str(raw) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Configured schema is not valid JSON, ignoring it");
                return Vec::new();
            }
        };

        let rows: Vec<Value> = match blob {
            Value::Array(rows) => rows,
            Value::Object(rows) => rows.into_iter().map(|(_, row)| row).collect(),
            _ => {
                warn!("Configured schema is neither a list nor an object, ignoring it");
                return Vec::new();
            }
        };

        let mut fields: Vec<FieldSpec> = Vec::new();
        for row in rows {
            let Some(field) = Self::parse_row(&row) else {
                continue;
            };
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field,
                None => fields.push(field),
            }
        }
        fields
    }

    fn parse_row(row: &Value) -> Option<FieldSpec> {
        let name = row
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())?;

        let raw_type = row.get("type").and_then(Value::as_str).unwrap_or("string");
        let field_type = match raw_type.parse::<FieldType>() {
            Ok(field_type) => field_type,
            Err(e) => {
                warn!(field = name, error = %e, "Skipping configured field");
                return None;
            }
        };

        let flag = |key: &str| row.get(key).map(parse_flag);
        let mut field = FieldSpec::new(name, field_type)
            .optional(flag("optional").unwrap_or(false))
            .indexed(flag("index").unwrap_or(true))
            .facet(flag("facet").unwrap_or(false))
            .sortable(flag("sort").unwrap_or(false));
        field.infix = flag("infix").unwrap_or(false);
        field.locale = row
            .get("locale")
            .and_then(Value::as_str)
            .filter(|locale| !locale.is_empty())
            .map(str::to_string);

        Some(field.normalized())
    }

    /// Merge configured fields into the baseline.
    ///
    /// A configured field replaces the baseline field of the same name in place;
    /// the rest are appended in configured order.
    pub fn merge(baseline: Vec<FieldSpec>, configured: &[FieldSpec]) -> Vec<FieldSpec> {
        let mut fields = baseline;
        for field in configured {
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field.clone(),
                None => fields.push(field.clone()),
            }
        }
        fields.into_iter().map(FieldSpec::normalized).collect()
    }

    /// The full field list of a store.
    pub fn resolve(config: &dyn ConfigStore, store_id: StoreId) -> Vec<FieldSpec> {
        Self::merge(Self::baseline(), &Self::configured(config, store_id))
    }
}
