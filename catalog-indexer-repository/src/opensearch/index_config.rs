//! OpenSearch index configuration and mappings.
//!
//! Translates product collection schemas into OpenSearch index bodies.

use serde_json::{json, Map, Value};

use catalog_indexer_shared::{FieldKind, FieldSpec, FieldType};

use crate::types::CollectionSchema;

/// Configuration for the product indices.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Prefix prepended to every collection name (e.g. `catalog_`).
    pub prefix: String,
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl IndexConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            number_of_shards: 1,
            number_of_replicas: 1,
        }
    }

    /// Physical collection name for a store and indexer suffix.
    ///
    /// ```
    /// use catalog_indexer_repository::IndexConfig;
    ///
    /// let config = IndexConfig::new("catalog_");
    /// assert_eq!(config.collection_name("default", "_products"), "catalog_default_products");
    /// ```
    pub fn collection_name(&self, store_code: &str, suffix: &str) -> String {
        format!("{}{}{}", self.prefix, store_code, suffix).to_lowercase()
    }

    /// Full create-index body for a collection.
    pub fn index_body(&self, schema: &CollectionSchema) -> Value {
        json!({
            "settings": {
                "number_of_shards": self.number_of_shards,
                "number_of_replicas": self.number_of_replicas
            },
            "mappings": mappings(schema)
        })
    }
}

/// Mapping body for a collection: one property per declared field.
///
/// `string*` and `auto` fields are left to dynamic mapping.
pub fn mappings(schema: &CollectionSchema) -> Value {
    let mut properties = Map::new();
    for field in &schema.fields {
        if let Some(mapping) = field_mapping(field) {
            properties.insert(field.name.clone(), mapping);
        }
    }

    json!({
        "dynamic": true,
        "_meta": {
            "default_sorting_field": schema.default_sorting_field,
            "enable_nested_fields": schema.enable_nested_fields
        },
        "properties": properties
    })
}

/// Mapping for a single field. Arrays map like their element type.
pub fn field_mapping(field: &FieldSpec) -> Option<Value> {
    let kind = match field.field_type {
        FieldType::Scalar(kind) | FieldType::Array(kind) => kind,
        FieldType::StringAuto | FieldType::Auto => return None,
    };

    let mut mapping = match kind {
        FieldKind::String if field.facet || field.sort => json!({ "type": "keyword" }),
        FieldKind::String => json!({
            "type": "text",
            "fields": { "raw": { "type": "keyword", "ignore_above": 256 } }
        }),
        FieldKind::Int32 => json!({ "type": "integer" }),
        FieldKind::Int64 => json!({ "type": "long" }),
        FieldKind::Float => json!({ "type": "float" }),
        FieldKind::Bool => json!({ "type": "boolean" }),
        FieldKind::GeoPoint => json!({ "type": "geo_point" }),
        FieldKind::Object => json!({ "type": "object" }),
    };

    if !field.index {
        // Objects cannot be unindexed, only disabled.
        let key = if kind == FieldKind::Object { "enabled" } else { "index" };
        mapping[key] = json!(false);
    }
    if kind == FieldKind::String && field.infix && !field.facet && !field.sort {
        mapping["fields"]["infix"] = json!({ "type": "search_as_you_type" });
    }
    if let Some(locale) = &field.locale {
        mapping["meta"] = json!({ "locale": locale });
    }

    Some(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, field_type: &str) -> FieldSpec {
        FieldSpec::new(name, field_type.parse().unwrap())
    }

    #[test]
    fn test_collection_name() {
        let config = IndexConfig::new("catalog_");
        assert_eq!(
            config.collection_name("default", "_products"),
            "catalog_default_products"
        );
        assert_eq!(
            config.collection_name("FR", "_products_children"),
            "catalog_fr_products_children"
        );
    }

    #[test]
    fn test_scalar_mappings() {
        assert_eq!(field_mapping(&field("entity_id", "int32")).unwrap()["type"], "integer");
        assert_eq!(field_mapping(&field("qty", "int64")).unwrap()["type"], "long");
        assert_eq!(field_mapping(&field("price", "float")).unwrap()["type"], "float");
        assert_eq!(field_mapping(&field("new", "bool")).unwrap()["type"], "boolean");
        assert_eq!(field_mapping(&field("loc", "geopoint")).unwrap()["type"], "geo_point");
        assert_eq!(field_mapping(&field("ids", "int32[]")).unwrap()["type"], "integer");
    }

    #[test]
    fn test_string_mapping_depends_on_facet() {
        let text = field_mapping(&field("name", "string")).unwrap();
        assert_eq!(text["type"], "text");
        assert_eq!(text["fields"]["raw"]["type"], "keyword");

        let facet = field_mapping(&field("color", "string[]").facet(true)).unwrap();
        assert_eq!(facet["type"], "keyword");
    }

    #[test]
    fn test_unindexed_fields() {
        let string = field_mapping(&field("thumbnail", "string").indexed(false)).unwrap();
        assert_eq!(string["index"], false);

        let object = field_mapping(&field("price_range", "object").indexed(false)).unwrap();
        assert_eq!(object["enabled"], false);
        assert!(object.get("index").is_none());
    }

    #[test]
    fn test_auto_fields_are_dynamic() {
        assert!(field_mapping(&field("anything", "auto")).is_none());
        assert!(field_mapping(&field("tags", "string*")).is_none());
    }

    #[test]
    fn test_index_body_structure() {
        let schema = CollectionSchema::new(
            "catalog_default_products",
            vec![field("entity_id", "int32"), field("name", "string")],
        );
        let body = IndexConfig::new("catalog_").index_body(&schema);

        assert!(body["settings"]["number_of_shards"].is_number());
        assert_eq!(body["mappings"]["_meta"]["default_sorting_field"], "entity_id");
        assert_eq!(body["mappings"]["_meta"]["enable_nested_fields"], true);
        assert!(body["mappings"]["properties"]["entity_id"].is_object());
        assert!(body["mappings"]["properties"]["name"].is_object());
    }
}
