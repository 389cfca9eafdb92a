//! Attribute value materialization.
//!
//! Configured fields are filled from the product's stored attribute values. When a
//! composite parent has no value of its own, the values of its eligible children are
//! aggregated instead.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::debug;

use catalog_indexer_shared::{
    AttributeMetadata, FieldSpec, FrontendInput, ProductDocument, ProductEntity, StoreId,
};

/// Read access to attribute values and metadata.
pub trait AttributeSource: Send + Sync {
    /// Stored value of an attribute.
    fn raw_value(&self, product: &ProductEntity, code: &str) -> Option<Value>;

    /// Storefront text of an attribute value, a list for multi-valued attributes.
    fn display_text(&self, product: &ProductEntity, code: &str) -> Option<Value>;

    /// Store-scoped label. `None` when the attribute is unknown.
    fn label(&self, code: &str, store_id: StoreId) -> Option<String>;

    fn position(&self, code: &str) -> Option<i64>;
}

/// Attribute metadata of the product entity type, loaded once per pass.
#[derive(Debug, Clone, Default)]
pub struct AttributeCatalog {
    store_id: StoreId,
    by_code: HashMap<String, AttributeMetadata>,
}

impl AttributeCatalog {
    pub fn new(attributes: Vec<AttributeMetadata>, store_id: StoreId) -> Self {
        Self {
            store_id,
            by_code: attributes.into_iter().map(|a| (a.code.clone(), a)).collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&AttributeMetadata> {
        self.by_code.get(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Text of one stored option value.
    fn option_text(&self, attribute: &AttributeMetadata, value: &Value) -> Option<Value> {
        let key = scalar_key(value)?;

        if attribute.frontend_input == FrontendInput::Multiselect && key.contains(',') {
            let texts: Vec<Value> = key
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .filter_map(|part| attribute.option(part))
                .map(|option| json!(option.label_for(self.store_id)))
                .collect();
            return (!texts.is_empty()).then_some(Value::Array(texts));
        }

        if let Some(option) = attribute.option(&key) {
            return Some(json!(option.label_for(self.store_id)));
        }
        if attribute.frontend_input == FrontendInput::Boolean {
            return Some(json!(if parse_bool_key(&key) { "Yes" } else { "No" }));
        }
        None
    }
}

impl AttributeSource for AttributeCatalog {
    fn raw_value(&self, product: &ProductEntity, code: &str) -> Option<Value> {
        product.attribute(code)
    }

    fn display_text(&self, product: &ProductEntity, code: &str) -> Option<Value> {
        let raw = self.raw_value(product, code)?;
        let Some(attribute) = self.get(code) else {
            return Some(raw);
        };
        if !attribute.uses_source() {
            return Some(raw);
        }

        match &raw {
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| self.option_text(attribute, item).unwrap_or_else(|| item.clone()))
                    .collect(),
            )),
            _ => Some(self.option_text(attribute, &raw).unwrap_or(raw)),
        }
    }

    fn label(&self, code: &str, store_id: StoreId) -> Option<String> {
        self.get(code).map(|a| a.store_label(store_id))
    }

    fn position(&self, code: &str) -> Option<i64> {
        self.get(code).map(|a| a.position)
    }
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

fn parse_bool_key(key: &str) -> bool {
    !matches!(key.trim(), "" | "0" | "false")
}

/// Whether a materialized value counts as present. Zero and `false` do.
pub fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Fills configured fields of a document.
pub struct AttributeMaterializer<'a> {
    source: &'a dyn AttributeSource,
    store_id: StoreId,
}

impl<'a> AttributeMaterializer<'a> {
    pub fn new(source: &'a dyn AttributeSource, store_id: StoreId) -> Self {
        Self { source, store_id }
    }

    /// Materialize every known attribute field the document does not already carry.
    ///
    /// A field holding `null` counts as not carried. Names that match no attribute
    /// are skipped.
    pub fn materialize(
        &self,
        document: &mut ProductDocument,
        fields: &[FieldSpec],
        product: &ProductEntity,
        subproducts: &[ProductEntity],
    ) {
        for field in fields {
            if document.get(&field.name).is_some_and(|v| !v.is_null()) {
                continue;
            }
            if self.source.label(&field.name, self.store_id).is_none() {
                debug!(field = %field.name, "Skipping configured field with no attribute");
                continue;
            }

            let raw = self.source.raw_value(product, &field.name);
            if has_value(raw.as_ref()) {
                self.own_value(document, field, product, raw.unwrap_or(Value::Null));
            } else if product.type_id.is_composite() {
                self.aggregate(document, field, subproducts);
            }

            Self::apply_default(document, field);
        }
    }

    fn companions(&self, document: &mut ProductDocument, name: &str) {
        if let Some(label) = self.source.label(name, self.store_id) {
            document.insert(format!("{}_label", name), label);
        }
        if let Some(position) = self.source.position(name) {
            document.insert(format!("{}_position", name), position);
        }
    }

    fn own_value(
        &self,
        document: &mut ProductDocument,
        field: &FieldSpec,
        product: &ProductEntity,
        raw: Value,
    ) {
        let name = field.name.as_str();
        self.companions(document, name);

        let is_array = field.field_type.is_array();
        let raw = match raw {
            Value::Array(_) => raw,
            other if is_array => json!([other]),
            other => other,
        };
        document.insert(format!("{}_raw", name), raw);

        let display = self.source.display_text(product, name).unwrap_or(Value::Null);
        let value = if is_array {
            match display {
                Value::Array(_) => display,
                Value::Null => Value::Array(Vec::new()),
                single => {
                    let mut items = match document.remove(name) {
                        Some(Value::Array(items)) => items,
                        _ => Vec::new(),
                    };
                    items.push(single);
                    Value::Array(items)
                }
            }
        } else {
            match display {
                Value::Null => json!(""),
                Value::String(s) if s.is_empty() => json!(""),
                other => other,
            }
        };
        document.insert(name, value);
    }

    fn aggregate(&self, document: &mut ProductDocument, field: &FieldSpec, subproducts: &[ProductEntity]) {
        let name = field.name.as_str();
        self.companions(document, name);

        let mut raws: Vec<Value> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        for child in subproducts {
            let raw = self.source.raw_value(child, name);
            if !has_value(raw.as_ref()) {
                continue;
            }
            if let Some(raw) = raw {
                push_unique(&mut raws, raw);
            }
            match self.source.display_text(child, name) {
                Some(Value::Array(items)) => {
                    for item in items {
                        push_unique(&mut values, item);
                    }
                }
                Some(Value::Null) | None => {}
                Some(item) => push_unique(&mut values, item),
            }
        }

        document.insert(name, Value::Array(values));
        document.insert(format!("{}_raw", name), Value::Array(raws));
    }

    /// Zero value for a required field left empty.
    fn apply_default(document: &mut ProductDocument, field: &FieldSpec) {
        if field.optional || has_value(document.get(&field.name)) {
            return;
        }
        if let Some(zero) = field.field_type.zero_value() {
            document.insert(field.name.as_str(), zero);
        }
    }
}

fn push_unique(values: &mut Vec<Value>, value: Value) {
    if !values.contains(&value) {
        values.push(value);
    }
}
