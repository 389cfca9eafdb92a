//! Configurable option and variant summaries.

use serde_json::Value;

use catalog_indexer_shared::{ConfigurableOption, ProductEntity, Variant, VariantAttribute};

use super::encode_uid;

/// Synthetic id of a configurable option value.
pub fn option_uid(attribute_id: u32, value_index: i64) -> String {
    encode_uid(format!("configurable/{}/{}", attribute_id, value_index))
}

/// Options ordered by position, each value carrying its uid.
pub fn with_uids(mut options: Vec<ConfigurableOption>) -> Vec<ConfigurableOption> {
    options.sort_by_key(|option| option.position);
    for option in &mut options {
        let attribute_id = option.attribute_id;
        for value in &mut option.values {
            value.uid = Some(option_uid(attribute_id, value.value_index));
        }
    }
    options
}

/// One variant per child, listing the option values the child selects.
pub fn variants(options: &[ConfigurableOption], children: &[ProductEntity]) -> Vec<Variant> {
    children
        .iter()
        .map(|child| Variant {
            child_id: child.entity_id,
            attributes: options
                .iter()
                .filter_map(|option| {
                    let selected = child
                        .attribute(&option.attribute_code)
                        .and_then(|raw| value_index(&raw))?;
                    let value = option.values.iter().find(|v| v.value_index == selected)?;
                    Some(VariantAttribute {
                        label: value
                            .store_label
                            .clone()
                            .filter(|label| !label.is_empty())
                            .unwrap_or_else(|| value.label.clone()),
                        code: option.attribute_code.clone(),
                        use_default_value: value.use_default_value,
                        value_index: value.value_index,
                        attribute_id: option.attribute_id,
                        uid: option_uid(option.attribute_id, value.value_index),
                    })
                })
                .collect(),
        })
        .collect()
}

fn value_index(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
