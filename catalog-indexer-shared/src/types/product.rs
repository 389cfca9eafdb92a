//! Catalog product model.
//!
//! A `ProductEntity` is the store-scoped view of one product as the catalog hands it to
//! the pipeline. The pipeline treats it as read-only input, except for attaching the
//! stock snapshot computed for the current pass.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::stock::StockSnapshot;

/// Catalog entity identifier.
pub type EntityId = u32;

/// Store scope identifier. `0` is the default (admin) scope.
pub type StoreId = u32;

/// Category identifier.
pub type CategoryId = u32;

/// Product type as declared by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProductType {
    Simple,
    Virtual,
    Configurable,
    Bundle,
    Grouped,
    Other(String),
}

impl ProductType {
    /// The composite types, in the order their relations are queried.
    pub fn composite_types() -> [ProductType; 3] {
        [
            ProductType::Configurable,
            ProductType::Bundle,
            ProductType::Grouped,
        ]
    }

    /// Whether documents of this type depend on child products.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            ProductType::Configurable | ProductType::Bundle | ProductType::Grouped
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProductType::Simple => "simple",
            ProductType::Virtual => "virtual",
            ProductType::Configurable => "configurable",
            ProductType::Bundle => "bundle",
            ProductType::Grouped => "grouped",
            ProductType::Other(code) => code.as_str(),
        }
    }
}

impl From<String> for ProductType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "simple" => ProductType::Simple,
            "virtual" => ProductType::Virtual,
            "configurable" => ProductType::Configurable,
            "bundle" => ProductType::Bundle,
            "grouped" => ProductType::Grouped,
            _ => ProductType::Other(value),
        }
    }
}

impl From<ProductType> for String {
    fn from(value: ProductType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product status, stored by the catalog as `1` (enabled) or `2` (disabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProductStatus {
    #[default]
    Enabled,
    Disabled,
}

impl ProductStatus {
    pub fn code(self) -> u8 {
        match self {
            ProductStatus::Enabled => 1,
            ProductStatus::Disabled => 2,
        }
    }
}

impl TryFrom<u8> for ProductStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProductStatus::Enabled),
            2 => Ok(ProductStatus::Disabled),
            other => Err(format!("unknown product status {}", other)),
        }
    }
}

impl From<ProductStatus> for u8 {
    fn from(value: ProductStatus) -> Self {
        value.code()
    }
}

/// Where a product may be shown, stored by the catalog as `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Visibility {
    NotVisibleIndividually,
    Catalog,
    Search,
    #[default]
    Both,
}

impl Visibility {
    pub fn code(self) -> u8 {
        match self {
            Visibility::NotVisibleIndividually => 1,
            Visibility::Catalog => 2,
            Visibility::Search => 3,
            Visibility::Both => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Visibility::NotVisibleIndividually => "Not Visible Individually",
            Visibility::Catalog => "Catalog",
            Visibility::Search => "Search",
            Visibility::Both => "Catalog, Search",
        }
    }

    /// Visible in catalog listings, search results, or both.
    pub fn is_visible_in_site(self) -> bool {
        !matches!(self, Visibility::NotVisibleIndividually)
    }
}

impl TryFrom<u8> for Visibility {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Visibility::NotVisibleIndividually),
            2 => Ok(Visibility::Catalog),
            3 => Ok(Visibility::Search),
            4 => Ok(Visibility::Both),
            other => Err(format!("unknown visibility {}", other)),
        }
    }
}

impl From<Visibility> for u8 {
    fn from(value: Visibility) -> Self {
        value.code()
    }
}

/// Prices stored on the product itself.
///
/// The pricing engine derives minimal/maximal regular and final prices from these
/// (and, for composite types, from the children's snapshots).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    #[serde(default)]
    pub regular_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_from_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_to_date: Option<NaiveDate>,
}

impl PriceSnapshot {
    /// Special price in effect on `date`, if any.
    pub fn active_special_price(&self, date: NaiveDate) -> Option<f64> {
        let special = self.special_price?;
        if self.special_from_date.is_some_and(|from| date < from) {
            return None;
        }
        if self.special_to_date.is_some_and(|to| date > to) {
            return None;
        }
        Some(special)
    }

    /// Final price on `date`: the lower of the regular and the active special price.
    pub fn final_price(&self, date: NaiveDate) -> f64 {
        match self.active_special_price(date) {
            Some(special) if special < self.regular_price => special,
            _ => self.regular_price,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Store-scoped product record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEntity {
    pub entity_id: EntityId,
    pub sku: String,
    #[serde(default)]
    pub store_id: StoreId,
    pub type_id: ProductType,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub visibility: Visibility,
    /// Soft-deleted in the catalog but still returned by the fetch.
    #[serde(default)]
    pub deleted: bool,
    /// Catalog-level saleability (type specific; e.g. a configurable with no buyable child).
    #[serde(default = "default_true")]
    pub salable: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url_key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    /// Raw EAV values keyed by attribute code.
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub related_product_ids: Vec<EntityId>,
    #[serde(default)]
    pub upsell_product_ids: Vec<EntityId>,
    #[serde(default)]
    pub crosssell_product_ids: Vec<EntityId>,
    #[serde(default)]
    pub price: PriceSnapshot,
    /// Price display is disabled for this product (`can_show_price = false`).
    #[serde(default)]
    pub price_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<StockSnapshot>,
}

impl ProductEntity {
    /// Create an enabled, fully visible simple product with no attributes.
    pub fn new(entity_id: EntityId, sku: impl Into<String>, type_id: ProductType) -> Self {
        Self {
            entity_id,
            sku: sku.into(),
            store_id: 0,
            type_id,
            status: ProductStatus::Enabled,
            visibility: Visibility::Both,
            deleted: false,
            salable: true,
            name: None,
            url_key: None,
            url: None,
            description: None,
            short_description: None,
            meta_title: None,
            meta_description: None,
            meta_keywords: None,
            category_ids: Vec::new(),
            attributes: BTreeMap::new(),
            related_product_ids: Vec::new(),
            upsell_product_ids: Vec::new(),
            crosssell_product_ids: Vec::new(),
            price: PriceSnapshot::default(),
            price_hidden: false,
            stock: None,
        }
    }

    /// Raw stored value for an attribute code.
    ///
    /// Static columns (`name`, `url_key`, descriptions, meta fields) are exposed under
    /// their attribute codes so configured fields can reference them like any EAV value.
    pub fn attribute(&self, code: &str) -> Option<Value> {
        let column = match code {
            "sku" => Some(self.sku.clone()),
            "name" => self.name.clone(),
            "url_key" => self.url_key.clone(),
            "description" => self.description.clone(),
            "short_description" => self.short_description.clone(),
            "meta_title" => self.meta_title.clone(),
            "meta_description" => self.meta_description.clone(),
            "meta_keyword" | "meta_keywords" => self.meta_keywords.clone(),
            _ => None,
        };
        match column {
            Some(value) => Some(Value::String(value)),
            None => self.attributes.get(code).filter(|v| !v.is_null()).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_type_round_trips_unknown_codes() {
        let parsed: ProductType = serde_json::from_value(json!("giftcard")).unwrap();
        assert_eq!(parsed, ProductType::Other("giftcard".to_string()));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json!("giftcard"));
        assert!(!parsed.is_composite());
        assert!(ProductType::Bundle.is_composite());
    }

    #[test]
    fn test_visibility_codes() {
        let visibility: Visibility = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(visibility, Visibility::Search);
        assert!(visibility.is_visible_in_site());
        assert!(!Visibility::NotVisibleIndividually.is_visible_in_site());
        assert!(serde_json::from_value::<Visibility>(json!(9)).is_err());
    }

    #[test]
    fn test_special_price_window() {
        let snapshot = PriceSnapshot {
            regular_price: 20.0,
            special_price: Some(15.0),
            special_from_date: NaiveDate::from_ymd_opt(2024, 1, 10),
            special_to_date: NaiveDate::from_ymd_opt(2024, 1, 20),
        };

        let before = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        let during = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let after = NaiveDate::from_ymd_opt(2024, 1, 21).unwrap();

        assert_eq!(snapshot.final_price(before), 20.0);
        assert_eq!(snapshot.final_price(during), 15.0);
        assert_eq!(snapshot.final_price(after), 20.0);
    }

    #[test]
    fn test_attribute_exposes_static_columns() {
        let mut product = ProductEntity::new(1, "SKU-1", ProductType::Simple);
        product.name = Some("Shirt".to_string());
        product
            .attributes
            .insert("color".to_string(), json!("12"));
        product.attributes.insert("size".to_string(), Value::Null);

        assert_eq!(product.attribute("name"), Some(json!("Shirt")));
        assert_eq!(product.attribute("color"), Some(json!("12")));
        assert_eq!(product.attribute("size"), None);
        assert_eq!(product.attribute("material"), None);
    }
}
