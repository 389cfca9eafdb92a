//! Integration tests for the indexing driver.
//!
//! These run full passes against the in-memory catalog snapshot.

mod common;

use std::collections::HashSet;

use serde_json::json;

use catalog_indexer::catalog::ProductFilter;
use catalog_indexer::config::paths;
use catalog_indexer::errors::EligibilityError;
use catalog_indexer::indexer::IndexerKind;
use catalog_indexer::processor::{CompositeResolver, HookRegistry, SchemaResolver};
use catalog_indexer_shared::{
    ConfigurableOption, ConfigurableOptionValue, MediaEntry, ProductDocument, ProductEntity,
    ProductStatus, ProductType, StockRecord, StoreId, Visibility,
};

use common::{category, ids, product, text_attribute, Fixture, STORE};

fn child(id: u32, material: &str, color: i64) -> ProductEntity {
    let mut child = product(id, ProductType::Simple);
    child.visibility = Visibility::NotVisibleIndividually;
    child.attributes.insert("material".to_string(), json!(material));
    child.attributes.insert("color".to_string(), json!(color.to_string()));
    child
}

fn image(file: &str, position: i64) -> MediaEntry {
    MediaEntry {
        id: None,
        media_type: "image".to_string(),
        file: file.to_string(),
        label: None,
        position,
        disabled: false,
        types: vec!["image".to_string()],
        video_content: None,
    }
}

/// Configurable 10 with an enabled child 11 and a disabled child 12.
fn configurable_fixture() -> Fixture {
    let mut fx = Fixture::new();
    fx.snapshot.add_attribute(text_attribute(94, "material", "Material"));
    fx.set(0, paths::PRODUCTS_SCHEMA, r#"[{"name": "material", "type": "string"}]"#);

    fx.stocked(product(10, ProductType::Configurable));
    fx.stocked(child(11, "Cotton", 12));
    let mut disabled = child(12, "Wool", 13);
    disabled.status = ProductStatus::Disabled;
    fx.stocked(disabled);
    fx.snapshot.link_configurable(10, vec![11, 12]);
    fx
}

fn document(documents: &[ProductDocument], id: u32) -> &ProductDocument {
    documents
        .iter()
        .find(|d| d.entity_id() == Some(id))
        .unwrap_or_else(|| panic!("no document for product {}", id))
}

#[tokio::test]
async fn test_document_without_configured_fields_has_exactly_baseline_fields() {
    let mut fx = Fixture::new();
    let mut simple = product(1, ProductType::Simple);
    simple.description = Some("<p>Soft cotton</p>".to_string());
    simple.short_description = Some("Everyday tee".to_string());
    simple.meta_title = Some("Tee".to_string());
    simple.category_ids = vec![3];
    simple.attributes.insert("material".to_string(), json!("Cotton"));
    fx.stocked(simple);

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    assert!(batch.to_remove.is_empty());
    let collection = batch.collection.expect("collection");
    assert_eq!(collection.name, "catalog_default_products");
    assert_eq!(collection.fields, SchemaResolver::baseline());

    let doc = &batch.to_index[0];
    for field in SchemaResolver::baseline() {
        assert!(doc.contains_key(&field.name), "missing baseline field {}", field.name);
    }
    assert!(!doc.contains_key("material"));
    assert!(!doc.contains_key("material_raw"));
    assert!(!doc.contains_key("material_label"));

    assert_eq!(doc.get("id"), Some(&json!("1")));
    assert_eq!(doc.get("uid"), Some(&json!("MQ==")));
    assert_eq!(doc.get("url"), Some(&json!("https://shop.test/product-1.html")));
    assert_eq!(doc.get("description_stripped"), Some(&json!("Soft cotton")));
    assert_eq!(doc.get("category_ids"), Some(&json!(["2", "3"])));
    assert_eq!(doc.get("category_uid"), Some(&json!(["Mg==", "Mw=="])));
    assert_eq!(doc.get("categories"), Some(&json!({"Mw==": "Shirts"})));
    assert_eq!(doc.get("stock_status"), Some(&json!("IN_STOCK")));
    assert_eq!(doc.get("final_price"), Some(&json!(10.0)));
}

#[tokio::test]
async fn test_schema_fields_are_unique_and_unindexed_fields_optional() {
    let mut fx = configurable_fixture();
    fx.set(
        STORE,
        paths::PRODUCTS_SCHEMA,
        r#"{"a": {"name": "material", "type": "string"},
            "b": {"name": "name", "type": "string", "index": "0"},
            "c": {"name": "material", "type": "string[]", "facet": "1"}}"#,
    );

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    let fields = batch.collection.expect("collection").fields;
    let names: HashSet<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names.len(), fields.len());
    assert_eq!(fields.len(), SchemaResolver::baseline().len() + 1);
    assert!(fields.iter().filter(|f| !f.index).all(|f| f.optional));
}

#[tokio::test]
async fn test_category_outside_root_yields_empty_category_fields() {
    let mut fx = Fixture::new();
    fx.snapshot.add_category(category(7, "Outlet", &[1, 7]));
    let mut simple = product(1, ProductType::Simple);
    simple.category_ids = vec![7];
    fx.stocked(simple);

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    let doc = &batch.to_index[0];
    assert_eq!(doc.get("category_ids"), Some(&json!([])));
    assert_eq!(doc.get("category_uid"), Some(&json!([])));
}

#[tokio::test]
async fn test_configurable_aggregates_only_enabled_children() {
    let fx = configurable_fixture();

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    assert_eq!(ids(&batch.to_index), vec![10]);

    let doc = &batch.to_index[0];
    assert_eq!(doc.get("subproducts"), Some(&json!(["11"])));
    assert_eq!(doc.get("material"), Some(&json!(["Cotton"])));
    assert_eq!(doc.get("material_raw"), Some(&json!(["Cotton"])));
    assert_eq!(doc.get("material_label"), Some(&json!("Material")));
    // Composite price spans enabled children only
    assert_eq!(doc.get("final_price"), Some(&json!(110.0)));
}

#[tokio::test]
async fn test_configured_meta_title_aggregates_from_children() {
    let mut fx = configurable_fixture();
    fx.snapshot.add_attribute(text_attribute(84, "meta_title", "Meta Title"));
    fx.set(0, paths::PRODUCTS_SCHEMA, r#"[{"name": "meta_title", "type": "string"}]"#);
    let mut titled = child(11, "Cotton", 12);
    titled.meta_title = Some("Child title".to_string());
    fx.snapshot.add_product(titled);

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    let doc = document(&batch.to_index, 10);
    assert_eq!(doc.get("meta_title"), Some(&json!(["Child title"])));
    assert_eq!(doc.get("meta_title_raw"), Some(&json!(["Child title"])));
}

#[tokio::test]
async fn test_unsalable_child_is_not_a_subproduct() {
    let mut fx = configurable_fixture();
    fx.snapshot.add_stock(StockRecord {
        is_salable: false,
        is_in_stock: true,
        ..common::in_stock("SKU-11")
    });

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    let doc = document(&batch.to_index, 10);
    assert_eq!(doc.get("subproducts"), Some(&json!([])));
    assert_eq!(doc.get("material_raw"), Some(&json!([])));
    // Required field with no contributing child falls back to its zero value
    assert_eq!(doc.get("material"), Some(&json!("")));
}

#[tokio::test]
async fn test_configurable_options_variants_and_gallery() {
    let mut fx = configurable_fixture();
    let value = |value_index: i64, label: &str| ConfigurableOptionValue {
        value_index,
        label: label.to_string(),
        default_label: None,
        store_label: None,
        use_default_value: true,
        swatch_data: None,
        uid: None,
    };
    fx.snapshot.set_configurable_options(
        10,
        vec![ConfigurableOption {
            attribute_id: 93,
            attribute_code: "color".to_string(),
            label: "Color".to_string(),
            position: 0,
            values: vec![value(12, "Red"), value(13, "Blue")],
        }],
    );
    fx.snapshot.add_media(10, image("/p/parent.jpg", 1));
    fx.snapshot.add_media(11, image("/c/child.jpg", 1));
    fx.snapshot.add_media(12, image("/c/disabled.jpg", 1));

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    let doc = &batch.to_index[0];

    let options = doc.get("configurable_options").unwrap();
    assert_eq!(options[0]["values"][0]["uid"], json!("Y29uZmlndXJhYmxlLzkzLzEy"));

    let variants = doc.get("variants").unwrap();
    assert_eq!(variants.as_array().map(Vec::len), Some(1));
    assert_eq!(variants[0]["child_id"], json!(11));
    assert_eq!(variants[0]["attributes"][0]["label"], json!("Red"));
    assert_eq!(variants[0]["attributes"][0]["uid"], json!("Y29uZmlndXJhYmxlLzkzLzEy"));

    let gallery = doc.get("media_gallery").unwrap().as_object().unwrap();
    assert_eq!(gallery.len(), 2);
    assert_eq!(
        gallery["image_/c/child.jpg_1"]["file"],
        json!("https://shop.test/media/catalog/product/c/child.jpg")
    );
    assert!(gallery.contains_key("image_/p/parent.jpg_1"));
}

#[tokio::test]
async fn test_out_of_stock_product_is_removed_on_row_pass() {
    let mut fx = Fixture::new();
    let mut sold_out = product(20, ProductType::Simple);
    sold_out.salable = false;
    fx.snapshot.add_product(sold_out.clone());
    fx.snapshot.add_stock(StockRecord {
        is_salable: false,
        is_in_stock: false,
        quantity: 0.0,
        ..common::in_stock("SKU-20")
    });

    assert_eq!(
        CompositeResolver::check_eligibility(&sold_out, STORE, false, false),
        Err(EligibilityError::OutOfStock {
            product_id: 20,
            store_id: STORE
        })
    );

    let batch = fx
        .driver(IndexerKind::Products)
        .run(STORE, Some(&[20]))
        .await
        .unwrap();
    assert!(batch.to_index.is_empty());
    assert_eq!(batch.to_remove, vec![20]);
}

#[tokio::test]
async fn test_out_of_stock_product_kept_when_store_shows_it() {
    let mut fx = Fixture::new();
    fx.set(0, paths::PRODUCTS_SHOW_OUT_OF_STOCK, "1");
    fx.snapshot.add_product(product(20, ProductType::Simple));
    fx.snapshot.add_stock(StockRecord {
        is_salable: false,
        is_in_stock: false,
        ..common::in_stock("SKU-20")
    });

    let batch = fx
        .driver(IndexerKind::Products)
        .run(STORE, Some(&[20]))
        .await
        .unwrap();
    assert_eq!(ids(&batch.to_index), vec![20]);
    assert_eq!(batch.to_index[0].get("stock_status"), Some(&json!("OUT_OF_STOCK")));
    assert!(batch.to_remove.is_empty());
}

#[tokio::test]
async fn test_salability_flag_decides_stock_status() {
    let mut fx = Fixture::new();
    fx.snapshot.add_product(product(30, ProductType::Simple));
    fx.snapshot.add_stock(StockRecord {
        quantity: 0.0,
        min_qty: 1.0,
        ..common::in_stock("SKU-30")
    });
    fx.snapshot.add_reservation("SKU-30", -5.0);

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    let doc = &batch.to_index[0];
    assert_eq!(doc.get("stock_status"), Some(&json!("IN_STOCK")));
    assert_eq!(doc.get("stock").unwrap()["salable_qty"], json!(-6.0));
}

#[tokio::test]
async fn test_short_description_is_stripped() {
    let mut fx = Fixture::new();
    let mut simple = product(1, ProductType::Simple);
    simple.short_description = Some("<script>x()</script>Hello".to_string());
    fx.stocked(simple);

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    let doc = &batch.to_index[0];
    assert_eq!(doc.get("short_description_stripped"), Some(&json!("Hello")));
    assert!(!doc.contains_key("description_stripped"));
}

#[tokio::test]
async fn test_child_edit_expands_to_parents() {
    let fx = configurable_fixture();
    let driver = fx.driver(IndexerKind::Products);

    assert_eq!(driver.expand_with_parents(&[11]).await.unwrap(), vec![10, 11]);

    let batch = driver.run(STORE, Some(&[11])).await.unwrap();
    assert_eq!(ids(&batch.to_index), vec![10]);
    // The child is not visible individually, so it leaves the products collection
    assert_eq!(batch.to_remove, vec![11]);
}

#[tokio::test]
async fn test_parent_ids_cover_every_composite_type() {
    let mut fx = configurable_fixture();
    fx.stocked(product(40, ProductType::Bundle));
    fx.snapshot.add_bundle_option(40, vec![11]);
    fx.stocked(product(50, ProductType::Grouped));
    fx.snapshot.link_grouped(50, vec![1, 11]);

    let resolver = CompositeResolver::from_services(&fx.services());
    let parents = resolver.parent_ids(&[11]).await.unwrap();
    for parent in [10, 40, 50] {
        assert!(parents.contains(&parent), "missing parent {}", parent);
    }
    assert!(resolver.parent_ids(&[10]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_assembly_is_idempotent() {
    let fx = configurable_fixture();
    let driver = fx.driver(IndexerKind::Products);

    let first = driver.run(STORE, None).await.unwrap();
    let second = driver.run(STORE, None).await.unwrap();
    assert_eq!(
        serde_json::to_vec(&first.to_index).unwrap(),
        serde_json::to_vec(&second.to_index).unwrap()
    );
}

#[tokio::test]
async fn test_hooks_adjust_collection_and_documents() {
    let mut fx = Fixture::new();
    fx.stocked(product(1, ProductType::Simple));
    fx.stocked(product(2, ProductType::Simple));
    fx.hooks = HookRegistry::new()
        .on_collection(|filter: &mut ProductFilter, _store_id: StoreId| {
            filter.entity_ids = Some(vec![2]);
        })
        .on_document(|mut document: ProductDocument, product: &ProductEntity| {
            document.insert("brand", "Acme");
            document.insert("name", format!("{} (Acme)", product.sku));
            document
        });

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    assert_eq!(ids(&batch.to_index), vec![2]);
    let doc = &batch.to_index[0];
    assert_eq!(doc.get("brand"), Some(&json!("Acme")));
    assert_eq!(doc.get("name"), Some(&json!("SKU-2 (Acme)")));
}

#[tokio::test]
async fn test_disabled_store_yields_empty_batch() {
    let mut fx = Fixture::new();
    fx.stocked(product(1, ProductType::Simple));
    fx.set(STORE, paths::PRODUCTS_ENABLED, "0");

    let batch = fx
        .driver(IndexerKind::Products)
        .run(STORE, Some(&[1]))
        .await
        .unwrap();
    assert!(batch.is_empty());
    assert!(batch.collection.is_none());
}

#[tokio::test]
async fn test_children_pass_is_gated_by_index_all() {
    let mut fx = configurable_fixture();

    let batch = fx
        .driver(IndexerKind::ProductsChildren)
        .run(STORE, None)
        .await
        .unwrap();
    assert!(batch.is_empty());

    fx.set(0, paths::PRODUCTS_INDEX_ALL, "yes");
    let batch = fx
        .driver(IndexerKind::ProductsChildren)
        .run(STORE, None)
        .await
        .unwrap();
    assert_eq!(ids(&batch.to_index), vec![11]);
    assert_eq!(
        batch.collection.map(|c| c.name),
        Some("catalog_default_products_children".to_string())
    );
    let doc = document(&batch.to_index, 11);
    assert_eq!(doc.get("parent_ids"), Some(&json!(["10"])));
}

#[tokio::test]
async fn test_full_pass_has_nothing_to_remove() {
    let mut fx = configurable_fixture();
    let mut hidden = product(2, ProductType::Simple);
    hidden.status = ProductStatus::Disabled;
    fx.stocked(hidden);

    let batch = fx.driver(IndexerKind::Products).run(STORE, None).await.unwrap();
    assert_eq!(ids(&batch.to_index), vec![10]);
    assert!(batch.to_remove.is_empty());
}
