//! Media gallery resolution.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use catalog_indexer_shared::{MediaEntry, ProductEntity, ProductType};

use crate::catalog::{CatalogServices, MediaSource};

const MEDIA_PATH: &str = "media/catalog/product";

#[derive(Clone)]
pub struct MediaResolver {
    media: Arc<dyn MediaSource>,
}

impl MediaResolver {
    pub fn new(media: Arc<dyn MediaSource>) -> Self {
        Self { media }
    }

    pub fn from_services(services: &CatalogServices) -> Self {
        Self::new(Arc::clone(&services.media))
    }

    /// Gallery of a product with file paths turned into media URLs.
    ///
    /// Configurable products get an object merging their own and their children's
    /// entries keyed by `<media type>_<file>_<position>`; every other type gets a
    /// list ordered by position. Lookup failures degrade to an empty gallery.
    pub async fn gallery(
        &self,
        product: &ProductEntity,
        subproducts: &[ProductEntity],
        base_url: &str,
    ) -> Value {
        if product.type_id != ProductType::Configurable {
            let mut entries = self.entries(product).await;
            for entry in &mut entries {
                entry.file = media_url(base_url, &entry.file);
            }
            return serde_json::to_value(entries).unwrap_or_else(|_| Value::Array(Vec::new()));
        }

        let mut gallery = Map::new();
        for source in std::iter::once(product).chain(subproducts) {
            for mut entry in self.entries(source).await {
                let key = format!("{}_{}_{}", entry.media_type, entry.file, entry.position);
                entry.file = media_url(base_url, &entry.file);
                if let Ok(value) = serde_json::to_value(&entry) {
                    gallery.entry(key).or_insert(value);
                }
            }
        }
        Value::Object(gallery)
    }

    /// Enabled entries ordered by position.
    async fn entries(&self, product: &ProductEntity) -> Vec<MediaEntry> {
        let mut entries = match self.media.media_gallery(product.entity_id).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    product_id = product.entity_id,
                    error = %e,
                    "Media gallery unavailable, indexing without images"
                );
                return Vec::new();
            }
        };

        entries.retain(|entry| !entry.disabled && !entry.file.is_empty());
        entries.sort_by_key(|entry| entry.position);
        entries
    }
}

/// Public URL of a stored media file.
pub fn media_url(base_url: &str, file: &str) -> String {
    if file.starts_with("http://") || file.starts_with("https://") {
        return file.to_string();
    }
    let separator = if file.starts_with('/') { "" } else { "/" };
    format!("{}{}{}{}", base_url, MEDIA_PATH, separator, file)
}
