//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate. Documents are written through the bulk API.

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts, IndicesPutMappingParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use url::Url;

use catalog_indexer_shared::{EntityId, ProductDocument};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{mappings, IndexConfig};
use crate::types::{BatchOperationResult, BatchOperationSummary, CollectionSchema};

/// OpenSearch provider implementation.
///
/// # Example
///
/// ```ignore
/// use catalog_indexer_repository::{IndexConfig, OpenSearchProvider, SearchIndexProvider};
///
/// let provider = OpenSearchProvider::new("http://localhost:9200", IndexConfig::new("catalog_")).await?;
/// provider.upsert_documents("catalog_default_products", &documents).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            prefix = %index_config.prefix,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    pub fn index_config(&self) -> &IndexConfig {
        &self.index_config
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[name]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        Ok(response.status_code().is_success())
    }

    async fn send_bulk(
        &self,
        collection: &str,
        body: Vec<JsonBody<Value>>,
    ) -> Result<Value, SearchIndexError> {
        let response = self
            .client
            .bulk(BulkParts::Index(collection))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_operation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchIndexError::bulk_operation(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))
    }
}

/// Turn the `items` array of a bulk response into per-document results.
///
/// `ids` lists the document ids in request order and is used when an item carries no `_id`.
/// With `missing_ok`, a 404 item counts as a success.
pub(crate) fn parse_bulk_items(
    response: &Value,
    action: &str,
    ids: &[String],
    missing_ok: bool,
) -> Vec<BatchOperationResult> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    ids.iter()
        .enumerate()
        .map(|(position, fallback_id)| {
            let Some(item) = items.get(position).and_then(|item| item.get(action)) else {
                return BatchOperationResult::failed(
                    fallback_id.clone(),
                    SearchIndexError::parse("bulk response is missing an item"),
                );
            };
            let id = item
                .get("_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| fallback_id.clone());
            let status = item.get("status").and_then(Value::as_u64).unwrap_or(500);

            if (200..300).contains(&status) || (missing_ok && status == 404) {
                return BatchOperationResult::ok(id);
            }

            let reason = item
                .get("error")
                .map(|e| {
                    e.get("reason")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .unwrap_or_else(|| format!("status {}", status));
            let error = if action == "delete" {
                SearchIndexError::delete(reason)
            } else {
                SearchIndexError::index(reason)
            };
            BatchOperationResult::failed(id, error)
        })
        .collect()
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Create the index if missing, otherwise extend its mapping with the declared fields.
    #[instrument(skip(self, schema), fields(collection = %schema.name, fields = schema.fields.len()))]
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), SearchIndexError> {
        if self.collection_exists(&schema.name).await? {
            let mut mapping = mappings(schema);
            // _meta is replaced wholesale by put_mapping; keep the original one.
            if let Some(object) = mapping.as_object_mut() {
                object.remove("_meta");
            }
            let response = self
                .client
                .indices()
                .put_mapping(IndicesPutMappingParts::Index(&[schema.name.as_str()]))
                .body(mapping)
                .send()
                .await
                .map_err(|e| SearchIndexError::collection(e.to_string()))?;

            let status = response.status_code();
            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                error!(status = %status, body = %error_body, "Mapping update failed");
                return Err(SearchIndexError::collection(format!(
                    "Mapping update for '{}' failed with status {}: {}",
                    schema.name, status, error_body
                )));
            }
            debug!("Collection mapping extended");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(schema.name.as_str()))
            .body(self.index_config.index_body(schema))
            .send()
            .await
            .map_err(|e| SearchIndexError::collection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            // Another worker may have created it in the meantime.
            if error_body.contains("resource_already_exists_exception") {
                return Ok(());
            }
            error!(status = %status, body = %error_body, "Collection creation failed");
            return Err(SearchIndexError::collection(format!(
                "Creating '{}' failed with status {}: {}",
                schema.name, status, error_body
            )));
        }

        info!("Collection created");
        Ok(())
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn upsert_documents(
        &self,
        collection: &str,
        documents: &[ProductDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut rejected = Vec::new();
        let mut ids = Vec::with_capacity(documents.len());
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);

        for document in documents {
            let Some(id) = document.document_id() else {
                rejected.push(BatchOperationResult::failed(
                    String::new(),
                    SearchIndexError::validation("document has neither id nor entity_id"),
                ));
                continue;
            };
            let source = serde_json::to_value(document)
                .map_err(|e| SearchIndexError::serialization(e.to_string()))?;
            body.push(json!({ "index": { "_id": id } }).into());
            body.push(source.into());
            ids.push(id);
        }

        let mut results = rejected;
        if !ids.is_empty() {
            let response = self.send_bulk(collection, body).await?;
            results.extend(parse_bulk_items(&response, "index", &ids, false));
        }

        let summary = BatchOperationSummary::from_results(results);
        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Documents upserted"
        );
        Ok(summary)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete_documents(
        &self,
        collection: &str,
        ids: &[EntityId],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if ids.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let body: Vec<JsonBody<Value>> = ids
            .iter()
            .map(|id| json!({ "delete": { "_id": id } }).into())
            .collect();

        let response = self.send_bulk(collection, body).await?;
        let summary = BatchOperationSummary::from_results(parse_bulk_items(
            &response, "delete", &ids, true,
        ));
        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Documents deleted"
        );
        Ok(summary)
    }
}
