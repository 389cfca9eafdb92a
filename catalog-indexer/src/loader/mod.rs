//! Loader module for the catalog indexer.
//!
//! Applies index batches to the search index: collection setup, upserts and deletes.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use catalog_indexer_repository::{BatchOperationSummary, CollectionSchema, SearchIndexProvider};
use catalog_indexer_shared::ProductDocument;

use crate::errors::IngestError;
use crate::indexer::IndexBatch;

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of documents sent per upsert call.
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

/// Counts of one applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub indexed: usize,
    pub removed: usize,
    pub failed: usize,
}

/// Loader that writes index batches into the search engine.
///
/// Collections are created or updated the first time a batch targets them, and
/// again whenever their field list changes.
pub struct SearchLoader {
    provider: Arc<dyn SearchIndexProvider>,
    config: LoaderConfig,
    ensured: HashMap<String, CollectionSchema>,
}

impl SearchLoader {
    /// Create a new search loader with the given provider.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self::with_config(provider, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: LoaderConfig) -> Self {
        Self {
            provider,
            config,
            ensured: HashMap::new(),
        }
    }

    /// Apply one batch.
    #[instrument(
        skip(self, batch),
        fields(
            store_id = batch.store_id,
            kind = %batch.kind,
            to_index = batch.to_index.len(),
            to_remove = batch.to_remove.len()
        )
    )]
    pub async fn apply(&mut self, batch: IndexBatch) -> Result<LoadSummary, IngestError> {
        let Some(schema) = batch.collection else {
            return Ok(LoadSummary::default());
        };
        self.ensure_collection(&schema).await?;

        let mut summary = LoadSummary::default();

        let batch_size = self.config.batch_size.max(1);
        for chunk in batch.to_index.chunks(batch_size) {
            let result = self.flush(&schema.name, chunk).await?;
            summary.indexed += result.succeeded;
            summary.failed += result.failed;
        }

        if !batch.to_remove.is_empty() {
            match self
                .provider
                .delete_documents(&schema.name, &batch.to_remove)
                .await
            {
                Ok(result) => {
                    for failure in result.failures() {
                        if let Some(ref err) = failure.error {
                            warn!(
                                collection = %schema.name,
                                document_id = %failure.document_id,
                                error = %err,
                                "Failed to delete document"
                            );
                        }
                    }
                    summary.removed += result.succeeded;
                }
                // Log but don't fail, documents may already be gone
                Err(e) => warn!(
                    collection = %schema.name,
                    count = batch.to_remove.len(),
                    error = %e,
                    "Failed to delete documents"
                ),
            }
        }

        Ok(summary)
    }

    async fn ensure_collection(&mut self, schema: &CollectionSchema) -> Result<(), IngestError> {
        if self.ensured.get(&schema.name) == Some(schema) {
            return Ok(());
        }
        self.provider.ensure_collection(schema).await.map_err(|e| {
            error!(collection = %schema.name, error = %e, "Failed to ensure collection");
            IngestError::loader(format!(
                "Failed to ensure collection {}: {}",
                schema.name, e
            ))
        })?;
        debug!(collection = %schema.name, fields = schema.fields.len(), "Collection ready");
        self.ensured.insert(schema.name.clone(), schema.clone());
        Ok(())
    }

    /// Run one upsert call and log partial failures.
    async fn flush(
        &self,
        collection: &str,
        documents: &[ProductDocument],
    ) -> Result<BatchOperationSummary, IngestError> {
        let count = documents.len();
        debug!(collection, count, "Flushing documents to search index");

        match self.provider.upsert_documents(collection, documents).await {
            Ok(summary) => {
                if summary.failed > 0 {
                    warn!(
                        collection,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        "Bulk upsert completed with some failures"
                    );
                    for result in summary.failures() {
                        if let Some(ref err) = result.error {
                            error!(
                                document_id = %result.document_id,
                                error = %err,
                                "Failed to index document"
                            );
                        }
                    }
                } else {
                    debug!(count = summary.succeeded, "Successfully indexed all documents");
                }
                Ok(summary)
            }
            Err(e) => {
                error!(collection, error = %e, count, "Failed to upsert documents");
                Err(IngestError::loader(format!(
                    "Failed to upsert {} documents into {}: {}",
                    count, collection, e
                )))
            }
        }
    }
}
