//! Search index provider trait definition.
//!
//! This module defines the abstract interface for the product collections,
//! allowing for different backend implementations.

use async_trait::async_trait;

use catalog_indexer_shared::{EntityId, ProductDocument};

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, CollectionSchema};

/// Abstracts the underlying search index implementation.
///
/// Implementations are injected into the loader as `Arc<dyn SearchIndexProvider>` so the
/// pipeline can be tested against in-memory mocks.
///
/// # Collection Initialization
///
/// Callers run `ensure_collection` before writing into a collection. It must be safe to call
/// repeatedly: an existing collection is extended with any new fields rather than recreated.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the collection exists with at least the fields of `schema`.
    async fn ensure_collection(&self, schema: &CollectionSchema) -> Result<(), SearchIndexError>;

    /// Insert or replace whole documents in `collection`.
    ///
    /// A document replaces any previous document with the same id. Individual failures are
    /// reported in the summary; `Err` means the request as a whole failed.
    async fn upsert_documents(
        &self,
        collection: &str,
        documents: &[ProductDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Delete documents by product id.
    ///
    /// Documents that don't exist are considered successful deletions.
    async fn delete_documents(
        &self,
        collection: &str,
        ids: &[EntityId],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}
