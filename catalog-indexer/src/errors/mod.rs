//! Error types for the catalog indexer.

use thiserror::Error;

use catalog_indexer_repository::SearchIndexError;
use catalog_indexer_shared::{EntityId, StoreId};

use crate::catalog::CatalogError;

/// Reasons a product may not appear in the index for a store.
///
/// Rules are checked in declaration order and the first failing one is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("Product {product_id} is deleted (store {store_id})")]
    Deleted { product_id: EntityId, store_id: StoreId },

    #[error("Product {product_id} is disabled (store {store_id})")]
    Disabled { product_id: EntityId, store_id: StoreId },

    #[error("Product {product_id} is not visible (store {store_id})")]
    NotVisible { product_id: EntityId, store_id: StoreId },

    #[error("Product {product_id} is out of stock (store {store_id})")]
    OutOfStock { product_id: EntityId, store_id: StoreId },
}

impl EligibilityError {
    pub fn product_id(&self) -> EntityId {
        match self {
            Self::Deleted { product_id, .. }
            | Self::Disabled { product_id, .. }
            | Self::NotVisible { product_id, .. }
            | Self::OutOfStock { product_id, .. } => *product_id,
        }
    }

    pub fn store_id(&self) -> StoreId {
        match self {
            Self::Deleted { store_id, .. }
            | Self::Disabled { store_id, .. }
            | Self::NotVisible { store_id, .. }
            | Self::OutOfStock { store_id, .. } => *store_id,
        }
    }
}

/// Errors raised while building documents for one indexing pass.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A catalog collaborator failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// One product's document could not be assembled.
    #[error("Assembly error for product {product_id}: {message}")]
    Assembly { product_id: EntityId, message: String },
}

impl PipelineError {
    pub fn assembly(product_id: EntityId, message: impl Into<String>) -> Self {
        Self::Assembly {
            product_id,
            message: message.into(),
        }
    }
}

/// Errors that can occur in the catalog indexer ingest.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Error parsing or decoding data.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Document pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),
}

impl IngestError {
    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }
}

impl From<rdkafka::error::KafkaError> for IngestError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}

impl From<SearchIndexError> for IngestError {
    fn from(err: SearchIndexError) -> Self {
        Self::LoaderError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligibility_error_carries_ids() {
        let err = EligibilityError::OutOfStock {
            product_id: 12,
            store_id: 3,
        };
        assert_eq!(err.product_id(), 12);
        assert_eq!(err.store_id(), 3);
        assert_eq!(err.to_string(), "Product 12 is out of stock (store 3)");
    }

    #[test]
    fn test_pipeline_error_converts_into_ingest_error() {
        let err: IngestError = PipelineError::assembly(5, "bad price").into();
        assert!(matches!(err, IngestError::PipelineError(_)));
        assert!(err.to_string().contains("product 5"));
    }
}
