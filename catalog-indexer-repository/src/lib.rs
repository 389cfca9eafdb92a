//! # Catalog Indexer Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search index that stores product documents. It includes definitions for
//! errors, the provider interface, and a concrete implementation for OpenSearch.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::{IndexConfig, OpenSearchProvider};
pub use types::{BatchOperationResult, BatchOperationSummary, CollectionSchema};
