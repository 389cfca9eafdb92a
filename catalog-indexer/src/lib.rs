//! # Catalog Indexer
//!
//! Builds search documents for catalog products and keeps one OpenSearch
//! collection per store and indexer kind in sync with the catalog.
//!
//! ## Architecture
//!
//! The indexer follows the Consumer-Processor-Loader pattern:
//!
//! 1. **Consumer**: Receives product save/delete events from Kafka
//! 2. **Indexer**: Runs a pass per store, turning products into documents
//!    through the processor components
//! 3. **Loader**: Ensures collections and applies upserts and deletes
//! 4. **Orchestrator**: Coordinates the flow and the scheduled backlog
//!
//! ## Modules
//!
//! - [`catalog`]: Collaborator contracts and the in-memory catalog snapshot
//! - [`config`]: Store-scoped settings and dependency initialization
//! - [`consumer`]: Kafka consumer for product events
//! - [`processor`]: Schema, attribute, category, composite, price and content resolution
//! - [`indexer`]: The indexing driver producing index batches
//! - [`loader`]: Applies index batches to the search engine
//! - [`orchestrator`]: Coordinates the indexing flow
//! - [`errors`]: Error types for the indexer

pub mod catalog;
pub mod config;
pub mod consumer;
pub mod errors;
pub mod indexer;
pub mod loader;
pub mod orchestrator;
pub mod processor;

pub use config::Dependencies;
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
