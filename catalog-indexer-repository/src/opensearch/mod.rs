//! OpenSearch implementation of the search index provider.

mod index_config;
mod provider;

pub use index_config::{field_mapping, mappings, IndexConfig};
pub use provider::OpenSearchProvider;
