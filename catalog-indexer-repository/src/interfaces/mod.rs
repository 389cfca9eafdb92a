//! Interface definitions for the search index provider.

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
