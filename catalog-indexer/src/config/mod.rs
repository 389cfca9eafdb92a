//! Configuration for the catalog indexer.
//!
//! Process settings come from the environment; per-store settings come from a
//! [`ConfigStore`].

mod dependencies;
mod store_config;

pub use dependencies::{ConnectionMode, Dependencies};
pub use store_config::{
    parse_flag, paths, ConfigStore, StaticConfigStore, StoreSettings, DEFAULT_SCOPE,
};
