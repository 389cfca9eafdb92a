//! Dependency initialization and wiring for the catalog indexer.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use catalog_indexer_repository::{IndexConfig, OpenSearchProvider};
use catalog_indexer_shared::StoreId;

use crate::catalog::CatalogSnapshot;
use crate::config::{paths, ConfigStore, StaticConfigStore, DEFAULT_SCOPE};
use crate::consumer::KafkaConsumer;
use crate::indexer::{IndexerKind, IndexingDriver};
use crate::loader::{LoaderConfig, SearchLoader};
use crate::orchestrator::{IndexerHandle, IndexerMode, Orchestrator, OrchestratorConfig};
use crate::processor::DirectiveFilter;
use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "catalog-indexer";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

const DEFAULT_INDEX_PREFIX: &str = "catalog_";
const DEFAULT_CATALOG_SNAPSHOT_PATH: &str = "catalog.json";
const DEFAULT_STORE_CONFIG_PATH: &str = "stores.json";
const DEFAULT_STORE_IDS: &str = "1";
const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 60;
const DEFAULT_LOADER_BATCH_SIZE: usize = 100;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection on an interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse connection mode from a setting value.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Anything else falls back to "retry".
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!(value = %raw, "Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }

    fn from_env() -> Self {
        Self::parse(&env::var("OPENSEARCH_CONNECTION_MODE").unwrap_or_else(|_| "retry".to_string()))
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `OPENSEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `INDEX_PREFIX`: Collection name prefix (default: catalog_)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: Consumer group ID (default: catalog-indexer)
    /// - `CATALOG_SNAPSHOT_PATH`: JSON catalog export (default: catalog.json)
    /// - `STORE_CONFIG_PATH`: Store-scoped configuration (default: stores.json)
    /// - `STORE_IDS`: Comma-separated stores to index (default: 1)
    /// - `PRODUCTS_INDEXER_MODE`, `PRODUCTS_CHILDREN_INDEXER_MODE`: "realtime" or "scheduled"
    /// - `SCHEDULE_INTERVAL_SECS`: Backlog flush period (default: 60)
    /// - `FULL_REINDEX_ON_START`: Full pass before consuming (default: false)
    /// - `LOADER_BATCH_SIZE`: Documents per upsert call (default: 100)
    pub async fn new() -> Result<Self, IndexingError> {
        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_OPENSEARCH_URL.to_string());
        let kafka_broker =
            env::var("KAFKA_BROKER").unwrap_or_else(|_| DEFAULT_KAFKA_BROKER.to_string());
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| DEFAULT_KAFKA_GROUP_ID.to_string());
        let connection_mode = ConnectionMode::from_env();
        let retry_interval = env_parsed("OPENSEARCH_RETRY_INTERVAL_SECS", DEFAULT_RETRY_INTERVAL_SECS);
        let index_prefix =
            env::var("INDEX_PREFIX").unwrap_or_else(|_| DEFAULT_INDEX_PREFIX.to_string());
        let snapshot_path = env::var("CATALOG_SNAPSHOT_PATH")
            .unwrap_or_else(|_| DEFAULT_CATALOG_SNAPSHOT_PATH.to_string());
        let store_config_path =
            env::var("STORE_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_STORE_CONFIG_PATH.to_string());
        let store_ids = parse_store_ids(
            &env::var("STORE_IDS").unwrap_or_else(|_| DEFAULT_STORE_IDS.to_string()),
        )?;

        info!(
            opensearch_url = %opensearch_url,
            kafka_broker = %kafka_broker,
            kafka_group_id = %kafka_group_id,
            connection_mode = ?connection_mode,
            retry_interval_secs = retry_interval,
            index_prefix = %index_prefix,
            stores = ?store_ids,
            "Initializing dependencies"
        );

        let store_config = StaticConfigStore::from_path(&store_config_path)?;
        let base_url = store_config
            .value(DEFAULT_SCOPE, paths::BASE_URL)
            .unwrap_or_default();
        let snapshot = CatalogSnapshot::from_path(&snapshot_path)
            .map_err(|e| IndexingError::config(format!("Failed to load catalog: {}", e)))?;
        let services = snapshot.into_services(
            Arc::new(store_config),
            Arc::new(DirectiveFilter::new(base_url)),
        );

        let index_config = IndexConfig::new(index_prefix);

        // Initialize OpenSearch provider with retry logic
        let search_provider = Self::connect_to_opensearch(
            &opensearch_url,
            index_config.clone(),
            connection_mode,
            Duration::from_secs(retry_interval),
        )
        .await?;

        info!("OpenSearch connection established");

        let consumer = KafkaConsumer::new(&kafka_broker, &kafka_group_id).map_err(|e| {
            IndexingError::config(format!("Failed to create Kafka consumer: {}", e))
        })?;

        info!("Kafka consumer created");

        let indexers = IndexerKind::all()
            .into_iter()
            .map(|kind| {
                let mode = indexer_mode(kind);
                info!(kind = %kind, mode = %mode, "Configured indexer");
                IndexerHandle::new(
                    IndexingDriver::new(kind, services.clone(), index_config.clone()),
                    mode,
                )
            })
            .collect();

        let loader = SearchLoader::with_config(
            Arc::new(search_provider),
            LoaderConfig {
                batch_size: env_parsed("LOADER_BATCH_SIZE", DEFAULT_LOADER_BATCH_SIZE),
            },
        );

        let config = OrchestratorConfig {
            store_ids,
            schedule_interval: Duration::from_secs(env_parsed(
                "SCHEDULE_INTERVAL_SECS",
                DEFAULT_SCHEDULE_INTERVAL_SECS,
            )),
            full_reindex_on_start: env::var("FULL_REINDEX_ON_START")
                .map(|v| crate::config::parse_flag(&serde_json::Value::String(v)))
                .unwrap_or(false),
            ..OrchestratorConfig::default()
        };

        let orchestrator = Orchestrator::with_config(Arc::new(consumer), indexers, loader, config);

        Ok(Self { orchestrator })
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        url: &str,
        index_config: IndexConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        loop {
            match OpenSearchProvider::new(url, index_config.clone()).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn indexer_mode(kind: IndexerKind) -> IndexerMode {
    let var = match kind {
        IndexerKind::Products => "PRODUCTS_INDEXER_MODE",
        IndexerKind::ProductsChildren => "PRODUCTS_CHILDREN_INDEXER_MODE",
    };
    match env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|e: String| {
            warn!(variable = var, error = %e, "Invalid indexer mode, defaulting to realtime");
            IndexerMode::Realtime
        }),
        Err(_) => IndexerMode::Realtime,
    }
}

/// Parse a comma-separated store list.
fn parse_store_ids(raw: &str) -> Result<Vec<StoreId>, IndexingError> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part
            .parse::<StoreId>()
            .map_err(|_| IndexingError::config(format!("Invalid store id in STORE_IDS: {}", part)))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err(IndexingError::config("STORE_IDS lists no stores"));
    }
    Ok(ids)
}
