//! Orchestrator module for the catalog indexer.
//!
//! Coordinates the consumer, the indexing drivers and the loader.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use catalog_indexer_shared::{EntityId, StoreId};

use crate::consumer::{ProductEvent, StreamMessage};
use crate::errors::IngestError;
use crate::indexer::{IndexerKind, IndexingDriver};
use crate::loader::{LoadSummary, SearchLoader};

pub use crate::consumer::Consumer;

/// How an indexer reacts to product events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexerMode {
    /// Row passes run as soon as a batch arrives.
    #[default]
    Realtime,
    /// Ids are queued and indexed on the schedule interval.
    Scheduled,
}

impl FromStr for IndexerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realtime" | "real-time" | "realtime-update" => Ok(Self::Realtime),
            "scheduled" | "schedule" => Ok(Self::Scheduled),
            other => Err(format!("Unknown indexer mode: {}", other)),
        }
    }
}

impl fmt::Display for IndexerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Realtime => f.write_str("realtime"),
            Self::Scheduled => f.write_str("scheduled"),
        }
    }
}

/// An indexing driver with its mode and pending ids.
pub struct IndexerHandle {
    driver: IndexingDriver,
    mode: IndexerMode,
    backlog: BTreeMap<StoreId, BTreeSet<EntityId>>,
}

impl IndexerHandle {
    pub fn new(driver: IndexingDriver, mode: IndexerMode) -> Self {
        Self {
            driver,
            mode,
            backlog: BTreeMap::new(),
        }
    }

    pub fn realtime(driver: IndexingDriver) -> Self {
        Self::new(driver, IndexerMode::Realtime)
    }

    pub fn scheduled(driver: IndexingDriver) -> Self {
        Self::new(driver, IndexerMode::Scheduled)
    }

    pub fn kind(&self) -> IndexerKind {
        self.driver.kind()
    }

    pub fn mode(&self) -> IndexerMode {
        self.mode
    }

    /// Number of queued ids across stores.
    pub fn pending(&self) -> usize {
        self.backlog.values().map(BTreeSet::len).sum()
    }
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
    /// Stores targeted by events without a store id and by full passes.
    pub store_ids: Vec<StoreId>,
    /// Backlog flush period of scheduled indexers.
    pub schedule_interval: Duration,
    /// Run a full pass for every store before consuming events.
    pub full_reindex_on_start: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 1000,
            store_ids: vec![1],
            schedule_interval: Duration::from_secs(60),
            full_reindex_on_start: false,
        }
    }
}

/// Orchestrator that coordinates the indexing flow.
///
/// The orchestrator:
/// - Runs row passes for every product event batch
/// - Acknowledges a batch once every indexer has applied or queued it
/// - Flushes the backlog of scheduled indexers on a timer and on exit
/// - Handles shutdown signals
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    indexers: Vec<IndexerHandle>,
    loader: SearchLoader,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
    /// Total number of events processed since startup.
    total_events_processed: Arc<AtomicU64>,
    /// Total number of documents indexed since startup.
    total_documents_indexed: Arc<AtomicU64>,
    /// Total number of documents removed since startup.
    total_documents_removed: Arc<AtomicU64>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        consumer: Arc<dyn Consumer>,
        indexers: Vec<IndexerHandle>,
        loader: SearchLoader,
    ) -> Self {
        Self::with_config(consumer, indexers, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: Arc<dyn Consumer>,
        indexers: Vec<IndexerHandle>,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer,
            indexers,
            loader,
            config,
            shutdown_tx,
            total_events_processed: Arc::new(AtomicU64::new(0)),
            total_documents_indexed: Arc::new(AtomicU64::new(0)),
            total_documents_removed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn indexers(&self) -> &[IndexerHandle] {
        &self.indexers
    }

    pub fn total_documents_indexed(&self) -> u64 {
        self.total_documents_indexed.load(Ordering::Relaxed)
    }

    pub fn total_documents_removed(&self) -> u64 {
        self.total_documents_removed.load(Ordering::Relaxed)
    }

    /// Run the orchestrator.
    ///
    /// Starts the consumer and routes its batches through the indexers. Blocks
    /// until the stream ends, a shutdown signal is received or subscribing fails.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), IngestError> {
        info!(
            stores = ?self.config.store_ids,
            indexers = self.indexers.len(),
            "Starting catalog indexer orchestrator"
        );

        self.consumer.subscribe()?;

        if self.config.full_reindex_on_start {
            self.reindex_all().await?;
        }

        // Create event channel
        let (event_transmitter, mut event_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Create acknowledgment channel
        let (ack_transmitter, ack_receiver) =
            mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        // Start consumer in background
        let consumer = Arc::clone(&self.consumer);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer
                .run(event_transmitter, ack_receiver, shutdown_rx)
                .await
            {
                error!(error = %e, "Consumer error");
            }
        });

        info!("Ready to process product events");

        let total_events = Arc::clone(&self.total_events_processed);
        let total_docs = Arc::clone(&self.total_documents_indexed);
        let total_removed = Arc::clone(&self.total_documents_removed);
        let mut progress_timer = interval(Duration::from_secs(10));
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut schedule_timer = interval(self.config.schedule_interval);
        schedule_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        schedule_timer.tick().await;

        // Track previous values for rate calculation
        let mut prev_events: u64 = 0;
        let mut prev_docs: u64 = 0;
        let mut prev_time = std::time::Instant::now();

        loop {
            tokio::select! {
                msg = event_receiver.recv() => {
                    match msg {
                        Some(StreamMessage::Events { events, offsets }) => {
                            info!(
                                event_count = events.len(),
                                offset_count = offsets.len(),
                                "Received events from consumer"
                            );
                            let ack = match self.process_events(events).await {
                                Ok(()) => StreamMessage::Acknowledgment {
                                    offsets,
                                    success: true,
                                    error: None,
                                },
                                Err(e) => {
                                    error!(error = %e, "Failed to process events. Sending NACK to broker");
                                    StreamMessage::Acknowledgment {
                                        offsets,
                                        success: false,
                                        error: Some(e.to_string()),
                                    }
                                }
                            };
                            let _ = ack_transmitter.send(ack).await;
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                        Some(StreamMessage::Acknowledgment { .. }) => {
                            warn!("Received acknowledgment on event channel (should be on ack channel)");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = schedule_timer.tick() => {
                    self.flush_backlog().await;
                }
                _ = progress_timer.tick() => {
                    let events = total_events.load(Ordering::Relaxed);
                    let docs = total_docs.load(Ordering::Relaxed);
                    let removed = total_removed.load(Ordering::Relaxed);

                    let now = std::time::Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();

                    let events_per_sec = if elapsed_secs > 0.0 {
                        (events.saturating_sub(prev_events) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    let docs_per_sec = if elapsed_secs > 0.0 {
                        (docs.saturating_sub(prev_docs) as f64) / elapsed_secs
                    } else {
                        0.0
                    };

                    info!(
                        events_processed = events,
                        documents_indexed = docs,
                        documents_removed = removed,
                        events_per_sec = format!("{:.2}", events_per_sec),
                        documents_per_sec = format!("{:.2}", docs_per_sec),
                        "Processing progress"
                    );

                    prev_events = events;
                    prev_docs = docs;
                    prev_time = now;
                }
            }
        }

        // Queued ids were already acknowledged, so they are indexed before exiting
        self.flush_backlog().await;

        let _ = consumer_handle.await;

        info!(
            total_events_processed = self.total_events_processed.load(Ordering::Relaxed),
            total_documents_indexed = self.total_documents_indexed.load(Ordering::Relaxed),
            total_documents_removed = self.total_documents_removed.load(Ordering::Relaxed),
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Run a full pass of every indexer for every configured store.
    #[instrument(skip(self), fields(stores = ?self.config.store_ids))]
    pub async fn reindex_all(&mut self) -> Result<LoadSummary, IngestError> {
        let mut total = LoadSummary::default();
        for handle in &self.indexers {
            for &store_id in &self.config.store_ids {
                let summary = run_and_apply(&handle.driver, &mut self.loader, store_id, None).await?;
                total.indexed += summary.indexed;
                total.removed += summary.removed;
                total.failed += summary.failed;
            }
        }
        self.record(total);
        info!(
            indexed = total.indexed,
            removed = total.removed,
            failed = total.failed,
            "Full reindex complete"
        );
        Ok(total)
    }

    /// Process a batch of product events.
    ///
    /// Realtime indexers run a row pass per store and have it applied before this
    /// returns; scheduled indexers only queue the ids. The caller acknowledges the
    /// batch only when this returns Ok.
    pub async fn process_events(&mut self, events: Vec<ProductEvent>) -> Result<(), IngestError> {
        self.total_events_processed
            .fetch_add(events.len() as u64, Ordering::Relaxed);

        let targets = self.group_by_store(&events);
        if targets.is_empty() {
            debug!("No products to reindex after grouping events");
            return Ok(());
        }

        let mut total = LoadSummary::default();
        for handle in &mut self.indexers {
            match handle.mode {
                IndexerMode::Scheduled => {
                    for (store_id, ids) in &targets {
                        handle
                            .backlog
                            .entry(*store_id)
                            .or_default()
                            .extend(ids.iter().copied());
                    }
                    debug!(
                        kind = %handle.driver.kind(),
                        pending = handle.pending(),
                        "Queued products for scheduled indexer"
                    );
                }
                IndexerMode::Realtime => {
                    for (store_id, ids) in &targets {
                        let ids: Vec<EntityId> = ids.iter().copied().collect();
                        let summary =
                            run_and_apply(&handle.driver, &mut self.loader, *store_id, Some(&ids))
                                .await?;
                        total.indexed += summary.indexed;
                        total.removed += summary.removed;
                        total.failed += summary.failed;
                    }
                }
            }
        }
        self.record(total);
        Ok(())
    }

    /// Index the queued ids of scheduled indexers.
    ///
    /// Ids of a failed pass stay queued for the next flush.
    pub async fn flush_backlog(&mut self) {
        let mut total = LoadSummary::default();
        for handle in &mut self.indexers {
            if handle.backlog.is_empty() {
                continue;
            }
            let backlog = std::mem::take(&mut handle.backlog);
            for (store_id, ids) in backlog {
                let id_list: Vec<EntityId> = ids.iter().copied().collect();
                match run_and_apply(&handle.driver, &mut self.loader, store_id, Some(&id_list))
                    .await
                {
                    Ok(summary) => {
                        total.indexed += summary.indexed;
                        total.removed += summary.removed;
                        total.failed += summary.failed;
                    }
                    Err(e) => {
                        error!(
                            kind = %handle.driver.kind(),
                            store_id,
                            count = ids.len(),
                            error = %e,
                            "Scheduled indexing failed, keeping products queued"
                        );
                        handle.backlog.entry(store_id).or_default().extend(ids);
                    }
                }
            }
        }
        if total != LoadSummary::default() {
            info!(
                indexed = total.indexed,
                removed = total.removed,
                "Flushed scheduled backlog"
            );
        }
        self.record(total);
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    fn group_by_store(&self, events: &[ProductEvent]) -> BTreeMap<StoreId, BTreeSet<EntityId>> {
        let mut targets: BTreeMap<StoreId, BTreeSet<EntityId>> = BTreeMap::new();
        for event in events {
            match event.store_id {
                Some(store_id) => {
                    targets
                        .entry(store_id)
                        .or_default()
                        .insert(event.product_id);
                }
                None => {
                    for &store_id in &self.config.store_ids {
                        targets
                            .entry(store_id)
                            .or_default()
                            .insert(event.product_id);
                    }
                }
            }
        }
        targets
    }

    fn record(&self, summary: LoadSummary) {
        self.total_documents_indexed
            .fetch_add(summary.indexed as u64, Ordering::Relaxed);
        self.total_documents_removed
            .fetch_add(summary.removed as u64, Ordering::Relaxed);
    }
}

async fn run_and_apply(
    driver: &IndexingDriver,
    loader: &mut SearchLoader,
    store_id: StoreId,
    product_ids: Option<&[EntityId]>,
) -> Result<LoadSummary, IngestError> {
    let batch = driver.run(store_id, product_ids).await?;
    if batch.is_empty() {
        debug!(store_id, kind = %driver.kind(), "Nothing to apply");
        return Ok(LoadSummary::default());
    }
    loader.apply(batch).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexer_mode_parsing() {
        assert_eq!("realtime".parse::<IndexerMode>(), Ok(IndexerMode::Realtime));
        assert_eq!(" Scheduled ".parse::<IndexerMode>(), Ok(IndexerMode::Scheduled));
        assert!("hourly".parse::<IndexerMode>().is_err());
        assert_eq!(IndexerMode::default(), IndexerMode::Realtime);
        assert_eq!(IndexerMode::Scheduled.to_string(), "scheduled");
    }

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.channel_buffer_size, 1000);
        assert_eq!(config.store_ids, vec![1]);
        assert_eq!(config.schedule_interval, Duration::from_secs(60));
        assert!(!config.full_reindex_on_start);
    }
}
