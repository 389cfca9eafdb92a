//! Kafka consumer implementation for the catalog indexer.
//!
//! Consumes product save/delete events from Kafka and forwards them in batches.

use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    consumer::{Consumer as _, StreamConsumer},
    message::Message as KafkaMessage,
    TopicPartitionList,
};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument};

use crate::consumer::messages::{ProductEvent, StreamMessage};
use crate::consumer::Consumer;
use crate::errors::IngestError;

/// The Kafka topic for product events.
const PRODUCT_EVENTS_TOPIC: &str = "catalog.product.events";

/// Default batch size for Kafka message batching.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default batch timeout in milliseconds.
const DEFAULT_BATCH_TIMEOUT_MS: u64 = 1000;

/// A payload carries one event or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum EventPayload {
    One(ProductEvent),
    Many(Vec<ProductEvent>),
}

/// Decode a message payload into product events.
pub(crate) fn decode_events(payload: &[u8]) -> Result<Vec<ProductEvent>, IngestError> {
    let decoded: EventPayload = serde_json::from_slice(payload)
        .map_err(|e| IngestError::parse(format!("Failed to decode product event: {}", e)))?;
    Ok(match decoded {
        EventPayload::One(event) => vec![event],
        EventPayload::Many(events) => events,
    })
}

/// Kafka consumer for product events.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
    batch_size: usize,
    batch_timeout: Duration,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    pub fn new(brokers: &str, group_id: &str) -> Result<Self, IngestError> {
        Self::with_batch_config(
            brokers,
            group_id,
            DEFAULT_BATCH_SIZE,
            DEFAULT_BATCH_TIMEOUT_MS,
        )
    }

    /// Create a new Kafka consumer with custom batch configuration.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `batch_size` - Number of messages to batch before sending
    /// * `batch_timeout_ms` - Maximum time to wait before flushing a partial batch (milliseconds)
    pub fn with_batch_config(
        brokers: &str,
        group_id: &str,
        batch_size: usize,
        batch_timeout_ms: u64,
    ) -> Result<Self, IngestError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()?;

        info!(
            brokers = %brokers,
            group_id = %group_id,
            batch_size = batch_size,
            batch_timeout_ms = batch_timeout_ms,
            "Created Kafka consumer with batching"
        );

        Ok(Self {
            consumer,
            topics: vec![PRODUCT_EVENTS_TOPIC.to_string()],
            batch_size,
            batch_timeout: Duration::from_millis(batch_timeout_ms),
        })
    }

    /// Send the pending events downstream.
    async fn flush_batch(
        &self,
        events: &[ProductEvent],
        offsets: &[(String, i32, i64)],
        sender: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), IngestError> {
        if events.is_empty() {
            return Ok(());
        }

        debug!(
            event_count = events.len(),
            offset_count = offsets.len(),
            "Sending batch of product events"
        );
        sender
            .send(StreamMessage::Events {
                events: events.to_vec(),
                offsets: offsets.to_vec(),
            })
            .await
            .map_err(|e| IngestError::ChannelError(e.to_string()))
    }

    /// Commit offsets for a batch of messages.
    fn commit_offsets(&self, offsets: &[(String, i32, i64)]) -> Result<(), IngestError> {
        if offsets.is_empty() {
            return Ok(());
        }

        let mut tpl = TopicPartitionList::new();
        for (topic, partition, offset) in offsets {
            tpl.add_partition_offset(topic, *partition, rdkafka::Offset::Offset(offset + 1))?;
        }
        self.consumer
            .commit(&tpl, rdkafka::consumer::CommitMode::Async)?;
        Ok(())
    }

    /// Parse a Kafka message into product events.
    fn parse_message(
        &self,
        msg: &rdkafka::message::BorrowedMessage<'_>,
    ) -> Result<Vec<ProductEvent>, IngestError> {
        let Some(payload) = msg.payload() else {
            debug!("Received message with empty payload");
            return Ok(Vec::new());
        };
        if msg.topic() != PRODUCT_EVENTS_TOPIC {
            debug!(topic = %msg.topic(), "Ignoring message from unknown topic");
            return Ok(Vec::new());
        }
        decode_events(payload)
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    /// Subscribe to configured topics.
    fn subscribe(&self) -> Result<(), IngestError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        self.consumer.subscribe(&topics)?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    /// Start consuming messages and send them through the channel.
    ///
    /// Messages are batched by count and by time. Offsets are committed only when
    /// the orchestrator acknowledges the batch.
    #[instrument(skip(self, sender, ack_receiver, shutdown))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();
        let mut batch: Vec<ProductEvent> = Vec::with_capacity(self.batch_size);
        let mut pending_offsets: Vec<(String, i32, i64)> = Vec::new();
        let mut flush_timer = tokio::time::interval(self.batch_timeout);
        flush_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the first tick immediately
        flush_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    // Uncommitted messages are re-read from the last committed offset on restart
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment { offsets, success, error }) => {
                            if success {
                                if let Err(e) = self.commit_offsets(&offsets) {
                                    error!(error = %e, "Failed to commit offsets after acknowledgment");
                                } else {
                                    debug!(offset_count = offsets.len(), "Committed offsets after successful processing");
                                }
                            } else {
                                error!(
                                    offset_count = offsets.len(),
                                    error = error.as_deref().unwrap_or("Unknown error"),
                                    "Not committing offsets due to processing failure"
                                );
                            }
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        _ => {}
                    }
                }
                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            debug!(
                                topic = %msg.topic(),
                                partition = msg.partition(),
                                offset = msg.offset(),
                                "Received message from Kafka"
                            );
                            match self.parse_message(&msg) {
                                Ok(events) if !events.is_empty() => {
                                    batch.extend(events);
                                    pending_offsets.push((msg.topic().to_string(), msg.partition(), msg.offset()));

                                    if batch.len() >= self.batch_size {
                                        self.flush_batch(&batch, &pending_offsets, &sender).await?;
                                        batch.clear();
                                        pending_offsets.clear();
                                    }
                                }
                                Ok(_) => {
                                    // Nothing to index, commit right away so it is not re-read
                                    self.commit_offsets(&[(msg.topic().to_string(), msg.partition(), msg.offset())])?;
                                }
                                Err(e) => {
                                    error!(
                                        topic = %msg.topic(),
                                        partition = msg.partition(),
                                        offset = msg.offset(),
                                        error = %e,
                                        "Failed to parse message"
                                    );
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            self.flush_batch(&batch, &pending_offsets, &sender).await?;
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                    }
                }
                _ = flush_timer.tick() => {
                    if !batch.is_empty() {
                        debug!(count = batch.len(), "Flushing batch due to timeout");
                        self.flush_batch(&batch, &pending_offsets, &sender).await?;
                        batch.clear();
                        pending_offsets.clear();
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ProductEventType;

    #[test]
    fn test_constants() {
        assert_eq!(PRODUCT_EVENTS_TOPIC, "catalog.product.events");
        assert_eq!(DEFAULT_BATCH_SIZE, 50);
        assert_eq!(DEFAULT_BATCH_TIMEOUT_MS, 1000);
    }

    #[test]
    fn test_decode_single_and_list_payloads() {
        let events = decode_events(br#"{"event":"save","product_id":3,"store_id":1}"#).unwrap();
        assert_eq!(events, vec![ProductEvent::save(3, Some(1))]);

        let events = decode_events(
            br#"[{"event":"save","product_id":3},{"event":"delete","product_id":4}]"#,
        )
        .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event, ProductEventType::Delete);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_events(b"not json"),
            Err(IngestError::ParseError(_))
        ));
    }
}
