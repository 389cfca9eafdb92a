//! Consumer module for the catalog indexer.
//!
//! Provides Kafka consumer functionality for receiving product events.

mod kafka_consumer;
mod messages;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::IngestError;

pub use kafka_consumer::KafkaConsumer;
pub use messages::{ProductEvent, ProductEventType, StreamMessage};

/// Source of product event batches.
///
/// `run` sends `Events` batches on `sender` and reads acknowledgments from
/// `ack_receiver`, committing only acknowledged offsets. It sends `End` when the
/// stream is exhausted or `shutdown` fires.
#[async_trait]
pub trait Consumer: Send + Sync {
    fn subscribe(&self) -> Result<(), IngestError>;

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        ack_receiver: mpsc::Receiver<StreamMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError>;
}
