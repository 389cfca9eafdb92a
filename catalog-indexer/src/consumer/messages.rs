//! Message types for the consumer.
//!
//! Defines the event structures that flow through the indexer.

use serde::{Deserialize, Serialize};

use catalog_indexer_shared::{EntityId, StoreId};

/// What happened to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductEventType {
    /// Product was created or updated.
    Save,
    /// Product was deleted.
    Delete,
}

/// A product event received from Kafka.
///
/// Both kinds trigger a row-level pass; a deleted product simply no longer
/// survives the collection fetch and is removed from the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEvent {
    pub event: ProductEventType,
    pub product_id: EntityId,
    /// Store the change applies to. `None` means every indexed store.
    #[serde(default)]
    pub store_id: Option<StoreId>,
}

impl ProductEvent {
    pub fn save(product_id: EntityId, store_id: Option<StoreId>) -> Self {
        Self {
            event: ProductEventType::Save,
            product_id,
            store_id,
        }
    }

    pub fn delete(product_id: EntityId, store_id: Option<StoreId>) -> Self {
        Self {
            event: ProductEventType::Delete,
            product_id,
            store_id,
        }
    }
}

/// Messages that flow between the consumer and the orchestrator.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of product events with associated offsets for acknowledgment.
    Events {
        events: Vec<ProductEvent>,
        offsets: Vec<(String, i32, i64)>,
    },
    /// Acknowledgment that events were processed.
    Acknowledgment {
        offsets: Vec<(String, i32, i64)>,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event: ProductEvent =
            serde_json::from_str(r#"{"event":"save","product_id":42,"store_id":null}"#).unwrap();
        assert_eq!(event, ProductEvent::save(42, None));

        let event: ProductEvent =
            serde_json::from_str(r#"{"event":"delete","product_id":7,"store_id":2}"#).unwrap();
        assert_eq!(event, ProductEvent::delete(7, Some(2)));

        let event: ProductEvent = serde_json::from_str(r#"{"event":"save","product_id":1}"#).unwrap();
        assert_eq!(event.store_id, None);

        assert!(serde_json::from_str::<ProductEvent>(r#"{"event":"moved","product_id":1}"#).is_err());
    }
}
