//! Push notifications for breaches, low stock and new transfers.
//!
//! Events are fanned out on a tokio broadcast channel. Publishing never blocks and never
//! fails the operation that raised the event: with no subscribers the event is dropped, and a
//! subscriber that falls behind by more than the channel capacity skips the oldest events.

use crate::blood_type::BloodType;
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::hospital::StockLevel;
use crate::transfer::Urgency;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InventoryEvent {
    UnitBreached {
        unit_id: String,
        blood_type: BloodType,
        temperature: f64,
        location: String,
    },
    LowStock {
        hospital_id: String,
        level: StockLevel,
        total_units: u32,
    },
    TransferSubmitted {
        transfer_id: Uuid,
        source_id: String,
        destination_id: String,
        blood_type: BloodType,
        units: u32,
        urgency: Urgency,
    },
}

impl InventoryEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InventoryEvent::UnitBreached { .. } => "unitBreached",
            InventoryEvent::LowStock { .. } => "lowStock",
            InventoryEvent::TransferSubmitted { .. } => "transferSubmitted",
        }
    }
}

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<InventoryEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: InventoryEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(kind, receivers, "event published"),
            Err(_) => tracing::debug!(kind, "event dropped, no subscribers"),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breach() -> InventoryEvent {
        InventoryEvent::UnitBreached {
            unit_id: "BB006".into(),
            blood_type: BloodType::OPositive,
            temperature: 12.5,
            location: "H002".into(),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        EventBus::default().publish(breach());
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(breach());
        assert_eq!(rx.recv().await.expect("event delivered"), breach());
    }

    #[test]
    fn test_event_serialises_with_type_tag() {
        let json = serde_json::to_value(breach()).unwrap();
        assert_eq!(json["type"], "unitBreached");
        assert_eq!(json["unitId"], "BB006");
        assert_eq!(json["bloodType"], "O+");
    }
}
