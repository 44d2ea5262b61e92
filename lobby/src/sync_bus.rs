use comms::message::SyncMessage;
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const BROADCAST_CHANNEL_CAPACITY: usize = 100;

/// Envelope pairing a sync message with the id of the sending context, so
/// receivers can drop their own publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The id of the context that published the message
    #[serde(rename = "c")]
    pub sender: String,
    /// The message itself
    #[serde(rename = "m")]
    pub message: SyncMessage,
}

/// [SyncBus] is a local broadcast channel connecting every live browsing
/// context on the same origin, standing in for a real network channel.
///
/// Messages travel as JSON strings. Delivery is best-effort: publishing with
/// nobody attached quietly does nothing, and messages sent before a context
/// attaches are never replayed, catching up is done with a state request.
#[derive(Debug, Clone)]
pub struct SyncBus {
    broadcast_tx: broadcast::Sender<String>,
}

impl SyncBus {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);

        SyncBus { broadcast_tx }
    }

    /// Attach a new context to the bus. Each handle gets a fresh context id
    /// and never observes its own publishes.
    pub fn attach(&self) -> BusHandle {
        BusHandle {
            context_id: nanoid!(),
            broadcast_tx: self.broadcast_tx.clone(),
        }
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new()
    }
}

/// [BusHandle] is one context's connection to the bus, handed out by
/// [SyncBus::attach].
#[derive(Debug, Clone)]
pub struct BusHandle {
    context_id: String,
    broadcast_tx: broadcast::Sender<String>,
}

impl BusHandle {
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Broadcast a message to every other attached context. Having no
    /// listeners is not an error, the publish is simply dropped.
    pub fn publish(&self, message: SyncMessage) -> anyhow::Result<()> {
        let wire = serde_json::to_string(&Envelope {
            sender: self.context_id.clone(),
            message,
        })?;

        let _ = self.broadcast_tx.send(wire);

        Ok(())
    }

    /// Subscribe to the raw wire traffic, own publishes included. Callers
    /// are expected to filter by sender, see [BusHandle::accept].
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.broadcast_tx.subscribe()
    }

    /// Parse an inbound wire string, returning the message unless it was
    /// published by this very handle or cannot be understood. Malformed
    /// traffic is ignored, not an error.
    pub fn accept(&self, wire: &str) -> Option<SyncMessage> {
        match serde_json::from_str::<Envelope>(wire) {
            Ok(envelope) if envelope.sender == self.context_id => None,
            Ok(envelope) => Some(envelope.message),
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed sync message");

                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use comms::message::{RequestStateMessage, RoomUpdateMessage};
    use comms::room::Room;

    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_other_handles_but_not_sender() {
        let bus = SyncBus::new();
        let sender = bus.attach();
        let receiver = bus.attach();
        let mut receiver_rx = receiver.subscribe();
        let mut sender_rx = sender.subscribe();

        sender
            .publish(SyncMessage::RequestState(RequestStateMessage))
            .unwrap();

        let wire = receiver_rx.recv().await.unwrap();
        assert_eq!(
            receiver.accept(&wire),
            Some(SyncMessage::RequestState(RequestStateMessage))
        );

        // the sender sees its own traffic on the wire but accepts none of it
        let wire = sender_rx.recv().await.unwrap();
        assert_eq!(sender.accept(&wire), None);
    }

    #[tokio::test]
    async fn test_publish_without_listeners_is_not_an_error() {
        let bus = SyncBus::new();
        let handle = bus.attach();

        let result = handle.publish(SyncMessage::RoomUpdate(RoomUpdateMessage {
            room: Room::new("AB12CD", "bob"),
        }));

        assert!(result.is_ok());
    }

    #[test]
    fn test_malformed_wire_traffic_is_ignored() {
        let bus = SyncBus::new();
        let handle = bus.attach();

        assert_eq!(handle.accept("not even json"), None);
        assert_eq!(handle.accept(r#"{"c":"peer","m":{"_mt":"room_closed"}}"#), None);
    }

    #[test]
    fn test_handles_get_distinct_context_ids() {
        let bus = SyncBus::new();

        assert_ne!(bus.attach().context_id(), bus.attach().context_id());
    }
}
