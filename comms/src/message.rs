use serde::{Deserialize, Serialize};

use crate::room::Room;

/// A newly attached context asks its peers for the full room table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestStateMessage;

/// Full room table, broadcast in response to a state request so a late
/// joiner can bootstrap. Receivers replace their table wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncAllMessage {
    /// The full room code to room snapshot table
    #[serde(rename = "rs")]
    pub rooms: Vec<(String, Room)>,
}

/// A single room snapshot which unconditionally overwrites the receiver's
/// copy of that room. Last write wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomUpdateMessage {
    /// The room snapshot
    #[serde(rename = "r")]
    pub room: Room,
}

/// A sync message which can be broadcast by any browsing context to all
/// other contexts attached to the same bus. Messages are transient and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_mt", rename_all = "snake_case")]
pub enum SyncMessage {
    RequestState(RequestStateMessage),
    SyncAll(SyncAllMessage),
    RoomUpdate(RoomUpdateMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    // given a message enum, and an expected string, asserts that the message is serialized / deserialized appropiately
    fn assert_message_serialization(message: &SyncMessage, expected: &str) {
        let serialized = serde_json::to_string(&message).unwrap();
        assert_eq!(serialized, expected);
        let deserialized: SyncMessage = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, *message);
    }

    #[test]
    fn test_request_state_message() {
        let message = SyncMessage::RequestState(RequestStateMessage);

        assert_message_serialization(&message, r#"{"_mt":"request_state"}"#);
    }

    #[test]
    fn test_sync_all_message() {
        let message = SyncMessage::SyncAll(SyncAllMessage {
            rooms: vec![("AB12CD".to_string(), Room::new("AB12CD", "bob"))],
        });

        assert_message_serialization(
            &message,
            r#"{"_mt":"sync_all","rs":[["AB12CD",{"i":"AB12CD","h":"bob","p":[{"u":"bob","s":0,"t":0,"rd":false}],"g":false}]]}"#,
        );
    }

    #[test]
    fn test_room_update_message() {
        let message = SyncMessage::RoomUpdate(RoomUpdateMessage {
            room: Room::new("AB12CD", "bob"),
        });

        assert_message_serialization(
            &message,
            r#"{"_mt":"room_update","r":{"i":"AB12CD","h":"bob","p":[{"u":"bob","s":0,"t":0,"rd":false}],"g":false}}"#,
        );
    }

    #[test]
    fn test_unknown_message_kind_fails_to_parse() {
        let result = serde_json::from_str::<SyncMessage>(r#"{"_mt":"room_closed"}"#);

        assert!(result.is_err());
    }
}
