use std::collections::HashMap;

use comms::room::Room;

/// [RoomStore] maps room codes to room snapshots for a single browsing
/// context. Each context owns its own store; stores are kept in agreement
/// by message passing, never by shared memory.
///
/// Writes are visible to subsequent reads immediately but are NOT broadcast
/// by the store itself, publishing is the session controller's job.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<String, Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        RoomStore {
            rooms: HashMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn set(&mut self, id: &str, room: Room) {
        self.rooms.insert(String::from(id), room);
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Full copy of the table, used as the payload of a sync-all broadcast.
    pub fn snapshot(&self) -> Vec<(String, Room)> {
        self.rooms
            .iter()
            .map(|(id, room)| (id.clone(), room.clone()))
            .collect()
    }

    /// Replace the whole table with an inbound sync-all payload. The last
    /// full sync wins, concurrent edits to rooms absent from the payload
    /// are discarded.
    pub fn replace(&mut self, rooms: Vec<(String, Room)>) {
        self.rooms = rooms.into_iter().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_is_visible_to_get() {
        let mut store = RoomStore::new();
        assert!(store.is_empty());
        assert!(store.get("AB12CD").is_none());

        store.set("AB12CD", Room::new("AB12CD", "bob"));

        assert!(!store.is_empty());
        assert_eq!(store.get("AB12CD").unwrap().host, "bob");
    }

    #[test]
    fn test_set_overwrites_existing_room() {
        let mut store = RoomStore::new();
        store.set("AB12CD", Room::new("AB12CD", "bob"));

        let mut updated = Room::new("AB12CD", "bob");
        updated.add_player("cara");
        store.set("AB12CD", updated);

        assert_eq!(store.get("AB12CD").unwrap().players.len(), 2);
    }

    #[test]
    fn test_replace_discards_rooms_missing_from_payload() {
        let mut store = RoomStore::new();
        store.set("AB12CD", Room::new("AB12CD", "bob"));
        store.set("ZZ99ZZ", Room::new("ZZ99ZZ", "dana"));

        store.replace(vec![("AB12CD".to_string(), Room::new("AB12CD", "bob"))]);

        assert!(store.get("AB12CD").is_some());
        assert!(store.get("ZZ99ZZ").is_none());
    }

    #[test]
    fn test_snapshot_round_trips_through_replace() {
        let mut store = RoomStore::new();
        store.set("AB12CD", Room::new("AB12CD", "bob"));

        let mut other = RoomStore::new();
        other.replace(store.snapshot());

        assert_eq!(other.get("AB12CD"), store.get("AB12CD"));
    }
}
