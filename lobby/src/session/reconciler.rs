use std::sync::Arc;

use comms::message::{SyncAllMessage, SyncMessage};
use comms::room::Room;
use tokio::sync::{broadcast, watch, Mutex};

use crate::sync_bus::BusHandle;

use super::SessionState;

/// [Reconciler] applies inbound sync messages against one session's state
/// and answers state requests from late joining contexts.
///
/// Conflict resolution is last write wins: a room update overwrites the
/// local copy of that room, a full sync replaces the whole table. No
/// version numbers exist, so concurrent writers to the same room resolve
/// to whichever update a given receiver applies last.
pub(super) struct Reconciler {
    state: Arc<Mutex<SessionState>>,
    projection_tx: Arc<watch::Sender<Option<Room>>>,
    bus: BusHandle,
}

impl Reconciler {
    pub(super) fn new(
        state: Arc<Mutex<SessionState>>,
        projection_tx: Arc<watch::Sender<Option<Room>>>,
        bus: BusHandle,
    ) -> Self {
        Reconciler {
            state,
            projection_tx,
            bus,
        }
    }

    /// Drain the bus subscription until the bus goes away. Own publishes
    /// and malformed traffic are filtered out by [BusHandle::accept].
    pub(super) async fn run(self, mut broadcast_rx: broadcast::Receiver<String>) {
        loop {
            match broadcast_rx.recv().await {
                Ok(wire) => {
                    if let Some(message) = self.bus.accept(&wire) {
                        self.apply(message).await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "sync bus receiver lagged, messages were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn apply(&self, message: SyncMessage) {
        let mut state = self.state.lock().await;

        match message {
            SyncMessage::RequestState(_) => {
                // only contexts that actually hold rooms answer, so a bus
                // full of empty tabs stays quiet
                if !state.room_store.is_empty() {
                    let reply = SyncMessage::SyncAll(SyncAllMessage {
                        rooms: state.room_store.snapshot(),
                    });

                    if let Err(err) = self.bus.publish(reply) {
                        tracing::warn!(%err, "state request went unanswered");
                    }
                }
            }
            SyncMessage::SyncAll(message) => {
                tracing::debug!(rooms = message.rooms.len(), "replacing room table from full sync");
                state.room_store.replace(message.rooms);
                // the active room may be missing from the new table, in
                // which case the projection becomes none and the
                // presentation layer treats the room as ended
                state.sync_projection(&self.projection_tx);
            }
            SyncMessage::RoomUpdate(message) => {
                let room_id = message.room.id.clone();

                tracing::debug!(%room_id, "applying room update");
                state.room_store.set(&room_id, message.room);
                state.sync_projection(&self.projection_tx);
            }
        }
    }
}
