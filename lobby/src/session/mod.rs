use std::sync::Arc;
use std::time::Duration;

use comms::message::{RequestStateMessage, RoomUpdateMessage, SyncMessage};
use comms::room::{Player, Room};
use nanoid::nanoid;
use tokio::sync::{watch, Mutex};
use tokio::task::AbortHandle;

use crate::room_store::RoomStore;
use crate::sync_bus::{BusHandle, SyncBus};

use self::reconciler::Reconciler;
use self::score_debounce::{ScoreDebounce, DEFAULT_DEBOUNCE_WINDOW};

mod reconciler;
mod score_debounce;

const ROOM_ID_LENGTH: usize = 6;
const ROOM_ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
    'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Generate a human shareable room code, e.g. "X4K9QZ". The code space of
/// 36^6 ids is treated as collision free in practice; the session still
/// checks its own store before handing a code out.
pub fn generate_room_id() -> String {
    nanoid!(ROOM_ID_LENGTH, &ROOM_ID_ALPHABET)
}

/// State shared between a session's operation surface and its reconciler
/// task. Guarded by a single mutex since every access happens on behalf of
/// one browsing context.
pub(crate) struct SessionState {
    pub(crate) room_store: RoomStore,
    pub(crate) current_room_id: Option<String>,
}

impl SessionState {
    fn new() -> Self {
        SessionState {
            room_store: RoomStore::new(),
            current_room_id: None,
        }
    }

    pub(crate) fn current_room(&self) -> Option<&Room> {
        self.current_room_id
            .as_deref()
            .and_then(|id| self.room_store.get(id))
    }

    /// Re-derive the projection from the store and notify watchers when it
    /// actually changed.
    pub(crate) fn sync_projection(&self, projection_tx: &watch::Sender<Option<Room>>) {
        let room = self.current_room().cloned();

        projection_tx.send_if_modified(|current| {
            if *current == room {
                false
            } else {
                *current = room;
                true
            }
        });
    }
}

/// [GameSession] is the operation surface one browsing context uses to
/// create and join rooms, toggle readiness, start the game and report
/// scores.
///
/// Every mutating operation writes the local [RoomStore], refreshes the
/// current room projection and broadcasts a room update to the other
/// contexts on the bus. Operations without an active room are silent
/// no-ops; callers gate on [GameSession::current_room] themselves.
pub struct GameSession {
    state: Arc<Mutex<SessionState>>,
    bus: Option<BusHandle>,
    projection_tx: Arc<watch::Sender<Option<Room>>>,
    debounce: Mutex<ScoreDebounce>,
    reconciler_abort: Option<AbortHandle>,
}

impl GameSession {
    /// Attach a new session to a bus. Spawns the reconciler task and asks
    /// the other contexts for their room tables so this one can bootstrap.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(bus: &SyncBus) -> Self {
        let handle = bus.attach();
        let state = Arc::new(Mutex::new(SessionState::new()));
        let projection_tx = Arc::new(watch::channel(None).0);

        let reconciler = Reconciler::new(state.clone(), projection_tx.clone(), handle.clone());
        let broadcast_rx = handle.subscribe();
        let reconciler_task = tokio::spawn(reconciler.run(broadcast_rx));

        if let Err(err) = handle.publish(SyncMessage::RequestState(RequestStateMessage)) {
            tracing::warn!(%err, "state request not published, starting from an empty table");
        }

        GameSession {
            state,
            bus: Some(handle),
            projection_tx,
            debounce: Mutex::new(ScoreDebounce::new(DEFAULT_DEBOUNCE_WINDOW)),
            reconciler_abort: Some(reconciler_task.abort_handle()),
        }
    }

    /// Fallback for when the bus could not be brought up: every operation
    /// keeps working against the local store, nothing is visible to other
    /// tabs and nothing arrives from them.
    pub fn detached() -> Self {
        tracing::warn!("session running detached, no cross-context sync");

        GameSession {
            state: Arc::new(Mutex::new(SessionState::new())),
            bus: None,
            projection_tx: Arc::new(watch::channel(None).0),
            debounce: Mutex::new(ScoreDebounce::new(DEFAULT_DEBOUNCE_WINDOW)),
            reconciler_abort: None,
        }
    }

    /// Override the score debounce window, mainly useful to keep tests fast.
    pub fn debounce_window(mut self, window: Duration) -> Self {
        self.debounce.get_mut().set_window(window);

        self
    }

    /// Create a room with the caller as host and sole player, returns the
    /// room code to share with the other players.
    pub async fn create_room(&self, username: &str) -> String {
        let mut state = self.state.lock().await;

        let mut room_id = generate_room_id();
        while state.room_store.get(&room_id).is_some() {
            room_id = generate_room_id();
        }

        let room = Room::new(&room_id, username);
        state.room_store.set(&room_id, room.clone());
        state.current_room_id = Some(room_id.clone());
        state.sync_projection(&self.projection_tx);
        drop(state);

        self.publish_room_update(room);

        room_id
    }

    /// Join a room by its code. An unknown code creates the room on the
    /// spot with the joiner as host, so a fresh tab can join before the
    /// sync from the real host's context catches up and overwrites the
    /// stand-in. Joining twice with the same username is idempotent and
    /// broadcasts nothing.
    ///
    /// Codes are matched verbatim; case folding user input to uppercase is
    /// the caller's responsibility.
    pub async fn join_room(&self, room_id: &str, username: &str) {
        let mut state = self.state.lock().await;

        let (room, changed) = match state.room_store.get(room_id) {
            None => (Room::new(room_id, username), true),
            Some(existing) => {
                let mut room = existing.clone();
                let changed = room.add_player(username);

                (room, changed)
            }
        };

        state.room_store.set(room_id, room.clone());
        state.current_room_id = Some(String::from(room_id));
        state.sync_projection(&self.projection_tx);
        drop(state);

        if changed {
            self.publish_room_update(room);
        }
    }

    /// Mark a player in the active room as ready. No-op without an active
    /// room, a matching player, or when the player is already ready.
    pub async fn set_player_ready(&self, username: &str) {
        self.mutate_current_room(|room| room.set_player_ready(username))
            .await;
    }

    /// Start the game in the active room. Readiness of the players is not
    /// enforced, the host may start at any time. No-op without an active
    /// room.
    pub async fn start_game(&self) {
        self.mutate_current_room(|room| room.start()).await;
    }

    /// Report a player's score and attempt count.
    ///
    /// Writes are debounced per username: a new call always cancels and
    /// replaces the pending write for that player, so only the most
    /// recently reported values reach the store once the quiet window
    /// elapses. Values identical to what is stored by the time the write
    /// fires cause no state churn and no broadcast, and values with
    /// `score > total` are discarded. Pending writes are dropped when the
    /// session is torn down.
    pub async fn update_score(&self, username: &str, score: u32, total: u32) {
        if self.state.lock().await.current_room().is_none() {
            return;
        }

        if score > total {
            tracing::warn!(username, score, total, "discarding score exceeding total");
            // the discarded report still supersedes whatever was pending
            self.debounce.lock().await.cancel(username);

            return;
        }

        let state = self.state.clone();
        let bus = self.bus.clone();
        let projection_tx = self.projection_tx.clone();
        let username_owned = String::from(username);

        self.debounce.lock().await.schedule(username, async move {
            let mut state = state.lock().await;

            let Some(room_id) = state.current_room_id.clone() else {
                return;
            };
            let Some(mut room) = state.room_store.get(&room_id).cloned() else {
                return;
            };

            // equality is checked at fire time: if the store already holds
            // these values there is nothing to write or broadcast
            if !room.upsert_score(&username_owned, score, total) {
                return;
            }

            state.room_store.set(&room_id, room.clone());
            state.sync_projection(&projection_tx);
            drop(state);

            if let Some(bus) = bus {
                if let Err(err) =
                    bus.publish(SyncMessage::RoomUpdate(RoomUpdateMessage { room }))
                {
                    tracing::warn!(%err, "room update not published");
                }
            }
        });
    }

    /// Snapshot of the active room, if any.
    pub async fn current_room(&self) -> Option<Room> {
        self.state.lock().await.current_room().cloned()
    }

    /// Players of the active room in join order, empty without one.
    pub async fn players(&self) -> Vec<Player> {
        self.current_room()
            .await
            .map(|room| room.players)
            .unwrap_or_default()
    }

    /// Watch the current room projection; yields whenever it changes,
    /// including when a full sync ends the active room.
    pub fn subscribe_room(&self) -> watch::Receiver<Option<Room>> {
        self.projection_tx.subscribe()
    }

    async fn mutate_current_room(&self, mutate: impl FnOnce(&mut Room) -> bool) {
        let mut state = self.state.lock().await;

        let Some(room_id) = state.current_room_id.clone() else {
            return;
        };
        let Some(mut room) = state.room_store.get(&room_id).cloned() else {
            return;
        };

        if !mutate(&mut room) {
            return;
        }

        state.room_store.set(&room_id, room.clone());
        state.sync_projection(&self.projection_tx);
        drop(state);

        self.publish_room_update(room);
    }

    fn publish_room_update(&self, room: Room) {
        let Some(bus) = &self.bus else {
            return;
        };

        if let Err(err) = bus.publish(SyncMessage::RoomUpdate(RoomUpdateMessage { room })) {
            tracing::warn!(%err, "room update not published");
        }
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        if let Some(reconciler_abort) = self.reconciler_abort.take() {
            reconciler_abort.abort();
        }
    }
}
