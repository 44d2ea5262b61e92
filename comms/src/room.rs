use serde::{Deserialize, Serialize};

/// A participant of a room, identified by a username unique within that room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// The username of the player
    #[serde(rename = "u")]
    pub username: String,
    /// Number of questions answered correctly
    #[serde(rename = "s")]
    pub score: u32,
    /// Number of questions attempted, always >= score
    #[serde(rename = "t")]
    pub total: u32,
    /// Whether the player has marked themselves ready in the lobby
    #[serde(rename = "rd")]
    pub is_ready: bool,
}

impl Player {
    pub fn new(username: &str) -> Self {
        Player {
            username: String::from(username),
            score: 0,
            total: 0,
            is_ready: false,
        }
    }
}

/// A shared game session identified by a short human-shareable code.
///
/// Players are kept in join order. The host is the player that created the
/// room and is always present in the player list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// The room code, 6 uppercase alphanumeric characters
    #[serde(rename = "i")]
    pub id: String,
    /// The username of the creator
    #[serde(rename = "h")]
    pub host: String,
    /// Players in join order
    #[serde(rename = "p")]
    pub players: Vec<Player>,
    /// Whether the host has started the game
    #[serde(rename = "g")]
    pub is_game_started: bool,
}

impl Room {
    pub fn new(id: &str, host: &str) -> Self {
        Room {
            id: String::from(id),
            host: String::from(host),
            players: vec![Player::new(host)],
            is_game_started: false,
        }
    }

    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.username == username)
    }

    /// Add a player with default score and readiness, returns true if the
    /// player was new. Joining twice with the same username does nothing.
    pub fn add_player(&mut self, username: &str) -> bool {
        if self.player(username).is_some() {
            return false;
        }

        self.players.push(Player::new(username));

        true
    }

    /// Mark a player as ready, returns true if this changed their state.
    pub fn set_player_ready(&mut self, username: &str) -> bool {
        match self.players.iter_mut().find(|p| p.username == username) {
            Some(player) if !player.is_ready => {
                player.is_ready = true;

                true
            }
            _ => false,
        }
    }

    /// Mark the game as started, returns true if it was not started before.
    /// There is no readiness precondition, the host may start at any time.
    pub fn start(&mut self) -> bool {
        if self.is_game_started {
            return false;
        }

        self.is_game_started = true;

        true
    }

    /// Record a player's score and attempt count, appending the player if
    /// they are unknown. Returns true if the stored state changed.
    ///
    /// A pair with `score > total` is rejected as a no-op, as is a pair
    /// identical to what is already stored.
    pub fn upsert_score(&mut self, username: &str, score: u32, total: u32) -> bool {
        if score > total {
            return false;
        }

        match self.players.iter_mut().find(|p| p.username == username) {
            Some(player) => {
                if player.score == score && player.total == total {
                    return false;
                }

                player.score = score;
                player.total = total;
            }
            None => {
                let mut player = Player::new(username);
                player.score = score;
                player.total = total;

                self.players.push(player);
            }
        }

        true
    }
}
