/// Shared data model for rooms and their players
pub mod room;
/// Set of sync messages exchanged between browsing contexts to agree on room state
pub mod message;
