/// Per-context table of rooms, the single source of truth for one browsing context
pub mod room_store;
/// Local broadcast channel standing in for a network channel between browsing contexts
pub mod sync_bus;
/// The session controller and reconciler which keep contexts in agreement
pub mod session;
/// Random guest name generation for players who never picked a username
pub mod guest_name;
