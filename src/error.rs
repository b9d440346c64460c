//! Engine error types.

use crate::model::RoomKey;

/// Errors surfaced to callers of the chat engine.
///
/// Decode failures are not represented here: a malformed frame is absorbed
/// by the listener (dropped and logged) and never reaches a caller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Socket bind/send/receive failure.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// No broadcast candidate was found on any interface and no override is set.
    #[error("no broadcast address available")]
    BroadcastUnavailable,

    /// Display name rejected locally (empty after trim, or 30+ characters).
    #[error("invalid display name {0:?}")]
    InvalidName(String),

    /// No room is registered under the given key.
    #[error("no room for key {0}")]
    RoomNotFound(RoomKey),

    /// The room table no longer satisfies its one-room-per-key invariant.
    #[error("room table inconsistency: {0}")]
    Inconsistency(String),

    /// Operation requires a running listener.
    #[error("not connected")]
    NotConnected,
}
