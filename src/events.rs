//! Notifications from the engine to the presentation layer.

use std::net::IpAddr;

use crate::model::{Message, RoomKey};

/// Events emitted by the engine, delivered in the order the corresponding
/// transitions were applied.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A room was created and can be displayed.
    RoomOpened { key: RoomKey, name: String },
    /// A private room took the new display name of its remote node.
    RoomRenamed { key: RoomKey, name: String },
    /// A node was added to a room's participant set.
    NodeEntered {
        room: RoomKey,
        addr: IpAddr,
        name: String,
    },
    /// A known node announced a different name.
    NodeRenamed {
        addr: IpAddr,
        old_name: String,
        name: String,
    },
    /// A node announced its departure.
    NodeLeft {
        addr: IpAddr,
        name: String,
        farewell: String,
    },
    /// A message was appended to a room.
    MessageReceived { room: RoomKey, message: Message },
    /// The receive loop stopped on an I/O error.
    ListenerFailed { reason: String },
}
