//! Rooms and the table that owns them.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::IpAddr;

use crate::error::ChatError;
use crate::model::Message;

/// Identity of a room: the shared public room, or the private room paired
/// with one remote node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Public,
    Private(IpAddr),
}

impl RoomKey {
    pub fn is_public(&self) -> bool {
        matches!(self, RoomKey::Public)
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::Public => write!(f, "public"),
            RoomKey::Private(addr) => write!(f, "private:{addr}"),
        }
    }
}

/// A conversation scope. Participants are kept ordered by address so
/// iteration is deterministic; messages are ordered by timestamp with
/// insertion order breaking ties.
#[derive(Debug, Clone)]
pub struct Room {
    key: RoomKey,
    name: String,
    participants: BTreeSet<IpAddr>,
    messages: Vec<Message>,
}

impl Room {
    fn new(key: RoomKey, name: &str) -> Self {
        Self {
            key,
            name: name.to_string(),
            participants: BTreeSet::new(),
            messages: Vec::new(),
        }
    }

    pub fn key(&self) -> RoomKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the room; empty names are ignored.
    pub fn set_name(&mut self, name: &str) {
        if !name.trim().is_empty() {
            self.name = name.to_string();
        }
    }

    pub fn is_public(&self) -> bool {
        self.key.is_public()
    }

    /// Returns whether the address was newly added.
    pub fn add_participant(&mut self, addr: IpAddr) -> bool {
        self.participants.insert(addr)
    }

    pub fn remove_participant(&mut self, addr: IpAddr) -> bool {
        self.participants.remove(&addr)
    }

    pub fn has_participant(&self, addr: IpAddr) -> bool {
        self.participants.contains(&addr)
    }

    pub fn participants(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.participants.iter().copied()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Appends keeping timestamp order; equal timestamps keep arrival order.
    pub fn push_message(&mut self, message: Message) {
        let at = self
            .messages
            .partition_point(|m| m.timestamp() <= message.timestamp());
        self.messages.insert(at, message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

/// Owner of every room, enforcing one room per key.
///
/// The key is stored inside the room itself, so both directions of the
/// node-to-room association live and die together; `remove` cross-checks
/// them and reports a mismatch instead of ignoring it.
#[derive(Debug, Default)]
pub struct RoomTable {
    rooms: HashMap<RoomKey, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room under `key`, or returns `None` if one already exists.
    pub fn create(&mut self, key: RoomKey, name: &str) -> Option<&mut Room> {
        match self.rooms.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => None,
            std::collections::hash_map::Entry::Vacant(slot) => {
                Some(slot.insert(Room::new(key, name)))
            }
        }
    }

    /// Removes the room under `key` along with its reverse association.
    pub fn remove(&mut self, key: RoomKey) -> Result<Room, ChatError> {
        match self.rooms.remove(&key) {
            None => Err(ChatError::RoomNotFound(key)),
            Some(room) if room.key() != key => Err(ChatError::Inconsistency(format!(
                "room stored under {key} identifies as {}",
                room.key()
            ))),
            Some(room) => Ok(room),
        }
    }

    pub fn get(&self, key: RoomKey) -> Option<&Room> {
        self.rooms.get(&key)
    }

    pub fn get_mut(&mut self, key: RoomKey) -> Option<&mut Room> {
        self.rooms.get_mut(&key)
    }

    pub fn contains(&self, key: RoomKey) -> bool {
        self.rooms.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }
}
