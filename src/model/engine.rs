//! Membership and routing: protocol events become state transitions over
//! the node and room tables, user intent becomes outgoing frames.
//!
//! One node exists per remote address. One public room is opened at
//! construction; private rooms appear lazily on the first directed send or
//! receive. Every transition that changes visible state emits an
//! [`EngineEvent`] before returning, so notification order equals the
//! order transitions were applied.

use std::collections::HashMap;
use std::net::IpAddr;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::ChatError;
use crate::events::EngineEvent;
use crate::model::node::is_valid_name;
use crate::model::{Message, Node, Room, RoomKey, RoomTable, StyleAllocator};
use crate::network::Wire;
use crate::protocol::{BroadcastSelector, Codec, Command};

pub struct Engine {
    self_node: Node,
    nodes: HashMap<IpAddr, Node>,
    rooms: RoomTable,
    codec: Codec,
    wire: Box<dyn Wire>,
    selector: BroadcastSelector,
    events: UnboundedSender<EngineEvent>,
    styles: Box<dyn StyleAllocator>,
}

impl Engine {
    pub fn new(
        local: IpAddr,
        name: Option<&str>,
        wire: Box<dyn Wire>,
        selector: BroadcastSelector,
        events: UnboundedSender<EngineEvent>,
        styles: Box<dyn StyleAllocator>,
    ) -> Self {
        let mut engine = Self {
            self_node: Node::new(local, name.unwrap_or("")),
            nodes: HashMap::new(),
            rooms: RoomTable::new(),
            codec: Codec::new(),
            wire,
            selector,
            events,
            styles,
        };
        engine.open_public_room();
        engine
    }

    /// This process's signing token, shared with the listener for
    /// loopback suppression.
    pub fn token(&self) -> &str {
        self.codec.token()
    }

    pub fn self_addr(&self) -> IpAddr {
        self.self_node.addr()
    }

    pub fn is_self(&self, addr: IpAddr) -> bool {
        addr == self.self_node.addr()
    }

    // --- Incoming protocol events ------------------------------------

    /// Applies one decoded command from `from`. Frames carrying our own
    /// address are ignored (they show up on some broadcast setups).
    pub fn apply(&mut self, command: Command, from: IpAddr) {
        if self.is_self(from) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(&from) {
            node.touch();
        }
        match command {
            Command::Join { name } => self.node_joined(from, &name),
            Command::Hello { name } => self.node_said_hello(from, &name),
            Command::Leave { farewell } => self.node_left(from, &farewell),
            Command::Msg {
                content,
                public,
                auto_delete,
            } => self.message_received(from, &content, public, auto_delete),
        }
    }

    /// JOIN: locate-or-create the node, then always answer with HELLO so
    /// the joiner learns our identity even if we already knew them.
    fn node_joined(&mut self, from: IpAddr, name: &str) {
        self.ensure_node(from, name);
        self.reply_hello(from);
    }

    /// HELLO: like JOIN but never answered. A changed name on a known
    /// node is a rename; an unknown sender is a late first contact.
    fn node_said_hello(&mut self, from: IpAddr, name: &str) {
        let Some(node) = self.nodes.get_mut(&from) else {
            self.ensure_node(from, name);
            return;
        };

        let old_name = node.display_name();
        let renamed = node.name() != name && node.set_name(name);
        let new_name = node.display_name();

        if renamed {
            let key = RoomKey::Private(from);
            if let Some(room) = self.rooms.get_mut(key) {
                room.set_name(&new_name);
                let room_name = room.name().to_string();
                self.emit(EngineEvent::RoomRenamed {
                    key,
                    name: room_name,
                });
            }
            self.emit(EngineEvent::NodeRenamed {
                addr: from,
                old_name,
                name: new_name.clone(),
            });
        }

        if self.add_to_public_room(from) {
            self.emit(EngineEvent::NodeEntered {
                room: RoomKey::Public,
                addr: from,
                name: new_name,
            });
        }
    }

    /// LEAVE: drop the node from the directory and the public room.
    /// Unknown senders are ignored.
    fn node_left(&mut self, from: IpAddr, farewell: &str) {
        let Some(mut node) = self.nodes.remove(&from) else {
            return;
        };
        if let Some(token) = node.leave() {
            self.styles.release(token);
        }
        if let Some(room) = self.rooms.get_mut(RoomKey::Public) {
            room.remove_participant(from);
        }
        self.emit(EngineEvent::NodeLeft {
            addr: from,
            name: node.display_name(),
            farewell: farewell.to_string(),
        });
    }

    /// MSG: an unknown sender counts as an implicit JOIN first; a node
    /// can be heard without a handshake. Whitespace-only content is a
    /// deliberate no-op either way.
    fn message_received(&mut self, from: IpAddr, content: &str, public: bool, _auto_delete: i64) {
        if !self.nodes.contains_key(&from) {
            self.node_joined(from, "");
        }
        if content.trim().is_empty() {
            return;
        }

        let key = if public {
            RoomKey::Public
        } else {
            RoomKey::Private(from)
        };
        if !self.rooms.contains(key) {
            match key {
                RoomKey::Public => {
                    self.open_public_room();
                    if let Err(err) = self.announce_join() {
                        log::warn!("Re-announce after reopening public room failed: {err}");
                    }
                }
                RoomKey::Private(_) => {
                    self.open_private_room(from);
                }
            }
        }

        let message = Message::now(content, Some(from));
        let appended = match self.rooms.get_mut(key) {
            Some(room) => {
                room.add_participant(from);
                room.push_message(message.clone());
                true
            }
            None => false,
        };
        if appended {
            self.emit(EngineEvent::MessageReceived { room: key, message });
        }
    }

    // --- Outgoing user intent ----------------------------------------

    /// Broadcasts our JOIN announcement to the selected broadcast address.
    pub fn announce_join(&mut self) -> Result<(), ChatError> {
        if self.self_node.is_joined() {
            self.self_node.touch();
        } else {
            let token = self.styles.acquire();
            self.self_node.join(token);
        }
        let target = self.selector.best().ok_or(ChatError::BroadcastUnavailable)?;
        let frame = self.codec.encode(&Command::Join {
            name: self.self_node.display_name(),
        });
        self.wire.send(&frame, target)?;
        Ok(())
    }

    /// Broadcasts our departure.
    pub fn announce_leave(&mut self, farewell: &str) -> Result<(), ChatError> {
        if let Some(token) = self.self_node.leave() {
            self.styles.release(token);
        }
        let target = self.selector.best().ok_or(ChatError::BroadcastUnavailable)?;
        let frame = self.codec.encode(&Command::Leave {
            farewell: farewell.to_string(),
        });
        self.wire.send(&frame, target)?;
        Ok(())
    }

    /// Sends `text` to a room: one broadcast frame for the public room,
    /// one unicast frame per remote participant for a private room. The
    /// message is recorded locally only after the transport accepted it.
    pub fn send_text(&mut self, key: RoomKey, text: &str) -> Result<Message, ChatError> {
        if !self.rooms.contains(key) {
            match key {
                RoomKey::Public => self.open_public_room(),
                RoomKey::Private(addr) => {
                    self.open_private_room(addr);
                }
            }
        }

        let frame = self.codec.encode(&Command::Msg {
            content: text.to_string(),
            public: key.is_public(),
            auto_delete: -1,
        });
        match key {
            RoomKey::Public => {
                let target = self.selector.best().ok_or(ChatError::BroadcastUnavailable)?;
                self.wire.send(&frame, target)?;
            }
            RoomKey::Private(_) => {
                let self_addr = self.self_node.addr();
                let recipients: Vec<IpAddr> = self
                    .rooms
                    .get(key)
                    .ok_or(ChatError::RoomNotFound(key))?
                    .participants()
                    .filter(|addr| *addr != self_addr)
                    .collect();
                for addr in recipients {
                    self.wire.send(&frame, addr)?;
                }
            }
        }

        let message = Message::now(text, Some(self.self_node.addr()));
        let room = self
            .rooms
            .get_mut(key)
            .ok_or(ChatError::RoomNotFound(key))?;
        room.push_message(message.clone());
        self.emit(EngineEvent::MessageReceived {
            room: key,
            message: message.clone(),
        });
        Ok(message)
    }

    /// Takes a new local name, then unicasts HELLO to every joined peer
    /// so nobody has to wait for our next announcement.
    pub fn rename_self(&mut self, name: &str) -> Result<(), ChatError> {
        if !is_valid_name(name) {
            return Err(ChatError::InvalidName(name.to_string()));
        }
        self.self_node.set_name(name);
        let frame = self.codec.encode(&Command::Hello {
            name: self.self_node.display_name(),
        });
        let peers: Vec<IpAddr> = self
            .nodes
            .values()
            .filter(|node| node.is_joined())
            .map(Node::addr)
            .collect();
        for addr in peers {
            if let Err(err) = self.wire.send(&frame, addr) {
                log::warn!("Failed to send HELLO to {addr}: {err}");
            }
        }
        Ok(())
    }

    /// Opens (or returns) the private room paired with `addr`. Asking for
    /// an existing room is a caller mistake, reported and tolerated.
    pub fn create_room(&mut self, addr: IpAddr) -> Result<Room, ChatError> {
        let key = RoomKey::Private(addr);
        if !self.open_private_room(addr) {
            log::warn!("Room for {addr} already exists; returning it unchanged");
        }
        self.rooms
            .get(key)
            .cloned()
            .ok_or(ChatError::RoomNotFound(key))
    }

    /// Removes a room and both directions of its node association.
    pub fn delete_room(&mut self, key: RoomKey) -> Result<(), ChatError> {
        self.rooms.remove(key)?;
        Ok(())
    }

    /// Forces the broadcast target and re-announces through it.
    pub fn set_broadcast_override(&mut self, addr: IpAddr) -> Result<(), ChatError> {
        self.selector.set_override(addr);
        self.announce_join()
    }

    /// Lets the listener surface a fatal receive-loop error as an event.
    pub fn listener_failed(&self, reason: &str) {
        self.emit(EngineEvent::ListenerFailed {
            reason: reason.to_string(),
        });
    }

    // --- Queries (defensive snapshots) -------------------------------

    pub fn rooms(&self) -> Vec<Room> {
        self.rooms.iter().cloned().collect()
    }

    pub fn room(&self, key: RoomKey) -> Option<Room> {
        self.rooms.get(key).cloned()
    }

    pub fn public_room(&self) -> Option<Room> {
        self.room(RoomKey::Public)
    }

    /// The private room paired with `addr`, if one is open.
    pub fn room_of(&self, addr: IpAddr) -> Option<Room> {
        self.room(RoomKey::Private(addr))
    }

    pub fn participants(&self, key: RoomKey) -> Result<Vec<Node>, ChatError> {
        let room = self.rooms.get(key).ok_or(ChatError::RoomNotFound(key))?;
        Ok(room
            .participants()
            .map(|addr| {
                if self.is_self(addr) {
                    self.self_node.clone()
                } else {
                    self.nodes
                        .get(&addr)
                        .cloned()
                        // departed nodes may remain seated in a private room
                        .unwrap_or_else(|| Node::new(addr, ""))
                }
            })
            .collect())
    }

    pub fn messages(&self, key: RoomKey) -> Result<Vec<Message>, ChatError> {
        let room = self.rooms.get(key).ok_or(ChatError::RoomNotFound(key))?;
        Ok(room.messages().to_vec())
    }

    pub fn self_node(&self) -> Node {
        self.self_node.clone()
    }

    pub fn node(&self, addr: IpAddr) -> Option<Node> {
        self.nodes.get(&addr).cloned()
    }

    pub fn broadcasts(&self) -> Vec<IpAddr> {
        self.selector.candidates().to_vec()
    }

    // --- Internals ----------------------------------------------------

    fn emit(&self, event: EngineEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Event receiver dropped; notification discarded");
        }
    }

    fn open_public_room(&mut self) {
        let self_addr = self.self_node.addr();
        let opened = self.rooms.create(RoomKey::Public, "Public").map(|room| {
            room.add_participant(self_addr);
            room.name().to_string()
        });
        if let Some(name) = opened {
            self.emit(EngineEvent::RoomOpened {
                key: RoomKey::Public,
                name,
            });
        }
    }

    /// Creates the private room paired with `addr`, seating the local and
    /// the remote node. Returns false when the room already existed.
    fn open_private_room(&mut self, addr: IpAddr) -> bool {
        let name = self
            .nodes
            .get(&addr)
            .map(Node::display_name)
            .unwrap_or_else(|| addr.to_string());
        let self_addr = self.self_node.addr();
        let opened = self.rooms.create(RoomKey::Private(addr), &name).map(|room| {
            room.add_participant(self_addr);
            room.add_participant(addr);
            room.name().to_string()
        });
        match opened {
            Some(name) => {
                self.emit(EngineEvent::RoomOpened {
                    key: RoomKey::Private(addr),
                    name,
                });
                true
            }
            None => false,
        }
    }

    /// Locate-or-create for JOIN/HELLO/MSG senders: a new node arrives
    /// joined and seated in the public room; a known node just takes the
    /// announced name (invalid names keep the old one).
    fn ensure_node(&mut self, from: IpAddr, name: &str) {
        if let Some(node) = self.nodes.get_mut(&from) {
            node.set_name(name);
            return;
        }
        let mut node = Node::new(from, name);
        node.join(self.styles.acquire());
        let display = node.display_name();
        self.nodes.insert(from, node);
        if self.add_to_public_room(from) {
            self.emit(EngineEvent::NodeEntered {
                room: RoomKey::Public,
                addr: from,
                name: display,
            });
        }
    }

    fn add_to_public_room(&mut self, addr: IpAddr) -> bool {
        self.rooms
            .get_mut(RoomKey::Public)
            .map(|room| room.add_participant(addr))
            .unwrap_or(false)
    }

    fn reply_hello(&mut self, to: IpAddr) {
        let frame = self.codec.encode(&Command::Hello {
            name: self.self_node.display_name(),
        });
        if let Err(err) = self.wire.send(&frame, to) {
            log::warn!("Failed to send HELLO to {to}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Palette;
    use crate::network::transport::testing::MemoryWire;
    use crate::protocol;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    const LOCAL: &str = "10.0.0.1";
    const REMOTE: &str = "10.0.0.2";
    const BCAST: &str = "10.0.0.255";

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn engine(local: &str, name: &str) -> (Engine, MemoryWire, UnboundedReceiver<EngineEvent>) {
        let wire = MemoryWire::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut selector = BroadcastSelector::new(addr(local));
        selector.set_override(addr(BCAST));
        let engine = Engine::new(
            addr(local),
            Some(name),
            Box::new(wire.clone()),
            selector,
            tx,
            Box::new(Palette::default()),
        );
        (engine, wire, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn public_room_opens_at_startup() {
        let (engine, _, mut rx) = engine(LOCAL, "A");
        let room = engine.public_room().unwrap();
        assert!(room.is_public());
        assert!(room.has_participant(addr(LOCAL)));
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [EngineEvent::RoomOpened {
                key: RoomKey::Public,
                ..
            }]
        ));
    }

    #[test]
    fn join_creates_one_node_and_replies_hello() {
        let (mut engine, wire, mut rx) = engine(LOCAL, "A");
        drain(&mut rx);

        engine.apply(
            Command::Join {
                name: "Alice".into(),
            },
            addr(REMOTE),
        );

        let room = engine.public_room().unwrap();
        assert!(room.has_participant(addr(REMOTE)));
        assert_eq!(engine.node(addr(REMOTE)).unwrap().name(), "Alice");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], EngineEvent::NodeEntered { .. }));

        let sent = wire.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, addr(REMOTE));
        let frame = protocol::decode(&sent[0].1).unwrap();
        assert_eq!(frame.command, Command::Hello { name: "A".into() });
    }

    #[test]
    fn repeated_join_is_idempotent_but_still_answered() {
        let (mut engine, wire, mut rx) = engine(LOCAL, "A");
        engine.apply(
            Command::Join {
                name: "Alice".into(),
            },
            addr(REMOTE),
        );
        drain(&mut rx);
        wire.take();

        engine.apply(
            Command::Join {
                name: "Alice".into(),
            },
            addr(REMOTE),
        );

        let room = engine.public_room().unwrap();
        assert_eq!(room.participant_count(), 2); // self + remote, no duplicate
        assert!(drain(&mut rx).is_empty());
        assert_eq!(wire.take().len(), 1); // HELLO goes out every time
    }

    #[test]
    fn hello_from_stranger_creates_node_without_reply() {
        let (mut engine, wire, mut rx) = engine(LOCAL, "A");
        drain(&mut rx);

        engine.apply(Command::Hello { name: "Bob".into() }, addr(REMOTE));

        assert!(engine.node(addr(REMOTE)).is_some());
        assert!(engine.public_room().unwrap().has_participant(addr(REMOTE)));
        assert!(wire.take().is_empty());
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [EngineEvent::NodeEntered { .. }]
        ));
    }

    #[test]
    fn hello_with_new_name_renames_node_and_private_room() {
        let (mut engine, _, mut rx) = engine(LOCAL, "A");
        engine.apply(Command::Hello { name: "Bob".into() }, addr(REMOTE));
        engine.create_room(addr(REMOTE)).unwrap();
        drain(&mut rx);

        engine.apply(
            Command::Hello {
                name: "Robert".into(),
            },
            addr(REMOTE),
        );

        assert_eq!(engine.node(addr(REMOTE)).unwrap().name(), "Robert");
        assert_eq!(engine.room_of(addr(REMOTE)).unwrap().name(), "Robert");
        let events = drain(&mut rx);
        assert!(matches!(events[0], EngineEvent::RoomRenamed { .. }));
        assert!(
            matches!(&events[1], EngineEvent::NodeRenamed { old_name, name, .. }
                if old_name == "Bob" && name == "Robert")
        );
    }

    #[test]
    fn hello_with_same_name_emits_nothing() {
        let (mut engine, _, mut rx) = engine(LOCAL, "A");
        engine.apply(Command::Hello { name: "Bob".into() }, addr(REMOTE));
        drain(&mut rx);

        engine.apply(Command::Hello { name: "Bob".into() }, addr(REMOTE));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn leave_clears_directory_and_public_room() {
        let (mut engine, _, mut rx) = engine(LOCAL, "A");
        engine.apply(
            Command::Join {
                name: "Alice".into(),
            },
            addr(REMOTE),
        );
        drain(&mut rx);

        engine.apply(
            Command::Leave {
                farewell: "bye".into(),
            },
            addr(REMOTE),
        );

        assert!(engine.node(addr(REMOTE)).is_none());
        assert!(!engine.public_room().unwrap().has_participant(addr(REMOTE)));
        let events = drain(&mut rx);
        assert!(
            matches!(&events[0], EngineEvent::NodeLeft { name, farewell, .. }
                if name == "Alice" && farewell == "bye")
        );
    }

    #[test]
    fn leave_from_stranger_is_ignored() {
        let (mut engine, _, mut rx) = engine(LOCAL, "A");
        drain(&mut rx);
        engine.apply(
            Command::Leave {
                farewell: "bye".into(),
            },
            addr(REMOTE),
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn message_after_leave_is_a_fresh_join() {
        let (mut engine, _, mut rx) = engine(LOCAL, "A");
        engine.apply(
            Command::Join {
                name: "Alice".into(),
            },
            addr(REMOTE),
        );
        engine.apply(
            Command::Leave {
                farewell: "bye".into(),
            },
            addr(REMOTE),
        );
        drain(&mut rx);

        engine.apply(
            Command::Msg {
                content: "back".into(),
                public: true,
                auto_delete: -1,
            },
            addr(REMOTE),
        );

        // re-created with an empty name, re-seated, message recorded
        let node = engine.node(addr(REMOTE)).unwrap();
        assert_eq!(node.name(), "");
        let events = drain(&mut rx);
        assert!(matches!(events[0], EngineEvent::NodeEntered { .. }));
        assert!(matches!(
            events[1],
            EngineEvent::MessageReceived {
                room: RoomKey::Public,
                ..
            }
        ));
    }

    #[test]
    fn whitespace_message_is_a_noop_after_implicit_join() {
        for public in [true, false] {
            let (mut engine, _, mut rx) = engine(LOCAL, "A");
            drain(&mut rx);

            engine.apply(
                Command::Msg {
                    content: "   ".into(),
                    public,
                    auto_delete: -1,
                },
                addr(REMOTE),
            );

            // the stranger still joined, but nothing was recorded
            assert!(engine.node(addr(REMOTE)).is_some());
            let events = drain(&mut rx);
            assert_eq!(events.len(), 1, "public={public}");
            assert!(matches!(events[0], EngineEvent::NodeEntered { .. }));
            assert!(engine.messages(RoomKey::Public).unwrap().is_empty());
        }
    }

    #[test]
    fn private_message_opens_a_private_room() {
        let (mut engine, _, mut rx) = engine(LOCAL, "A");
        drain(&mut rx);

        engine.apply(
            Command::Msg {
                content: "psst".into(),
                public: false,
                auto_delete: 30,
            },
            addr(REMOTE),
        );

        let room = engine.room_of(addr(REMOTE)).unwrap();
        assert!(room.has_participant(addr(LOCAL)));
        assert!(room.has_participant(addr(REMOTE)));
        assert_eq!(room.messages().len(), 1);
        assert_eq!(room.messages()[0].content(), "psst");

        let events = drain(&mut rx);
        assert!(matches!(events[0], EngineEvent::NodeEntered { .. }));
        assert!(matches!(events[1], EngineEvent::RoomOpened { .. }));
        assert!(matches!(events[2], EngineEvent::MessageReceived { .. }));
    }

    #[test]
    fn own_address_frames_are_ignored() {
        let (mut engine, wire, mut rx) = engine(LOCAL, "A");
        drain(&mut rx);
        engine.apply(
            Command::Join { name: "me".into() },
            addr(LOCAL),
        );
        assert!(drain(&mut rx).is_empty());
        assert!(wire.take().is_empty());
    }

    #[test]
    fn public_send_broadcasts_once_and_records_once() {
        let (mut engine, wire, mut rx) = engine(LOCAL, "A");
        engine.announce_join().unwrap();
        drain(&mut rx);
        wire.take();

        let message = engine.send_text(RoomKey::Public, "hello all").unwrap();
        assert_eq!(message.origin(), Some(addr(LOCAL)));

        let sent = wire.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, addr(BCAST));
        let frame = protocol::decode(&sent[0].1).unwrap();
        assert_eq!(
            frame.command,
            Command::Msg {
                content: "hello all".into(),
                public: true,
                auto_delete: -1,
            }
        );
        assert_eq!(engine.messages(RoomKey::Public).unwrap().len(), 1);
    }

    #[test]
    fn private_send_unicasts_to_the_one_remote_participant() {
        let (mut engine, wire, mut rx) = engine(LOCAL, "A");
        engine.apply(Command::Join { name: "Bob".into() }, addr(REMOTE));
        drain(&mut rx);
        wire.take();

        let key = RoomKey::Private(addr(REMOTE));
        engine.send_text(key, "psst").unwrap();

        let sent = wire.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, addr(REMOTE));
        let frame = protocol::decode(&sent[0].1).unwrap();
        assert!(matches!(
            frame.command,
            Command::Msg { public: false, .. }
        ));
        assert_eq!(engine.messages(key).unwrap().len(), 1);
    }

    #[test]
    fn create_room_twice_returns_existing_without_mutation() {
        let (mut engine, _, mut rx) = engine(LOCAL, "A");
        engine.apply(Command::Join { name: "Bob".into() }, addr(REMOTE));
        drain(&mut rx);

        let first = engine.create_room(addr(REMOTE)).unwrap();
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [EngineEvent::RoomOpened { .. }]
        ));

        let second = engine.create_room(addr(REMOTE)).unwrap();
        assert_eq!(second.name(), first.name());
        assert_eq!(second.participant_count(), first.participant_count());
        assert!(drain(&mut rx).is_empty()); // no second RoomOpened
    }

    #[test]
    fn delete_room_clears_both_directions() {
        let (mut engine, _, _rx) = engine(LOCAL, "A");
        engine.create_room(addr(REMOTE)).unwrap();
        engine.delete_room(RoomKey::Private(addr(REMOTE))).unwrap();
        assert!(engine.room_of(addr(REMOTE)).is_none());
        assert!(matches!(
            engine.delete_room(RoomKey::Private(addr(REMOTE))),
            Err(ChatError::RoomNotFound(_))
        ));
    }

    #[test]
    fn rename_self_fans_hello_out_to_joined_peers() {
        let (mut engine, wire, _rx) = engine(LOCAL, "A");
        engine.apply(Command::Join { name: "Bob".into() }, addr(REMOTE));
        engine.apply(
            Command::Join {
                name: "Carol".into(),
            },
            addr("10.0.0.3"),
        );
        wire.take();

        engine.rename_self("Anna").unwrap();

        let sent = wire.take();
        assert_eq!(sent.len(), 2);
        for (_, payload) in &sent {
            let frame = protocol::decode(payload).unwrap();
            assert_eq!(frame.command, Command::Hello { name: "Anna".into() });
        }
    }

    #[test]
    fn invalid_self_name_is_rejected_locally() {
        let (mut engine, wire, _rx) = engine(LOCAL, "A");
        assert!(matches!(
            engine.rename_self("   "),
            Err(ChatError::InvalidName(_))
        ));
        assert!(matches!(
            engine.rename_self(&"x".repeat(30)),
            Err(ChatError::InvalidName(_))
        ));
        assert_eq!(engine.self_node().name(), "A");
        assert!(wire.take().is_empty());
    }

    #[test]
    fn broadcast_override_reannounces() {
        let (mut engine, wire, _rx) = engine(LOCAL, "A");
        engine.set_broadcast_override(addr("192.168.0.255")).unwrap();
        let sent = wire.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, addr("192.168.0.255"));
        assert!(matches!(
            protocol::decode(&sent[0].1).unwrap().command,
            Command::Join { .. }
        ));
    }

    /// Two engines on the same broadcast domain discover each other via
    /// one JOIN/HELLO exchange and end up with identical public rooms.
    #[test]
    fn join_hello_exchange_converges_both_public_rooms() {
        let (mut a, wire_a, _rx_a) = engine(LOCAL, "A");
        let (mut b, wire_b, _rx_b) = engine(REMOTE, "B");

        a.announce_join().unwrap();
        let (_, join_frame) = wire_a.take().pop().unwrap();

        // B hears the broadcast JOIN and replies HELLO
        let frame = protocol::decode(&join_frame).unwrap();
        b.apply(frame.command, addr(LOCAL));
        let (to, hello_frame) = wire_b.take().pop().unwrap();
        assert_eq!(to, addr(LOCAL));

        // A hears the HELLO
        let frame = protocol::decode(&hello_frame).unwrap();
        a.apply(frame.command, addr(REMOTE));

        for engine in [&a, &b] {
            let room = engine.public_room().unwrap();
            assert!(room.has_participant(addr(LOCAL)));
            assert!(room.has_participant(addr(REMOTE)));
        }
        assert_eq!(a.node(addr(REMOTE)).unwrap().name(), "B");
        assert_eq!(b.node(addr(LOCAL)).unwrap().name(), "A");
    }
}
