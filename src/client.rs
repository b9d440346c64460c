//! The collaborator-facing surface of the engine.
//!
//! A `ChatClient` owns the engine behind an async mutex shared with the
//! listener task; every read returns a defensive snapshot and every write
//! holds the lock for the whole transition, so the receive task and the
//! control task never interleave inside one.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::error::ChatError;
use crate::events::EngineEvent;
use crate::model::{Engine, Message, Node, Palette, Room, RoomKey};
use crate::network::{DEFAULT_PORT, Listener, UdpWire};
use crate::protocol::BroadcastSelector;

pub struct ChatClient {
    engine: Arc<Mutex<Engine>>,
    listener: Option<Listener>,
    port: u16,
}

impl ChatClient {
    /// Builds a client for the given user name, returning it together
    /// with the event stream the presentation layer should drain.
    pub fn new(
        name: Option<&str>,
        port: u16,
    ) -> Result<(Self, UnboundedReceiver<EngineEvent>), ChatError> {
        let local = crate::network::local_address()?;
        let wire = UdpWire::new(port)?;
        let selector = BroadcastSelector::new(local);
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Engine::new(
            local,
            name,
            Box::new(wire),
            selector,
            tx,
            Box::new(Palette::default()),
        );
        Ok((
            Self {
                engine: Arc::new(Mutex::new(engine)),
                listener: None,
                port,
            },
            rx,
        ))
    }

    pub fn with_default_port(
        name: Option<&str>,
    ) -> Result<(Self, UnboundedReceiver<EngineEvent>), ChatError> {
        Self::new(name, DEFAULT_PORT)
    }

    /// Starts the listener and announces our presence. A bind failure is
    /// returned to the caller, not logged away.
    pub async fn connect(&mut self) -> Result<(), ChatError> {
        if self.listener.is_some() {
            return Ok(());
        }
        let listener = Listener::bind(self.port, Arc::clone(&self.engine)).await?;
        self.listener = Some(listener);
        self.engine.lock().await.announce_join()
    }

    /// Announces departure and stops the listener.
    pub async fn disconnect(&mut self, farewell: &str) -> Result<(), ChatError> {
        let Some(listener) = self.listener.take() else {
            return Err(ChatError::NotConnected);
        };
        if let Err(err) = self.engine.lock().await.announce_leave(farewell) {
            log::warn!("LEAVE announcement failed: {err}");
        }
        listener.stop().await;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.listener.is_some()
    }

    // --- Writes -------------------------------------------------------

    pub async fn send_text(&self, key: RoomKey, text: &str) -> Result<Message, ChatError> {
        self.engine.lock().await.send_text(key, text)
    }

    pub async fn rename_self(&self, name: &str) -> Result<(), ChatError> {
        self.engine.lock().await.rename_self(name)
    }

    pub async fn create_room(&self, addr: IpAddr) -> Result<Room, ChatError> {
        self.engine.lock().await.create_room(addr)
    }

    pub async fn delete_room(&self, key: RoomKey) -> Result<(), ChatError> {
        self.engine.lock().await.delete_room(key)
    }

    pub async fn set_broadcast(&self, addr: IpAddr) -> Result<(), ChatError> {
        self.engine.lock().await.set_broadcast_override(addr)
    }

    // --- Reads (snapshots) ---------------------------------------------

    pub async fn rooms(&self) -> Vec<Room> {
        self.engine.lock().await.rooms()
    }

    pub async fn public_room(&self) -> Option<Room> {
        self.engine.lock().await.public_room()
    }

    pub async fn room_of(&self, addr: IpAddr) -> Option<Room> {
        self.engine.lock().await.room_of(addr)
    }

    pub async fn participants(&self, key: RoomKey) -> Result<Vec<Node>, ChatError> {
        self.engine.lock().await.participants(key)
    }

    pub async fn messages(&self, key: RoomKey) -> Result<Vec<Message>, ChatError> {
        self.engine.lock().await.messages(key)
    }

    pub async fn is_self(&self, addr: IpAddr) -> bool {
        self.engine.lock().await.is_self(addr)
    }

    pub async fn self_node(&self) -> Node {
        self.engine.lock().await.self_node()
    }

    pub async fn broadcasts(&self) -> Vec<IpAddr> {
        self.engine.lock().await.broadcasts()
    }
}
