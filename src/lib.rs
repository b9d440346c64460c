//! Serverless LAN chat engine.
//!
//! Peers announce themselves with UDP broadcast, chat in one shared public
//! room or in per-peer private rooms, and track membership without any
//! central server. This crate is the protocol and membership core; a
//! presentation layer subscribes to [`EngineEvent`]s and drives a
//! [`ChatClient`].
//!
//! # Architecture
//!
//! - **Protocol**: text frames over UDP, one command per datagram, with a
//!   per-process signing token for loopback suppression
//!   ([`protocol::codec`]) and per-interface broadcast-address selection
//!   ([`protocol::broadcast`]).
//! - **Network**: a fire-and-forget outbound wire and a cancellable
//!   receive loop on the well-known port ([`network`]).
//! - **Model**: nodes keyed by address, one public room plus at most one
//!   private room per peer, idempotent transitions driven by unreliable
//!   datagrams ([`model`]).

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod network;
pub mod protocol;

pub use client::ChatClient;
pub use error::ChatError;
pub use events::EngineEvent;
pub use model::{Message, Node, Room, RoomKey};
pub use network::DEFAULT_PORT;
