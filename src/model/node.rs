//! Chat participants, keyed by network address.

use std::net::IpAddr;

use chrono::Utc;

use crate::model::style::StyleToken;

/// Longest accepted display name, exclusive.
pub const MAX_NAME_LEN: usize = 30;

/// A chat participant. Exactly one node exists per network address.
#[derive(Debug, Clone)]
pub struct Node {
    addr: IpAddr,
    name: String,
    joined: bool,
    last_heard: i64,
    style: Option<StyleToken>,
}

impl Node {
    pub fn new(addr: IpAddr, name: &str) -> Self {
        Self {
            addr,
            name: name.trim().to_string(),
            joined: false,
            last_heard: 0,
            style: None,
        }
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// The raw name; may be empty for nodes heard without a handshake.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name for display, falling back to the address when unnamed.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            self.addr.to_string()
        } else {
            self.name.clone()
        }
    }

    /// Unambiguous label: `[addr] name`.
    pub fn unique_name(&self) -> String {
        if self.name.is_empty() {
            format!("[{}]", self.addr)
        } else {
            format!("[{}] {}", self.addr, self.name)
        }
    }

    /// Updates the name if valid, keeping the prior value otherwise.
    /// Returns whether the name was accepted.
    pub fn set_name(&mut self, name: &str) -> bool {
        if is_valid_name(name) {
            self.name = name.trim().to_string();
            true
        } else {
            log::debug!("Rejected invalid name {name:?} for {}", self.addr);
            false
        }
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn join(&mut self, style: StyleToken) {
        self.joined = true;
        self.style = Some(style);
        self.touch();
    }

    /// Marks the node departed and gives back its style token, if any.
    pub fn leave(&mut self) -> Option<StyleToken> {
        self.joined = false;
        self.touch();
        self.style.take()
    }

    pub fn style(&self) -> Option<StyleToken> {
        self.style
    }

    /// Milliseconds since epoch of the last command heard from this node.
    pub fn last_heard(&self) -> i64 {
        self.last_heard
    }

    pub fn touch(&mut self) {
        self.last_heard = Utc::now().timestamp_millis();
    }
}

/// A name is valid when non-empty after trimming and under 30 characters.
pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().count() < MAX_NAME_LEN
}
