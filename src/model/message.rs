//! Immutable chat message records.

use std::net::IpAddr;

use chrono::{Local, TimeZone, Timelike, Utc};

/// One message, owned by exactly the room it was appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    content: String,
    /// Absent for system-originated text.
    origin: Option<IpAddr>,
    timestamp: i64,
    hour: u32,
    minute: u32,
}

impl Message {
    /// Builds a message stamped with an explicit millisecond timestamp.
    pub fn new(content: &str, origin: Option<IpAddr>, timestamp: i64) -> Self {
        let (hour, minute) = match Local.timestamp_millis_opt(timestamp) {
            chrono::LocalResult::Single(time) => (time.hour(), time.minute()),
            _ => (0, 0),
        };
        Self {
            content: content.to_string(),
            origin,
            timestamp,
            hour,
            minute,
        }
    }

    /// Builds a message stamped with the current time.
    pub fn now(content: &str, origin: Option<IpAddr>) -> Self {
        Self::new(content, origin, Utc::now().timestamp_millis())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn origin(&self) -> Option<IpAddr> {
        self.origin
    }

    /// Milliseconds since epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Local-time hour, for display grouping.
    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Local-time minute, for display grouping.
    pub fn minute(&self) -> u32 {
        self.minute
    }
}
