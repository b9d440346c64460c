//! Wire codec for the chat protocol.
//!
//! One UDP datagram carries one UTF-8 text frame:
//!
//! ```text
//! <token> JOIN  NAME=<name>
//! <token> HELLO NAME=<name>
//! <token> LEAVE CONTENT=<farewell>
//! <token> MSG   PUBLIC=<TRUE|FALSE> AUTODELETE=<seconds|-1> CONTENT=<text>
//! ```
//!
//! `token` is a random per-process value prepended to every outgoing frame.
//! It only exists so the listener can recognize and drop frames this same
//! process broadcast to itself; it is not a security mechanism.
//!
//! Values are not escaped: a CONTENT containing ` KEY=` can confuse a peer's
//! parser. Accepted protocol limitation.

use uuid::Uuid;

/// A decoded protocol command, without its signing token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Announce presence, or rename. Peers reply with HELLO.
    Join { name: String },
    /// Reply to JOIN, or broadcast after a local rename. Never answered.
    Hello { name: String },
    /// Announce departure.
    Leave { farewell: String },
    /// Chat content, broadcast (public) or unicast (private).
    Msg {
        content: String,
        public: bool,
        /// Parsed and carried but not acted upon; no expiry is defined.
        auto_delete: i64,
    },
}

/// A decoded frame: signing token plus command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub token: String,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame has fewer than three space-separated parts")]
    TooShort,
    #[error("unknown command keyword {0:?}")]
    UnknownCommand(String),
    #[error("MSG frame does not carry exactly three fields")]
    FieldCount,
    #[error("unparsable {field} value {value:?}")]
    BadField { field: &'static str, value: String },
}

/// Encoder/decoder holding this process's signing token.
#[derive(Debug, Clone)]
pub struct Codec {
    token: String,
}

impl Codec {
    /// Creates a codec with a fresh random signing token.
    pub fn new() -> Self {
        Self {
            token: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// True if `frame` was produced by this same process (broadcast echo).
    pub fn is_own(&self, frame: &Frame) -> bool {
        frame.token == self.token
    }

    pub fn encode(&self, command: &Command) -> String {
        match command {
            Command::Join { name } => format!("{} JOIN NAME={name}", self.token),
            Command::Hello { name } => format!("{} HELLO NAME={name}", self.token),
            Command::Leave { farewell } => format!("{} LEAVE CONTENT={farewell}", self.token),
            Command::Msg {
                content,
                public,
                auto_delete,
            } => format!(
                "{} MSG PUBLIC={} AUTODELETE={} CONTENT={}",
                self.token,
                if *public { "TRUE" } else { "FALSE" },
                auto_delete,
                content
            ),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses one frame. The token and keyword are isolated by the first two
/// spaces; whatever follows belongs to the command's fields, so MSG content
/// may contain spaces and `=`.
pub fn decode(payload: &str) -> Result<Frame, DecodeError> {
    let mut parts = payload.splitn(3, ' ');
    let token = parts.next().unwrap_or_default();
    let keyword = parts.next().ok_or(DecodeError::TooShort)?;
    let rest = parts.next().ok_or(DecodeError::TooShort)?;

    let command = match keyword {
        "JOIN" => Command::Join {
            name: field_value(rest, "NAME"),
        },
        "HELLO" => Command::Hello {
            name: field_value(rest, "NAME"),
        },
        "LEAVE" => Command::Leave {
            farewell: field_value(rest, "CONTENT"),
        },
        "MSG" => decode_msg(rest)?,
        other => return Err(DecodeError::UnknownCommand(other.to_string())),
    };

    Ok(Frame {
        token: token.to_string(),
        command,
    })
}

/// Reads a single `KEY=value` field, returning the trimmed value or an
/// empty string if the key does not match.
fn field_value(field: &str, key: &str) -> String {
    match field.split_once('=') {
        Some((k, value)) if k == key => value.trim().to_string(),
        _ => String::new(),
    }
}

fn decode_msg(rest: &str) -> Result<Command, DecodeError> {
    let fields: Vec<&str> = rest.splitn(3, ' ').collect();
    if fields.len() != 3 {
        return Err(DecodeError::FieldCount);
    }

    let mut public = false;
    let mut auto_delete = -1i64;
    let mut content = String::new();
    for field in fields {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        match key {
            "PUBLIC" => public = value == "TRUE",
            "AUTODELETE" => {
                auto_delete = value.trim().parse().map_err(|_| DecodeError::BadField {
                    field: "AUTODELETE",
                    value: value.to_string(),
                })?;
            }
            "CONTENT" => content = value.trim().to_string(),
            _ => {}
        }
    }

    Ok(Command::Msg {
        content,
        public,
        auto_delete,
    })
}
