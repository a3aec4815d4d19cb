//! Core protocol types: identifiers, event tags, server events, and the
//! messages a client and the server exchange over a connection.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player, assigned when the player registers.
///
/// Serialized as a plain number (`#[serde(transparent)]`), displayed as
/// `P-<n>` in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique numeric identifier for a session.
///
/// Players never see this; they address a session by its [`SessionCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionCode
// ---------------------------------------------------------------------------

/// Number of letters in a session code.
pub const SESSION_CODE_LEN: usize = 4;

/// Number of distinct session codes: 26^4.
pub const SESSION_CODE_SPACE: u32 = 456_976;

/// The short human-readable code players type to join a session.
///
/// Always exactly four uppercase ASCII letters. Codes are the base-26
/// rendering of an index in `[0, SESSION_CODE_SPACE)`, most significant
/// letter first, so `0` is `AAAA`, `26` is `AABA`, and the last index is
/// `ZZZZ`.
///
/// On the wire a code is a plain JSON string. Parsing accepts lowercase
/// input and normalizes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionCode(String);

impl SessionCode {
    /// Renders `index` as a four-letter code.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidCode`] if `index` is outside the
    /// code space.
    pub fn from_index(index: u32) -> Result<Self, ProtocolError> {
        if index >= SESSION_CODE_SPACE {
            return Err(ProtocolError::InvalidCode(format!(
                "index {index} is outside the code space of {SESSION_CODE_SPACE}"
            )));
        }
        let mut letters = [b'A'; SESSION_CODE_LEN];
        let mut rest = index;
        for slot in letters.iter_mut().rev() {
            *slot = b'A' + (rest % 26) as u8;
            rest /= 26;
        }
        Ok(Self(letters.iter().map(|&b| b as char).collect()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() != SESSION_CODE_LEN
            || !code.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(ProtocolError::InvalidCode(s.to_string()));
        }
        Ok(Self(code))
    }
}

impl TryFrom<String> for SessionCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionCode> for String {
    fn from(code: SessionCode) -> Self {
        code.0
    }
}

// ---------------------------------------------------------------------------
// EventType
// ---------------------------------------------------------------------------

/// The tag that says what an event means.
///
/// Tags are compared by string equality. The engine itself only defines
/// [`EventType::ERROR`]; everything else belongs to the stage that uses
/// it, usually as an associated `const` built with
/// [`from_static`](Self::from_static).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// The tag of every error server event.
    pub const ERROR: EventType = EventType::from_static("ERROR");

    /// Builds a tag from a string literal. Usable in `const` items.
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Builds a tag from any string.
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventType {
    fn from(tag: &'static str) -> Self {
        Self::from_static(tag)
    }
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// An event the server sends to a player.
///
/// The payload is whatever the emitting stage chose; an error event
/// carries `{"message": "..."}`.
///
/// ```json
/// { "kind": "DID_DROP_PIECE", "payload": { "piece": "Red", "slot": 1, "row": 5 } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    pub kind: EventType,
    #[serde(default)]
    pub payload: Value,
}

impl ServerEvent {
    /// Creates an event with a payload.
    pub fn new(kind: EventType, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Creates an event whose payload is `payload` serialized to JSON.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if `payload` can't be represented
    /// as JSON (e.g. a map with non-string keys).
    pub fn with_payload<T: Serialize>(kind: EventType, payload: &T) -> Result<Self, ProtocolError> {
        let payload = serde_json::to_value(payload).map_err(ProtocolError::Encode)?;
        Ok(Self { kind, payload })
    }

    /// Creates an event that carries no payload.
    pub fn bare(kind: EventType) -> Self {
        Self {
            kind,
            payload: Value::Null,
        }
    }

    /// Creates an error event with a human-readable message.
    pub fn error(message: impl fmt::Display) -> Self {
        Self {
            kind: EventType::ERROR,
            payload: serde_json::json!({ "message": message.to_string() }),
        }
    }

    /// Returns `true` if this is an error event.
    pub fn is_error(&self) -> bool {
        self.kind == EventType::ERROR
    }

    /// Returns the message of an error event, `None` for any other event.
    pub fn error_message(&self) -> Option<&str> {
        if !self.is_error() {
            return None;
        }
        self.payload.get("message").and_then(Value::as_str)
    }

    /// Decodes the payload into a concrete type.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the payload has another shape.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.payload).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Wire messages
// ---------------------------------------------------------------------------

/// Client → server requests.
///
/// Internally tagged, so a request looks like
/// `{ "type": "JoinSession", "code": "ABCD", "name": "Alice" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientRequest {
    /// "Which games can I start?"
    ListGames,

    /// Start a new session of the named game.
    CreateSession { game: String },

    /// Join an existing session as a new player named `name`.
    JoinSession { code: SessionCode, name: String },

    /// A player event for the session this connection joined.
    Action {
        kind: EventType,
        #[serde(default)]
        payload: Value,
    },

    /// "I'm leaving."
    Disconnect,
}

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Names of the registered games.
    Games { names: Vec<String> },

    /// A session was created; share the code with other players.
    SessionCreated { code: SessionCode },

    /// This connection is now a player in the session.
    Joined { code: SessionCode, player_id: PlayerId },

    /// An event from the player's mailbox.
    Event { event: ServerEvent },

    /// The request could not be served.
    ///
    /// `code` follows HTTP conventions: 400 bad request, 404 not found,
    /// 409 conflict, 410 gone.
    Error { code: u16, message: String },
}
