//! Session model: per-connection ephemeral identity and cursor.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use uuid::Uuid;

use crate::protocol::{CursorBroadcast, CursorPosition};
use crate::types::Cursor;

/// Opaque per-connection token.
pub type SessionId = String;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub color: String,
    pub cursor: Option<Cursor>,
}

impl Session {
    pub fn new(id: impl Into<SessionId>) -> Self {
        let id = id.into();
        let color = derive_color(&id);
        Self {
            id,
            color,
            cursor: None,
        }
    }
}

/// Generate a fresh session token.
pub fn new_session_id() -> SessionId {
    Uuid::new_v4().simple().to_string()
}

/// Display colour for a session: `#` plus the token's last six hex digits.
///
/// Tokens that do not end in six hex digits fall back to a stable hash.
pub fn derive_color(id: &str) -> String {
    let tail = id
        .char_indices()
        .rev()
        .nth(5)
        .map(|(i, _)| &id[i..])
        .filter(|tail| tail.chars().all(|c| c.is_ascii_hexdigit()));

    match tail {
        Some(tail) => format!("#{}", tail.to_ascii_lowercase()),
        None => {
            let mut hasher = DefaultHasher::new();
            id.hash(&mut hasher);
            format!("#{:06x}", hasher.finish() & 0x00ff_ffff)
        }
    }
}

/// Currently connected sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under `id`, replacing any previous entry.
    pub fn register(&mut self, id: impl Into<SessionId>) -> &Session {
        let session = Session::new(id);
        let id = session.id.clone();
        self.sessions.insert(id.clone(), session);
        &self.sessions[&id]
    }

    /// Remove a session, returning its final state.
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        self.sessions.remove(id)
    }

    /// Record a cursor move (last write wins). Returns the relay payload, or
    /// `None` when the session is unknown.
    pub fn update_cursor(&mut self, id: &str, pos: CursorPosition) -> Option<CursorBroadcast> {
        let session = self.sessions.get_mut(id)?;
        session.cursor = Some(Cursor {
            x: pos.x,
            y: pos.y,
            color: session.color.clone(),
        });
        Some(CursorBroadcast {
            x: pos.x,
            y: pos.y,
            id: session.id.clone(),
            color: session.color.clone(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
