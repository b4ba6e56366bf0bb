//! The shared board: operation log, undo/redo and sessions behind one owner.
//!
//! [`Board`] is a synchronous state machine. Every call applies one event and
//! returns the deliveries the transport must fan out, in order. Callers are
//! expected to serialize access (the gateway holds it behind a single mutex).

use tracing::debug;

use crate::config::BoardConfig;
use crate::error::InkshareError;
use crate::history::History;
use crate::log::{ExtendOutcome, OperationLog};
use crate::protocol::{ClientEvent, ServerEvent, StrokeMove};
use crate::session::{Session, SessionId, SessionRegistry, new_session_id};

/// Who receives a server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Just this session.
    Only(SessionId),
    /// Everyone except this session.
    Others(SessionId),
    /// Every connected session, originator included.
    All,
}

impl Audience {
    pub fn includes(&self, session_id: &str) -> bool {
        match self {
            Self::Only(id) => id == session_id,
            Self::Others(id) => id != session_id,
            Self::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub audience: Audience,
    pub event: ServerEvent,
}

impl Delivery {
    pub fn new(audience: Audience, event: ServerEvent) -> Self {
        Self { audience, event }
    }
}

#[derive(Debug)]
pub struct Board {
    history: History,
    sessions: SessionRegistry,
    announce_undo_id: bool,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(&BoardConfig::default())
    }
}

impl Board {
    pub fn new(config: &BoardConfig) -> Self {
        let log = OperationLog::new(config.max_points_per_stroke, config.max_operations);
        Self {
            history: History::new(log, config.max_redo_depth),
            sessions: SessionRegistry::new(),
            announce_undo_id: config.announce_undo_id,
        }
    }

    /// Register a new session and queue its `init` snapshot.
    pub fn connect(&mut self) -> (Session, Vec<Delivery>) {
        self.connect_with_id(new_session_id())
    }

    pub fn connect_with_id(&mut self, id: impl Into<SessionId>) -> (Session, Vec<Delivery>) {
        let session = self.sessions.register(id).clone();
        let init = Delivery::new(
            Audience::Only(session.id.clone()),
            ServerEvent::Init(self.history.log().snapshot()),
        );
        (session, vec![init])
    }

    /// Apply one client event from `session_id`.
    pub fn handle(&mut self, session_id: &str, event: ClientEvent) -> Vec<Delivery> {
        if !self.sessions.contains(session_id) {
            debug!(session_id, event = event.name(), "Ignoring event from unknown session");
            return Vec::new();
        }

        match event {
            ClientEvent::StrokeStart(op) => {
                match self.history.start(op, session_id).cloned() {
                    Ok(op) => vec![Delivery::new(
                        Audience::Others(session_id.to_string()),
                        ServerEvent::StrokeStart(op),
                    )],
                    Err(e) => self.reject(session_id, &InkshareError::Stroke(e)),
                }
            }
            ClientEvent::StrokeMove(StrokeMove { id, point }) => {
                match self.history.log_mut().extend(&id, point, session_id) {
                    ExtendOutcome::Applied => vec![Delivery::new(
                        Audience::Others(session_id.to_string()),
                        ServerEvent::StrokeMove(StrokeMove { id, point }),
                    )],
                    outcome => {
                        debug!(stroke_id = %id, ?outcome, "Dropping stroke point");
                        Vec::new()
                    }
                }
            }
            ClientEvent::StrokeEnd(end) => {
                if !self.history.log_mut().end(end.id(), session_id) {
                    debug!(stroke_id = end.id(), "Ignoring end for stroke that is not open");
                }
                Vec::new()
            }
            ClientEvent::Undo => match self.history.undo() {
                Some(id) => {
                    let id = self.announce_undo_id.then_some(id);
                    vec![Delivery::new(Audience::All, ServerEvent::Undo { id })]
                }
                None => Vec::new(),
            },
            ClientEvent::Redo => match self.history.redo() {
                Some(op) => vec![Delivery::new(Audience::All, ServerEvent::Redo(op))],
                None => Vec::new(),
            },
            ClientEvent::Cursor(pos) => match self.sessions.update_cursor(session_id, pos) {
                Some(cursor) => vec![Delivery::new(
                    Audience::Others(session_id.to_string()),
                    ServerEvent::Cursor(cursor),
                )],
                None => Vec::new(),
            },
        }
    }

    /// Report a rejected event back to its originator only.
    pub fn reject(&self, session_id: &str, err: &InkshareError) -> Vec<Delivery> {
        vec![Delivery::new(
            Audience::Only(session_id.to_string()),
            ServerEvent::error(err),
        )]
    }

    /// Drop a session: freeze its open strokes and retire its cursor.
    pub fn disconnect(&mut self, session_id: &str) -> Vec<Delivery> {
        let Some(session) = self.sessions.remove(session_id) else {
            return Vec::new();
        };

        let closed = self.history.log_mut().close_author(session_id);
        if closed > 0 {
            debug!(session_id, closed, "Froze strokes left open by departing session");
        }

        if session.cursor.is_some() {
            vec![Delivery::new(
                Audience::Others(session.id.clone()),
                ServerEvent::CursorLeave { id: session.id },
            )]
        } else {
            Vec::new()
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}
