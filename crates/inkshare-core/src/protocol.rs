//! inkshare wire protocol.
//!
//! Every WebSocket text frame carries one [`EventFrame`]: an event name plus an
//! optional JSON payload, mirroring the emit/on pairs of the browser client.
//! Payload-less events (`undo`, `redo`) omit `data` entirely.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{InkshareError, Result};
use crate::session::SessionId;
use crate::types::{Point, StrokeId, StrokeOperation};

/// Event names shared by both directions.
pub mod events {
    pub const INIT: &str = "init";
    pub const STROKE_START: &str = "stroke:start";
    pub const STROKE_MOVE: &str = "stroke:move";
    pub const STROKE_END: &str = "stroke:end";
    pub const UNDO: &str = "undo";
    pub const REDO: &str = "redo";
    pub const CURSOR: &str = "cursor";
    pub const CURSOR_LEAVE: &str = "cursor:leave";
    pub const ERROR: &str = "error";
}

/// The top-level message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EventFrame {
    pub fn new(event: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Deserialize the payload, treating a missing payload as JSON `null`.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let data = self.data.clone().unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| {
            InkshareError::Protocol(format!("invalid '{}' payload: {e}", self.event))
        })
    }
}

/// `stroke:move` payload, identical in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeMove {
    pub id: StrokeId,
    pub point: Point,
}

/// `stroke:end` payload. The browser client emits the bare id string, other
/// clients send `{"id": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrokeEnd {
    Keyed { id: StrokeId },
    Bare(StrokeId),
}

impl StrokeEnd {
    pub fn id(&self) -> &str {
        match self {
            Self::Keyed { id } | Self::Bare(id) => id,
        }
    }
}

/// `cursor` payload from a client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub x: f64,
    pub y: f64,
}

/// `cursor` payload relayed to other clients, tagged with the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorBroadcast {
    pub x: f64,
    pub y: f64,
    pub id: SessionId,
    pub color: String,
}

/// Error shape sent to the originator of a rejected event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}

impl From<&InkshareError> for ErrorShape {
    fn from(err: &InkshareError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Client -> server events.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    StrokeStart(StrokeOperation),
    StrokeMove(StrokeMove),
    StrokeEnd(StrokeEnd),
    Undo,
    Redo,
    Cursor(CursorPosition),
}

impl ClientEvent {
    /// Decode a raw text frame.
    pub fn parse(text: &str) -> Result<Self> {
        let frame: EventFrame = serde_json::from_str(text)
            .map_err(|e| InkshareError::Protocol(format!("invalid frame: {e}")))?;
        Self::from_frame(&frame)
    }

    pub fn from_frame(frame: &EventFrame) -> Result<Self> {
        match frame.event.as_str() {
            events::STROKE_START => Ok(Self::StrokeStart(frame.payload()?)),
            events::STROKE_MOVE => Ok(Self::StrokeMove(frame.payload()?)),
            events::STROKE_END => Ok(Self::StrokeEnd(frame.payload()?)),
            events::UNDO => Ok(Self::Undo),
            events::REDO => Ok(Self::Redo),
            events::CURSOR => Ok(Self::Cursor(frame.payload()?)),
            other => Err(InkshareError::Protocol(format!("unknown event '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StrokeStart(_) => events::STROKE_START,
            Self::StrokeMove(_) => events::STROKE_MOVE,
            Self::StrokeEnd(_) => events::STROKE_END,
            Self::Undo => events::UNDO,
            Self::Redo => events::REDO,
            Self::Cursor(_) => events::CURSOR,
        }
    }

    pub fn to_frame(&self) -> Result<EventFrame> {
        let data = match self {
            Self::StrokeStart(op) => Some(serde_json::to_value(op)?),
            Self::StrokeMove(mv) => Some(serde_json::to_value(mv)?),
            Self::StrokeEnd(end) => Some(serde_json::to_value(end)?),
            Self::Undo | Self::Redo => None,
            Self::Cursor(pos) => Some(serde_json::to_value(pos)?),
        };
        Ok(EventFrame::new(self.name(), data))
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_frame()?)?)
    }
}

/// Server -> client events.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Init(Vec<StrokeOperation>),
    StrokeStart(StrokeOperation),
    StrokeMove(StrokeMove),
    /// `id` is only populated when the board announces undone stroke ids.
    Undo { id: Option<StrokeId> },
    Redo(StrokeOperation),
    Cursor(CursorBroadcast),
    CursorLeave { id: SessionId },
    Error(ErrorShape),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => events::INIT,
            Self::StrokeStart(_) => events::STROKE_START,
            Self::StrokeMove(_) => events::STROKE_MOVE,
            Self::Undo { .. } => events::UNDO,
            Self::Redo(_) => events::REDO,
            Self::Cursor(_) => events::CURSOR,
            Self::CursorLeave { .. } => events::CURSOR_LEAVE,
            Self::Error(_) => events::ERROR,
        }
    }

    pub fn to_frame(&self) -> Result<EventFrame> {
        let data = match self {
            Self::Init(ops) => Some(serde_json::to_value(ops)?),
            Self::StrokeStart(op) | Self::Redo(op) => Some(serde_json::to_value(op)?),
            Self::StrokeMove(mv) => Some(serde_json::to_value(mv)?),
            Self::Undo { id: None } => None,
            Self::Undo { id: Some(id) } => Some(serde_json::json!({ "id": id })),
            Self::Cursor(cursor) => Some(serde_json::to_value(cursor)?),
            Self::CursorLeave { id } => Some(serde_json::json!({ "id": id })),
            Self::Error(err) => Some(serde_json::to_value(err)?),
        };
        Ok(EventFrame::new(self.name(), data))
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_frame()?)?)
    }

    pub fn error(err: &InkshareError) -> Self {
        Self::Error(ErrorShape::from(err))
    }
}
