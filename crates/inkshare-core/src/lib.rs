//! Core drawing model, wire protocol, operation log and config for inkshare.
//!
//! The board is the server-resident synchronization model: one ordered log of
//! stroke operations, a global undo/redo stack pair, and the registry of
//! connected sessions with their cursors. Transports feed it client events
//! and fan out whatever deliveries it returns.

pub mod board;
pub mod config;
pub mod error;
pub mod history;
pub mod log;
pub mod protocol;
pub mod session;
pub mod types;

pub use board::{Audience, Board, Delivery};
pub use error::{InkshareError, Result};
pub use protocol::{ClientEvent, ServerEvent};
pub use types::{Point, StrokeOperation};
