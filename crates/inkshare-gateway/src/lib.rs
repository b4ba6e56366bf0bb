//! WebSocket gateway for the shared inkshare board.
//!
//! The gateway owns the single [`inkshare_core::Board`], accepts client
//! connections on `/ws`, feeds their events through the board and fans the
//! resulting deliveries out to every connected client in a consistent order.

pub mod connection;
pub mod events;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod rate_limit;
pub mod router;
pub mod server;
pub mod state;

pub use server::{build_router, start_gateway};
pub use state::GatewayState;
