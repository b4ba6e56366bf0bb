//! Gateway shared state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, RwLock};

use inkshare_core::config::Config;
use inkshare_core::session::SessionId;
use inkshare_core::Board;

use crate::rate_limit::RateLimiter;

/// Shared gateway state accessible from all connections and handlers.
///
/// Lock order is always `board` before `connections`. Every board mutation
/// and the enqueueing of its deliveries happen under the `board` lock, so all
/// clients observe broadcasts in the order the board applied them.
pub struct GatewayState {
    pub config: Arc<Config>,
    pub board: Mutex<Board>,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    pub connections: RwLock<HashMap<SessionId, ConnectionState>>,
    pub started_at: DateTime<Utc>,
}

/// Per-connection state.
pub struct ConnectionState {
    pub conn_id: SessionId,
    pub event_tx: mpsc::UnboundedSender<String>,
    pub remote_addr: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(config: Config) -> Self {
        let rate_limiter = config
            .max_connections_per_ip()
            .map(|max| Arc::new(RateLimiter::new(max)));

        Self {
            board: Mutex::new(Board::new(&config.board())),
            config: Arc::new(config),
            rate_limiter,
            connections: RwLock::new(HashMap::new()),
            started_at: Utc::now(),
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
