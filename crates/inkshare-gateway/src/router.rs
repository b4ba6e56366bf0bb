//! Broadcast router: feeds client events into the board and fans out the
//! resulting deliveries.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use inkshare_core::session::SessionId;
use inkshare_core::{ClientEvent, InkshareError, ServerEvent};

use crate::events::{deliver, send_direct};
use crate::state::{ConnectionState, GatewayState};

/// Register a new connection and queue its `init` snapshot.
///
/// The snapshot is taken under the same lock that registers the connection,
/// so the newcomer sees every stroke exactly once: either in `init` or as a
/// later broadcast.
pub async fn register_connection(
    state: &Arc<GatewayState>,
    event_tx: mpsc::UnboundedSender<String>,
    remote_addr: Option<SocketAddr>,
) -> SessionId {
    let mut board = state.board.lock().await;
    let (session, deliveries) = board.connect();

    state.connections.write().await.insert(
        session.id.clone(),
        ConnectionState {
            conn_id: session.id.clone(),
            event_tx,
            remote_addr,
            connected_at: chrono::Utc::now(),
        },
    );
    deliver(state, &deliveries).await;

    info!(
        conn_id = %session.id,
        color = %session.color,
        operations = board.history().log().len(),
        "Session joined"
    );
    session.id
}

/// Apply one client event and broadcast the outcome.
pub async fn dispatch_event(state: &Arc<GatewayState>, conn_id: &str, event: ClientEvent) {
    let name = event.name();
    debug!(conn_id, event = name, "Dispatching event");

    #[cfg(feature = "metrics")]
    crate::metrics::record_event(name);

    let mut board = state.board.lock().await;
    let deliveries = board.handle(conn_id, event);
    deliver(state, &deliveries).await;

    #[cfg(feature = "metrics")]
    crate::metrics::record_board(board.history().log().len(), board.history().redo_depth());
}

/// Tell the originator its frame was refused. No other client is affected.
pub fn reject(tx: &mpsc::UnboundedSender<String>, conn_id: &str, err: &InkshareError) {
    warn!(conn_id, code = err.code(), %err, "Rejected client frame");

    #[cfg(feature = "metrics")]
    crate::metrics::record_error(err.code());

    send_direct(tx, &ServerEvent::error(err));
}

/// Drop a connection: retire its session and tell the others its cursor left.
pub async fn unregister_connection(state: &Arc<GatewayState>, conn_id: &str) {
    let mut board = state.board.lock().await;
    let removed = state.connections.write().await.remove(conn_id);
    let deliveries = board.disconnect(conn_id);
    deliver(state, &deliveries).await;

    match removed {
        Some(conn) => info!(
            conn_id,
            remote_addr = ?conn.remote_addr,
            connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds(),
            "Session left"
        ),
        None => debug!(conn_id, "Unregistering unknown connection"),
    }
}
