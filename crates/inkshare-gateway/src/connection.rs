//! WebSocket connection lifecycle: register, read loop, write loop, cleanup.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use inkshare_core::{ClientEvent, InkshareError};

use crate::router::{dispatch_event, register_connection, reject, unregister_connection};
use crate::state::GatewayState;

/// Handle a new WebSocket connection.
pub async fn handle_ws_connection(
    state: Arc<GatewayState>,
    ws: WebSocket,
    remote_addr: Option<SocketAddr>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    // Outbound queue for this connection; the board never waits on a socket.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<String>();

    let conn_id = register_connection(&state, event_tx.clone(), remote_addr).await;
    info!(conn_id = %conn_id, ?remote_addr, "New WebSocket connection");

    #[cfg(feature = "metrics")]
    crate::metrics::record_ws_connect();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = event_rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg_result) = ws_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match ClientEvent::parse(text.as_str()) {
                Ok(event) => dispatch_event(&state, &conn_id, event).await,
                Err(e) => reject(&event_tx, &conn_id, &e),
            },
            Ok(Message::Binary(_)) => {
                let err = InkshareError::Protocol("binary frames are not supported".into());
                reject(&event_tx, &conn_id, &err);
            }
            Ok(Message::Close(_)) => {
                debug!(conn_id = %conn_id, "Client requested close");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Axum answers pings automatically
            }
            Err(e) => {
                error!(conn_id = %conn_id, %e, "WebSocket error");
                break;
            }
        }
    }

    send_task.abort();
    unregister_connection(&state, &conn_id).await;

    if let (Some(limiter), Some(addr)) = (&state.rate_limiter, remote_addr) {
        limiter.release(addr.ip());
    }

    #[cfg(feature = "metrics")]
    crate::metrics::record_ws_disconnect();

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
