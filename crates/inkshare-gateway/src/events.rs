//! Fan-out of board deliveries to connected clients.

use std::sync::Arc;

use inkshare_core::{Delivery, ServerEvent};
use tracing::{debug, error};

use crate::state::GatewayState;

/// Send each delivery to every connection its audience includes.
///
/// Call this while still holding the board lock so deliveries from
/// different events cannot interleave.
pub async fn deliver(state: &Arc<GatewayState>, deliveries: &[Delivery]) {
    if deliveries.is_empty() {
        return;
    }

    let connections = state.connections.read().await;
    for delivery in deliveries {
        let msg = match delivery.event.encode() {
            Ok(m) => m,
            Err(e) => {
                error!(%e, event = delivery.event.name(), "Failed to serialize event");
                continue;
            }
        };

        let mut sent = 0usize;
        for conn in connections.values() {
            if delivery.audience.includes(&conn.conn_id)
                && conn.event_tx.send(msg.clone()).is_ok()
            {
                sent += 1;
            }
        }
        debug!(event = delivery.event.name(), sent, "Broadcast event");

        #[cfg(feature = "metrics")]
        crate::metrics::record_broadcast(delivery.event.name(), sent);
    }
}

/// Send one event straight to a single connection's queue.
pub fn send_direct(tx: &tokio::sync::mpsc::UnboundedSender<String>, event: &ServerEvent) {
    match event.encode() {
        Ok(msg) => {
            let _ = tx.send(msg);
        }
        Err(e) => error!(%e, event = event.name(), "Failed to serialize event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkshare_core::config::Config;
    use inkshare_core::Audience;
    use tokio::sync::mpsc;

    use crate::state::ConnectionState;

    async fn register(state: &Arc<GatewayState>, id: &str) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        state.connections.write().await.insert(
            id.to_string(),
            ConnectionState {
                conn_id: id.to_string(),
                event_tx: tx,
                remote_addr: None,
                connected_at: chrono::Utc::now(),
            },
        );
        rx
    }

    #[tokio::test]
    async fn test_deliver_respects_audience() {
        let state = Arc::new(GatewayState::new(Config::default()));
        let mut a = register(&state, "a").await;
        let mut b = register(&state, "b").await;

        deliver(
            &state,
            &[
                Delivery::new(Audience::Others("a".into()), ServerEvent::Undo { id: None }),
                Delivery::new(Audience::Only("a".into()), ServerEvent::Init(vec![])),
            ],
        )
        .await;

        assert_eq!(b.try_recv().unwrap(), r#"{"event":"undo"}"#);
        assert!(b.try_recv().is_err());
        assert_eq!(a.try_recv().unwrap(), r#"{"event":"init","data":[]}"#);
        assert!(a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_skips_closed_receivers() {
        let state = Arc::new(GatewayState::new(Config::default()));
        let rx = register(&state, "gone").await;
        drop(rx);
        let mut live = register(&state, "live").await;

        deliver(&state, &[Delivery::new(Audience::All, ServerEvent::Undo { id: None })]).await;
        assert!(live.try_recv().is_ok());
    }
}
