//! Axum-based WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::connection::handle_ws_connection;
use crate::state::GatewayState;

/// Build the HTTP router: `/ws` for clients, `/health` for probes.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the gateway and serve until Ctrl+C.
pub async fn start_gateway(state: Arc<GatewayState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.gateway_bind(), state.config.gateway_port());

    #[allow(unused_mut)]
    let mut app = build_router(state.clone());

    #[cfg(feature = "metrics")]
    match crate::metrics::install_prometheus_recorder() {
        Ok(handle) => {
            app = app.route("/metrics", get(move || async move { handle.render() }));
            info!("Prometheus metrics available at /metrics");
        }
        Err(e) => tracing::warn!(%e, "Metrics endpoint disabled"),
    }

    if let Some(limiter) = state.rate_limiter.clone() {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                limiter.prune();
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<GatewayState>>,
) -> Response {
    if let Some(limiter) = &state.rate_limiter {
        if !limiter.check(remote_addr.ip()) {
            return (StatusCode::TOO_MANY_REQUESTS, "Too many connections").into_response();
        }
    }

    let max_frame = state.config.max_frame_bytes();
    ws.max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_upgrade(move |socket| handle_ws_connection(state, socket, Some(remote_addr)))
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    let (operations, redo_depth) = {
        let board = state.board.lock().await;
        (board.history().log().len(), board.history().redo_depth())
    };
    let connections = state.connection_count().await;
    let uptime_secs = (chrono::Utc::now() - state.started_at).num_seconds();

    axum::Json(json!({
        "status": "ok",
        "version": version,
        "connections": connections,
        "operations": operations,
        "redo_depth": redo_depth,
        "uptime_secs": uptime_secs,
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(%e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
