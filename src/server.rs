//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the broker
//! connection manager, webhook secret, and counters), [`build_router`]
//! for constructing the Axum router with middleware layers, and
//! [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::any::Any;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::amqp::ConnectionManager;
use crate::config::WebhookSecret;
use crate::error::ErrorBody;
use crate::health::health_handler;
use crate::middleware::verify_signature;
use crate::publish::publish_handler;

#[derive(Debug)]
pub struct Stats {
    pub published: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            published: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub struct AppState {
    pub broker: ConnectionManager,
    pub webhook_secret: Option<WebhookSecret>,
    pub max_body: usize,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    #[must_use]
    pub fn new(
        broker: ConnectionManager,
        webhook_secret: Option<WebhookSecret>,
        max_body: usize,
    ) -> Self {
        Self {
            broker,
            webhook_secret,
            max_body,
            start_time: Instant::now(),
            stats: Stats::new(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body = state.max_body;
    let publish = post(publish_handler).layer(middleware::from_fn_with_state(
        Arc::clone(&state),
        verify_signature,
    ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/publish/{exchange}/{routing_key}", publish)
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(render_panic))
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body)),
        )
        .with_state(state)
}

fn render_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = %detail, "request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::internal())).into_response()
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
