//! `GET /health` endpoint handler.
//!
//! Reports whether the broker channel is live: 200 with `healthy` when it
//! is, 503 with `unhealthy` otherwise. The payload also carries the
//! version, uptime, and publish counters.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmqpCheck {
    Connected,
    Disconnected,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct HealthChecks {
    pub amqp: AmqpCheck,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub messages_published: u64,
    pub publish_failures: u64,
}

pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let connected = state.broker.is_connected();
    let (status_code, status, amqp) = if connected {
        (StatusCode::OK, HealthStatus::Healthy, AmqpCheck::Connected)
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthStatus::Unhealthy,
            AmqpCheck::Disconnected,
        )
    };

    let body = HealthResponse {
        status,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        checks: HealthChecks { amqp },
        stats: StatsResponse {
            messages_published: state.stats.published.load(Ordering::Relaxed),
            publish_failures: state.stats.failed.load(Ordering::Relaxed),
        },
    };
    (status_code, Json(body))
}
