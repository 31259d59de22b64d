//! `POST /publish/{exchange}/{routing_key}` handler.
//!
//! Publishes the raw request body, byte for byte, to the named topic
//! exchange. Signature checks happen before this runs, in
//! [`middleware::verify_signature`](crate::middleware::verify_signature).

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::Json;

use crate::amqp::PublishResult;
use crate::error::BridgeError;
use crate::server::AppState;

pub async fn publish_handler(
    State(state): State<Arc<AppState>>,
    Path((exchange, routing_key)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PublishResult>, BridgeError> {
    let body = body?;
    match state.broker.publish(&exchange, &routing_key, &body).await {
        Ok(result) => {
            state.stats.published.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                exchange = %exchange,
                routing_key = %routing_key,
                message_id = %result.message_id,
                bytes = body.len(),
                "message published"
            );
            Ok(Json(result))
        }
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                exchange = %exchange,
                routing_key = %routing_key,
                code = e.code(),
                detail = e.detail().unwrap_or_default(),
                "publish failed"
            );
            Err(e)
        }
    }
}
