//! Request middleware.
//!
//! [`verify_signature`] guards the publish route: it buffers the raw body,
//! checks `X-Hub-Signature-256` against it, and hands the very same bytes
//! on to the handler.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::LengthLimitError;

use crate::error::BridgeError;
use crate::server::AppState;
use crate::signature::{self, SIGNATURE_HEADER};

pub async fn verify_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, BridgeError> {
    let Some(ref secret) = state.webhook_secret else {
        return Ok(next.run(request).await);
    };

    let (parts, body) = request.into_parts();
    let raw_body = match to_bytes(body, state.max_body).await {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => None,
        Err(ref e) if is_length_limit(e) => {
            tracing::warn!(path = %parts.uri.path(), "webhook body over size limit");
            return Err(BridgeError::PayloadTooLarge);
        }
        Err(e) => {
            tracing::debug!(error = %e, "failed to buffer request body");
            None
        }
    };

    let provided = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if let Err(e) = signature::validate(Some(secret.as_bytes()), provided, raw_body.as_deref()) {
        tracing::warn!(
            path = %parts.uri.path(),
            code = e.code(),
            "webhook signature rejected"
        );
        return Err(e);
    }

    let body = raw_body.map_or_else(Body::empty, Body::from);
    Ok(next.run(Request::from_parts(parts, body)).await)
}

fn is_length_limit(error: &axum::Error) -> bool {
    std::error::Error::source(error).is_some_and(|source| source.is::<LengthLimitError>())
}
