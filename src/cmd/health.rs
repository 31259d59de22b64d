//! `hookbridge health` — check the health of a running instance.
//!
//! Sends a `GET /health` request to the specified URL and displays
//! the response as formatted text or raw JSON. A 503 from an instance
//! whose broker is down is still printed before the command fails.

use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{StatusCode, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::{AppError, BoxError};
use crate::health::{HealthResponse, HealthStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn execute(args: HealthArgs) -> Result<(), AppError> {
    let (status, body) = fetch(health_uri(&args.url)?).await?;

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
    } else {
        match serde_json::from_slice::<HealthResponse>(&body) {
            Ok(health) => print_summary(&args.url, &health),
            Err(e) => {
                eprintln!("Failed to parse health response: {e}");
                println!("{}", String::from_utf8_lossy(&body));
            }
        }
    }

    if !status.is_success() {
        return Err(AppError::HealthCheckFailed(status));
    }
    Ok(())
}

fn health_uri(base: &str) -> Result<Uri, AppError> {
    format!("{}/health", base.trim_end_matches('/'))
        .parse()
        .map_err(|e: hyper::http::uri::InvalidUri| AppError::UriParse {
            source: Box::new(e),
        })
}

async fn fetch(uri: Uri) -> Result<(StatusCode, Bytes), AppError> {
    let client = Client::builder(TokioExecutor::new()).build_http::<Empty<Bytes>>();
    let response = tokio::time::timeout(REQUEST_TIMEOUT, client.get(uri))
        .await
        .map_err(|_| {
            request_failed(format!(
                "no response within {}s",
                REQUEST_TIMEOUT.as_secs()
            ))
        })?
        .map_err(request_failed)?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(request_failed)?
        .to_bytes();
    Ok((status, body))
}

fn request_failed(source: impl Into<BoxError>) -> AppError {
    AppError::HttpRequest {
        source: source.into(),
    }
}

fn print_summary(url: &str, health: &HealthResponse) {
    let (mark, verdict) = match health.status {
        HealthStatus::Healthy => ('\u{2713}', "healthy"),
        HealthStatus::Unhealthy => ('\u{2717}', "unhealthy"),
    };
    println!("{mark} hookbridge is {verdict} ({url})");
    println!("  version:   {}", health.version);
    println!("  uptime:    {}", format_uptime(health.uptime_seconds));
    println!("  broker:    {:?}", health.checks.amqp);
    println!(
        "  messages:  {} published, {} failed",
        health.stats.messages_published, health.stats.publish_failures
    );
    println!("  checked:   {}", health.timestamp);
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
