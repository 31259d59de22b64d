//! `hookbridge run` — start the bridge.
//!
//! Resolves configuration, opens the broker connection (startup fails if
//! it cannot), serves HTTP until SIGTERM or Ctrl+C, then closes the
//! broker connection.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::amqp::{ConnectionManager, LapinConnector};
use crate::cli::RunArgs;
use crate::config::BridgeConfig;
use crate::error::AppError;
use crate::logging;
use crate::server::{self, AppState};

pub async fn execute(args: RunArgs) -> Result<(), AppError> {
    let log_format = logging::resolve_format(args.pretty, args.json);

    #[cfg(feature = "sentry-integration")]
    let _sentry_guard = args
        .sentry_dsn
        .as_deref()
        .and_then(|dsn| crate::sentry_integration::init(dsn, args.sentry_environment.as_deref()));

    logging::init(&args.log_level, log_format);

    let config = BridgeConfig::resolve(&args).await?;

    let broker = ConnectionManager::new(
        config.amqp_url.clone(),
        Arc::new(LapinConnector),
        config.reconnect_delay,
    );
    broker.connect().await?;
    tracing::info!(broker = %config.broker_display(), "broker connection established");

    let state = Arc::new(AppState::new(
        broker,
        config.webhook_secret.clone(),
        config.max_body,
    ));
    let router = server::build_router(Arc::clone(&state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        signature_verification = config.webhook_secret.is_some(),
        reconnect_delay_ms = u64::try_from(config.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
        "hookbridge started"
    );

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await;

    // Close the broker even if the server stopped on an error.
    state.broker.close().await;
    served?;

    tracing::info!("hookbridge stopped");
    Ok(())
}
