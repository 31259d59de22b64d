//! Optional Sentry error tracking.
//!
//! The returned guard must outlive the server so queued events are
//! flushed on shutdown. `error!` events (failed broker connects, handler
//! panics) reach Sentry through the `sentry_tracing` layer installed in
//! [`logging::init`](crate::logging::init).

pub fn init(dsn: &str, environment: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = match dsn.parse::<sentry::types::Dsn>() {
        Ok(dsn) => dsn,
        Err(e) => {
            tracing::warn!(error = %e, "invalid Sentry DSN, error tracking disabled");
            return None;
        }
    };

    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        environment: environment.map(|e| e.to_string().into()),
        release: Some(concat!("hookbridge@", env!("CARGO_PKG_VERSION")).into()),
        ..Default::default()
    });
    sentry::configure_scope(|scope| scope.set_tag("component", "amqp-bridge"));
    Some(guard)
}
