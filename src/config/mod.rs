//! Runtime configuration.
//!
//! [`BridgeConfig`] is resolved once at startup from three layers, highest
//! precedence first: CLI flags and their environment variables, the
//! optional config file, and built-in defaults. The result is validated
//! before anything connects.

pub mod model;
pub mod sources;
pub mod validation;

use std::time::Duration;

use url::Url;

use crate::amqp::DEFAULT_RECONNECT_DELAY;
use crate::cli::RunArgs;
use crate::error::AppError;
use model::FileConfig;

pub const DEFAULT_MAX_BODY: usize = 1_048_576;

/// Shared secret for webhook signatures. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Empty secrets count as "not configured".
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        (!secret.is_empty()).then_some(Self(secret))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub amqp_url: String,
    pub webhook_secret: Option<WebhookSecret>,
    pub reconnect_delay: Duration,
    pub max_body: usize,
}

impl BridgeConfig {
    /// Load the config file named by `args` (if any), merge and validate.
    pub async fn resolve(args: &RunArgs) -> Result<Self, AppError> {
        let file = match args.config {
            Some(ref path) => {
                let file = sources::load_file(path).await?;
                tracing::info!(path = %path.display(), "loaded config file");
                file
            }
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    pub fn merge(args: &RunArgs, file: FileConfig) -> Result<Self, AppError> {
        let amqp_url = args
            .amqp_url
            .clone()
            .or(file.amqp_url)
            .ok_or_else(|| AppError::MissingBrokerUrl {
                hint: "Provide --amqp-url, set AMQP_URL, or add amqp_url to the config file."
                    .into(),
            })?;

        let config = Self {
            host: args.host.clone(),
            port: args.port,
            amqp_url,
            webhook_secret: args
                .webhook_secret
                .clone()
                .or(file.webhook_secret)
                .and_then(WebhookSecret::new),
            reconnect_delay: args
                .reconnect_delay_ms
                .or(file.reconnect_delay_ms)
                .map_or(DEFAULT_RECONNECT_DELAY, Duration::from_millis),
            max_body: args.max_body.or(file.max_body).unwrap_or(DEFAULT_MAX_BODY),
        };

        validation::validate(&config).map_err(|errors| AppError::ConfigValidation { errors })?;
        Ok(config)
    }

    /// Broker location without credentials, for logs.
    #[must_use]
    pub fn broker_display(&self) -> String {
        Url::parse(&self.amqp_url).map_or_else(
            |_| "<invalid>".to_string(),
            |url| {
                let host = url.host_str().unwrap_or_default();
                match url.port() {
                    Some(port) => format!("{}://{host}:{port}{}", url.scheme(), url.path()),
                    None => format!("{}://{host}{}", url.scheme(), url.path()),
                }
            },
        )
    }
}
