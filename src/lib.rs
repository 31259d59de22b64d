//! hookbridge republishes HTTP requests onto an AMQP topic exchange.
//!
//! Each `POST /publish/{exchange}/{routing_key}` has its raw body published,
//! as a persistent message, to a durable topic exchange declared on demand.
//! Webhook senders can be authenticated with an HMAC-SHA256 signature
//! over the exact body bytes (`X-Hub-Signature-256`).
//!
//! # Architecture
//!
//! - [`amqp`] -- Broker connection manager: connect, publish, failure
//!   detection, and delayed reconnection behind the
//!   [`Connector`](amqp::Connector) trait.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, health).
//! - [`config`] -- Config resolution from flags, environment, and an
//!   optional file, plus validation.
//! - [`error`] -- The request error taxonomy and process-level errors.
//! - [`health`] -- `GET /health` endpoint handler.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`middleware`] -- Webhook signature verification layer.
//! - [`publish`] -- `POST /publish/{exchange}/{routing_key}` handler.
//! - [`server`] -- Axum router, shared application state, and graceful shutdown.
//! - [`signature`] -- HMAC-SHA256 signing and constant-time verification.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `sentry-integration` | Sentry error tracking |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod amqp;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod publish;
pub mod server;
pub mod signature;

#[cfg(feature = "sentry-integration")]
pub mod sentry_integration;
