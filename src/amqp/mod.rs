//! Broker connection management and the publish path.
//!
//! [`ConnectionManager`] owns the single broker connection, reacts to
//! connection failures with a delayed reconnect, and serves publish
//! requests against durable topic exchanges. The broker itself sits behind
//! the [`Connector`] and [`BrokerSession`] traits; [`LapinConnector`] is the
//! AMQP 0-9-1 implementation used in production.

pub mod lapin_connector;
pub mod manager;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::BoxError;

pub use lapin_connector::LapinConnector;
pub use manager::{ConnectionManager, ConnectionState, PublishResult, DEFAULT_RECONNECT_DELAY};

/// Asynchronous notification raised by a live broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Error(String),
    Closed,
}

/// Handle a [`Connector`] uses to report events for the session it opened.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    #[must_use]
    pub const fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    pub fn notify(&self, event: SessionEvent) {
        // The receiver is gone once the manager itself is dropped.
        let _ = self.tx.send(event);
    }
}

/// A single message ready to hand to the broker.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingMessage<'a> {
    pub exchange: &'a str,
    pub routing_key: &'a str,
    pub payload: &'a [u8],
    pub message_id: Uuid,
    /// Creation time in Unix seconds.
    pub timestamp: u64,
    pub content_type: &'static str,
    pub persistent: bool,
}

/// A live connection plus the channel used for publishing.
///
/// Both handles live and die together; the manager never holds one
/// without the other.
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Declare a durable topic exchange. Idempotent.
    async fn declare_topic_exchange(&self, exchange: &str) -> Result<(), BoxError>;

    async fn publish(&self, message: OutgoingMessage<'_>) -> Result<(), BoxError>;

    /// Close the channel, then the connection.
    async fn close(&self) -> Result<(), BoxError>;
}

// async_trait is required here because connectors are held as Arc<dyn Connector>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection and a channel over it, wiring connection error and
    /// close notifications into `events`.
    async fn connect(
        &self,
        url: &str,
        events: EventSink,
    ) -> Result<Box<dyn BrokerSession>, BoxError>;
}
