//! The broker connection state machine.
//!
//! ```text
//! Disconnected --connect()--> Connected --error/close--> Reconnecting
//!      ^                                                     |
//!      +------------- reconnect attempt fails ---------------+
//!                     reconnect attempt succeeds --> Connected
//! ```
//!
//! All transitions go through the [`Link`] behind a single lock, so the
//! session (connection plus channel) is installed and invalidated as one
//! value. At most one reconnect is pending at a time; its task handle is
//! kept so [`ConnectionManager::close`] can cancel it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{BrokerSession, Connector, EventSink, OutgoingMessage, SessionEvent};
use crate::error::BridgeError;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

const CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Reconnecting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub success: bool,
    pub message_id: Uuid,
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Default)]
struct Link {
    session: Option<Arc<dyn BrokerSession>>,
    /// Bumped on every installed session; events from older sessions are stale.
    generation: u64,
    shut_down: bool,
}

struct Inner {
    url: String,
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,
    link: RwLock<Link>,
    reconnecting: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
    /// Serializes declare + publish on the shared channel.
    publish_gate: tokio::sync::Mutex<()>,
}

pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                url: url.into(),
                connector,
                reconnect_delay,
                link: RwLock::new(Link::default()),
                reconnecting: AtomicBool::new(false),
                pending: Mutex::new(None),
                publish_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Open the connection and channel.
    ///
    /// Not retried on failure. Calling this after [`close`](Self::close)
    /// re-arms the manager.
    pub async fn connect(&self) -> Result<(), BridgeError> {
        self.inner.write_link().shut_down = false;
        self.inner.establish().await
    }

    /// Publish `payload` to `exchange` with `routing_key`.
    ///
    /// Fails immediately with [`BridgeError::NotConnected`] when no channel
    /// is live. Failures are never retried here and do not change the
    /// connection state.
    pub async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Result<PublishResult, BridgeError> {
        let Some(session) = self.inner.session() else {
            return Err(BridgeError::NotConnected);
        };

        let message_id = Uuid::new_v4();
        let message = OutgoingMessage {
            exchange,
            routing_key,
            payload,
            message_id,
            timestamp: unix_now(),
            content_type: CONTENT_TYPE,
            persistent: true,
        };

        let _gate = self.inner.publish_gate.lock().await;
        session
            .declare_topic_exchange(exchange)
            .await
            .map_err(BridgeError::publish_failed)?;
        session
            .publish(message)
            .await
            .map_err(BridgeError::publish_failed)?;

        Ok(PublishResult {
            success: true,
            message_id,
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        })
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.read_link().session.is_some()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else if self.inner.reconnecting.load(Ordering::Acquire) {
            ConnectionState::Reconnecting
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Tear the connection down and cancel any pending reconnect.
    ///
    /// Never fails; errors from the broker while closing are logged and
    /// dropped. Safe to call repeatedly.
    pub async fn close(&self) {
        let session = {
            let mut link = self.inner.write_link();
            link.shut_down = true;
            link.session.take()
        };
        if let Some(pending) = self.inner.lock_pending().take() {
            pending.abort();
        }
        self.inner.reconnecting.store(false, Ordering::Release);

        if let Some(session) = session {
            if let Err(e) = session.close().await {
                tracing::debug!(error = %e, "ignoring error while closing broker connection");
            }
            tracing::info!("broker connection closed");
        }
    }
}

impl Inner {
    fn read_link(&self) -> RwLockReadGuard<'_, Link> {
        self.link.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_link(&self) -> RwLockWriteGuard<'_, Link> {
        self.link.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> Option<Arc<dyn BrokerSession>> {
        self.read_link().session.clone()
    }

    async fn establish(self: &Arc<Self>) -> Result<(), BridgeError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session: Arc<dyn BrokerSession> =
            match self.connector.connect(&self.url, EventSink::new(tx)).await {
                Ok(session) => Arc::from(session),
                Err(e) => {
                    tracing::error!(error = %e, "failed to connect to broker");
                    return Err(BridgeError::connection_failed(e));
                }
            };

        let installed = {
            let mut link = self.write_link();
            if link.shut_down {
                None
            } else {
                link.generation += 1;
                let replaced = link.session.replace(Arc::clone(&session));
                // Cleared under the lock so the new session's first event
                // cannot be swallowed by the debounce.
                self.reconnecting.store(false, Ordering::Release);
                Some((link.generation, replaced))
            }
        };

        let Some((generation, replaced)) = installed else {
            // close() won the race against this attempt.
            if let Err(e) = session.close().await {
                tracing::debug!(error = %e, "ignoring error while discarding connection");
            }
            return Err(BridgeError::connection_failed("connection manager is closed"));
        };

        if let Some(old) = replaced {
            tokio::spawn(close_quietly(old));
        }
        watch_events(Arc::downgrade(self), generation, rx);
        tracing::info!(generation, "connected to broker");
        Ok(())
    }

    fn on_event(self: &Arc<Self>, generation: u64, event: SessionEvent) {
        match &event {
            SessionEvent::Error(message) => {
                tracing::warn!(generation, error = %message, "broker connection error");
            }
            SessionEvent::Closed => tracing::warn!(generation, "broker connection closed"),
        }
        self.schedule_reconnect(generation);
    }

    fn schedule_reconnect(self: &Arc<Self>, generation: u64) {
        let invalidated = {
            let mut link = self.write_link();
            if link.shut_down || link.generation != generation || link.session.is_none() {
                tracing::debug!(generation, "ignoring event from a retired connection");
                return;
            }
            if self
                .reconnecting
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                tracing::debug!(generation, "reconnect already pending");
                return;
            }
            link.session.take()
        };

        if let Some(session) = invalidated {
            tokio::spawn(close_quietly(session));
        }

        let delay = self.reconnect_delay;
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "reconnecting to broker"
        );

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let superseded = {
                let link = inner.read_link();
                link.shut_down || link.session.is_some()
            };
            // The flag stays set until the single attempt has finished, so
            // triggers arriving meanwhile are dropped.
            if superseded || inner.establish().await.is_err() {
                inner.reconnecting.store(false, Ordering::Release);
            }
        });
        if let Some(previous) = self.lock_pending().replace(handle) {
            previous.abort();
        }
    }
}

fn watch_events(
    inner: Weak<Inner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            inner.on_event(generation, event);
        }
    });
}

async fn close_quietly(session: Arc<dyn BrokerSession>) {
    if let Err(e) = session.close().await {
        tracing::debug!(error = %e, "ignoring error while closing stale connection");
    }
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}
