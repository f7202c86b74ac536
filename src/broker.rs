//! Broker connection lifecycle: connect, authenticate, reconnect, and
//! expose a liveness flag that publish/subscribe consult before touching
//! the network.
//!
//! Grounded on `src/nats.rs::NatsClient` (wrapper-over-`Client` shape) and
//! the original Python client's `_disconnected_callback`/
//! `_reconnected_callback` pair, which this reimplements via
//! `async-nats`'s connection event callback instead of polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_nats::{Client, ConnectOptions, Event};
use tracing::{error, info, warn};

use crate::config::BrokerConfig;
use crate::errors::BrokerError;

/// One broker connection, shared by every publisher and subscriber in the
/// process. Cheap to clone — the underlying `async_nats::Client` is
/// itself a multiplexed handle, and the connection state is shared
/// through `Arc`s so a background reconnect is visible to every clone.
#[derive(Clone)]
pub struct BrokerSession {
    client: Arc<Mutex<Option<Client>>>,
    is_connected: Arc<AtomicBool>,
    name: String,
    publish_timeout: Duration,
}

impl BrokerSession {
    /// Connect to the broker described by `config`. Retries internally per
    /// `config.max_reconnect_attempts` / `config.reconnect_wait`; fails with
    /// `BrokerError::Unreachable` only once those are exhausted.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let is_connected = Arc::new(AtomicBool::new(false));
        let flag_for_callback = Arc::clone(&is_connected);

        let mut options = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.reconnect_wait * config.max_reconnect_attempts as u32)
            .request_timeout(Some(config.publish_timeout))
            .max_reconnects(Some(config.max_reconnect_attempts))
            .event_callback(move |event| {
                let flag = Arc::clone(&flag_for_callback);
                async move {
                    match event {
                        Event::Connected => {
                            flag.store(true, Ordering::SeqCst);
                            info!("reconnected to broker");
                        }
                        Event::Disconnected => {
                            flag.store(false, Ordering::SeqCst);
                            warn!("disconnected from broker");
                        }
                        Event::ClientError(err) => {
                            error!(error = %err, "broker client error");
                        }
                        other => {
                            info!(event = ?other, "broker connection event");
                        }
                    }
                }
            });

        if let Some(creds) = &config.credentials {
            options = options.user_and_password(creds.username.clone(), creds.password.clone());
        }

        let servers = config.servers.join(",");

        let client = async_nats::connect_with_options(&servers, options)
            .await
            .map_err(|e| BrokerError::Unreachable {
                servers: servers.clone(),
                reason: e.to_string(),
            })?;

        is_connected.store(true, Ordering::SeqCst);
        info!(servers = %servers, name = %config.name, "connected to broker");

        Ok(Self {
            client: Arc::new(Mutex::new(Some(client))),
            is_connected,
            name: config.name.clone(),
            publish_timeout: config.publish_timeout,
        })
    }

    /// A session that has never connected. Used by `EventBusAccessor` when
    /// the initial connect fails, so the rest of the crate has a uniform
    /// `BrokerSession` to build a `Publisher`/`SubscriptionEngine` around
    /// instead of special-casing "no broker" throughout. Carries
    /// `config.publish_timeout` so a later `adopt`ed connection keeps
    /// publishing on the timeout the caller configured.
    pub fn disconnected(config: &BrokerConfig) -> Self {
        Self {
            client: Arc::new(Mutex::new(None)),
            is_connected: Arc::new(AtomicBool::new(false)),
            name: config.name.clone(),
            publish_timeout: config.publish_timeout,
        }
    }

    /// Replace a disconnected session's client with a freshly connected
    /// one, e.g. after a background reconnect loop succeeds. No-op if
    /// already connected.
    pub fn adopt(&self, connected: BrokerSession) {
        if let Some(client) = connected.client.lock().expect("client mutex poisoned").take() {
            *self.client.lock().expect("client mutex poisoned") = Some(client);
            self.is_connected.store(true, Ordering::SeqCst);
        }
    }

    /// Whether the underlying connection is currently up. Consulted by
    /// `Publisher`/`SubscriptionEngine` before touching the network —
    /// publishing or subscribing while down must fail fast, not hang.
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    /// The service name this session reports to the broker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-publish acknowledgement timeout from the `BrokerConfig` this
    /// session was built from.
    pub fn publish_timeout(&self) -> Duration {
        self.publish_timeout
    }

    /// JetStream context for this connection, or `None` if never
    /// connected or currently disconnected.
    pub fn jetstream(&self) -> Option<async_nats::jetstream::Context> {
        self.client
            .lock()
            .expect("client mutex poisoned")
            .as_ref()
            .map(|c| async_nats::jetstream::new(c.clone()))
    }

    /// Flush pending publishes and release the connection. Idempotent —
    /// repeated calls after the first are no-ops.
    pub async fn close(&self) -> Result<(), BrokerError> {
        if !self.is_connected() {
            return Ok(());
        }
        self.is_connected.store(false, Ordering::SeqCst);
        let client = self.client.lock().expect("client mutex poisoned").take();
        if let Some(client) = client {
            client.drain().await.map_err(|_| BrokerError::Closed)?;
        }
        info!(name = %self.name, "broker session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;

    #[test]
    fn disconnected_session_reports_not_connected() {
        let config = BrokerConfig::new("broker-test");
        let session = BrokerSession::disconnected(&config);
        assert!(!session.is_connected());
    }

    #[test]
    fn disconnected_session_has_no_jetstream_context() {
        let config = BrokerConfig::new("broker-test");
        let session = BrokerSession::disconnected(&config);
        assert!(session.jetstream().is_none());
    }

    #[test]
    fn disconnected_session_carries_configured_publish_timeout() {
        let mut config = BrokerConfig::new("broker-test");
        config.publish_timeout = Duration::from_secs(30);
        let session = BrokerSession::disconnected(&config);
        assert_eq!(session.publish_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn closing_a_disconnected_session_is_a_noop() {
        let config = BrokerConfig::new("broker-test");
        let session = BrokerSession::disconnected(&config);
        assert!(session.close().await.is_ok());
        assert!(!session.is_connected());
    }
}
