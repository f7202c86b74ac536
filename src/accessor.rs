//! Process-wide broker accessor.
//!
//! spec.md's Design Note on the original's module-level singleton calls
//! for an explicit struct rather than a bare global so the accessor is
//! visible in type signatures and mockable in tests, backed by a
//! `once_cell::sync::OnceCell` the way `sr-api/src/auth.rs` caches its
//! process-wide client.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::error;

use crate::broker::BrokerSession;
use crate::config::BrokerConfig;
use crate::publisher::Publisher;
use crate::stream::StreamManager;
use crate::subscription::SubscriptionEngine;

/// A connected broker plus the publisher/subscriber built on top of it.
/// This is what `EventBusAccessor::get_or_init` hands back.
#[derive(Clone)]
pub struct EventBus {
    pub session: BrokerSession,
    pub publisher: Publisher,
    pub subscriptions: Arc<SubscriptionEngine>,
}

impl EventBus {
    fn from_session(session: BrokerSession) -> Self {
        let publisher = Publisher::new(session.clone());
        let subscriptions = Arc::new(SubscriptionEngine::new(session.clone()));
        Self {
            session,
            publisher,
            subscriptions,
        }
    }
}

/// Lazily-initialised, process-wide event bus connection. One instance
/// per binary, typically held in a `static` or injected via whatever DI
/// the embedding service already uses.
///
/// If the initial connect fails, `get_or_init` still returns an `EventBus`
/// — `publish` reports failure per-call and `subscribe` returns a
/// `SubscriptionHandle` wired to a session that is never connected — so a
/// broker outage at startup degrades the embedding service instead of
/// crashing it (spec.md §4.7).
pub struct EventBusAccessor {
    cell: OnceCell<EventBus>,
}

impl EventBusAccessor {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Return the shared `EventBus`, connecting on first call. Subsequent
    /// calls (even with a different `config`) return the same instance —
    /// the config only matters for the call that wins the race to
    /// initialise.
    pub async fn get_or_init(&self, config: &BrokerConfig) -> EventBus {
        if let Some(bus) = self.cell.get() {
            return bus.clone();
        }

        let bus = match BrokerSession::connect(config).await {
            Ok(session) => {
                if let Some(jetstream) = session.jetstream() {
                    if let Err(e) = StreamManager::ensure_stream(&jetstream).await {
                        error!(error = %e, "stream provisioning failed at startup, continuing anyway");
                    }
                }
                EventBus::from_session(session)
            }
            Err(e) => {
                error!(error = %e, "broker connect failed at startup, event bus disabled");
                EventBus::from_session(degraded_session(config))
            }
        };

        // Another task may have won the race; either outcome is a valid
        // EventBus so just take whichever landed first.
        let _ = self.cell.set(bus.clone());
        self.cell.get().cloned().unwrap_or(bus)
    }
}

impl Default for EventBusAccessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a disconnected `BrokerSession` and keeps retrying the real
/// connection in the background; once one succeeds its client is adopted
/// into the returned session in place, so every clone already handed out
/// (to `Publisher`, `SubscriptionEngine`) picks it up automatically.
fn degraded_session(config: &BrokerConfig) -> BrokerSession {
    let session = BrokerSession::disconnected(config);
    let retry_target = session.clone();
    let config = config.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(config.reconnect_wait).await;
            if let Ok(connected) = BrokerSession::connect(&config).await {
                retry_target.adopt(connected);
                break;
            }
        }
    });
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Testable property #9 / scenario S6 (spec.md §8): a broker the
    /// accessor can never reach must still hand back a usable `EventBus`
    /// whose `publish` reports failure and whose `subscribe` returns a
    /// handle, never a panic or a propagated error.
    #[tokio::test]
    async fn get_or_init_degrades_gracefully_when_broker_is_unreachable() {
        let mut config = BrokerConfig::new("accessor-test");
        // Port 0 is never a listening server; connect fails fast instead
        // of hanging through the full reconnect backoff.
        config.servers = vec!["nats://127.0.0.1:0".to_string()];
        config.max_reconnect_attempts = 1;
        config.reconnect_wait = Duration::from_millis(10);

        let accessor = EventBusAccessor::new();
        let bus = accessor.get_or_init(&config).await;

        assert!(!bus.session.is_connected());

        let published = bus
            .publisher
            .publish("payment.completed", "wallet_service", HashMap::new())
            .await;
        assert!(!published);

        let handle = bus
            .subscriptions
            .subscribe(
                "wallet_service.payment.completed",
                crate::subscription::SubscriptionConfig::ephemeral(),
                |_envelope| async { Ok(()) },
            )
            .await
            .expect("subscribe must degrade rather than error");
        handle.close().await;
    }

    #[tokio::test]
    async fn get_or_init_returns_the_same_instance_on_repeat_calls() {
        let mut config = BrokerConfig::new("accessor-test-2");
        config.servers = vec!["nats://127.0.0.1:0".to_string()];
        config.max_reconnect_attempts = 1;
        config.reconnect_wait = Duration::from_millis(10);

        let accessor = EventBusAccessor::new();
        let first = accessor.get_or_init(&config).await;
        let second = accessor.get_or_init(&config).await;
        assert_eq!(first.session.name(), second.session.name());
    }
}
