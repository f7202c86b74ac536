//! Subscribing side of the event bus: consumer creation, the delivery
//! pump loop, idempotency filtering, and ack semantics.
//!
//! Grounded on `cim-infrastructure-nats/src/subscriber.rs`'s consumer
//! creation and message loop, generalised from its domain-specific
//! consumers to the spec's per-call `subscribe(pattern, handler)` shape
//! (spec.md §4.4/§4.5), and on the original Python client's
//! `_handle_message` for the decode→dedup→handler→ack ordering.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_nats::jetstream::consumer::{pull, AckPolicy, DeliverPolicy};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::broker::BrokerSession;
use crate::envelope::Envelope;
use crate::errors::SubscribeError;
use crate::idempotency::IdempotencyCache;
use crate::stream::STREAM_NAME;

/// Whether the pump acks automatically after invoking the handler, or
/// leaves acking to the handler's own `Result`. Opt-in per subscription
/// (spec.md §4.5) — most handlers want `Auto`; handlers doing
/// multi-step work that can fail partway want `Manual` so a failure
/// triggers redelivery instead of silent loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    Auto,
    Manual,
}

/// Where a new durable consumer starts reading from. Matches the
/// Python client's `deliver_policy` values of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Only events published after the consumer is created.
    New,
    /// The full retained history on the stream.
    All,
}

/// Options for one `subscribe` call.
#[derive(Debug, Clone)]
pub struct SubscriptionConfig {
    /// `Some(name)` for a durable consumer that survives restarts and
    /// resumes where it left off; `None` for an ephemeral consumer scoped
    /// to this process's lifetime (spec.md §4.4).
    pub durable_name: Option<String>,
    pub delivery_policy: DeliveryPolicy,
    pub ack_mode: AckMode,
}

impl SubscriptionConfig {
    pub fn ephemeral() -> Self {
        Self {
            durable_name: None,
            delivery_policy: DeliveryPolicy::New,
            ack_mode: AckMode::Auto,
        }
    }

    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            durable_name: Some(name.into()),
            delivery_policy: DeliveryPolicy::All,
            ack_mode: AckMode::Auto,
        }
    }

    pub fn with_delivery_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery_policy = policy;
        self
    }

    pub fn with_ack_mode(mut self, mode: AckMode) -> Self {
        self.ack_mode = mode;
        self
    }
}

/// Handle to a running subscription. Dropping it leaves the pump running
/// in the background (matching `tokio::spawn`'s usual detach semantics);
/// call `close` to stop it deliberately.
pub struct SubscriptionHandle {
    stop: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Stop the pump loop and wait for in-flight handler invocations to
    /// finish. Safe to call more than once.
    pub async fn close(self) {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.task.await;
    }

    /// A handle for a subscription that never started (no-op session,
    /// or subscribe failed in a context that must still return a handle).
    pub fn noop() -> Self {
        let stop = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(async {});
        Self { stop, task }
    }
}

pub struct SubscriptionEngine {
    broker: BrokerSession,
}

impl SubscriptionEngine {
    pub fn new(broker: BrokerSession) -> Self {
        Self { broker }
    }

    /// Subscribe `handler` to `subject_pattern` (a NATS subject, possibly
    /// wildcarded with `*`/`>`). Spawns a background pump task and
    /// returns immediately with a handle to stop it later.
    ///
    /// `handler` returning `Err` only matters under `AckMode::Manual`: it
    /// suppresses the ack so JetStream redelivers. Under `AckMode::Auto`
    /// the message is acked regardless and the error is only logged.
    ///
    /// `subject_pattern` is the bit appended to the `events.` prefix
    /// (e.g. `payment_service.payment.*`, `*.user.deleted`, `>`), never
    /// the full subject — this crate composes `events.<pattern>` itself.
    ///
    /// Never returns `Err` for a down broker: per spec.md §4.7/§7 a
    /// disconnected session degrades to a no-op handle instead, mirroring
    /// `Publisher::publish`'s `bool`-based degradation.
    pub async fn subscribe<F, Fut>(
        &self,
        subject_pattern: impl Into<String>,
        config: SubscriptionConfig,
        handler: F,
    ) -> Result<SubscriptionHandle, SubscribeError>
    where
        F: Fn(Envelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        if !self.broker.is_connected() {
            warn!("subscribe called while disconnected, returning no-op handle");
            return Ok(SubscriptionHandle::noop());
        }

        let subject_pattern = subject_pattern.into();
        let full_subject = format!("events.{subject_pattern}");

        let jetstream = match self.broker.jetstream() {
            Some(js) => js,
            None => {
                warn!("subscribe called while disconnected, returning no-op handle");
                return Ok(SubscriptionHandle::noop());
            }
        };

        let stream = jetstream
            .get_stream(STREAM_NAME)
            .await
            .map_err(|e| SubscribeError::ConsumerCreation {
                subject: full_subject.clone(),
                reason: e.to_string(),
            })?;

        let deliver_policy = match config.delivery_policy {
            DeliveryPolicy::New => DeliverPolicy::New,
            DeliveryPolicy::All => DeliverPolicy::All,
        };

        let consumer_config = pull::Config {
            durable_name: config.durable_name.clone(),
            filter_subject: full_subject.clone(),
            deliver_policy,
            ack_policy: AckPolicy::Explicit,
            ..Default::default()
        };

        let consumer: async_nats::jetstream::consumer::Consumer<pull::Config> = stream
            .create_consumer(consumer_config)
            .await
            .map_err(|e| SubscribeError::ConsumerCreation {
                subject: full_subject.clone(),
                reason: e.to_string(),
            })?;

        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_task = Arc::clone(&stop);
        let ack_mode = config.ack_mode;
        let cache = Arc::new(IdempotencyCache::new());
        let handler = Arc::new(handler);
        let subject_for_log = full_subject.clone();

        let task = tokio::spawn(async move {
            loop {
                if stop_for_task.load(Ordering::SeqCst) {
                    break;
                }

                let mut messages = match consumer.messages().await {
                    Ok(m) => m,
                    Err(e) => {
                        error!(subject = %subject_for_log, error = %e, "failed to open message stream");
                        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                        continue;
                    }
                };

                while let Some(message) = messages.next().await {
                    if stop_for_task.load(Ordering::SeqCst) {
                        break;
                    }

                    let message = match message {
                        Ok(m) => m,
                        Err(e) => {
                            warn!(subject = %subject_for_log, error = %e, "message fetch error");
                            continue;
                        }
                    };

                    let envelope = match Envelope::decode(&message.payload) {
                        Ok(e) => e,
                        Err(e) => {
                            warn!(subject = %subject_for_log, error = %e, "dropping undecodable message");
                            let _ = message.ack().await;
                            continue;
                        }
                    };

                    if cache.check_and_mark(&envelope.id) {
                        debug!(id = %envelope.id, "duplicate delivery suppressed");
                        let _ = message.ack().await;
                        continue;
                    }

                    let result = handler(envelope).await;

                    match (ack_mode, &result) {
                        (AckMode::Auto, _) => {
                            if let Err(e) = message.ack().await {
                                warn!(error = %e, "ack failed");
                            }
                        }
                        (AckMode::Manual, Ok(())) => {
                            if let Err(e) = message.ack().await {
                                warn!(error = %e, "ack failed");
                            }
                        }
                        (AckMode::Manual, Err(reason)) => {
                            warn!(reason = %reason, "handler failed, leaving message unacked for redelivery");
                        }
                    }
                }
            }
        });

        Ok(SubscriptionHandle { stop, task })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::BrokerSession;
    use crate::config::BrokerConfig;

    #[tokio::test]
    async fn subscribe_on_disconnected_session_degrades_to_noop_handle() {
        let config = BrokerConfig::new("subscription-test");
        let session = BrokerSession::disconnected(&config);
        let engine = SubscriptionEngine::new(session);

        let result = engine
            .subscribe("wallet_service.payment.completed", SubscriptionConfig::ephemeral(), |_envelope| async {
                Ok(())
            })
            .await;

        assert!(result.is_ok(), "subscribe must degrade rather than error when disconnected");
        result.unwrap().close().await;
    }
}
