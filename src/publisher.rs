//! Publishing side of the event bus.
//!
//! Grounded on `cim-infrastructure-nats/src/publisher.rs`'s publish-with-ack
//! shape, adapted to the spec's "never panic, always degrade" contract
//! (spec.md §4.3): failures are logged and folded into a `bool`, not
//! propagated as an error the caller must handle.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::broker::BrokerSession;
use crate::envelope::Envelope;
use crate::errors::PublishError;

/// Publishes envelopes onto the shared `EVENTS` stream.
pub struct Publisher {
    broker: BrokerSession,
}

impl Publisher {
    pub fn new(broker: BrokerSession) -> Self {
        Self { broker }
    }

    /// Build and publish an envelope for `event_type` from `source`,
    /// waiting for the broker's ack up to the session's configured
    /// publish timeout. Returns `true` on a confirmed ack, `false` on any
    /// failure (disconnected, rejected, timed out) — per spec.md §4.3,
    /// publish failures must never be allowed to crash the caller.
    pub async fn publish(
        &self,
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: HashMap<String, Value>,
    ) -> bool {
        let envelope = Envelope::new(event_type, source, data);
        let timeout = self.broker.publish_timeout();
        match self.try_publish(&envelope, timeout).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "event publish failed");
                false
            }
        }
    }

    /// Same as `publish`, but with an explicit envelope and timeout, and
    /// surfaces the error instead of swallowing it. Used by `publish` and
    /// directly by callers that need to distinguish failure modes.
    pub async fn try_publish(
        &self,
        envelope: &Envelope,
        timeout: Duration,
    ) -> Result<(), PublishError> {
        if !self.broker.is_connected() {
            return Err(PublishError::NotConnected);
        }

        let subject = envelope.subject_for_publish();
        let payload = envelope.encode();
        let jetstream = self.broker.jetstream().ok_or(PublishError::NotConnected)?;

        let publish_future = jetstream.publish(subject.clone(), payload.into()).await;

        let ack_future = match publish_future {
            Ok(f) => f,
            Err(e) => {
                return Err(PublishError::Rejected {
                    subject,
                    reason: e.to_string(),
                })
            }
        };

        match tokio::time::timeout(timeout, ack_future).await {
            Ok(Ok(_ack)) => Ok(()),
            Ok(Err(e)) => Err(PublishError::Rejected {
                subject,
                reason: e.to_string(),
            }),
            Err(_) => Err(PublishError::Timeout {
                subject,
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_error_display_is_stable() {
        let err = PublishError::Timeout {
            subject: "events.wallet_service.payment.completed".to_string(),
            timeout_secs: 5,
        };
        assert_eq!(
            err.to_string(),
            "publish to events.wallet_service.payment.completed timed out after 5s"
        );
    }
}
