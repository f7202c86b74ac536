//! Canonical event envelope: identity, ordering, versioning.
//!
//! Wire format matches spec.md §6 exactly — `id`, `type`, `source`,
//! `subject`, `timestamp`, `data`, `metadata`, `version` — so any other
//! consumer of the `EVENTS` stream speaking JSON understands it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::DecodeError;

const DEFAULT_VERSION: &str = "1.0.0";

/// Canonical event record. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Universally unique id, carried verbatim through redeliveries.
    pub id: String,
    /// Dotted lowercase event type, e.g. `payment.completed`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Service identifier that produced the event.
    pub source: String,
    /// Free-form routing hint (order id, user id). Not used for dispatch.
    #[serde(default)]
    pub subject: Option<String>,
    /// Producer wall-clock at construction.
    pub timestamp: DateTime<Utc>,
    /// Payload, schema per `type`.
    pub data: HashMap<String, Value>,
    /// Cross-cutting tags (correlation id, user agent, trace id).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Payload schema version.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl Envelope {
    /// Construct a new envelope. Fills `id` with a fresh UUID, `timestamp`
    /// with now-UTC, and `version` with `"1.0.0"`.
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            source: source.into(),
            subject: None,
            timestamp: Utc::now(),
            data,
            metadata: HashMap::new(),
            version: default_version(),
        }
    }

    /// Attach a routing-hint subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attach cross-cutting metadata tags.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Canonical JSON encoding.
    pub fn encode(&self) -> Vec<u8> {
        // Field set is fixed and always serialisable (String/DateTime/Value
        // only), so this cannot fail.
        serde_json::to_vec(self).expect("Envelope always serialises")
    }

    /// Decode from bytes. Unknown fields are ignored (forward-compatible);
    /// an unrecognised `type` string is preserved verbatim — dispatching
    /// on it is the handler's responsibility, not this crate's.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        if envelope.id.is_empty() {
            return Err(DecodeError::MissingField("id"));
        }
        if envelope.event_type.is_empty() {
            return Err(DecodeError::MissingField("type"));
        }
        if envelope.source.is_empty() {
            return Err(DecodeError::MissingField("source"));
        }
        Ok(envelope)
    }

    /// NATS subject this envelope publishes under: `events.<source>.<type>`.
    pub fn subject_for_publish(&self) -> String {
        format!("events.{}.{}", self.source, self.event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> HashMap<String, Value> {
        let mut data = HashMap::new();
        data.insert("user_id".to_string(), Value::String("u1".to_string()));
        data.insert("tokens_used".to_string(), serde_json::json!(2500));
        data
    }

    #[test]
    fn new_fills_defaults() {
        let envelope = Envelope::new("session.tokens_used", "session_service", sample_data());
        assert!(!envelope.id.is_empty());
        assert_eq!(envelope.version, "1.0.0");
        assert!(envelope.subject.is_none());
        assert!(envelope.metadata.is_empty());
    }

    #[test]
    fn round_trip_is_lossless() {
        let envelope = Envelope::new("payment.completed", "payment_service", sample_data())
            .with_subject("order-42")
            .with_metadata(HashMap::from([("trace_id".to_string(), "t-1".to_string())]));

        let decoded = Envelope::decode(&envelope.encode()).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn subject_derivation_matches_source_and_type() {
        let envelope = Envelope::new("payment.completed", "payment_service", HashMap::new());
        assert_eq!(envelope.subject_for_publish(), "events.payment_service.payment.completed");
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let err = Envelope::decode(b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn decode_rejects_missing_required_fields() {
        let payload = serde_json::json!({"type": "payment.completed"});
        let err = Envelope::decode(&serde_json::to_vec(&payload).unwrap());
        assert!(err.is_err());
    }

    #[test]
    fn unknown_type_string_survives_decode() {
        let envelope = Envelope::new("future.event.not_yet_known", "payment_service", HashMap::new());
        let decoded = Envelope::decode(&envelope.encode()).unwrap();
        assert_eq!(decoded.event_type, "future.event.not_yet_known");
    }
}
