//! Error types for the event-bus core.
//!
//! Each module that can fail gets its own `thiserror` enum rather than one
//! catch-all — callers matching on `PublishError` never need to know that
//! `SubscribeError` variants exist. Broker-side failures are carried as
//! their `Display` string rather than the underlying `async-nats` error
//! type, same as the teacher's `InfrastructureError` — the wire boundary
//! here is "the broker said no", not a specific NATS client internal.

use thiserror::Error;

/// Errors from `BrokerSession` connect/close.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("could not reach broker at {servers}: {reason}")]
    Unreachable { servers: String, reason: String },

    #[error("broker connection closed")]
    Closed,
}

/// Errors from `StreamManager::ensure_stream`.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to provision stream {name}: {reason}")]
    ProvisioningFailed { name: String, reason: String },
}

/// Errors from `Publisher::publish`.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("not connected to broker")]
    NotConnected,

    #[error("publish to {subject} timed out after {timeout_secs}s")]
    Timeout { subject: String, timeout_secs: u64 },

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("broker rejected publish to {subject}: {reason}")]
    Rejected { subject: String, reason: String },
}

/// Errors from `SubscriptionEngine::subscribe` and its pump loop.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("not connected to broker")]
    NotConnected,

    #[error("failed to create consumer for {subject}: {reason}")]
    ConsumerCreation { subject: String, reason: String },

    #[error("failed to fetch messages: {0}")]
    Fetch(String),

    #[error("failed to ack message: {0}")]
    Ack(String),
}

/// Envelope decode failure. Kept standalone (rather than folded into
/// `SubscribeError`) because `Envelope::decode` is also used outside the
/// subscription pump, e.g. in tests and in any future request/reply path.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid envelope JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
