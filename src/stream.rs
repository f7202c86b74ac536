//! Provisions the shared `EVENTS` stream. Idempotent — safe to call from
//! every service's startup path, mirroring the original Python client's
//! `_ensure_stream` which tolerates "stream already exists" as success.
//!
//! Grounded on `src/jetstream.rs`'s stream-provisioning shape, generalised
//! from cim-infrastructure's per-domain streams to the spec's single
//! cross-service `EVENTS` stream (spec.md §6).

use std::time::Duration;

use async_nats::jetstream::stream::{Config as StreamConfig, DiscardPolicy};
use async_nats::jetstream::Context;
use tracing::{info, warn};

use crate::errors::StreamError;

pub const STREAM_NAME: &str = "EVENTS";
const MAX_AGE: Duration = Duration::from_secs(604_800);
const MAX_BYTES: i64 = 104_857_600;
const DUPLICATE_WINDOW: Duration = Duration::from_secs(120);

/// Ensures the `EVENTS` stream exists with the configuration spec.md §6
/// fixes: subjects `events.>`, file storage, 7-day max age, 100MiB cap,
/// unbounded message count, oldest-discard, 2-minute dedup window.
pub struct StreamManager;

impl StreamManager {
    /// Create the stream if absent, or leave an existing one untouched.
    /// Never returns an error that should block publishing — callers log
    /// a `StreamError` and continue; JetStream will reject individual
    /// publishes if the stream genuinely doesn't exist.
    pub async fn ensure_stream(jetstream: &Context) -> Result<(), StreamError> {
        let config = StreamConfig {
            name: STREAM_NAME.to_string(),
            subjects: vec!["events.>".to_string()],
            max_age: MAX_AGE,
            max_bytes: MAX_BYTES,
            max_messages: -1,
            discard: DiscardPolicy::Old,
            duplicate_window: DUPLICATE_WINDOW,
            storage: async_nats::jetstream::stream::StorageType::File,
            ..Default::default()
        };

        match jetstream.get_or_create_stream(config).await {
            Ok(_) => {
                info!(stream = STREAM_NAME, "stream provisioned");
                Ok(())
            }
            Err(e) => {
                warn!(stream = STREAM_NAME, error = %e, "stream provisioning failed");
                Err(StreamError::ProvisioningFailed {
                    name: STREAM_NAME.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
