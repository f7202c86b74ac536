//! Shared event-bus core for the fleet's business microservices.
//!
//! Every service embeds this crate rather than talking to NATS directly:
//! it owns the broker connection, the canonical envelope format, the
//! cross-service event-type/source registries, and the idempotency
//! bookkeeping that makes at-least-once JetStream delivery safe to build
//! on.
//!
//! # Modules
//!
//! - [`config`] — broker connection configuration
//! - [`broker`] — connection lifecycle (connect/reconnect/liveness)
//! - [`stream`] — shared `EVENTS` stream provisioning
//! - [`envelope`] — canonical event wire format
//! - [`conventions`] — event-type/source registries and naming helpers
//! - [`publisher`] — publish side
//! - [`subscription`] — subscribe side, idempotency-filtered delivery pump
//! - [`idempotency`] — bounded duplicate-delivery cache
//! - [`accessor`] — process-wide lazily-connected event bus
//! - [`errors`] — error types
//!
//! # Quick start
//!
//! ```rust,no_run
//! use fleet_eventbus::accessor::EventBusAccessor;
//! use fleet_eventbus::config::BrokerConfig;
//! use std::collections::HashMap;
//!
//! static BUS: EventBusAccessor = EventBusAccessor::new();
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = BrokerConfig::from_env("wallet_service");
//!     let bus = BUS.get_or_init(&config).await;
//!
//!     bus.publisher
//!         .publish("payment.completed", "wallet_service", HashMap::new())
//!         .await;
//! }
//! ```

pub mod accessor;
pub mod broker;
pub mod config;
pub mod conventions;
pub mod envelope;
pub mod errors;
pub mod idempotency;
pub mod publisher;
pub mod stream;
pub mod subscription;

pub use accessor::{EventBus, EventBusAccessor};
pub use broker::BrokerSession;
pub use config::{BrokerConfig, Credentials};
pub use conventions::{cascade_durable_name, EventType, SourceId, WILDCARD_AUDIT_PATTERN};
pub use envelope::Envelope;
pub use errors::{BrokerError, DecodeError, PublishError, StreamError, SubscribeError};
pub use idempotency::IdempotencyCache;
pub use publisher::Publisher;
pub use stream::StreamManager;
pub use subscription::{AckMode, DeliveryPolicy, SubscriptionConfig, SubscriptionEngine, SubscriptionHandle};

/// Crate version, exposed for services that log it at startup alongside
/// their own build info.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
