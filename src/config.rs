//! Broker connection configuration.

use std::time::Duration;

/// Configuration for a `BrokerSession` connection.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Broker server URLs.
    pub servers: Vec<String>,
    /// Client name reported to the broker (the service identity).
    pub name: String,
    /// Optional username/password. Both must be present to enable auth.
    pub credentials: Option<Credentials>,
    /// Delay between reconnect attempts.
    pub reconnect_wait: Duration,
    /// Reconnect attempts before `connect()` gives up.
    pub max_reconnect_attempts: usize,
    /// Per-publish acknowledgement timeout.
    pub publish_timeout: Duration,
}

/// Broker username/password pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl BrokerConfig {
    /// Build a config for `name`, reading `NATS_URL`, `NATS_USERNAME`, and
    /// `NATS_PASSWORD` from the process environment. Mirrors the original
    /// Python client's `os.getenv` fallbacks.
    pub fn from_env(name: impl Into<String>) -> Self {
        let servers = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let credentials = match (std::env::var("NATS_USERNAME"), std::env::var("NATS_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        Self {
            servers,
            name: name.into(),
            credentials,
            ..Self::defaults()
        }
    }

    /// Config with hardcoded defaults, for use in tests that must not
    /// depend on process environment.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::defaults()
        }
    }

    fn defaults() -> Self {
        Self {
            servers: vec!["nats://localhost:4222".to_string()],
            name: "event-bus-client".to_string(),
            credentials: None,
            reconnect_wait: Duration::from_secs(2),
            max_reconnect_attempts: 10,
            publish_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_spec_defaults() {
        let cfg = BrokerConfig::new("wallet_service");
        assert_eq!(cfg.servers, vec!["nats://localhost:4222".to_string()]);
        assert_eq!(cfg.name, "wallet_service");
        assert!(cfg.credentials.is_none());
        assert_eq!(cfg.reconnect_wait, Duration::from_secs(2));
        assert_eq!(cfg.max_reconnect_attempts, 10);
        assert_eq!(cfg.publish_timeout, Duration::from_secs(5));
    }
}
