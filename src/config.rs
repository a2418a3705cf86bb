//! Service configuration, read once from the environment at startup.

use std::time::Duration;

use crate::error::{Error, Result};

/// Bind host variable.
pub const HOST_VAR: &str = "CLIPBOARD_BRIDGE_HOST";
/// Bind port variable.
pub const PORT_VAR: &str = "CLIPBOARD_BRIDGE_PORT";
/// API key variable.
pub const API_KEY_VAR: &str = "CLIPBOARD_BRIDGE_API_KEY";
/// Per-invocation helper timeout, in milliseconds.
pub const TIMEOUT_VAR: &str = "CLIPBOARD_BRIDGE_TIMEOUT_MS";

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port.
pub const DEFAULT_PORT: u16 = 8765;
/// Placeholder key shared with the host-side client defaults.
pub const DEFAULT_API_KEY: &str = "overlay-companion-mcp";
/// Default helper timeout.
pub const DEFAULT_HELPER_TIMEOUT: Duration = Duration::from_secs(5);

/// Immutable bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Key required on protected routes.
    pub api_key: String,
    /// Upper bound for a single backend invocation.
    pub helper_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            api_key: DEFAULT_API_KEY.into(),
            helper_timeout: DEFAULT_HELPER_TIMEOUT,
        }
    }
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup(PORT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("{PORT_VAR}={raw:?}: {e}")))?,
            None => defaults.port,
        };

        let helper_timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => {
                let ms = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| Error::Config(format!("{TIMEOUT_VAR}={raw:?}: {e}")))?;
                if ms == 0 {
                    return Err(Error::Config(format!("{TIMEOUT_VAR} must be positive")));
                }
                Duration::from_millis(ms)
            }
            None => defaults.helper_timeout,
        };

        Ok(Self {
            host: lookup(HOST_VAR).unwrap_or(defaults.host),
            port,
            api_key: lookup(API_KEY_VAR).unwrap_or(defaults.api_key),
            helper_timeout,
        })
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Whether the placeholder key is still in use.
    pub fn uses_default_api_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:8765");
        assert!(config.uses_default_api_key());
    }

    #[test]
    fn reads_every_variable() {
        let config = ServiceConfig::from_lookup(lookup(&[
            (HOST_VAR, "127.0.0.1"),
            (PORT_VAR, "9000"),
            (API_KEY_VAR, "secret"),
            (TIMEOUT_VAR, "250"),
        ]))
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.helper_timeout, Duration::from_millis(250));
        assert!(!config.uses_default_api_key());
    }

    #[test]
    fn rejects_bad_port() {
        let err = ServiceConfig::from_lookup(lookup(&[(PORT_VAR, "eighty")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(PORT_VAR));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = ServiceConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "0")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn brackets_ipv6_hosts() {
        let config = ServiceConfig {
            host: "::1".into(),
            ..ServiceConfig::default()
        };
        assert_eq!(config.bind_addr(), "[::1]:8765");
    }
}
