//! Console configuration
//!
//! Built from environment variables with defaults for a local development
//! service. Components take it by reference; nothing reads the environment
//! after startup.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_API_KEY: &str = "change-me-in-production";
pub const DEFAULT_CLIENT_LABEL: &str = "honeypot-console";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_OVERVIEW_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_THREAT_LANDSCAPE_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_RECENT_ACTIVITY_INTERVAL: Duration = Duration::from_secs(3);

/// Configuration for the console client
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Base URL including the API prefix (e.g. `http://host:8000/api/v1`)
    pub api_url: String,
    /// Sent as `X-API-Key` on every request
    pub api_key: String,
    /// Per-request timeout; expiry is reported as a network error
    pub request_timeout: Duration,
    pub overview_interval: Duration,
    pub threat_landscape_interval: Duration,
    pub recent_activity_interval: Duration,
    /// Network graph polling is off unless an interval is configured
    pub network_graph_interval: Option<Duration>,
    /// Identifies this client in the `metadata` of new conversations
    pub client_label: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            overview_interval: DEFAULT_OVERVIEW_INTERVAL,
            threat_landscape_interval: DEFAULT_THREAT_LANDSCAPE_INTERVAL,
            recent_activity_interval: DEFAULT_RECENT_ACTIVITY_INTERVAL,
            network_graph_interval: None,
            client_label: DEFAULT_CLIENT_LABEL.to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; unparseable values keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |name: &str| -> Option<Duration> {
            let raw = lookup(name)?;
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
                _ => {
                    tracing::warn!(variable = name, value = %raw, "Ignoring invalid duration");
                    None
                }
            }
        };

        Self {
            api_url: lookup("HONEYPOT_API_URL").unwrap_or(defaults.api_url),
            api_key: lookup("HONEYPOT_API_KEY").unwrap_or(defaults.api_key),
            request_timeout: millis("HONEYPOT_TIMEOUT_MS").unwrap_or(defaults.request_timeout),
            overview_interval: millis("HONEYPOT_OVERVIEW_INTERVAL_MS")
                .unwrap_or(defaults.overview_interval),
            threat_landscape_interval: millis("HONEYPOT_LANDSCAPE_INTERVAL_MS")
                .unwrap_or(defaults.threat_landscape_interval),
            recent_activity_interval: millis("HONEYPOT_ACTIVITY_INTERVAL_MS")
                .unwrap_or(defaults.recent_activity_interval),
            network_graph_interval: millis("HONEYPOT_NETWORK_INTERVAL_MS"),
            client_label: lookup("HONEYPOT_CLIENT_LABEL").unwrap_or(defaults.client_label),
        }
    }
}
