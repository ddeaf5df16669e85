//! Configuration for the PagerDuty client.

use serde::{Deserialize, Serialize};
use std::env;

use crate::events::DEFAULT_EVENTS_BASE_URL;

/// Environment variable overriding the Events API base URL.
pub const ENV_EVENTS_BASE_URL: &str = "PAGERDUTY_EVENTS_BASE_URL";

/// Environment variable overriding the path appended to the proxy base URL.
pub const ENV_PROXY_PATH: &str = "PAGERDUTY_PROXY_PATH";

/// Path under the discovered proxy that fronts the PagerDuty REST API.
pub const DEFAULT_PROXY_PATH: &str = "/pagerduty";

/// Logical name resolved through discovery to find the proxy.
pub const PROXY_PLUGIN_ID: &str = "proxy";

/// Client configuration.
///
/// Deserializes from the `pagerduty` section of an app config, so
/// `eventsBaseUrl` maps onto [`ClientConfig::events_base_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Events API v2 base URL, used only for triggering incidents.
    #[serde(default)]
    pub events_base_url: Option<String>,
    /// Path appended to the discovered proxy URL.
    #[serde(default = "default_proxy_path")]
    pub proxy_path: String,
}

fn default_proxy_path() -> String {
    DEFAULT_PROXY_PATH.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            events_base_url: None,
            proxy_path: default_proxy_path(),
        }
    }
}

impl ClientConfig {
    /// Load overrides from environment variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            events_base_url: env::var(ENV_EVENTS_BASE_URL)
                .ok()
                .filter(|s| !s.is_empty()),
            proxy_path: env::var(ENV_PROXY_PATH)
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(default_proxy_path),
        }
    }

    /// Set the Events API base URL.
    #[must_use]
    pub fn with_events_base_url(mut self, url: impl Into<String>) -> Self {
        self.events_base_url = Some(url.into());
        self
    }

    /// Set the proxy path.
    #[must_use]
    pub fn with_proxy_path(mut self, path: impl Into<String>) -> Self {
        self.proxy_path = path.into();
        self
    }

    /// Events API base URL with any trailing slash removed.
    #[must_use]
    pub fn events_base_url(&self) -> &str {
        self.events_base_url
            .as_deref()
            .unwrap_or(DEFAULT_EVENTS_BASE_URL)
            .trim_end_matches('/')
    }

    /// Proxy path normalized to a single leading slash and no trailing one.
    #[must_use]
    pub fn proxy_path(&self) -> String {
        let trimmed = self.proxy_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.events_base_url(), "https://events.pagerduty.com/v2");
        assert_eq!(config.proxy_path(), "/pagerduty");
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"eventsBaseUrl": "https://events.eu.pagerduty.com/v2/"}"#)
                .unwrap();
        assert_eq!(config.events_base_url(), "https://events.eu.pagerduty.com/v2");
        assert_eq!(config.proxy_path(), "/pagerduty");
    }

    #[test]
    fn test_proxy_path_normalization() {
        assert_eq!(
            ClientConfig::default().with_proxy_path("pd/").proxy_path(),
            "/pd"
        );
        assert_eq!(ClientConfig::default().with_proxy_path("/").proxy_path(), "");
    }
}
