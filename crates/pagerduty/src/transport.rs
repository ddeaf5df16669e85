//! Transport capabilities injected into the client.
//!
//! [`PagerDutyClient`](crate::PagerDutyClient) never talks to the network on its
//! own. It asks a [`DiscoveryApi`] where the proxy lives and hands every request
//! to a [`FetchApi`]. The defaults here are [`StaticDiscovery`] and
//! [`ReqwestFetch`]; tests substitute stubs for both.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::PagerDutyError;

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolves a logical plugin id (e.g. `proxy`) to a concrete base URL.
#[async_trait]
pub trait DiscoveryApi: Send + Sync {
    /// Base URL for `plugin_id`, without a trailing slash.
    async fn base_url(&self, plugin_id: &str) -> Result<String, PagerDutyError>;
}

/// Performs a single HTTP exchange.
#[async_trait]
pub trait FetchApi: Send + Sync {
    /// Send `request` and return whatever status the server answered with.
    ///
    /// Only transport failures are errors here; status classification is
    /// the client's job.
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, PagerDutyError>;
}

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Set a header, replacing any previous value.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, PagerDutyError> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// Request body decoded as JSON, if any.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

/// A raw response as returned by a [`FetchApi`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Response with no headers.
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, PagerDutyError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as lossy UTF-8 text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Discovery backed by a fixed base URL.
///
/// Every plugin id resolves to `<base>/<plugin_id>` unless an explicit
/// override was registered for it.
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    base_url: String,
    overrides: HashMap<String, String>,
}

impl StaticDiscovery {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: trim_slash(base_url.into()),
            overrides: HashMap::new(),
        }
    }

    /// Resolve `plugin_id` to exactly `url`.
    #[must_use]
    pub fn with_override(mut self, plugin_id: impl Into<String>, url: impl Into<String>) -> Self {
        self.overrides
            .insert(plugin_id.into(), trim_slash(url.into()));
        self
    }
}

#[async_trait]
impl DiscoveryApi for StaticDiscovery {
    async fn base_url(&self, plugin_id: &str) -> Result<String, PagerDutyError> {
        if let Some(url) = self.overrides.get(plugin_id) {
            return Ok(url.clone());
        }
        if self.base_url.is_empty() {
            return Err(PagerDutyError::Discovery(format!(
                "no base URL configured for '{plugin_id}'"
            )));
        }
        Ok(format!("{}/{plugin_id}", self.base_url))
    }
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// [`FetchApi`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestFetch {
    client: Client,
    /// Optional REST API token, for talking to PagerDuty without a proxy.
    token: Option<String>,
}

impl ReqwestFetch {
    /// Create a transport with the default timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new() -> Result<Self, PagerDutyError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a specific request timeout.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self, PagerDutyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token: None,
        })
    }

    /// Attach `Authorization: Token token=<token>` to every request that
    /// does not already carry an authorization header.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token: String = token.into();
        self.token = Some(token).filter(|t| !t.is_empty());
        self
    }
}

#[async_trait]
impl FetchApi for ReqwestFetch {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, PagerDutyError> {
        debug!(method = %request.method, url = %request.url, "HTTP request");

        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers.clone());

        if let Some(token) = &self.token {
            if !request.headers.contains_key(AUTHORIZATION) {
                builder = builder.header(AUTHORIZATION, format!("Token token={token}"));
            }
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!(status = %status, bytes = body.len(), "HTTP response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_discovery_appends_plugin_id() {
        let discovery = StaticDiscovery::new("http://localhost:7007/api/");
        let url = discovery.base_url("proxy").await.unwrap();
        assert_eq!(url, "http://localhost:7007/api/proxy");
    }

    #[tokio::test]
    async fn test_static_discovery_override() {
        let discovery = StaticDiscovery::new("http://localhost:7007/api")
            .with_override("proxy", "https://backstage.example.com/proxy/");
        let url = discovery.base_url("proxy").await.unwrap();
        assert_eq!(url, "https://backstage.example.com/proxy");
    }

    #[tokio::test]
    async fn test_static_discovery_without_base() {
        let discovery = StaticDiscovery::new("");
        assert!(matches!(
            discovery.base_url("proxy").await,
            Err(PagerDutyError::Discovery(_))
        ));
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::new(StatusCode::ACCEPTED, r#"{"status":"success"}"#);
        assert!(response.is_success());
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(response.text(), r#"{"status":"success"}"#);
    }
}
