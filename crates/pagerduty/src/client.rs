//! PagerDuty client implementation.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::api::PagerDutyApi;
use crate::config::{ClientConfig, PROXY_PLUGIN_ID};
use crate::error::PagerDutyError;
use crate::events::TriggerAlarmRequest;
use crate::models::{
    ChangeEvent, ChangeEventsResponse, Incident, IncidentStatus, IncidentsResponse, OnCall,
    OnCallsResponse, Service, ServiceResponse, ServicesResponse,
};
use crate::transport::{DiscoveryApi, FetchApi, HttpRequest, HttpResponse};

/// Media type selecting version 2 of the REST API.
const PAGERDUTY_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

const JSON: &str = "application/json";

/// Number of change events fetched per service.
const RECENT_CHANGE_EVENTS_LIMIT: &str = "5";

/// PagerDuty client reaching the REST API through a proxy.
///
/// Holds only immutable configuration, so a single instance can be cloned
/// into and shared between concurrent tasks.
#[derive(Clone)]
pub struct PagerDutyClient {
    discovery: Arc<dyn DiscoveryApi>,
    fetch: Arc<dyn FetchApi>,
    config: ClientConfig,
}

impl PagerDutyClient {
    /// Create a client from its transport capabilities.
    #[must_use]
    pub fn new(
        discovery: Arc<dyn DiscoveryApi>,
        fetch: Arc<dyn FetchApi>,
        config: ClientConfig,
    ) -> Self {
        Self {
            discovery,
            fetch,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `<proxy>/<proxy path>/<segments...>`, each segment percent-encoded.
    async fn api_url(&self, segments: &[&str]) -> Result<Url, PagerDutyError> {
        let base = self.discovery.base_url(PROXY_PLUGIN_ID).await?;
        let raw = format!("{}{}", base.trim_end_matches('/'), self.config.proxy_path());
        let mut url = parse_url(&raw)?;
        url.path_segments_mut()
            .map_err(|()| PagerDutyError::InvalidUrl(raw.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make a GET request and decode the JSON body.
    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, PagerDutyError> {
        let url = with_query(url, query);
        let request = HttpRequest::get(url)
            .header(ACCEPT, PAGERDUTY_ACCEPT)
            .header(CONTENT_TYPE, JSON);

        let response = self.request(request).await?;
        response.json().map_err(|e| {
            warn!(error = %e, body = %response.text(), "Failed to parse PagerDuty response");
            e
        })
    }

    /// Send a request and classify the response status.
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, PagerDutyError> {
        debug!(method = %request.method, url = %request.url, "PagerDuty request");
        let response = self.fetch.fetch(request).await?;
        classify(response)
    }
}

/// Map a response onto the client's error taxonomy.
///
/// 401 and 404 become [`PagerDutyError::Unauthorized`] and
/// [`PagerDutyError::NotFound`] regardless of body; any other non-2xx becomes
/// [`PagerDutyError::Request`]. Successful responses pass through untouched.
pub fn classify(response: HttpResponse) -> Result<HttpResponse, PagerDutyError> {
    match response.status {
        StatusCode::UNAUTHORIZED => {
            warn!("PagerDuty rejected credentials");
            Err(PagerDutyError::Unauthorized)
        }
        StatusCode::NOT_FOUND => Err(PagerDutyError::NotFound),
        status if status.is_success() => Ok(response),
        status => {
            let err = PagerDutyError::from_status(status.as_u16(), &response.body);
            warn!(status = %status, error = %err, "PagerDuty request failed");
            Err(err)
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, PagerDutyError> {
    Url::parse(raw).map_err(|e| PagerDutyError::InvalidUrl(format!("{raw}: {e}")))
}

fn with_query(mut url: Url, query: &[(&str, &str)]) -> Url {
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    url
}

/// Query shared by the service lookups.
const SERVICE_INCLUDES: [(&str, &str); 3] = [
    ("time_zone", "UTC"),
    ("include[]", "integrations"),
    ("include[]", "escalation_policies"),
];

#[async_trait]
impl PagerDutyApi for PagerDutyClient {
    #[instrument(skip(self))]
    async fn find_services_by_integration_key(
        &self,
        integration_key: &str,
    ) -> Result<Vec<Service>, PagerDutyError> {
        let url = self.api_url(&["services"]).await?;
        let mut query = SERVICE_INCLUDES.to_vec();
        query.push(("query", integration_key));

        let response: ServicesResponse = self.get(url, &query).await?;
        debug!(count = response.services.len(), "Retrieved services");
        Ok(response.services)
    }

    #[instrument(skip(self))]
    async fn get_service_by_id(&self, service_id: &str) -> Result<Service, PagerDutyError> {
        let url = self.api_url(&["services", service_id]).await?;
        let response: ServiceResponse = self.get(url, &SERVICE_INCLUDES).await?;
        Ok(response.service)
    }

    #[instrument(skip(self))]
    async fn list_active_incidents_by_service_id(
        &self,
        service_id: &str,
    ) -> Result<Vec<Incident>, PagerDutyError> {
        let url = self.api_url(&["incidents"]).await?;
        let mut query = vec![("time_zone", "UTC"), ("sort_by", "created_at")];
        query.extend(IncidentStatus::ACTIVE.iter().map(|s| ("statuses[]", s.as_str())));
        query.push(("service_ids[]", service_id));

        let response: IncidentsResponse = self.get(url, &query).await?;
        debug!(count = response.incidents.len(), "Retrieved active incidents");
        Ok(response.incidents)
    }

    #[instrument(skip(self))]
    async fn list_recent_change_events_by_service_id(
        &self,
        service_id: &str,
    ) -> Result<Vec<ChangeEvent>, PagerDutyError> {
        let url = self
            .api_url(&["services", service_id, "change_events"])
            .await?;
        let query = [
            ("limit", RECENT_CHANGE_EVENTS_LIMIT),
            ("time_zone", "UTC"),
            ("sort_by", "timestamp"),
        ];

        let response: ChangeEventsResponse = self.get(url, &query).await?;
        Ok(response.change_events)
    }

    #[instrument(skip(self))]
    async fn list_on_calls_by_policy_id(
        &self,
        policy_id: &str,
    ) -> Result<Vec<OnCall>, PagerDutyError> {
        let url = self.api_url(&["oncalls"]).await?;
        let query = [
            ("time_zone", "UTC"),
            ("include[]", "users"),
            ("escalation_policy_ids[]", policy_id),
        ];

        let response: OnCallsResponse = self.get(url, &query).await?;
        Ok(response.oncalls)
    }

    #[instrument(skip(self, request), fields(source = %request.source))]
    async fn trigger_alarm(
        &self,
        request: &TriggerAlarmRequest,
    ) -> Result<HttpResponse, PagerDutyError> {
        if let Some(reason) = request.validation_error() {
            return Err(PagerDutyError::InvalidRequest(reason.to_string()));
        }

        let url = parse_url(&format!("{}/enqueue", self.config.events_base_url()))?;
        let http_request = HttpRequest::post(url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .json(&request.to_event())?;

        let response = self.request(http_request).await?;
        info!(status = %response.status, "PagerDuty alarm triggered");
        Ok(response)
    }
}
