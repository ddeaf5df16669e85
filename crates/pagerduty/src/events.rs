//! `PagerDuty` Events API v2 types.
//!
//! Manual triggers go to `<events base>/enqueue` with a routing key rather
//! than account credentials.
//!
//! # Usage
//!
//! ```no_run
//! use pagerduty::{PagerDutyApi, PagerDutyClient, TriggerAlarmRequest};
//!
//! # async fn example(client: PagerDutyClient) -> Result<(), pagerduty::PagerDutyError> {
//! let request = TriggerAlarmRequest::new(
//!     "R0UT1NGK3Y",
//!     "https://backstage.example.com/catalog/default/component/checkout",
//!     "Checkout is returning 500s",
//! )
//! .with_user_name("Ada Lovelace");
//!
//! let response = client.trigger_alarm(&request).await?;
//! let accepted = response.json::<pagerduty::EventsApiResponse>()?;
//! println!("dedup key: {}", accepted.dedup_key);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

/// Default `PagerDuty` Events API v2 base URL.
pub const DEFAULT_EVENTS_BASE_URL: &str = "https://events.pagerduty.com/v2";

/// Client name reported with manual triggers.
pub const TRIGGER_CLIENT: &str = "Backstage";

/// Event class reported with manual triggers.
pub const TRIGGER_CLASS: &str = "manual trigger";

/// `PagerDuty` event action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// Trigger a new incident or add to existing
    Trigger,
    /// Acknowledge an incident
    Acknowledge,
    /// Resolve an incident
    Resolve,
}

/// `PagerDuty` event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    /// Critical severity
    Critical,
    /// Error severity
    Error,
    /// Warning severity
    Warning,
    /// Info severity
    Info,
}

/// A manual "create incident" request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerAlarmRequest {
    /// Routing key of the target service integration.
    pub integration_key: String,
    /// Where the alarm was raised from, usually the catalog page URL.
    pub source: String,
    /// Incident summary.
    pub description: String,
    /// Name of the person raising the alarm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl TriggerAlarmRequest {
    #[must_use]
    pub fn new(
        integration_key: impl Into<String>,
        source: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            integration_key: integration_key.into(),
            source: source.into(),
            description: description.into(),
            user_name: None,
        }
    }

    /// Set the name of the person raising the alarm.
    #[must_use]
    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// Missing routing key or summary, the two fields the Events API rejects.
    pub(crate) fn validation_error(&self) -> Option<&'static str> {
        if self.integration_key.trim().is_empty() {
            Some("integration key must not be empty")
        } else if self.description.trim().is_empty() {
            Some("description must not be empty")
        } else {
            None
        }
    }

    /// Build the Events API v2 body for this request.
    pub(crate) fn to_event(&self) -> EventBody<'_> {
        EventBody {
            event_action: EventAction::Trigger,
            routing_key: &self.integration_key,
            client: TRIGGER_CLIENT,
            client_url: &self.source,
            payload: EventPayload {
                summary: &self.description,
                source: &self.source,
                severity: EventSeverity::Error,
                class: TRIGGER_CLASS,
                custom_details: CustomDetails {
                    user: self.user_name.as_deref(),
                },
            },
        }
    }
}

// =============================================================================
// API types
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct EventBody<'a> {
    event_action: EventAction,
    routing_key: &'a str,
    client: &'static str,
    client_url: &'a str,
    payload: EventPayload<'a>,
}

#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    summary: &'a str,
    source: &'a str,
    severity: EventSeverity,
    class: &'static str,
    custom_details: CustomDetails<'a>,
}

#[derive(Debug, Serialize)]
struct CustomDetails<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<&'a str>,
}

/// Body returned by the Events API on `202 Accepted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsApiResponse {
    /// `success` when the event was queued.
    pub status: String,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
    /// Key grouping this event with later acknowledge/resolve events.
    #[serde(default)]
    pub dedup_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trigger_body() {
        let request = TriggerAlarmRequest::new("key-123", "https://portal/checkout", "It broke")
            .with_user_name("Ada");
        let body = serde_json::to_value(request.to_event()).unwrap();

        assert_eq!(
            body,
            json!({
                "event_action": "trigger",
                "routing_key": "key-123",
                "client": "Backstage",
                "client_url": "https://portal/checkout",
                "payload": {
                    "summary": "It broke",
                    "source": "https://portal/checkout",
                    "severity": "error",
                    "class": "manual trigger",
                    "custom_details": {"user": "Ada"}
                }
            })
        );
    }

    #[test]
    fn test_trigger_body_without_user() {
        let request = TriggerAlarmRequest::new("key-123", "portal", "It broke");
        let json = serde_json::to_string(&request.to_event()).unwrap();

        assert!(json.contains("\"custom_details\":{}"));
        assert!(json.contains("\"severity\":\"error\""));
    }

    #[test]
    fn test_validation() {
        assert!(TriggerAlarmRequest::new("key", "src", "desc")
            .validation_error()
            .is_none());
        assert_eq!(
            TriggerAlarmRequest::new(" ", "src", "desc").validation_error(),
            Some("integration key must not be empty")
        );
        assert_eq!(
            TriggerAlarmRequest::new("key", "src", "").validation_error(),
            Some("description must not be empty")
        );
    }
}
