//! PagerDuty REST API models.
//!
//! Only the fields the client surfaces are modelled; unknown upstream fields
//! are ignored and optional ones default.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Entities
// ============================================================================

/// PagerDuty user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: String,
    /// Full name.
    #[serde(default)]
    pub name: String,
    /// Short description (the only name references carry).
    #[serde(default)]
    pub summary: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Profile URL.
    #[serde(default)]
    pub html_url: String,
}

impl User {
    /// Name, falling back to the reference summary and then the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        display_name(&self.name, &self.summary, &self.id)
    }
}

/// Escalation policy attached to a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Policy ID.
    pub id: String,
    /// Policy name.
    #[serde(default)]
    pub name: String,
    /// Short description (the only name references carry).
    #[serde(default)]
    pub summary: String,
    /// URL to policy in PagerDuty.
    #[serde(default)]
    pub html_url: String,
    /// Embedded user reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl EscalationPolicy {
    /// Name, falling back to the reference summary and then the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        display_name(&self.name, &self.summary, &self.id)
    }
}

fn display_name<'a>(name: &'a str, summary: &'a str, id: &'a str) -> &'a str {
    [name, summary].into_iter().find(|s| !s.is_empty()).unwrap_or(id)
}

/// Integration embedded in a service via `include[]=integrations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    /// Integration ID.
    pub id: String,
    /// Short description.
    #[serde(default)]
    pub summary: String,
    /// Routing key for events sent to this integration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_key: Option<String>,
}

/// PagerDuty service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service ID.
    pub id: String,
    /// Service name.
    #[serde(default)]
    pub name: String,
    /// URL to service in PagerDuty.
    #[serde(default)]
    pub html_url: String,
    /// Escalation policy for this service.
    #[serde(default)]
    pub escalation_policy: EscalationPolicy,
    /// Integration key, when the caller already knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_key: Option<String>,
    /// Embedded integrations.
    #[serde(default)]
    pub integrations: Vec<Integration>,
}

/// Lightweight service reference carried by incidents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReference {
    /// Service ID.
    pub id: String,
    /// Service summary.
    #[serde(default)]
    pub summary: String,
    /// URL to service in PagerDuty.
    #[serde(default)]
    pub html_url: String,
}

/// Incident status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Triggered, not yet acknowledged.
    Triggered,
    /// Acknowledged, someone is working on it.
    Acknowledged,
    /// Resolved.
    Resolved,
    /// Unknown status.
    #[serde(other)]
    Unknown,
}

impl IncidentStatus {
    /// Statuses that count as "active".
    pub const ACTIVE: [Self; 2] = [Self::Triggered, Self::Acknowledged];

    /// Value used in `statuses[]` query parameters.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Triggered => "triggered",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// User assigned to an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assigned user.
    pub assignee: User,
}

/// PagerDuty incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Incident ID.
    pub id: String,
    /// Current status.
    pub status: IncidentStatus,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// URL to incident in PagerDuty.
    #[serde(default)]
    pub html_url: String,
    /// Owning service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceReference>,
    /// Users assigned to this incident.
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

/// Link attached to a change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEventLink {
    pub href: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Deployment or change marker on a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Change event ID.
    pub id: String,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
    /// Summary.
    #[serde(default)]
    pub summary: String,
    /// Source that reported the change.
    #[serde(default)]
    pub source: Option<String>,
    /// URL to change event in PagerDuty.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Links supplied by the reporting tool (build, PR, ...).
    #[serde(default)]
    pub links: Vec<ChangeEventLink>,
}

/// On-call entry from `/oncalls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnCall {
    /// Escalation policy this entry belongs to.
    pub escalation_policy: EscalationPolicy,
    /// User on call.
    pub user: User,
    /// Escalation level (1 = primary).
    #[serde(default)]
    pub escalation_level: u32,
    /// Start of the on-call window, `None` for permanent entries.
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    /// End of the on-call window, `None` for permanent entries.
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// Users on call, ordered by escalation level, each listed once.
///
/// Entries on the same level keep their upstream order.
#[must_use]
pub fn on_call_users(oncalls: &[OnCall]) -> Vec<User> {
    let mut sorted: Vec<&OnCall> = oncalls.iter().collect();
    sorted.sort_by_key(|o| o.escalation_level);

    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter(|o| seen.insert(o.user.id.as_str()))
        .map(|o| o.user.clone())
        .collect()
}

// ============================================================================
// Catalog entity
// ============================================================================

/// Annotation carrying the service integration key.
pub const INTEGRATION_KEY_ANNOTATION: &str = "pagerduty.com/integration-key";

/// Annotation carrying the service id.
pub const SERVICE_ID_ANNOTATION: &str = "pagerduty.com/service-id";

/// The PagerDuty-relevant part of a catalog entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagerDutyEntity {
    /// Entity name, used for display and logging.
    pub name: String,
    /// Value of [`INTEGRATION_KEY_ANNOTATION`].
    #[serde(default)]
    pub integration_key: Option<String>,
    /// Value of [`SERVICE_ID_ANNOTATION`].
    #[serde(default)]
    pub service_id: Option<String>,
}

impl PagerDutyEntity {
    /// Build from an entity name and its annotation map.
    ///
    /// Blank annotation values are treated as absent.
    #[must_use]
    pub fn from_annotations<'a, I>(name: impl Into<String>, annotations: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut entity = Self {
            name: name.into(),
            ..Self::default()
        };
        for (key, value) in annotations {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key {
                INTEGRATION_KEY_ANNOTATION => entity.integration_key = Some(value.to_string()),
                SERVICE_ID_ANNOTATION => entity.service_id = Some(value.to_string()),
                _ => {}
            }
        }
        entity
    }
}

// ============================================================================
// Response wrappers
// ============================================================================

/// `GET /services`
#[derive(Debug, Deserialize)]
pub(crate) struct ServicesResponse {
    pub services: Vec<Service>,
}

/// `GET /services/{id}`
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceResponse {
    pub service: Service,
}

/// `GET /incidents`
#[derive(Debug, Deserialize)]
pub(crate) struct IncidentsResponse {
    pub incidents: Vec<Incident>,
}

/// `GET /services/{id}/change_events`
#[derive(Debug, Deserialize)]
pub(crate) struct ChangeEventsResponse {
    pub change_events: Vec<ChangeEvent>,
}

/// `GET /oncalls`
#[derive(Debug, Deserialize)]
pub(crate) struct OnCallsResponse {
    pub oncalls: Vec<OnCall>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: format!("User {id}"),
            summary: String::new(),
            email: format!("{id}@example.com"),
            html_url: String::new(),
        }
    }

    fn oncall(id: &str, level: u32) -> OnCall {
        OnCall {
            escalation_policy: EscalationPolicy {
                id: "EP1".to_string(),
                name: "Primary".to_string(),
                summary: String::new(),
                html_url: String::new(),
                user: None,
            },
            user: user(id),
            escalation_level: level,
            start: None,
            end: None,
        }
    }

    #[test]
    fn test_service_deserializes_reference_fields() {
        let service: Service = serde_json::from_value(json!({
            "id": "PSVC1",
            "name": "checkout",
            "html_url": "https://acme.pagerduty.com/services/PSVC1",
            "status": "active",
            "escalation_policy": {
                "id": "PEP1",
                "summary": "Checkout on-call",
                "type": "escalation_policy_reference"
            },
            "integrations": [
                {"id": "PINT1", "summary": "Events v2", "integration_key": "abc123"}
            ]
        }))
        .unwrap();

        assert_eq!(service.escalation_policy.display_name(), "Checkout on-call");
        assert_eq!(service.integrations[0].integration_key.as_deref(), Some("abc123"));
        assert!(service.integration_key.is_none());
    }

    #[test]
    fn test_full_user_carries_name_and_summary() {
        let user: User = serde_json::from_value(json!({
            "id": "PU1",
            "type": "user",
            "name": "Ada Lovelace",
            "summary": "Ada",
            "email": "ada@example.com",
            "html_url": "https://acme.pagerduty.com/users/PU1"
        }))
        .unwrap();
        assert_eq!(user.display_name(), "Ada Lovelace");

        let bare: User = serde_json::from_value(json!({"id": "PU2"})).unwrap();
        assert_eq!(bare.display_name(), "PU2");
    }

    #[test]
    fn test_change_event_links() {
        let event: ChangeEvent = serde_json::from_value(json!({
            "id": "01BX",
            "timestamp": "2020-07-17T08:42:58Z",
            "summary": "Deploy v1.2.3",
            "source": "ci",
            "links": [{"href": "https://ci.example.com/builds/42", "text": "Build"}]
        }))
        .unwrap();

        assert_eq!(event.links.len(), 1);
        assert_eq!(event.links[0].text.as_deref(), Some("Build"));
        assert!(event.html_url.is_none());
    }

    #[test]
    fn test_unknown_incident_status() {
        let status: IncidentStatus = serde_json::from_value(json!("snoozed")).unwrap();
        assert_eq!(status, IncidentStatus::Unknown);
        assert_eq!(IncidentStatus::Acknowledged.to_string(), "acknowledged");
    }

    #[test]
    fn test_oncall_permanent_window() {
        let entry: OnCall = serde_json::from_value(json!({
            "escalation_policy": {"id": "PEP1", "summary": "Ops"},
            "user": {"id": "PU1", "summary": "Ada", "email": "ada@example.com"},
            "escalation_level": 1,
            "start": null,
            "end": null
        }))
        .unwrap();

        assert_eq!(entry.user.display_name(), "Ada");
        assert!(entry.start.is_none() && entry.end.is_none());
    }

    #[test]
    fn test_on_call_users_orders_and_dedups() {
        let oncalls = vec![
            oncall("C", 2),
            oncall("A", 1),
            oncall("B", 1),
            oncall("A", 3),
        ];

        let ids: Vec<_> = on_call_users(&oncalls).into_iter().map(|u| u.id).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_entity_from_annotations() {
        let entity = PagerDutyEntity::from_annotations(
            "checkout",
            [
                (INTEGRATION_KEY_ANNOTATION, " abc123 "),
                (SERVICE_ID_ANNOTATION, ""),
                ("backstage.io/techdocs-ref", "dir:."),
            ],
        );

        assert_eq!(entity.integration_key.as_deref(), Some("abc123"));
        assert!(entity.service_id.is_none());
    }
}
