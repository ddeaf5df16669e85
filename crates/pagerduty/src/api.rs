//! The `PagerDutyApi` trait.

use async_trait::async_trait;
use tracing::debug;

use crate::error::PagerDutyError;
use crate::events::TriggerAlarmRequest;
use crate::models::{ChangeEvent, Incident, OnCall, PagerDutyEntity, Service};
use crate::transport::HttpResponse;

/// Read access to services, incidents, change events and on-calls, plus
/// manual incident triggering.
///
/// Every method performs a single request and never retries. Implemented by
/// [`PagerDutyClient`](crate::PagerDutyClient); stub it in tests of code that
/// consumes PagerDuty data.
#[async_trait]
pub trait PagerDutyApi: Send + Sync {
    /// Services whose search text matches `integration_key`.
    ///
    /// The upstream query is fuzzy, so the result may contain services with
    /// other keys.
    async fn find_services_by_integration_key(
        &self,
        integration_key: &str,
    ) -> Result<Vec<Service>, PagerDutyError>;

    /// A single service with integrations and escalation policy embedded.
    async fn get_service_by_id(&self, service_id: &str) -> Result<Service, PagerDutyError>;

    /// Triggered and acknowledged incidents, oldest first.
    async fn list_active_incidents_by_service_id(
        &self,
        service_id: &str,
    ) -> Result<Vec<Incident>, PagerDutyError>;

    /// The five most recent change events.
    async fn list_recent_change_events_by_service_id(
        &self,
        service_id: &str,
    ) -> Result<Vec<ChangeEvent>, PagerDutyError>;

    /// On-call entries for an escalation policy, with users embedded.
    async fn list_on_calls_by_policy_id(
        &self,
        policy_id: &str,
    ) -> Result<Vec<OnCall>, PagerDutyError>;

    /// Send a trigger event to the Events API.
    ///
    /// Not idempotent: each call opens a new incident upstream. The raw
    /// response is returned once it has passed status classification.
    async fn trigger_alarm(
        &self,
        request: &TriggerAlarmRequest,
    ) -> Result<HttpResponse, PagerDutyError>;

    /// Resolve the service a catalog entity points at.
    ///
    /// The integration key wins over the service id when both are present;
    /// the first service matching the key is used.
    async fn get_service_by_entity(
        &self,
        entity: &PagerDutyEntity,
    ) -> Result<Service, PagerDutyError> {
        if let Some(key) = entity.integration_key.as_deref() {
            debug!(entity = %entity.name, "Looking up service by integration key");
            let mut services = self.find_services_by_integration_key(key).await?;
            if services.is_empty() {
                return Err(PagerDutyError::NotFound);
            }
            let mut service = services.swap_remove(0);
            service.integration_key = Some(key.to_string());
            return Ok(service);
        }

        if let Some(id) = entity.service_id.as_deref() {
            debug!(entity = %entity.name, service_id = %id, "Looking up service by id");
            return self.get_service_by_id(id).await;
        }

        Err(PagerDutyError::MissingAnnotation)
    }
}
