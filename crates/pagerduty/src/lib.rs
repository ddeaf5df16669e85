//! PagerDuty client for on-call, incident and service data.
//!
//! This crate provides:
//! - A REST client reaching PagerDuty through a credential-holding proxy
//! - Manual incident triggering through the Events API v2
//! - Type definitions for services, incidents, change events and on-calls
//! - Status classification into unauthorized / not found / generic failure
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  base_url("proxy")  ┌──────────────┐
//! │  PagerDutyClient │────────────────────►│ DiscoveryApi │
//! │  (PagerDutyApi)  │                     └──────────────┘
//! │                  │  HttpRequest        ┌──────────────┐     ┌───────────┐
//! │                  │────────────────────►│   FetchApi   │────►│   proxy   │──► PagerDuty
//! └──────────────────┘◄────────────────────└──────────────┘     └───────────┘
//!          │              HttpResponse
//!          ▼
//!      classify: 401 → Unauthorized, 404 → NotFound, !2xx → Request
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pagerduty::{ClientConfig, PagerDutyApi, PagerDutyClient, ReqwestFetch, StaticDiscovery};
//!
//! # async fn example() -> Result<(), pagerduty::PagerDutyError> {
//! let client = PagerDutyClient::new(
//!     Arc::new(StaticDiscovery::new("http://localhost:7007/api")),
//!     Arc::new(ReqwestFetch::new()?),
//!     ClientConfig::from_env(),
//! );
//!
//! let service = client.get_service_by_id("PSVC123").await?;
//! let incidents = client.list_active_incidents_by_service_id(&service.id).await?;
//! let oncalls = client
//!     .list_on_calls_by_policy_id(&service.escalation_policy.id)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)] // Every API method can fail the same ways

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod transport;

pub use api::PagerDutyApi;
pub use client::{classify, PagerDutyClient};
pub use config::ClientConfig;
pub use error::PagerDutyError;
pub use events::{EventAction, EventSeverity, EventsApiResponse, TriggerAlarmRequest};
pub use models::*;
pub use transport::{
    DiscoveryApi, FetchApi, HttpRequest, HttpResponse, ReqwestFetch, StaticDiscovery,
};
