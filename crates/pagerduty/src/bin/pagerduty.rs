//! PagerDuty CLI - inspect services, incidents and on-calls through the proxy.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use pagerduty::{
    on_call_users, ClientConfig, EventsApiResponse, PagerDutyApi, PagerDutyClient,
    PagerDutyEntity, PagerDutyError, ReqwestFetch, StaticDiscovery, TriggerAlarmRequest,
};

/// PagerDuty CLI - on-call, incident and service data.
#[derive(Parser)]
#[command(name = "pagerduty")]
#[command(about = "Query PagerDuty services, incidents and on-calls through a proxy")]
struct Cli {
    /// Base URL that discovery resolves plugin ids against (or set `PAGERDUTY_PROXY_URL`).
    #[arg(long, env = "PAGERDUTY_PROXY_URL", default_value = "http://localhost:7007/api")]
    proxy_url: String,

    /// Path appended to the proxy URL.
    #[arg(long, env = "PAGERDUTY_PROXY_PATH", default_value = "/pagerduty")]
    proxy_path: String,

    /// Events API v2 base URL (or set `PAGERDUTY_EVENTS_BASE_URL`).
    #[arg(long, env = "PAGERDUTY_EVENTS_BASE_URL")]
    events_base_url: Option<String>,

    /// REST API token, for calling PagerDuty directly instead of through a proxy.
    #[arg(long, env = "PAGERDUTY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "PAGERDUTY_TIMEOUT_SECS", default_value = "30")]
    timeout: u64,

    /// Print raw JSON instead of a table.
    #[arg(long, default_value = "false")]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find services matching an integration key.
    Services {
        /// Integration key.
        #[arg(long)]
        integration_key: String,
    },

    /// Get a service by ID.
    Service {
        /// Service ID.
        #[arg(long)]
        id: String,
    },

    /// Resolve a service from catalog annotations.
    Entity {
        /// Entity name.
        #[arg(long, default_value = "")]
        name: String,

        /// Value of the `pagerduty.com/integration-key` annotation.
        #[arg(long)]
        integration_key: Option<String>,

        /// Value of the `pagerduty.com/service-id` annotation.
        #[arg(long)]
        service_id: Option<String>,
    },

    /// List triggered and acknowledged incidents for a service.
    Incidents {
        /// Service ID.
        #[arg(long)]
        service_id: String,
    },

    /// List the most recent change events for a service.
    ChangeEvents {
        /// Service ID.
        #[arg(long)]
        service_id: String,
    },

    /// List users on call for an escalation policy.
    Oncalls {
        /// Escalation policy ID.
        #[arg(long)]
        policy_id: String,
    },

    /// Trigger an incident through the Events API.
    Trigger {
        /// Routing key of the target service integration.
        #[arg(long)]
        integration_key: String,

        /// Where the alarm is raised from.
        #[arg(long)]
        source: String,

        /// Incident summary.
        #[arg(long)]
        description: String,

        /// Name of the person raising the alarm.
        #[arg(long, env = "USER")]
        user_name: Option<String>,

        /// Skip confirmation prompt.
        #[arg(long, short = 'y', default_value = "false")]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = build_client(&cli)?;
    let json = cli.json;

    match cli.command {
        Commands::Services { integration_key } => {
            let services = client
                .find_services_by_integration_key(&integration_key)
                .await
                .map_err(explain)?;
            if json {
                return print_json(&services);
            }

            println!("\n{:<12} {:<30} {:<30}", "ID", "NAME", "ESCALATION POLICY");
            println!("{}", "-".repeat(74));
            for service in services {
                println!(
                    "{:<12} {:<30} {:<30}",
                    service.id,
                    service.name,
                    service.escalation_policy.display_name()
                );
            }
            println!();
        }

        Commands::Service { id } => {
            let service = client.get_service_by_id(&id).await.map_err(explain)?;
            if json {
                return print_json(&service);
            }
            print_service(&service);
        }

        Commands::Entity {
            name,
            integration_key,
            service_id,
        } => {
            let entity = PagerDutyEntity {
                name,
                integration_key,
                service_id,
            };
            let service = client
                .get_service_by_entity(&entity)
                .await
                .map_err(explain)?;
            if json {
                return print_json(&service);
            }
            print_service(&service);
        }

        Commands::Incidents { service_id } => {
            let incidents = client
                .list_active_incidents_by_service_id(&service_id)
                .await
                .map_err(explain)?;
            if json {
                return print_json(&incidents);
            }
            if incidents.is_empty() {
                println!("\n✅ Nice! No incidents found!\n");
                return Ok(());
            }

            println!(
                "\n{:<10} {:<14} {:<22} {}",
                "ID", "STATUS", "CREATED", "TITLE"
            );
            println!("{}", "-".repeat(80));
            for incident in incidents {
                println!(
                    "{:<10} {:<14} {:<22} {}",
                    incident.id,
                    incident.status,
                    incident.created_at.format("%Y-%m-%d %H:%M UTC"),
                    incident.title
                );
            }
            println!();
        }

        Commands::ChangeEvents { service_id } => {
            let events = client
                .list_recent_change_events_by_service_id(&service_id)
                .await
                .map_err(explain)?;
            if json {
                return print_json(&events);
            }
            if events.is_empty() {
                println!("\nNo change events found.\n");
                return Ok(());
            }

            println!();
            for event in events {
                println!(
                    "{}  {}",
                    event.timestamp.format("%Y-%m-%d %H:%M UTC"),
                    event.summary
                );
                if let Some(source) = &event.source {
                    println!("   source: {source}");
                }
                for link in &event.links {
                    println!(
                        "   🔗 {} {}",
                        link.text.as_deref().unwrap_or("link"),
                        link.href
                    );
                }
            }
            println!();
        }

        Commands::Oncalls { policy_id } => {
            let oncalls = client
                .list_on_calls_by_policy_id(&policy_id)
                .await
                .map_err(explain)?;
            if json {
                return print_json(&oncalls);
            }

            let users = on_call_users(&oncalls);
            if users.is_empty() {
                println!("\n⚠️  Empty escalation policy\n");
                return Ok(());
            }

            println!("\n{:<12} {:<30} {}", "ID", "NAME", "EMAIL");
            println!("{}", "-".repeat(74));
            for user in users {
                println!("{:<12} {:<30} {}", user.id, user.display_name(), user.email);
            }
            println!();
        }

        Commands::Trigger {
            integration_key,
            source,
            description,
            user_name,
            yes,
        } => {
            if !yes {
                println!("⚠️  This will open a new incident in PagerDuty.");
                println!("   Use --yes to confirm.");
                return Ok(());
            }

            let mut request = TriggerAlarmRequest::new(integration_key, source, description);
            if let Some(user_name) = user_name {
                request = request.with_user_name(user_name);
            }

            info!(source = %request.source, "Triggering alarm");
            let response = client.trigger_alarm(&request).await.map_err(explain)?;

            match response.json::<EventsApiResponse>() {
                Ok(accepted) => {
                    if json {
                        return print_json(&accepted);
                    }
                    println!("\n✅ Alarm triggered ({})", accepted.message);
                    println!("   Dedup key: {}", accepted.dedup_key);
                }
                Err(e) => {
                    debug!(error = %e, body = %response.text(), "Unexpected Events API body");
                    println!("\n✅ Alarm triggered (HTTP {})", response.status);
                }
            }
        }
    }

    Ok(())
}

fn build_client(cli: &Cli) -> Result<PagerDutyClient> {
    let mut fetch = ReqwestFetch::with_timeout(Duration::from_secs(cli.timeout))
        .context("Failed to create HTTP client")?;
    if let Some(token) = &cli.token {
        fetch = fetch.with_token(token);
    }

    let mut config = ClientConfig::default().with_proxy_path(&cli.proxy_path);
    if let Some(url) = &cli.events_base_url {
        config = config.with_events_base_url(url);
    }

    debug!(proxy_url = %cli.proxy_url, proxy_path = %config.proxy_path(), "Client configured");

    Ok(PagerDutyClient::new(
        Arc::new(StaticDiscovery::new(&cli.proxy_url)),
        Arc::new(fetch),
        config,
    ))
}

/// Attach setup hints to the distinguished failures.
fn explain(err: PagerDutyError) -> anyhow::Error {
    let hint = match err {
        PagerDutyError::Unauthorized => {
            "Missing or invalid PagerDuty token. Check the proxy configuration or --token."
        }
        PagerDutyError::NotFound => "Not found in PagerDuty. Check the service or policy ID.",
        PagerDutyError::MissingAnnotation => {
            "Pass --integration-key or --service-id to locate the service."
        }
        other => return other.into(),
    };
    anyhow::Error::new(err).context(hint)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to encode JSON")?;
    println!("{out}");
    Ok(())
}

fn print_service(service: &pagerduty::Service) {
    println!("\n🛎️  Service: {}", service.name);
    println!("   ID:       {}", service.id);
    println!("   URL:      {}", service.html_url);
    println!(
        "   Policy:   {} ({})",
        service.escalation_policy.display_name(),
        service.escalation_policy.id
    );
    if let Some(key) = &service.integration_key {
        println!("   Key:      {key}");
    }
    for integration in &service.integrations {
        println!("   🔌 {} ({})", integration.summary, integration.id);
    }
    println!();
}
