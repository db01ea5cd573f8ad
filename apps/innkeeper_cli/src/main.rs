use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use innkeeper_core::{load_settings, ConsoleHandle, InnkeeperConsole};
use shared::{
    domain::{Reservation, ReservationId, TenantConfig, TenantId},
    protocol::ReservationDecision,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "innkeeper", about = "Tenant reservation console")]
struct Cli {
    /// Overrides the tenant API base url from settings.
    #[arg(long)]
    tenant_api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Tenants,
    Reservations {
        /// Show decided reservations instead of pending ones.
        #[arg(long)]
        history: bool,
    },
    Approve {
        reservation_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Raw JSON body forwarded to the approve call.
        #[arg(long)]
        payload: Option<String>,
    },
    Deny {
        reservation_id: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        notes: Option<String>,
    },
    UpdateConfig {
        tenant_id: String,
        /// Tenant configuration as a JSON object.
        #[arg(long)]
        config: String,
    },
}

fn print_reservations(reservations: &[Reservation]) {
    if reservations.is_empty() {
        println!("no reservations");
        return;
    }
    for reservation in reservations {
        println!(
            "{}\t{}\t{} <{}>\t{}",
            reservation.reservation_id,
            reservation.state,
            reservation.contact_name,
            reservation.contact_email,
            reservation.tenant_name.as_deref().unwrap_or("-"),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.tenant_api_url {
        settings.tenant_api_url = url;
    }
    let console = InnkeeperConsole::from_settings(&settings)?;

    match cli.command {
        Command::Tenants => {
            console.list_tenants().await?;
            for tenant in console.tenants().await {
                println!(
                    "{}\t{}\twallet_id={}",
                    tenant.tenant_id,
                    tenant.tenant_name.as_deref().unwrap_or("-"),
                    tenant.wallet_id
                );
            }
        }
        Command::Reservations { history } => {
            console.list_reservations().await?;
            if history {
                print_reservations(&console.reservation_history().await);
            } else {
                print_reservations(&console.current_reservations().await);
            }
        }
        Command::Approve {
            reservation_id,
            email,
            name,
            payload,
        } => {
            let payload = payload
                .map(|raw| serde_json::from_str::<ReservationDecision>(&raw))
                .transpose()
                .context("--payload must be a JSON object")?;
            let result = console
                .approve_reservation(&ReservationId::new(reservation_id), &email, &name, payload)
                .await?;
            match &result.reservation_pwd {
                Some(password) => println!("approved; one-time password: {}", password.expose()),
                None => println!("approved; no password was issued"),
            }
        }
        Command::Deny {
            reservation_id,
            email,
            name,
            notes,
        } => {
            let payload = notes.map(ReservationDecision::with_notes);
            console
                .deny_reservation(&ReservationId::new(reservation_id), &email, &name, payload)
                .await?;
            println!("denied");
        }
        Command::UpdateConfig { tenant_id, config } => {
            let value = serde_json::from_str(&config).context("--config must be valid JSON")?;
            let config = TenantConfig::from_value(value)
                .ok_or_else(|| anyhow!("--config must be a JSON object"))?;
            console
                .update_tenant_config(&TenantId::new(tenant_id), &config)
                .await?;
            println!("config updated");
        }
    }

    if !console.notifier().drain(NOTIFICATION_DRAIN_TIMEOUT).await {
        warn!(
            "cli: exiting with pending status notifications pending={}",
            console.notifier().pending()
        );
    }

    Ok(())
}
