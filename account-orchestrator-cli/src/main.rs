//! CLI entry points for Account Orchestrator.
//!
//! Two thin subcommands over the core services:
//! - `checkin` runs one eligibility pass over all due accounts.
//! - `rotate` processes a single pending password-change request supplied
//!   as a JSON payload (file path or stdin).
//!
//! Exit code is 0 on success and 1 on failure, for the external scheduler.

use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use account_orchestrator_app::{AppConfig, HttpAccountLedger};
use account_orchestrator_core::services::{CheckinService, PasswordChangeService};
use account_orchestrator_core::types::{PasswordChangeRequest, RotationStatus};
use account_orchestrator_core::ServiceContext;
use account_orchestrator_portal::{HttpBrowserEngine, PortalClient};

#[derive(Parser)]
#[command(name = "account-orchestrator")]
#[command(about = "Account lifecycle orchestrator: daily checkin and credential rotation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one checkin pass over all currently eligible accounts
    Checkin {
        /// Maximum number of accounts to process
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Process one pending password-change request
    Rotate {
        /// Path to the request JSON payload ("-" reads stdin)
        #[arg(default_value = "-")]
        request: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the result payload.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = AppConfig::from_env().context("loading configuration")?;

    let ledger = Arc::new(
        HttpAccountLedger::new(&config.ledger_base_url, config.ledger_api_token.clone())
            .context("building ledger client")?,
    );
    let engine = Arc::new(HttpBrowserEngine::new(&config.portal_base_url));
    let portal = Arc::new(PortalClient::new(engine));
    let ctx = Arc::new(ServiceContext::new(ledger, portal));

    match cli.command {
        Command::Checkin { limit } => {
            let summary = CheckinService::new(ctx)
                .run(limit)
                .await
                .context("checkin pass failed")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(summary.failed_count == 0)
        }
        Command::Rotate { request } => {
            let payload = read_payload(&request)?;
            let request: PasswordChangeRequest =
                serde_json::from_str(&payload).context("parsing request payload")?;
            let report = PasswordChangeService::new(ctx)
                .process(&request)
                .await
                .context("rotation failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(report.status == RotationStatus::Completed)
        }
    }
}

fn read_payload(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .context("reading request payload from stdin")?;
        Ok(payload)
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("reading request payload from {source}"))
    }
}
