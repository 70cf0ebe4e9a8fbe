mod commands;
mod config;
mod logging;
mod source;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use vcl_sync_fastly::{FastlyClient, FastlyConfig};

use crate::commands::upload::{UploadArgs, UploadPlan};
use crate::config::FileConfig;

#[derive(Parser)]
#[command(name = "vcl-sync", version)]
#[command(about = "Upload VCL files to a Fastly service version")]
struct Cli {
    /// Fastly service ID
    #[arg(long, env = "FASTLY_SERVICE_ID", global = true)]
    service: Option<String>,
    /// Fastly API token
    #[arg(long, env = "FASTLY_API_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
    /// Fastly API base URL
    #[arg(long, hide = true, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the latest service version and whether it is active
    Latest,
    /// Activate a service version
    Activate {
        /// Version number to activate
        version: u32,
    },
    /// Show whether a service version is active
    Status {
        /// Version number to check
        version: u32,
    },
    /// Upload VCL files to a service version (clones the latest version by default)
    Upload(UploadArgs),
}

fn build_client(cli: &Cli, file: &FileConfig) -> Result<FastlyClient> {
    let service_id = cli
        .service
        .clone()
        .or_else(|| file.service.clone())
        .context("no service ID given; pass --service or set FASTLY_SERVICE_ID")?;
    let token = cli
        .token
        .clone()
        .context("no API token given; pass --token or set FASTLY_API_TOKEN")?;

    Ok(FastlyClient::new(FastlyConfig {
        service_id,
        token,
        api_base_url: cli.api_url.clone().or_else(|| file.api_url.clone()),
    }))
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::warn!("interrupt received, abandoning unfinished uploads");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let file_config = config::load_config();
    let client = Arc::new(build_client(&cli, &file_config)?);
    let call_timeout = config::call_timeout(&file_config);

    match cli.command {
        Command::Latest => commands::latest::run(client.as_ref(), call_timeout).await,
        Command::Activate { version } => {
            commands::activate::run(client.as_ref(), version, call_timeout).await
        }
        Command::Status { version } => {
            commands::status::run(client.as_ref(), version, call_timeout).await
        }
        Command::Upload(args) => {
            let plan = UploadPlan::new(args, &file_config)?;
            let report = commands::upload::run(client, &plan, interrupted()).await?;
            commands::upload::ensure_success(&report)
        }
    }
}
