use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use vcl_sync::{VersionResolver, VersionService};

pub async fn run<S: VersionService + ?Sized>(
    service: &S,
    version: u32,
    call_timeout: Option<Duration>,
) -> Result<()> {
    VersionResolver::new(service)
        .with_call_timeout(call_timeout)
        .activate(version)
        .await
        .with_context(|| format!("there was a problem activating version {version}"))?;

    println!(
        "Service '{}' now has version '{}' activated",
        service.service_id().yellow(),
        version.to_string().green()
    );

    Ok(())
}
