use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use vcl_sync::{VersionResolver, VersionService};

use crate::commands::report::render_status;

pub async fn run<S: VersionService + ?Sized>(
    service: &S,
    version: u32,
    call_timeout: Option<Duration>,
) -> Result<()> {
    let found = VersionResolver::new(service)
        .with_call_timeout(call_timeout)
        .status(version)
        .await
        .with_context(|| format!("could not get the status of version {version}"))?;

    println!(
        "Service '{}' version '{}' is '{}'",
        service.service_id().yellow(),
        version.to_string().yellow(),
        render_status(&found)
    );

    Ok(())
}
