use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use vcl_sync::{VersionResolver, VersionService};

use crate::commands::report::render_status;

/// Print the highest-numbered service version and whether it is live.
pub async fn run<S: VersionService + ?Sized>(
    service: &S,
    call_timeout: Option<Duration>,
) -> Result<()> {
    let latest = VersionResolver::new(service)
        .with_call_timeout(call_timeout)
        .latest()
        .await?;

    println!(
        "Latest version of service '{}': {} ({})",
        service.service_id().yellow(),
        latest.number,
        render_status(&latest)
    );

    Ok(())
}
