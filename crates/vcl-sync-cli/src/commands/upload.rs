use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use vcl_sync::filter::{DEFAULT_MATCH_PATTERN, DEFAULT_SKIP_PATTERN};
use vcl_sync::{
    PathFilter, SyncEngine, SyncOptions, SyncReport, VersionPolicy, VersionResolver,
    VersionService, ensure_unique_names,
};

use crate::commands::report;
use crate::config::{self, FileConfig};
use crate::source::DirectorySource;

#[derive(Debug, Default, Args)]
pub struct UploadArgs {
    /// Clone this version and upload to the clone
    #[arg(long, value_name = "VERSION", conflicts_with_all = ["upload_to", "use_latest"])]
    pub clone_from: Option<u32>,
    /// Upload to this version directly (it must not be active)
    #[arg(long, value_name = "VERSION", conflicts_with = "use_latest")]
    pub upload_to: Option<u32>,
    /// Upload to the latest version directly (it must not be active)
    #[arg(long)]
    pub use_latest: bool,
    /// Directory to upload VCL files from
    #[arg(long, env = "VCL_DIRECTORY")]
    pub dir: Option<PathBuf>,
    /// Only upload paths matching this regex
    #[arg(long = "match", value_name = "REGEX", env = "VCL_MATCH_DIRECTORY")]
    pub match_pattern: Option<String>,
    /// Skip paths matching this regex
    #[arg(long, value_name = "REGEX", env = "VCL_SKIP_DIRECTORY")]
    pub skip: Option<String>,
    /// Most uploads in flight at once (0 for no limit)
    #[arg(long, value_name = "N")]
    pub max_concurrency: Option<usize>,
    /// Timeout for each API call in seconds (0 to disable)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Give up on unfinished uploads after this many seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,
    /// Activate the version once every file uploaded
    #[arg(long)]
    pub activate: bool,
}

/// Everything an upload needs, settled before any remote call is made.
#[derive(Debug)]
pub struct UploadPlan {
    pub policy: VersionPolicy,
    pub dir: PathBuf,
    pub filter: PathFilter,
    pub options: SyncOptions,
    pub activate: bool,
}

impl UploadPlan {
    pub fn new(args: UploadArgs, file: &FileConfig) -> Result<Self> {
        let policy = VersionPolicy::from_flags(args.clone_from, args.upload_to, args.use_latest)?;

        let dir = args
            .dir
            .or_else(|| file.dir.clone())
            .context("no VCL directory given; pass --dir or set VCL_DIRECTORY")?;

        let match_pattern = args
            .match_pattern
            .or_else(|| file.match_pattern.clone())
            .unwrap_or_else(|| DEFAULT_MATCH_PATTERN.to_owned());
        let skip = args
            .skip
            .or_else(|| file.skip.clone())
            .unwrap_or_else(|| DEFAULT_SKIP_PATTERN.to_owned());
        let filter = PathFilter::new(&match_pattern, &skip)?;

        let options = config::sync_options(args.max_concurrency, args.timeout, args.deadline, file);

        Ok(Self {
            policy,
            dir,
            filter,
            options,
            activate: args.activate,
        })
    }
}

/// Resolve the target version, upload every fragment, and print the results.
///
/// Fragment failures are part of the returned report; only pre-flight
/// problems (no files, name clashes, version resolution) are errors.
pub async fn run<S, F>(service: Arc<S>, plan: &UploadPlan, cancel: F) -> Result<SyncReport>
where
    S: VersionService + ?Sized + 'static,
    F: Future<Output = ()>,
{
    let source = DirectorySource::new(&plan.dir, plan.filter.clone());
    let fragments = source.fragments()?;
    if fragments.is_empty() {
        bail!("no VCL files found under {}", source.root().display());
    }
    ensure_unique_names(&fragments)?;

    let resolver =
        VersionResolver::new(service.as_ref()).with_call_timeout(plan.options.call_timeout);
    let resolution = resolver.resolve(plan.policy).await?;
    let target = resolution.target.number;

    if let Some(origin) = resolution.cloned_from {
        println!(
            "Successfully created new version {} from version {}\n",
            target.to_string().green(),
            origin
        );
    }
    println!("Uploading {} files to version {target}...", fragments.len());

    let engine = SyncEngine::new(Arc::clone(&service)).with_options(plan.options.clone());
    let report = engine.sync_until(resolution.target, fragments, cancel).await;
    report::print_report(&report);

    if plan.activate {
        if report.has_failures() {
            eprintln!(
                "{}",
                format!("warning: not activating version {target} because some files failed")
                    .yellow()
            );
        } else {
            resolver.activate(target).await?;
            println!(
                "Service '{}' now has version '{}' activated",
                service.service_id().yellow(),
                target.to_string().green()
            );
        }
    }

    Ok(report)
}

/// Turn a report with failed fragments into an error, so the process
/// exits non-zero.
pub fn ensure_success(report: &SyncReport) -> Result<()> {
    if report.has_failures() {
        bail!(
            "{} of {} files failed to upload to version {}",
            report.failed(),
            report.results.len(),
            report.version.number
        );
    }
    Ok(())
}
