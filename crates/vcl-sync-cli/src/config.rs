use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vcl_sync::SyncOptions;
use vcl_sync::engine::{DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_CONCURRENCY};

/// Defaults read from the optional config file.
///
/// Every field is optional; flags and environment variables win over
/// anything set here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub service: Option<String>,
    pub dir: Option<PathBuf>,
    #[serde(rename = "match")]
    pub match_pattern: Option<String>,
    pub skip: Option<String>,
    /// `0` removes the cap.
    pub max_concurrency: Option<usize>,
    /// `0` disables the per-call timeout.
    pub request_timeout_secs: Option<u64>,
    pub deadline_secs: Option<u64>,
    pub api_url: Option<String>,
}

/// Config file path: `~/.config/vcl-sync/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vcl-sync").join("config.toml"))
}

/// Load config from the default path, falling back to defaults if missing.
pub fn load_config() -> FileConfig {
    match config_path() {
        Some(path) => load_from(&path),
        None => FileConfig::default(),
    }
}

pub fn load_from(path: &Path) -> FileConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return FileConfig::default();
    };

    match toml::from_str::<FileConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config, using defaults"
            );
            FileConfig::default()
        }
    }
}

/// Sync limits from flags, then the config file, then built-in defaults.
pub fn sync_options(
    max_concurrency: Option<usize>,
    timeout_secs: Option<u64>,
    deadline_secs: Option<u64>,
    file: &FileConfig,
) -> SyncOptions {
    let max_concurrency = max_concurrency
        .or(file.max_concurrency)
        .unwrap_or(DEFAULT_MAX_CONCURRENCY);
    let call_timeout = timeout_secs
        .or(file.request_timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_CALL_TIMEOUT);
    let deadline = deadline_secs.or(file.deadline_secs);

    SyncOptions {
        max_concurrency: (max_concurrency > 0).then_some(max_concurrency),
        call_timeout: (!call_timeout.is_zero()).then_some(call_timeout),
        deadline: deadline.filter(|s| *s > 0).map(Duration::from_secs),
    }
}

/// Per-call timeout for commands that take no sync flags.
pub fn call_timeout(file: &FileConfig) -> Option<Duration> {
    sync_options(None, None, None, file).call_timeout
}
