use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use vcl_sync::{Fragment, PathFilter};
use walkdir::WalkDir;

/// Collects fragment files from a local directory tree.
pub struct DirectorySource {
    root: PathBuf,
    filter: PathFilter,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            root: root.into(),
            filter,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and return every accepted fragment, sorted by path.
    pub fn fragments(&self) -> Result<Vec<Fragment>> {
        if !self.root.is_dir() {
            bail!("fragment directory {} does not exist", self.root.display());
        }

        let mut fragments = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");

        for entry in walker {
            let entry = entry
                .with_context(|| format!("failed to walk {}", self.root.display()))?;

            // Symlinked files count; symlinked directories are not descended.
            if !entry.path().is_file() {
                continue;
            }

            let relative = relative_path(&self.root, entry.path());
            if self.filter.accepts(&relative) {
                fragments.push(Fragment::from_path(entry.path()));
            } else {
                tracing::debug!(path = %relative, "skipping path");
            }
        }

        Ok(fragments)
    }
}

/// Path of `path` under `root`, joined with `/` on every platform.
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
