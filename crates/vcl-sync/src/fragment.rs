use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::feedback::Feedback;

/// A local fragment file and the name the remote service knows it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub path: PathBuf,
    pub name: String,
}

impl Fragment {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = fragment_name(&path);
        Self { path, name }
    }
}

/// Derive a fragment name from its path: the base file name up to the
/// first `.`, so `vcl/foo.bar.vcl` becomes `foo`.
pub fn fragment_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy())
        .unwrap_or_default();

    file_name.split('.').next().unwrap_or_default().to_owned()
}

/// Errors found while validating a fragment set before syncing.
#[derive(Debug, thiserror::Error)]
pub enum FragmentError {
    #[error("fragments {first} and {second} both map to the name {name:?}")]
    DuplicateName {
        name: String,
        first: String,
        second: String,
    },
}

/// Reject fragment sets where two paths would write the same remote name.
pub fn ensure_unique_names(fragments: &[Fragment]) -> Result<(), FragmentError> {
    let mut seen: HashMap<&str, &Path> = HashMap::with_capacity(fragments.len());

    for fragment in fragments {
        if let Some(first) = seen.insert(&fragment.name, &fragment.path) {
            return Err(FragmentError::DuplicateName {
                name: fragment.name.clone(),
                first: first.display().to_string(),
                second: fragment.path.display().to_string(),
            });
        }
    }

    Ok(())
}

/// Final state of one fragment after a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// The service accepted the write; `content` is what it echoed back.
    Uploaded { content: String },
    Failed { error: String },
}

/// The result of syncing exactly one fragment.
#[derive(Debug, Clone)]
pub struct FragmentResult {
    pub path: PathBuf,
    pub name: String,
    pub outcome: FragmentOutcome,
    pub feedback: Vec<Feedback>,
}

impl FragmentResult {
    pub(crate) fn uploaded(fragment: &Fragment, content: String, feedback: Vec<Feedback>) -> Self {
        Self {
            path: fragment.path.clone(),
            name: fragment.name.clone(),
            outcome: FragmentOutcome::Uploaded { content },
            feedback,
        }
    }

    pub(crate) fn failed(
        fragment: &Fragment,
        error: impl Into<String>,
        feedback: Vec<Feedback>,
    ) -> Self {
        Self {
            path: fragment.path.clone(),
            name: fragment.name.clone(),
            outcome: FragmentOutcome::Failed {
                error: error.into(),
            },
            feedback,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, FragmentOutcome::Uploaded { .. })
    }

    /// The failure message, if this fragment failed.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            FragmentOutcome::Failed { error } => Some(error),
            FragmentOutcome::Uploaded { .. } => None,
        }
    }
}
