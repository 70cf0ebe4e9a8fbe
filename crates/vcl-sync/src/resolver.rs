//! Deciding which remote version a sync run writes to.

use std::time::Duration;

use crate::engine::DEFAULT_CALL_TIMEOUT;
use crate::service::{ServiceError, VersionService, with_timeout};
use crate::version::{LatestError, ServiceVersion, latest_version};

/// How the target version for a run is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Clone the given version and write to the clone.
    CloneFrom(u32),
    /// Write straight to the given version, which must be inactive.
    UploadTo(u32),
    /// Write straight to the latest version, which must be inactive.
    UseLatest,
    /// Clone the latest version and write to the clone.
    #[default]
    CloneLatest,
}

impl VersionPolicy {
    /// Build a policy from the user's flags. At most one may be set.
    pub fn from_flags(
        clone_from: Option<u32>,
        upload_to: Option<u32>,
        use_latest: bool,
    ) -> Result<Self, ResolveError> {
        match (clone_from, upload_to, use_latest) {
            (None, None, false) => Ok(Self::CloneLatest),
            (Some(v), None, false) => Ok(Self::CloneFrom(v)),
            (None, Some(v), false) => Ok(Self::UploadTo(v)),
            (None, None, true) => Ok(Self::UseLatest),
            _ => Err(ResolveError::ConflictingPolicy),
        }
    }

    /// True if resolving this policy creates a new remote version.
    pub fn clones(&self) -> bool {
        matches!(self, Self::CloneFrom(_) | Self::CloneLatest)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("choose only one of cloning a version, uploading to a version, or using the latest")]
    ConflictingPolicy,

    #[error("version {0} is already activated and cannot be edited")]
    VersionNotEditable(u32),

    #[error("could not look up version {version}: {source}")]
    Lookup {
        version: u32,
        #[source]
        source: ServiceError,
    },

    #[error("could not clone version {version}: {source}")]
    Clone {
        version: u32,
        #[source]
        source: ServiceError,
    },

    #[error("could not activate version {version}: {source}")]
    Activate {
        version: u32,
        #[source]
        source: ServiceError,
    },

    #[error("could not list versions: {0}")]
    List(#[source] ServiceError),

    #[error("the service reported no versions")]
    EmptyVersionSet,

    #[error("the service reported a malformed version number {0:?}")]
    Parse(String),
}

impl From<LatestError> for ResolveError {
    fn from(err: LatestError) -> Self {
        match err {
            LatestError::Empty => Self::EmptyVersionSet,
            LatestError::Parse(number) => Self::Parse(number),
        }
    }
}

/// The version a run will write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub target: ServiceVersion,
    /// The version the target was cloned from, when the policy cloned.
    pub cloned_from: Option<u32>,
}

/// Applies a [`VersionPolicy`] against a service.
///
/// Every service call is bounded by the call timeout, which defaults to
/// [`DEFAULT_CALL_TIMEOUT`].
pub struct VersionResolver<'a, S: ?Sized> {
    service: &'a S,
    call_timeout: Option<Duration>,
}

impl<'a, S: VersionService + ?Sized> VersionResolver<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }

    /// Replace the per-call timeout. `None` waits indefinitely.
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Resolve the policy to one editable target version.
    ///
    /// Returns before any fragment is touched; every error here is fatal
    /// for the run.
    pub async fn resolve(&self, policy: VersionPolicy) -> Result<Resolution, ResolveError> {
        let resolution = match policy {
            VersionPolicy::CloneFrom(source) => Resolution {
                target: self.clone_version(source).await?,
                cloned_from: Some(source),
            },
            VersionPolicy::UploadTo(number) => Resolution {
                target: self.status(number).await?,
                cloned_from: None,
            },
            VersionPolicy::UseLatest => {
                let latest = self.latest_number().await?;
                Resolution {
                    target: self.status(latest).await?,
                    cloned_from: None,
                }
            }
            VersionPolicy::CloneLatest => {
                let latest = self.latest_number().await?;
                Resolution {
                    target: self.clone_version(latest).await?,
                    cloned_from: Some(latest),
                }
            }
        };

        if !resolution.target.is_editable() {
            return Err(ResolveError::VersionNotEditable(resolution.target.number));
        }

        tracing::info!(
            service = self.service.service_id(),
            ?policy,
            target = resolution.target.number,
            cloned_from = ?resolution.cloned_from,
            "resolved target version"
        );

        Ok(resolution)
    }

    /// The highest-numbered version with its current status.
    pub async fn latest(&self) -> Result<ServiceVersion, ResolveError> {
        let number = self.latest_number().await?;
        self.status(number).await
    }

    pub async fn status(&self, number: u32) -> Result<ServiceVersion, ResolveError> {
        with_timeout(self.call_timeout, self.service.get_version(number))
            .await
            .map_err(|source| ResolveError::Lookup {
                version: number,
                source,
            })
    }

    pub async fn activate(&self, number: u32) -> Result<ServiceVersion, ResolveError> {
        let version = with_timeout(self.call_timeout, self.service.activate_version(number))
            .await
            .map_err(|source| ResolveError::Activate {
                version: number,
                source,
            })?;

        tracing::info!(service = self.service.service_id(), version = number, "activated version");
        Ok(version)
    }

    async fn latest_number(&self) -> Result<u32, ResolveError> {
        let listing = with_timeout(self.call_timeout, self.service.list_versions())
            .await
            .map_err(ResolveError::List)?;

        tracing::debug!(count = listing.len(), "listed versions");

        Ok(latest_version(&listing)?.number)
    }

    async fn clone_version(&self, source: u32) -> Result<ServiceVersion, ResolveError> {
        with_timeout(self.call_timeout, self.service.clone_version(source))
            .await
            .map_err(|err| ResolveError::Clone {
                version: source,
                source: err,
            })
    }
}
