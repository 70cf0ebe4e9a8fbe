use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::version::{ListedVersion, ServiceVersion};

/// Errors that can occur when talking to the remote configuration service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// The server's echo of a fragment it accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFragment {
    pub name: String,
    pub content: String,
}

/// A remote service that stores configuration as numbered versions.
///
/// Implementations are bound to one service at construction, so callers
/// only pass version numbers. They must be safe to share between the
/// concurrent fragment tasks of a sync run.
#[async_trait::async_trait]
pub trait VersionService: Send + Sync {
    /// Identifier of the remote service this client talks to.
    fn service_id(&self) -> &str;

    /// List every version of the service, in whatever order the remote returns.
    async fn list_versions(&self) -> Result<Vec<ListedVersion>, ServiceError>;

    async fn get_version(&self, number: u32) -> Result<ServiceVersion, ServiceError>;

    /// Copy `number` into a new, inactive version and return it.
    async fn clone_version(&self, number: u32) -> Result<ServiceVersion, ServiceError>;

    async fn activate_version(&self, number: u32) -> Result<ServiceVersion, ServiceError>;

    /// Create a fragment. Fails if `name` already exists in `version`.
    async fn create_fragment(
        &self,
        version: u32,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError>;

    /// Replace the content of an existing fragment.
    async fn update_fragment(
        &self,
        version: u32,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError>;
}

#[async_trait::async_trait]
impl<T: VersionService + ?Sized> VersionService for Arc<T> {
    fn service_id(&self) -> &str {
        (**self).service_id()
    }

    async fn list_versions(&self) -> Result<Vec<ListedVersion>, ServiceError> {
        (**self).list_versions().await
    }

    async fn get_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        (**self).get_version(number).await
    }

    async fn clone_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        (**self).clone_version(number).await
    }

    async fn activate_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        (**self).activate_version(number).await
    }

    async fn create_fragment(
        &self,
        version: u32,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError> {
        (**self).create_fragment(version, name, content).await
    }

    async fn update_fragment(
        &self,
        version: u32,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError> {
        (**self).update_fragment(version, name, content).await
    }
}

/// Await a service call, giving up with [`ServiceError::Timeout`] once
/// `limit` has passed. `None` waits indefinitely.
pub async fn with_timeout<T>(
    limit: Option<Duration>,
    call: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(ServiceError::Timeout(limit))),
        None => call.await,
    }
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn timeout_maps_to_service_error() {
        let result: Result<(), ServiceError> =
            with_timeout(Some(Duration::from_millis(10)), future::pending()).await;
        assert!(matches!(result, Err(ServiceError::Timeout(_))));
    }

    #[tokio::test]
    async fn no_timeout_passes_through() {
        let result = with_timeout(None, async { Ok::<_, ServiceError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
