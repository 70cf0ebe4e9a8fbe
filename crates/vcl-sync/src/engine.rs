//! Concurrent upload of fragments into one target version.
//!
//! Every fragment gets its own task on a [`JoinSet`]. A task reads the file,
//! tries to create the fragment remotely, and falls back to a single update
//! when the create is refused. The engine only returns once every task has
//! reported, or once the run deadline or cancellation signal fires, in which
//! case unfinished fragments are reported as failed.

use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::feedback::Feedback;
use crate::fragment::{Fragment, FragmentResult};
use crate::service::{VersionService, with_timeout};
use crate::version::ServiceVersion;

pub const DEFAULT_MAX_CONCURRENCY: usize = 16;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Limits applied to a sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Most fragment tasks allowed to run at once. `None` runs all of them.
    pub max_concurrency: Option<usize>,
    /// Timeout for each individual service call.
    pub call_timeout: Option<Duration>,
    /// Time budget for the whole run, measured from dispatch.
    pub deadline: Option<Duration>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_concurrency: Some(DEFAULT_MAX_CONCURRENCY),
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
            deadline: None,
        }
    }
}

/// Outcome of a sync run: one result per submitted fragment, in the order
/// the fragments were submitted.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub version: ServiceVersion,
    pub results: Vec<FragmentResult>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|r| !r.succeeded())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FragmentResult> {
        self.results.iter().filter(|r| !r.succeeded())
    }
}

/// Pushes fragments into a version of a [`VersionService`].
pub struct SyncEngine<S: ?Sized> {
    service: Arc<S>,
    options: SyncOptions,
}

impl<S: VersionService + ?Sized + 'static> SyncEngine<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync every fragment into `target` and wait for all of them.
    ///
    /// Per-fragment failures never abort the run; they show up as failed
    /// results in the report.
    pub async fn sync(&self, target: ServiceVersion, fragments: Vec<Fragment>) -> SyncReport {
        self.sync_until(target, fragments, future::pending()).await
    }

    /// Like [`sync`](Self::sync), but stops waiting once `cancel` resolves.
    ///
    /// Tasks still running at that point are aborted and their fragments
    /// are reported as cancelled, so the report always holds one result per
    /// fragment.
    pub async fn sync_until<F>(
        &self,
        target: ServiceVersion,
        fragments: Vec<Fragment>,
        cancel: F,
    ) -> SyncReport
    where
        F: Future<Output = ()>,
    {
        if !target.is_editable() {
            tracing::error!(version = target.number, "refusing to write to an active version");
            let results = fragments
                .iter()
                .map(|f| {
                    FragmentResult::failed(
                        f,
                        format!("version {} is active and cannot be edited", target.number),
                        vec![],
                    )
                })
                .collect();
            return SyncReport {
                version: target,
                results,
            };
        }

        tracing::info!(
            version = target.number,
            fragments = fragments.len(),
            max_concurrency = ?self.options.max_concurrency,
            "dispatching fragment uploads"
        );

        let limiter = self
            .options
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS))));

        let mut tasks = JoinSet::new();
        for (index, fragment) in fragments.iter().cloned().enumerate() {
            let service = Arc::clone(&self.service);
            let limiter = limiter.clone();
            let call_timeout = self.options.call_timeout;

            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                let result =
                    sync_fragment(service.as_ref(), target.number, &fragment, call_timeout).await;
                (index, result)
            });
        }

        let mut collected: Vec<Option<FragmentResult>> = vec![None; fragments.len()];

        let deadline = self.options.deadline.map(|budget| Instant::now() + budget);
        let expired = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => future::pending().await,
            }
        };
        tokio::pin!(expired);
        tokio::pin!(cancel);

        let interrupted = loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, result))) => collected[index] = Some(result),
                    Some(Err(err)) => tracing::error!(error = %err, "fragment task ended abnormally"),
                    None => break None,
                },
                _ = &mut expired => break Some("run deadline reached before the upload finished"),
                _ = &mut cancel => break Some("cancelled before the upload finished"),
            }
        };

        if let Some(reason) = interrupted {
            tracing::warn!(pending = tasks.len(), reason, "abandoning unfinished fragment uploads");
            tasks.abort_all();
        }

        let missing = interrupted.unwrap_or("fragment task ended without a result");
        let results = collected
            .into_iter()
            .zip(&fragments)
            .map(|(result, fragment)| {
                result.unwrap_or_else(|| FragmentResult::failed(fragment, missing, vec![]))
            })
            .collect();

        SyncReport {
            version: target,
            results,
        }
    }
}

/// Upload one fragment: read it, create it, and update it if the create is
/// refused. Exactly one update is attempted.
async fn sync_fragment<S: VersionService + ?Sized>(
    service: &S,
    version: u32,
    fragment: &Fragment,
    call_timeout: Option<Duration>,
) -> FragmentResult {
    let content = match tokio::fs::read_to_string(&fragment.path).await {
        Ok(content) => content,
        Err(err) => {
            return FragmentResult::failed(
                fragment,
                format!(
                    "could not read local fragment {}: {err}",
                    fragment.path.display()
                ),
                vec![],
            );
        }
    };

    let created = with_timeout(
        call_timeout,
        service.create_fragment(version, &fragment.name, &content),
    )
    .await;

    let create_error = match created {
        Ok(remote) => {
            tracing::debug!(fragment = %fragment.name, version, "created fragment");
            return FragmentResult::uploaded(fragment, remote.content, vec![]);
        }
        Err(err) => err,
    };

    tracing::warn!(
        fragment = %fragment.name,
        version,
        error = %create_error,
        "create failed, falling back to update"
    );
    let mut feedback = vec![Feedback::warning(format!(
        "could not create '{}' ({create_error}), updating it instead",
        fragment.name
    ))];

    match with_timeout(
        call_timeout,
        service.update_fragment(version, &fragment.name, &content),
    )
    .await
    {
        Ok(remote) => {
            tracing::debug!(fragment = %fragment.name, version, "updated fragment");
            feedback.push(Feedback::info(format!(
                "updated existing fragment '{}'",
                fragment.name
            )));
            FragmentResult::uploaded(fragment, remote.content, feedback)
        }
        Err(err) => FragmentResult::failed(fragment, err.to_string(), feedback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let ok = Fragment::from_path("ok.vcl");
        let bad = Fragment::from_path("bad.vcl");
        let report = SyncReport {
            version: ServiceVersion::new(2, false),
            results: vec![
                FragmentResult::uploaded(&ok, "x".into(), vec![]),
                FragmentResult::failed(&bad, "nope", vec![]),
            ],
        };

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());
        assert_eq!(report.failures().next().unwrap().name, "bad");
    }

    #[test]
    fn default_options_are_bounded() {
        let options = SyncOptions::default();
        assert_eq!(options.max_concurrency, Some(DEFAULT_MAX_CONCURRENCY));
        assert_eq!(options.call_timeout, Some(DEFAULT_CALL_TIMEOUT));
        assert_eq!(options.deadline, None);
    }
}
