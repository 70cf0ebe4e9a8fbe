use std::collections::{HashMap, HashSet};
use std::future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{ListedVersion, RemoteFragment, ServiceError, ServiceVersion, VersionService};

/// A call received by [`InMemoryService`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListVersions,
    GetVersion(u32),
    CloneVersion(u32),
    ActivateVersion(u32),
    CreateFragment { version: u32, name: String },
    UpdateFragment { version: u32, name: String },
}

impl Call {
    /// True for calls that change remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::ListVersions | Self::GetVersion(_))
    }
}

/// In-memory version service for testing.
///
/// Behaves like the remote: clones copy fragments into a new inactive
/// version, active versions refuse writes, and creating an existing
/// fragment is a conflict. Failures and hangs can be scripted per
/// fragment name.
pub struct InMemoryService {
    service_id: String,
    versions: Mutex<Vec<ListedVersion>>,
    fragments: Mutex<HashMap<(u32, String), String>>,
    calls: Mutex<Vec<Call>>,
    failing_creates: HashSet<String>,
    failing_updates: HashSet<String>,
    hanging: HashSet<String>,
    stalled_versions: bool,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl InMemoryService {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            versions: Mutex::new(Vec::new()),
            fragments: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failing_creates: HashSet::new(),
            failing_updates: HashSet::new(),
            hanging: HashSet::new(),
            stalled_versions: false,
            latency: None,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_version(self, number: u32, active: bool) -> Self {
        self.with_raw_version(number.to_string(), active)
    }

    /// Add a listing entry verbatim, including malformed numbers.
    pub fn with_raw_version(self, number: impl Into<String>, active: bool) -> Self {
        self.versions
            .lock()
            .unwrap()
            .push(ListedVersion::new(number, active));
        self
    }

    pub fn with_fragment(self, version: u32, name: &str, content: &str) -> Self {
        self.fragments
            .lock()
            .unwrap()
            .insert((version, name.to_owned()), content.to_owned());
        self
    }

    /// Make every create of `name` fail with a server error.
    pub fn fail_create(mut self, name: &str) -> Self {
        self.failing_creates.insert(name.to_owned());
        self
    }

    /// Make every update of `name` fail with a server error.
    pub fn fail_update(mut self, name: &str) -> Self {
        self.failing_updates.insert(name.to_owned());
        self
    }

    /// Make creates and updates of `name` never complete.
    pub fn hang(mut self, name: &str) -> Self {
        self.hanging.insert(name.to_owned());
        self
    }

    /// Make every version call (list, get, clone, activate) never complete.
    pub fn stall_versions(mut self) -> Self {
        self.stalled_versions = true;
        self
    }

    /// Delay every fragment write by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub fn fragment(&self, version: u32, name: &str) -> Option<String> {
        self.fragments
            .lock()
            .unwrap()
            .get(&(version, name.to_owned()))
            .cloned()
    }

    pub fn version(&self, number: u32) -> Option<ServiceVersion> {
        self.find(number)
    }

    /// Highest number of fragment writes that were in progress at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn find(&self, number: u32) -> Option<ServiceVersion> {
        self.versions
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.number.parse::<u32>().ok() == Some(number))
            .map(|v| ServiceVersion::new(number, v.active))
    }

    fn editable(&self, number: u32) -> Result<(), ServiceError> {
        match self.find(number) {
            None => Err(ServiceError::NotFound(format!("version {number}"))),
            Some(v) if v.active => Err(ServiceError::Rejected {
                status: 400,
                message: format!("version {number} is locked"),
            }),
            Some(_) => Ok(()),
        }
    }

    async fn simulate_version_call(&self) {
        if self.stalled_versions {
            future::pending::<()>().await;
        }
    }

    async fn simulate_write(&self, name: &str) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.hanging.contains(name) {
            future::pending::<()>().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl VersionService for InMemoryService {
    fn service_id(&self) -> &str {
        &self.service_id
    }

    async fn list_versions(&self) -> Result<Vec<ListedVersion>, ServiceError> {
        self.record(Call::ListVersions);
        self.simulate_version_call().await;
        Ok(self.versions.lock().unwrap().clone())
    }

    async fn get_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        self.record(Call::GetVersion(number));
        self.simulate_version_call().await;
        self.find(number)
            .ok_or_else(|| ServiceError::NotFound(format!("version {number}")))
    }

    async fn clone_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        self.record(Call::CloneVersion(number));
        self.simulate_version_call().await;
        if self.find(number).is_none() {
            return Err(ServiceError::NotFound(format!("version {number}")));
        }

        let next = {
            let mut versions = self.versions.lock().unwrap();
            let next = versions
                .iter()
                .filter_map(|v| v.number.parse::<u32>().ok())
                .max()
                .unwrap_or(0)
                + 1;
            versions.push(ListedVersion::new(next.to_string(), false));
            next
        };

        let mut fragments = self.fragments.lock().unwrap();
        let copied: Vec<_> = fragments
            .iter()
            .filter(|((v, _), _)| *v == number)
            .map(|((_, name), content)| ((next, name.clone()), content.clone()))
            .collect();
        fragments.extend(copied);

        Ok(ServiceVersion::new(next, false))
    }

    async fn activate_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        self.record(Call::ActivateVersion(number));
        self.simulate_version_call().await;
        if self.find(number).is_none() {
            return Err(ServiceError::NotFound(format!("version {number}")));
        }

        for v in self.versions.lock().unwrap().iter_mut() {
            v.active = v.number.parse::<u32>().ok() == Some(number);
        }
        Ok(ServiceVersion::new(number, true))
    }

    async fn create_fragment(
        &self,
        version: u32,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError> {
        self.record(Call::CreateFragment {
            version,
            name: name.to_owned(),
        });
        self.simulate_write(name).await;

        if self.failing_creates.contains(name) {
            return Err(ServiceError::Rejected {
                status: 500,
                message: format!("create of {name} failed"),
            });
        }
        self.editable(version)?;

        let mut fragments = self.fragments.lock().unwrap();
        let key = (version, name.to_owned());
        if fragments.contains_key(&key) {
            return Err(ServiceError::Rejected {
                status: 409,
                message: "Duplicate record".into(),
            });
        }
        fragments.insert(key, content.to_owned());

        Ok(RemoteFragment {
            name: name.to_owned(),
            content: content.to_owned(),
        })
    }

    async fn update_fragment(
        &self,
        version: u32,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError> {
        self.record(Call::UpdateFragment {
            version,
            name: name.to_owned(),
        });
        self.simulate_write(name).await;

        if self.failing_updates.contains(name) {
            return Err(ServiceError::Rejected {
                status: 500,
                message: format!("update of {name} failed"),
            });
        }
        self.editable(version)?;

        let mut fragments = self.fragments.lock().unwrap();
        match fragments.get_mut(&(version, name.to_owned())) {
            Some(existing) => {
                *existing = content.to_owned();
                Ok(RemoteFragment {
                    name: name.to_owned(),
                    content: content.to_owned(),
                })
            }
            None => Err(ServiceError::NotFound(format!("fragment {name}"))),
        }
    }
}
