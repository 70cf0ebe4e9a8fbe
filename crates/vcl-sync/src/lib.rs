pub mod engine;
pub mod feedback;
pub mod filter;
pub mod fragment;
pub mod resolver;
pub mod service;
pub mod version;

pub use engine::{SyncEngine, SyncOptions, SyncReport};
pub use feedback::{Feedback, Level};
pub use filter::{FilterError, PathFilter};
pub use fragment::{
    Fragment, FragmentError, FragmentOutcome, FragmentResult, ensure_unique_names, fragment_name,
};
pub use resolver::{Resolution, ResolveError, VersionPolicy, VersionResolver};
pub use service::{RemoteFragment, ServiceError, VersionService};
pub use version::{LatestError, ListedVersion, ServiceVersion, VersionStatus, latest_version};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
