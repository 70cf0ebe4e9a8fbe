use std::fmt;

/// A service version as reported by the remote listing.
///
/// Listings arrive unordered and the number is kept raw until resolution,
/// so a malformed entry surfaces as a parse error instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedVersion {
    pub number: String,
    pub active: bool,
}

impl ListedVersion {
    pub fn new(number: impl Into<String>, active: bool) -> Self {
        Self {
            number: number.into(),
            active,
        }
    }
}

/// A numbered snapshot of the remote configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceVersion {
    pub number: u32,
    pub active: bool,
}

impl ServiceVersion {
    pub fn new(number: u32, active: bool) -> Self {
        Self { number, active }
    }

    /// Only inactive versions accept fragment writes.
    pub fn is_editable(&self) -> bool {
        !self.active
    }

    pub fn status(&self) -> VersionStatus {
        if self.active {
            VersionStatus::Active
        } else {
            VersionStatus::Inactive
        }
    }
}

/// Activation state of a version, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionStatus {
    Active,
    Inactive,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "already activated"),
            Self::Inactive => write!(f, "not activated"),
        }
    }
}

/// Errors from picking the latest version out of a listing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LatestError {
    #[error("the service reported no versions")]
    Empty,

    #[error("version number {0:?} is not an integer")]
    Parse(String),
}

/// Pick the highest-numbered version from an unordered listing.
///
/// Numbers compare as integers, so `10` beats `2`. Every entry is parsed,
/// even ones that cannot win, because a malformed number means the service
/// broke its contract.
pub fn latest_version(listing: &[ListedVersion]) -> Result<ServiceVersion, LatestError> {
    let versions = listing
        .iter()
        .map(|v| {
            v.number
                .trim()
                .parse::<u32>()
                .map(|number| ServiceVersion::new(number, v.active))
                .map_err(|_| LatestError::Parse(v.number.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    versions
        .into_iter()
        .max_by_key(|v| v.number)
        .ok_or(LatestError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(numbers: &[&str]) -> Vec<ListedVersion> {
        numbers.iter().map(|n| ListedVersion::new(*n, false)).collect()
    }

    #[test]
    fn latest_compares_numerically() {
        let latest = latest_version(&listing(&["3", "1", "10"])).unwrap();
        assert_eq!(latest.number, 10);
    }

    #[test]
    fn latest_ignores_listing_order() {
        let latest = latest_version(&listing(&["10", "2", "9"])).unwrap();
        assert_eq!(latest.number, 10);
    }

    #[test]
    fn latest_keeps_active_flag() {
        let versions = vec![
            ListedVersion::new("1", false),
            ListedVersion::new("2", true),
        ];
        let latest = latest_version(&versions).unwrap();
        assert_eq!(latest, ServiceVersion::new(2, true));
    }

    #[test]
    fn empty_listing_is_an_error() {
        assert_eq!(latest_version(&[]), Err(LatestError::Empty));
    }

    #[test]
    fn malformed_number_is_an_error() {
        let result = latest_version(&listing(&["1", "two", "3"]));
        assert_eq!(result, Err(LatestError::Parse("two".into())));
    }

    #[test]
    fn negative_number_is_an_error() {
        let result = latest_version(&listing(&["-1"]));
        assert!(matches!(result, Err(LatestError::Parse(_))));
    }

    #[test]
    fn status_display() {
        assert_eq!(ServiceVersion::new(1, true).status().to_string(), "already activated");
        assert_eq!(ServiceVersion::new(1, false).status().to_string(), "not activated");
    }
}
