use regex::Regex;

/// Substring every fragment path must contain.
pub const FRAGMENT_EXTENSION: &str = ".vcl";

/// Default skip pattern: any path whose last directory segment starts
/// with four underscores.
pub const DEFAULT_SKIP_PATTERN: &str = r"(?:^|/)____[^/]*/[^/]+$";

/// Default match pattern. Empty, so it matches every path.
pub const DEFAULT_MATCH_PATTERN: &str = "";

const VCS_SEGMENT: &str = ".git";

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid {which} pattern {pattern:?}: {source}")]
    InvalidPattern {
        which: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Decides which local paths are fragments worth syncing.
///
/// Paths are matched relative to the fragment directory with `/`
/// separators, so patterns behave the same on every platform.
#[derive(Debug, Clone)]
pub struct PathFilter {
    matcher: Regex,
    skipper: Regex,
}

impl PathFilter {
    pub fn new(match_pattern: &str, skip_pattern: &str) -> Result<Self, FilterError> {
        let matcher = Regex::new(match_pattern).map_err(|source| FilterError::InvalidPattern {
            which: "match",
            pattern: match_pattern.to_owned(),
            source,
        })?;
        let skipper = Regex::new(skip_pattern).map_err(|source| FilterError::InvalidPattern {
            which: "skip",
            pattern: skip_pattern.to_owned(),
            source,
        })?;

        Ok(Self { matcher, skipper })
    }

    pub fn accepts(&self, relative_path: &str) -> bool {
        is_candidate(relative_path)
            && self.matcher.is_match(relative_path)
            && !self.skipper.is_match(relative_path)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self {
            matcher: Regex::new(DEFAULT_MATCH_PATTERN).expect("default match pattern is valid"),
            skipper: Regex::new(DEFAULT_SKIP_PATTERN).expect("default skip pattern is valid"),
        }
    }
}

/// Rules that hold regardless of user patterns: never look inside
/// version-control metadata, and only take fragment files.
pub fn is_candidate(relative_path: &str) -> bool {
    if relative_path.split('/').any(|segment| segment == VCS_SEGMENT) {
        return false;
    }

    relative_path.contains(FRAGMENT_EXTENSION)
}
