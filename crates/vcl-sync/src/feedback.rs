use std::fmt;

/// How loudly a piece of feedback should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
}

/// A message raised while a fragment was being synced that did not decide
/// its final outcome, e.g. the create failure that triggered an update.
///
/// Carried on the result instead of printed, so the reporter decides how to
/// show it and library callers can inspect or drop it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub level: Level,
    pub message: String,
}

impl Feedback {
    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: msg.into(),
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            message: msg.into(),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.level == Level::Warning
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Info => write!(f, "{}", self.message),
            Level::Warning => write!(f, "warning: {}", self.message),
        }
    }
}
