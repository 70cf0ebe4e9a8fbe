use serde::Deserialize;

/// A version object from the versions API.
/// `GET /service/{service_id}/version[/{number}]`
#[derive(Debug, Deserialize)]
pub struct VersionResponse {
    pub number: VersionNumber,
    #[serde(default)]
    pub active: bool,
}

/// Older API responses send version numbers as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VersionNumber {
    Int(i64),
    Text(String),
}

impl VersionNumber {
    pub fn raw(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// A VCL object echoed back after a create or update.
/// `POST /service/{service_id}/version/{number}/vcl`
#[derive(Debug, Deserialize)]
pub struct VclResponse {
    pub name: String,
    #[serde(default)]
    pub content: String,
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    pub msg: Option<String>,
    pub detail: Option<String>,
}

impl ErrorResponse {
    /// Human-readable message, preferring `msg: detail` when both exist.
    pub fn message(&self) -> Option<String> {
        match (&self.msg, &self.detail) {
            (Some(msg), Some(detail)) => Some(format!("{msg}: {detail}")),
            (Some(msg), None) => Some(msg.clone()),
            (None, Some(detail)) => Some(detail.clone()),
            (None, None) => None,
        }
    }
}
