use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use vcl_sync::{ListedVersion, RemoteFragment, ServiceError, ServiceVersion, VersionService};

use crate::wire::{ErrorResponse, VclResponse, VersionResponse};

pub const DEFAULT_API_BASE_URL: &str = "https://api.fastly.com";

/// Configuration for a Fastly service client.
#[derive(Debug, Clone)]
pub struct FastlyConfig {
    pub service_id: String,
    pub token: String,
    pub api_base_url: Option<String>,
}

/// Talks to the Fastly versions and VCL APIs for a single service.
#[derive(Debug)]
pub struct FastlyClient {
    config: FastlyConfig,
    client: reqwest::Client,
}

impl FastlyClient {
    pub fn new(config: FastlyConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_base(&self) -> &str {
        self.config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
    }

    /// Build `{base}/service/{id}/version/...`, percent-encoding each segment.
    fn version_url(&self, tail: &[&str]) -> Result<Url, ServiceError> {
        let mut url = Url::parse(self.api_base())
            .map_err(|e| ServiceError::Other(format!("invalid API base URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| ServiceError::Other("API base URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(["service", self.config.service_id.as_str(), "version"])
            .extend(tail);

        Ok(url)
    }

    fn build_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Fastly-Key", &self.config.token)
            .header("Accept", "application/json")
            .header("User-Agent", concat!("vcl-sync/", env!("CARGO_PKG_VERSION")))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ServiceError> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(what, status = status.as_u16(), "fastly response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message())
                .unwrap_or(body);

            if status.as_u16() == 404 {
                return Err(ServiceError::NotFound(format!("{what}: {message}")));
            }
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(format!("{what}: {e}")))
    }

    async fn version_call(
        &self,
        method: Method,
        number: u32,
        action: Option<&str>,
    ) -> Result<ServiceVersion, ServiceError> {
        let number_segment = number.to_string();
        let mut tail = vec![number_segment.as_str()];
        tail.extend(action);

        let url = self.version_url(&tail)?;
        let what = format!("version {number}");
        let response: VersionResponse = self.send(self.build_request(method, url), &what).await?;

        to_service_version(&response)
    }

    async fn write_vcl(
        &self,
        method: Method,
        url: Url,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError> {
        let request = self
            .build_request(method, url)
            .form(&[("name", name), ("content", content)]);

        let what = format!("vcl {name}");
        let response: VclResponse = self.send(request, &what).await?;

        Ok(RemoteFragment {
            name: response.name,
            content: response.content,
        })
    }
}

fn to_service_version(response: &VersionResponse) -> Result<ServiceVersion, ServiceError> {
    let raw = response.number.raw();
    let number = raw
        .parse::<u32>()
        .map_err(|_| ServiceError::Parse(format!("version number {raw:?} is not an integer")))?;

    Ok(ServiceVersion::new(number, response.active))
}

#[async_trait::async_trait]
impl VersionService for FastlyClient {
    fn service_id(&self) -> &str {
        &self.config.service_id
    }

    async fn list_versions(&self) -> Result<Vec<ListedVersion>, ServiceError> {
        let url = self.version_url(&[])?;
        let versions: Vec<VersionResponse> = self
            .send(self.build_request(Method::GET, url), "version list")
            .await?;

        Ok(versions
            .iter()
            .map(|v| ListedVersion::new(v.number.raw(), v.active))
            .collect())
    }

    async fn get_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        self.version_call(Method::GET, number, None).await
    }

    async fn clone_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        self.version_call(Method::PUT, number, Some("clone")).await
    }

    async fn activate_version(&self, number: u32) -> Result<ServiceVersion, ServiceError> {
        self.version_call(Method::PUT, number, Some("activate")).await
    }

    async fn create_fragment(
        &self,
        version: u32,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError> {
        let version = version.to_string();
        let url = self.version_url(&[version.as_str(), "vcl"])?;
        self.write_vcl(Method::POST, url, name, content).await
    }

    async fn update_fragment(
        &self,
        version: u32,
        name: &str,
        content: &str,
    ) -> Result<RemoteFragment, ServiceError> {
        let version = version.to_string();
        let url = self.version_url(&[version.as_str(), "vcl", name])?;
        self.write_vcl(Method::PUT, url, name, content).await
    }
}
