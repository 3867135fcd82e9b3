//! Junos Space REST client.
//!
//! Talks to the Space platform API (`/api/space/...`) and the Security
//! Director API (`/api/juniper/sd/...`) over HTTPS with basic auth. Requests
//! and replies are small XML documents; every state-changing call returns the
//! id of the job Space starts for it, which [`SpaceClient::job`] polls.

mod devices;
mod policy;
mod software;

pub use devices::{Device, DeviceRef};
pub use policy::{Address, Policy, PolicyRef, SecurityDevice, Variable};
pub use software::{SoftwarePackage, SoftwareUpgrade};

use crate::config::SpaceConfig;
use crate::error::{Error, Result};
use crate::xml::{find, number, text};
use reqwest::{Client, Method, StatusCode};
use roxmltree::Document;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Content Types
// ============================================================================

/// Requests that carry a vendor-specific body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceOperation {
    DiscoverDevices,
    ExecDeploy,
    ExecRemove,
    ExecStage,
    ExecResync,
    UpdateDevices,
    Publish,
    Variable,
}

/// Content-Type per operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypes {
    types: HashMap<SpaceOperation, String>,
}

impl ContentTypes {
    /// Override the content type of one operation.
    pub fn with(mut self, operation: SpaceOperation, content_type: impl Into<String>) -> Self {
        self.types.insert(operation, content_type.into());
        self
    }

    pub fn get(&self, operation: SpaceOperation) -> &str {
        self.types
            .get(&operation)
            .map(String::as_str)
            .unwrap_or("application/xml")
    }
}

impl Default for ContentTypes {
    fn default() -> Self {
        let types = [
            (
                SpaceOperation::DiscoverDevices,
                "application/vnd.net.juniper.space.device-management.discover-devices+xml;version=2;charset=UTF-8",
            ),
            (
                SpaceOperation::ExecDeploy,
                "application/vnd.net.juniper.space.software-management.exec-deploy+xml;version=1;charset=UTF-8",
            ),
            (
                SpaceOperation::ExecRemove,
                "application/vnd.net.juniper.space.software-management.exec-remove+xml;version=1;charset=UTF-8",
            ),
            (
                SpaceOperation::ExecStage,
                "application/vnd.net.juniper.space.software-management.exec-stage+xml;version=1;charset=UTF-8",
            ),
            (
                SpaceOperation::ExecResync,
                "application/vnd.net.juniper.space.device-management.exec-resync+xml;version=1",
            ),
            (
                SpaceOperation::UpdateDevices,
                "application/vnd.juniper.sd.device-management.update-devices+xml;version=1;charset=UTF-8",
            ),
            (
                SpaceOperation::Publish,
                "application/vnd.juniper.sd.fwpolicy-management.publish+xml;version=1;charset=UTF-8",
            ),
            (
                SpaceOperation::Variable,
                "application/vnd.juniper.sd.variable-management.variable-definition+xml;version=1;charset=UTF-8",
            ),
        ];

        Self {
            types: types
                .into_iter()
                .map(|(op, ct)| (op, ct.to_string()))
                .collect(),
        }
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// State of a Space job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    /// `INPROGRESS`, `DONE`, ...
    pub state: String,
    /// `SUCCESS`, `FAILURE`, ...
    pub status: String,
    pub percent_complete: f64,
}

impl Job {
    pub fn is_done(&self) -> bool {
        self.state.eq_ignore_ascii_case("DONE")
    }
}

/// Job id from a job-starting reply such as `<task><id>1234</id></task>`.
pub(crate) fn parse_job_id(body: &str) -> Result<u64> {
    let doc = Document::parse(body)?;
    find(doc.root_element(), "id")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse().ok())
        .ok_or_else(|| Error::UnexpectedReply(format!("no job id in reply: {}", body.trim())))
}

// ============================================================================
// Client
// ============================================================================

/// Builder for [`SpaceClient`].
pub struct SpaceClientBuilder {
    base_url: String,
    username: String,
    password: String,
    accept_invalid_certs: bool,
    timeout: Duration,
    content_types: ContentTypes,
}

impl SpaceClientBuilder {
    /// Point at a different API root, e.g. a mock server in tests.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Skip TLS certificate verification.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn content_types(mut self, content_types: ContentTypes) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn build(self) -> Result<SpaceClient> {
        let mut base = self.base_url;
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| Error::InvalidArgument(format!("Invalid Space URL '{}': {}", base, e)))?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(format!("junos/{}", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()?;

        Ok(SpaceClient {
            client,
            base_url,
            username: self.username,
            password: self.password,
            content_types: self.content_types,
        })
    }
}

/// HTTP client for one Junos Space server.
pub struct SpaceClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
    content_types: ContentTypes,
}

impl std::fmt::Debug for SpaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpaceClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .finish()
    }
}

impl SpaceClient {
    /// Client for `https://{host}/api/` with default settings.
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self> {
        Self::builder(host, username, password).build()
    }

    pub fn builder(host: &str, username: &str, password: &str) -> SpaceClientBuilder {
        SpaceClientBuilder {
            base_url: format!("https://{}/api/", host),
            username: username.to_string(),
            password: password.to_string(),
            accept_invalid_certs: false,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            content_types: ContentTypes::default(),
        }
    }

    pub fn from_config(config: &SpaceConfig) -> Result<Self> {
        Self::builder(&config.host, &config.username, &config.password)
            .accept_invalid_certs(config.accept_invalid_certs)
            .build()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Current state of a job.
    pub async fn job(&self, id: u64) -> Result<Job> {
        let body = self.get(&format!("space/job-management/jobs/{}", id)).await?;
        let doc = Document::parse(&body)?;
        let root = doc.root_element();
        Ok(Job {
            id: number(root, "id"),
            name: text(root, "name"),
            state: text(root, "job-state"),
            status: text(root, "job-status"),
            percent_complete: number(root, "percent-complete"),
        })
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    pub(crate) async fn get(&self, path: &str) -> Result<String> {
        self.send(Method::GET, path, None).await
    }

    pub(crate) async fn post(
        &self,
        path: &str,
        operation: SpaceOperation,
        body: String,
    ) -> Result<String> {
        self.send(Method::POST, path, Some((operation, body))).await
    }

    pub(crate) async fn put(
        &self,
        path: &str,
        operation: SpaceOperation,
        body: String,
    ) -> Result<String> {
        self.send(Method::PUT, path, Some((operation, body))).await
    }

    pub(crate) async fn delete(&self, path: &str, operation: Option<SpaceOperation>) -> Result<()> {
        let body = operation.map(|op| (op, String::new()));
        self.send(Method::DELETE, path, body).await.map(|_| ())
    }

    /// Post a job-starting request and return the job id.
    pub(crate) async fn start_job(
        &self,
        path: &str,
        operation: SpaceOperation,
        body: String,
    ) -> Result<u64> {
        let reply = self.post(path, operation, body).await?;
        parse_job_id(&reply)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<(SpaceOperation, String)>,
    ) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::InvalidArgument(format!("Invalid Space path '{}': {}", path, e)))?;
        debug!(method = %method, url = %url, "Space request");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some((operation, body)) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, self.content_types.get(operation))
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(Error::SpaceStatus {
                status: status.as_u16(),
                body: text,
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(String::new());
        }
        Ok(text)
    }
}
