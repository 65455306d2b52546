//! repository::artifactory
//!
//! Artifactory Go repository implementation over HTTP.
//!
//! # Design
//!
//! - Publishing deploys three files per module version under
//!   `{url}/{repo}/{escaped path}/@v/`: the archive (`.zip`), the manifest
//!   (`.mod`) and a version info document (`.info`). The info file goes last
//!   so a half-finished deploy is never served as complete.
//! - Reads go through the repository's GOPROXY endpoint
//!   `{url}/api/go/{repo}/...`, the same endpoint the `go` tool uses when
//!   downloading a reusable copy.
//!
//! # Authentication
//!
//! An access token is sent as a bearer token. Without a token, user and
//! password are sent as basic credentials. Anonymous access is allowed for
//! read-only repositories.
//!
//! # Rate Limiting and Retries
//!
//! No retry happens here; a failed call surfaces to the resolver, which
//! counts the failure and moves on.

use std::fmt;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::header::{HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use tracing::debug;

use super::traits::{PublishRequest, Repository, RepositoryError};
use crate::core::types::ModuleIdentity;

/// User-Agent header value for repository requests.
const USER_AGENT_VALUE: &str = "modpub";

/// Credentials for the repository.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// No authentication.
    #[default]
    Anonymous,
    /// Access token, sent as a bearer token.
    AccessToken {
        /// Optional user the token belongs to (used for GOPROXY URLs)
        user: Option<String>,
        /// The token
        token: String,
    },
    /// User and password, sent as basic credentials.
    Basic {
        /// User name
        user: String,
        /// Password or API key
        password: String,
    },
}

// Custom Debug to avoid exposing secrets
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Anonymous => write!(f, "Anonymous"),
            Credentials::AccessToken { user, .. } => f
                .debug_struct("AccessToken")
                .field("user", user)
                .field("token", &"<redacted>")
                .finish(),
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Version info document deployed next to every module version.
#[derive(Debug, Serialize)]
struct VersionInfo<'a> {
    #[serde(rename = "Version")]
    version: &'a str,
    #[serde(rename = "Time")]
    time: String,
}

/// Artifactory repository client.
#[derive(Debug)]
pub struct ArtifactoryRepository {
    /// HTTP client for making requests
    client: Client,
    /// Base URL, e.g. `https://example.jfrog.io/artifactory`
    base_url: String,
    /// Credentials applied to every request
    credentials: Credentials,
}

impl ArtifactoryRepository {
    /// Create a client for the repository server at `base_url`.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            credentials,
        }
    }

    /// The base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GOPROXY read URL for one file of a module version.
    fn proxy_file_url(&self, repo: &str, id: &ModuleIdentity, ext: &str) -> String {
        format!(
            "{}/api/go/{}/{}/@v/{}.{}",
            self.base_url,
            repo,
            id.escaped_path(),
            id.version(),
            ext
        )
    }

    /// Deploy URL for one file of a module version.
    fn deploy_file_url(&self, repo: &str, id: &ModuleIdentity, ext: &str) -> String {
        format!(
            "{}/{}/{}/@v/{}.{}",
            self.base_url,
            repo,
            id.escaped_path(),
            id.version(),
            ext
        )
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        match &self.credentials {
            Credentials::Anonymous => builder,
            Credentials::AccessToken { token, .. } => builder.bearer_auth(token),
            Credentials::Basic { user, password } => builder.basic_auth(user, Some(password)),
        }
    }

    async fn put(
        &self,
        url: &str,
        body: Vec<u8>,
        content_type: &'static str,
    ) -> Result<(), RepositoryError> {
        debug!(url, bytes = body.len(), "deploying");
        let response = self
            .authorize(self.client.put(url))
            .header(CONTENT_TYPE, HeaderValue::from_static(content_type))
            .body(body)
            .send()
            .await
            .map_err(|e| RepositoryError::NetworkError(e.to_string()))?;
        check_status(response).await.map(|_| ())
    }

    /// GET a file, mapping 404 to `None`.
    async fn get_optional(&self, url: &str) -> Result<Option<Vec<u8>>, RepositoryError> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| RepositoryError::NetworkError(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RepositoryError::NetworkError(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }
}

/// Map non-success statuses to typed errors.
async fn check_status(response: Response) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        url.clone()
    } else {
        body.trim().to_string()
    };

    Err(match status {
        StatusCode::UNAUTHORIZED => RepositoryError::AuthFailed("Invalid credentials".into()),
        StatusCode::FORBIDDEN => {
            RepositoryError::AuthFailed(format!("Permission denied: {}", message))
        }
        StatusCode::NOT_FOUND => RepositoryError::NotFound(url),
        _ if status.is_server_error() => RepositoryError::ApiError {
            status: status.as_u16(),
            message: format!("Artifactory server error: {}", message),
        },
        _ => RepositoryError::ApiError {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl Repository for ArtifactoryRepository {
    fn name(&self) -> &'static str {
        "artifactory"
    }

    async fn publish(&self, request: PublishRequest) -> Result<(), RepositoryError> {
        let archive = std::fs::read(&request.archive).map_err(|e| RepositoryError::LocalIo {
            path: request.archive.clone(),
            message: e.to_string(),
        })?;
        let info = serde_json::to_vec(&VersionInfo {
            version: request.identity.version(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        })
        .map_err(|e| RepositoryError::ApiError {
            status: 0,
            message: format!("failed to encode version info: {}", e),
        })?;

        let repo = &request.target_repo;
        let id = &request.identity;
        self.put(
            &self.deploy_file_url(repo, id, "zip"),
            archive,
            "application/zip",
        )
        .await?;
        self.put(
            &self.deploy_file_url(repo, id, "mod"),
            request.manifest,
            "text/plain",
        )
        .await?;
        self.put(
            &self.deploy_file_url(repo, id, "info"),
            info,
            "application/json",
        )
        .await
    }

    async fn fetch_published_manifest(
        &self,
        id: &ModuleIdentity,
        target_repo: &str,
    ) -> Result<Option<Vec<u8>>, RepositoryError> {
        self.get_optional(&self.proxy_file_url(target_repo, id, "mod"))
            .await
    }

    async fn exists(
        &self,
        id: &ModuleIdentity,
        target_repo: &str,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .get_optional(&self.proxy_file_url(target_repo, id, "info"))
            .await?
            .is_some())
    }

    fn proxy_url(&self, target_repo: &str) -> Option<String> {
        let mut url = Url::parse(&format!("{}/api/go/{}", self.base_url, target_repo)).ok()?;
        match &self.credentials {
            Credentials::Anonymous => {}
            Credentials::AccessToken { user, token } => {
                url.set_username(user.as_deref().unwrap_or(USER_AGENT_VALUE))
                    .ok()?;
                url.set_password(Some(token.as_str())).ok()?;
            }
            Credentials::Basic { user, password } => {
                url.set_username(user).ok()?;
                url.set_password(Some(password.as_str())).ok()?;
            }
        }
        Some(url.to_string())
    }
}
