//! HTTP client for the back office's invoicing configuration endpoints.

use std::time::Duration;

use async_trait::async_trait;
use kuatia_core::{BackendError, Certificate, InvoicingBackend, InvoicingConfig};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

const CONFIG_PATH: &str = "/api/invoicing/config";
const CERTIFICATE_PATH: &str = "/api/invoicing/certificate";
const PKCS12_MIME: &str = "application/x-pkcs12";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error payload shapes the backend is known to return.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error", alias = "detail")]
    message: String,
}

/// Pull a human-readable message out of an error response body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

impl From<SyncError> for BackendError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Http(e) => BackendError::Transport(e.to_string()),
            SyncError::Server { status, body } => BackendError::Rejected {
                status,
                message: error_message(&body),
            },
            SyncError::Json(e) => BackendError::InvalidResponse(e.to_string()),
        }
    }
}

/// Connection settings, passed in explicitly rather than read from storage.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client for the invoicing configuration API.
pub struct SyncClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SyncClient {
    /// Create a client for the given configuration.
    ///
    /// `base_url` should be like `http://localhost:4000`; a trailing slash is
    /// trimmed.
    pub fn new(config: ClientConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.filter(|t| !t.is_empty()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetch the stored configuration; `None` when none has been saved yet.
    pub async fn pull_config(&self) -> Result<Option<InvoicingConfig>, SyncError> {
        info!(base_url = %self.base_url, "fetching invoicing configuration");
        let resp = self.request(Method::GET, CONFIG_PATH).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            info!("no invoicing configuration stored");
            return Ok(None);
        }
        let resp = ensure_success(resp).await?;
        let body = resp.text().await?;
        let config: InvoicingConfig = serde_json::from_str(&body)?;
        Ok(Some(config))
    }

    /// Save the full configuration. The backend replaces any previous one.
    pub async fn push_config(&self, config: &InvoicingConfig) -> Result<(), SyncError> {
        info!(
            base_url = %self.base_url,
            ruc = %config.contributor.ruc,
            environment = %config.timbrado.sifen_environment,
            "saving invoicing configuration"
        );
        let resp = self
            .request(Method::POST, CONFIG_PATH)
            .json(config)
            .send()
            .await?;
        ensure_success(resp).await?;
        info!("invoicing configuration saved");
        Ok(())
    }

    /// Upload the signing certificate as `multipart/form-data`.
    pub async fn push_certificate(
        &self,
        certificate: &Certificate,
        password: &str,
    ) -> Result<(), SyncError> {
        info!(
            base_url = %self.base_url,
            file = certificate.file_name(),
            bytes = certificate.bytes().len(),
            "uploading certificate"
        );
        let part = Part::bytes(certificate.bytes().to_vec())
            .file_name(certificate.file_name().to_string())
            .mime_str(PKCS12_MIME)?;
        let form = Form::new()
            .part("certificate", part)
            .text("password", password.to_string());

        let resp = self
            .request(Method::POST, CERTIFICATE_PATH)
            .multipart(form)
            .send()
            .await?;
        ensure_success(resp).await?;
        info!("certificate uploaded");
        Ok(())
    }
}

async fn ensure_success(resp: Response) -> Result<Response, SyncError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl InvoicingBackend for SyncClient {
    async fn save_config(&self, config: &InvoicingConfig) -> Result<(), BackendError> {
        Ok(self.push_config(config).await?)
    }

    async fn upload_certificate(
        &self,
        certificate: &Certificate,
        password: &str,
    ) -> Result<(), BackendError> {
        Ok(self.push_certificate(certificate, password).await?)
    }
}
