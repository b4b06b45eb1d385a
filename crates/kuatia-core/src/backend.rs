//! The backend seam: persisting the configuration and attaching the
//! signing certificate.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::registration::InvoicingConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected backend response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("certificate file {0:?} is empty")]
pub struct EmptyCertificate(pub String);

/// A digital signing certificate (PKCS#12) as picked by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    file_name: String,
    bytes: Vec<u8>,
}

impl Certificate {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, EmptyCertificate> {
        let file_name = file_name.into();
        if bytes.is_empty() {
            return Err(EmptyCertificate(file_name));
        }
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// Keep key material out of logs.
impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Remote operations the setup wizard depends on.
#[async_trait]
pub trait InvoicingBackend: Send + Sync {
    /// Persist the full fiscal configuration. Saving again replaces it.
    async fn save_config(&self, config: &InvoicingConfig) -> Result<(), BackendError>;

    /// Attach a signing certificate to the saved configuration.
    async fn upload_certificate(
        &self,
        certificate: &Certificate,
        password: &str,
    ) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_certificate_rejected() {
        assert_eq!(
            Certificate::new("firma.p12", Vec::new()),
            Err(EmptyCertificate("firma.p12".into()))
        );
    }

    #[test]
    fn debug_hides_bytes() {
        let cert = Certificate::new("firma.p12", vec![0x30, 0x82, 0x0a]).unwrap();
        let rendered = format!("{cert:?}");
        assert!(rendered.contains("firma.p12"));
        assert!(rendered.contains("len: 3"));
        assert!(!rendered.contains("48"));
    }
}
