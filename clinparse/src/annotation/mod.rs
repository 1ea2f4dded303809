//! Client for the upstream clinical NLP annotation service.
//!
//! The service takes raw text and returns syntax tokens with dependency information
//! and semantic mentions carrying ontology codes (see [`AnnotatedDocument`]).

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AnnotationConfig;
use crate::models::AnnotatedDocument;

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("Connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Service answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Undecodable payload: {0}")]
    Decode(String),

    #[error("Client setup failed: {0}")]
    Client(String),
}

impl AnnotationError {
    /// The service is unreachable or failing, as opposed to answering badly.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            AnnotationError::Connection { .. }
                | AnnotationError::Timeout { .. }
                | AnnotationError::Status { .. }
        )
    }
}

/// Source of annotated documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnotationService: Send + Sync + std::fmt::Debug {
    /// Annotate one document
    async fn annotate(&self, text: &str) -> Result<AnnotatedDocument, AnnotationError>;

    /// Whether the service answers at all
    async fn health_check(&self) -> bool;
}

/// [`AnnotationService`] over HTTP.
///
/// Documents are POSTed as `{"text": ...}` to the configured url.
#[derive(Debug, Clone)]
pub struct HttpAnnotationClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    health_timeout: Duration,
}

impl HttpAnnotationClient {
    pub fn new(config: &AnnotationConfig) -> Result<Self, AnnotationError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("clinparse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnnotationError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout,
            health_timeout: config.health_timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn request_error(&self, error: reqwest::Error, timeout: Duration) -> AnnotationError {
        if error.is_timeout() {
            AnnotationError::Timeout {
                url: self.url.clone(),
                timeout,
            }
        } else {
            AnnotationError::Connection {
                url: self.url.clone(),
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl AnnotationService for HttpAnnotationClient {
    async fn annotate(&self, text: &str) -> Result<AnnotatedDocument, AnnotationError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| self.request_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnnotationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.request_error(e, self.timeout))?;
        let document: AnnotatedDocument =
            serde_json::from_slice(&bytes).map_err(|e| AnnotationError::Decode(e.to_string()))?;

        debug!(
            chars = document.input.chars().count(),
            tokens = document.syntax.len(),
            mentions = document.semantic.len(),
            "Received annotated document"
        );

        Ok(document)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(&self.url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(url = %self.url, "Annotation service health check failed: {}", e);
                false
            }
        }
    }
}
