//! Request/response fallback over HTTP

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use super::channel::RequestResponse;
use crate::error::{Result, TransportError};

/// POSTs each frame to a fixed URL and treats the body as the reply.
///
/// An empty body or `204 No Content` means the peer had nothing to say, which
/// is what a notification gets back.
#[derive(Debug, Clone)]
pub struct HttpFallback {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpFallback {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    /// Reuse an existing HTTP client (connection pool, proxy settings, ...)
    pub fn with_client(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RequestResponse for HttpFallback {
    async fn exchange(&self, frame: String, token: Option<String>) -> Result<Option<String>> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(frame);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        debug!(endpoint = %self.endpoint, bytes = body.len(), "Fallback exchange complete");
        if body.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }
}
