//! HTTP API client

use crate::error::TransportError;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use sima_core::{ChatReply, ChatRequest, ErrorBody, Persona, ServiceInfo};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Client for the backend's HTTP routes
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let parsed = url::Url::parse(base_url).map_err(|e| TransportError::Http(format!("invalid API URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::Http("API URL must use http:// or https://".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /api/chat`
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        debug!("POST /api/chat for {}", request.figure_id);
        let response = self.client.post(self.url("/api/chat")).json(request).send().await?;
        decode(response).await
    }

    /// `GET /api/figures`
    pub async fn figures(&self) -> Result<BTreeMap<String, Persona>, TransportError> {
        let response = self.client.get(self.url("/api/figures")).send().await?;
        decode(response).await
    }

    /// `GET /`, used as a connection check
    pub async fn service_info(&self) -> Result<ServiceInfo, TransportError> {
        let response = self.client.get(self.url("/")).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| text.chars().take(500).collect());
        return Err(TransportError::Status {
            code: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| TransportError::Protocol(format!("invalid response body: {}", e)))
}

#[async_trait]
impl ChatTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        self.chat(request).await
    }
}
