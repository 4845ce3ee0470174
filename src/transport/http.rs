//! reqwest-backed transport

use super::{decode, Method, Transport, TransportError};
use crate::config::ConsoleConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Header carrying the access credential on every request
pub const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP transport against the detection service
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ConsoleConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        let url = self.url(endpoint);
        let builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let builder = builder.header(API_KEY_HEADER, &self.api_key);
        let builder = match body {
            Some(body) => builder.json(&body),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                TransportError::network(format!("Connection failed: {e}"))
            } else {
                TransportError::network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {e}")))?;

        decode(status.as_u16(), &text)
    }
}
