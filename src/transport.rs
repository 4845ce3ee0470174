//! Transport client for the detection service
//!
//! Issues authenticated JSON requests and normalizes the service's response
//! envelope into `Result<Value, TransportError>`. Retry policy belongs to the
//! callers: polling is idempotent, conversation turns are not.

mod envelope;
mod error;
mod http;

#[cfg(test)]
pub mod testing;

pub use envelope::decode;
pub use error::{TransportError, TransportErrorKind};
pub use http::HttpTransport;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// HTTP method used against the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common interface for issuing requests against the service
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request and return the envelope's `data` payload
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        (**self).request(method, endpoint, body).await
    }
}

/// Logging wrapper for transports
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: Transport> LoggingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        let start = Instant::now();
        let result = self.inner.request(method, endpoint, body).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::debug!(
                    %method,
                    endpoint,
                    duration_ms = %duration.as_millis(),
                    "Request completed"
                );
            }
            // Callers decide how loud a failure is.
            Err(e) => {
                tracing::debug!(
                    %method,
                    endpoint,
                    duration_ms = %duration.as_millis(),
                    kind = %e.kind,
                    status = ?e.status,
                    error = %e.message,
                    "Request failed"
                );
            }
        }

        result
    }
}
