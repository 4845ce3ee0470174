//! Response envelope decoding
//!
//! Every response from the detection service is wrapped as
//! `{success, data?, error?: {code?, message}}`. Authentication failures come
//! from the web framework instead and look like `{"detail": {...}}`.

use super::TransportError;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Structured(ErrorDetail),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct DetailBody {
    detail: Detail,
}

/// Decode a response body into the envelope's `data` payload.
///
/// A successful envelope without `data` yields `Value::Null`; the caller's
/// payload parser decides whether that is acceptable.
pub fn decode(status: u16, body: &str) -> Result<Value, TransportError> {
    if (200..300).contains(&status) {
        let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
            TransportError::malformed(format!("Response is not a valid envelope: {e}"))
                .with_status(status)
        })?;
        return if envelope.success {
            Ok(envelope.data.unwrap_or(Value::Null))
        } else {
            Err(envelope_failure(envelope.error, status))
        };
    }

    Err(classify_error_status(status, body))
}

fn envelope_failure(error: Option<ErrorDetail>, status: u16) -> TransportError {
    match error {
        Some(detail) => detail_to_error(detail, status),
        None => TransportError::server("Request failed").with_status(status),
    }
}

fn detail_to_error(detail: ErrorDetail, status: u16) -> TransportError {
    let err = TransportError::server(detail.message).with_status(status);
    match detail.code {
        Some(code) => err.with_code(code),
        None => err,
    }
}

/// Non-2xx responses are server failures whatever the body looks like; the
/// body only decides which message reaches the user.
fn classify_error_status(status: u16, body: &str) -> TransportError {
    if let Ok(envelope) = serde_json::from_str::<Envelope>(body) {
        if let Some(detail) = envelope.error {
            return detail_to_error(detail, status);
        }
    }

    if let Ok(DetailBody { detail }) = serde_json::from_str::<DetailBody>(body) {
        return match detail {
            Detail::Structured(detail) => detail_to_error(detail, status),
            Detail::Text(message) => TransportError::server(message).with_status(status),
        };
    }

    TransportError::server(format!("HTTP {status}")).with_status(status)
}
