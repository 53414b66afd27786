//! # Errors
//!
//! Two kinds of failures surface from a call:
//!
//! * **[`ConvertError`]**: local, raised while turning a successful response into a value
//!   (unreadable stream, undecodable JSON, temporary file creation). Always wraps its cause.
//! * **[`RemoteError`]**: the server answered with a non-success status. It is built by the
//!   HTTP layer from the status and the exception payload, the converter never sees those
//!   responses.
use crate::marshal::multipart::MultipartError;
use serde::Deserialize;

/// Errors that can occur while converting a response body.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Failed to read response body: '{0}'")]
    Io(#[from] std::io::Error),
    #[error("Converter read issue, could not decode {shape}: '{source}'")]
    Decode {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("Response body is not valid text: '{0}'")]
    InvalidText(#[from] std::string::FromUtf8Error),
    #[error("Failed to create temporary file: '{0}'")]
    TempFile(#[source] std::io::Error),
    #[error("Malformed multipart body: '{0}'")]
    Multipart(#[from] MultipartError),
}

/// A non-success response from the server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Server responded with status {status}: {message}")]
pub struct RemoteError {
    status: u16,
    message: String,
    exception: Option<String>,
    stacktrace: Option<String>,
}

/// The exception payload Nuxeo sends along error statuses.
#[derive(Debug, Deserialize)]
struct ExceptionPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    exception: Option<String>,
    #[serde(default)]
    stacktrace: Option<String>,
}

impl RemoteError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            exception: None,
            stacktrace: None,
        }
    }

    /// Builds the error from a status and the raw response body.
    ///
    /// The body is read as the Nuxeo exception entity when it is JSON, otherwise the text
    /// itself becomes the message. An empty body falls back to the canonical status reason.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        if let Ok(payload) = serde_json::from_slice::<ExceptionPayload>(body) {
            let message = payload
                .message
                .unwrap_or_else(|| canonical_reason(status).to_string());
            return Self {
                status,
                message,
                exception: payload.exception.or(payload.code),
                stacktrace: payload.stacktrace,
            };
        }

        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        let message = if text.is_empty() {
            canonical_reason(status).to_string()
        } else {
            text.to_string()
        };
        Self::new(status, message)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The server-side exception class or code, when reported.
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }

    pub fn stacktrace(&self) -> Option<&str> {
        self.stacktrace.as_deref()
    }
}

fn canonical_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown status")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_from_exception_payload() {
        let body = br#"{
            "entity-type": "exception",
            "status": 404,
            "message": "user does not exist",
            "code": "org.nuxeo.ecm.webengine.model.exceptions.WebResourceNotFoundException"
        }"#;
        let err = RemoteError::from_response(404, body);
        assert_eq!(err.status(), 404);
        assert_eq!(err.message(), "user does not exist");
        assert_eq!(
            err.exception(),
            Some("org.nuxeo.ecm.webengine.model.exceptions.WebResourceNotFoundException")
        );
    }

    #[test]
    fn test_remote_error_from_text_body() {
        let err = RemoteError::from_response(500, b"  boom \n");
        assert_eq!(err.status(), 500);
        assert_eq!(err.message(), "boom");
        assert_eq!(err.exception(), None);
    }

    #[test]
    fn test_remote_error_from_empty_body() {
        let err = RemoteError::from_response(401, b"");
        assert_eq!(err.message(), "Unauthorized");
        assert_eq!(
            err.to_string(),
            "Server responded with status 401: Unauthorized"
        );
    }
}
