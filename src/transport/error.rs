use super::Operation;
use serde::Serialize;
use thiserror::Error;

/// Failure categories surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    NetworkFailure,
    ProtocolViolation,
    ApplicationError,
    ValidationError,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("{operation}: request failed: {message}")]
    Network { operation: Operation, message: String },

    #[error("{operation}: HTTP {status}: {body}")]
    Status {
        operation: Operation,
        status: u16,
        body: String,
    },

    #[error("{operation}: expected a JSON response, got content type {}", content_type.as_deref().unwrap_or("<none>"))]
    NotJson {
        operation: Operation,
        content_type: Option<String>,
        body: String,
    },

    #[error("{operation}: malformed JSON body: {reason}")]
    MalformedJson {
        operation: Operation,
        reason: String,
        body: String,
    },

    /// The backend (or a forwarding layer in front of it) answered with `{"error": "..."}`.
    #[error("{operation}: backend error: {message}")]
    Application {
        operation: Operation,
        status: u16,
        message: String,
        body: String,
    },
}

impl TransportError {
    pub fn network(operation: Operation, err: impl std::fmt::Display) -> Self {
        TransportError::Network {
            operation,
            message: err.to_string(),
        }
    }

    /// Build an error from an `{error: string}` envelope. Returns `None` when the
    /// body is not such an envelope.
    pub fn from_envelope(operation: Operation, status: u16, body: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        let message = value.as_object()?.get("error")?.as_str()?;
        Some(TransportError::Application {
            operation,
            status,
            message: message.to_string(),
            body: body.to_string(),
        })
    }

    pub fn operation(&self) -> Operation {
        match self {
            TransportError::Network { operation, .. }
            | TransportError::Status { operation, .. }
            | TransportError::NotJson { operation, .. }
            | TransportError::MalformedJson { operation, .. }
            | TransportError::Application { operation, .. } => *operation,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Network { .. } => ErrorKind::NetworkFailure,
            TransportError::NotJson { .. } | TransportError::MalformedJson { .. } => {
                ErrorKind::ProtocolViolation
            }
            TransportError::Status { .. } | TransportError::Application { .. } => {
                ErrorKind::ApplicationError
            }
        }
    }

    /// Raw response body, when one was received.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            TransportError::Status { body, .. }
            | TransportError::NotJson { body, .. }
            | TransportError::MalformedJson { body, .. }
            | TransportError::Application { body, .. } => Some(body),
            TransportError::Network { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_becomes_application_error() {
        let err = TransportError::from_envelope(
            Operation::ResumeRun,
            400,
            r#"{"error":"thread_id is required"}"#,
        )
        .unwrap();
        assert_eq!(err.kind(), ErrorKind::ApplicationError);
        assert_eq!(err.operation(), Operation::ResumeRun);
        assert!(err.to_string().contains("thread_id is required"));
        assert_eq!(err.raw_body(), Some(r#"{"error":"thread_id is required"}"#));
    }

    #[test]
    fn non_envelope_bodies_are_rejected() {
        assert!(TransportError::from_envelope(Operation::StartRun, 500, "oops").is_none());
        assert!(TransportError::from_envelope(Operation::StartRun, 500, r#"{"error":3}"#).is_none());
        assert!(TransportError::from_envelope(Operation::StartRun, 500, r#"["error"]"#).is_none());
    }

    #[test]
    fn network_error_has_no_body() {
        let err = TransportError::network(Operation::ListSessions, "connection refused");
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
        assert!(err.raw_body().is_none());
    }
}
