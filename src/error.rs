//! Error taxonomy for remote operations.
//!
//! Every call made through a [`crate::client::Client`] fails with an [`ApiError`].
//! The HTTP status is translated into an [`ErrorKind`] exactly once, in
//! [`ErrorKind::from_status`]; callers branch on the kind, never on raw codes.

use serde::Deserialize;
use std::fmt;

/// Classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400 or 404: the referenced entity does not exist (or the key was malformed).
    NotFound,
    /// 401
    Unauthenticated,
    /// 403
    Forbidden,
    /// 409
    Conflict,
    /// 429
    RateLimited,
    /// 5xx
    ServerInternal,
    /// Connection, TLS or framing failure before a status was received.
    Transport,
    /// Any other non-success status.
    Other,
}

impl ErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 404 => ErrorKind::NotFound,
            401 => ErrorKind::Unauthenticated,
            403 => ErrorKind::Forbidden,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::ServerInternal,
            _ => ErrorKind::Other,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::ServerInternal => "server error",
            ErrorKind::Transport => "transport error",
            ErrorKind::Other => "request failed",
        };
        f.write_str(name)
    }
}

/// A failed remote call, carrying what the server told us about it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status_code: Option<u16>,
    /// Server-provided error id, e.g. `app.user.missing_account.const`.
    pub id: String,
    pub message: String,
    pub request_id: Option<String>,
}

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ServerErrorBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    request_id: Option<String>,
}

impl ApiError {
    /// Build an error from a non-success response.
    pub fn from_response(status: u16, body: &[u8], request_id: Option<String>) -> Self {
        let parsed: ServerErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let kind = ErrorKind::from_status(status);
        let message = if parsed.message.is_empty() {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                format!("{kind} (status {status})")
            } else {
                text
            }
        } else {
            parsed.message
        };
        ApiError {
            kind,
            status_code: Some(status),
            id: parsed.id,
            message,
            request_id: parsed.request_id.or(request_id),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ApiError {
            kind: ErrorKind::Transport,
            status_code: None,
            id: String::new(),
            message: message.into(),
            request_id: None,
        }
    }

    /// The response could not be decoded into the expected shape.
    pub fn decode(err: serde_json::Error) -> Self {
        ApiError::transport(format!("unable to decode server response: {err}"))
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
}

/// Whether a lookup failure means "try the next key" rather than "stop".
///
/// Only not-found (which covers 400 and 404) qualifies; forbidden,
/// unauthenticated, transport and server errors are severe.
pub fn is_lookup_miss(err: &ApiError) -> bool {
    err.kind == ErrorKind::NotFound
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(ErrorKind::from_status(400), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_status(401), ErrorKind::Unauthenticated);
        assert_eq!(ErrorKind::from_status(403), ErrorKind::Forbidden);
        assert_eq!(ErrorKind::from_status(409), ErrorKind::Conflict);
        assert_eq!(ErrorKind::from_status(429), ErrorKind::RateLimited);
        assert_eq!(ErrorKind::from_status(503), ErrorKind::ServerInternal);
        assert_eq!(ErrorKind::from_status(418), ErrorKind::Other);
    }

    #[test]
    fn from_response_prefers_server_message() {
        let body = br#"{"id":"app.role.get.app_error","message":"role missing","status_code":404,"request_id":"abc"}"#;
        let err = ApiError::from_response(404, body, None);
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.id, "app.role.get.app_error");
        assert_eq!(err.to_string(), "role missing");
        assert_eq!(err.request_id.as_deref(), Some("abc"));
    }

    #[test]
    fn from_response_falls_back_to_status_text() {
        let err = ApiError::from_response(502, b"", Some("r1".into()));
        assert_eq!(err.kind, ErrorKind::ServerInternal);
        assert_eq!(err.to_string(), "server error (status 502)");
        assert_eq!(err.request_id.as_deref(), Some("r1"));
    }

    #[test]
    fn only_not_found_is_a_lookup_miss() {
        assert!(is_lookup_miss(&ApiError::from_response(400, b"{}", None)));
        assert!(is_lookup_miss(&ApiError::from_response(404, b"{}", None)));
        assert!(!is_lookup_miss(&ApiError::from_response(403, b"{}", None)));
        assert!(!is_lookup_miss(&ApiError::from_response(500, b"{}", None)));
        assert!(!is_lookup_miss(&ApiError::transport("boom")));
    }
}
