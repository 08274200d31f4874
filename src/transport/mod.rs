//! Request issuance for the session client.
//!
//! Both backends speak the same HTTP API; they differ only in how a request
//! reaches the server. [`HttpTransport`] sends it over the network with a bearer
//! token, [`SocketTransport`] writes it to the server's local Unix-domain socket
//! where no credentials are needed.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::constants::{REQUEST_ID_HEADER, VERSION_HEADER};
use crate::error::ApiError;

pub mod http;
#[cfg(unix)]
pub mod socket;

pub use http::HttpTransport;
pub use reqwest::Method;
#[cfg(unix)]
pub use socket::SocketTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    RemoteBearer,
    LocalSocket,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::RemoteBearer => f.write_str("remote"),
            BackendKind::LocalSocket => f.write_str("local"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    Bytes(Bytes),
}

/// A request relative to the API prefix, e.g. `GET /users/me`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::transport(format!("unable to encode request: {e}")))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    pub fn bytes(mut self, data: Bytes) -> Self {
        self.body = Body::Bytes(data);
        self
    }

    /// Path plus encoded query string.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.path, qs)
    }
}

/// Percent-encode one path segment.
pub fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'@' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Status, lower-cased headers and body of a completed exchange.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn request_id(&self) -> Option<String> {
        self.header(REQUEST_ID_HEADER).map(str::to_string)
    }

    pub fn server_version(&self) -> Option<String> {
        self.header(VERSION_HEADER).map(str::to_string)
    }

    /// Turn a non-2xx response into the matching [`ApiError`].
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_response(
                self.status,
                &self.body,
                self.request_id(),
            ))
        }
    }
}

/// A capability to issue API requests against one server.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Human-readable address: base URL or socket path.
    fn address(&self) -> &str;

    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError>;
}
