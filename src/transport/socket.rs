//! HTTP/1.1 over the server's local Unix-domain socket.
//!
//! Each request opens a fresh connection and sends `Connection: close`, so the
//! response body is everything up to EOF (or the declared length, or the
//! decoded chunks).

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use super::{ApiRequest, BackendKind, Body, RawResponse, Transport};
use crate::constants::{user_agent, API_PREFIX};
use crate::error::ApiError;

pub struct SocketTransport {
    path: PathBuf,
    address: String,
}

impl SocketTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let address = format!("unix://{}", path.display());
        Self { path, address }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalSocket
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let target = format!("{}{}", API_PREFIX, request.path_and_query());
        tracing::debug!(method = %request.method, %target, socket = %self.path.display(), "sending local request");

        let mut stream = UnixStream::connect(&self.path).await.map_err(|e| {
            ApiError::transport(format!("connecting to {}: {e}", self.path.display()))
        })?;
        let payload = encode_request(&request, &target)?;
        stream
            .write_all(&payload)
            .await
            .map_err(|e| ApiError::transport(format!("writing request: {e}")))?;

        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| ApiError::transport(format!("reading response: {e}")))?;
        parse_response(&buf)
    }
}

fn encode_request(request: &ApiRequest, target: &str) -> Result<Vec<u8>, ApiError> {
    let (content_type, body): (Option<&str>, Vec<u8>) = match &request.body {
        Body::Empty => (None, Vec::new()),
        Body::Json(value) => (
            Some("application/json"),
            serde_json::to_vec(value).map_err(ApiError::decode)?,
        ),
        Body::Bytes(data) => (Some("application/octet-stream"), data.to_vec()),
    };

    let mut head = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nUser-Agent: {}\r\nAccept: application/json\r\nConnection: close\r\n",
        request.method,
        target,
        user_agent()
    );
    if let Some(ct) = content_type {
        head.push_str(&format!("Content-Type: {ct}\r\n"));
    }
    head.push_str(&format!("Content-Length: {}\r\n\r\n", body.len()));

    let mut out = head.into_bytes();
    out.extend_from_slice(&body);
    Ok(out)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parse a complete HTTP/1.1 response read until EOF.
pub(crate) fn parse_response(buf: &[u8]) -> Result<RawResponse, ApiError> {
    let split = find(buf, b"\r\n\r\n")
        .ok_or_else(|| ApiError::transport("malformed response: missing header terminator"))?;
    let head = std::str::from_utf8(&buf[..split])
        .map_err(|_| ApiError::transport("malformed response: non-UTF-8 headers"))?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ApiError::transport(format!("malformed status line: {status_line:?}")))?;

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
        }
    }

    let raw_body = &buf[split + 4..];
    let chunked = headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
    let body = if chunked {
        decode_chunked(raw_body)?
    } else if let Some(len) = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        if raw_body.len() < len {
            return Err(ApiError::transport("truncated response body"));
        }
        raw_body[..len].to_vec()
    } else {
        raw_body.to_vec()
    };

    Ok(RawResponse {
        status,
        headers,
        body: Bytes::from(body),
    })
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut out = Vec::new();
    loop {
        let line_end = find(data, b"\r\n")
            .ok_or_else(|| ApiError::transport("malformed chunked body"))?;
        let size_text = std::str::from_utf8(&data[..line_end])
            .map_err(|_| ApiError::transport("malformed chunk size"))?;
        let size_hex = size_text.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| ApiError::transport(format!("malformed chunk size {size_hex:?}")))?;
        data = &data[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        if data.len() < size + 2 {
            return Err(ApiError::transport("truncated chunked body"));
        }
        out.extend_from_slice(&data[..size]);
        data = &data[size + 2..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::net::UnixListener;

    #[test]
    fn parses_content_length_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nX-Version-Id: 9.5.0\r\n\r\n{}";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.server_version().as_deref(), Some("9.5.0"));
        assert_eq!(&resp.body[..], b"{}");
    }

    #[test]
    fn parses_chunked_body() {
        let raw = b"HTTP/1.1 404 Not Found\r\nTransfer-Encoding: chunked\r\n\r\n4\r\n{\"a\"\r\n3\r\n:1}\r\n0\r\n\r\n";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(&resp.body[..], b"{\"a\":1}");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_response(b"not http").is_err());
        assert!(parse_response(b"HTTP/1.1 abc\r\n\r\n").is_err());
    }

    #[tokio::test]
    async fn round_trip_over_a_real_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("local.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut conn, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = conn.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let body = r#"{"id":"u1","username":"admin"}"#;
            let resp = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            conn.write_all(resp.as_bytes()).await.unwrap();
            request
        });

        let transport = SocketTransport::new(&path);
        let resp = transport
            .send(ApiRequest::get("/users/me"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert!(std::str::from_utf8(&resp.body).unwrap().contains("admin"));

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /api/v4/users/me HTTP/1.1\r\n"));
        assert!(!request.contains("Authorization"));
        assert_eq!(transport.kind(), BackendKind::LocalSocket);
    }
}
