use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT},
    Client,
};

use super::{ApiRequest, BackendKind, Body, RawResponse, Transport};
use crate::constants::{user_agent, API_PREFIX};
use crate::error::ApiError;

/// Bearer-token transport against a remote base URL.
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        insecure_skip_verify: bool,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(tok) = token.filter(|t| !t.is_empty()) {
            let hv = HeaderValue::from_str(&format!("Bearer {tok}"))
                .map_err(|_| ApiError::transport("auth token contains invalid characters"))?;
            headers.insert(AUTHORIZATION, hv);
        }
        let ua = HeaderValue::from_str(&user_agent())
            .map_err(|e| ApiError::transport(e.to_string()))?;
        headers.insert(USER_AGENT, ua);

        let client = Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()
            .map_err(|e| ApiError::transport(format!("building HTTP client: {e}")))?;
        Ok(HttpTransport {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> BackendKind {
        BackendKind::RemoteBearer
    }

    fn address(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: ApiRequest) -> Result<RawResponse, ApiError> {
        let url = format!("{}{}{}", self.base_url, API_PREFIX, request.path_and_query());
        tracing::debug!(method = %request.method, %url, "sending request");

        let mut req = self.client.request(request.method.clone(), &url);
        req = match request.body {
            Body::Empty => req,
            Body::Json(value) => req.json(&value),
            Body::Bytes(data) => req
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(data),
        };

        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("request to {url} failed: {e}")))?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::transport(format!("reading response from {url}: {e}")))?;
        tracing::debug!(status, %url, "response received");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
