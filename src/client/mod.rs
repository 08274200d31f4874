//! Session client: the uniform set of remote operations.
//!
//! Operations are grouped into per-domain traits ([`UserApi`], [`TeamApi`], ...)
//! so helpers can ask for only what they use; [`Client`] bundles them all and is
//! what command handlers receive. [`ApiClient`] implements every trait on top of
//! a [`Transport`]. The client is stateless: no caching, no retries, requests
//! go out in the order they are made.

use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};
use crate::model::User;
use crate::transport::{ApiRequest, BackendKind, RawResponse, Transport};

mod system;
mod teams;
mod users;

pub use system::{ConfigApi, JobApi, PluginApi, RoleApi, SystemApi, UploadApi};
pub use teams::{ChannelApi, CommandApi, TeamApi, WebhookApi};
pub use users::{BotApi, TokenApi, UserApi};

/// Everything a command handler may call.
pub trait Client:
    UserApi
    + TokenApi
    + BotApi
    + TeamApi
    + ChannelApi
    + CommandApi
    + WebhookApi
    + ConfigApi
    + JobApi
    + UploadApi
    + RoleApi
    + PluginApi
    + SystemApi
{
}

impl<T> Client for T where
    T: UserApi
        + TokenApi
        + BotApi
        + TeamApi
        + ChannelApi
        + CommandApi
        + WebhookApi
        + ConfigApi
        + JobApi
        + UploadApi
        + RoleApi
        + PluginApi
        + SystemApi
{
}

/// Metadata of a successful exchange, for callers that need more than the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    pub server_version: Option<String>,
    pub request_id: Option<String>,
}

impl From<&RawResponse> for Response {
    fn from(raw: &RawResponse) -> Self {
        Response {
            status_code: raw.status,
            server_version: raw.server_version(),
            request_id: raw.request_id(),
        }
    }
}

pub struct ApiClient {
    transport: Box<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn kind(&self) -> BackendKind {
        self.transport.kind()
    }

    pub fn address(&self) -> &str {
        self.transport.address()
    }

    /// Send and fail on any non-2xx status.
    pub(crate) async fn execute(&self, req: ApiRequest) -> ApiResult<RawResponse> {
        self.transport.send(req).await?.error_for_status()
    }

    /// Send and decode the JSON body.
    pub(crate) async fn call<T: DeserializeOwned>(&self, req: ApiRequest) -> ApiResult<T> {
        let resp = self.execute(req).await?;
        decode(&resp)
    }

    /// Send and discard the body.
    pub(crate) async fn call_empty(&self, req: ApiRequest) -> ApiResult<()> {
        self.execute(req).await.map(|_| ())
    }

    /// Version reported by the server on a cheap ping.
    pub async fn server_version(&self) -> ApiResult<Option<String>> {
        let resp = self.execute(ApiRequest::get("/system/ping")).await?;
        Ok(resp.server_version())
    }

    /// Exchange a username/password (and optional MFA code) for a session token.
    pub async fn login(
        &self,
        login_id: &str,
        password: &str,
        mfa_token: Option<&str>,
    ) -> ApiResult<(User, String)> {
        #[derive(serde::Serialize)]
        struct LoginBody<'a> {
            login_id: &'a str,
            password: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            token: Option<&'a str>,
        }
        let req = ApiRequest::post("/users/login").json(&LoginBody {
            login_id,
            password,
            token: mfa_token,
        })?;
        let resp = self.execute(req).await?;
        let token = resp
            .header(crate::constants::TOKEN_HEADER)
            .map(str::to_string)
            .ok_or_else(|| ApiError::transport("login response did not include a session token"))?;
        let user: User = decode(&resp)?;
        Ok((user, token))
    }
}

pub(crate) fn decode<T: DeserializeOwned>(resp: &RawResponse) -> ApiResult<T> {
    serde_json::from_slice(&resp.body).map_err(ApiError::decode)
}

