use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{decode, ApiClient};
use crate::error::ApiResult;
use crate::model::{
    IntegrityCheckResult, Job, NewJob, PluginsResponse, Role, SystemStatus, UploadSession,
};
use crate::transport::{segment, ApiRequest};

#[async_trait]
pub trait ConfigApi: Send + Sync {
    async fn get_config(&self) -> ApiResult<Value>;
    async fn update_config(&self, config: &Value) -> ApiResult<Value>;
    async fn reload_config(&self) -> ApiResult<()>;
}

#[async_trait]
pub trait JobApi: Send + Sync {
    async fn create_job(&self, job: &NewJob) -> ApiResult<Job>;
    async fn get_job(&self, id: &str) -> ApiResult<Job>;
    async fn get_jobs_by_type(&self, job_type: &str, page: u32, per_page: u32)
        -> ApiResult<Vec<Job>>;
}

#[async_trait]
pub trait UploadApi: Send + Sync {
    async fn create_upload(&self, upload: &UploadSession) -> ApiResult<UploadSession>;
    async fn get_upload(&self, id: &str) -> ApiResult<UploadSession>;
    /// Append `data` at the session's current offset. Returns the finished file
    /// info once the last byte arrives, `None` while the upload is incomplete.
    async fn upload_data(&self, id: &str, data: Bytes) -> ApiResult<Option<Value>>;
    async fn list_imports(&self) -> ApiResult<Vec<String>>;
}

#[async_trait]
pub trait RoleApi: Send + Sync {
    async fn get_role_by_name(&self, name: &str) -> ApiResult<Role>;
    async fn patch_role(&self, id: &str, permissions: &[String]) -> ApiResult<Role>;
}

#[async_trait]
pub trait PluginApi: Send + Sync {
    async fn get_plugins(&self) -> ApiResult<PluginsResponse>;
    async fn enable_plugin(&self, id: &str) -> ApiResult<()>;
    async fn disable_plugin(&self, id: &str) -> ApiResult<()>;
    async fn remove_plugin(&self, id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait SystemApi: Send + Sync {
    async fn get_ping(&self, with_status: bool) -> ApiResult<SystemStatus>;
    async fn get_logs(&self, page: u32, per_page: u32) -> ApiResult<Vec<String>>;
    async fn check_integrity(&self) -> ApiResult<Vec<IntegrityCheckResult>>;
    async fn sync_ldap(&self) -> ApiResult<()>;
    /// Returns the number of affected users.
    async fn reset_saml_auth_data(
        &self,
        include_deleted: bool,
        dry_run: bool,
        user_ids: &[String],
    ) -> ApiResult<i64>;
}

#[async_trait]
impl ConfigApi for ApiClient {
    async fn get_config(&self) -> ApiResult<Value> {
        self.call(ApiRequest::get("/config")).await
    }

    async fn update_config(&self, config: &Value) -> ApiResult<Value> {
        self.call(ApiRequest::put("/config").json(config)?).await
    }

    async fn reload_config(&self) -> ApiResult<()> {
        self.call_empty(ApiRequest::post("/config/reload")).await
    }
}

#[async_trait]
impl JobApi for ApiClient {
    async fn create_job(&self, job: &NewJob) -> ApiResult<Job> {
        self.call(ApiRequest::post("/jobs").json(job)?).await
    }

    async fn get_job(&self, id: &str) -> ApiResult<Job> {
        self.call(ApiRequest::get(format!("/jobs/{}", segment(id))))
            .await
    }

    async fn get_jobs_by_type(
        &self,
        job_type: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<Job>> {
        let req = ApiRequest::get(format!("/jobs/type/{}", segment(job_type)))
            .query("page", page)
            .query("per_page", per_page);
        self.call(req).await
    }
}

#[async_trait]
impl UploadApi for ApiClient {
    async fn create_upload(&self, upload: &UploadSession) -> ApiResult<UploadSession> {
        self.call(ApiRequest::post("/uploads").json(upload)?).await
    }

    async fn get_upload(&self, id: &str) -> ApiResult<UploadSession> {
        self.call(ApiRequest::get(format!("/uploads/{}", segment(id))))
            .await
    }

    async fn upload_data(&self, id: &str, data: Bytes) -> ApiResult<Option<Value>> {
        let resp = self
            .execute(ApiRequest::post(format!("/uploads/{}", segment(id))).bytes(data))
            .await?;
        if resp.status == 204 || resp.body.is_empty() {
            return Ok(None);
        }
        decode(&resp).map(Some)
    }

    async fn list_imports(&self) -> ApiResult<Vec<String>> {
        self.call(ApiRequest::get("/imports")).await
    }
}

#[async_trait]
impl RoleApi for ApiClient {
    async fn get_role_by_name(&self, name: &str) -> ApiResult<Role> {
        self.call(ApiRequest::get(format!("/roles/name/{}", segment(name))))
            .await
    }

    async fn patch_role(&self, id: &str, permissions: &[String]) -> ApiResult<Role> {
        let req = ApiRequest::put(format!("/roles/{}/patch", segment(id)))
            .json(&json!({ "permissions": permissions }))?;
        self.call(req).await
    }
}

#[async_trait]
impl PluginApi for ApiClient {
    async fn get_plugins(&self) -> ApiResult<PluginsResponse> {
        self.call(ApiRequest::get("/plugins")).await
    }

    async fn enable_plugin(&self, id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::post(format!("/plugins/{}/enable", segment(id))))
            .await
    }

    async fn disable_plugin(&self, id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::post(format!("/plugins/{}/disable", segment(id))))
            .await
    }

    async fn remove_plugin(&self, id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::delete(format!("/plugins/{}", segment(id))))
            .await
    }
}

#[async_trait]
impl SystemApi for ApiClient {
    async fn get_ping(&self, with_status: bool) -> ApiResult<SystemStatus> {
        let req = ApiRequest::get("/system/ping").query("get_server_status", with_status);
        self.call(req).await
    }

    async fn get_logs(&self, page: u32, per_page: u32) -> ApiResult<Vec<String>> {
        let req = ApiRequest::get("/logs")
            .query("page", page)
            .query("logs_per_page", per_page);
        self.call(req).await
    }

    async fn check_integrity(&self) -> ApiResult<Vec<IntegrityCheckResult>> {
        self.call(ApiRequest::post("/integrity")).await
    }

    async fn sync_ldap(&self) -> ApiResult<()> {
        self.call_empty(ApiRequest::post("/ldap/sync")).await
    }

    async fn reset_saml_auth_data(
        &self,
        include_deleted: bool,
        dry_run: bool,
        user_ids: &[String],
    ) -> ApiResult<i64> {
        #[derive(Deserialize)]
        struct Affected {
            num_affected: i64,
        }
        let req = ApiRequest::post("/saml/reset_auth_data").json(&json!({
            "include_deleted": include_deleted,
            "dry_run": dry_run,
            "user_ids": user_ids,
        }))?;
        let affected: Affected = self.call(req).await?;
        Ok(affected.num_affected)
    }
}
