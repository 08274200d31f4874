//! Wire types exchanged with the server's versioned API.
//!
//! Only the fields the controller reads or prints are modelled; anything else the
//! server sends is ignored on decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DefaultOnNull};
use std::collections::BTreeMap;

/// Render a server millisecond timestamp as RFC 3339, or `-` when unset.
pub fn format_millis(ms: i64) -> String {
    if ms <= 0 {
        return "-".to_string();
    }
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub roles: String,
    pub auth_service: String,
    pub is_bot: bool,
    pub mfa_active: bool,
    pub create_at: i64,
    pub delete_at: i64,
    /// Only ever sent on create.
    pub password: Option<String>,
}

impl User {
    pub fn is_deactivated(&self) -> bool {
        self.delete_at > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub email: String,
    /// `O` for open, `I` for invite-only.
    #[serde(rename = "type")]
    pub team_type: String,
    pub create_at: i64,
    pub delete_at: i64,
}

impl Team {
    pub fn is_archived(&self) -> bool {
        self.delete_at > 0
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub display_name: String,
    /// `O` public, `P` private, `D`/`G` direct and group messages.
    #[serde(rename = "type")]
    pub channel_type: String,
    pub purpose: String,
    pub header: String,
    pub create_at: i64,
    pub delete_at: i64,
}

impl Channel {
    pub fn is_archived(&self) -> bool {
        self.delete_at > 0
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPatch {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub purpose: Option<String>,
    pub header: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    pub team_id: String,
    pub user_id: String,
    pub roles: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMember {
    pub channel_id: String,
    pub user_id: String,
    pub roles: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bot {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
    pub description: String,
    pub owner_id: String,
    pub create_at: i64,
    pub delete_at: i64,
}

impl Bot {
    pub fn is_disabled(&self) -> bool {
        self.delete_at > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashCommand {
    pub id: String,
    pub team_id: String,
    pub trigger: String,
    pub display_name: String,
    pub method: String,
    pub url: String,
    pub creator_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    InProgress,
    /// Cancellation asked for but the job has not stopped yet.
    CancelRequested,
    Success,
    Error,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Pending, in-progress and cancel-requested jobs are still moving; everything else is final.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            JobStatus::Pending | JobStatus::InProgress | JobStatus::CancelRequested
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::CancelRequested => "cancel_requested",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
            JobStatus::Canceled => "canceled",
            JobStatus::Unknown => "unknown",
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub status: JobStatus,
    pub create_at: i64,
    pub start_at: i64,
    pub last_activity_at: i64,
    pub progress: i64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub data: BTreeMap<String, String>,
}

/// Body of a job-creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewJob {
    #[serde(rename = "type")]
    pub job_type: String,
    pub data: BTreeMap<String, String>,
}

pub const JOB_TYPE_EXPORT: &str = "export_process";
pub const JOB_TYPE_IMPORT: &str = "import_process";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSession {
    pub id: String,
    #[serde(rename = "type")]
    pub upload_type: String,
    pub create_at: i64,
    pub user_id: String,
    pub filename: String,
    pub file_size: i64,
    pub file_offset: i64,
}

impl UploadSession {
    /// Name under which the server exposes the finished upload to import jobs.
    pub fn import_name(&self) -> String {
        format!("{}_{}", self.id, self.filename)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub scheme_managed: bool,
    pub built_in: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsResponse {
    pub active: Vec<PluginManifest>,
    pub inactive: Vec<PluginManifest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomingWebhook {
    pub id: String,
    pub channel_id: String,
    pub team_id: String,
    pub user_id: String,
    pub display_name: String,
    pub description: String,
    pub username: String,
    pub icon_url: String,
    pub channel_locked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingWebhook {
    pub id: String,
    pub team_id: String,
    pub channel_id: String,
    pub creator_id: String,
    pub display_name: String,
    pub description: String,
    pub trigger_words: Vec<String>,
    pub callback_urls: Vec<String>,
    pub content_type: String,
}

/// One row of a webhook listing; incoming and outgoing hooks print together.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Webhook {
    Incoming(IncomingWebhook),
    Outgoing(OutgoingWebhook),
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAccessToken {
    pub id: String,
    /// Only present in the response to token creation.
    pub token: Option<String>,
    pub user_id: String,
    pub description: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub status: String,
    pub database_status: Option<String>,
    pub filestore_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityCheckResult {
    pub data: serde_json::Value,
    pub err: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_decodes_server_names() {
        let job: Job = serde_json::from_str(
            r#"{"id":"j1","type":"export_process","status":"in_progress","data":{"include_attachments":"true"}}"#,
        )
        .unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        assert!(!job.status.is_terminal());
        assert_eq!(job.data["include_attachments"], "true");
    }

    #[test]
    fn unknown_job_status_is_terminal() {
        let job: Job =
            serde_json::from_str(r#"{"id":"j1","status":"warming_up","data":null}"#).unwrap();
        assert_eq!(job.status, JobStatus::Unknown);
        assert!(job.status.is_terminal());
        assert!(job.data.is_empty());
    }

    #[test]
    fn cancel_requested_is_still_running() {
        let job: Job =
            serde_json::from_str(r#"{"id":"j1","status":"cancel_requested"}"#).unwrap();
        assert_eq!(job.status, JobStatus::CancelRequested);
        assert!(!job.status.is_terminal());
        assert_eq!(job.status.as_str(), "cancel_requested");
    }

    #[test]
    fn upload_import_name_joins_id_and_filename() {
        let us = UploadSession {
            id: "up1".into(),
            filename: "data.zip".into(),
            ..Default::default()
        };
        assert_eq!(us.import_name(), "up1_data.zip");
    }

    #[test]
    fn format_millis_handles_unset() {
        assert_eq!(format_millis(0), "-");
        assert_eq!(format_millis(1_000), "1970-01-01T00:00:01+00:00");
    }
}
