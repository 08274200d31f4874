use async_trait::async_trait;
use serde_json::json;

use super::ApiClient;
use crate::error::ApiResult;
use crate::model::{
    Channel, ChannelMember, ChannelPatch, IncomingWebhook, OutgoingWebhook, SlashCommand, Team,
    TeamMember, TeamPatch,
};
use crate::transport::{segment, ApiRequest};

#[async_trait]
pub trait TeamApi: Send + Sync {
    async fn get_team(&self, id: &str) -> ApiResult<Team>;
    async fn get_team_by_name(&self, name: &str) -> ApiResult<Team>;
    async fn get_all_teams(
        &self,
        page: u32,
        per_page: u32,
        include_deleted: bool,
    ) -> ApiResult<Vec<Team>>;
    async fn search_teams(&self, term: &str) -> ApiResult<Vec<Team>>;
    async fn create_team(&self, team: &Team) -> ApiResult<Team>;
    async fn soft_delete_team(&self, id: &str) -> ApiResult<()>;
    async fn permanent_delete_team(&self, id: &str) -> ApiResult<()>;
    async fn restore_team(&self, id: &str) -> ApiResult<Team>;
    async fn patch_team(&self, id: &str, patch: &TeamPatch) -> ApiResult<Team>;
    async fn add_team_member(&self, team_id: &str, user_id: &str) -> ApiResult<TeamMember>;
    async fn remove_team_member(&self, team_id: &str, user_id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait ChannelApi: Send + Sync {
    async fn get_channel(&self, id: &str) -> ApiResult<Channel>;
    async fn get_channel_by_name(
        &self,
        name: &str,
        team_id: &str,
        include_deleted: bool,
    ) -> ApiResult<Channel>;
    async fn get_public_channels_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<Channel>>;
    async fn get_private_channels_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<Channel>>;
    async fn get_deleted_channels_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<Channel>>;
    async fn search_channels(&self, team_id: &str, term: &str) -> ApiResult<Vec<Channel>>;
    async fn create_channel(&self, channel: &Channel) -> ApiResult<Channel>;
    async fn patch_channel(&self, id: &str, patch: &ChannelPatch) -> ApiResult<Channel>;
    async fn delete_channel(&self, id: &str) -> ApiResult<()>;
    async fn restore_channel(&self, id: &str) -> ApiResult<Channel>;
    async fn add_channel_member(&self, channel_id: &str, user_id: &str)
        -> ApiResult<ChannelMember>;
    async fn remove_channel_member(&self, channel_id: &str, user_id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait CommandApi: Send + Sync {
    async fn list_commands(&self, team_id: &str, custom_only: bool)
        -> ApiResult<Vec<SlashCommand>>;
}

#[async_trait]
pub trait WebhookApi: Send + Sync {
    async fn get_incoming_webhooks_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<IncomingWebhook>>;
    async fn get_outgoing_webhooks_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<OutgoingWebhook>>;
    async fn get_incoming_webhook(&self, id: &str) -> ApiResult<IncomingWebhook>;
    async fn get_outgoing_webhook(&self, id: &str) -> ApiResult<OutgoingWebhook>;
    async fn create_incoming_webhook(&self, hook: &IncomingWebhook) -> ApiResult<IncomingWebhook>;
    async fn delete_incoming_webhook(&self, id: &str) -> ApiResult<()>;
    async fn delete_outgoing_webhook(&self, id: &str) -> ApiResult<()>;
}

#[async_trait]
impl TeamApi for ApiClient {
    async fn get_team(&self, id: &str) -> ApiResult<Team> {
        self.call(ApiRequest::get(format!("/teams/{}", segment(id))))
            .await
    }

    async fn get_team_by_name(&self, name: &str) -> ApiResult<Team> {
        self.call(ApiRequest::get(format!("/teams/name/{}", segment(name))))
            .await
    }

    async fn get_all_teams(
        &self,
        page: u32,
        per_page: u32,
        include_deleted: bool,
    ) -> ApiResult<Vec<Team>> {
        let req = ApiRequest::get("/teams")
            .query("page", page)
            .query("per_page", per_page)
            .query("include_deleted", include_deleted);
        self.call(req).await
    }

    async fn search_teams(&self, term: &str) -> ApiResult<Vec<Team>> {
        self.call(ApiRequest::post("/teams/search").json(&json!({ "term": term }))?)
            .await
    }

    async fn create_team(&self, team: &Team) -> ApiResult<Team> {
        self.call(ApiRequest::post("/teams").json(team)?).await
    }

    async fn soft_delete_team(&self, id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::delete(format!("/teams/{}", segment(id))))
            .await
    }

    async fn permanent_delete_team(&self, id: &str) -> ApiResult<()> {
        let req = ApiRequest::delete(format!("/teams/{}", segment(id))).query("permanent", true);
        self.call_empty(req).await
    }

    async fn restore_team(&self, id: &str) -> ApiResult<Team> {
        self.call(ApiRequest::post(format!("/teams/{}/restore", segment(id))))
            .await
    }

    async fn patch_team(&self, id: &str, patch: &TeamPatch) -> ApiResult<Team> {
        self.call(ApiRequest::put(format!("/teams/{}/patch", segment(id))).json(patch)?)
            .await
    }

    async fn add_team_member(&self, team_id: &str, user_id: &str) -> ApiResult<TeamMember> {
        let req = ApiRequest::post(format!("/teams/{}/members", segment(team_id)))
            .json(&json!({ "team_id": team_id, "user_id": user_id }))?;
        self.call(req).await
    }

    async fn remove_team_member(&self, team_id: &str, user_id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::delete(format!(
            "/teams/{}/members/{}",
            segment(team_id),
            segment(user_id)
        )))
        .await
    }
}

#[async_trait]
impl ChannelApi for ApiClient {
    async fn get_channel(&self, id: &str) -> ApiResult<Channel> {
        self.call(ApiRequest::get(format!("/channels/{}", segment(id))))
            .await
    }

    async fn get_channel_by_name(
        &self,
        name: &str,
        team_id: &str,
        include_deleted: bool,
    ) -> ApiResult<Channel> {
        let req = ApiRequest::get(format!(
            "/teams/{}/channels/name/{}",
            segment(team_id),
            segment(name)
        ))
        .query("include_deleted", include_deleted);
        self.call(req).await
    }

    async fn get_public_channels_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<Channel>> {
        let req = ApiRequest::get(format!("/teams/{}/channels", segment(team_id)))
            .query("page", page)
            .query("per_page", per_page);
        self.call(req).await
    }

    async fn get_private_channels_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<Channel>> {
        let req = ApiRequest::get(format!("/teams/{}/channels/private", segment(team_id)))
            .query("page", page)
            .query("per_page", per_page);
        self.call(req).await
    }

    async fn get_deleted_channels_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<Channel>> {
        let req = ApiRequest::get(format!("/teams/{}/channels/deleted", segment(team_id)))
            .query("page", page)
            .query("per_page", per_page);
        self.call(req).await
    }

    async fn search_channels(&self, team_id: &str, term: &str) -> ApiResult<Vec<Channel>> {
        let req = ApiRequest::post(format!("/teams/{}/channels/search", segment(team_id)))
            .json(&json!({ "term": term }))?;
        self.call(req).await
    }

    async fn create_channel(&self, channel: &Channel) -> ApiResult<Channel> {
        self.call(ApiRequest::post("/channels").json(channel)?).await
    }

    async fn patch_channel(&self, id: &str, patch: &ChannelPatch) -> ApiResult<Channel> {
        self.call(ApiRequest::put(format!("/channels/{}/patch", segment(id))).json(patch)?)
            .await
    }

    async fn delete_channel(&self, id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::delete(format!("/channels/{}", segment(id))))
            .await
    }

    async fn restore_channel(&self, id: &str) -> ApiResult<Channel> {
        self.call(ApiRequest::post(format!("/channels/{}/restore", segment(id))))
            .await
    }

    async fn add_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> ApiResult<ChannelMember> {
        let req = ApiRequest::post(format!("/channels/{}/members", segment(channel_id)))
            .json(&json!({ "user_id": user_id }))?;
        self.call(req).await
    }

    async fn remove_channel_member(&self, channel_id: &str, user_id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::delete(format!(
            "/channels/{}/members/{}",
            segment(channel_id),
            segment(user_id)
        )))
        .await
    }
}

#[async_trait]
impl CommandApi for ApiClient {
    async fn list_commands(
        &self,
        team_id: &str,
        custom_only: bool,
    ) -> ApiResult<Vec<SlashCommand>> {
        let req = ApiRequest::get("/commands")
            .query("team_id", team_id)
            .query("custom_only", custom_only);
        self.call(req).await
    }
}

#[async_trait]
impl WebhookApi for ApiClient {
    async fn get_incoming_webhooks_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<IncomingWebhook>> {
        let req = ApiRequest::get("/hooks/incoming")
            .query("team_id", team_id)
            .query("page", page)
            .query("per_page", per_page);
        self.call(req).await
    }

    async fn get_outgoing_webhooks_for_team(
        &self,
        team_id: &str,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Vec<OutgoingWebhook>> {
        let req = ApiRequest::get("/hooks/outgoing")
            .query("team_id", team_id)
            .query("page", page)
            .query("per_page", per_page);
        self.call(req).await
    }

    async fn get_incoming_webhook(&self, id: &str) -> ApiResult<IncomingWebhook> {
        self.call(ApiRequest::get(format!("/hooks/incoming/{}", segment(id))))
            .await
    }

    async fn get_outgoing_webhook(&self, id: &str) -> ApiResult<OutgoingWebhook> {
        self.call(ApiRequest::get(format!("/hooks/outgoing/{}", segment(id))))
            .await
    }

    async fn create_incoming_webhook(&self, hook: &IncomingWebhook) -> ApiResult<IncomingWebhook> {
        self.call(ApiRequest::post("/hooks/incoming").json(hook)?)
            .await
    }

    async fn delete_incoming_webhook(&self, id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::delete(format!("/hooks/incoming/{}", segment(id))))
            .await
    }

    async fn delete_outgoing_webhook(&self, id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::delete(format!("/hooks/outgoing/{}", segment(id))))
            .await
    }
}
