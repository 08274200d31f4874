use async_trait::async_trait;
use serde_json::json;

use super::{decode, ApiClient, Response};
use crate::error::ApiResult;
use crate::model::{Bot, User, UserAccessToken};
use crate::transport::{segment, ApiRequest};

#[async_trait]
pub trait UserApi: Send + Sync {
    /// Who-am-I probe; the response carries the server version.
    async fn get_me(&self) -> ApiResult<(User, Response)>;
    async fn get_user(&self, id: &str) -> ApiResult<User>;
    async fn get_user_by_username(&self, username: &str) -> ApiResult<User>;
    async fn get_user_by_email(&self, email: &str) -> ApiResult<User>;
    async fn get_users(&self, page: u32, per_page: u32, in_team: Option<&str>)
        -> ApiResult<Vec<User>>;
    async fn create_user(&self, user: &User) -> ApiResult<User>;
    async fn deactivate_user(&self, id: &str) -> ApiResult<()>;
    async fn activate_user(&self, id: &str) -> ApiResult<()>;
    async fn permanent_delete_user(&self, id: &str) -> ApiResult<()>;
    async fn reset_user_mfa(&self, id: &str) -> ApiResult<()>;
    async fn update_user_password(&self, id: &str, new_password: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait TokenApi: Send + Sync {
    async fn create_user_access_token(
        &self,
        user_id: &str,
        description: &str,
    ) -> ApiResult<UserAccessToken>;
    async fn get_user_access_tokens(&self, user_id: &str) -> ApiResult<Vec<UserAccessToken>>;
    async fn revoke_user_access_token(&self, token_id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait BotApi: Send + Sync {
    async fn get_bots(
        &self,
        page: u32,
        per_page: u32,
        include_deleted: bool,
        only_orphaned: bool,
    ) -> ApiResult<Vec<Bot>>;
    async fn create_bot(&self, bot: &Bot) -> ApiResult<Bot>;
    async fn enable_bot(&self, bot_user_id: &str) -> ApiResult<Bot>;
    async fn disable_bot(&self, bot_user_id: &str) -> ApiResult<Bot>;
    async fn assign_bot(&self, bot_user_id: &str, owner_id: &str) -> ApiResult<Bot>;
}

#[async_trait]
impl UserApi for ApiClient {
    async fn get_me(&self) -> ApiResult<(User, Response)> {
        let resp = self.execute(ApiRequest::get("/users/me")).await?;
        let user = decode(&resp)?;
        Ok((user, Response::from(&resp)))
    }

    async fn get_user(&self, id: &str) -> ApiResult<User> {
        self.call(ApiRequest::get(format!("/users/{}", segment(id))))
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> ApiResult<User> {
        self.call(ApiRequest::get(format!(
            "/users/username/{}",
            segment(username)
        )))
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> ApiResult<User> {
        self.call(ApiRequest::get(format!("/users/email/{}", segment(email))))
            .await
    }

    async fn get_users(
        &self,
        page: u32,
        per_page: u32,
        in_team: Option<&str>,
    ) -> ApiResult<Vec<User>> {
        let mut req = ApiRequest::get("/users")
            .query("page", page)
            .query("per_page", per_page);
        if let Some(team_id) = in_team {
            req = req.query("in_team", team_id);
        }
        self.call(req).await
    }

    async fn create_user(&self, user: &User) -> ApiResult<User> {
        self.call(ApiRequest::post("/users").json(user)?).await
    }

    async fn deactivate_user(&self, id: &str) -> ApiResult<()> {
        self.call_empty(ApiRequest::delete(format!("/users/{}", segment(id))))
            .await
    }

    async fn activate_user(&self, id: &str) -> ApiResult<()> {
        let req = ApiRequest::put(format!("/users/{}/active", segment(id)))
            .json(&json!({ "active": true }))?;
        self.call_empty(req).await
    }

    async fn permanent_delete_user(&self, id: &str) -> ApiResult<()> {
        let req = ApiRequest::delete(format!("/users/{}", segment(id))).query("permanent", true);
        self.call_empty(req).await
    }

    async fn reset_user_mfa(&self, id: &str) -> ApiResult<()> {
        let req = ApiRequest::put(format!("/users/{}/mfa", segment(id)))
            .json(&json!({ "activate": false }))?;
        self.call_empty(req).await
    }

    async fn update_user_password(&self, id: &str, new_password: &str) -> ApiResult<()> {
        let req = ApiRequest::put(format!("/users/{}/password", segment(id)))
            .json(&json!({ "new_password": new_password }))?;
        self.call_empty(req).await
    }
}

#[async_trait]
impl TokenApi for ApiClient {
    async fn create_user_access_token(
        &self,
        user_id: &str,
        description: &str,
    ) -> ApiResult<UserAccessToken> {
        let req = ApiRequest::post(format!("/users/{}/tokens", segment(user_id)))
            .json(&json!({ "description": description }))?;
        self.call(req).await
    }

    async fn get_user_access_tokens(&self, user_id: &str) -> ApiResult<Vec<UserAccessToken>> {
        self.call(ApiRequest::get(format!("/users/{}/tokens", segment(user_id))))
            .await
    }

    async fn revoke_user_access_token(&self, token_id: &str) -> ApiResult<()> {
        let req =
            ApiRequest::post("/users/tokens/revoke").json(&json!({ "token_id": token_id }))?;
        self.call_empty(req).await
    }
}

#[async_trait]
impl BotApi for ApiClient {
    async fn get_bots(
        &self,
        page: u32,
        per_page: u32,
        include_deleted: bool,
        only_orphaned: bool,
    ) -> ApiResult<Vec<Bot>> {
        let req = ApiRequest::get("/bots")
            .query("page", page)
            .query("per_page", per_page)
            .query("include_deleted", include_deleted)
            .query("only_orphaned", only_orphaned);
        self.call(req).await
    }

    async fn create_bot(&self, bot: &Bot) -> ApiResult<Bot> {
        self.call(ApiRequest::post("/bots").json(bot)?).await
    }

    async fn enable_bot(&self, bot_user_id: &str) -> ApiResult<Bot> {
        self.call(ApiRequest::post(format!("/bots/{}/enable", segment(bot_user_id))))
            .await
    }

    async fn disable_bot(&self, bot_user_id: &str) -> ApiResult<Bot> {
        self.call(ApiRequest::post(format!("/bots/{}/disable", segment(bot_user_id))))
            .await
    }

    async fn assign_bot(&self, bot_user_id: &str, owner_id: &str) -> ApiResult<Bot> {
        self.call(ApiRequest::post(format!(
            "/bots/{}/assign/{}",
            segment(bot_user_id),
            segment(owner_id)
        )))
        .await
    }
}
