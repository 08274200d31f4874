//! Entity resolution: turn operator-supplied references into server entities.
//!
//! Users, teams and channels share loose namespaces on the server, so one
//! argument may be an id, a name, or an email. Each resolver tries the lookups
//! in a fixed order and returns the first hit. A lookup miss (see
//! [`is_lookup_miss`]) moves on to the next key; any other error stops the
//! cascade and is surfaced unchanged.

use std::fmt;

use crate::client::{ChannelApi, TeamApi, UserApi};
use crate::error::{is_lookup_miss, ApiError, ApiResult};
use crate::model::{Channel, Team, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Team,
    Channel,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::User => "user",
            EntityKind::Team => "team",
            EntityKind::Channel => "channel",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("{kind} {arg} not found")]
    NotFound { kind: EntityKind, arg: String },
    #[error("resolving {kind} {arg}: {source}")]
    Lookup {
        kind: EntityKind,
        arg: String,
        #[source]
        source: ApiError,
    },
}

impl ResolveError {
    pub fn arg(&self) -> &str {
        match self {
            ResolveError::NotFound { arg, .. } | ResolveError::Lookup { arg, .. } => arg,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }

    /// The line lenient commands put on the error stream.
    pub fn describe(&self) -> String {
        match self {
            ResolveError::NotFound { kind, arg } => format!("can't find {kind} '{arg}'"),
            other => other.to_string(),
        }
    }
}

/// Outcome of resolving several arguments independently.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub found: Vec<T>,
    pub errors: Vec<ResolveError>,
}

impl<T> Default for Resolved<T> {
    fn default() -> Self {
        Self {
            found: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> Resolved<T> {
    fn push(&mut self, outcome: Result<T, ResolveError>) {
        match outcome {
            Ok(v) => self.found.push(v),
            Err(e) => self.errors.push(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKey {
    Email,
    Username,
    Id,
}

/// Which user lookups run for `arg`, in order.
///
/// `..` never reaches the email endpoint and `/` only ever goes to the id
/// endpoint; both would be rewritten or rejected in the request path.
pub fn user_lookup_plan(arg: &str) -> Vec<UserKey> {
    let has_slash = arg.contains('/');
    let mut plan = Vec::with_capacity(3);
    if !arg.contains("..") && !has_slash {
        plan.push(UserKey::Email);
    }
    if !has_slash {
        plan.push(UserKey::Username);
    }
    plan.push(UserKey::Id);
    plan
}

/// Keep a hit, swallow a miss, fail on anything severe.
fn step<T>(kind: EntityKind, arg: &str, outcome: ApiResult<T>) -> Result<Option<T>, ResolveError> {
    match outcome {
        Ok(v) => Ok(Some(v)),
        Err(e) if is_lookup_miss(&e) => Ok(None),
        Err(source) => Err(ResolveError::Lookup {
            kind,
            arg: arg.to_string(),
            source,
        }),
    }
}

fn not_found(kind: EntityKind, arg: &str) -> ResolveError {
    ResolveError::NotFound {
        kind,
        arg: arg.to_string(),
    }
}

pub async fn resolve_user<C: UserApi + ?Sized>(client: &C, arg: &str) -> Result<User, ResolveError> {
    for key in user_lookup_plan(arg) {
        let outcome = match key {
            UserKey::Email => client.get_user_by_email(arg).await,
            UserKey::Username => client.get_user_by_username(arg).await,
            UserKey::Id => client.get_user(arg).await,
        };
        if let Some(user) = step(EntityKind::User, arg, outcome)? {
            tracing::debug!(arg, ?key, id = %user.id, "resolved user");
            return Ok(user);
        }
    }
    Err(not_found(EntityKind::User, arg))
}

pub async fn resolve_team<C: TeamApi + ?Sized>(client: &C, arg: &str) -> Result<Team, ResolveError> {
    if let Some(team) = step(EntityKind::Team, arg, client.get_team(arg).await)? {
        return Ok(team);
    }
    if let Some(team) = step(EntityKind::Team, arg, client.get_team_by_name(arg).await)? {
        return Ok(team);
    }
    Err(not_found(EntityKind::Team, arg))
}

/// Resolve `team:channel`, or a bare channel id.
pub async fn resolve_channel<C: TeamApi + ChannelApi + ?Sized>(
    client: &C,
    arg: &str,
) -> Result<Channel, ResolveError> {
    let (team_part, channel_part) = match arg.split_once(':') {
        Some((team, channel)) => (Some(team), channel),
        None => (None, arg),
    };

    if let Some(team_arg) = team_part {
        match resolve_team(client, team_arg).await {
            Ok(team) => {
                let outcome = client
                    .get_channel_by_name(channel_part, &team.id, true)
                    .await;
                if let Some(channel) = step(EntityKind::Channel, arg, outcome)? {
                    return Ok(channel);
                }
            }
            Err(ResolveError::NotFound { .. }) => {}
            Err(ResolveError::Lookup { source, .. }) => {
                return Err(ResolveError::Lookup {
                    kind: EntityKind::Channel,
                    arg: arg.to_string(),
                    source,
                })
            }
        }
    }

    if let Some(channel) = step(
        EntityKind::Channel,
        arg,
        client.get_channel(channel_part).await,
    )? {
        return Ok(channel);
    }
    Err(not_found(EntityKind::Channel, arg))
}

pub async fn resolve_users<C, S>(client: &C, args: &[S]) -> Resolved<User>
where
    C: UserApi + ?Sized,
    S: AsRef<str> + Sync,
{
    let mut out = Resolved::default();
    for arg in args {
        out.push(resolve_user(client, arg.as_ref()).await);
    }
    out
}

pub async fn resolve_teams<C, S>(client: &C, args: &[S]) -> Resolved<Team>
where
    C: TeamApi + ?Sized,
    S: AsRef<str> + Sync,
{
    let mut out = Resolved::default();
    for arg in args {
        out.push(resolve_team(client, arg.as_ref()).await);
    }
    out
}

pub async fn resolve_channels<C, S>(client: &C, args: &[S]) -> Resolved<Channel>
where
    C: TeamApi + ChannelApi + ?Sized,
    S: AsRef<str> + Sync,
{
    let mut out = Resolved::default();
    for arg in args {
        out.push(resolve_channel(client, arg.as_ref()).await);
    }
    out
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory server state for resolver and waiter tests.

    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::client::{ChannelApi, Response, TeamApi, UserApi};
    use crate::error::{ApiError, ApiResult};
    use crate::model::*;

    #[derive(Default)]
    pub struct FakeServer {
        pub users: Vec<User>,
        pub teams: Vec<Team>,
        pub channels: Vec<Channel>,
        /// Status code returned for every lookup of a given argument.
        pub failures: HashMap<String, u16>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeServer {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn lookup<T: Clone>(
            &self,
            call: &str,
            arg: &str,
            found: Option<&T>,
        ) -> ApiResult<T> {
            self.record(format!("{call}:{arg}"));
            if let Some(status) = self.failures.get(arg) {
                return Err(ApiError::from_response(*status, b"{}", None));
            }
            found
                .cloned()
                .ok_or_else(|| ApiError::from_response(404, b"{}", None))
        }
    }

    pub fn user(id: &str, username: &str, email: &str) -> User {
        User {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    fn unsupported<T>() -> ApiResult<T> {
        Err(ApiError::transport("not supported by fake"))
    }

    #[async_trait]
    impl UserApi for FakeServer {
        async fn get_me(&self) -> ApiResult<(User, Response)> {
            unsupported()
        }
        async fn get_user(&self, id: &str) -> ApiResult<User> {
            self.lookup("id", id, self.users.iter().find(|u| u.id == id))
        }
        async fn get_user_by_username(&self, username: &str) -> ApiResult<User> {
            self.lookup(
                "username",
                username,
                self.users.iter().find(|u| u.username == username),
            )
        }
        async fn get_user_by_email(&self, email: &str) -> ApiResult<User> {
            self.lookup("email", email, self.users.iter().find(|u| u.email == email))
        }
        async fn get_users(&self, _: u32, _: u32, _: Option<&str>) -> ApiResult<Vec<User>> {
            Ok(self.users.clone())
        }
        async fn create_user(&self, _: &User) -> ApiResult<User> {
            unsupported()
        }
        async fn deactivate_user(&self, _: &str) -> ApiResult<()> {
            unsupported()
        }
        async fn activate_user(&self, _: &str) -> ApiResult<()> {
            unsupported()
        }
        async fn permanent_delete_user(&self, _: &str) -> ApiResult<()> {
            unsupported()
        }
        async fn reset_user_mfa(&self, _: &str) -> ApiResult<()> {
            unsupported()
        }
        async fn update_user_password(&self, _: &str, _: &str) -> ApiResult<()> {
            unsupported()
        }
    }

    #[async_trait]
    impl TeamApi for FakeServer {
        async fn get_team(&self, id: &str) -> ApiResult<Team> {
            self.lookup("team-id", id, self.teams.iter().find(|t| t.id == id))
        }
        async fn get_team_by_name(&self, name: &str) -> ApiResult<Team> {
            self.lookup("team-name", name, self.teams.iter().find(|t| t.name == name))
        }
        async fn get_all_teams(&self, _: u32, _: u32, _: bool) -> ApiResult<Vec<Team>> {
            Ok(self.teams.clone())
        }
        async fn search_teams(&self, _: &str) -> ApiResult<Vec<Team>> {
            unsupported()
        }
        async fn create_team(&self, _: &Team) -> ApiResult<Team> {
            unsupported()
        }
        async fn soft_delete_team(&self, _: &str) -> ApiResult<()> {
            unsupported()
        }
        async fn permanent_delete_team(&self, _: &str) -> ApiResult<()> {
            unsupported()
        }
        async fn restore_team(&self, _: &str) -> ApiResult<Team> {
            unsupported()
        }
        async fn patch_team(&self, _: &str, _: &TeamPatch) -> ApiResult<Team> {
            unsupported()
        }
        async fn add_team_member(&self, _: &str, _: &str) -> ApiResult<TeamMember> {
            unsupported()
        }
        async fn remove_team_member(&self, _: &str, _: &str) -> ApiResult<()> {
            unsupported()
        }
    }

    #[async_trait]
    impl ChannelApi for FakeServer {
        async fn get_channel(&self, id: &str) -> ApiResult<Channel> {
            self.lookup("channel-id", id, self.channels.iter().find(|c| c.id == id))
        }
        async fn get_channel_by_name(
            &self,
            name: &str,
            team_id: &str,
            _include_deleted: bool,
        ) -> ApiResult<Channel> {
            self.lookup(
                "channel-name",
                name,
                self.channels
                    .iter()
                    .find(|c| c.name == name && c.team_id == team_id),
            )
        }
        async fn get_public_channels_for_team(
            &self,
            _: &str,
            _: u32,
            _: u32,
        ) -> ApiResult<Vec<Channel>> {
            unsupported()
        }
        async fn get_private_channels_for_team(
            &self,
            _: &str,
            _: u32,
            _: u32,
        ) -> ApiResult<Vec<Channel>> {
            unsupported()
        }
        async fn get_deleted_channels_for_team(
            &self,
            _: &str,
            _: u32,
            _: u32,
        ) -> ApiResult<Vec<Channel>> {
            unsupported()
        }
        async fn search_channels(&self, _: &str, _: &str) -> ApiResult<Vec<Channel>> {
            unsupported()
        }
        async fn create_channel(&self, _: &Channel) -> ApiResult<Channel> {
            unsupported()
        }
        async fn patch_channel(&self, _: &str, _: &ChannelPatch) -> ApiResult<Channel> {
            unsupported()
        }
        async fn delete_channel(&self, _: &str) -> ApiResult<()> {
            unsupported()
        }
        async fn restore_channel(&self, _: &str) -> ApiResult<Channel> {
            unsupported()
        }
        async fn add_channel_member(&self, _: &str, _: &str) -> ApiResult<ChannelMember> {
            unsupported()
        }
        async fn remove_channel_member(&self, _: &str, _: &str) -> ApiResult<()> {
            unsupported()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{user, FakeServer};
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    fn server() -> FakeServer {
        FakeServer {
            users: vec![
                user("u1", "alice", "alice@x"),
                user("u2", "bob", "bob@x"),
                // username collides with alice's email
                user("u3", "alice@x", "impostor@x"),
            ],
            teams: vec![Team {
                id: "t1".into(),
                name: "myteam".into(),
                ..Default::default()
            }],
            channels: vec![Channel {
                id: "c1".into(),
                team_id: "t1".into(),
                name: "town-square".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn plan_skips_per_argument_shape() {
        assert_eq!(
            user_lookup_plan("alice"),
            vec![UserKey::Email, UserKey::Username, UserKey::Id]
        );
        assert_eq!(user_lookup_plan("a..b"), vec![UserKey::Username, UserKey::Id]);
        assert_eq!(user_lookup_plan("a/b"), vec![UserKey::Id]);
        assert_eq!(user_lookup_plan("../etc"), vec![UserKey::Id]);
    }

    #[tokio::test]
    async fn email_wins_over_username() {
        let srv = server();
        let u = resolve_user(&srv, "alice@x").await.unwrap();
        assert_eq!(u.id, "u1");
        assert_eq!(srv.calls(), vec!["email:alice@x"]);
    }

    #[tokio::test]
    async fn falls_through_to_id() {
        let srv = server();
        let u = resolve_user(&srv, "u2").await.unwrap();
        assert_eq!(u.username, "bob");
        assert_eq!(srv.calls(), vec!["email:u2", "username:u2", "id:u2"]);
    }

    #[tokio::test]
    async fn slash_only_tries_id() {
        let srv = server();
        let err = resolve_user(&srv, "a/b").await.unwrap_err();
        assert_eq!(err.to_string(), "user a/b not found");
        assert_eq!(srv.calls(), vec!["id:a/b"]);
    }

    #[tokio::test]
    async fn severe_error_short_circuits() {
        let mut srv = server();
        srv.failures.insert("carol".into(), 403);
        let err = resolve_user(&srv, "carol").await.unwrap_err();
        match &err {
            ResolveError::Lookup { source, .. } => assert_eq!(source.kind, ErrorKind::Forbidden),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(srv.calls(), vec!["email:carol"]);
    }

    #[tokio::test]
    async fn bad_request_counts_as_miss() {
        let mut srv = server();
        srv.failures.insert("weird".into(), 400);
        let err = resolve_user(&srv, "weird").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.describe(), "can't find user 'weird'");
    }

    #[tokio::test]
    async fn team_by_id_then_name() {
        let srv = server();
        assert_eq!(resolve_team(&srv, "myteam").await.unwrap().id, "t1");
        assert_eq!(srv.calls(), vec!["team-id:myteam", "team-name:myteam"]);
        assert!(resolve_team(&srv, "nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn channel_with_team_prefix() {
        let srv = server();
        let c = resolve_channel(&srv, "myteam:town-square").await.unwrap();
        assert_eq!(c.id, "c1");
    }

    #[tokio::test]
    async fn channel_falls_back_to_id_of_channel_part() {
        let srv = server();
        let c = resolve_channel(&srv, "ghost-team:c1").await.unwrap();
        assert_eq!(c.id, "c1");
        assert_eq!(srv.calls().last().unwrap(), "channel-id:c1");

        let c = resolve_channel(&srv, "c1").await.unwrap();
        assert_eq!(c.name, "town-square");
    }

    #[tokio::test]
    async fn channel_team_forbidden_surfaces() {
        let mut srv = server();
        srv.failures.insert("secret".into(), 403);
        let err = resolve_channel(&srv, "secret:town-square").await.unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Lookup {
                kind: EntityKind::Channel,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn batch_keeps_successes_and_errors_apart() {
        let srv = server();
        let out = resolve_users(&srv, &["alice@x", "bogus", "bob"]).await;
        let ids: Vec<_> = out.found.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].arg(), "bogus");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn resolution_is_deterministic(arg in "[a-z0-9@./]{1,12}") {
            let srv = server();
            let first = block_on(resolve_user(&srv, &arg));
            let second = block_on(resolve_user(&srv, &arg));
            prop_assert_eq!(first, second);
        }

        #[test]
        fn slash_arguments_only_hit_id(prefix in "[a-z]{1,6}", suffix in "[a-z]{1,6}") {
            let srv = server();
            let arg = format!("{prefix}/{suffix}");
            let _ = block_on(resolve_user(&srv, &arg));
            prop_assert_eq!(srv.calls(), vec![format!("id:{arg}")]);
        }

        #[test]
        fn double_dot_never_hits_email(prefix in "[a-z]{1,6}", suffix in "[a-z]{1,6}") {
            let srv = server();
            let arg = format!("{prefix}..{suffix}");
            let _ = block_on(resolve_user(&srv, &arg));
            prop_assert!(srv.calls().iter().all(|c| !c.starts_with("email:")));
        }

        #[test]
        fn existing_email_beats_colliding_username(local in "[a-z]{1,8}") {
            let email = format!("{local}@corp");
            let srv = FakeServer {
                users: vec![user("by-email", "someone", &email), user("by-name", &email, "other@corp")],
                ..Default::default()
            };
            let u = block_on(resolve_user(&srv, &email)).unwrap();
            prop_assert_eq!(u.id, "by-email");
        }
    }
}
