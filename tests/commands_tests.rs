use chatctl::commands::run_with;
use chatctl::confirm::{ConfirmError, Prompter};
use chatctl::printer::Printer;
use chatctl::Cli;
use clap::Parser;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

/// Nobody at the keyboard.
struct Unattended;

impl Prompter for Unattended {
    fn is_interactive(&self) -> bool {
        false
    }

    fn ask(&self, question: &str) -> Result<String, ConfirmError> {
        Err(ConfirmError::Prompt(format!("unexpected question: {question}")))
    }

    fn ask_secret(&self, question: &str) -> Result<String, ConfirmError> {
        self.ask(question)
    }
}

/// A mock instance with stored credentials pointing at it.
struct Fixture {
    server: MockServer,
    config: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v4/users/me")
                .header("authorization", "Bearer tok");
            then.status(200)
                .json_body(json!({"id": "admin", "username": "sysadmin"}));
        });
        let config = TempDir::new().unwrap();
        let creds = format!(
            "mock:\n  name: mock\n  instanceUrl: {}\n  username: sysadmin\n  authToken: tok\n  active: true\n",
            server.base_url()
        );
        std::fs::write(config.path().join("credentials.yaml"), creds).unwrap();
        Self { server, config }
    }

    async fn run(&self, args: &[&str]) -> (Printer, anyhow::Result<()>) {
        let config = self.config.path().to_string_lossy().into_owned();
        let mut argv = vec!["chatctl", "--suppress-warnings", "--config", config.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::parse_from(argv);
        let printer = Printer::new();
        let res = run_with(cli, &printer, &Unattended).await;
        (printer, res)
    }
}

#[tokio::test]
async fn user_deactivate_reports_misses_and_continues() {
    let fx = Fixture::new();
    let alice = fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/users/email/alice@x");
        then.status(200)
            .json_body(json!({"id": "a1", "username": "alice", "email": "alice@x"}));
    });
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/users/username/charlie");
        then.status(200)
            .json_body(json!({"id": "c1", "username": "charlie", "email": "charlie@x"}));
    });
    let deactivate_alice = fx.server.mock(|when, then| {
        when.method(DELETE).path("/api/v4/users/a1");
        then.status(200).json_body(json!({"status": "OK"}));
    });
    let deactivate_charlie = fx.server.mock(|when, then| {
        when.method(DELETE).path("/api/v4/users/c1");
        then.status(200).json_body(json!({"status": "OK"}));
    });

    let (printer, res) = fx
        .run(&["user", "deactivate", "alice@x", "bogus", "charlie"])
        .await;
    res.unwrap();

    alice.assert_calls(1);
    deactivate_alice.assert_calls(1);
    deactivate_charlie.assert_calls(1);
    assert_eq!(
        printer.plain_lines(),
        vec!["a1: alice (alice@x)", "c1: charlie (charlie@x)"]
    );
    assert_eq!(printer.error_lines(), vec!["can't find user 'bogus'"]);
}

#[tokio::test]
async fn channel_list_puts_archived_channels_last() {
    let fx = Fixture::new();
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams/name/myteam");
        then.status(200)
            .json_body(json!({"id": "t1", "name": "myteam"}));
    });
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams/t1/channels");
        then.status(200).json_body(json!([
            {"id": "ca", "team_id": "t1", "name": "a", "type": "O"},
            {"id": "cb", "team_id": "t1", "name": "b", "type": "O"}
        ]));
    });
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams/t1/channels/private");
        then.status(200).json_body(json!([]));
    });
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams/t1/channels/deleted");
        then.status(200).json_body(json!([
            {"id": "cc", "team_id": "t1", "name": "c", "type": "O", "delete_at": 1}
        ]));
    });

    let (printer, res) = fx.run(&["channel", "list", "myteam"]).await;
    res.unwrap();
    assert_eq!(printer.plain_lines(), vec!["a", "b", "c (archived)"]);
    assert!(printer.error_lines().is_empty());
}

#[tokio::test]
async fn permission_add_stops_when_the_role_is_missing() {
    let fx = Fixture::new();
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/roles/name/system_user");
        then.status(404)
            .json_body(json!({"id": "app.role.get_by_name.app_error", "message": "not found"}));
    });
    let patch = fx.server.mock(|when, then| {
        when.method(PUT);
        then.status(200).json_body(json!({}));
    });

    let (_, res) = fx
        .run(&["permission", "add", "system_user", "create_bot"])
        .await;
    let err = res.unwrap_err();
    assert_eq!(err.to_string(), "role not found");
    patch.assert_calls(0);
}

#[tokio::test]
async fn export_create_requests_attachments() {
    let fx = Fixture::new();
    let create = fx.server.mock(|when, then| {
        when.method(POST)
            .path("/api/v4/jobs")
            .json_body_includes(
                json!({"type": "export_process", "data": {"include_attachments": "true"}})
                    .to_string(),
            );
        then.status(201).json_body(json!({
            "id": "j1",
            "type": "export_process",
            "status": "pending",
            "data": {"include_attachments": "true"}
        }));
    });

    let (printer, res) = fx.run(&["export", "create", "--attachments"]).await;
    res.unwrap();
    create.assert_calls(1);
    let lines = printer.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].value["data"]["include_attachments"], "true");
}

#[tokio::test]
async fn team_archive_with_confirm_archives_each_team() {
    let fx = Fixture::new();
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams/t1");
        then.status(200).json_body(json!({"id": "t1", "name": "one"}));
    });
    let archive = fx.server.mock(|when, then| {
        when.method(DELETE).path("/api/v4/teams/t1");
        then.status(200).json_body(json!({"status": "OK"}));
    });

    let (printer, res) = fx.run(&["team", "archive", "t1", "missing", "--confirm"]).await;
    res.unwrap();
    archive.assert_calls(1);
    assert_eq!(printer.error_lines(), vec!["can't find team 'missing'"]);
}

#[tokio::test]
async fn rejected_token_fails_before_the_handler() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v4/users/me");
        then.status(401)
            .json_body(json!({"id": "api.context.session_expired.app_error", "message": "Invalid or expired session"}));
    });
    let teams = server.mock(|when, then| {
        when.method(GET).path("/api/v4/teams");
        then.status(200).json_body(json!([]));
    });
    let config = TempDir::new().unwrap();
    std::fs::write(
        config.path().join("credentials.yaml"),
        format!(
            "old:\n  instanceUrl: {}\n  username: sysadmin\n  authToken: stale\n  active: true\n",
            server.base_url()
        ),
    )
    .unwrap();

    let dir = config.path().to_string_lossy().into_owned();
    let cli = Cli::parse_from(["chatctl", "--config", dir.as_str(), "team", "list"]);
    let printer = Printer::new();
    let err = run_with(cli, &printer, &Unattended).await.unwrap_err();
    assert!(err.to_string().contains("could not verify the session"), "{err}");
    teams.assert_calls(0);
}

#[tokio::test]
async fn failed_actions_and_misses_both_reach_the_error_stream() {
    let fx = Fixture::new();
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/users/username/alice");
        then.status(200)
            .json_body(json!({"id": "a1", "username": "alice", "email": "alice@x"}));
    });
    fx.server.mock(|when, then| {
        when.method(GET).path("/api/v4/users/username/bob");
        then.status(200)
            .json_body(json!({"id": "b1", "username": "bob", "email": "bob@x"}));
    });
    fx.server.mock(|when, then| {
        when.method(DELETE).path("/api/v4/users/a1");
        then.status(200).json_body(json!({"status": "OK"}));
    });
    let broken = fx.server.mock(|when, then| {
        when.method(DELETE).path("/api/v4/users/b1");
        then.status(500)
            .json_body(json!({"id": "store.sql.error", "message": "db down"}));
    });

    let (printer, res) = fx
        .run(&["user", "deactivate", "alice", "bob", "ghost"])
        .await;
    res.unwrap();

    broken.assert_calls(1);
    assert_eq!(printer.plain_lines(), vec!["a1: alice (alice@x)"]);
    assert_eq!(
        printer.error_lines(),
        vec![
            "unable to deactivate user bob: db down",
            "can't find user 'ghost'",
        ]
    );
}

#[tokio::test]
async fn webhook_list_prints_incoming_before_outgoing_per_team() {
    let fx = Fixture::new();
    for team in ["t1", "t2"] {
        fx.server.mock(|when, then| {
            when.method(GET).path(format!("/api/v4/teams/{team}"));
            then.status(200).json_body(json!({"id": team, "name": team}));
        });
        fx.server.mock(|when, then| {
            when.method(GET)
                .path("/api/v4/hooks/incoming")
                .query_param("team_id", team);
            then.status(200).json_body(json!([
                {"id": format!("in-{team}"), "team_id": team, "display_name": format!("{team} in")}
            ]));
        });
        fx.server.mock(|when, then| {
            when.method(GET)
                .path("/api/v4/hooks/outgoing")
                .query_param("team_id", team);
            then.status(200).json_body(json!([
                {"id": format!("out-{team}"), "team_id": team, "display_name": format!("{team} out")}
            ]));
        });
    }

    let (printer, res) = fx.run(&["webhook", "list", "t1", "t2"]).await;
    res.unwrap();
    assert_eq!(
        printer.plain_lines(),
        vec![
            "Incoming:\tt1 in (in-t1)",
            "Outgoing:\tt1 out (out-t1)",
            "Incoming:\tt2 in (in-t2)",
            "Outgoing:\tt2 out (out-t2)",
        ]
    );
    assert!(printer.error_lines().is_empty());
}

#[tokio::test]
async fn listings_over_every_team_walk_all_pages() {
    let fx = Fixture::new();
    let first: Vec<_> = (0..200)
        .map(|i| json!({"id": format!("t{i}"), "name": format!("team{i}")}))
        .collect();
    let page0 = fx.server.mock(|when, then| {
        when.method(GET)
            .path("/api/v4/teams")
            .query_param("page", "0");
        then.status(200).json_body(json!(first));
    });
    let page1 = fx.server.mock(|when, then| {
        when.method(GET)
            .path("/api/v4/teams")
            .query_param("page", "1");
        then.status(200)
            .json_body(json!([{"id": "t200", "name": "team200"}]));
    });
    fx.server.mock(|when, then| {
        when.method(GET)
            .path("/api/v4/commands")
            .query_param("team_id", "t200");
        then.status(200).json_body(json!([
            {"id": "c1", "team_id": "t200", "trigger": "deploy", "display_name": "Deploy"}
        ]));
    });
    for i in 0..200 {
        fx.server.mock(|when, then| {
            when.method(GET)
                .path("/api/v4/commands")
                .query_param("team_id", format!("t{i}"));
            then.status(200).json_body(json!([]));
        });
    }

    let (printer, res) = fx.run(&["command", "list"]).await;
    res.unwrap();
    page0.assert_calls(1);
    page1.assert_calls(1);
    assert_eq!(
        printer.plain_lines(),
        vec!["c1: Deploy (team: t200) /deploy"]
    );
    assert!(printer.error_lines().is_empty());
}

#[tokio::test]
async fn deleting_a_profile_without_a_credentials_file_succeeds() {
    let config = TempDir::new().unwrap();
    let dir = config.path().to_string_lossy().into_owned();
    let cli = Cli::parse_from(["chatctl", "--config", dir.as_str(), "auth", "delete", "prod"]);
    let printer = Printer::new();
    run_with(cli, &printer, &Unattended).await.unwrap();
    assert!(printer.error_lines().is_empty());
    assert!(!config.path().join("credentials.yaml").exists());
}
