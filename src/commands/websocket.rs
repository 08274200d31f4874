use anyhow::{bail, Context as _, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::Context;
use crate::constants::API_PREFIX;
use crate::transport::BackendKind;

/// `https://host/sub` becomes `wss://host/sub/api/v4/websocket`.
fn websocket_url(base: &str) -> Result<url::Url> {
    let mut url = url::Url::parse(base).with_context(|| format!("invalid server URL {base}"))?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => bail!("unsupported scheme {other} for websocket"),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow::anyhow!("cannot switch {base} to {scheme}"))?;
    let path = format!("{}{API_PREFIX}/websocket", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

/// Print every server event until the connection closes.
pub async fn run(ctx: &Context<'_>) -> Result<()> {
    if ctx.session.kind() == BackendKind::LocalSocket {
        bail!("the websocket tail is only available with remote credentials");
    }
    let token = ctx
        .session
        .token()
        .context("session has no token to authenticate the websocket")?;
    if ctx.global.insecure_skip_verify {
        tracing::warn!("--insecure-skip-verify does not apply to the websocket connection");
    }
    let url = websocket_url(ctx.session.address())?;
    tracing::debug!(%url, "connecting websocket");
    let (mut ws, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("connecting to {url}"))?;

    let challenge = json!({
        "seq": 1,
        "action": "authentication_challenge",
        "data": { "token": token },
    });
    ws.send(Message::Text(challenge.to_string().into()))
        .await
        .context("sending authentication challenge")?;

    ctx.printer.print("Press CTRL+C to exit");
    ctx.printer.flush()?;
    while let Some(msg) = ws.next().await {
        match msg.context("reading websocket")? {
            Message::Text(text) => {
                let event: Value = match serde_json::from_str(text.as_str()) {
                    Ok(v) => v,
                    Err(err) => {
                        tracing::debug!(error = %err, "skipping undecodable websocket frame");
                        continue;
                    }
                };
                // Replies to our own requests carry `seq_reply` instead of `event`.
                if event.get("event").is_none() {
                    continue;
                }
                ctx.printer.set_single(true);
                ctx.printer.print_t("{{ event }}: {{ data }}", &event);
                ctx.printer.flush()?;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_websocket_urls() {
        assert_eq!(
            websocket_url("https://chat.example.com").unwrap().as_str(),
            "wss://chat.example.com/api/v4/websocket"
        );
        assert_eq!(
            websocket_url("http://localhost:8065/sub/").unwrap().as_str(),
            "ws://localhost:8065/sub/api/v4/websocket"
        );
        assert!(websocket_url("ftp://x").is_err());
    }
}
