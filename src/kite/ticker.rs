use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;

use super::packet;
use super::types::TickerTextMessage;
use crate::event::{FeedEvent, WsConnectionStatus};
use crate::model::tick::Tick;

/// Streaming mode requested for the subscribed instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerMode {
    Ltp,
}

impl TickerMode {
    pub fn as_kite_str(&self) -> &'static str {
        match self {
            TickerMode::Ltp => "ltp",
        }
    }
}

pub fn subscribe_message(tokens: &[u32]) -> String {
    json!({ "a": "subscribe", "v": tokens }).to_string()
}

pub fn mode_message(mode: TickerMode, tokens: &[u32]) -> String {
    json!({ "a": "mode", "v": [mode.as_kite_str(), tokens] }).to_string()
}

pub struct KiteTickerClient {
    url: url::Url,
}

impl KiteTickerClient {
    pub fn new(ws_base_url: &str, api_key: &str, access_token: &str) -> Result<Self> {
        let url = url::Url::parse_with_params(
            ws_base_url,
            &[("api_key", api_key), ("access_token", access_token)],
        )
        .with_context(|| format!("invalid ticker url '{}'", ws_base_url))?;
        Ok(Self { url })
    }

    /// Host and path only; the query carries the access token.
    pub fn endpoint(&self) -> String {
        format!(
            "{}://{}{}",
            self.url.scheme(),
            self.url.host_str().unwrap_or("-"),
            self.url
                .port()
                .map(|p| format!(":{}", p))
                .unwrap_or_default()
        )
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Connect once, subscribe `instrument_token` in LTP mode and forward tick
    /// batches until the socket drops or `shutdown` flips.
    ///
    /// There is no reconnect: a dropped connection reports `Disconnected` and
    /// returns.
    pub async fn connect_and_run(
        &self,
        instrument_token: u32,
        feed_tx: mpsc::Sender<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        tracing::info!(endpoint = %self.endpoint(), "Connecting to Kite ticker");

        let connected = tokio::select! {
            res = tokio_tungstenite::connect_async(self.url.as_str()) => res,
            _ = shutdown.changed() => return Ok(()),
        };
        let (ws_stream, _resp) = match connected {
            Ok(v) => v,
            Err(e) => {
                let _ = feed_tx
                    .send(FeedEvent::Status(WsConnectionStatus::Disconnected {
                        reason: format!("connect failed: {}", e),
                    }))
                    .await;
                return Err(anyhow::anyhow!("WebSocket connect failed: {}", e));
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let tokens = [instrument_token];
        write
            .send(tungstenite::Message::Text(subscribe_message(&tokens)))
            .await
            .context("subscribe send failed")?;
        write
            .send(tungstenite::Message::Text(mode_message(TickerMode::Ltp, &tokens)))
            .await
            .context("mode send failed")?;

        let _ = feed_tx
            .send(FeedEvent::Status(WsConnectionStatus::Connected))
            .await;
        tracing::info!(instrument_token, mode = "ltp", "WebSocket connected and subscribed");

        let reason = loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Binary(bytes))) => {
                            match packet::parse_frame(&bytes) {
                                Ok(packets) if !packets.is_empty() => {
                                    let ticks: Vec<Tick> = packets
                                        .into_iter()
                                        .map(|p| Tick::now(p.instrument_token, p.last_price))
                                        .collect();
                                    if feed_tx.try_send(FeedEvent::Ticks(ticks)).is_err() {
                                        tracing::warn!("Tick channel full, dropping tick batch");
                                    }
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    tracing::debug!(error = %e, "Failed to parse ticker frame");
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            handle_text_message(&text);
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            break format!("closed by server: {:?}", frame);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            break format!("read error: {}", e);
                        }
                        None => {
                            break "stream ended".to_string();
                        }
                    }
                }
                _ = shutdown.changed() => {
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    tracing::info!("Ticker shutdown requested");
                    return Ok(());
                }
            }
        };

        tracing::warn!(%reason, "Ticker disconnected; no further ticks will arrive");
        let _ = feed_tx
            .send(FeedEvent::Status(WsConnectionStatus::Disconnected { reason }))
            .await;
        Ok(())
    }
}

fn handle_text_message(text: &str) {
    match serde_json::from_str::<TickerTextMessage>(text) {
        Ok(msg) if msg.kind == "error" => {
            tracing::error!(data = %msg.data, "Ticker error message");
        }
        Ok(msg) => {
            tracing::debug!(kind = %msg.kind, data = %msg.data, "Ticker text message");
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to parse ticker text message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_messages_match_kite_protocol() {
        assert_eq!(subscribe_message(&[256_788]), r#"{"a":"subscribe","v":[256788]}"#);
        assert_eq!(
            mode_message(TickerMode::Ltp, &[256_788]),
            r#"{"a":"mode","v":["ltp",[256788]]}"#
        );
    }

    #[test]
    fn url_carries_credentials_but_endpoint_hides_them() {
        let client = KiteTickerClient::new("wss://ws.kite.trade", "key1", "tok/2").unwrap();
        let query = client.url().query().unwrap_or_default().to_string();
        assert!(query.contains("api_key=key1"));
        assert!(query.contains("access_token=tok%2F2"));
        assert_eq!(client.endpoint(), "wss://ws.kite.trade");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(KiteTickerClient::new("not a url", "k", "t").is_err());
    }
}
