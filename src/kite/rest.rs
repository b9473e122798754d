use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::error::{AppError, KiteResult};
use crate::model::order::{OrderAck, OrderRequest};

use super::types::{KiteEnvelope, OrderPlaced, SessionTokens};

const KITE_VERSION: &str = "3";

pub struct KiteRestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    access_token: Option<String>,
}

/// `sha256(api_key + refresh_token + api_secret)` as lowercase hex.
pub fn checksum(api_key: &str, token: &str, api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(token.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn compact_error_body(body: &str) -> String {
    let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() > 180 {
        format!("{}...", normalized.chars().take(180).collect::<String>())
    } else {
        normalized
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> KiteResult<T> {
    let status = resp.status();
    let body = resp.text().await?;
    match serde_json::from_str::<KiteEnvelope<T>>(&body) {
        Ok(envelope) => envelope.into_result(),
        Err(e) if status.is_success() => Err(AppError::Json(e)),
        Err(_) if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            Err(AppError::Authentication(format!(
                "HTTP {} {}",
                status.as_u16(),
                compact_error_body(&body)
            )))
        }
        Err(_) => Err(AppError::KiteApi {
            error_type: format!("HTTP {}", status.as_u16()),
            message: compact_error_body(&body),
        }),
    }
}

impl KiteRestClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        api_secret: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Kite-Version", HeaderValue::from_static(KITE_VERSION));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .context("failed to build Kite HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            access_token: None,
        })
    }

    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = Some(access_token.into());
    }

    /// Exchange a refresh token for a fresh access token.
    pub async fn renew_access_token(&self, refresh_token: &str) -> KiteResult<SessionTokens> {
        let url = format!("{}/session/refresh_token", self.base_url);
        let checksum = checksum(&self.api_key, refresh_token, &self.api_secret);

        tracing::info!("Renewing Kite access token");
        let resp = self
            .http
            .post(&url)
            .form(&[
                ("api_key", self.api_key.as_str()),
                ("refresh_token", refresh_token),
                ("checksum", checksum.as_str()),
            ])
            .send()
            .await?;

        let tokens: SessionTokens = decode(resp).await?;
        tracing::info!(
            user_id = tokens.user_id.as_deref().unwrap_or("-"),
            rotated_refresh = tokens.refresh_token.is_some(),
            "Access token renewed"
        );
        Ok(tokens)
    }

    pub async fn place_order(&self, request: &OrderRequest) -> KiteResult<OrderAck> {
        let access_token = self
            .access_token
            .as_deref()
            .ok_or_else(|| AppError::Authentication("access token not set".to_string()))?;
        let auth = HeaderValue::from_str(&format!("token {}:{}", self.api_key, access_token))
            .map_err(|e| AppError::Authentication(format!("invalid authorization header: {}", e)))?;
        let url = format!(
            "{}/orders/{}",
            self.base_url,
            request.variety.as_kite_str()
        );

        tracing::info!(
            exchange = %request.exchange,
            symbol = %request.tradingsymbol,
            side = %request.side,
            quantity = request.quantity,
            product = request.product.as_kite_str(),
            order_type = request.order_type.as_kite_str(),
            "Placing order"
        );

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, auth)
            .form(&request.form_params())
            .send()
            .await?;

        let placed: OrderPlaced = decode(resp).await?;
        tracing::info!(order_id = %placed.order_id, "Order accepted");
        Ok(OrderAck {
            order_id: placed.order_id,
        })
    }
}
