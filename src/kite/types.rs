use serde::Deserialize;

use crate::error::{AppError, KiteResult};

/// Kite Connect v3 response envelope.
#[derive(Debug, Deserialize)]
pub struct KiteEnvelope<T> {
    pub status: String,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error_type: Option<String>,
}

impl<T> KiteEnvelope<T> {
    pub fn into_result(self) -> KiteResult<T> {
        if self.status == "success" {
            return self.data.ok_or_else(|| AppError::KiteApi {
                error_type: "DataException".to_string(),
                message: "success response without data".to_string(),
            });
        }
        Err(AppError::from_kite(
            self.error_type.as_deref().unwrap_or("GeneralException"),
            self.message.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

/// Data of `POST /session/refresh_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Data of `POST /orders/{variety}`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPlaced {
    pub order_id: String,
}

/// JSON text frame pushed on the ticker socket.
#[derive(Debug, Deserialize)]
pub struct TickerTextMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_yields_data() {
        let body = r#"{"status":"success","data":{"access_token":"at","refresh_token":"rt","user_id":"AB1234"}}"#;
        let env: KiteEnvelope<SessionTokens> = serde_json::from_str(body).unwrap();
        let tokens = env.into_result().unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert_eq!(tokens.user_id.as_deref(), Some("AB1234"));
    }

    #[test]
    fn error_envelope_maps_error_type() {
        let body = r#"{"status":"error","message":"Token is invalid or has expired.","error_type":"TokenException"}"#;
        let env: KiteEnvelope<SessionTokens> = serde_json::from_str(body).unwrap();
        match env.into_result() {
            Err(AppError::Authentication(msg)) => assert!(msg.contains("expired")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn success_without_data_is_an_error() {
        let env: KiteEnvelope<OrderPlaced> =
            serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(matches!(env.into_result(), Err(AppError::KiteApi { .. })));
    }
}
