use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Token material returned by the provider. Passed straight through to the
/// browser, never persisted server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Structured error body the provider sends on a rejected exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

/// Payload for `GET /api/status`, the front-end's availability probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub mode: String,
    pub timestamp: String,
    pub redirect_uri: String,
    pub front_end_url: String,
    pub cors_origin: String,
}

#[cfg(test)]
mod tests {
    use super::TokenResponse;

    #[test]
    fn token_response_tolerates_extra_fields() {
        let body = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "token_type": "Bearer",
            "expires_in": 86400,
            "created_at": 1700000000
        }"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(token.access_token, "at");
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));
        assert_eq!(token.expires_in, Some(86400));
        assert!(token.extra.contains_key("created_at"));
    }

    #[test]
    fn token_response_allows_missing_optionals() {
        let token: TokenResponse = serde_json::from_str(r#"{"access_token": "at"}"#).unwrap();
        assert!(token.refresh_token.is_none());
        assert!(token.expires_in.is_none());
    }
}
