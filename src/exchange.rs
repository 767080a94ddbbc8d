use std::collections::HashMap;

use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};

use crate::RelayConfig;
use crate::error::{RejectionKind, RelayError, UpstreamRejection};
use crate::types::{TokenResponse, UpstreamErrorBody};

const RELAY_USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (+https://shikimori.one/oauth/applications)"
);

/// Performs the authorization-code exchange against the provider's token
/// endpoint. One outbound call per invocation, bounded by the configured
/// timeout, no retries.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    http: Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl TokenExchanger {
    pub fn new(config: &RelayConfig, redirect_uri: impl Into<String>) -> Result<Self, RelayError> {
        let http = Client::builder()
            .timeout(config.exchange_timeout)
            .build()
            .map_err(RelayError::from_request_error)?;
        Ok(Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: redirect_uri.into(),
        })
    }

    /// The exact redirect URI sent upstream. Must match the one surfaced by
    /// the status route and the diagnostic home page.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Trade an authorization code for tokens.
    ///
    /// The request is form-encoded, matching what Shikimori's doorkeeper
    /// endpoint expects. The client secret goes into the request body and
    /// nowhere else.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, RelayError> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => (id.clone(), secret.clone()),
            _ => return Err(RelayError::MissingCredentials),
        };

        tracing::debug!(
            token_url = %self.token_url,
            redirect_uri = %self.redirect_uri,
            client_id_present = true,
            client_secret_present = true,
            "exchanging authorization code"
        );

        let mut payload = HashMap::new();
        payload.insert("grant_type".to_string(), "authorization_code".to_string());
        payload.insert("client_id".to_string(), client_id);
        payload.insert("client_secret".to_string(), client_secret);
        payload.insert("code".to_string(), code.to_string());
        payload.insert("redirect_uri".to_string(), self.redirect_uri.clone());

        let response = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, RELAY_USER_AGENT)
            .form(&payload)
            .send()
            .await
            .map_err(RelayError::from_request_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(RelayError::from_request_error)?;

        if !status.is_success() {
            let rejection = classify_rejection(status.as_u16(), &body);
            match rejection.kind {
                RejectionKind::InvalidClient => tracing::error!(
                    status = rejection.status,
                    "provider rejected client authentication; CLIENT_ID, CLIENT_SECRET, or the \
                     registered redirect URI do not match the Shikimori application"
                ),
                RejectionKind::InvalidGrant => tracing::info!(
                    status = rejection.status,
                    "provider rejected the authorization code (expired, reused, or fabricated)"
                ),
                RejectionKind::Other => tracing::warn!(
                    status = rejection.status,
                    error = %rejection.error,
                    "provider rejected the token exchange"
                ),
            }
            return Err(RelayError::Upstream(rejection));
        }

        let token = serde_json::from_str(&body).map_err(|err| RelayError::InvalidResponse {
            message: err.to_string(),
            body,
        })?;

        Ok(token)
    }

    /// Configuration self-check: push a deliberately bogus code through the
    /// real exchange path and read the provider's answer. `invalid_grant`
    /// means the credentials and redirect URI are registered correctly.
    pub async fn self_check(&self) -> Result<ConfigCheck, RelayError> {
        match self.exchange_code("test_code").await {
            Ok(_) => Ok(ConfigCheck::Unexpected {
                detail: "token endpoint accepted a bogus authorization code".to_string(),
            }),
            Err(RelayError::Upstream(rejection)) => Ok(match rejection.kind {
                RejectionKind::InvalidGrant => ConfigCheck::Ok,
                RejectionKind::InvalidClient => ConfigCheck::ClientMismatch {
                    description: rejection.description,
                },
                RejectionKind::Other => ConfigCheck::Unexpected {
                    detail: rejection.to_string(),
                },
            }),
            Err(err) => Err(err),
        }
    }
}

/// Outcome of the configuration self-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCheck {
    /// Client authentication succeeded; only the bogus code was rejected.
    Ok,
    /// Credentials or redirect URI mismatch against the provider.
    ClientMismatch { description: Option<String> },
    /// Anything else, reported verbatim.
    Unexpected { detail: String },
}

fn classify_rejection(status: u16, body: &str) -> UpstreamRejection {
    match serde_json::from_str::<UpstreamErrorBody>(body) {
        Ok(parsed) => UpstreamRejection {
            kind: RejectionKind::from_oauth_error(&parsed.error),
            status,
            error: parsed.error,
            description: parsed.error_description,
        },
        Err(_) => UpstreamRejection {
            kind: RejectionKind::Other,
            status,
            error: format!("http_{status}"),
            description: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::classify_rejection;
    use crate::error::{RejectionKind, RelayError};
    use crate::RelayConfig;

    #[test]
    fn classifies_structured_oauth_errors() {
        let rejection = classify_rejection(
            401,
            r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#,
        );
        assert_eq!(rejection.kind, RejectionKind::InvalidClient);
        assert_eq!(rejection.status, 401);
        assert_eq!(
            rejection.description.as_deref(),
            Some("Client authentication failed")
        );

        let rejection = classify_rejection(400, r#"{"error":"invalid_grant"}"#);
        assert_eq!(rejection.kind, RejectionKind::InvalidGrant);
    }

    #[test]
    fn unparseable_bodies_become_generic_rejections() {
        let rejection = classify_rejection(502, "<html>bad gateway</html>");
        assert_eq!(rejection.kind, RejectionKind::Other);
        assert_eq!(rejection.error, "http_502");
    }

    #[tokio::test]
    async fn exchange_without_credentials_fails_fast() {
        let config = RelayConfig::default();
        let exchanger =
            super::TokenExchanger::new(&config, "http://localhost:3000/auth/callback").unwrap();
        let result = exchanger.exchange_code("anything").await;
        assert!(matches!(result, Err(RelayError::MissingCredentials)));
    }
}
