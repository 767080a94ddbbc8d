use std::env;
use std::time::Duration;

use crate::RelayError;

/// Port the relay listens on unless `PORT` says otherwise.
pub const DEFAULT_PORT: u16 = 3000;

/// Shikimori's token endpoint. Overridable only for tests.
pub const DEFAULT_TOKEN_URL: &str = "https://shikimori.one/oauth/token";

/// Shikimori's authorize endpoint, used on the diagnostic home page.
pub const AUTHORIZE_URL: &str = "https://shikimori.one/oauth/authorize";

/// Fallback backend base when `RENDER_EXTERNAL_URL` is unset in production.
pub const DEFAULT_RENDER_URL: &str = "https://animerealm-api.onrender.com";

/// Where the Vite dev server hosts the front-end during local development.
pub const LOCAL_FRONT_END_URL: &str = "http://localhost:5173";

/// Client-side timeout for the outbound token exchange.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable relay configuration, constructed once at startup and injected
/// into the server. Handlers never read the process environment directly.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// OAuth client id registered with Shikimori. `None` when unset or empty.
    pub client_id: Option<String>,
    /// OAuth client secret. Never logged, never echoed in responses.
    pub client_secret: Option<String>,
    pub port: u16,
    /// Base URL of the GitHub Pages front-end, when paired with one.
    pub github_pages_url: Option<String>,
    /// External URL Render assigns to this service.
    pub render_external_url: Option<String>,
    pub production: bool,
    pub token_url: String,
    pub exchange_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            port: DEFAULT_PORT,
            github_pages_url: None,
            render_external_url: None,
            production: false,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            exchange_timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

impl RelayConfig {
    /// Read configuration from the process environment.
    ///
    /// Missing credentials are not fatal: the server still starts so the
    /// diagnostic routes stay reachable, but every exchange will fail with a
    /// `Missing credentials` error until they are provided.
    pub fn from_env() -> Self {
        Self {
            client_id: env_non_empty("CLIENT_ID"),
            client_secret: env_non_empty("CLIENT_SECRET"),
            port: env_non_empty("PORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            github_pages_url: env_non_empty("GITHUB_PAGES_URL"),
            render_external_url: env_non_empty("RENDER_EXTERNAL_URL"),
            production: env_flag("PRODUCTION"),
            ..Default::default()
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = non_empty(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = non_empty(client_secret.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_github_pages_url(mut self, url: impl Into<String>) -> Self {
        self.github_pages_url = non_empty(url.into());
        self
    }

    pub fn with_render_external_url(mut self, url: impl Into<String>) -> Self {
        self.render_external_url = non_empty(url.into());
        self
    }

    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn with_exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = timeout;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Both credentials, or a `MissingCredentials` error. Used by the
    /// exchange so a half-configured process fails the same way every time.
    pub fn credentials(&self) -> Result<(&str, &str), RelayError> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => Ok((id, secret)),
            _ => Err(RelayError::MissingCredentials),
        }
    }

    /// Log the credential situation at startup. References presence only,
    /// never values.
    pub fn warn_if_incomplete(&self) {
        if !self.has_credentials() {
            tracing::warn!(
                client_id_present = self.client_id.is_some(),
                client_secret_present = self.client_secret.is_some(),
                "missing OAuth client credentials; token exchanges will fail until \
                 CLIENT_ID and CLIENT_SECRET are set"
            );
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().and_then(non_empty)
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| truthy(&value)).unwrap_or(false)
}

fn truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}
