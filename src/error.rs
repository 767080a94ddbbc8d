use std::fmt;

use thiserror::Error;

/// How the upstream OAuth provider rejected a token exchange.
///
/// `invalid_client` means the registered credentials or redirect URI do not
/// match what the provider has on file. `invalid_grant` is the normal answer
/// for a reused, expired, or fabricated code and is treated as benign by the
/// configuration self-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    InvalidClient,
    InvalidGrant,
    Other,
}

impl RejectionKind {
    pub fn from_oauth_error(error: &str) -> Self {
        match error {
            "invalid_client" => Self::InvalidClient,
            "invalid_grant" => Self::InvalidGrant,
            _ => Self::Other,
        }
    }
}

/// A structured OAuth error returned by the token endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamRejection {
    pub kind: RejectionKind,
    pub status: u16,
    pub error: String,
    pub description: Option<String>,
}

impl fmt::Display for UpstreamRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => {
                write!(f, "{} ({}): {}", self.error, self.status, description)
            }
            None => write!(f, "{} ({})", self.error, self.status),
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Missing credentials")]
    MissingCredentials,

    #[error("timed out waiting for the token endpoint")]
    UpstreamTimeout,

    #[error("network error reaching the token endpoint: {0}")]
    Network(String),

    #[error("token endpoint rejected the exchange: {0}")]
    Upstream(UpstreamRejection),

    #[error("invalid response from token endpoint: {message}")]
    InvalidResponse { message: String, body: String },
}

impl RelayError {
    /// Convert a reqwest failure into the relay's taxonomy. Timeouts are a
    /// distinct class so the browser can be told to retry.
    pub fn from_request_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout
        } else {
            Self::Network(err.to_string())
        }
    }
}
