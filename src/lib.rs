//! Stateless OAuth 2.0 authorization-code relay for the Shikimori API.
//!
//! The relay terminates the provider's browser redirect, exchanges the
//! one-time code for a token server-side (keeping the client secret off the
//! browser), and sends the browser back to the front-end with the token in
//! URL parameters. Nothing is persisted; configuration is resolved once at
//! startup and read-only afterwards.

mod config;
mod cors;
mod environment;
mod error;
mod exchange;
mod routes;
mod server;
mod state;
mod types;

pub use config::{DEFAULT_PORT, DEFAULT_TOKEN_URL, RelayConfig};
pub use environment::{DeploymentMode, EnvironmentContext};
pub use error::{RejectionKind, RelayError, UpstreamRejection};
pub use exchange::{ConfigCheck, TokenExchanger};
pub use server::RelayServer;
pub use state::AppState;
pub use types::{StatusResponse, TokenResponse};
