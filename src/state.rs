use std::sync::Arc;

use crate::environment::EnvironmentContext;
use crate::exchange::TokenExchanger;
use crate::{RelayConfig, RelayError};

/// Shared application state, cloned into every handler. Everything here is
/// read-only after startup; request handling writes no shared state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub environment: Arc<EnvironmentContext>,
    pub exchanger: Arc<TokenExchanger>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let environment = EnvironmentContext::resolve(&config);
        let exchanger = TokenExchanger::new(&config, environment.redirect_uri.clone())?;
        Ok(Self {
            config: Arc::new(config),
            environment: Arc::new(environment),
            exchanger: Arc::new(exchanger),
        })
    }
}
