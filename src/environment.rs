use crate::config::{DEFAULT_RENDER_URL, LOCAL_FRONT_END_URL, RelayConfig};

/// The three deployment contexts the relay can run in. Exactly one is
/// selected at startup; handlers never re-derive it per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Front-end on GitHub Pages, relay on Render. Different origins.
    StaticSitePaired,
    /// Front-end and relay share one Render origin.
    SingleOrigin,
    /// Vite dev server on 5173, relay on its own localhost port.
    Local,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticSitePaired => "static-site",
            Self::SingleOrigin => "single-origin",
            Self::Local => "local",
        }
    }
}

/// URLs derived from the deployment mode, resolved once per process.
///
/// `redirect_uri` must be byte-identical everywhere it appears: the value
/// registered with Shikimori, the value sent in the token exchange, and the
/// value surfaced by `/api/status` and the home page.
#[derive(Debug, Clone)]
pub struct EnvironmentContext {
    pub mode: DeploymentMode,
    pub backend_base_url: String,
    pub front_end_base_url: String,
    pub redirect_uri: String,
    pub front_end_return_url: String,
}

impl EnvironmentContext {
    /// Pick the deployment mode. Priority order: static-site paired, then
    /// single-origin cloud, then local. Never fails; absent configuration
    /// falls back to hard-coded defaults.
    pub fn resolve(config: &RelayConfig) -> Self {
        let (mode, backend, front_end) = match (config.production, &config.github_pages_url) {
            (true, Some(pages_url)) => (
                DeploymentMode::StaticSitePaired,
                render_base(config),
                pages_url.clone(),
            ),
            (true, None) => {
                let base = render_base(config);
                (DeploymentMode::SingleOrigin, base.clone(), base)
            }
            (false, _) => (
                DeploymentMode::Local,
                format!("http://localhost:{}", config.port),
                LOCAL_FRONT_END_URL.to_string(),
            ),
        };

        let backend_base_url = backend.trim_end_matches('/').to_string();
        let front_end_base_url = front_end.trim_end_matches('/').to_string();
        let redirect_uri = format!("{backend_base_url}/auth/callback");
        let front_end_return_url = format!("{front_end_base_url}/#/auth/callback");

        let context = Self {
            mode,
            backend_base_url,
            front_end_base_url,
            redirect_uri,
            front_end_return_url,
        };

        tracing::info!(
            mode = context.mode.as_str(),
            redirect_uri = %context.redirect_uri,
            front_end = %context.front_end_base_url,
            "resolved deployment environment"
        );

        context
    }
}

fn render_base(config: &RelayConfig) -> String {
    config
        .render_external_url
        .clone()
        .unwrap_or_else(|| DEFAULT_RENDER_URL.to_string())
}
