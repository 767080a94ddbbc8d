use axum::Json;
use axum::extract::{Query, State};
use axum::http::header::ORIGIN;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use serde_json::json;

use crate::config::AUTHORIZE_URL;
use crate::error::{RejectionKind, RelayError};
use crate::state::AppState;
use crate::types::StatusResponse;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    pub code: Option<String>,
    pub redirect: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCallbackRequest {
    #[serde(default)]
    pub code: String,
}

/// `GET /auth/callback` — where Shikimori sends the browser after consent.
///
/// Without a code there is nothing to exchange; the browser goes straight
/// back to the front-end with `error=no_code`. With a code, every deployment
/// mode hands off to `/auth/process` so the exchange always happens
/// server-side and the client secret never reaches the browser.
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let return_url = &state.environment.front_end_return_url;

    match non_empty(query.code) {
        None => {
            tracing::warn!("authorization callback arrived without a code");
            Redirect::to(&format!("{return_url}?error=no_code"))
        }
        Some(code) => {
            tracing::info!("authorization code received, handing off to exchange");
            Redirect::to(&format!(
                "/auth/process?code={}&redirect={}",
                urlencoding::encode(&code),
                urlencoding::encode(return_url)
            ))
        }
    }
}

/// `GET /auth/process` — performs the code exchange and redirects the
/// browser to the front-end with token material or an error indicator.
pub async fn auth_process(
    State(state): State<AppState>,
    Query(query): Query<ProcessQuery>,
) -> Redirect {
    let target = non_empty(query.redirect)
        .unwrap_or_else(|| state.environment.front_end_return_url.clone());

    let Some(code) = non_empty(query.code) else {
        tracing::warn!("exchange requested without a code");
        return Redirect::to(&append_params(&target, "error=no_code"));
    };

    match state.exchanger.exchange_code(&code).await {
        Ok(token) => {
            tracing::info!(
                expires_in = token.expires_in,
                refresh_token_present = token.refresh_token.is_some(),
                "token obtained, redirecting to front-end"
            );
            let params = format!(
                "token={}&refresh={}&expires_in={}",
                urlencoding::encode(&token.access_token),
                urlencoding::encode(token.refresh_token.as_deref().unwrap_or_default()),
                token.expires_in.unwrap_or(0)
            );
            Redirect::to(&append_params(&target, &params))
        }
        Err(err) => {
            let (class, message) = redirect_error(&err);
            tracing::warn!(error = %err, class, "token exchange failed");
            let params = format!("error={class}&message={}", urlencoding::encode(&message));
            Redirect::to(&append_params(&target, &params))
        }
    }
}

/// `POST /api/auth/callback` — the same exchange for programmatic callers,
/// answering with the raw token JSON instead of a redirect.
pub async fn api_auth_callback(
    State(state): State<AppState>,
    Json(body): Json<ApiCallbackRequest>,
) -> Response {
    if body.code.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No code provided" })),
        )
            .into_response();
    }

    if !state.exchanger.has_credentials() {
        tracing::error!(
            client_id_present = state.config.client_id.is_some(),
            client_secret_present = state.config.client_secret.is_some(),
            "exchange attempted without client credentials"
        );
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Missing credentials",
                "details": "CLIENT_ID and CLIENT_SECRET must be configured before tokens can be exchanged",
            })),
        )
            .into_response();
    }

    match state.exchanger.exchange_code(&body.code).await {
        Ok(token) => Json(token).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Failed to fetch access token",
                "details": err.to_string(),
                "server_info": {
                    "client_id_present": state.config.client_id.is_some(),
                    "client_secret_present": state.config.client_secret.is_some(),
                    "redirect_uri": state.exchanger.redirect_uri(),
                },
            })),
        )
            .into_response(),
    }
}

/// `GET /api/status` — availability probe for the front-end. Read-only.
pub async fn api_status(State(state): State<AppState>, headers: HeaderMap) -> Json<StatusResponse> {
    let origin = headers
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("No origin header");

    Json(StatusResponse {
        status: "Server is running".to_string(),
        mode: state.environment.mode.as_str().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        redirect_uri: state.environment.redirect_uri.clone(),
        front_end_url: state.environment.front_end_base_url.clone(),
        cors_origin: origin.to_string(),
    })
}

/// `GET /` — diagnostic page for humans. Shows the resolved configuration
/// and a manual test link; no functional contract.
pub async fn home(State(state): State<AppState>) -> Html<String> {
    let env = &state.environment;
    let client_id = state.config.client_id.as_deref().unwrap_or("(not configured)");
    let authorize_url = format!(
        "{AUTHORIZE_URL}?client_id={}&redirect_uri={}&response_type=code&scope=user_rates+comments+topics",
        urlencoding::encode(client_id),
        urlencoding::encode(&env.redirect_uri)
    );

    Html(format!(
        r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8" />
    <title>Shikimori auth relay</title>
    <style>
      body {{ background: #081b29; color: white; font-family: Arial; text-align: center; padding: 50px; }}
      pre {{ background: #333; padding: 10px; text-align: left; word-break: break-all; }}
      .info {{ background: rgba(0,0,0,0.3); padding: 20px; border-radius: 8px; margin: 20px auto; max-width: 800px; }}
      a.button {{ background: #5e35b1; color: white; padding: 10px 20px; border-radius: 5px; text-decoration: none; display: inline-block; margin: 10px; }}
    </style>
  </head>
  <body>
    <h1>Shikimori auth relay</h1>
    <div class="info">
      <h2>Configuration</h2>
      <p>Mode: {mode}</p>
      <p>Redirect URI: {redirect_uri}</p>
      <p>Front-end: {front_end}</p>
    </div>
    <div class="info">
      <h2>Manual test</h2>
      <a href="/auth/callback?code=test_code" class="button">Test the callback route</a>
    </div>
    <div class="info">
      <h2>Authorize URL</h2>
      <pre>{authorize_url}</pre>
      <a href="{authorize_url}" class="button" target="_blank">Start Shikimori authorization</a>
    </div>
  </body>
</html>
"#,
        mode = env.mode.as_str(),
        redirect_uri = env.redirect_uri,
        front_end = env.front_end_base_url,
        authorize_url = authorize_url,
    ))
}

/// Any unmatched route: 404 naming the missing method and path.
pub async fn fallback(method: Method, uri: Uri) -> (StatusCode, Html<String>) {
    tracing::warn!(%method, path = %uri.path(), "unmatched route");
    (
        StatusCode::NOT_FOUND,
        Html(format!(
            r#"<!doctype html>
<html>
  <head><meta charset="utf-8" /><title>404 - Not found</title></head>
  <body>
    <h1>404 - Route not found</h1>
    <p>Path: {method} {path}</p>
    <p><a href="/">Back to the home page</a></p>
  </body>
</html>
"#,
            path = uri.path(),
        )),
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Append query parameters to a redirect target that may already carry a
/// query string (GitHub Pages hash routes often do).
fn append_params(target: &str, params: &str) -> String {
    let separator = if target.contains('?') { '&' } else { '?' };
    format!("{target}{separator}{params}")
}

/// Split an exchange failure into the error class the front-end understands
/// and a human-readable message. Timeouts are their own class so the user
/// can be told to retry instead of re-authorizing, and `invalid_grant` is
/// its own class because a reused or expired code is an expected outcome,
/// not a relay fault.
fn redirect_error(err: &RelayError) -> (&'static str, String) {
    match err {
        RelayError::UpstreamTimeout => (
            "timeout",
            "Timed out connecting to the Shikimori API".to_string(),
        ),
        RelayError::Upstream(rejection) if rejection.kind == RejectionKind::InvalidGrant => (
            "invalid_grant",
            rejection
                .description
                .clone()
                .unwrap_or_else(|| "The authorization code is expired or already used".to_string()),
        ),
        other => ("token_error", other.to_string()),
    }
}
