use axum::extract::{Request, State};
use axum::http::header::{HeaderMap, HeaderValue, ORIGIN};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::config::LOCAL_FRONT_END_URL;
use crate::state::AppState;

const ALLOW_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE,OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, Accept, X-Requested-With";
const MAX_AGE_SECONDS: &str = "86400";

/// Decide which origin value to reflect back to the browser.
///
/// Requests without an `Origin` header get a wildcard. Origins matching the
/// deployment hosts (`*.github.io`, `localhost`, `127.0.0.1`,
/// `*.onrender.com`) are echoed. Production echoes every origin, a documented
/// laxness inherited from the deployed service, not a security boundary.
/// Everything else falls back to the local front-end origin.
pub fn allowed_origin(origin: Option<&str>, production: bool) -> String {
    let Some(origin) = origin else {
        return "*".to_string();
    };

    if origin_matches_allowed_host(origin) || production {
        origin.to_string()
    } else {
        LOCAL_FRONT_END_URL.to_string()
    }
}

fn origin_matches_allowed_host(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };

    host == "localhost"
        || host == "127.0.0.1"
        || host.ends_with(".github.io")
        || host.ends_with(".onrender.com")
}

/// CORS middleware for every route.
///
/// Pre-flight `OPTIONS` requests short-circuit to an empty 204; everything
/// else passes through and has the headers appended on the way out.
pub async fn cors_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let allow = allowed_origin(origin.as_deref(), state.config.production);

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(response.headers_mut(), &allow);
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), &allow);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, allow_origin: &str) {
    let origin_value = HeaderValue::from_str(allow_origin)
        .unwrap_or_else(|_| HeaderValue::from_static("*"));
    headers.insert("access-control-allow-origin", origin_value);
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        "access-control-allow-credentials",
        HeaderValue::from_static("true"),
    );
    headers.insert(
        "access-control-max-age",
        HeaderValue::from_static(MAX_AGE_SECONDS),
    );
}

#[cfg(test)]
mod tests {
    use super::allowed_origin;

    #[test]
    fn absent_origin_gets_wildcard() {
        assert_eq!(allowed_origin(None, false), "*");
        assert_eq!(allowed_origin(None, true), "*");
    }

    #[test]
    fn deployment_hosts_are_reflected() {
        for origin in [
            "https://someone.github.io",
            "http://localhost:5173",
            "http://127.0.0.1:5174",
            "https://animerealm-api.onrender.com",
        ] {
            assert_eq!(allowed_origin(Some(origin), false), origin);
        }
    }

    #[test]
    fn unknown_origins_fall_back_outside_production() {
        assert_eq!(
            allowed_origin(Some("https://evil.example.com"), false),
            "http://localhost:5173"
        );
    }

    #[test]
    fn production_reflects_any_origin() {
        assert_eq!(
            allowed_origin(Some("https://evil.example.com"), true),
            "https://evil.example.com"
        );
    }

    #[test]
    fn host_matching_is_suffix_anchored() {
        // "github.io" must be a domain suffix, not a substring anywhere.
        assert_eq!(
            allowed_origin(Some("https://github.io.evil.example"), false),
            "http://localhost:5173"
        );
    }
}
