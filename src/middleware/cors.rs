use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderValue},
        Method, Request, Response, StatusCode,
    },
    middleware::Next,
};
use tracing::debug;

use crate::app::AppState;

/// Resolve the `Access-Control-Allow-Origin` value for a request origin.
///
/// A `*` entry reflects any origin outside production; otherwise the origin
/// must be listed exactly.
pub fn resolve_allowed_origin(
    origin: Option<&str>,
    allowed: &[String],
    is_production: bool,
) -> Option<String> {
    let origin = origin?;
    let has_wildcard = allowed.iter().any(|o| o == "*");

    if has_wildcard && !is_production {
        debug!("CORS: Reflecting origin for non-production: {}", origin);
        return Some(origin.to_string());
    }

    if allowed.iter().any(|o| o == origin) {
        Some(origin.to_string())
    } else {
        debug!("CORS: Origin not in whitelist: {}", origin);
        None
    }
}

/// CORS for the admin panel, driven by `CORS_ALLOWED_ORIGINS`.
pub async fn dynamic_cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let allowed_origin = resolve_allowed_origin(
        req.headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok()),
        &state.config.security.cors_allowed_origins,
        state.config.is_production(),
    )
    .and_then(|o| HeaderValue::from_str(&o).ok());

    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());

        if let Some(allowed) = allowed_origin {
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type, authorization, accept, origin"),
            );
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static("3600"),
            );
        }

        *response.status_mut() = StatusCode::NO_CONTENT;
        return response;
    }

    let mut response = next.run(req).await;

    if let Some(allowed) = allowed_origin {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origins(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_whitelisted_origin() {
        let allowed = origins(&["https://admin.example.com"]);
        assert_eq!(
            resolve_allowed_origin(Some("https://admin.example.com"), &allowed, true),
            Some("https://admin.example.com".to_string())
        );
        assert_eq!(
            resolve_allowed_origin(Some("https://evil.example.com"), &allowed, true),
            None
        );
    }

    #[test]
    fn test_wildcard_only_outside_production() {
        let allowed = origins(&["*"]);
        assert_eq!(
            resolve_allowed_origin(Some("http://localhost:5173"), &allowed, false),
            Some("http://localhost:5173".to_string())
        );
        assert_eq!(
            resolve_allowed_origin(Some("http://localhost:5173"), &allowed, true),
            None
        );
    }

    #[test]
    fn test_no_origin_header() {
        assert_eq!(resolve_allowed_origin(None, &origins(&["*"]), false), None);
    }
}
