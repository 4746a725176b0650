//! HTTP Basic authentication for the trigger route.

use crate::config::ApiCredentials;
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

const CHALLENGE: &str = "Basic realm=\"Confluence API\"";

/// Everything except the liveness probe requires Basic credentials.
pub async fn require_basic_auth(
    State(credentials): State<ApiCredentials>,
    req: Request,
    next: Next,
) -> Response {
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    if verify_basic(req.headers().get(header::AUTHORIZATION), &credentials) {
        next.run(req).await
    } else {
        unauthorized()
    }
}

/// Checks an `Authorization: Basic <base64>` header against the configured
/// credentials. Malformed headers are unauthorized, not server errors.
fn verify_basic(header: Option<&HeaderValue>, credentials: &ApiCredentials) -> bool {
    let Some(value) = header.and_then(|value| value.to_str().ok()) else {
        return false;
    };

    let Some(encoded) = value.strip_prefix("Basic ") else {
        return false;
    };

    let Ok(decoded) =
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded.trim())
    else {
        return false;
    };

    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };

    let Some((username, password)) = decoded.split_once(':') else {
        return false;
    };

    username == credentials.username && password == credentials.password
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, CHALLENGE)],
        Json(json!({"error": "Unauthorized"})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn credentials() -> ApiCredentials {
        ApiCredentials {
            username: "api".to_string(),
            password: "secret".to_string(),
        }
    }

    fn basic_header(value: &str) -> HeaderValue {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value);
        HeaderValue::from_str(&format!("Basic {encoded}")).unwrap()
    }

    #[test]
    fn accepts_matching_credentials() {
        let header = basic_header("api:secret");
        assert!(verify_basic(Some(&header), &credentials()));
    }

    #[test]
    fn password_may_contain_colons() {
        let wanted = ApiCredentials {
            username: "api".to_string(),
            password: "se:cr:et".to_string(),
        };
        let header = basic_header("api:se:cr:et");
        assert!(verify_basic(Some(&header), &wanted));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(!verify_basic(None, &credentials()));
    }

    #[test]
    fn rejects_other_schemes() {
        let header = HeaderValue::from_static("Bearer some-token");
        assert!(!verify_basic(Some(&header), &credentials()));
    }

    #[test]
    fn rejects_invalid_base64() {
        let header = HeaderValue::from_static("Basic not-base64!!!");
        assert!(!verify_basic(Some(&header), &credentials()));
    }

    #[test]
    fn rejects_non_utf8_payload() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([0xff, 0xfe, 0xfd]);
        let header = HeaderValue::from_str(&format!("Basic {encoded}")).unwrap();
        assert!(!verify_basic(Some(&header), &credentials()));
    }

    #[test]
    fn rejects_payload_without_separator() {
        let header = basic_header("apisecret");
        assert!(!verify_basic(Some(&header), &credentials()));
    }

    #[test]
    fn rejects_wrong_password() {
        let header = basic_header("api:wrong");
        assert!(!verify_basic(Some(&header), &credentials()));
    }
}
