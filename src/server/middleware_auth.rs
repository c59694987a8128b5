//! Cookie session auth for the admin API.
//!
//! Login issues an HS256 JWT carried in the `auth_token` cookie (HttpOnly,
//! SameSite=Lax, 24h expiry). Admin-only routes use the `RequireAdmin`
//! extractor to gate access; the extractor decodes and verifies the token
//! against the server's session secret.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;

/// Cookie carrying the admin session token.
pub const SESSION_COOKIE: &str = "auth_token";

/// Session lifetime in seconds (one day, matching the original cookie).
pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24;

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// Admin username.
    sub: String,
    /// Expiry, seconds since epoch.
    exp: i64,
}

/// Authenticated admin info, produced by the `RequireAdmin` extractor.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAdmin {
    pub username: String,
}

/// Sign a session token for an admin username.
pub fn issue_token(username: &str, secret: &str) -> Result<String, String> {
    let claims = SessionClaims {
        sub: username.to_string(),
        exp: chrono::Utc::now().timestamp() + SESSION_TTL_SECS,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("failed to sign session token: {}", e))
}

/// Decode and verify a session token. Expired or tampered tokens fail.
pub fn decode_token(token: &str, secret: &str) -> Result<String, String> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| format!("session token invalid: {}", e))?;
    Ok(data.claims.sub)
}

/// Pull a named cookie value out of the request's Cookie headers.
fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    let header = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

/// Extract auth info from the request, if a valid session cookie is present.
pub fn extract_admin(state: &Arc<AppState>, parts: &Parts) -> Option<AuthAdmin> {
    let token = cookie_value(parts, SESSION_COOKIE)?;
    let username = decode_token(&token, &state.session_secret).ok()?;
    Some(AuthAdmin { username })
}

/// Axum extractor that requires an authenticated admin session.
///
/// Returns 401 if no valid session cookie is present.
pub struct RequireAdmin(pub AuthAdmin);

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin = extract_admin(state, parts).ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Authentication required"})),
            )
                .into_response()
        })?;
        Ok(RequireAdmin(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_decode_roundtrip() {
        let token = issue_token("root", "test-secret").unwrap();
        assert_eq!(decode_token(&token, "test-secret").unwrap(), "root");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_token("root", "secret-a").unwrap();
        assert!(decode_token(&token, "secret-b").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let claims = SessionClaims {
            sub: "root".to_string(),
            exp: chrono::Utc::now().timestamp() - 120,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"s"),
        )
        .unwrap();
        assert!(decode_token(&token, "s").is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(decode_token("not.a.jwt", "s").is_err());
        assert!(decode_token("", "s").is_err());
    }
}
