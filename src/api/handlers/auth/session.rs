//! Session cookies, the strategy resolver, and the `me`/`logout` endpoints.
//!
//! A request can carry up to three cookies: the local session (Okta/SAML
//! identities), the OIDC session, and a short-lived handshake id. The
//! resolver checks them in a fixed priority order so only one scheme is ever
//! "the" source of truth for a request: a SAML identity wins over an Okta
//! identity, and both win over the OIDC session.

use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    state::{AuthConfig, AuthState},
    storage::{SessionIdentity, delete_session, lookup_session},
    types::{MeResponse, MeUser, Provider},
    utils::hash_session_token,
};

/// Cookie holding sessions established by the Okta/SAML flows.
pub(crate) const LOCAL_SESSION_COOKIE: &str = "ingresso_session";
/// Cookie holding sessions established by the generic OIDC flow.
pub(crate) const OIDC_SESSION_COOKIE: &str = "ingresso_oidc";
/// Short-lived cookie carrying the id of an in-flight login handshake.
pub(crate) const HANDSHAKE_COOKIE: &str = "ingresso_handshake";

/// Authenticated user context derived from a session cookie.
#[derive(Clone, Debug)]
pub(crate) struct Principal {
    pub(crate) user_id: Uuid,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) picture: Option<String>,
    pub(crate) organization_id: Option<Uuid>,
}

impl From<SessionIdentity> for Principal {
    fn from(identity: SessionIdentity) -> Self {
        Self {
            user_id: identity.user_id,
            email: identity.email,
            name: identity.name,
            picture: identity.picture,
            organization_id: identity.organization_id,
        }
    }
}

/// Which strategy produced the current request's identity.
pub(crate) enum AuthSource {
    Saml(Principal),
    Okta(Principal),
    Oidc(Principal),
}

impl AuthSource {
    pub(crate) const fn auth_type(&self) -> &'static str {
        match self {
            Self::Saml(_) => "saml",
            Self::Okta(_) => "okta",
            Self::Oidc(_) => "oidc",
        }
    }

    pub(crate) fn into_principal(self) -> Principal {
        match self {
            Self::Saml(principal) | Self::Okta(principal) | Self::Oidc(principal) => principal,
        }
    }
}

/// Resolve the active identity for a request.
///
/// The local session cookie is checked before the OIDC one; within the local
/// session the provider column distinguishes SAML from Okta. First match wins.
pub(crate) async fn resolve_identity(
    headers: &HeaderMap,
    pool: &PgPool,
) -> anyhow::Result<Option<AuthSource>> {
    if let Some(token) = extract_cookie(headers, LOCAL_SESSION_COOKIE)
        && let Some(identity) = lookup_session(pool, &hash_session_token(&token)).await?
    {
        let source = match identity.provider {
            Provider::Saml => AuthSource::Saml(identity.into()),
            Provider::Okta => AuthSource::Okta(identity.into()),
            Provider::Oidc => AuthSource::Oidc(identity.into()),
        };
        return Ok(Some(source));
    }

    if let Some(token) = extract_cookie(headers, OIDC_SESSION_COOKIE)
        && let Some(identity) = lookup_session(pool, &hash_session_token(&token)).await?
    {
        return Ok(Some(AuthSource::Oidc(identity.into())));
    }

    Ok(None)
}

/// Resolve a session cookie into a principal, or return 401 for missing sessions.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
) -> Result<Principal, StatusCode> {
    match resolve_identity(headers, pool).await {
        Ok(Some(source)) => Ok(source.into_principal()),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            error!("Failed to resolve session: {err:#}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Authentication state for the current session.", body = MeResponse)
    ),
    tag = "auth"
)]
pub async fn me(headers: HeaderMap, pool: Extension<PgPool>) -> impl IntoResponse {
    match resolve_identity(&headers, &pool).await {
        Ok(Some(source)) => {
            let auth_type = source.auth_type().to_string();
            let principal = source.into_principal();
            let response = MeResponse {
                authenticated: true,
                user: Some(MeUser {
                    id: principal.user_id.to_string(),
                    email: principal.email,
                    name: principal.name,
                    picture: principal.picture,
                    organization_id: principal.organization_id.map(|id| id.to_string()),
                }),
                auth_type: Some(auth_type),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => {
            let response = MeResponse {
                authenticated: false,
                user: None,
                auth_type: None,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            error!("Failed to resolve session: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Delete the rows behind both session cookies.
    for cookie_name in [LOCAL_SESSION_COOKIE, OIDC_SESSION_COOKIE] {
        if let Some(token) = extract_cookie(&headers, cookie_name) {
            if let Err(err) = delete_session(&pool, &hash_session_token(&token)).await {
                error!("Failed to delete session: {err:#}");
            }
        }
    }

    // Discard any in-flight handshake so no transient CSRF state survives.
    if let Some(handshake_id) = extract_cookie(&headers, HANDSHAKE_COOKIE)
        && let Ok(handshake_id) = Uuid::parse_str(handshake_id.trim())
    {
        let _ = auth_state.handshakes().take(handshake_id).await;
    }

    // Always clear the cookies, even if the session records were missing.
    let mut response_headers = HeaderMap::new();
    let secure = auth_state.config().session_cookie_secure();
    for cookie_name in [LOCAL_SESSION_COOKIE, OIDC_SESSION_COOKIE, HANDSHAKE_COOKIE] {
        if let Ok(cookie) = clear_cookie(cookie_name, secure) {
            response_headers.append(SET_COOKIE, cookie);
        }
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Build a secure `HttpOnly` cookie for a session token.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    cookie_name: &str,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let secure = config.session_cookie_secure();
    let mut cookie =
        format!("{cookie_name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build the short-lived handshake cookie set when a login is initiated.
pub(crate) fn handshake_cookie(
    config: &AuthConfig,
    handshake_id: Uuid,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.handshake_ttl().as_secs();
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{HANDSHAKE_COOKIE}={handshake_id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_cookie(
    cookie_name: &str,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{cookie_name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == cookie_name {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::COOKIE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extract_cookie_finds_named_pair() {
        let headers =
            headers_with_cookie("ingresso_oidc=abc; ingresso_session=def; other=ignored");
        assert_eq!(
            extract_cookie(&headers, LOCAL_SESSION_COOKIE),
            Some("def".to_string())
        );
        assert_eq!(
            extract_cookie(&headers, OIDC_SESSION_COOKIE),
            Some("abc".to_string())
        );
        assert_eq!(extract_cookie(&headers, HANDSHAKE_COOKIE), None);
    }

    #[test]
    fn extract_cookie_handles_missing_header() {
        let headers = HeaderMap::new();
        assert_eq!(extract_cookie(&headers, LOCAL_SESSION_COOKIE), None);
    }

    #[test]
    fn session_cookie_sets_attributes() {
        let config = AuthConfig::new("https://ingresso.dev".to_string());
        let cookie = session_cookie(&config, LOCAL_SESSION_COOKIE, "token").expect("cookie");
        let value = cookie.to_str().expect("ascii cookie");
        assert!(value.starts_with("ingresso_session=token; "));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Max-Age=86400"));
        assert!(value.ends_with("Secure"));
    }

    #[test]
    fn session_cookie_omits_secure_for_http_frontend() {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        let cookie = session_cookie(&config, OIDC_SESSION_COOKIE, "token").expect("cookie");
        assert!(!cookie.to_str().expect("ascii cookie").contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_cookie(HANDSHAKE_COOKIE, false).expect("cookie");
        let value = cookie.to_str().expect("ascii cookie");
        assert!(value.starts_with("ingresso_handshake=; "));
        assert!(value.contains("Max-Age=0"));
    }

    #[test]
    fn auth_source_reports_auth_type() {
        let principal = Principal {
            user_id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            name: None,
            picture: None,
            organization_id: None,
        };
        assert_eq!(AuthSource::Saml(principal.clone()).auth_type(), "saml");
        assert_eq!(AuthSource::Okta(principal.clone()).auth_type(), "okta");
        assert_eq!(AuthSource::Oidc(principal).auth_type(), "oidc");
    }
}
