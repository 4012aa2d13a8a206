//! Generic OIDC login/callback flow (WorkOS, Auth0, or any compliant issuer).
//!
//! Flow Overview:
//! 1) `login` stores a handshake (random `state`) and redirects to the
//!    provider's authorization endpoint.
//! 2) `callback` consumes the handshake, verifies `state`, exchanges the code,
//!    fetches the userinfo profile, reconciles the identity, and establishes
//!    the OIDC session cookie.

use anyhow::{Context, anyhow};
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::{
    AuthError,
    session::{
        HANDSHAKE_COOKIE, OIDC_SESSION_COOKIE, clear_cookie, extract_cookie, handshake_cookie,
        session_cookie,
    },
    state::{AuthState, OidcConfig, PendingHandshake},
    storage::{insert_session, reconcile_user},
    types::{CallbackQuery, Provider},
    utils::generate_state_token,
};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OidcUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/auth/login",
    responses(
        (status = 303, description = "Redirect to the OIDC provider."),
        (status = 500, description = "OIDC provider is not configured.")
    ),
    tag = "auth"
)]
pub async fn login(auth_state: Extension<Arc<AuthState>>) -> Result<Response, AuthError> {
    let oidc = auth_state
        .oidc()
        .ok_or_else(|| AuthError::Configuration(anyhow!("OIDC provider is not configured")))?;

    let state = generate_state_token()?;
    let handshake_id = auth_state
        .handshakes()
        .store(Provider::Oidc, Some(state.clone()), None, None)
        .await;

    let mut authorize = Url::parse(&oidc.authorize_url)
        .map_err(|err| AuthError::Configuration(anyhow!("invalid OIDC authorize URL: {err}")))?;
    authorize
        .query_pairs_mut()
        .append_pair("client_id", &oidc.client_id)
        .append_pair("redirect_uri", &oidc.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", "openid profile email")
        .append_pair("state", &state);

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        handshake_cookie(auth_state.config(), handshake_id)
            .context("failed to build handshake cookie")?,
    );
    Ok((headers, Redirect::to(authorize.as_str())).into_response())
}

#[utoipa::path(
    get,
    path = "/api/auth/callback",
    responses(
        (status = 303, description = "Login completed; redirect to the frontend."),
        (status = 400, description = "Missing or invalid state parameter."),
        (status = 401, description = "The provider rejected the authorization code."),
        (status = 502, description = "The provider could not be reached.")
    ),
    tag = "auth"
)]
pub async fn callback(
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let oidc = auth_state
        .oidc()
        .ok_or_else(|| AuthError::Configuration(anyhow!("OIDC provider is not configured")))?;

    let (code, state) = match (query.code, query.state) {
        (Some(code), Some(state)) => (code, state),
        _ => return Err(AuthError::InvalidState),
    };

    let handshake = take_handshake(&headers, &auth_state).await?;
    if handshake.provider != Provider::Oidc || handshake.state.as_deref() != Some(state.as_str()) {
        return Err(AuthError::InvalidState);
    }

    let tokens = exchange_code(&auth_state, oidc, &code).await?;
    let profile = fetch_userinfo(&auth_state, oidc, &tokens.access_token).await?;

    let Some(email) = profile.email.as_deref() else {
        warn!("OIDC userinfo response has no email claim");
        return Err(AuthError::Authentication);
    };

    let user = reconcile_user(
        &pool,
        Provider::Oidc,
        &profile.sub,
        email,
        profile.name.as_deref(),
        profile.picture.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, "OIDC login completed");

    let token = insert_session(
        &pool,
        user.id,
        Provider::Oidc,
        None,
        auth_state.config().session_ttl_seconds(),
    )
    .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.append(
        SET_COOKIE,
        session_cookie(auth_state.config(), OIDC_SESSION_COOKIE, &token)
            .context("failed to build session cookie")?,
    );
    response_headers.append(
        SET_COOKIE,
        clear_cookie(HANDSHAKE_COOKIE, auth_state.config().session_cookie_secure())
            .context("failed to build cookie")?,
    );
    Ok((
        response_headers,
        Redirect::to(auth_state.config().frontend_base_url()),
    )
        .into_response())
}

/// Consume the handshake referenced by the request's handshake cookie.
///
/// Single use: once taken the entry is gone, so a replayed callback (or the
/// loser of two concurrent callbacks) fails with `InvalidState`.
pub(crate) async fn take_handshake(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<PendingHandshake, AuthError> {
    let handshake_id = extract_cookie(headers, HANDSHAKE_COOKIE)
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(AuthError::InvalidState)?;
    auth_state
        .handshakes()
        .take(handshake_id)
        .await
        .ok_or(AuthError::InvalidState)
}

async fn exchange_code(
    auth_state: &AuthState,
    oidc: &OidcConfig,
    code: &str,
) -> Result<TokenResponse, AuthError> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", &oidc.redirect_uri),
        ("client_id", &oidc.client_id),
        ("client_secret", oidc.client_secret.expose_secret()),
    ];
    let response = auth_state
        .http()
        .post(&oidc.token_url)
        .form(&params)
        .send()
        .await
        .map_err(AuthError::from_upstream)?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "OIDC token exchange rejected");
        return Err(AuthError::Authentication);
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|err| AuthError::Internal(anyhow!("invalid OIDC token response: {err}")))
}

async fn fetch_userinfo(
    auth_state: &AuthState,
    oidc: &OidcConfig,
    access_token: &str,
) -> Result<OidcUserInfo, AuthError> {
    let response = auth_state
        .http()
        .get(&oidc.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(AuthError::from_upstream)?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "OIDC userinfo fetch rejected");
        return Err(AuthError::Authentication);
    }

    response
        .json::<OidcUserInfo>()
        .await
        .map_err(|err| AuthError::Internal(anyhow!("invalid OIDC userinfo response: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_parses_minimal_payload() {
        let parsed: TokenResponse = serde_json::from_str(
            r#"{"access_token":"at-123","token_type":"Bearer","expires_in":3600}"#,
        )
        .expect("parse token response");
        assert_eq!(parsed.access_token, "at-123");
    }

    #[test]
    fn userinfo_tolerates_missing_optional_claims() {
        let parsed: OidcUserInfo = serde_json::from_str(r#"{"sub":"user-1"}"#).expect("parse");
        assert_eq!(parsed.sub, "user-1");
        assert_eq!(parsed.email, None);
        assert_eq!(parsed.name, None);
        assert_eq!(parsed.picture, None);
    }
}
