//! Okta login initiation and callback completion.

use anyhow::{Context, anyhow};
use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use super::super::auth::{
    AuthError, AuthState,
    oidc::take_handshake,
    session::{HANDSHAKE_COOKIE, LOCAL_SESSION_COOKIE, clear_cookie, handshake_cookie, session_cookie},
    storage::{ensure_membership, insert_session, reconcile_user},
    types::{CallbackQuery, Provider},
    utils::generate_state_token,
};
use super::storage::{OktaLoginConfig, fetch_login_config_by_org, fetch_login_config_by_slug};

const NOT_CONFIGURED: &str = "Okta is not configured for this organization.";

#[derive(Debug, Deserialize)]
struct OktaTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OktaUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/okta/login/{org_slug}",
    params(("org_slug" = String, Path, description = "Organization slug")),
    responses(
        (status = 303, description = "Redirect to the organization's Okta authorize endpoint."),
        (status = 400, description = "Okta is not configured or not active for this organization."),
    ),
    tag = "okta"
)]
pub async fn login(
    Path(org_slug): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let config = fetch_login_config_by_slug(&pool, &org_slug)
        .await?
        .filter(|config| config.is_active)
        .ok_or(AuthError::NotConfigured(NOT_CONFIGURED))?;

    // The state value binds this browser to the callback; it is stored
    // server-side and compared on return.
    let state = generate_state_token()?;
    let handshake_id = auth_state
        .handshakes()
        .store(
            Provider::Okta,
            Some(state.clone()),
            Some(config.organization_id),
            None,
        )
        .await;

    let mut authorize = Url::parse(&format!(
        "https://{}/oauth2/default/v1/authorize",
        config.domain
    ))
    .map_err(|err| AuthError::Configuration(anyhow!("invalid Okta domain: {err}")))?;
    authorize
        .query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("scope", "openid profile email")
        .append_pair("redirect_uri", &config.redirect_uri)
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
    path = "/api/okta/callback",
    responses(
        (status = 303, description = "Login completed; redirect to the frontend."),
        (status = 400, description = "Missing, reused, or mismatched state parameter."),
        (status = 401, description = "Okta rejected the authorization code."),
        (status = 502, description = "Okta could not be reached.")
    ),
    tag = "okta"
)]
pub async fn callback(
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let (code, state) = match (query.code, query.state) {
        (Some(code), Some(state)) => (code, state),
        _ => return Err(AuthError::InvalidState),
    };

    // Single-use: the handshake is removed on this read. A state value that
    // does not exactly match the stored one is a hard failure regardless of
    // whether the code itself would have been accepted.
    let handshake = take_handshake(&headers, &auth_state).await?;
    if handshake.provider != Provider::Okta || handshake.state.as_deref() != Some(state.as_str()) {
        return Err(AuthError::InvalidState);
    }
    let organization_id = handshake.organization_id.ok_or(AuthError::InvalidState)?;

    let config = fetch_login_config_by_org(&pool, organization_id)
        .await?
        .ok_or(AuthError::NotConfigured(NOT_CONFIGURED))?;

    let tokens = exchange_code(&auth_state, &config, &code).await?;
    let profile = fetch_userinfo(&auth_state, &config, &tokens.access_token).await?;

    let Some(email) = profile.email.as_deref() else {
        warn!("Okta userinfo response has no email claim");
        return Err(AuthError::Authentication);
    };

    let user = reconcile_user(
        &pool,
        Provider::Okta,
        &profile.sub,
        email,
        profile.name.as_deref(),
        profile.picture.as_deref(),
    )
    .await?;
    ensure_membership(&pool, user.id, organization_id).await?;

    info!(user_id = %user.id, organization_id = %organization_id, "Okta login completed");

    let token = insert_session(
        &pool,
        user.id,
        Provider::Okta,
        Some(organization_id),
        auth_state.config().session_ttl_seconds(),
    )
    .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.append(
        SET_COOKIE,
        session_cookie(auth_state.config(), LOCAL_SESSION_COOKIE, &token)
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

async fn exchange_code(
    auth_state: &AuthState,
    config: &OktaLoginConfig,
    code: &str,
) -> Result<OktaTokenResponse, AuthError> {
    let token_url = format!("https://{}/oauth2/default/v1/token", config.domain);
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", &config.redirect_uri),
    ];
    let response = auth_state
        .http()
        .post(&token_url)
        .basic_auth(&config.client_id, Some(&config.client_secret))
        .form(&params)
        .send()
        .await
        .map_err(AuthError::from_upstream)?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "Okta token exchange rejected");
        return Err(AuthError::Authentication);
    }

    response
        .json::<OktaTokenResponse>()
        .await
        .map_err(|err| AuthError::Internal(anyhow!("invalid Okta token response: {err}")))
}

async fn fetch_userinfo(
    auth_state: &AuthState,
    config: &OktaLoginConfig,
    access_token: &str,
) -> Result<OktaUserInfo, AuthError> {
    let userinfo_url = format!("https://{}/oauth2/default/v1/userinfo", config.domain);
    let response = auth_state
        .http()
        .get(&userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(AuthError::from_upstream)?;

    if !response.status().is_success() {
        warn!(status = %response.status(), "Okta userinfo fetch rejected");
        return Err(AuthError::Authentication);
    }

    response
        .json::<OktaUserInfo>()
        .await
        .map_err(|err| AuthError::Internal(anyhow!("invalid Okta userinfo response: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_ignores_extra_fields() {
        let parsed: OktaTokenResponse = serde_json::from_str(
            r#"{"access_token":"at","token_type":"Bearer","expires_in":3600,"scope":"openid","id_token":"idt"}"#,
        )
        .expect("parse token response");
        assert_eq!(parsed.access_token, "at");
    }

    #[test]
    fn userinfo_parses_full_profile() {
        let parsed: OktaUserInfo = serde_json::from_str(
            r#"{"sub":"00u1","email":"a@example.com","name":"A","picture":"https://img"}"#,
        )
        .expect("parse userinfo");
        assert_eq!(parsed.sub, "00u1");
        assert_eq!(parsed.email.as_deref(), Some("a@example.com"));
        assert_eq!(parsed.name.as_deref(), Some("A"));
        assert_eq!(parsed.picture.as_deref(), Some("https://img"));
    }
}
