//! SAML login initiation and assertion consumption.

use anyhow::{Context, anyhow};
use axum::{
    Form,
    extract::{Extension, Path},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::super::auth::{
    AuthError, AuthState,
    session::{LOCAL_SESSION_COOKIE, session_cookie},
    storage::{ensure_membership, insert_session, reconcile_user},
    types::Provider,
};
use super::provider::{
    NOT_ENABLED, assertion_display_name, assertion_email, assertion_name_id, fetch_org_saml,
};

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct SamlCallbackForm {
    #[serde(rename = "SAMLResponse")]
    saml_response: String,
    #[serde(rename = "RelayState")]
    relay_state: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/saml/login/{organization_id}",
    params(("organization_id" = String, Path, description = "Organization id")),
    responses(
        (status = 303, description = "Redirect to the organization's IdP."),
        (status = 400, description = "SAML is not enabled or not fully configured."),
    ),
    tag = "saml"
)]
pub async fn login(
    Path(organization_id): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, AuthError> {
    let Ok(organization_id) = Uuid::parse_str(organization_id.trim()) else {
        return Err(AuthError::NotConfigured(NOT_ENABLED));
    };

    let settings = fetch_org_saml(&pool, organization_id)
        .await?
        .ok_or(AuthError::NotConfigured(NOT_ENABLED))?
        .into_settings()?;

    let sp = settings
        .service_provider(auth_state.config().public_base_url())
        .map_err(AuthError::Configuration)?;
    let authn_request = sp
        .make_authentication_request(&settings.entry_point)
        .map_err(|err| AuthError::Configuration(anyhow!("failed to build AuthnRequest: {err}")))?;

    // The request id must come back inside the response's InResponseTo; the
    // handshake id doubles as the RelayState.
    let handshake_id = auth_state
        .handshakes()
        .store(
            Provider::Saml,
            None,
            Some(organization_id),
            Some(authn_request.id.clone()),
        )
        .await;

    let redirect = authn_request
        .redirect(&handshake_id.to_string())
        .map_err(|err| AuthError::Configuration(anyhow!("failed to encode AuthnRequest: {err}")))?
        .ok_or_else(|| AuthError::Configuration(anyhow!("AuthnRequest has no destination")))?;

    Ok(Redirect::to(redirect.as_str()).into_response())
}

#[utoipa::path(
    post,
    path = "/api/saml/callback/{organization_id}",
    params(("organization_id" = String, Path, description = "Organization id")),
    responses(
        (status = 303, description = "Login completed; redirect to the frontend."),
        (status = 400, description = "Missing or reused relay state, or an invalid assertion."),
    ),
    tag = "saml"
)]
pub async fn callback(
    Path(organization_id): Path<String>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Form(form): Form<SamlCallbackForm>,
) -> Result<Response, AuthError> {
    let Ok(organization_id) = Uuid::parse_str(organization_id.trim()) else {
        return Err(AuthError::InvalidState);
    };

    // RelayState carries the handshake id; take-semantics make it single use.
    let handshake_id = form
        .relay_state
        .as_deref()
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(AuthError::InvalidState)?;
    let handshake = auth_state
        .handshakes()
        .take(handshake_id)
        .await
        .ok_or(AuthError::InvalidState)?;
    if handshake.provider != Provider::Saml
        || handshake.organization_id != Some(organization_id)
    {
        return Err(AuthError::InvalidState);
    }
    let request_id = handshake.request_id.ok_or(AuthError::InvalidState)?;

    // Re-read the organization: configuration may have been disabled while
    // the login was in flight.
    let settings = fetch_org_saml(&pool, organization_id)
        .await?
        .ok_or(AuthError::NotConfigured(NOT_ENABLED))?
        .into_settings()?;
    let sp = settings
        .service_provider(auth_state.config().public_base_url())
        .map_err(AuthError::Configuration)?;

    let possible_request_ids = [request_id.as_str()];
    let assertion = match sp.parse_base64_response(&form.saml_response, Some(&possible_request_ids))
    {
        Ok(assertion) => assertion,
        Err(err) => {
            warn!("SAML response validation failed: {err}");
            return Err(AuthError::InvalidAssertion("Invalid SAML response."));
        }
    };

    let Some(email) = assertion_email(&assertion) else {
        return Err(AuthError::InvalidAssertion("No email found in SAML profile."));
    };
    let subject = assertion_name_id(&assertion).unwrap_or_else(|| email.clone());
    let display_name = assertion_display_name(&assertion);

    let user = reconcile_user(
        &pool,
        Provider::Saml,
        &subject,
        &email,
        display_name.as_deref(),
        None,
    )
    .await?;
    ensure_membership(&pool, user.id, organization_id).await?;

    info!(user_id = %user.id, organization_id = %organization_id, "SAML login completed");

    let token = insert_session(
        &pool,
        user.id,
        Provider::Saml,
        Some(organization_id),
        auth_state.config().session_ttl_seconds(),
    )
    .await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        SET_COOKIE,
        session_cookie(auth_state.config(), LOCAL_SESSION_COOKIE, &token)
            .context("failed to build session cookie")?,
    );
    Ok((
        response_headers,
        Redirect::to(auth_state.config().frontend_base_url()),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_form_parses_idp_field_names() {
        let form: SamlCallbackForm = serde_urlencoded::from_str(
            "SAMLResponse=PHNhbWw%2BZGF0YTwvc2FtbD4%3D&RelayState=52b8af27-0f86-4b74-a3c4-5b0067939615",
        )
        .expect("parse form");
        assert!(!form.saml_response.is_empty());
        assert_eq!(
            form.relay_state.as_deref(),
            Some("52b8af27-0f86-4b74-a3c4-5b0067939615")
        );
    }

    #[test]
    fn callback_form_relay_state_optional() {
        let form: SamlCallbackForm =
            serde_urlencoded::from_str("SAMLResponse=abcd").expect("parse form");
        assert_eq!(form.relay_state, None);
    }
}
