//! Admin management of per-organization Okta configuration.

use axum::{
    Json,
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::super::auth::session::require_auth;
use super::super::orgs::storage::resolve_org_context;
use super::{
    storage::{fetch_public_config, set_active, upsert_config},
    types::{
        PublicOktaConfigResponse, ToggleOktaConfigRequest, ToggleOktaConfigResponse,
        UpsertOktaConfigRequest, UpsertOktaConfigResponse,
    },
};

#[utoipa::path(
    get,
    path = "/api/okta/config/{org_id}",
    params(("org_id" = String, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Okta configuration with the client secret masked.", body = PublicOktaConfigResponse),
        (status = 404, description = "Organization or configuration not found."),
    ),
    tag = "okta"
)]
/// Public configuration view used by login pages to decide whether to offer
/// the Okta button. The client secret is masked, never returned.
pub async fn get_config(
    Path(org_id): Path<String>,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let Ok(organization_id) = Uuid::parse_str(org_id.trim()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match fetch_public_config(&pool, organization_id).await {
        Ok(Some((organization, okta_config))) => (
            StatusCode::OK,
            Json(PublicOktaConfigResponse {
                organization,
                okta_config,
            }),
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to fetch okta config: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/okta/config",
    request_body = UpsertOktaConfigRequest,
    responses(
        (status = 200, description = "Configuration saved; the secret is masked in the response.", body = UpsertOktaConfigResponse),
        (status = 400, description = "Missing required fields.", body = String),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 403, description = "Caller is not an organization admin."),
        (status = 404, description = "Organization not found."),
    ),
    tag = "okta"
)]
pub async fn save_config(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Json(payload): Json<UpsertOktaConfigRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let context = match resolve_org_context(&pool, principal.user_id, payload.organization_id).await
    {
        Ok(Some(context)) => context,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to resolve org for okta config: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !context.can_manage() {
        return StatusCode::FORBIDDEN.into_response();
    }

    let domain = payload.domain.trim();
    let client_id = payload.client_id.trim();
    let client_secret = payload.client_secret.trim();
    let redirect_uri = payload.redirect_uri.trim();
    if domain.is_empty() || client_id.is_empty() || client_secret.is_empty() || redirect_uri.is_empty()
    {
        return (StatusCode::BAD_REQUEST, "Missing required fields.").into_response();
    }

    match upsert_config(
        &pool,
        payload.organization_id,
        domain,
        client_id,
        client_secret,
        redirect_uri,
    )
    .await
    {
        Ok(okta_config) => (
            StatusCode::OK,
            Json(UpsertOktaConfigResponse {
                success: true,
                okta_config,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to save okta config: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/okta/config/{org_id}/toggle",
    request_body = ToggleOktaConfigRequest,
    params(("org_id" = String, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Activation switch updated.", body = ToggleOktaConfigResponse),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 403, description = "Caller is not an organization admin."),
        (status = 404, description = "Organization or configuration not found."),
    ),
    tag = "okta"
)]
pub async fn toggle_config(
    Path(org_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Json(payload): Json<ToggleOktaConfigRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Ok(organization_id) = Uuid::parse_str(org_id.trim()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let context = match resolve_org_context(&pool, principal.user_id, organization_id).await {
        Ok(Some(context)) => context,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to resolve org for okta toggle: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if !context.can_manage() {
        return StatusCode::FORBIDDEN.into_response();
    }

    match set_active(&pool, organization_id, payload.is_active).await {
        Ok(Some(is_active)) => (
            StatusCode::OK,
            Json(ToggleOktaConfigResponse {
                success: true,
                is_active,
            }),
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to toggle okta config: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
