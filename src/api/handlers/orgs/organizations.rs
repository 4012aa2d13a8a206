//! Organization CRUD handlers.
//!
//! This module implements org-level endpoints and delegates database access to
//! the shared `storage` module. It intentionally returns `404` for
//! non-members to avoid leaking tenant existence; members without the
//! required role get `403`.

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
use super::{
    ORG_SLUG_MAX, ORG_SLUG_MIN,
    slug::normalize_slug,
    storage::{
        create_org, delete_org, fetch_org_detail, fetch_orgs_for_user, resolve_org_context,
        update_org,
    },
    types::{CreateOrgRequest, OrgDetailResponse, OrgResponse, UpdateOrgRequest},
};

#[utoipa::path(
    post,
    path = "/api/organizations",
    request_body = CreateOrgRequest,
    responses(
        (status = 201, description = "Organization created; the creator becomes owner.", body = OrgResponse),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 409, description = "Organization slug is already taken.", body = String),
    ),
    tag = "orgs"
)]
/// Creates a new organization for the authenticated user.
/// The creator becomes the owner and its first team member; the slug is
/// normalized once and immutable afterwards, so a collision is a `409`, never
/// a silent rewrite.
pub async fn create(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Json(payload): Json<CreateOrgRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let name = payload.name.trim();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, "Organization name is required.").into_response();
    }

    let slug = match payload.slug.as_deref() {
        Some(slug) => normalize_slug(slug, ORG_SLUG_MIN, ORG_SLUG_MAX),
        None => normalize_slug(name, ORG_SLUG_MIN, ORG_SLUG_MAX),
    };
    let Some(slug) = slug else {
        return (StatusCode::BAD_REQUEST, "Invalid organization slug.").into_response();
    };

    match create_org(&pool, principal.user_id, name, &slug).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    get,
    path = "/api/organizations",
    responses(
        (status = 200, description = "Organizations the caller is a member of.", body = [OrgResponse]),
        (status = 401, description = "Missing or invalid session cookie."),
    ),
    tag = "orgs"
)]
pub async fn list(headers: HeaderMap, pool: Extension<PgPool>) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match fetch_orgs_for_user(&pool, principal.user_id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list orgs: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/organizations/{org_id}",
    params(("org_id" = String, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Organization detail.", body = OrgDetailResponse),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 404, description = "Organization not found."),
    ),
    tag = "orgs"
)]
/// Fetches organization details for members. Non-members get `404` to reduce
/// cross-tenant enumeration.
pub async fn get(
    Path(org_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Ok(organization_id) = Uuid::parse_str(org_id.trim()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match resolve_org_context(&pool, principal.user_id, organization_id).await {
        Ok(Some(_context)) => match fetch_org_detail(&pool, organization_id).await {
            Ok(Some(detail)) => (StatusCode::OK, Json(detail)).into_response(),
            Ok(None) => StatusCode::NOT_FOUND.into_response(),
            Err(err) => {
                error!("Failed to fetch org detail: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to resolve org: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/organizations/{org_id}",
    request_body = UpdateOrgRequest,
    params(("org_id" = String, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Organization updated.", body = OrgDetailResponse),
        (status = 400, description = "Invalid input.", body = String),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 403, description = "Caller is not the organization owner."),
        (status = 404, description = "Organization not found."),
    ),
    tag = "orgs"
)]
/// Updates the organization name and SAML settings. Owner only; the slug is
/// immutable because login URLs embed it.
pub async fn patch(
    Path(org_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Json(payload): Json<UpdateOrgRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Ok(organization_id) = Uuid::parse_str(org_id.trim()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let context = match resolve_org_context(&pool, principal.user_id, organization_id).await {
        Ok(Some(context)) => context,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to resolve org for patch: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if !context.is_owner() {
        return StatusCode::FORBIDDEN.into_response();
    }

    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if payload.name.is_some() && name.is_none() {
        return (StatusCode::BAD_REQUEST, "Organization name is required.").into_response();
    }
    if name.is_none()
        && payload.saml_enabled.is_none()
        && payload.saml_entry_point.is_none()
        && payload.saml_issuer.is_none()
        && payload.saml_cert.is_none()
    {
        return (StatusCode::BAD_REQUEST, "No updates provided.").into_response();
    }

    match update_org(
        &pool,
        organization_id,
        name,
        payload.saml_enabled,
        payload.saml_entry_point.as_deref(),
        payload.saml_issuer.as_deref(),
        payload.saml_cert.as_deref(),
    )
    .await
    {
        Ok(Some(detail)) => (StatusCode::OK, Json(detail)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update org: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/organizations/{org_id}",
    params(("org_id" = String, Path, description = "Organization id")),
    responses(
        (status = 204, description = "Organization deleted."),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 403, description = "Caller is not the organization owner."),
        (status = 404, description = "Organization not found."),
    ),
    tag = "orgs"
)]
/// Deletes the organization. Owner only; memberships and the Okta
/// configuration are removed with it.
pub async fn delete(
    Path(org_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Ok(organization_id) = Uuid::parse_str(org_id.trim()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let context = match resolve_org_context(&pool, principal.user_id, organization_id).await {
        Ok(Some(context)) => context,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to resolve org for delete: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if !context.is_owner() {
        return StatusCode::FORBIDDEN.into_response();
    }

    match delete_org(&pool, organization_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to delete org: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
