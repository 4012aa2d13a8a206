//! Team member management handlers.
//!
//! Listing requires membership; invite, role change, and removal require an
//! admin or the owner. The owner membership itself is immutable through these
//! endpoints: it can be neither re-roled nor removed, whoever asks.

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
use super::super::auth::utils::{normalize_email, valid_email};
use super::{
    ORG_ROLE_OWNER,
    storage::{
        OrgContext, delete_member, fetch_members, insert_member, lookup_member_role,
        lookup_user_id_by_email, resolve_org_context, update_member_role,
    },
    types::{InviteMemberRequest, MemberResponse, SamlInviteResponse, UpdateMemberRequest},
};

#[utoipa::path(
    get,
    path = "/api/organizations/{org_id}/members",
    params(("org_id" = String, Path, description = "Organization id")),
    responses(
        (status = 200, description = "Team members, owner first.", body = [MemberResponse]),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 404, description = "Organization not found."),
    ),
    tag = "orgs"
)]
pub async fn list(
    Path(org_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let Some((_context, organization_id)) =
        (match member_context(&headers, &pool, &org_id).await {
            Ok(resolved) => resolved,
            Err(response) => return response,
        })
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match fetch_members(&pool, organization_id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(err) => {
            error!("Failed to list members: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/organizations/{org_id}/members",
    request_body = InviteMemberRequest,
    params(("org_id" = String, Path, description = "Organization id")),
    responses(
        (status = 201, description = "Existing user added to the team.", body = MemberResponse),
        (status = 200, description = "No account for this email; SAML login URL hint returned.", body = SamlInviteResponse),
        (status = 400, description = "Invalid input or unknown user on a non-SAML organization.", body = String),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 403, description = "Caller is not an organization admin."),
        (status = 404, description = "Organization not found."),
        (status = 409, description = "User is already a team member.", body = String),
    ),
    tag = "orgs"
)]
/// Invites a user by email. An existing account is added directly; an unknown
/// email on a SAML-enabled organization gets a login URL hint instead of a
/// placeholder account (first SAML login creates the user and membership).
pub async fn invite(
    Path(org_id): Path<String>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Json(payload): Json<InviteMemberRequest>,
) -> impl IntoResponse {
    let Some((context, organization_id)) =
        (match member_context(&headers, &pool, &org_id).await {
            Ok(resolved) => resolved,
            Err(response) => return response,
        })
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !context.can_manage() {
        return StatusCode::FORBIDDEN.into_response();
    }

    let email = normalize_email(&payload.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "A valid email is required.").into_response();
    }

    let user_id = match lookup_user_id_by_email(&pool, &email).await {
        Ok(user_id) => user_id,
        Err(err) => {
            error!("Failed to lookup user for invite: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Some(user_id) = user_id else {
        // No placeholder accounts: on SAML orgs the first login provisions the
        // user and membership, so hand back the login URL instead.
        if context.saml_enabled() {
            let response = SamlInviteResponse {
                message: "SAML authentication required".to_string(),
                saml_login_url: format!("/api/saml/login/{organization_id}"),
                email,
                role: payload.role.as_str().to_string(),
            };
            return (StatusCode::OK, Json(response)).into_response();
        }
        return (
            StatusCode::BAD_REQUEST,
            "User not found. Please ask them to sign up first.",
        )
            .into_response();
    };

    match insert_member(&pool, organization_id, user_id, payload.role.as_str()).await {
        Ok(member) => (StatusCode::CREATED, Json(member)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    patch,
    path = "/api/organizations/{org_id}/members/{member_id}",
    request_body = UpdateMemberRequest,
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("member_id" = String, Path, description = "Member user id"),
    ),
    responses(
        (status = 200, description = "Role updated.", body = MemberResponse),
        (status = 400, description = "Cannot change owner role.", body = String),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 403, description = "Caller is not an organization admin."),
        (status = 404, description = "Organization or member not found."),
    ),
    tag = "orgs"
)]
pub async fn update_role(
    Path((org_id, member_id)): Path<(String, String)>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    Json(payload): Json<UpdateMemberRequest>,
) -> impl IntoResponse {
    let Some((context, organization_id)) =
        (match member_context(&headers, &pool, &org_id).await {
            Ok(resolved) => resolved,
            Err(response) => return response,
        })
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !context.can_manage() {
        return StatusCode::FORBIDDEN.into_response();
    }

    let Ok(member_user_id) = Uuid::parse_str(member_id.trim()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match lookup_member_role(&pool, organization_id, member_user_id).await {
        Ok(Some(role)) if role == ORG_ROLE_OWNER => {
            return (StatusCode::BAD_REQUEST, "Cannot change owner role").into_response();
        }
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to lookup member: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match update_member_role(&pool, organization_id, member_user_id, payload.role.as_str()).await {
        Ok(Some(member)) => (StatusCode::OK, Json(member)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to update member role: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/organizations/{org_id}/members/{member_id}",
    params(
        ("org_id" = String, Path, description = "Organization id"),
        ("member_id" = String, Path, description = "Member user id"),
    ),
    responses(
        (status = 204, description = "Member removed."),
        (status = 400, description = "Cannot remove organization owner.", body = String),
        (status = 401, description = "Missing or invalid session cookie."),
        (status = 403, description = "Caller is not an organization admin."),
        (status = 404, description = "Organization or member not found."),
    ),
    tag = "orgs"
)]
/// Removes a member. The owner row is untouchable; an admin removing their
/// own row succeeds (and a repeat of the same call answers 404).
pub async fn remove(
    Path((org_id, member_id)): Path<(String, String)>,
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let Some((context, organization_id)) =
        (match member_context(&headers, &pool, &org_id).await {
            Ok(resolved) => resolved,
            Err(response) => return response,
        })
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if !context.can_manage() {
        return StatusCode::FORBIDDEN.into_response();
    }

    let Ok(member_user_id) = Uuid::parse_str(member_id.trim()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match lookup_member_role(&pool, organization_id, member_user_id).await {
        Ok(Some(role)) if role == ORG_ROLE_OWNER => {
            return (StatusCode::BAD_REQUEST, "Cannot remove organization owner").into_response();
        }
        Ok(Some(_)) => {}
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to lookup member: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match delete_member(&pool, organization_id, member_user_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Failed to remove member: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Authenticate the caller and resolve their membership for the path's
/// organization. `Ok(None)` means "answer 404" (bad id or not a member);
/// `Err` carries a ready error response.
async fn member_context(
    headers: &HeaderMap,
    pool: &PgPool,
    org_id: &str,
) -> Result<Option<(OrgContext, Uuid)>, axum::response::Response> {
    let principal = match require_auth(headers, pool).await {
        Ok(principal) => principal,
        Err(status) => return Err(status.into_response()),
    };

    let Ok(organization_id) = Uuid::parse_str(org_id.trim()) else {
        return Ok(None);
    };

    match resolve_org_context(pool, principal.user_id, organization_id).await {
        Ok(Some(context)) => Ok(Some((context, organization_id))),
        Ok(None) => Ok(None),
        Err(err) => {
            error!("Failed to resolve org membership: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}
