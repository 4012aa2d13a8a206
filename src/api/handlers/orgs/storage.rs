//! Shared SQL storage helpers for organizations and team memberships.
//!
//! Handlers parse inputs and map the high-level flow; this module owns the
//! database queries, constraint handling, and response shaping.

use axum::{http::StatusCode, response::IntoResponse};
use sqlx::{PgPool, Row};
use tracing::error;
use uuid::Uuid;

use super::{
    ORG_ROLE_ADMIN, ORG_ROLE_OWNER,
    types::{MemberResponse, MemberUser, OrgDetailResponse, OrgResponse},
};

/// An organization resolved together with the caller's membership role.
#[derive(Debug)]
pub(crate) struct OrgContext {
    saml_enabled: bool,
    role: String,
}

impl OrgContext {
    /// Returns `true` when the member holds an elevated org role (owner/admin).
    /// Use this ACL helper to guard member management and configuration writes.
    pub(crate) fn can_manage(&self) -> bool {
        self.role == ORG_ROLE_OWNER || self.role == ORG_ROLE_ADMIN
    }

    /// Returns `true` only for the organization owner.
    pub(crate) fn is_owner(&self) -> bool {
        self.role == ORG_ROLE_OWNER
    }

    pub(super) fn saml_enabled(&self) -> bool {
        self.saml_enabled
    }
}

#[derive(Debug)]
pub(crate) enum OrgError {
    Conflict(&'static str),
    Database(sqlx::Error),
}

impl IntoResponse for OrgError {
    /// Maps storage-layer failures into stable HTTP responses for handlers.
    /// Database errors are logged server-side and surfaced as `500` without leaking details.
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Conflict(message) => (StatusCode::CONFLICT, message).into_response(),
            Self::Database(err) => {
                error!("Database error: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Inserts a new organization and the creator's owner membership in one
/// transaction. A slug collision maps to `409` rather than being resolved
/// silently, since login URLs embed the slug.
pub(super) async fn create_org(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    slug: &str,
) -> Result<OrgResponse, OrgError> {
    let mut tx = pool.begin().await.map_err(OrgError::Database)?;

    let insert = sqlx::query(
        r#"
        INSERT INTO organizations (name, slug, owner_id)
        VALUES ($1, $2, $3)
        RETURNING id, slug, name,
            to_char(created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await;

    let row = match insert {
        Ok(row) => row,
        Err(err) => {
            if is_unique_violation(&err) {
                let _ = tx.rollback().await;
                return Err(OrgError::Conflict("Organization slug is already taken."));
            }
            return Err(OrgError::Database(err));
        }
    };

    let org_id: Uuid = row.get("id");
    sqlx::query(
        r"
        INSERT INTO team_memberships (user_id, organization_id, role)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(user_id)
    .bind(org_id)
    .bind(ORG_ROLE_OWNER)
    .execute(&mut *tx)
    .await
    .map_err(OrgError::Database)?;

    tx.commit().await.map_err(OrgError::Database)?;

    Ok(OrgResponse {
        id: org_id.to_string(),
        name: row.get("name"),
        slug: row.get("slug"),
        member_count: 1,
        created_at: row.get("created_at"),
    })
}

/// Fetches organizations where `user_id` holds a membership, newest first.
pub(super) async fn fetch_orgs_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<OrgResponse>, sqlx::Error> {
    let query = r#"
        SELECT
            o.id::text AS id,
            o.name,
            o.slug,
            (SELECT COUNT(*) FROM team_memberships tm WHERE tm.organization_id = o.id) AS member_count,
            to_char(o.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM organizations o
        JOIN team_memberships m ON m.organization_id = o.id
        WHERE m.user_id = $1
        ORDER BY o.created_at DESC
    "#;
    let rows = sqlx::query(query).bind(user_id).fetch_all(pool).await?;
    Ok(rows
        .into_iter()
        .map(|row| OrgResponse {
            id: row.get("id"),
            name: row.get("name"),
            slug: row.get("slug"),
            member_count: row.get("member_count"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// Resolves an organization for `user_id`, returning the caller's role.
/// Returns `None` for non-members so handlers can answer `404` without
/// leaking tenant existence.
pub(crate) async fn resolve_org_context(
    pool: &PgPool,
    user_id: Uuid,
    organization_id: Uuid,
) -> Result<Option<OrgContext>, sqlx::Error> {
    let query = r"
        SELECT o.saml_enabled, m.role
        FROM organizations o
        JOIN team_memberships m ON m.organization_id = o.id AND m.user_id = $1
        WHERE o.id = $2
        LIMIT 1
    ";
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| OrgContext {
        saml_enabled: row.get("saml_enabled"),
        role: row.get("role"),
    }))
}

/// Full organization view including the owner profile and member count.
pub(super) async fn fetch_org_detail(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Option<OrgDetailResponse>, sqlx::Error> {
    let query = r#"
        SELECT
            o.id::text AS id,
            o.name,
            o.slug,
            o.saml_enabled,
            u.id::text AS owner_id,
            u.email AS owner_email,
            u.name AS owner_name,
            u.picture AS owner_picture,
            (SELECT COUNT(*) FROM team_memberships tm WHERE tm.organization_id = o.id) AS member_count,
            to_char(o.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at
        FROM organizations o
        JOIN users u ON u.id = o.owner_id
        WHERE o.id = $1
        LIMIT 1
    "#;
    let row = sqlx::query(query)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| OrgDetailResponse {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        owner: MemberUser {
            id: row.get("owner_id"),
            email: row.get("owner_email"),
            name: row.get("owner_name"),
            picture: row.get("owner_picture"),
        },
        saml_enabled: row.get("saml_enabled"),
        member_count: row.get("member_count"),
        created_at: row.get("created_at"),
    }))
}

/// Applies allow-listed updates (name, SAML settings). The slug is immutable.
pub(super) async fn update_org(
    pool: &PgPool,
    organization_id: Uuid,
    name: Option<&str>,
    saml_enabled: Option<bool>,
    saml_entry_point: Option<&str>,
    saml_issuer: Option<&str>,
    saml_cert: Option<&str>,
) -> Result<Option<OrgDetailResponse>, sqlx::Error> {
    let query = r"
        UPDATE organizations
        SET
            name = COALESCE($2, name),
            saml_enabled = COALESCE($3, saml_enabled),
            saml_entry_point = COALESCE($4, saml_entry_point),
            saml_issuer = COALESCE($5, saml_issuer),
            saml_cert = COALESCE($6, saml_cert)
        WHERE id = $1
        RETURNING id
    ";
    let row = sqlx::query(query)
        .bind(organization_id)
        .bind(name)
        .bind(saml_enabled)
        .bind(saml_entry_point)
        .bind(saml_issuer)
        .bind(saml_cert)
        .fetch_optional(pool)
        .await?;
    if row.is_none() {
        return Ok(None);
    }
    fetch_org_detail(pool, organization_id).await
}

/// Deletes the organization; memberships and the Okta config cascade.
pub(super) async fn delete_org(pool: &PgPool, organization_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
        .bind(organization_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Lists members with their user profiles, owner first.
pub(super) async fn fetch_members(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<MemberResponse>, sqlx::Error> {
    let query = r#"
        SELECT
            u.id::text AS user_id,
            u.email,
            u.name,
            u.picture,
            m.role,
            to_char(m.joined_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS joined_at
        FROM team_memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.organization_id = $1
        ORDER BY
            CASE m.role WHEN 'owner' THEN 0 WHEN 'admin' THEN 1 ELSE 2 END,
            m.joined_at ASC
    "#;
    let rows = sqlx::query(query)
        .bind(organization_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(member_from_row).collect())
}

/// Looks up a user's id by normalized email, without creating anything.
pub(super) async fn lookup_user_id_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    let row = sqlx::query("SELECT id FROM users WHERE email = $1 LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("id")))
}

/// Current role of a member, if any.
pub(super) async fn lookup_member_role(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    let row = sqlx::query(
        r"
        SELECT role
        FROM team_memberships
        WHERE organization_id = $1 AND user_id = $2
        LIMIT 1
        ",
    )
    .bind(organization_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|row| row.get("role")))
}

/// Adds an existing user to the team with the given role.
pub(super) async fn insert_member(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
    role: &str,
) -> Result<MemberResponse, OrgError> {
    let insert = sqlx::query(
        r#"
        WITH inserted AS (
            INSERT INTO team_memberships (user_id, organization_id, role)
            VALUES ($1, $2, $3)
            RETURNING user_id, role, joined_at
        )
        SELECT
            u.id::text AS user_id,
            u.email,
            u.name,
            u.picture,
            inserted.role,
            to_char(inserted.joined_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS joined_at
        FROM inserted
        JOIN users u ON u.id = inserted.user_id
        "#,
    )
    .bind(user_id)
    .bind(organization_id)
    .bind(role)
    .fetch_one(pool)
    .await;

    match insert {
        Ok(row) => Ok(member_from_row(row)),
        Err(err) => {
            if is_unique_violation(&err) {
                Err(OrgError::Conflict("User is already a team member."))
            } else {
                Err(OrgError::Database(err))
            }
        }
    }
}

/// Changes a member's role. Callers must have already excluded the owner row.
pub(super) async fn update_member_role(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
    role: &str,
) -> Result<Option<MemberResponse>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        WITH updated AS (
            UPDATE team_memberships
            SET role = $3
            WHERE organization_id = $1 AND user_id = $2
            RETURNING user_id, role, joined_at
        )
        SELECT
            u.id::text AS user_id,
            u.email,
            u.name,
            u.picture,
            updated.role,
            to_char(updated.joined_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS joined_at
        FROM updated
        JOIN users u ON u.id = updated.user_id
        "#,
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(role)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(member_from_row))
}

/// Removes a membership row. Callers must have already excluded the owner row.
pub(super) async fn delete_member(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM team_memberships WHERE organization_id = $1 AND user_id = $2")
            .bind(organization_id)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

fn member_from_row(row: sqlx::postgres::PgRow) -> MemberResponse {
    MemberResponse {
        user: MemberUser {
            id: row.get("user_id"),
            email: row.get("email"),
            name: row.get("name"),
            picture: row.get("picture"),
        },
        role: row.get("role"),
        joined_at: row.get("joined_at"),
    }
}

/// Returns `true` when `err` is a database unique-violation (SQLSTATE `23505`).
/// This is used to translate constraint errors into stable API `409` responses.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: &str) -> OrgContext {
        OrgContext {
            saml_enabled: false,
            role: role.to_string(),
        }
    }

    #[test]
    fn owner_and_admin_can_manage() {
        assert!(context("owner").can_manage());
        assert!(context("admin").can_manage());
        assert!(!context("member").can_manage());
    }

    #[test]
    fn only_owner_is_owner() {
        assert!(context("owner").is_owner());
        assert!(!context("admin").is_owner());
        assert!(!context("member").is_owner());
    }

    #[test]
    fn org_error_status_codes() {
        let response = OrgError::Conflict("conflict").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = OrgError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
