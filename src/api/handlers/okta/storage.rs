//! SQL storage helpers for per-organization Okta configuration.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::{MASKED_SECRET, OktaConfigView, OrganizationSummary};

/// Fields needed to drive an Okta OAuth2 handshake.
pub(super) struct OktaLoginConfig {
    pub(super) organization_id: Uuid,
    pub(super) domain: String,
    pub(super) client_id: String,
    pub(super) client_secret: String,
    pub(super) redirect_uri: String,
    pub(super) is_active: bool,
}

pub(super) async fn fetch_login_config_by_slug(
    pool: &PgPool,
    org_slug: &str,
) -> Result<Option<OktaLoginConfig>> {
    let query = r"
        SELECT o.id AS organization_id, c.domain, c.client_id, c.client_secret,
               c.redirect_uri, c.is_active
        FROM organizations o
        JOIN okta_configs c ON c.organization_id = o.id
        WHERE o.slug = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(org_slug)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup okta config by slug")?;
    Ok(row.map(login_config_from_row))
}

pub(super) async fn fetch_login_config_by_org(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Option<OktaLoginConfig>> {
    let query = r"
        SELECT organization_id, domain, client_id, client_secret, redirect_uri, is_active
        FROM okta_configs
        WHERE organization_id = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(organization_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup okta config by organization")?;
    Ok(row.map(login_config_from_row))
}

fn login_config_from_row(row: sqlx::postgres::PgRow) -> OktaLoginConfig {
    OktaLoginConfig {
        organization_id: row.get("organization_id"),
        domain: row.get("domain"),
        client_id: row.get("client_id"),
        client_secret: row.get("client_secret"),
        redirect_uri: row.get("redirect_uri"),
        is_active: row.get("is_active"),
    }
}

/// Fetch the organization summary and its masked Okta config for the public
/// view used by login pages. The secret never leaves the storage layer.
pub(super) async fn fetch_public_config(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Option<(OrganizationSummary, OktaConfigView)>> {
    let query = r#"
        SELECT o.id::text AS org_id, o.name AS org_name, o.slug AS org_slug,
               c.organization_id::text AS organization_id,
               c.domain, c.client_id, c.redirect_uri, c.is_active,
               to_char(c.updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM organizations o
        JOIN okta_configs c ON c.organization_id = o.id
        WHERE o.id = $1
        LIMIT 1
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(organization_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup public okta config")?;

    Ok(row.map(|row| {
        (
            OrganizationSummary {
                id: row.get("org_id"),
                name: row.get("org_name"),
                slug: row.get("org_slug"),
            },
            OktaConfigView {
                organization_id: row.get("organization_id"),
                domain: row.get("domain"),
                client_id: row.get("client_id"),
                client_secret: MASKED_SECRET.to_string(),
                redirect_uri: row.get("redirect_uri"),
                is_active: row.get("is_active"),
                updated_at: row.get("updated_at"),
            },
        )
    }))
}

/// Create or update an organization's Okta config. The `is_active` switch is
/// left untouched on update so re-saving credentials cannot re-enable login.
pub(super) async fn upsert_config(
    pool: &PgPool,
    organization_id: Uuid,
    domain: &str,
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
) -> Result<OktaConfigView> {
    let query = r#"
        INSERT INTO okta_configs (organization_id, domain, client_id, client_secret, redirect_uri)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (organization_id) DO UPDATE SET
            domain = EXCLUDED.domain,
            client_id = EXCLUDED.client_id,
            client_secret = EXCLUDED.client_secret,
            redirect_uri = EXCLUDED.redirect_uri,
            updated_at = NOW()
        RETURNING organization_id::text AS organization_id, domain, client_id,
            redirect_uri, is_active,
            to_char(updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
    "#;
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(organization_id)
        .bind(domain)
        .bind(client_id)
        .bind(client_secret)
        .bind(redirect_uri)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to upsert okta config")?;

    Ok(OktaConfigView {
        organization_id: row.get("organization_id"),
        domain: row.get("domain"),
        client_id: row.get("client_id"),
        client_secret: MASKED_SECRET.to_string(),
        redirect_uri: row.get("redirect_uri"),
        is_active: row.get("is_active"),
        updated_at: row.get("updated_at"),
    })
}

/// Flip the `is_active` switch. Returns `None` when no config row exists.
pub(super) async fn set_active(
    pool: &PgPool,
    organization_id: Uuid,
    is_active: bool,
) -> Result<Option<bool>> {
    let query = r"
        UPDATE okta_configs
        SET is_active = $2, updated_at = NOW()
        WHERE organization_id = $1
        RETURNING is_active
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(organization_id)
        .bind(is_active)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to toggle okta config")?;
    Ok(row.map(|row| row.get("is_active")))
}
