//! Database helpers for sessions and identity reconciliation.

use anyhow::{Context, Result, anyhow};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::Provider;
use super::utils::{
    generate_session_token, hash_session_token, is_unique_violation, normalize_email,
};

/// Identity behind a valid session cookie.
pub(crate) struct SessionIdentity {
    pub(crate) user_id: Uuid,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) picture: Option<String>,
    pub(crate) provider: Provider,
    pub(crate) organization_id: Option<Uuid>,
}

/// Local user row a login was reconciled to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReconciledUser {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) picture: Option<String>,
}

pub(crate) async fn insert_session(
    pool: &PgPool,
    user_id: Uuid,
    provider: Provider,
    organization_id: Option<Uuid>,
    ttl_seconds: i64,
) -> Result<String> {
    // Generate a random token, store only its hash, and return the raw value
    // so the caller can set the session cookie.
    let query = r"
        INSERT INTO sessions (session_hash, user_id, provider, organization_id, expires_at)
        VALUES ($1, $2, $3, $4, NOW() + ($5 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(user_id)
            .bind(provider.as_str())
            .bind(organization_id)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

pub(crate) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionIdentity>> {
    // Only accept unexpired sessions.
    let query = r"
        SELECT users.id, users.email, users.name, users.picture,
               sessions.provider, sessions.organization_id
        FROM sessions
        JOIN users ON users.id = sessions.user_id
        WHERE sessions.session_hash = $1
          AND sessions.expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    let Some(row) = row else {
        return Ok(None);
    };

    // Record activity for audit/visibility without extending the session TTL.
    let query = r"
        UPDATE sessions
        SET last_seen_at = NOW()
        WHERE session_hash = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update session last_seen_at")?;

    let provider: String = row.get("provider");
    let provider = Provider::parse(&provider)
        .ok_or_else(|| anyhow!("unknown session provider: {provider}"))?;

    Ok(Some(SessionIdentity {
        user_id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        picture: row.get("picture"),
        provider,
        organization_id: row.get("organization_id"),
    }))
}

pub(crate) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    // Logout is idempotent; it's fine if no rows are deleted.
    let query = "DELETE FROM sessions WHERE session_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

/// Resolve an external identity to a local user row, creating it on first
/// sight. Email is the join key across providers: two reconciliations of the
/// same address return the same user id, even when the insert races another
/// first login (the unique violation is converted into a re-lookup).
///
/// Existing `name`/`picture` values are only backfilled when absent; a
/// provider assertion never overwrites data already on the row.
pub(crate) async fn reconcile_user(
    pool: &PgPool,
    provider: Provider,
    subject: &str,
    email: &str,
    name: Option<&str>,
    picture: Option<&str>,
) -> Result<ReconciledUser> {
    let email = normalize_email(email);

    if let Some(user) = lookup_user_by_email(pool, &email).await? {
        return backfill_profile(pool, user, name, picture).await;
    }

    let external_id = format!("{}|{}", provider.as_str(), subject);
    let query = r"
        INSERT INTO users (external_id, email, name, picture)
        VALUES ($1, $2, $3, $4)
        RETURNING id, email, name, picture
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let inserted = sqlx::query(query)
        .bind(&external_id)
        .bind(&email)
        .bind(name)
        .bind(picture)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match inserted {
        Ok(row) => Ok(ReconciledUser {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            picture: row.get("picture"),
        }),
        Err(err) if is_unique_violation(&err) => {
            // Concurrent first login for the same email won the insert.
            lookup_user_by_email(pool, &email)
                .await?
                .ok_or_else(|| anyhow!("user row missing after unique violation for {email}"))
        }
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Ensure a membership row exists for `(user, organization)`, defaulting the
/// role to `member` when newly created and leaving an existing row untouched.
pub(crate) async fn ensure_membership(
    pool: &PgPool,
    user_id: Uuid,
    organization_id: Uuid,
) -> Result<()> {
    let query = r"
        INSERT INTO team_memberships (user_id, organization_id, role)
        VALUES ($1, $2, 'member')
        ON CONFLICT (user_id, organization_id) DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(organization_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to ensure team membership")?;
    Ok(())
}

async fn lookup_user_by_email(pool: &PgPool, email: &str) -> Result<Option<ReconciledUser>> {
    let query = "SELECT id, email, name, picture FROM users WHERE email = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.map(|row| ReconciledUser {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        picture: row.get("picture"),
    }))
}

async fn backfill_profile(
    pool: &PgPool,
    user: ReconciledUser,
    name: Option<&str>,
    picture: Option<&str>,
) -> Result<ReconciledUser> {
    let fill_name = user.name.is_none() && name.is_some();
    let fill_picture = user.picture.is_none() && picture.is_some();
    if !fill_name && !fill_picture {
        return Ok(user);
    }

    // COALESCE keeps any value that landed between the lookup and this update.
    let query = r"
        UPDATE users
        SET name = COALESCE(name, $2),
            picture = COALESCE(picture, $3),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, email, name, picture
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user.id)
        .bind(name)
        .bind(picture)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to backfill user profile")?;

    Ok(ReconciledUser {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        picture: row.get("picture"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconciled_user_holds_values() {
        let user = ReconciledUser {
            id: Uuid::nil(),
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            picture: None,
        };
        assert_eq!(user.id, Uuid::nil());
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert_eq!(user.picture, None);
    }

    #[test]
    fn external_id_is_provider_qualified() {
        let external_id = format!("{}|{}", Provider::Okta.as_str(), "00u1abcd");
        assert_eq!(external_id, "okta|00u1abcd");
        let external_id = format!("{}|{}", Provider::Saml.as_str(), "alice@example.com");
        assert_eq!(external_id, "saml|alice@example.com");
    }
}
