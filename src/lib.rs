//! # Ingresso (Multi-strategy SSO & Organizations)
//!
//! `ingresso` is a single sign-on service that supports several authentication
//! strategies at the same time and layers them onto an organization/team
//! membership model.
//!
//! ## Strategies
//!
//! - **OIDC**: a generic authorization-code flow against a globally configured
//!   provider (WorkOS, Auth0, or any spec-compliant issuer).
//! - **Okta per organization**: each organization can store its own Okta
//!   OAuth2 application (domain, client id/secret, redirect URI) and members
//!   sign in through `/api/okta/login/{org_slug}`.
//! - **SAML per organization**: organizations can enable SAML SSO with their
//!   own IdP entry point, issuer, and signing certificate; the service
//!   provider is built lazily per login request.
//!
//! Whatever the strategy, a successful login funnels through the same identity
//! reconciliation step: the asserted email is resolved to a local user row
//! (created on first sight) and a server-side session is established. Email is
//! the join key across providers, so the same address always maps to the same
//! user.
//!
//! ## Authorization & Membership
//!
//! Organization access is controlled by membership roles (`owner`, `admin`,
//! `member`). Non-members get `404 Not Found` rather than `403 Forbidden` to
//! prevent resource enumeration. The owner membership is immutable: it can be
//! neither re-roled nor removed.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        // Should be a hex string (full SHA-1 is 40 chars, but could be short)
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
