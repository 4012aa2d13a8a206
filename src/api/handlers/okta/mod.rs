//! Okta OAuth2 per organization.
//!
//! Each organization can store its own Okta application (domain, client
//! id/secret, redirect URI) and gate it behind an `is_active` switch. Login
//! only proceeds when the switch is on. The callback is protected by a
//! single-use CSRF handshake: the `state` value generated at login time must
//! match exactly, and a consumed handshake can never be replayed.
//!
//! Flow Overview:
//! 1) `GET /api/okta/login/{org_slug}` stores a handshake and redirects to the
//!    organization's Okta authorize endpoint.
//! 2) `GET /api/okta/callback` consumes the handshake, verifies `state`,
//!    exchanges the code (HTTP Basic client auth), fetches userinfo,
//!    reconciles the identity, ensures team membership, and establishes the
//!    session.
//! 3) `/api/okta/config*` endpoints let organization admins manage the
//!    configuration; the client secret is never echoed back.

pub(crate) mod config;
pub(crate) mod sso;
mod storage;
mod types;
