//! API handlers for Ingresso.
//!
//! Handlers are split by area: `auth` (strategy resolution, sessions, generic
//! OIDC), `okta` and `saml` (per-organization strategies), `orgs`
//! (organization and team CRUD), plus `health` and the root banner.

pub(crate) mod auth;
pub mod health;
pub(crate) mod okta;
pub(crate) mod orgs;
pub mod root;
pub(crate) mod saml;
