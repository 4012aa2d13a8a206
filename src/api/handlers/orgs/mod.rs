//! Organization and team-membership endpoints.
//!
//! Organizations are the tenant boundary, so every handler scopes by the
//! organization id and derives authorization from the caller's membership
//! role. We return 404 for non-members (including on write attempts) to avoid
//! exposing resource existence, and 403 for members who lack the required
//! role. Slugs are normalized to stable URL-safe identifiers and are
//! immutable once created, since login URLs embed them.
//!
//! The owner membership is special: it always matches `organizations.owner_id`,
//! and it can be neither re-roled nor removed through the member-management
//! endpoints.
//!
//! Flow Overview:
//! 1) Authenticate via session cookie.
//! 2) Resolve the organization and verify membership.
//! 3) Enforce owner/admin roles for write operations.
//! 4) Perform scoped CRUD for organizations and members.

pub(crate) mod members;
pub(crate) mod organizations;
mod slug;
pub(crate) mod storage;
mod types;

const ORG_SLUG_MIN: usize = 3;
const ORG_SLUG_MAX: usize = 50;

const ORG_ROLE_OWNER: &str = "owner";
const ORG_ROLE_ADMIN: &str = "admin";
