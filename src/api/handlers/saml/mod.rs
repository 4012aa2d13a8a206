//! SAML SSO per organization.
//!
//! Organizations store their IdP entry point, issuer, and signing certificate
//! on the organization row. A `samael` service provider is built lazily from
//! those fields on every login request, so there is no global registry of
//! live strategy objects and configuration changes take effect immediately.
//!
//! Flow Overview:
//! 1) `GET /api/saml/login/{organization_id}` generates an AuthnRequest,
//!    stores the request id in the handshake store, and redirects to the IdP.
//!    The handshake id travels as the RelayState, since the IdP posts the
//!    assertion cross-site and a `SameSite=Lax` cookie would not be sent.
//! 2) `POST /api/saml/callback/{organization_id}` consumes the handshake,
//!    validates the response against the stored request id, extracts the
//!    identity from the assertion, reconciles it, ensures team membership,
//!    and establishes the session.

mod provider;
pub(crate) mod sso;
