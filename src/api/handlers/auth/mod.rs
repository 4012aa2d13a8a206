//! Auth handlers and supporting modules.
//!
//! This module coordinates the authentication strategies (OIDC, Okta per
//! organization, SAML per organization), server-side sessions, and identity
//! reconciliation.
//!
//! ## Sessions
//!
//! Two cookies can carry a session: `ingresso_session` for identities
//! established by the Okta/SAML flows and `ingresso_oidc` for the generic
//! OIDC flow. A request is resolved against them in a fixed priority order so
//! only one scheme is ever the source of truth (see [`session`]).
//!
//! ## Identity reconciliation
//!
//! Every login path funnels through [`storage::reconcile_user`]: the asserted
//! email is looked up and, on first sight, a user row is created with a
//! provider-qualified external id (`okta|<sub>`, `saml|<nameID>`, or the OIDC
//! subject). Two providers asserting the same email resolve to the same user.
//!
//! ## In-flight handshakes
//!
//! CSRF state, the pending organization, and the SAML request id live in an
//! in-memory single-use store ([`state::HandshakeStore`]). Entries are removed
//! on first read, so a replayed or concurrent callback observes absence and is
//! rejected.

pub(crate) mod oidc;
pub(crate) mod session;
pub(crate) mod state;
pub(crate) mod storage;
pub(crate) mod types;
pub(crate) mod utils;

pub use state::{AuthConfig, AuthState, OidcConfig};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

/// Failures across the login flows, mapped to stable HTTP responses.
#[derive(Debug)]
pub(crate) enum AuthError {
    /// The organization has not (fully) configured this strategy.
    NotConfigured(&'static str),
    /// Server-side provider settings are missing or invalid.
    Configuration(anyhow::Error),
    /// CSRF state is missing, reused, or does not match the stored value.
    InvalidState,
    /// The SAML response could not be validated or lacks an identity.
    InvalidAssertion(&'static str),
    /// The provider rejected the authorization code or credentials.
    Authentication,
    /// The provider could not be reached within the request timeout.
    UpstreamUnavailable(reqwest::Error),
    /// Unexpected failure; detail is logged, never sent to the client.
    Internal(anyhow::Error),
}

impl AuthError {
    /// Classify a transport-level error from a provider call.
    pub(crate) fn from_upstream(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::UpstreamUnavailable(err)
        } else {
            Self::Internal(err.into())
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::NotConfigured(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Configuration(err) => {
                error!("Provider configuration error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Login is unavailable.").into_response()
            }
            Self::InvalidState => {
                // Security-relevant: possible CSRF or replayed callback.
                warn!("Rejected login callback with missing, reused, or mismatched state");
                (StatusCode::BAD_REQUEST, "Invalid state parameter.").into_response()
            }
            Self::InvalidAssertion(message) => {
                warn!("Rejected SAML assertion: {message}");
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            Self::Authentication => (StatusCode::UNAUTHORIZED, "Login failed.").into_response(),
            Self::UpstreamUnavailable(err) => {
                error!("Identity provider unreachable: {err}");
                (StatusCode::BAD_GATEWAY, "Identity provider is unavailable.").into_response()
            }
            Self::Internal(err) => {
                error!("{err:#}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_configured_maps_to_bad_request() {
        let response = AuthError::NotConfigured("Okta is not configured.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_state_maps_to_bad_request() {
        let response = AuthError::InvalidState.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn authentication_maps_to_unauthorized() {
        let response = AuthError::Authentication.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn configuration_hides_detail() {
        let response =
            AuthError::Configuration(anyhow::anyhow!("client id missing")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_maps_to_server_error() {
        let response = AuthError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
