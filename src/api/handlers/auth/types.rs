//! Request/response types shared by the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The authentication strategy that established a session.
///
/// Stored in the `sessions.provider` column and used as the prefix of
/// `users.external_id`, so the string forms are part of the persisted format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Provider {
    Oidc,
    Okta,
    Saml,
}

impl Provider {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Oidc => "oidc",
            Self::Okta => "okta",
            Self::Saml => "saml",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "oidc" => Some(Self::Oidc),
            "okta" => Some(Self::Okta),
            "saml" => Some(Self::Saml),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeUser {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Organization the Okta/SAML session was established against.
    #[serde(rename = "organizationId", skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<MeUser>,
    #[serde(rename = "authType", skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
}

/// Query parameters on OAuth2 callback endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct CallbackQuery {
    pub(crate) code: Option<String>,
    pub(crate) state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_round_trips() {
        for provider in [Provider::Oidc, Provider::Okta, Provider::Saml] {
            assert_eq!(Provider::parse(provider.as_str()), Some(provider));
        }
        assert_eq!(Provider::parse("basic"), None);
    }

    #[test]
    fn me_response_uses_wire_field_names() {
        let response = MeResponse {
            authenticated: true,
            user: Some(MeUser {
                id: "u-1".to_string(),
                email: "alice@example.com".to_string(),
                name: None,
                picture: None,
                organization_id: Some("org-1".to_string()),
            }),
            auth_type: Some("saml".to_string()),
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["authenticated"], true);
        assert_eq!(value["authType"], "saml");
        assert_eq!(value["user"]["email"], "alice@example.com");
        assert_eq!(value["user"]["organizationId"], "org-1");
        assert!(value["user"].get("name").is_none());
    }

    #[test]
    fn unauthenticated_response_omits_user() {
        let response = MeResponse {
            authenticated: false,
            user: None,
            auth_type: None,
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value, serde_json::json!({"authenticated": false}));
    }
}
