//! Request/response types for organization-scoped APIs.
//!
//! These payloads are shared between handlers and `OpenAPI` generation. The
//! wire format uses camelCase field names (`samlEnabled`, `memberCount`, ...).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrgRequest {
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrgRequest {
    pub name: Option<String>,
    pub saml_enabled: Option<bool>,
    pub saml_entry_point: Option<String>,
    pub saml_issuer: Option<String>,
    pub saml_cert: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub member_count: i64,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgDetailResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub owner: MemberUser,
    pub saml_enabled: bool,
    pub member_count: i64,
    pub created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberUser {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub user: MemberUser,
    pub role: String,
    pub joined_at: String,
}

/// Roles that can be granted through the member-management endpoints.
/// `owner` is deliberately absent: ownership is fixed at creation time.
#[derive(Debug, Deserialize, Serialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    /// Canonical string used in API payloads and SQL writes; must match the
    /// `team_memberships.role` check constraint.
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InviteMemberRequest {
    pub email: String,
    pub role: MemberRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    pub role: MemberRole,
}

/// Returned when inviting an email that has no account yet into a
/// SAML-enabled organization: the caller gets a login URL hint instead of a
/// placeholder account.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SamlInviteResponse {
    pub message: String,
    pub saml_login_url: String,
    pub email: String,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_role_parses_lowercase() {
        let role: MemberRole = serde_json::from_str(r#""admin""#).expect("parse role");
        assert_eq!(role.as_str(), "admin");
        let role: MemberRole = serde_json::from_str(r#""member""#).expect("parse role");
        assert_eq!(role.as_str(), "member");
    }

    #[test]
    fn member_role_rejects_owner() {
        assert!(serde_json::from_str::<MemberRole>(r#""owner""#).is_err());
        assert!(serde_json::from_str::<MemberRole>(r#""OWNER""#).is_err());
    }

    #[test]
    fn update_org_request_uses_camel_case() {
        let request: UpdateOrgRequest = serde_json::from_value(serde_json::json!({
            "samlEnabled": true,
            "samlEntryPoint": "https://idp.test/sso",
        }))
        .expect("parse request");
        assert_eq!(request.saml_enabled, Some(true));
        assert_eq!(request.saml_entry_point.as_deref(), Some("https://idp.test/sso"));
        assert_eq!(request.name, None);
    }

    #[test]
    fn saml_invite_response_has_login_url_field() {
        let response = SamlInviteResponse {
            message: "SAML authentication required".to_string(),
            saml_login_url: "/api/saml/login/org-1".to_string(),
            email: "new@example.com".to_string(),
            role: "member".to_string(),
        };
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["samlLoginUrl"], "/api/saml/login/org-1");
    }
}
