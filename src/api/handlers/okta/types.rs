//! Request/response types for the Okta configuration API.
//!
//! These payloads keep the camelCase field names of the original wire format
//! (`clientId`, `isActive`, ...), and the client secret is masked on every
//! response.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub(crate) const MASKED_SECRET: &str = "***";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOktaConfigRequest {
    pub organization_id: Uuid,
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOktaConfigRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OktaConfigView {
    pub organization_id: String,
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub is_active: bool,
    pub updated_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrganizationSummary {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicOktaConfigResponse {
    pub organization: OrganizationSummary,
    pub okta_config: OktaConfigView,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOktaConfigResponse {
    pub success: bool,
    pub okta_config: OktaConfigView,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOktaConfigResponse {
    pub success: bool,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_request_uses_camel_case() {
        let request: UpsertOktaConfigRequest = serde_json::from_value(serde_json::json!({
            "organizationId": "8c2f84f5-4b34-4304-9b7c-9f16a1e2a303",
            "domain": "acme.okta.com",
            "clientId": "0oa1",
            "clientSecret": "shh",
            "redirectUri": "https://sso.test/api/okta/callback",
        }))
        .expect("parse request");
        assert_eq!(request.domain, "acme.okta.com");
        assert_eq!(request.client_secret, "shh");
    }

    #[test]
    fn config_view_serializes_masked_secret() {
        let view = OktaConfigView {
            organization_id: "org-1".to_string(),
            domain: "acme.okta.com".to_string(),
            client_id: "0oa1".to_string(),
            client_secret: MASKED_SECRET.to_string(),
            redirect_uri: "https://sso.test/api/okta/callback".to_string(),
            is_active: true,
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&view).expect("serialize");
        assert_eq!(value["clientSecret"], "***");
        assert_eq!(value["isActive"], true);
    }
}
