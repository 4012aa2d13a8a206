//! Lazy, per-request construction of the SAML service provider.

use anyhow::{Context, Result, anyhow};
use samael::{metadata::EntityDescriptor, schema::Assertion, service_provider::ServiceProvider};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::super::auth::AuthError;

pub(super) const NOT_ENABLED: &str = "SAML is not enabled for this organization.";

/// SAML fields of an organization row, possibly incomplete.
pub(super) struct OrgSamlRow {
    pub(super) organization_id: Uuid,
    pub(super) enabled: bool,
    pub(super) entry_point: Option<String>,
    pub(super) issuer: Option<String>,
    pub(super) cert: Option<String>,
}

/// A complete, enabled SAML configuration.
pub(super) struct OrgSamlSettings {
    pub(super) organization_id: Uuid,
    pub(super) entry_point: String,
    pub(super) issuer: String,
    pub(super) cert: String,
}

pub(super) async fn fetch_org_saml(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Option<OrgSamlRow>> {
    let query = r"
        SELECT id, saml_enabled, saml_entry_point, saml_issuer, saml_cert
        FROM organizations
        WHERE id = $1
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(organization_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup organization SAML settings")?;

    Ok(row.map(|row| OrgSamlRow {
        organization_id: row.get("id"),
        enabled: row.get("saml_enabled"),
        entry_point: row.get("saml_entry_point"),
        issuer: row.get("saml_issuer"),
        cert: row.get("saml_cert"),
    }))
}

impl OrgSamlRow {
    /// Require an enabled configuration with every field present.
    pub(super) fn into_settings(self) -> Result<OrgSamlSettings, AuthError> {
        if !self.enabled {
            return Err(AuthError::NotConfigured(NOT_ENABLED));
        }
        match (self.entry_point, self.issuer, self.cert) {
            (Some(entry_point), Some(issuer), Some(cert)) => Ok(OrgSamlSettings {
                organization_id: self.organization_id,
                entry_point,
                issuer,
                cert,
            }),
            _ => Err(AuthError::NotConfigured(NOT_ENABLED)),
        }
    }
}

impl OrgSamlSettings {
    /// Assertion consumer URL the IdP posts the response back to.
    pub(super) fn acs_url(&self, public_base_url: &str) -> String {
        format!(
            "{public_base_url}/api/saml/callback/{}",
            self.organization_id
        )
    }

    /// Build a `samael` service provider for this organization.
    ///
    /// The IdP descriptor is assembled from the stored certificate and entry
    /// point; signature verification and response parsing are delegated to
    /// the library.
    pub(super) fn service_provider(&self, public_base_url: &str) -> Result<ServiceProvider> {
        let idp_metadata = self.idp_metadata()?;
        samael::service_provider::ServiceProviderBuilder::default()
            .entity_id(self.issuer.clone())
            .acs_url(self.acs_url(public_base_url))
            .idp_metadata(idp_metadata)
            .build()
            .map_err(|err| anyhow!("failed to build SAML service provider: {err}"))
    }

    fn idp_metadata(&self) -> Result<EntityDescriptor> {
        let xml = format!(
            r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="{}">
    <md:IDPSSODescriptor protocolSupportEnumeration="urn:oasis:names:tc:SAML:2.0:protocol">
        <md:KeyDescriptor use="signing">
            <ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
                <ds:X509Data>
                    <ds:X509Certificate>{}</ds:X509Certificate>
                </ds:X509Data>
            </ds:KeyInfo>
        </md:KeyDescriptor>
        <md:SingleSignOnService Binding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" Location="{}"/>
    </md:IDPSSODescriptor>
</md:EntityDescriptor>"#,
            self.issuer,
            strip_pem_headers(&self.cert),
            self.entry_point,
        );

        samael::metadata::de::from_str(&xml)
            .map_err(|err| anyhow!("failed to build IdP metadata: {err}"))
    }
}

/// Certificates are stored as PEM; the metadata wants the bare base64 body.
fn strip_pem_headers(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----BEGIN") && !line.starts_with("-----END"))
        .collect::<Vec<_>>()
        .join("")
}

/// Pull the asserted email out of an assertion: the `email` attribute wins,
/// the NameID is the fallback.
pub(super) fn assertion_email(assertion: &Assertion) -> Option<String> {
    extract_attribute(assertion, "email")
        .or_else(|| extract_attribute(assertion, "mail"))
        .or_else(|| assertion_name_id(assertion))
}

pub(super) fn assertion_name_id(assertion: &Assertion) -> Option<String> {
    assertion
        .subject
        .as_ref()
        .and_then(|subject| subject.name_id.as_ref())
        .map(|name_id| name_id.value.clone())
}

/// Display name from common attribute names.
pub(super) fn assertion_display_name(assertion: &Assertion) -> Option<String> {
    extract_attribute(assertion, "displayName").or_else(|| extract_attribute(assertion, "givenName"))
}

fn extract_attribute(assertion: &Assertion, attr_name: &str) -> Option<String> {
    let statements = assertion.attribute_statements.as_ref()?;
    for statement in statements {
        for attribute in &statement.attributes {
            if attribute.name.as_deref() == Some(attr_name)
                || attribute.friendly_name.as_deref() == Some(attr_name)
            {
                return attribute
                    .values
                    .first()
                    .and_then(|value| value.value.clone());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(enabled: bool, complete: bool) -> OrgSamlRow {
        OrgSamlRow {
            organization_id: Uuid::nil(),
            enabled,
            entry_point: complete.then(|| "https://idp.test/sso".to_string()),
            issuer: complete.then(|| "https://sso.test".to_string()),
            cert: complete.then(|| "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----".to_string()),
        }
    }

    #[test]
    fn disabled_org_is_not_configured() {
        assert!(row(false, true).into_settings().is_err());
    }

    #[test]
    fn incomplete_fields_are_not_configured() {
        assert!(row(true, false).into_settings().is_err());
    }

    #[test]
    fn complete_settings_build_acs_url() {
        let settings = row(true, true).into_settings().expect("settings");
        assert_eq!(
            settings.acs_url("https://sso.test"),
            format!("https://sso.test/api/saml/callback/{}", Uuid::nil())
        );
    }

    #[test]
    fn strip_pem_headers_keeps_body() {
        let pem = "-----BEGIN CERTIFICATE-----\nAAAA\nBBBB\n-----END CERTIFICATE-----";
        assert_eq!(strip_pem_headers(pem), "AAAABBBB");
    }

    #[test]
    fn idp_metadata_parses_from_settings() {
        let settings = row(true, true).into_settings().expect("settings");
        let metadata = settings.idp_metadata().expect("metadata");
        assert_eq!(metadata.entity_id.as_deref(), Some("https://sso.test"));
    }
}
