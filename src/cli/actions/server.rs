use crate::api::{self, AuthConfig, OidcConfig};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub public_base_url: String,
    pub session_ttl_seconds: i64,
    pub handshake_ttl_seconds: u64,
    pub oidc_authorize_url: Option<String>,
    pub oidc_token_url: Option<String>,
    pub oidc_userinfo_url: Option<String>,
    pub oidc_client_id: Option<String>,
    pub oidc_client_secret: Option<SecretString>,
    pub oidc_redirect_uri: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_public_base_url(args.public_base_url)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_handshake_ttl_seconds(args.handshake_ttl_seconds);

    // The OIDC provider is optional at startup; an incomplete set of settings
    // surfaces as a configuration error on the login endpoint, not at boot.
    let oidc = OidcConfig::from_parts(
        args.oidc_authorize_url,
        args.oidc_token_url,
        args.oidc_userinfo_url,
        args.oidc_client_id,
        args.oidc_client_secret,
        args.oidc_redirect_uri,
    );

    api::new(args.port, args.dsn, auth_config, oidc).await
}
