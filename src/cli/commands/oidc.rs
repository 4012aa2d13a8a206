use anyhow::Result;
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_OIDC_AUTHORIZE_URL: &str = "oidc-authorize-url";
pub const ARG_OIDC_TOKEN_URL: &str = "oidc-token-url";
pub const ARG_OIDC_USERINFO_URL: &str = "oidc-userinfo-url";
pub const ARG_OIDC_CLIENT_ID: &str = "oidc-client-id";
pub const ARG_OIDC_CLIENT_SECRET: &str = "oidc-client-secret";
pub const ARG_OIDC_REDIRECT_URI: &str = "oidc-redirect-uri";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_OIDC_AUTHORIZE_URL)
                .long(ARG_OIDC_AUTHORIZE_URL)
                .help("OIDC provider authorization endpoint")
                .env("INGRESSO_OIDC_AUTHORIZE_URL"),
        )
        .arg(
            Arg::new(ARG_OIDC_TOKEN_URL)
                .long(ARG_OIDC_TOKEN_URL)
                .help("OIDC provider token endpoint")
                .env("INGRESSO_OIDC_TOKEN_URL"),
        )
        .arg(
            Arg::new(ARG_OIDC_USERINFO_URL)
                .long(ARG_OIDC_USERINFO_URL)
                .help("OIDC provider userinfo endpoint")
                .env("INGRESSO_OIDC_USERINFO_URL"),
        )
        .arg(
            Arg::new(ARG_OIDC_CLIENT_ID)
                .long(ARG_OIDC_CLIENT_ID)
                .help("OIDC client id")
                .env("INGRESSO_OIDC_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_OIDC_CLIENT_SECRET)
                .long(ARG_OIDC_CLIENT_SECRET)
                .help("OIDC client secret")
                .env("INGRESSO_OIDC_CLIENT_SECRET"),
        )
        .arg(
            Arg::new(ARG_OIDC_REDIRECT_URI)
                .long(ARG_OIDC_REDIRECT_URI)
                .help("Redirect URI registered with the OIDC provider")
                .env("INGRESSO_OIDC_REDIRECT_URI"),
        )
}

/// OIDC provider settings. All fields are optional at startup; the login
/// endpoint reports a configuration error when the set is incomplete.
#[derive(Debug, Clone)]
pub struct Options {
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub userinfo_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: Option<String>,
}

impl Options {
    /// Extract OIDC provider options from validated CLI matches.
    ///
    /// # Errors
    /// Returns an error if argument extraction fails.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            authorize_url: matches.get_one::<String>(ARG_OIDC_AUTHORIZE_URL).cloned(),
            token_url: matches.get_one::<String>(ARG_OIDC_TOKEN_URL).cloned(),
            userinfo_url: matches.get_one::<String>(ARG_OIDC_USERINFO_URL).cloned(),
            client_id: matches.get_one::<String>(ARG_OIDC_CLIENT_ID).cloned(),
            client_secret: matches
                .get_one::<String>(ARG_OIDC_CLIENT_SECRET)
                .map(|secret| SecretString::from(secret.clone())),
            redirect_uri: matches.get_one::<String>(ARG_OIDC_REDIRECT_URI).cloned(),
        })
    }
}
