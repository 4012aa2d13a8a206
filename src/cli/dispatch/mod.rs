//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, oidc};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let oidc_opts = oidc::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        public_base_url: auth_opts.public_base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        handshake_ttl_seconds: auth_opts.handshake_ttl_seconds,
        oidc_authorize_url: oidc_opts.authorize_url,
        oidc_token_url: oidc_opts.token_url,
        oidc_userinfo_url: oidc_opts.userinfo_url,
        oidc_client_id: oidc_opts.client_id,
        oidc_client_secret: oidc_opts.client_secret,
        oidc_redirect_uri: oidc_opts.redirect_uri,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::actions::Action;

    #[test]
    fn server_args_from_cli() -> Result<()> {
        temp_env::with_vars([("INGRESSO_DSN", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec![
                "ingresso",
                "--dsn",
                "postgres://user@localhost:5432/ingresso",
                "--port",
                "9090",
                "--frontend-base-url",
                "https://app.ingresso.dev",
                "--oidc-client-id",
                "client-id",
            ]);
            let Action::Server(args) = handler(&matches)?;
            assert_eq!(args.port, 9090);
            assert_eq!(args.dsn, "postgres://user@localhost:5432/ingresso");
            assert_eq!(args.frontend_base_url, "https://app.ingresso.dev");
            assert_eq!(args.session_ttl_seconds, 86_400);
            assert_eq!(args.handshake_ttl_seconds, 600);
            assert_eq!(args.oidc_client_id.as_deref(), Some("client-id"));
            assert_eq!(args.oidc_token_url, None);
            Ok(())
        })
    }

    #[test]
    fn dsn_required() {
        temp_env::with_vars([("INGRESSO_DSN", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let result = command.try_get_matches_from(vec!["ingresso"]);
            assert_eq!(
                result.map(|_| ()).map_err(|e| e.kind()),
                Err(clap::error::ErrorKind::MissingRequiredArgument)
            );
        });
    }
}
