use anyhow::Result;
use clap::{Arg, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_HANDSHAKE_TTL_SECONDS: &str = "handshake-ttl-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL users are redirected to after login")
                .env("INGRESSO_FRONTEND_BASE_URL")
                .default_value("https://ingresso.dev"),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("Public base URL of this service, used for SAML assertion consumer URLs")
                .env("INGRESSO_PUBLIC_BASE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("INGRESSO_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_HANDSHAKE_TTL_SECONDS)
                .long(ARG_HANDSHAKE_TTL_SECONDS)
                .help("TTL for in-flight login handshake state in seconds")
                .env("INGRESSO_HANDSHAKE_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(u64)),
        )
}

/// Parsed auth/session arguments.
#[derive(Debug, Clone)]
pub struct Options {
    pub frontend_base_url: String,
    pub public_base_url: String,
    pub session_ttl_seconds: i64,
    pub handshake_ttl_seconds: u64,
}

impl Options {
    /// Extract auth options from validated CLI matches.
    ///
    /// # Errors
    /// Returns an error if a defaulted argument is unexpectedly missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "https://ingresso.dev".to_string());
        let public_base_url = matches
            .get_one::<String>(ARG_PUBLIC_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:8080".to_string());
        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(86_400);
        let handshake_ttl_seconds = matches
            .get_one::<u64>(ARG_HANDSHAKE_TTL_SECONDS)
            .copied()
            .unwrap_or(600);

        Ok(Self {
            frontend_base_url,
            public_base_url,
            session_ttl_seconds,
            handshake_ttl_seconds,
        })
    }
}
