//! Auth state, configuration, and the in-flight handshake store.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use super::types::Provider;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_HANDSHAKE_TTL_SECONDS: u64 = 10 * 60;
const PROVIDER_TIMEOUT_SECONDS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    public_base_url: String,
    session_ttl_seconds: i64,
    handshake_ttl_seconds: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            public_base_url: "http://localhost:8080".to_string(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            handshake_ttl_seconds: DEFAULT_HANDSHAKE_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_public_base_url(mut self, url: String) -> Self {
        self.public_base_url = url;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_handshake_ttl_seconds(mut self, seconds: u64) -> Self {
        self.handshake_ttl_seconds = seconds;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    /// Base URL of this service as seen by identity providers (SAML ACS URLs).
    pub(crate) fn public_base_url(&self) -> &str {
        self.public_base_url.trim_end_matches('/')
    }

    pub(crate) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn handshake_ttl(&self) -> Duration {
        Duration::from_secs(self.handshake_ttl_seconds)
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    pub(crate) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

/// Settings for the globally configured OIDC provider.
#[derive(Clone)]
pub struct OidcConfig {
    pub(crate) authorize_url: String,
    pub(crate) token_url: String,
    pub(crate) userinfo_url: String,
    pub(crate) client_id: String,
    pub(crate) client_secret: SecretString,
    pub(crate) redirect_uri: String,
}

impl OidcConfig {
    /// Assemble the provider settings, returning `None` unless the set is
    /// complete. A partial set is logged so a half-configured deployment does
    /// not silently behave as if OIDC were disabled on purpose.
    #[must_use]
    pub fn from_parts(
        authorize_url: Option<String>,
        token_url: Option<String>,
        userinfo_url: Option<String>,
        client_id: Option<String>,
        client_secret: Option<SecretString>,
        redirect_uri: Option<String>,
    ) -> Option<Self> {
        let provided = [
            authorize_url.is_some(),
            token_url.is_some(),
            userinfo_url.is_some(),
            client_id.is_some(),
            client_secret.is_some(),
            redirect_uri.is_some(),
        ];
        let count = provided.iter().filter(|set| **set).count();
        if count == 0 {
            return None;
        }
        if count < provided.len() {
            warn!("OIDC provider settings are incomplete; the generic login flow is disabled");
            return None;
        }
        Some(Self {
            authorize_url: authorize_url?,
            token_url: token_url?,
            userinfo_url: userinfo_url?,
            client_id: client_id?,
            client_secret: client_secret?,
            redirect_uri: redirect_uri?,
        })
    }
}

impl std::fmt::Debug for OidcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcConfig")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// State for one in-flight login handshake.
///
/// An entry is created when a login is initiated and consumed exactly once by
/// the matching callback; whatever the outcome, it never survives a read.
pub(crate) struct PendingHandshake {
    pub(crate) provider: Provider,
    /// CSRF `state` for the OAuth2 flows; `None` for SAML, where the entry id
    /// itself travels as the RelayState.
    pub(crate) state: Option<String>,
    pub(crate) organization_id: Option<Uuid>,
    pub(crate) request_id: Option<String>,
    created_at: Instant,
}

/// In-memory single-use store for in-flight handshakes.
///
/// Entries are keyed by a random id that travels in the handshake cookie (or,
/// for SAML, as the RelayState). `take` removes the entry under the store
/// lock, so a concurrent second callback for the same handshake observes
/// absence and fails instead of silently reusing the state.
pub(crate) struct HandshakeStore {
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, PendingHandshake>>,
}

impl HandshakeStore {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn store(
        &self,
        provider: Provider,
        state: Option<String>,
        organization_id: Option<Uuid>,
        request_id: Option<String>,
    ) -> Uuid {
        let handshake_id = Uuid::new_v4();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        entries.insert(
            handshake_id,
            PendingHandshake {
                provider,
                state,
                organization_id,
                request_id,
                created_at: Instant::now(),
            },
        );
        handshake_id
    }

    pub(crate) async fn take(&self, handshake_id: Uuid) -> Option<PendingHandshake> {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.remove(&handshake_id)
            && entry.created_at.elapsed() < self.ttl
        {
            Some(entry)
        } else {
            None
        }
    }
}

pub struct AuthState {
    config: AuthConfig,
    oidc: Option<OidcConfig>,
    handshakes: HandshakeStore,
    http: reqwest::Client,
}

impl AuthState {
    /// Build the shared auth state, including the HTTP client used for all
    /// provider calls (token exchange, userinfo) with a bounded timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: AuthConfig, oidc: Option<OidcConfig>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build provider HTTP client")?;
        let handshakes = HandshakeStore::new(config.handshake_ttl());
        Ok(Self {
            config,
            oidc,
            handshakes,
            http,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn oidc(&self) -> Option<&OidcConfig> {
        self.oidc.as_ref()
    }

    pub(crate) fn handshakes(&self) -> &HandshakeStore {
        &self.handshakes
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new("https://ingresso.dev".to_string());
        assert_eq!(config.frontend_base_url(), "https://ingresso.dev");
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert!(config.session_cookie_secure());

        let config = config
            .with_public_base_url("https://sso.ingresso.dev/".to_string())
            .with_session_ttl_seconds(3600)
            .with_handshake_ttl_seconds(60);
        assert_eq!(config.public_base_url(), "https://sso.ingresso.dev");
        assert_eq!(config.session_ttl_seconds(), 3600);
        assert_eq!(config.handshake_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn insecure_frontend_disables_secure_cookies() {
        let config = AuthConfig::new("http://localhost:5173".to_string());
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn oidc_config_requires_complete_set() {
        assert!(OidcConfig::from_parts(None, None, None, None, None, None).is_none());
        assert!(
            OidcConfig::from_parts(
                Some("https://idp.test/authorize".to_string()),
                None,
                None,
                Some("client".to_string()),
                None,
                None,
            )
            .is_none()
        );

        let config = OidcConfig::from_parts(
            Some("https://idp.test/authorize".to_string()),
            Some("https://idp.test/token".to_string()),
            Some("https://idp.test/userinfo".to_string()),
            Some("client".to_string()),
            Some(SecretString::from("secret".to_string())),
            Some("https://sso.test/api/auth/callback".to_string()),
        );
        assert!(config.is_some());
    }

    #[test]
    fn oidc_config_debug_masks_secret() {
        let config = OidcConfig::from_parts(
            Some("https://idp.test/authorize".to_string()),
            Some("https://idp.test/token".to_string()),
            Some("https://idp.test/userinfo".to_string()),
            Some("client".to_string()),
            Some(SecretString::from("super-secret".to_string())),
            Some("https://sso.test/api/auth/callback".to_string()),
        )
        .expect("complete config");
        let debug = format!("{config:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains("super-secret"));
    }

    #[tokio::test]
    async fn handshake_entries_are_single_use() {
        let store = HandshakeStore::new(Duration::from_secs(60));
        let id = store
            .store(Provider::Okta, Some("state-token".to_string()), None, None)
            .await;

        let entry = store.take(id).await.expect("first take");
        assert_eq!(entry.provider, Provider::Okta);
        assert_eq!(entry.state.as_deref(), Some("state-token"));

        // A second take (replayed or concurrent callback) observes absence.
        assert!(store.take(id).await.is_none());
    }

    #[tokio::test]
    async fn handshake_entries_expire() {
        let store = HandshakeStore::new(Duration::from_secs(0));
        let id = store
            .store(Provider::Saml, None, Some(Uuid::new_v4()), None)
            .await;
        assert!(store.take(id).await.is_none());
    }

    #[tokio::test]
    async fn unknown_handshake_id_is_absent() {
        let store = HandshakeStore::new(Duration::from_secs(60));
        assert!(store.take(Uuid::new_v4()).await.is_none());
    }
}
