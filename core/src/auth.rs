use chrono::{Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::credential::{Credential, TokenStore};
use crate::error::Error;
use crate::Result;

pub const LAUNCHPAD_AUTHORIZE_URL: &str = "https://launchpad.37signals.com/authorization/new";
pub const LAUNCHPAD_TOKEN_URL: &str = "https://launchpad.37signals.com/authorization/token";
pub const LAUNCHPAD_AUTHORIZATION_URL: &str = "https://launchpad.37signals.com/authorization.json";

/// OAuth application settings for the 37signals launchpad.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: LAUNCHPAD_TOKEN_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// Guarantees that, on a `true` return, the token store holds a non-expired
/// credential. Constructed once per process and shared; refreshes are
/// serialized behind an async mutex so concurrent tool invocations hitting an
/// expired token trigger a single round trip to the token endpoint.
pub struct AuthManager {
    store: TokenStore,
    http: reqwest::Client,
    config: OAuthConfig,
    refresh_gate: Mutex<()>,
}

impl AuthManager {
    pub fn new(store: TokenStore, config: OAuthConfig) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
            config,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Snapshot of the stored credential for building a per-invocation client.
    pub fn current(&self) -> Result<Option<Credential>> {
        self.store.read()
    }

    /// Make sure a usable credential is stored.
    ///
    /// Returns `false` when no credential exists, when an expired credential
    /// has no refresh token, or when the refresh is rejected; the stored
    /// record is left untouched in the failure cases so it stays available
    /// for diagnostics. Store I/O failures are surfaced as errors instead:
    /// credential state cannot be guessed.
    pub async fn ensure_authenticated(&self) -> Result<bool> {
        let Some(credential) = self.store.read()? else {
            return Ok(false);
        };
        if !credential.is_expired() {
            return Ok(true);
        }

        let _gate = self.refresh_gate.lock().await;
        // A sibling invocation may have refreshed while we waited on the gate.
        let Some(credential) = self.store.read()? else {
            return Ok(false);
        };
        if !credential.is_expired() {
            return Ok(true);
        }
        let Some(refresh_token) = credential.refresh_token.clone() else {
            debug!("stored credential expired and has no refresh token");
            return Ok(false);
        };

        match self.refresh(&credential, &refresh_token).await {
            Ok(renewed) => {
                self.store.write(&renewed)?;
                debug!(expires_at = %renewed.expires_at, "access token refreshed");
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed; re-authentication required");
                Ok(false)
            }
        }
    }

    async fn refresh(&self, current: &Credential, refresh_token: &str) -> Result<Credential> {
        let response = self
            .http
            .post(&self.config.token_url)
            .query(&[
                ("type", "refresh"),
                ("refresh_token", refresh_token),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), body));
        }

        let token: TokenResponse = response.json().await?;
        Ok(Credential {
            access_token: token.access_token,
            // The launchpad omits the refresh token on refresh grants; carry
            // the existing one forward.
            refresh_token: token.refresh_token.or_else(|| Some(refresh_token.to_string())),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            account_id: current.account_id.clone(),
        })
    }

    /// Exchange an authorization code from the interactive login flow and
    /// persist the resulting credential.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        account_id: &str,
    ) -> Result<Credential> {
        let response = self
            .http
            .post(&self.config.token_url)
            .query(&[
                ("type", "web_server"),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
                ("redirect_uri", redirect_uri),
                ("code", code),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), body));
        }

        let token: TokenResponse = response.json().await?;
        let credential = Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            account_id: account_id.to_string(),
        };
        self.store.write(&credential)?;
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{AuthManager, OAuthConfig};
    use crate::credential::{Credential, TokenStore};

    fn temp_store() -> TokenStore {
        let path = std::env::temp_dir()
            .join(format!("basecamp-auth-test-{}", Uuid::now_v7().simple()))
            .join("credentials.json");
        TokenStore::at_path(path)
    }

    fn manager(store: TokenStore, server: &MockServer) -> AuthManager {
        let config = OAuthConfig::new("client-id", "client-secret")
            .with_token_url(format!("{}/authorization/token", server.uri()));
        AuthManager::new(store, config)
    }

    fn stored(store: &TokenStore, expires_in_minutes: i64, refresh_token: Option<&str>) {
        store
            .write(&Credential {
                access_token: "old-token".to_string(),
                refresh_token: refresh_token.map(ToString::to_string),
                expires_at: Utc::now() + Duration::minutes(expires_in_minutes),
                account_id: "999999".to_string(),
            })
            .unwrap();
    }

    #[tokio::test]
    async fn missing_credential_reports_unauthenticated() {
        let server = MockServer::start().await;
        let auth = manager(temp_store(), &server);
        assert!(!auth.ensure_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn fresh_credential_skips_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = temp_store();
        stored(&store, 120, Some("refresh-1"));
        let auth = manager(store, &server);
        assert!(auth.ensure_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn expired_credential_is_refreshed_and_persisted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authorization/token"))
            .and(query_param("type", "refresh"))
            .and(query_param("refresh_token", "refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-token",
                "expires_in": 1209600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = temp_store();
        stored(&store, -10, Some("refresh-1"));
        let auth = manager(store.clone(), &server);

        assert!(auth.ensure_authenticated().await.unwrap());

        let renewed = store.read().unwrap().unwrap();
        assert_eq!(renewed.access_token, "new-token");
        assert!(!renewed.is_expired());
        // Refresh grant omitted a refresh token; the old one is carried over.
        assert_eq!(renewed.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(renewed.account_id, "999999");
    }

    #[tokio::test]
    async fn rejected_refresh_leaves_stored_credential_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid refresh token"))
            .expect(1)
            .mount(&server)
            .await;

        let store = temp_store();
        stored(&store, -10, Some("refresh-1"));
        let auth = manager(store.clone(), &server);

        assert!(!auth.ensure_authenticated().await.unwrap());

        let kept = store.read().unwrap().unwrap();
        assert_eq!(kept.access_token, "old-token");
        assert!(kept.is_expired());
    }

    #[tokio::test]
    async fn expired_credential_without_refresh_token_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let store = temp_store();
        stored(&store, -10, None);
        let auth = manager(store, &server);
        assert!(!auth.ensure_authenticated().await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("type", "refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-token",
                "refresh_token": "refresh-2",
                "expires_in": 1209600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = temp_store();
        stored(&store, -10, Some("refresh-1"));
        let auth = manager(store.clone(), &server);

        let (first, second) = tokio::join!(auth.ensure_authenticated(), auth.ensure_authenticated());
        assert!(first.unwrap());
        assert!(second.unwrap());

        let renewed = store.read().unwrap().unwrap();
        assert_eq!(renewed.access_token, "new-token");
        assert_eq!(renewed.refresh_token.as_deref(), Some("refresh-2"));
        assert!(!renewed.is_expired());
    }
}
