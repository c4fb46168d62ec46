//! Auth coordinator: orchestrates the end-to-end connection lifecycle.
//!
//! A handshake for one (principal, service) pair moves through
//! initiate (request token obtained, session cached, user redirected),
//! callback (session validated, verifier exchanged, identity fetched
//! best-effort, credentials persisted, session consumed), and from then
//! on answers status queries and revocation. Any step can fail into a
//! terminal error from the taxonomy in [`crate::error`]; failures before
//! persistence leave no state behind except, on exchange failure, the
//! still-valid session so the callback can be retried within its TTL.
//!
//! The coordinator owns no transport: the routing layer calls it, and the
//! host consumes the events it emits after persistence.

use crate::credentials::{fields, CredentialPayload, CredentialStore};
use crate::error::AuthError;
use crate::host::{IntegrationHost, SettingsHost};
use crate::provider::OAuthProvider;
use crate::service::ServiceName;
use crate::session::{generate_csrf_state, HandshakeSession, SessionCache};
use crate::status::{self, ConnectionStatus};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Signal emitted after the point of no return, decoupling "credentials
/// were saved" from "the dependent integration was reconfigured".
#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    CredentialsPersisted {
        principal: Uuid,
        service: ServiceName,
        /// Mapped setting keys and their new values.
        settings: HashMap<String, String>,
    },
    CredentialsRevoked {
        principal: Uuid,
        service: ServiceName,
    },
}

/// Result of a successful Initiate.
#[derive(Clone, Debug)]
pub struct InitiateOutcome {
    pub authorization_url: String,
}

/// Result of a successful Callback.
#[derive(Clone, Debug)]
pub struct CallbackOutcome {
    pub principal: Uuid,
    pub service: ServiceName,
    /// Where the caller asked to be sent after completion.
    pub return_url: Option<String>,
}

pub struct AuthCoordinator {
    store: Arc<CredentialStore>,
    sessions: SessionCache,
    providers: HashMap<ServiceName, Arc<dyn OAuthProvider>>,
    settings: Arc<dyn SettingsHost>,
    integrations: Arc<dyn IntegrationHost>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    callback_base_url: String,
}

impl AuthCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        sessions: SessionCache,
        settings: Arc<dyn SettingsHost>,
        integrations: Arc<dyn IntegrationHost>,
        events: mpsc::UnboundedSender<ConnectionEvent>,
        callback_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            providers: HashMap::new(),
            settings,
            integrations,
            events,
            callback_base_url: callback_base_url.into(),
        }
    }

    /// Registers the OAuth provider for a service. Services without a
    /// registered provider fail Initiate with a configuration error.
    pub fn register_provider(&mut self, provider: Arc<dyn OAuthProvider>) {
        self.providers.insert(provider.service(), provider);
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    fn provider(&self, service: ServiceName) -> Result<&Arc<dyn OAuthProvider>, AuthError> {
        self.providers.get(&service).ok_or_else(|| {
            AuthError::Configuration(format!(
                "no oauth provider configured for service '{service}'"
            ))
        })
    }

    fn callback_url(&self, service: ServiceName) -> String {
        format!(
            "{}/api/connections/{}/callback",
            self.callback_base_url, service
        )
    }

    /// Starts a handshake: obtains a request token from the provider,
    /// caches the handshake session under it, and returns the
    /// authorization URL.
    ///
    /// No session is stored if the provider call fails, so a failed
    /// initiate leaves no partial state. Repeated calls each create an
    /// independent session: sessions are keyed by provider token, not by
    /// principal, so concurrent handshakes never clobber each other.
    pub async fn initiate(
        &self,
        principal: Uuid,
        service: ServiceName,
        return_url: Option<String>,
    ) -> Result<InitiateOutcome, AuthError> {
        let provider = self.provider(service)?;
        let callback_url = self.callback_url(service);

        debug!(principal = %principal, service = %service, "initiating oauth handshake");

        let request_token = provider
            .request_token(&callback_url)
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        let session = HandshakeSession {
            principal,
            service,
            token_secret: request_token.secret,
            csrf_state: generate_csrf_state(),
            return_url,
            created_at: Utc::now(),
        };
        self.sessions.put(&request_token.token, session);

        info!(
            principal = %principal,
            service = %service,
            "handshake session created, redirecting to provider"
        );

        Ok(InitiateOutcome {
            authorization_url: request_token.authorization_url,
        })
    }

    /// Completes a handshake from the provider's redirect.
    ///
    /// A cache miss on the token (expired, replayed, or forged — the
    /// caller cannot tell which) rejects the request with no side
    /// effects. Exchange failure keeps the session for a retry within
    /// its remaining TTL. Once credentials are persisted the session is
    /// deleted unconditionally: persistence success is the point of no
    /// return, and downstream settings injection happens through the
    /// event channel afterwards.
    pub async fn callback(
        &self,
        oauth_token: &str,
        oauth_verifier: &str,
    ) -> Result<CallbackOutcome, AuthError> {
        let session = self
            .sessions
            .get(oauth_token)
            .ok_or(AuthError::InvalidOrExpiredSession)?;

        let provider = self.provider(session.service)?;

        let access = provider
            .exchange(oauth_token, &session.token_secret, oauth_verifier)
            .await
            .map_err(|e| {
                warn!(service = %session.service, error = %e, "token exchange failed, session retained for retry");
                AuthError::TokenExchangeFailed(e.to_string())
            })?;

        // Best effort: a failed identity fetch degrades the stored record
        // (no display identity) without aborting the handshake.
        let identity = match provider.fetch_identity(&access).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(service = %session.service, error = %e, "identity fetch failed, storing credentials without display identity");
                None
            }
        };

        let app = provider.app_credentials();
        let mut payload: CredentialPayload = HashMap::new();
        payload.insert(fields::API_KEY.into(), app.consumer_key.clone());
        payload.insert(fields::API_SECRET_KEY.into(), app.consumer_secret.clone());
        payload.insert(fields::ACCESS_TOKEN.into(), access.token.clone());
        payload.insert(fields::ACCESS_TOKEN_SECRET.into(), access.secret.clone());
        if let Some(identity) = &identity {
            payload.insert(fields::USER_ID.into(), identity.id.clone());
            payload.insert(fields::USERNAME.into(), identity.handle.clone());
        }

        self.store
            .put(session.principal, session.service, &payload, None)?;

        // Point of no return: the session dies here even if downstream
        // signaling fails, so replaying this callback is rejected.
        self.sessions.delete(oauth_token);

        let settings = status::setting_mappings(session.service)
            .iter()
            .filter_map(|(setting_key, field)| {
                payload
                    .get(*field)
                    .map(|value| (setting_key.to_string(), value.clone()))
            })
            .collect();

        if let Err(e) = self.events.send(ConnectionEvent::CredentialsPersisted {
            principal: session.principal,
            service: session.service,
            settings,
        }) {
            warn!(error = %e, "failed to signal settings injection, credentials remain persisted");
        }

        info!(
            principal = %session.principal,
            service = %session.service,
            has_identity = identity.is_some(),
            "oauth handshake completed, credentials persisted"
        );

        Ok(CallbackOutcome {
            principal: session.principal,
            service: session.service,
            return_url: session.return_url,
        })
    }

    /// Revokes a connection: deletes stored credentials, then clears the
    /// mapped active settings and stops the running integration. The
    /// latter two are delegated to the host and only logged on failure —
    /// store deletion alone decides the operation's success.
    pub fn revoke(&self, principal: Uuid, service: ServiceName) -> Result<(), AuthError> {
        let removed = self.store.delete(principal, service)?;

        let changes = status::setting_mappings(service)
            .iter()
            .map(|(setting_key, _)| (setting_key.to_string(), None))
            .collect::<HashMap<_, _>>();
        self.settings.update_settings(service, changes);

        if let Err(e) = self.integrations.stop(service) {
            warn!(service = %service, error = %e, "failed to stop running integration after revoke");
        }

        if let Err(e) = self
            .events
            .send(ConnectionEvent::CredentialsRevoked { principal, service })
        {
            warn!(error = %e, "failed to signal revocation");
        }

        info!(
            principal = %principal,
            service = %service,
            removed,
            "connection revoked"
        );
        Ok(())
    }

    /// Resolves the connection status for one pair from the stored
    /// credential and the host's active settings. Decryption failures
    /// surface as `CredentialCorrupt`, never as "not connected".
    pub fn status(
        &self,
        principal: Uuid,
        service: ServiceName,
    ) -> Result<ConnectionStatus, AuthError> {
        let stored = self.store.get(principal, service)?;
        let active = self.settings.active_settings(service);
        Ok(status::resolve(service, stored.as_ref(), &active))
    }

    /// Status for every supported service (the connections listing).
    pub fn list_statuses(&self, principal: Uuid) -> Result<Vec<ConnectionStatus>, AuthError> {
        ServiceName::supported()
            .iter()
            .map(|service| self.status(principal, *service))
            .collect()
    }

    /// Verifies stored credentials against the provider by fetching the
    /// account identity. `Ok(None)` means nothing is stored.
    pub async fn test_connection(
        &self,
        principal: Uuid,
        service: ServiceName,
    ) -> Result<Option<crate::provider::ProviderIdentity>, AuthError> {
        let Some(payload) = self.store.get(principal, service)? else {
            return Ok(None);
        };

        let access = crate::provider::AccessCredentials {
            token: payload.get(fields::ACCESS_TOKEN).cloned().ok_or_else(|| {
                AuthError::CredentialCorrupt("stored payload missing access token".into())
            })?,
            secret: payload
                .get(fields::ACCESS_TOKEN_SECRET)
                .cloned()
                .ok_or_else(|| {
                    AuthError::CredentialCorrupt(
                        "stored payload missing access token secret".into(),
                    )
                })?,
        };

        let identity = self
            .provider(service)?
            .fetch_identity(&access)
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        Ok(Some(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AccessCredentials, AppCredentials, ProviderIdentity, RequestToken};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Scripted provider: hands out sequential request tokens and a
    /// fixed user, with failure switches per call.
    struct ScriptedProvider {
        app: AppCredentials,
        counter: AtomicUsize,
        fail_request_token: AtomicBool,
        fail_exchange: AtomicBool,
        fail_identity: AtomicBool,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                app: AppCredentials {
                    consumer_key: "consumer-key".into(),
                    consumer_secret: "consumer-secret".into(),
                },
                counter: AtomicUsize::new(0),
                fail_request_token: AtomicBool::new(false),
                fail_exchange: AtomicBool::new(false),
                fail_identity: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl OAuthProvider for ScriptedProvider {
        fn service(&self) -> ServiceName {
            ServiceName::Twitter
        }

        fn app_credentials(&self) -> &AppCredentials {
            &self.app
        }

        async fn request_token(&self, callback_url: &str) -> anyhow::Result<RequestToken> {
            if self.fail_request_token.load(Ordering::SeqCst) {
                return Err(anyhow!("connect timeout"));
            }
            assert!(callback_url.contains("/api/connections/twitter/callback"));
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(RequestToken {
                token: format!("req-token-{n}"),
                secret: format!("req-secret-{n}"),
                authorization_url: format!("https://provider.example/authorize?oauth_token=req-token-{n}"),
            })
        }

        async fn exchange(
            &self,
            token: &str,
            token_secret: &str,
            verifier: &str,
        ) -> anyhow::Result<AccessCredentials> {
            if self.fail_exchange.load(Ordering::SeqCst) {
                return Err(anyhow!("provider rejected verifier"));
            }
            assert!(token.starts_with("req-token-"));
            assert!(token_secret.starts_with("req-secret-"));
            assert_eq!(verifier, "verifier-ok");
            Ok(AccessCredentials {
                token: "durable-token".into(),
                secret: "durable-secret".into(),
            })
        }

        async fn fetch_identity(
            &self,
            _credentials: &AccessCredentials,
        ) -> anyhow::Result<ProviderIdentity> {
            if self.fail_identity.load(Ordering::SeqCst) {
                return Err(anyhow!("identity endpoint 503"));
            }
            Ok(ProviderIdentity {
                id: "42".into(),
                handle: "alice".into(),
            })
        }
    }

    struct Fixture {
        coordinator: AuthCoordinator,
        store: Arc<CredentialStore>,
        host: Arc<crate::host::InProcessHost>,
        provider: Arc<ScriptedProvider>,
        events: mpsc::UnboundedReceiver<ConnectionEvent>,
    }

    fn fixture() -> Fixture {
        let key = BASE64.encode([0u8; 32]);
        let store = Arc::new(CredentialStore::new(":memory:", &key).unwrap());
        let host = Arc::new(crate::host::InProcessHost::new());
        let provider = Arc::new(ScriptedProvider::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let mut coordinator = AuthCoordinator::new(
            store.clone(),
            SessionCache::new(crate::session::DEFAULT_TTL_SECONDS, 100),
            host.clone(),
            host.clone(),
            tx,
            "https://broker.example",
        );
        coordinator.register_provider(provider.clone());

        Fixture {
            coordinator,
            store,
            host,
            provider,
            events: rx,
        }
    }

    async fn connect(fx: &Fixture, principal: Uuid) -> CallbackOutcome {
        fx.coordinator
            .initiate(principal, ServiceName::Twitter, None)
            .await
            .unwrap();
        let n = fx.provider.counter.load(Ordering::SeqCst) - 1;
        fx.coordinator
            .callback(&format!("req-token-{n}"), "verifier-ok")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_never_connected_is_disconnected() {
        let fx = fixture();
        let status = fx
            .coordinator
            .status(Uuid::new_v4(), ServiceName::Twitter)
            .unwrap();
        assert!(!status.is_connected);
        assert!(!status.is_pending);
    }

    #[tokio::test]
    async fn test_full_handshake_persists_exactly_one_record() {
        let mut fx = fixture();
        let principal = Uuid::new_v4();

        let outcome = fx
            .coordinator
            .initiate(principal, ServiceName::Twitter, Some("https://host.example/chat".into()))
            .await
            .unwrap();
        assert!(outcome.authorization_url.contains("oauth_token=req-token-0"));

        let cb = fx
            .coordinator
            .callback("req-token-0", "verifier-ok")
            .await
            .unwrap();
        assert_eq!(cb.principal, principal);
        assert_eq!(cb.service, ServiceName::Twitter);
        assert_eq!(cb.return_url.as_deref(), Some("https://host.example/chat"));

        assert_eq!(fx.store.count(principal, ServiceName::Twitter).unwrap(), 1);
        let payload = fx.store.get(principal, ServiceName::Twitter).unwrap().unwrap();
        assert_eq!(payload.get(fields::ACCESS_TOKEN).unwrap(), "durable-token");
        assert_eq!(payload.get(fields::API_KEY).unwrap(), "consumer-key");
        assert_eq!(payload.get(fields::USERNAME).unwrap(), "alice");

        // Persisted event carries the mapped settings
        let event = fx.events.recv().await.unwrap();
        match event {
            ConnectionEvent::CredentialsPersisted { settings, .. } => {
                assert_eq!(settings.get("TWITTER_ACCESS_TOKEN").unwrap(), "durable-token");
                assert_eq!(
                    settings.get("TWITTER_ACCESS_TOKEN_SECRET").unwrap(),
                    "durable-secret"
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_after_handshake_connected_not_pending() {
        let fx = fixture();
        let principal = Uuid::new_v4();
        connect(&fx, principal).await;

        // Host has no opinion yet: connected, not pending
        let status = fx.coordinator.status(principal, ServiceName::Twitter).unwrap();
        assert!(status.is_connected);
        assert!(!status.is_pending);
        assert_eq!(status.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_replayed_callback_rejected_without_store_mutation() {
        let fx = fixture();
        let principal = Uuid::new_v4();
        connect(&fx, principal).await;

        let before = fx.store.get(principal, ServiceName::Twitter).unwrap();
        let err = fx
            .coordinator
            .callback("req-token-0", "verifier-ok")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_or_expired_session");

        let after = fx.store.get(principal, ServiceName::Twitter).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_forged_callback_rejected() {
        let fx = fixture();
        let err = fx
            .coordinator
            .callback("never-issued-token", "verifier-ok")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_or_expired_session");
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let key = BASE64.encode([0u8; 32]);
        let store = Arc::new(CredentialStore::new(":memory:", &key).unwrap());
        let host = Arc::new(crate::host::InProcessHost::new());
        let (tx, _rx) = mpsc::unbounded_channel();

        // Zero TTL: sessions expire immediately
        let mut coordinator = AuthCoordinator::new(
            store,
            SessionCache::new(0, 100),
            host.clone(),
            host,
            tx,
            "https://broker.example",
        );
        coordinator.register_provider(Arc::new(ScriptedProvider::new()));

        coordinator
            .initiate(Uuid::new_v4(), ServiceName::Twitter, None)
            .await
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));

        let err = coordinator
            .callback("req-token-0", "verifier-ok")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_or_expired_session");
    }

    #[tokio::test]
    async fn test_failed_initiate_stores_no_session() {
        let fx = fixture();
        fx.provider.fail_request_token.store(true, Ordering::SeqCst);

        let err = fx
            .coordinator
            .initiate(Uuid::new_v4(), ServiceName::Twitter, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "provider_unavailable");
        assert_eq!(fx.coordinator.sessions().count(), 0);
    }

    #[tokio::test]
    async fn test_unregistered_service_is_configuration_error() {
        let fx = fixture();
        let err = fx
            .coordinator
            .initiate(Uuid::new_v4(), ServiceName::Discord, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert_eq!(fx.coordinator.sessions().count(), 0);
    }

    #[tokio::test]
    async fn test_exchange_failure_keeps_session_for_retry() {
        let fx = fixture();
        let principal = Uuid::new_v4();
        fx.coordinator
            .initiate(principal, ServiceName::Twitter, None)
            .await
            .unwrap();

        fx.provider.fail_exchange.store(true, Ordering::SeqCst);
        let err = fx
            .coordinator
            .callback("req-token-0", "verifier-ok")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "token_exchange_failed");

        // Same callback retried within the TTL now succeeds
        fx.provider.fail_exchange.store(false, Ordering::SeqCst);
        fx.coordinator
            .callback("req-token-0", "verifier-ok")
            .await
            .unwrap();
        assert!(fx.store.exists(principal, ServiceName::Twitter).unwrap());
    }

    #[tokio::test]
    async fn test_identity_failure_still_persists_core_tokens() {
        let fx = fixture();
        let principal = Uuid::new_v4();
        fx.provider.fail_identity.store(true, Ordering::SeqCst);

        fx.coordinator
            .initiate(principal, ServiceName::Twitter, None)
            .await
            .unwrap();
        fx.coordinator
            .callback("req-token-0", "verifier-ok")
            .await
            .unwrap();

        let payload = fx.store.get(principal, ServiceName::Twitter).unwrap().unwrap();
        assert_eq!(payload.get(fields::ACCESS_TOKEN).unwrap(), "durable-token");
        assert!(!payload.contains_key(fields::USERNAME));

        // Status still reports connected, just without display identity
        let status = fx.coordinator.status(principal, ServiceName::Twitter).unwrap();
        assert!(status.is_connected);
        assert!(status.username.is_none());
    }

    #[tokio::test]
    async fn test_pending_tracks_settings_drift() {
        let fx = fixture();
        let principal = Uuid::new_v4();
        connect(&fx, principal).await;

        // Host reports a stale token: connected and pending
        fx.host.update_settings(
            ServiceName::Twitter,
            [("TWITTER_ACCESS_TOKEN".to_string(), Some("stale".to_string()))]
                .into_iter()
                .collect(),
        );
        let status = fx.coordinator.status(principal, ServiceName::Twitter).unwrap();
        assert!(status.is_connected);
        assert!(status.is_pending);

        // Settings catch up: pending clears without touching the store
        fx.host.update_settings(
            ServiceName::Twitter,
            [("TWITTER_ACCESS_TOKEN".to_string(), Some("durable-token".to_string()))]
                .into_iter()
                .collect(),
        );
        let status = fx.coordinator.status(principal, ServiceName::Twitter).unwrap();
        assert!(status.is_connected);
        assert!(!status.is_pending);
    }

    #[tokio::test]
    async fn test_revoke_disconnects_even_if_stop_fails() {
        struct FailingStop;
        impl IntegrationHost for FailingStop {
            fn stop(&self, _service: ServiceName) -> anyhow::Result<()> {
                Err(anyhow!("integration refused to stop"))
            }
        }

        let key = BASE64.encode([0u8; 32]);
        let store = Arc::new(CredentialStore::new(":memory:", &key).unwrap());
        let host = Arc::new(crate::host::InProcessHost::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut coordinator = AuthCoordinator::new(
            store.clone(),
            SessionCache::new(crate::session::DEFAULT_TTL_SECONDS, 100),
            host,
            Arc::new(FailingStop),
            tx,
            "https://broker.example",
        );
        let provider = Arc::new(ScriptedProvider::new());
        coordinator.register_provider(provider);

        let principal = Uuid::new_v4();
        coordinator
            .initiate(principal, ServiceName::Twitter, None)
            .await
            .unwrap();
        coordinator.callback("req-token-0", "verifier-ok").await.unwrap();

        coordinator.revoke(principal, ServiceName::Twitter).unwrap();

        let status = coordinator.status(principal, ServiceName::Twitter).unwrap();
        assert!(!status.is_connected);
        assert!(!status.is_pending);
    }

    #[tokio::test]
    async fn test_revoke_clears_active_settings() {
        let fx = fixture();
        let principal = Uuid::new_v4();
        connect(&fx, principal).await;

        fx.host.update_settings(
            ServiceName::Twitter,
            [("TWITTER_ACCESS_TOKEN".to_string(), Some("durable-token".to_string()))]
                .into_iter()
                .collect(),
        );

        fx.coordinator.revoke(principal, ServiceName::Twitter).unwrap();
        assert!(fx.host.active_settings(ServiceName::Twitter).is_empty());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let fx = fixture();
        let principal = Uuid::new_v4();
        fx.coordinator.revoke(principal, ServiceName::Twitter).unwrap();
        fx.coordinator.revoke(principal, ServiceName::Twitter).unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_initiates_yield_independent_sessions() {
        let fx = fixture();
        let principal = Uuid::new_v4();

        let a = fx
            .coordinator
            .initiate(principal, ServiceName::Twitter, None)
            .await
            .unwrap();
        let b = fx
            .coordinator
            .initiate(principal, ServiceName::Twitter, None)
            .await
            .unwrap();
        assert_ne!(a.authorization_url, b.authorization_url);
        assert_eq!(fx.coordinator.sessions().count(), 2);

        // Completing the second handshake works independently
        fx.coordinator
            .callback("req-token-1", "verifier-ok")
            .await
            .unwrap();
        assert!(fx.store.exists(principal, ServiceName::Twitter).unwrap());
        // The first session is still present, untouched
        assert_eq!(fx.coordinator.sessions().count(), 1);
    }

    #[tokio::test]
    async fn test_list_statuses_covers_supported_services() {
        let fx = fixture();
        let principal = Uuid::new_v4();

        let statuses = fx.coordinator.list_statuses(principal).unwrap();
        assert_eq!(statuses.len(), ServiceName::supported().len());
        assert!(statuses.iter().all(|s| !s.is_connected));
    }

    #[tokio::test]
    async fn test_connection_test_reports_identity_or_absence() {
        let fx = fixture();
        let principal = Uuid::new_v4();

        assert!(fx
            .coordinator
            .test_connection(principal, ServiceName::Twitter)
            .await
            .unwrap()
            .is_none());

        connect(&fx, principal).await;
        let identity = fx
            .coordinator
            .test_connection(principal, ServiceName::Twitter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.handle, "alice");
    }
}
