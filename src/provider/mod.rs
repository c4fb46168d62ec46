//! OAuth provider collaborators.
//!
//! The coordinator talks to external OAuth-capable services through the
//! [`OAuthProvider`] trait: obtain a request token and authorization URL,
//! exchange a verifier for durable access credentials, and fetch a
//! minimal identity. Implementations return `anyhow::Result`; the
//! coordinator translates failures into its own error taxonomy so raw
//! provider errors never cross the boundary.

mod signing;
mod twitter;

pub use twitter::TwitterProvider;

use anyhow::Result;
use async_trait::async_trait;

use crate::service::ServiceName;

/// Provider application credentials (the registered app, not a user).
#[derive(Clone, Debug)]
pub struct AppCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

/// Temporary credentials opening a handshake.
#[derive(Clone, Debug)]
pub struct RequestToken {
    /// Provider-issued request token; keys the handshake session.
    pub token: String,
    /// Matching secret, needed later for the exchange step.
    pub secret: String,
    /// Where to send the user to authorize.
    pub authorization_url: String,
}

/// Durable user credentials obtained from the exchange step.
#[derive(Clone, Debug)]
pub struct AccessCredentials {
    pub token: String,
    pub secret: String,
}

/// Minimal identity of the authorizing user.
#[derive(Clone, Debug)]
pub struct ProviderIdentity {
    /// Opaque provider-side id.
    pub id: String,
    /// Display handle (e.g. screen name).
    pub handle: String,
}

/// External OAuth provider client.
///
/// One implementation per service; registered with the coordinator at
/// startup. All three calls may block on the network and may fail
/// transiently.
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Which service this provider authenticates against.
    fn service(&self) -> ServiceName;

    /// The registered application credentials, included in the stored
    /// payload so downstream integrations can sign user-context calls.
    fn app_credentials(&self) -> &AppCredentials;

    /// Obtains a request token and the authorization URL for a handshake
    /// that will return to `callback_url`.
    async fn request_token(&self, callback_url: &str) -> Result<RequestToken>;

    /// Exchanges the verifier (plus the request token and its secret)
    /// for durable access credentials.
    async fn exchange(
        &self,
        token: &str,
        token_secret: &str,
        verifier: &str,
    ) -> Result<AccessCredentials>;

    /// Fetches the authorizing user's identity with durable credentials.
    async fn fetch_identity(&self, credentials: &AccessCredentials) -> Result<ProviderIdentity>;
}
