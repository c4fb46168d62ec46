//! Twitter OAuth 1.0a provider.
//!
//! Three-legged flow against api.twitter.com: request token (with
//! callback confirmation), authorize redirect, access-token exchange,
//! plus `GET /2/users/me` for the minimal identity fetch.

use super::signing;
use super::{AccessCredentials, AppCredentials, OAuthProvider, ProviderIdentity, RequestToken};
use crate::service::ServiceName;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

const REQUEST_TOKEN_URL: &str = "https://api.twitter.com/oauth/request_token";
const AUTHORIZE_URL: &str = "https://api.twitter.com/oauth/authorize";
const ACCESS_TOKEN_URL: &str = "https://api.twitter.com/oauth/access_token";
const IDENTITY_URL: &str = "https://api.twitter.com/2/users/me";

/// Body of a successful request-token response (form-urlencoded).
#[derive(Deserialize)]
struct RequestTokenResponse {
    oauth_token: String,
    oauth_token_secret: String,
    oauth_callback_confirmed: String,
}

/// Body of a successful access-token response (form-urlencoded).
#[derive(Deserialize)]
struct AccessTokenResponse {
    oauth_token: String,
    oauth_token_secret: String,
}

/// Body of `GET /2/users/me`.
#[derive(Deserialize)]
struct MeResponse {
    data: MeData,
}

#[derive(Deserialize)]
struct MeData {
    id: String,
    username: String,
}

pub struct TwitterProvider {
    app: AppCredentials,
    client: reqwest::Client,
}

impl TwitterProvider {
    pub fn new(app: AppCredentials) -> Self {
        Self {
            app,
            client: reqwest::Client::new(),
        }
    }

    async fn read_ok_body(response: reqwest::Response, what: &str) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read {what} response"))?;

        if !status.is_success() {
            return Err(anyhow!("{what} failed with status {status}: {body}"));
        }
        Ok(body)
    }
}

#[async_trait]
impl OAuthProvider for TwitterProvider {
    fn service(&self) -> ServiceName {
        ServiceName::Twitter
    }

    fn app_credentials(&self) -> &AppCredentials {
        &self.app
    }

    async fn request_token(&self, callback_url: &str) -> Result<RequestToken> {
        let mut oauth = signing::base_oauth_params(&self.app.consumer_key, None);
        oauth.push(("oauth_callback".to_string(), callback_url.to_string()));

        let header = signing::authorization_header(
            "POST",
            REQUEST_TOKEN_URL,
            &oauth,
            &[],
            &self.app.consumer_secret,
            "",
        );

        let response = self
            .client
            .post(REQUEST_TOKEN_URL)
            .header("Authorization", header)
            .send()
            .await
            .context("failed to send request-token request")?;

        let body = Self::read_ok_body(response, "request token").await?;
        let parsed: RequestTokenResponse = serde_urlencoded::from_str(&body)
            .context("failed to parse request-token response")?;

        if parsed.oauth_callback_confirmed != "true" {
            return Err(anyhow!("provider did not confirm the oauth callback"));
        }

        let authorization_url = format!(
            "{}?oauth_token={}",
            AUTHORIZE_URL,
            urlencoding::encode(&parsed.oauth_token)
        );

        Ok(RequestToken {
            token: parsed.oauth_token,
            secret: parsed.oauth_token_secret,
            authorization_url,
        })
    }

    async fn exchange(
        &self,
        token: &str,
        token_secret: &str,
        verifier: &str,
    ) -> Result<AccessCredentials> {
        let mut oauth = signing::base_oauth_params(&self.app.consumer_key, Some(token));
        oauth.push(("oauth_verifier".to_string(), verifier.to_string()));

        let header = signing::authorization_header(
            "POST",
            ACCESS_TOKEN_URL,
            &oauth,
            &[],
            &self.app.consumer_secret,
            token_secret,
        );

        let response = self
            .client
            .post(ACCESS_TOKEN_URL)
            .header("Authorization", header)
            .send()
            .await
            .context("failed to send access-token request")?;

        let body = Self::read_ok_body(response, "access token exchange").await?;
        let parsed: AccessTokenResponse = serde_urlencoded::from_str(&body)
            .context("failed to parse access-token response")?;

        Ok(AccessCredentials {
            token: parsed.oauth_token,
            secret: parsed.oauth_token_secret,
        })
    }

    async fn fetch_identity(&self, credentials: &AccessCredentials) -> Result<ProviderIdentity> {
        let oauth = signing::base_oauth_params(&self.app.consumer_key, Some(&credentials.token));

        let header = signing::authorization_header(
            "GET",
            IDENTITY_URL,
            &oauth,
            &[],
            &self.app.consumer_secret,
            &credentials.secret,
        );

        let response = self
            .client
            .get(IDENTITY_URL)
            .header("Authorization", header)
            .send()
            .await
            .context("failed to send identity request")?;

        let body = Self::read_ok_body(response, "identity fetch").await?;
        let parsed: MeResponse =
            serde_json::from_str(&body).context("failed to parse identity response")?;

        Ok(ProviderIdentity {
            id: parsed.data.id,
            handle: parsed.data.username,
        })
    }
}
