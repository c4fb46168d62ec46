//! Closed enumeration of supported external services.
//!
//! Unknown names are rejected at the API boundary before reaching any
//! component; nothing downstream ever sees a free-form service string.

use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External services the broker knows about.
///
/// Only services returned by [`ServiceName::supported`] have a registered
/// OAuth provider; the remaining variants are reserved wire names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceName {
    Twitter,
    Discord,
    Telegram,
    Github,
    Google,
    Linkedin,
}

impl ServiceName {
    /// Services with an implemented OAuth handshake.
    pub fn supported() -> &'static [ServiceName] {
        &[ServiceName::Twitter]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Twitter => "twitter",
            ServiceName::Discord => "discord",
            ServiceName::Telegram => "telegram",
            ServiceName::Github => "github",
            ServiceName::Google => "google",
            ServiceName::Linkedin => "linkedin",
        }
    }

    /// Human-facing name for the connections listing.
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceName::Twitter => "Twitter/X",
            ServiceName::Discord => "Discord",
            ServiceName::Telegram => "Telegram",
            ServiceName::Github => "GitHub",
            ServiceName::Google => "Google",
            ServiceName::Linkedin => "LinkedIn",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ServiceName::Twitter => "Connect to post tweets and interact with your audience",
            _ => "Connect to this service",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twitter" => Ok(ServiceName::Twitter),
            "discord" => Ok(ServiceName::Discord),
            "telegram" => Ok(ServiceName::Telegram),
            "github" => Ok(ServiceName::Github),
            "google" => Ok(ServiceName::Google),
            "linkedin" => Ok(ServiceName::Linkedin),
            other => Err(AuthError::UnsupportedService(other.to_string())),
        }
    }
}
