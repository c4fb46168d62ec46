//! Connection status resolution.
//!
//! Combines a stored credential (or its absence) with the host's
//! currently-active settings to classify a connection. Pure computation:
//! nothing here touches storage or the network, and the result is never
//! persisted.

use crate::credentials::{fields, CredentialPayload};
use crate::service::ServiceName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Derived view of one (principal, service) connection.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub service_name: ServiceName,
    pub is_connected: bool,
    pub is_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub last_checked: DateTime<Utc>,
}

/// Fixed mapping from host setting keys to credential payload fields,
/// per service. Empty for services without a runtime integration.
pub fn setting_mappings(service: ServiceName) -> &'static [(&'static str, &'static str)] {
    match service {
        ServiceName::Twitter => &[
            ("TWITTER_ACCESS_TOKEN", fields::ACCESS_TOKEN),
            ("TWITTER_ACCESS_TOKEN_SECRET", fields::ACCESS_TOKEN_SECRET),
        ],
        _ => &[],
    }
}

/// Classifies a connection.
///
/// Rules, in order:
/// 1. No stored credential: disconnected, never pending.
/// 2. Stored credential, no in-effect settings for the mapped keys:
///    connected, not pending.
/// 3. Stored credential and in-effect settings: if any setting the host
///    reports differs from the stored field it maps to, the stored
///    credentials have not been picked up yet — connected and pending
///    (typically awaiting a reload). Otherwise connected, not pending.
///
/// Only settings the host currently reports non-empty are compared; a
/// never-configured setting cannot trigger pending. Pending can weaken
/// "connected" but never exists without a stored credential.
pub fn resolve(
    service: ServiceName,
    stored: Option<&CredentialPayload>,
    active_settings: &HashMap<String, String>,
) -> ConnectionStatus {
    let Some(payload) = stored else {
        return ConnectionStatus {
            service_name: service,
            is_connected: false,
            is_pending: false,
            user_id: None,
            username: None,
            last_checked: Utc::now(),
        };
    };

    let is_pending = setting_mappings(service).iter().any(|(setting_key, field)| {
        match active_settings.get(*setting_key) {
            Some(active) if !active.is_empty() => payload.get(*field) != Some(active),
            _ => false,
        }
    });

    ConnectionStatus {
        service_name: service,
        is_connected: true,
        is_pending,
        user_id: payload.get(fields::USER_ID).cloned(),
        username: payload.get(fields::USERNAME).cloned(),
        last_checked: Utc::now(),
    }
}
