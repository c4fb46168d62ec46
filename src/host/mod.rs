//! Host capability interfaces.
//!
//! The broker never holds a full runtime handle to its host application.
//! It sees two narrow capabilities: a settings oracle/mutator reporting
//! which configuration values are currently in effect for a service, and
//! an integration control for stopping a running integration. Both are
//! trait objects so tests can substitute scripted fakes.
//!
//! `InProcessHost` is the standalone-binary implementation: a concurrent
//! settings map plus a registry of integrations it pretends to run.

use crate::coordinator::ConnectionEvent;
use crate::service::ServiceName;
use crate::status;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Reports and mutates the host's currently-active settings.
pub trait SettingsHost: Send + Sync {
    /// Values currently in effect for the service's mapped setting keys.
    /// Keys the host has no opinion on are absent.
    fn active_settings(&self, service: ServiceName) -> HashMap<String, String>;

    /// Applies changes: `Some(value)` sets a key, `None` clears it.
    fn update_settings(&self, service: ServiceName, changes: HashMap<String, Option<String>>);
}

/// Controls the running integration for a service.
pub trait IntegrationHost: Send + Sync {
    /// Requests that the service's running integration stop.
    fn stop(&self, service: ServiceName) -> anyhow::Result<()>;
}

/// In-process host backing the standalone binary.
#[derive(Default)]
pub struct InProcessHost {
    settings: DashMap<String, String>,
    running: DashSet<ServiceName>,
}

impl InProcessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a service's integration as running (called by the event
    /// loop once persisted credentials have been applied).
    pub fn mark_running(&self, service: ServiceName) {
        self.running.insert(service);
    }

    pub fn is_running(&self, service: ServiceName) -> bool {
        self.running.contains(&service)
    }
}

impl SettingsHost for InProcessHost {
    fn active_settings(&self, service: ServiceName) -> HashMap<String, String> {
        status::setting_mappings(service)
            .iter()
            .filter_map(|(key, _)| {
                self.settings
                    .get(*key)
                    .map(|v| (key.to_string(), v.value().clone()))
            })
            .collect()
    }

    fn update_settings(&self, _service: ServiceName, changes: HashMap<String, Option<String>>) {
        for (key, value) in changes {
            match value {
                Some(value) => {
                    self.settings.insert(key, value);
                }
                None => {
                    self.settings.remove(&key);
                }
            }
        }
    }
}

impl IntegrationHost for InProcessHost {
    fn stop(&self, service: ServiceName) -> anyhow::Result<()> {
        if self.running.remove(&service).is_some() {
            info!(service = %service, "stopped running integration");
        }
        Ok(())
    }
}

/// Consumes coordinator events and applies them to the host.
///
/// Runs outside the callback path: credential persistence has already
/// succeeded by the time an event arrives, so applying settings (or
/// failing to) can be retried or queued without touching the store.
pub async fn run_event_loop(
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
    host: Arc<InProcessHost>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::CredentialsPersisted {
                principal,
                service,
                settings,
            } => {
                let changes = settings
                    .into_iter()
                    .map(|(k, v)| (k, Some(v)))
                    .collect::<HashMap<_, _>>();
                host.update_settings(service, changes);
                host.mark_running(service);
                info!(
                    principal = %principal,
                    service = %service,
                    "applied persisted credentials to active settings, integration reloaded"
                );
            }
            ConnectionEvent::CredentialsRevoked { principal, service } => {
                info!(
                    principal = %principal,
                    service = %service,
                    "connection revoked"
                );
            }
        }
    }
    warn!("connection event channel closed, host event loop exiting");
}
