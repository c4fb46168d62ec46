//! Encrypted credential storage backed by SQLite.
//!
//! Maps (principal, service) to an opaque credential payload whose values
//! are encrypted individually with AES-256-GCM before hitting disk.

use super::encryption::{self, SealedValue};
use crate::error::AuthError;
use crate::service::ServiceName;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use uuid::Uuid;

/// Decrypted credential payload: field name to secret value.
pub type CredentialPayload = HashMap<String, String>;

/// Durable, encrypted-at-rest credential store.
///
/// # Schema
/// ```sql
/// CREATE TABLE service_credentials (
///     id INTEGER PRIMARY KEY,
///     principal_id TEXT NOT NULL,
///     service TEXT NOT NULL,
///     payload TEXT NOT NULL,       -- JSON map: field -> {c, n} sealed value
///     is_active INTEGER NOT NULL,
///     expires_at TEXT,             -- ISO 8601 (optional)
///     created_at TEXT NOT NULL,    -- ISO 8601
///     updated_at TEXT NOT NULL,    -- ISO 8601
///     UNIQUE(principal_id, service)
/// );
/// ```
///
/// # Invariants
/// - At most one active record per (principal, service) pair.
/// - Writes are single-statement upserts: a failed `put` leaves the
///   previous active record, if any, unchanged.
/// - Reads only return active records; absence is not an error.
///
/// # Thread Safety
/// Connection is wrapped in a Mutex; concurrent writes to the same pair
/// are serialized by SQLite (last writer wins, full payload replaced).
pub struct CredentialStore {
    conn: Mutex<Connection>,
    master_key: Vec<u8>,
}

impl CredentialStore {
    /// Creates or opens a credential store.
    ///
    /// `master_key` is the base64-encoded 32-byte encryption key. It is
    /// injected here rather than read from ambient state so tests can
    /// substitute deterministic keys.
    pub fn new<P: AsRef<Path>>(db_path: P, master_key: &str) -> Result<Self, AuthError> {
        let key_bytes = encryption::validate_key(master_key)?;

        let conn = Connection::open(db_path)
            .map_err(|e| AuthError::Storage(format!("failed to open database: {e}")))?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS service_credentials (
                id INTEGER PRIMARY KEY,
                principal_id TEXT NOT NULL,
                service TEXT NOT NULL,
                payload TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                expires_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(principal_id, service)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_principal_service
             ON service_credentials(principal_id, service)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            master_key: key_bytes,
        })
    }

    /// Stores a credential payload for a principal and service.
    ///
    /// Every value is encrypted under its own nonce. Existing records are
    /// replaced wholesale (upsert) with `is_active` forced back to true
    /// and `updated_at` refreshed; `created_at` is preserved.
    pub fn put(
        &self,
        principal: Uuid,
        service: ServiceName,
        payload: &CredentialPayload,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), AuthError> {
        let sealed = encryption::seal_payload(payload, &self.master_key)?;
        let payload_json = serde_json::to_string(&sealed)
            .map_err(|e| AuthError::Storage(format!("failed to serialize payload: {e}")))?;

        let now = Utc::now().to_rfc3339();

        self.conn.lock().unwrap().execute(
            r#"
            INSERT INTO service_credentials (
                principal_id, service, payload, is_active,
                expires_at, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)
            ON CONFLICT(principal_id, service) DO UPDATE SET
                payload = excluded.payload,
                is_active = 1,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
            params![
                principal.to_string(),
                service.as_str(),
                payload_json,
                expires_at.map(|dt| dt.to_rfc3339()),
                now,
            ],
        )?;

        Ok(())
    }

    /// Retrieves and decrypts the active payload for a principal and
    /// service. Absence (no record, or record deactivated) is `Ok(None)`.
    pub fn get(
        &self,
        principal: Uuid,
        service: ServiceName,
    ) -> Result<Option<CredentialPayload>, AuthError> {
        let conn = self.conn.lock().unwrap();

        let payload_json: Option<String> = conn
            .query_row(
                "SELECT payload FROM service_credentials
                 WHERE principal_id = ?1 AND service = ?2 AND is_active = 1",
                params![principal.to_string(), service.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload_json) = payload_json else {
            return Ok(None);
        };

        let sealed: HashMap<String, SealedValue> = serde_json::from_str(&payload_json)
            .map_err(|e| AuthError::CredentialCorrupt(format!("unreadable sealed payload: {e}")))?;

        Ok(Some(encryption::open_payload(&sealed, &self.master_key)?))
    }

    /// Deletes the record for a principal and service. Idempotent:
    /// deleting a non-existent record is not an error.
    ///
    /// Returns whether a record was actually removed.
    pub fn delete(&self, principal: Uuid, service: ServiceName) -> Result<bool, AuthError> {
        let rows = self.conn.lock().unwrap().execute(
            "DELETE FROM service_credentials WHERE principal_id = ?1 AND service = ?2",
            params![principal.to_string(), service.as_str()],
        )?;

        Ok(rows > 0)
    }

    /// Whether an active, decryptable record exists for the pair.
    pub fn exists(&self, principal: Uuid, service: ServiceName) -> Result<bool, AuthError> {
        Ok(self.get(principal, service)?.is_some())
    }

    /// Services with active stored credentials for a principal.
    pub fn list_by_principal(&self, principal: Uuid) -> Result<Vec<ServiceName>, AuthError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT service FROM service_credentials
             WHERE principal_id = ?1 AND is_active = 1 ORDER BY service",
        )?;

        let names = stmt
            .query_map(params![principal.to_string()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<String>, _>>()?;

        // Unknown names in the table would mean the closed enum shrank
        // across versions; skip them rather than failing the listing.
        Ok(names
            .iter()
            .filter_map(|s| ServiceName::from_str(s).ok())
            .collect())
    }

    /// Number of active records for the pair. Test/diagnostic helper for
    /// verifying the one-active-record invariant.
    pub fn count(&self, principal: Uuid, service: ServiceName) -> Result<u64, AuthError> {
        let conn = self.conn.lock().unwrap();
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM service_credentials
             WHERE principal_id = ?1 AND service = ?2 AND is_active = 1",
            params![principal.to_string(), service.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
