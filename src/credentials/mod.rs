//! Encrypted credential storage for service connections.
//!
//! Durable key/value mapping from (principal, service) to an opaque
//! credential payload, encrypted at rest with AES-256-GCM. The store has
//! no knowledge of OAuth protocol steps; it only persists what the
//! coordinator hands it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       CredentialStore                    │
//! │  - upsert / get / delete by pair         │
//! │  - transparent encrypt / decrypt         │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!      (seal)               (open)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       Encryption Module                  │
//! │  - AES-256-GCM, nonce per value          │
//! │  - per-field sealing (inspect by key)    │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       SQLite                             │
//! │  - sealed payloads at rest               │
//! │  - UNIQUE(principal, service) upserts    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Security
//!
//! - Payload values encrypted individually, each with a unique nonce
//! - Master key injected at construction, held in memory only
//! - Authenticated encryption: tampering and key rotation surface as
//!   `CredentialCorrupt`, never silent garbage

mod encryption;
mod storage;

pub use encryption::{open, seal, validate_key, SealedValue};
pub use storage::{CredentialPayload, CredentialStore};

/// Well-known payload field names for the Twitter connection.
pub mod fields {
    pub const API_KEY: &str = "api_key";
    pub const API_SECRET_KEY: &str = "api_secret_key";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const ACCESS_TOKEN_SECRET: &str = "access_token_secret";
    pub const USER_ID: &str = "user_id";
    pub const USERNAME: &str = "username";
}
