//! AES-256-GCM encryption for credential payload values.
//!
//! Payload values are encrypted individually, each under a fresh random
//! nonce, so a single field can be inspected without decrypting the whole
//! payload. The master key is 32 bytes (256 bits), injected at store
//! construction and held in memory only.

use crate::error::AuthError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Size of the master key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// A single encrypted payload value as persisted: ciphertext plus the
/// nonce it was sealed under, both base64-encoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealedValue {
    /// Base64 ciphertext (includes the GCM authentication tag)
    pub c: String,
    /// Base64 nonce
    pub n: String,
}

/// Validates that the master key is exactly 32 bytes when base64 decoded.
///
/// Returns `Configuration` on a malformed key so a bad deployment fails
/// at startup rather than corrupting reads later.
pub fn validate_key(key_base64: &str) -> Result<Vec<u8>, AuthError> {
    let key_bytes = BASE64
        .decode(key_base64)
        .map_err(|e| AuthError::Configuration(format!("master key is not valid base64: {e}")))?;

    if key_bytes.len() != KEY_SIZE {
        return Err(AuthError::Configuration(format!(
            "master key must be {} bytes (256 bits), got {}",
            KEY_SIZE,
            key_bytes.len()
        )));
    }

    Ok(key_bytes)
}

/// Encrypts a single payload value under a fresh random nonce.
pub fn seal(plaintext: &str, key: &[u8]) -> Result<SealedValue, AuthError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| AuthError::Storage(format!("failed to create cipher: {e}")))?;

    // Random nonce, never reused
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| AuthError::Storage(format!("encryption failed: {e}")))?;

    Ok(SealedValue {
        c: BASE64.encode(&ciphertext),
        n: BASE64.encode(nonce),
    })
}

/// Decrypts a single sealed value.
///
/// Any failure (undecodable base64, wrong key, tampered ciphertext)
/// surfaces as `CredentialCorrupt` so secret rotation without
/// re-encryption is detectable, never silent garbage.
pub fn open(sealed: &SealedValue, key: &[u8]) -> Result<String, AuthError> {
    let ciphertext = BASE64
        .decode(&sealed.c)
        .map_err(|e| AuthError::CredentialCorrupt(format!("undecodable ciphertext: {e}")))?;
    let nonce_bytes = BASE64
        .decode(&sealed.n)
        .map_err(|e| AuthError::CredentialCorrupt(format!("undecodable nonce: {e}")))?;

    if nonce_bytes.len() != NONCE_SIZE {
        return Err(AuthError::CredentialCorrupt(format!(
            "invalid nonce size: expected {NONCE_SIZE}, got {}",
            nonce_bytes.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| AuthError::CredentialCorrupt(format!("failed to create cipher: {e}")))?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| {
            AuthError::CredentialCorrupt(
                "decryption failed (rotated master key or corrupted data)".to_string(),
            )
        })?;

    String::from_utf8(plaintext)
        .map_err(|e| AuthError::CredentialCorrupt(format!("decrypted value is not UTF-8: {e}")))
}

/// Encrypts every value of a payload map.
pub fn seal_payload(
    payload: &HashMap<String, String>,
    key: &[u8],
) -> Result<HashMap<String, SealedValue>, AuthError> {
    payload
        .iter()
        .map(|(k, v)| Ok((k.clone(), seal(v, key)?)))
        .collect()
}

/// Decrypts every value of a sealed payload map.
pub fn open_payload(
    sealed: &HashMap<String, SealedValue>,
    key: &[u8],
) -> Result<HashMap<String, String>, AuthError> {
    sealed
        .iter()
        .map(|(k, v)| Ok((k.clone(), open(v, key)?)))
        .collect()
}
