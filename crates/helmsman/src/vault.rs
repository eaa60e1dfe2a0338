//! Credential vault - authenticated encryption for node secrets at rest.
//!
//! Secrets are sealed with AES-256-GCM under a single process-wide key and
//! stored as `base64(nonce(12) || tag(16) || ciphertext)`. Every `encrypt`
//! call draws a fresh random 96-bit nonce, so encrypting the same plaintext
//! twice yields different blobs. Plaintext only ever exists transiently in
//! memory while a unit of work is running.
//!
//! The key is loaded once at startup from an external secret (base64-encoded
//! 32-byte value); a missing or malformed key is a fatal configuration error,
//! never a per-call one.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

use armada_common::FleetError;
use armada_common::constants::VAULT_KEY_ENV;

/// AES-GCM nonce length in bytes (96 bits)
const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes (128 bits)
const TAG_LEN: usize = 16;

/// Decryption failures, fail-closed and distinguishable.
///
/// A structurally malformed blob (`MalformedEncoding`, `TruncatedBlob`) is
/// reported differently from a well-formed but forged or corrupted one
/// (`AuthenticationFailed`).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    /// The blob is not valid base64
    #[error("ciphertext is not valid base64")]
    MalformedEncoding,

    /// The decoded blob is too short to contain nonce and tag
    #[error("ciphertext blob truncated: {len} bytes, need at least {}", NONCE_LEN + TAG_LEN)]
    TruncatedBlob { len: usize },

    /// Authentication tag mismatch: tampered ciphertext or wrong key
    #[error("ciphertext authentication failed")]
    AuthenticationFailed,

    /// Cipher-level failure (should not happen for credential-sized input)
    #[error("vault internal error: {0}")]
    Internal(String),
}

/// Symmetric vault sealing per-node credentials.
///
/// The key material is read-only after construction and shared across all
/// in-flight units of work without locking.
#[derive(Clone)]
pub struct CredentialVault {
    cipher: Aes256Gcm,
}

impl CredentialVault {
    /// Build a vault from a base64-encoded 32-byte key.
    ///
    /// A key that is absent, not base64, or the wrong length after decoding
    /// is a fatal startup condition for any caller that needs the vault.
    pub fn from_base64_key(encoded: &str) -> Result<Self, FleetError> {
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|e| FleetError::Config(format!("vault key is not valid base64: {}", e)))?;

        if key.len() != 32 {
            return Err(FleetError::Config(format!(
                "vault key must decode to 32 bytes, got {}",
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| FleetError::Config(format!("vault key rejected by cipher: {}", e)))?;

        Ok(Self { cipher })
    }

    /// Load the vault key from the `ARMADA_VAULT_KEY` environment variable.
    pub fn from_env() -> Result<Self, FleetError> {
        let encoded = std::env::var(VAULT_KEY_ENV).map_err(|_| {
            FleetError::Config(format!("{} is not set; refusing to start", VAULT_KEY_ENV))
        })?;
        Self::from_base64_key(&encoded)
    }

    /// Seal a plaintext secret into a ciphertext blob.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        // aes-gcm appends the tag to the ciphertext; the stored layout is
        // nonce || tag || ciphertext
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Internal(e.to_string()))?;

        let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(tag);
        blob.extend_from_slice(body);

        Ok(STANDARD.encode(blob))
    }

    /// Open a ciphertext blob back into plaintext.
    pub fn decrypt(&self, blob: &str) -> Result<String, VaultError> {
        let raw = STANDARD
            .decode(blob)
            .map_err(|_| VaultError::MalformedEncoding)?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::TruncatedBlob { len: raw.len() });
        }

        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (tag, body) = rest.split_at(TAG_LEN);

        // Reassemble into the ciphertext || tag form aes-gcm expects
        let mut sealed = Vec::with_capacity(rest.len());
        sealed.extend_from_slice(body);
        sealed.extend_from_slice(tag);

        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
            .map_err(|_| VaultError::AuthenticationFailed)?;

        String::from_utf8(plain).map_err(|e| VaultError::Internal(e.to_string()))
    }

    /// Seal an optional secret. `None` and the empty string pass through as
    /// `None` - a node without a configured credential is not an error.
    pub fn encrypt_opt(&self, plaintext: Option<&str>) -> Result<Option<String>, VaultError> {
        match plaintext {
            None => Ok(None),
            Some("") => Ok(None),
            Some(p) => Ok(Some(self.encrypt(p)?)),
        }
    }

    /// Open an optional blob. `None` and the empty string pass through as `None`.
    pub fn decrypt_opt(&self, blob: Option<&str>) -> Result<Option<String>, VaultError> {
        match blob {
            None => Ok(None),
            Some("") => Ok(None),
            Some(b) => Ok(Some(self.decrypt(b)?)),
        }
    }
}
