//! WireGuard Key Material
//!
//! Keys pass through the model as base64 text. This module checks their
//! shape only; producing them is the job of a [`KeySource`] supplied by the
//! host.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw key size in bytes (Curve25519 keys and pre-shared keys alike)
pub const KEY_LEN: usize = 32;

/// Length of a base64-encoded key, padding included
pub const ENCODED_KEY_LEN: usize = 44;

/// Key shape errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Key is empty")]
    Empty,

    #[error("Invalid key length (expected 44 base64 characters, got {0})")]
    InvalidEncodedLength(usize),

    #[error("Invalid base64 encoding")]
    InvalidBase64,

    #[error("Invalid key length (expected 32 bytes, got {0})")]
    InvalidLength(usize),
}

/// Check that `key` is 44 base64 characters decoding to exactly 32 bytes
pub fn check_key(key: &str) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.len() != ENCODED_KEY_LEN {
        return Err(KeyError::InvalidEncodedLength(key.len()));
    }

    let bytes = BASE64.decode(key).map_err(|_| KeyError::InvalidBase64)?;
    if bytes.len() != KEY_LEN {
        return Err(KeyError::InvalidLength(bytes.len()));
    }
    Ok(())
}

/// Shorthand for `check_key(key).is_ok()`
pub fn is_valid_key(key: &str) -> bool {
    check_key(key).is_ok()
}

/// A private/public key pair, both base64
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"[redacted]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Capability that produces key material.
///
/// The configuration core never generates or inspects keys itself; hosts
/// plug in a real generator (the `wgconf` binary uses X25519) and tests plug
/// in deterministic ones.
pub trait KeySource {
    /// A fresh private/public pair
    fn key_pair(&mut self) -> KeyPair;

    /// A fresh pre-shared key
    fn preshared_key(&mut self) -> String;
}
