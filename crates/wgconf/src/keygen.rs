//! WireGuard Key Generation
//!
//! X25519 key pairs and random pre-shared keys, handed to the configuration
//! core through [`KeySource`].

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use rand::rngs::OsRng;
use wgconf_export::{check_key, KeyError, KeyPair, KeySource, KEY_LEN};
use x25519_dalek::{PublicKey, StaticSecret};

/// Key source backed by the operating system RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct X25519KeySource;

impl X25519KeySource {
    /// Generate a new random key pair
    pub fn generate_pair() -> KeyPair {
        let secret = StaticSecret::random_from_rng(OsRng);
        pair_from_secret(&secret)
    }

    /// Generate 32 random bytes for use as a pre-shared key
    pub fn generate_preshared() -> String {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        BASE64.encode(bytes)
    }
}

impl KeySource for X25519KeySource {
    fn key_pair(&mut self) -> KeyPair {
        Self::generate_pair()
    }

    fn preshared_key(&mut self) -> String {
        Self::generate_preshared()
    }
}

/// Derive the public key for a base64 private key
pub fn public_key_for(private_key: &str) -> Result<String, KeyError> {
    check_key(private_key)?;
    let bytes = BASE64.decode(private_key).map_err(|_| KeyError::InvalidBase64)?;
    let raw: [u8; KEY_LEN] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| KeyError::InvalidLength(b.len()))?;

    Ok(pair_from_secret(&StaticSecret::from(raw)).public_key)
}

fn pair_from_secret(secret: &StaticSecret) -> KeyPair {
    KeyPair {
        private_key: BASE64.encode(secret.to_bytes()),
        public_key: BASE64.encode(PublicKey::from(secret).to_bytes()),
    }
}
