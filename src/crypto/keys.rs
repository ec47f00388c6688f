//! ALFA Notes Vault - Key Material
//!
//! In-memory key wrapper plus nonce generation. Keys never leave this
//! wrapper except through `expose()`, and are zeroized on drop.

use std::fmt;

use rand::RngCore;
use secrecy::{ExposeSecret, SecretBox};
use zeroize::Zeroize;

/// Key length for AES-256 / XChaCha20
pub const KEY_LEN: usize = 32;

/// Nonce length for AES-GCM
pub const NONCE_LEN: usize = 12;

/// Nonce length for XChaCha20
pub const XCHACHA_NONCE_LEN: usize = 24;

/// Authentication tag length (both ciphers)
pub const TAG_LEN: usize = 16;

/// HKDF info strings
pub mod contexts {
    /// Wrap key for the biometric binding
    pub const BIOMETRIC_WRAP: &[u8] = b"ALFA:NOTES:BIOMETRIC-WRAP:v1";
}

/// Secure key wrapper with automatic zeroization
pub struct VaultKey {
    inner: SecretBox<[u8; KEY_LEN]>,
}

impl VaultKey {
    /// Create a new vault key from bytes; the stack copy is wiped
    pub fn new(mut bytes: [u8; KEY_LEN]) -> Self {
        let inner = SecretBox::new(Box::new(bytes));
        bytes.zeroize();
        Self { inner }
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        self.inner.expose_secret()
    }

    /// Generate a random key
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::new(bytes)
    }
}

impl Clone for VaultKey {
    fn clone(&self) -> Self {
        Self::new(*self.expose())
    }
}

impl PartialEq for VaultKey {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey([REDACTED])")
    }
}

/// Generate a random nonce for AES-GCM
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// Generate a random nonce for XChaCha20
pub fn generate_xchacha_nonce() -> [u8; XCHACHA_NONCE_LEN] {
    let mut nonce = [0u8; XCHACHA_NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}
