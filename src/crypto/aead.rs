//! ALFA Notes Vault - AEAD Encryption
//!
//! AES-256-GCM envelope for the note collection, XChaCha20-Poly1305 for
//! small wrapped secrets (biometric binding).
//!
//! Envelope blob format:
//! ```text
//! base64( [NONCE 12B][CIPHERTEXT variable][TAG 16B] )
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use zeroize::Zeroizing;

use super::keys::{
    generate_nonce, generate_xchacha_nonce, VaultKey, NONCE_LEN, TAG_LEN, XCHACHA_NONCE_LEN,
};
use crate::error::{VaultError, VaultResult};

/// Encrypted data with nonce prepended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    /// Nonce (12 or 24 bytes depending on cipher)
    pub nonce: Vec<u8>,
    /// Ciphertext with authentication tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Serialize to bytes (nonce || ciphertext)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.nonce.len() + self.ciphertext.len());
        result.extend_from_slice(&self.nonce);
        result.extend_from_slice(&self.ciphertext);
        result
    }

    /// Serialize to a single base64 string
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Deserialize from a base64 string
    pub fn from_base64(blob: &str, nonce_len: usize) -> VaultResult<Self> {
        let data = STANDARD
            .decode(blob.trim())
            .map_err(|_| VaultError::AuthenticationFailed)?;
        Self::split(&data, nonce_len)
    }

    // Anything shorter than nonce + tag cannot have been produced by us.
    fn split(data: &[u8], nonce_len: usize) -> VaultResult<Self> {
        if data.len() < nonce_len + TAG_LEN {
            return Err(VaultError::AuthenticationFailed);
        }

        Ok(Self {
            nonce: data[..nonce_len].to_vec(),
            ciphertext: data[nonce_len..].to_vec(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// ENVELOPE (AES-256-GCM)
// ═══════════════════════════════════════════════════════════════════════════

/// Encrypt a payload into a self-contained base64 blob.
///
/// A fresh nonce is drawn on every call.
pub fn encrypt(plaintext: &[u8], key: &VaultKey) -> VaultResult<String> {
    Ok(encrypt_aes_gcm(key, plaintext)?.to_base64())
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Any malformed input, tampering or wrong key is `AuthenticationFailed`.
pub fn decrypt(blob: &str, key: &VaultKey) -> VaultResult<Zeroizing<Vec<u8>>> {
    let encrypted = EncryptedData::from_base64(blob, NONCE_LEN)?;
    decrypt_aes_gcm(key, &encrypted)
}

/// Encrypt data with AES-256-GCM
pub fn encrypt_aes_gcm(key: &VaultKey, plaintext: &[u8]) -> VaultResult<EncryptedData> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedData {
        nonce: nonce_bytes.to_vec(),
        ciphertext,
    })
}

/// Decrypt data with AES-256-GCM
pub fn decrypt_aes_gcm(key: &VaultKey, encrypted: &EncryptedData) -> VaultResult<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|_| VaultError::AuthenticationFailed)?;

    if encrypted.nonce.len() != NONCE_LEN {
        return Err(VaultError::AuthenticationFailed);
    }

    let nonce = Nonce::from_slice(&encrypted.nonce);

    cipher
        .decrypt(nonce, encrypted.ciphertext.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| VaultError::AuthenticationFailed)
}

// ═══════════════════════════════════════════════════════════════════════════
// XChaCha20-Poly1305 (wrapped secrets)
// ═══════════════════════════════════════════════════════════════════════════

/// Encrypt with XChaCha20-Poly1305, binding `aad` to the ciphertext
pub fn seal_xchacha(key: &VaultKey, plaintext: &[u8], aad: &[u8]) -> VaultResult<EncryptedData> {
    let cipher = XChaCha20Poly1305::new_from_slice(key.expose())
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    let nonce_bytes = generate_xchacha_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    Ok(EncryptedData {
        nonce: nonce_bytes.to_vec(),
        ciphertext,
    })
}

/// Decrypt with XChaCha20-Poly1305
pub fn open_xchacha(
    key: &VaultKey,
    encrypted: &EncryptedData,
    aad: &[u8],
) -> VaultResult<Zeroizing<Vec<u8>>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key.expose())
        .map_err(|_| VaultError::AuthenticationFailed)?;

    if encrypted.nonce.len() != XCHACHA_NONCE_LEN {
        return Err(VaultError::AuthenticationFailed);
    }

    let nonce = XNonce::from_slice(&encrypted.nonce);

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: encrypted.ciphertext.as_slice(),
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| VaultError::AuthenticationFailed)
}
