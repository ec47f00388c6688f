//! ALFA Notes Vault - HKDF Key Derivation

use hkdf::Hkdf;
use sha2::Sha256;

use super::keys::{VaultKey, KEY_LEN};
use crate::error::{VaultError, VaultResult};

/// Derive a key using HKDF-SHA256
pub fn derive_subkey(ikm: &[u8], salt: &[u8], info: &[u8]) -> VaultResult<VaultKey> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; KEY_LEN];

    hk.expand(info, &mut okm)
        .map_err(|e| VaultError::KeyDerivationFailed(e.to_string()))?;

    Ok(VaultKey::new(okm))
}
