//! ALFA Notes Vault - Secret Derivation
//!
//! A 12-word BIP-39 phrase is the only secret a vault has. From it we derive:
//!
//! ```text
//! normalized phrase ──PBKDF2-HMAC-SHA512 (BIP-39 seed)──► seed[0..32] ──► VaultKey
//!                   └─SHA-256──────────────────────────► hex[0..16]  ──► VaultId
//! ```
//!
//! Both are pure functions of the phrase, so the same phrase opens the same
//! vault on any device without a network exchange.

use std::fmt;

use bip39::{Language, Mnemonic};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::keys::{VaultKey, KEY_LEN};
use crate::error::{VaultError, VaultResult};

/// Words in a vault phrase
pub const WORD_COUNT: usize = 12;

/// Hex characters kept from the identity hash
pub const VAULT_ID_LEN: usize = 16;

/// Entropy behind a 12-word phrase (128 bits)
const ENTROPY_LEN: usize = 16;

// ═══════════════════════════════════════════════════════════════════════════
// MNEMONIC PHRASE
// ═══════════════════════════════════════════════════════════════════════════

/// A validated, normalized 12-word phrase held in zeroizing memory
pub struct MnemonicPhrase {
    phrase: SecretString,
}

impl MnemonicPhrase {
    /// Normalize and validate user input.
    ///
    /// Fails with `InvalidMnemonic` on a wrong word count, unknown word or
    /// checksum mismatch. No key material is derived on failure.
    pub fn parse(input: &str) -> VaultResult<Self> {
        let normalized = normalize(input);

        if normalized.split(' ').count() != WORD_COUNT {
            return Err(VaultError::InvalidMnemonic);
        }

        Mnemonic::parse_in_normalized(Language::English, normalized.as_str())
            .map_err(|_| VaultError::InvalidMnemonic)?;

        Ok(Self {
            phrase: SecretString::from(normalized.as_str().to_owned()),
        })
    }

    /// Generate a fresh phrase from 128 bits of OS entropy
    pub fn generate() -> VaultResult<Self> {
        let mut entropy = Zeroizing::new([0u8; ENTROPY_LEN]);
        rand::thread_rng().fill_bytes(&mut entropy[..]);

        let mnemonic = Mnemonic::from_entropy(&entropy[..])
            .map_err(|e| VaultError::KeyDerivationFailed(e.to_string()))?;

        let words = Zeroizing::new(mnemonic.to_string());
        Self::parse(words.as_str())
    }

    /// Expose the normalized phrase (use with caution)
    pub fn expose(&self) -> &str {
        self.phrase.expose_secret()
    }
}

impl Clone for MnemonicPhrase {
    fn clone(&self) -> Self {
        Self {
            phrase: SecretString::from(self.expose().to_owned()),
        }
    }
}

impl fmt::Debug for MnemonicPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MnemonicPhrase([REDACTED])")
    }
}

/// Trim, lower-case and collapse whitespace to single spaces
fn normalize(input: &str) -> Zeroizing<String> {
    let mut out = Zeroizing::new(String::with_capacity(input.len()));

    for (i, word) in input.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let lower = Zeroizing::new(word.to_lowercase());
        out.push_str(lower.as_str());
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════
// VAULT IDENTITY
// ═══════════════════════════════════════════════════════════════════════════

/// Storage namespace of one vault: 16 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VaultId(String);

impl VaultId {
    /// Parse a stored or user-supplied identity
    pub fn parse(s: &str) -> VaultResult<Self> {
        let valid = s.len() == VAULT_ID_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(VaultError::CorruptData(format!("invalid vault id: {:?}", s)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VaultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VaultId {
    type Error = VaultError;

    fn try_from(s: String) -> VaultResult<Self> {
        Self::parse(&s)
    }
}

impl From<VaultId> for String {
    fn from(id: VaultId) -> Self {
        id.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DERIVATION
// ═══════════════════════════════════════════════════════════════════════════

/// Derive the 256-bit vault key: first half of the BIP-39 seed (empty passphrase)
pub fn derive_key(mnemonic: &MnemonicPhrase) -> VaultResult<VaultKey> {
    let parsed = Mnemonic::parse_in_normalized(Language::English, mnemonic.expose())
        .map_err(|_| VaultError::InvalidMnemonic)?;

    let seed = Zeroizing::new(parsed.to_seed_normalized(""));

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&seed[..KEY_LEN]);
    Ok(VaultKey::new(key))
}

/// Fresh 12-word phrase from 128 bits of OS entropy
pub fn generate_mnemonic() -> VaultResult<MnemonicPhrase> {
    MnemonicPhrase::generate()
}

/// Derive the one-way vault identity: SHA-256 of the phrase, truncated
pub fn derive_vault_id(mnemonic: &MnemonicPhrase) -> VaultId {
    let digest = Sha256::digest(mnemonic.expose().as_bytes());
    let mut hex_id = hex::encode(digest);
    hex_id.truncate(VAULT_ID_LEN);
    VaultId(hex_id)
}
