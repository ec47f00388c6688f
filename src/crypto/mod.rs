//! ALFA Notes Vault - Cryptographic Core
//!
//! Mnemonic-derived keys, AES-256-GCM envelope, HKDF subkeys.

pub mod aead;
pub mod hkdf;
pub mod keys;
pub mod mnemonic;

pub use self::aead::*;
pub use self::hkdf::*;
pub use self::keys::*;
pub use self::mnemonic::*;
