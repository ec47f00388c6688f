//! # ALFA Notes Vault
//!
//! Encrypted notes, keyed by nothing but a 12-word recovery phrase.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    ALFA NOTES VAULT                       │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐  │
//! │  │  BIOMETRIC  │  │  MNEMONIC   │  │  VAULT REGISTRY  │  │
//! │  │  BRIDGE     │─►│  BIP-39     │  │  profiles + keys │  │
//! │  │  (wrapped)  │  │  → key + id │  │  (namespaced)    │  │
//! │  └─────────────┘  └──────┬──────┘  └────────┬─────────┘  │
//! │                          │                   │            │
//! │  ┌───────────────────────┴───────────────────┴─────────┐ │
//! │  │                 NOTES VAULT SESSION                  │ │
//! │  │     AES-256-GCM envelope, re-encrypted per change    │ │
//! │  └───────────────────────┬─────────────────────────────┘ │
//! │                          │                                │
//! │  ┌─────────────┐  ┌──────┴──────┐  ┌──────────────────┐  │
//! │  │  KV STORE   │  │   RANKER    │  │  SEMANTIC INDEX  │  │
//! │  │  (SQLite)   │  │  cosine/tag │  │  (embeddings)    │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - Vault key = first 32 bytes of the BIP-39 seed, never persisted
//! - Vault id = truncated SHA-256 of the phrase, used only as a namespace
//! - One AES-256-GCM blob per vault, fresh nonce per save
//! - Biometric binding wraps the phrase under an authenticator-released secret
//! - Keys and phrases zeroized on lock

pub mod biometrics;
pub mod config;
pub mod crypto;
pub mod embeddings;
pub mod error;
pub mod note;
pub mod ranker;
pub mod registry;
pub mod retry;
pub mod storage;
pub mod vault;

pub use biometrics::{BiometricBridge, BiometricBinding, PlatformAuthenticator, UnavailableAuthenticator};
pub use config::AppConfig;
pub use crypto::{generate_mnemonic, MnemonicPhrase, VaultId, VaultKey};
pub use embeddings::{EmbeddingService, IndexReport, SemanticIndexer};
pub use error::{VaultError, VaultResult};
pub use note::{Note, NoteUpdate};
pub use ranker::{rank, RankedNote};
pub use registry::{Profile, VaultRegistry};
pub use retry::RetryPolicy;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use vault::{NotesVault, VaultState};

/// ALFA Notes Vault version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ALFA Notes Vault signature
pub const SIGNATURE: &str = "ALFA_NOTES_VAULT_v1";
