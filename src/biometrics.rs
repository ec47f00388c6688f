//! ALFA Notes Vault - Biometric Unlock
//!
//! Convenience path back to a vault's mnemonic on one device. The platform
//! authenticator (passkey / fingerprint / face) is an external capability:
//!
//! ```text
//! register:  unlocked vault ──createCredential──► grant { credentialId, secret }
//!            HKDF(secret, salt = vaultId) ──► wrap key ──XChaCha20──► wrapped mnemonic
//!
//! unlock:    getAssertion(allowed ids?) ──► grant ──► matching binding
//!            wrap key ──open──► mnemonic ──► ordinary unlock
//! ```
//!
//! The authenticator only releases `secret` after a successful ceremony,
//! so a copied binding record is useless off-device. This is not an
//! escrow: losing the device loses nothing but the shortcut.

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{
    contexts, derive_subkey, derive_vault_id, open_xchacha, seal_xchacha, EncryptedData,
    MnemonicPhrase, VaultId, VaultKey, XCHACHA_NONCE_LEN,
};
use crate::config::AppConfig;
use crate::error::{VaultError, VaultResult};
use crate::registry::{binding_owner, binding_prefix, namespaced_key, Profile, StorageKind, VaultRegistry};
use crate::storage::KeyValueStore;
use crate::vault::NotesVault;

/// Default time the platform prompt stays open
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

// ═══════════════════════════════════════════════════════════════════════════
// PLATFORM CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════

/// Opaque credential handle minted by the authenticator
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialId(Vec<u8>);

impl CredentialId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialId({})", URL_SAFE_NO_PAD.encode(&self.0))
    }
}

impl TryFrom<String> for CredentialId {
    type Error = VaultError;

    fn try_from(s: String) -> VaultResult<Self> {
        URL_SAFE_NO_PAD
            .decode(s.as_bytes())
            .map(Self)
            .map_err(|_| VaultError::CorruptData("credential id is not base64url".into()))
    }
}

impl From<CredentialId> for String {
    fn from(id: CredentialId) -> Self {
        URL_SAFE_NO_PAD.encode(id.0)
    }
}

/// Request to mint a device-bound credential
#[derive(Debug, Clone)]
pub struct CredentialParams {
    /// Vault the credential is for; used as the user handle
    pub user_handle: VaultId,
    /// Shown by the platform prompt
    pub label: String,
    pub timeout: Duration,
}

/// What the authenticator hands back after a successful ceremony
#[derive(Debug)]
pub struct CredentialGrant {
    pub credential_id: CredentialId,
    /// Device-held secret bound to the credential (PRF-style output)
    pub secret: VaultKey,
}

/// Platform authenticator failures
#[derive(Error, Debug)]
pub enum AuthenticatorError {
    #[error("platform authenticator not available")]
    Unsupported,

    #[error("user cancelled the prompt")]
    Cancelled,

    #[error("prompt timed out")]
    TimedOut,

    #[error("credential not allowed: {0}")]
    NotAllowed(String),

    #[error("authenticator failure: {0}")]
    Failed(String),
}

impl From<AuthenticatorError> for VaultError {
    fn from(e: AuthenticatorError) -> Self {
        match e {
            AuthenticatorError::Unsupported => VaultError::Unsupported,
            AuthenticatorError::Cancelled => VaultError::UserCancelled,
            AuthenticatorError::TimedOut | AuthenticatorError::NotAllowed(_) => VaultError::NoMatch,
            AuthenticatorError::Failed(msg) => {
                log::warn!("Authenticator failure: {}", msg);
                VaultError::NoMatch
            }
        }
    }
}

/// Strong, device-bound authentication capability provided by the host
pub trait PlatformAuthenticator: Send + Sync {
    fn is_available(&self) -> bool;

    fn create_credential(
        &self,
        params: &CredentialParams,
    ) -> Result<CredentialGrant, AuthenticatorError>;

    /// `allowed = None` lets the user pick any discoverable credential
    fn get_assertion(
        &self,
        allowed: Option<&[CredentialId]>,
        timeout: Duration,
    ) -> Result<CredentialGrant, AuthenticatorError>;
}

/// Authenticator for hosts without one
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableAuthenticator;

impl PlatformAuthenticator for UnavailableAuthenticator {
    fn is_available(&self) -> bool {
        false
    }

    fn create_credential(&self, _: &CredentialParams) -> Result<CredentialGrant, AuthenticatorError> {
        Err(AuthenticatorError::Unsupported)
    }

    fn get_assertion(
        &self,
        _: Option<&[CredentialId]>,
        _: Duration,
    ) -> Result<CredentialGrant, AuthenticatorError> {
        Err(AuthenticatorError::Unsupported)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BINDINGS
// ═══════════════════════════════════════════════════════════════════════════

/// Link between one vault and one platform credential on this device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricBinding {
    pub vault_id: VaultId,
    pub credential_id: CredentialId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    /// base64(nonce24 || XChaCha20-Poly1305(mnemonic)), AAD = vault id
    pub wrapped_secret: String,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "version")]
enum BindingDocument {
    #[serde(rename = "1")]
    V1(BiometricBinding),
}

/// Result of a successful biometric authentication
#[derive(Debug)]
pub struct BiometricUnlock {
    pub vault_id: VaultId,
    pub mnemonic: MnemonicPhrase,
}

/// Biometric unlock bridge
pub struct BiometricBridge<S, A> {
    registry: VaultRegistry<S>,
    authenticator: A,
    timeout: Duration,
}

impl<S: KeyValueStore, A: PlatformAuthenticator> BiometricBridge<S, A> {
    pub fn new(registry: VaultRegistry<S>, authenticator: A) -> Self {
        Self {
            registry,
            authenticator,
            timeout: DEFAULT_PROMPT_TIMEOUT,
        }
    }

    /// Bridge whose prompts are bounded by the configured timeout
    pub fn from_config(registry: VaultRegistry<S>, authenticator: A, config: &AppConfig) -> Self {
        Self::new(registry, authenticator).with_timeout(config.biometric_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    pub fn is_available(&self) -> bool {
        self.authenticator.is_available()
    }

    /// Bind the currently unlocked vault to a new platform credential.
    ///
    /// Replaces any earlier binding for the same vault on this device.
    pub fn register_binding(
        &self,
        vault: &NotesVault<S>,
        label: &str,
    ) -> VaultResult<BiometricBinding> {
        if !self.authenticator.is_available() {
            return Err(VaultError::Unsupported);
        }

        let (vault_id, mnemonic) = vault.read(|s| Ok((s.vault_id.clone(), s.mnemonic.clone())))?;

        let params = CredentialParams {
            user_handle: vault_id.clone(),
            label: label.to_string(),
            timeout: self.timeout,
        };
        let grant = self.authenticator.create_credential(&params)?;

        let wrap_key = wrap_key(&grant.secret, &vault_id)?;
        let sealed = seal_xchacha(
            &wrap_key,
            mnemonic.expose().as_bytes(),
            vault_id.as_str().as_bytes(),
        )?;

        let binding = BiometricBinding {
            vault_id: vault_id.clone(),
            credential_id: grant.credential_id,
            label: label.to_string(),
            created_at: Utc::now(),
            wrapped_secret: sealed.to_base64(),
        };

        let doc = serde_json::to_vec(&BindingDocument::V1(binding.clone()))?;
        self.registry.store_binding(&vault_id, doc)?;

        log::info!("Biometric binding registered for vault {}", vault_id);
        Ok(binding)
    }

    /// Recover a mnemonic through the platform authenticator.
    ///
    /// With candidates (scoped mode) only their credentials are offered.
    /// Without candidates, or with an empty list, every binding on this
    /// device is eligible (discoverable mode).
    pub fn authenticate(&self, candidates: Option<&[VaultId]>) -> VaultResult<BiometricUnlock> {
        if !self.authenticator.is_available() {
            return Err(VaultError::Unsupported);
        }

        let (bindings, scoped) = match candidates {
            Some(ids) if !ids.is_empty() => {
                let mut found = Vec::new();
                for id in ids {
                    match self.load_binding(id) {
                        Ok(Some(binding)) => found.push(binding),
                        Ok(None) => {}
                        Err(VaultError::CorruptData(e)) => {
                            log::warn!("Skipping binding for vault {}: {}", id, e)
                        }
                        Err(e) => return Err(e),
                    }
                }
                (found, true)
            }
            _ => (self.list_bindings()?, false),
        };

        if bindings.is_empty() {
            return Err(VaultError::NoMatch);
        }

        let allowed: Vec<CredentialId> = bindings.iter().map(|b| b.credential_id.clone()).collect();
        let offered = if scoped { Some(allowed.as_slice()) } else { None };

        let grant = self.authenticator.get_assertion(offered, self.timeout)?;

        let binding = bindings
            .iter()
            .find(|b| b.credential_id == grant.credential_id)
            .ok_or(VaultError::NoMatch)?;

        let mnemonic = unwrap_mnemonic(binding, &grant.secret)?;
        log::info!("Biometric unlock for vault {}", binding.vault_id);

        Ok(BiometricUnlock {
            vault_id: binding.vault_id.clone(),
            mnemonic,
        })
    }

    /// Authenticate and open the resulting vault in one step
    pub fn unlock_vault(
        &self,
        vault: &NotesVault<S>,
        candidates: Option<&[VaultId]>,
    ) -> VaultResult<Profile> {
        let unlocked = self.authenticate(candidates)?;
        vault.unlock_with(unlocked.mnemonic, None)
    }

    pub fn remove_binding(&self, id: &VaultId) -> VaultResult<()> {
        self.registry.remove_binding(id)?;
        log::info!("Biometric binding removed for vault {}", id);
        Ok(())
    }

    /// Every readable binding on this device. Unreadable records are skipped.
    pub fn list_bindings(&self) -> VaultResult<Vec<BiometricBinding>> {
        let keys = self.registry.store().list_keys_with_prefix(binding_prefix())?;
        let mut bindings = Vec::with_capacity(keys.len());

        for raw in keys {
            let Some(id) = binding_owner(&raw) else {
                log::warn!("Ignoring malformed binding key {:?}", raw);
                continue;
            };
            match self.load_binding(&id) {
                Ok(Some(binding)) => bindings.push(binding),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping binding for vault {}: {}", id, e),
            }
        }
        Ok(bindings)
    }

    pub fn load_binding(&self, id: &VaultId) -> VaultResult<Option<BiometricBinding>> {
        let key = namespaced_key(id, StorageKind::BiometricBinding);
        let Some(bytes) = self.registry.store().get(&key)? else {
            return Ok(None);
        };

        let binding = match serde_json::from_slice::<BindingDocument>(&bytes) {
            Ok(BindingDocument::V1(binding)) => binding,
            Err(e) => return Err(VaultError::CorruptData(format!("binding {}: {}", id, e))),
        };

        if &binding.vault_id != id {
            return Err(VaultError::CorruptData(format!(
                "binding stored under {} belongs to {}",
                id, binding.vault_id
            )));
        }
        Ok(Some(binding))
    }
}

fn wrap_key(secret: &VaultKey, id: &VaultId) -> VaultResult<VaultKey> {
    derive_subkey(secret.expose(), id.as_str().as_bytes(), contexts::BIOMETRIC_WRAP)
}

fn unwrap_mnemonic(binding: &BiometricBinding, secret: &VaultKey) -> VaultResult<MnemonicPhrase> {
    let aad = binding.vault_id.as_str().as_bytes();
    let key = wrap_key(secret, &binding.vault_id)?;
    let sealed = EncryptedData::from_base64(&binding.wrapped_secret, XCHACHA_NONCE_LEN)?;
    let plaintext = open_xchacha(&key, &sealed, aad)?;

    let phrase = std::str::from_utf8(&plaintext)
        .map_err(|_| VaultError::CorruptData("wrapped mnemonic is not text".into()))?;
    let mnemonic = MnemonicPhrase::parse(phrase)
        .map_err(|_| VaultError::CorruptData("wrapped mnemonic is invalid".into()))?;

    if derive_vault_id(&mnemonic) != binding.vault_id {
        return Err(VaultError::CorruptData(format!(
            "binding for {} unwraps to another vault",
            binding.vault_id
        )));
    }
    Ok(mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::note::Note;
    use crate::storage::MemoryStore;

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";
    const LEGAL: &str = "legal winner thank year wave sausage worth useful \
                         legal winner thank yellow";

    /// Scriptable stand-in for a platform authenticator
    #[derive(Default)]
    struct MockAuthenticator {
        unavailable: bool,
        credentials: Mutex<Vec<(CredentialId, [u8; 32])>>,
        /// Credential the "user" presents at the next prompt
        present: Mutex<Option<CredentialId>>,
        fail_with: Mutex<Option<AuthenticatorError>>,
        offered: Mutex<Option<Option<Vec<CredentialId>>>>,
        last_timeout: Mutex<Option<Duration>>,
        prompts: AtomicUsize,
    }

    impl MockAuthenticator {
        fn present(&self, id: &CredentialId) {
            *self.present.lock() = Some(id.clone());
        }
    }

    impl PlatformAuthenticator for MockAuthenticator {
        fn is_available(&self) -> bool {
            !self.unavailable
        }

        fn create_credential(
            &self,
            _: &CredentialParams,
        ) -> Result<CredentialGrant, AuthenticatorError> {
            let id = CredentialId::new(uuid::Uuid::new_v4().as_bytes().to_vec());
            let secret = VaultKey::generate();
            self.credentials.lock().push((id.clone(), *secret.expose()));
            self.present(&id);
            Ok(CredentialGrant {
                credential_id: id,
                secret,
            })
        }

        fn get_assertion(
            &self,
            allowed: Option<&[CredentialId]>,
            timeout: Duration,
        ) -> Result<CredentialGrant, AuthenticatorError> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            *self.last_timeout.lock() = Some(timeout);
            *self.offered.lock() = Some(allowed.map(|a| a.to_vec()));

            if let Some(e) = self.fail_with.lock().take() {
                return Err(e);
            }

            let id = self
                .present
                .lock()
                .clone()
                .ok_or_else(|| AuthenticatorError::NotAllowed("no credential".into()))?;
            if let Some(allowed) = allowed {
                if !allowed.contains(&id) {
                    return Err(AuthenticatorError::NotAllowed("not offered".into()));
                }
            }

            let secret = self
                .credentials
                .lock()
                .iter()
                .find(|(c, _)| c == &id)
                .map(|(_, s)| *s)
                .ok_or_else(|| AuthenticatorError::Failed("unknown credential".into()))?;

            Ok(CredentialGrant {
                credential_id: id,
                secret: VaultKey::new(secret),
            })
        }
    }

    fn setup() -> (NotesVault<MemoryStore>, BiometricBridge<MemoryStore, MockAuthenticator>) {
        let vault = NotesVault::new(Arc::new(MemoryStore::new()));
        let bridge = BiometricBridge::new(vault.registry().clone(), MockAuthenticator::default());
        (vault, bridge)
    }

    fn vid(s: &str) -> VaultId {
        VaultId::parse(s).unwrap()
    }

    #[test]
    fn test_discoverable_roundtrip() {
        let (vault, bridge) = setup();
        vault.unlock(ABANDON, None).unwrap();
        vault.add_note(Note::new("kept", "across unlock")).unwrap();
        let binding = bridge.register_binding(&vault, "Pixel").unwrap();
        vault.lock();

        assert!(!binding.wrapped_secret.contains("abandon"));

        let unlocked = bridge.authenticate(None).unwrap();
        assert_eq!(unlocked.vault_id.as_str(), "c557eec878dfd852");
        assert_eq!(unlocked.mnemonic.expose(), MnemonicPhrase::parse(ABANDON).unwrap().expose());
        assert_eq!(*bridge.authenticator().offered.lock(), Some(None));

        bridge.unlock_vault(&vault, None).unwrap();
        assert_eq!(vault.notes().unwrap()[0].title, "kept");
    }

    #[test]
    fn test_scoped_offers_only_candidates() {
        let (vault, bridge) = setup();
        vault.unlock(ABANDON, None).unwrap();
        let a = bridge.register_binding(&vault, "a").unwrap();
        vault.unlock(LEGAL, None).unwrap();
        let b = bridge.register_binding(&vault, "b").unwrap();
        vault.lock();

        bridge.authenticator().present(&a.credential_id);
        let unlocked = bridge.authenticate(Some(&[a.vault_id.clone()])).unwrap();
        assert_eq!(unlocked.vault_id, a.vault_id);
        assert_eq!(
            *bridge.authenticator().offered.lock(),
            Some(Some(vec![a.credential_id.clone()]))
        );

        // User presents A's credential while only B is offered
        let result = bridge.authenticate(Some(&[b.vault_id.clone()]));
        assert!(matches!(result, Err(VaultError::NoMatch)));
    }

    #[test]
    fn test_empty_candidates_without_bindings_is_no_match() {
        let (_vault, bridge) = setup();

        assert!(matches!(bridge.authenticate(Some(&[])), Err(VaultError::NoMatch)));
        assert!(matches!(bridge.authenticate(None), Err(VaultError::NoMatch)));
        assert_eq!(bridge.authenticator().prompts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_candidate_is_no_match() {
        let (vault, bridge) = setup();
        vault.unlock(ABANDON, None).unwrap();
        bridge.register_binding(&vault, "a").unwrap();

        let result = bridge.authenticate(Some(&[vid("0123456789abcdef")]));
        assert!(matches!(result, Err(VaultError::NoMatch)));
    }

    #[test]
    fn test_unsupported_fails_before_prompt() {
        let vault = NotesVault::new(Arc::new(MemoryStore::new()));
        let mock = MockAuthenticator {
            unavailable: true,
            ..Default::default()
        };
        let bridge = BiometricBridge::new(vault.registry().clone(), mock);
        vault.unlock(ABANDON, None).unwrap();

        assert!(matches!(
            bridge.register_binding(&vault, "x"),
            Err(VaultError::Unsupported)
        ));
        assert!(matches!(bridge.authenticate(None), Err(VaultError::Unsupported)));
        assert_eq!(bridge.authenticator().prompts.load(Ordering::SeqCst), 0);

        let none = BiometricBridge::new(vault.registry().clone(), UnavailableAuthenticator);
        assert!(matches!(none.authenticate(Some(&[])), Err(VaultError::Unsupported)));
    }

    #[test]
    fn test_cancel_is_retryable() {
        let (vault, bridge) = setup();
        vault.unlock(ABANDON, None).unwrap();
        bridge.register_binding(&vault, "a").unwrap();

        *bridge.authenticator().fail_with.lock() = Some(AuthenticatorError::Cancelled);
        let err = bridge.authenticate(None).unwrap_err();
        assert!(matches!(err, VaultError::UserCancelled));
        assert!(err.is_retryable());

        *bridge.authenticator().fail_with.lock() = Some(AuthenticatorError::TimedOut);
        assert!(matches!(bridge.authenticate(None), Err(VaultError::NoMatch)));

        assert!(bridge.authenticate(None).is_ok());
    }

    #[test]
    fn test_register_requires_unlocked_vault() {
        let (vault, bridge) = setup();
        assert!(matches!(
            bridge.register_binding(&vault, "x"),
            Err(VaultError::VaultLocked)
        ));
    }

    #[test]
    fn test_profile_flag_tracks_binding() {
        let (vault, bridge) = setup();
        let profile = vault.unlock(ABANDON, None).unwrap();
        assert!(!profile.has_biometric);

        bridge.register_binding(&vault, "a").unwrap();
        let registry = vault.registry();
        assert!(registry.get_profile(&profile.vault_id).unwrap().unwrap().has_biometric);

        bridge.remove_binding(&profile.vault_id).unwrap();
        assert!(!registry.get_profile(&profile.vault_id).unwrap().unwrap().has_biometric);
        assert!(bridge.list_bindings().unwrap().is_empty());
    }

    #[test]
    fn test_destroy_removes_binding() {
        let (vault, bridge) = setup();
        let profile = vault.unlock(ABANDON, None).unwrap();
        bridge.register_binding(&vault, "a").unwrap();

        vault.destroy(&profile.vault_id).unwrap();
        assert!(bridge.load_binding(&profile.vault_id).unwrap().is_none());
        assert!(matches!(bridge.authenticate(None), Err(VaultError::NoMatch)));
    }

    #[test]
    fn test_tampered_binding_fails_authentication() {
        let (vault, bridge) = setup();
        let profile = vault.unlock(ABANDON, None).unwrap();
        let mut binding = bridge.register_binding(&vault, "a").unwrap();

        let mut raw = base64::engine::general_purpose::STANDARD
            .decode(&binding.wrapped_secret)
            .unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        binding.wrapped_secret = base64::engine::general_purpose::STANDARD.encode(&raw);

        let doc = serde_json::to_vec(&BindingDocument::V1(binding)).unwrap();
        vault
            .registry()
            .store()
            .set(&namespaced_key(&profile.vault_id, StorageKind::BiometricBinding), &doc)
            .unwrap();

        assert!(matches!(
            bridge.authenticate(None),
            Err(VaultError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_binding_under_wrong_key_is_corrupt() {
        let (vault, bridge) = setup();
        vault.unlock(ABANDON, None).unwrap();
        let binding = bridge.register_binding(&vault, "a").unwrap();

        let other = vid("ecb0e7ba498c5920");
        let doc = serde_json::to_vec(&BindingDocument::V1(binding)).unwrap();
        vault
            .registry()
            .store()
            .set(&namespaced_key(&other, StorageKind::BiometricBinding), &doc)
            .unwrap();

        assert!(matches!(bridge.load_binding(&other), Err(VaultError::CorruptData(_))));
        // Enumeration skips it and still finds the good one
        assert_eq!(bridge.list_bindings().unwrap().len(), 1);
    }

    #[test]
    fn test_scoped_skips_corrupt_candidate() {
        let (vault, bridge) = setup();
        vault.unlock(ABANDON, None).unwrap();
        let good = bridge.register_binding(&vault, "good").unwrap();
        vault.lock();

        let broken = vid("0123456789abcdef");
        vault
            .registry()
            .store()
            .set(&namespaced_key(&broken, StorageKind::BiometricBinding), b"garbage")
            .unwrap();

        let unlocked = bridge
            .authenticate(Some(&[broken.clone(), good.vault_id.clone()]))
            .unwrap();
        assert_eq!(unlocked.vault_id, good.vault_id);
        assert_eq!(
            *bridge.authenticator().offered.lock(),
            Some(Some(vec![good.credential_id.clone()]))
        );

        // Nothing usable left among the candidates
        assert!(matches!(
            bridge.authenticate(Some(&[broken])),
            Err(VaultError::NoMatch)
        ));
    }

    #[test]
    fn test_configured_timeout_reaches_prompt() {
        let vault = NotesVault::new(Arc::new(MemoryStore::new()));
        let config = AppConfig::from_json(r#"{ "biometric_timeout_secs": 12 }"#).unwrap();
        let bridge = BiometricBridge::from_config(
            vault.registry().clone(),
            MockAuthenticator::default(),
            &config,
        );
        vault.unlock(ABANDON, None).unwrap();
        bridge.register_binding(&vault, "a").unwrap();

        bridge.authenticate(None).unwrap();
        assert_eq!(
            *bridge.authenticator().last_timeout.lock(),
            Some(Duration::from_secs(12))
        );

        let (_vault, default) = setup();
        assert_eq!(default.timeout, DEFAULT_PROMPT_TIMEOUT);
    }

    #[test]
    fn test_credential_id_serde() {
        let id = CredentialId::new(vec![0xfb, 0xff, 0x00]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"-_8A\"");
        assert_eq!(serde_json::from_str::<CredentialId>(&json).unwrap(), id);
    }
}
