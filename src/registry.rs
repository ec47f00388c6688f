//! ALFA Notes Vault - Vault Registry
//!
//! Device-wide list of known vaults plus the single source of storage keys.
//!
//! ```text
//! registry/profiles        versioned list of Profile records
//! vault/<id>/notes         Encrypted Vault Blob (base64)
//! biometric/<id>           Biometric Binding
//! ```
//!
//! Nothing outside this module can build a [`StorageKey`], so every read or
//! write of vault content is scoped by a [`VaultId`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::crypto::VaultId;
use crate::error::{VaultError, VaultResult};
use crate::storage::{KeyValueStore, WriteOp};

const PROFILES_KEY: &str = "registry/profiles";
const VAULT_PREFIX: &str = "vault/";
const BINDING_PREFIX: &str = "biometric/";

/// Longest display name we keep, in characters
pub const MAX_NAME_CHARS: usize = 64;

// ═══════════════════════════════════════════════════════════════════════════
// STORAGE KEYS
// ═══════════════════════════════════════════════════════════════════════════

/// What a namespaced key points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// The vault's encrypted note collection
    Notes,
    /// The vault's biometric binding on this device
    BiometricBinding,
}

/// Opaque storage key. Only constructible inside this module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Key for one kind of per-vault record
pub fn namespaced_key(id: &VaultId, kind: StorageKind) -> StorageKey {
    match kind {
        StorageKind::Notes => StorageKey(format!("{}{}/notes", VAULT_PREFIX, id)),
        StorageKind::BiometricBinding => StorageKey(format!("{}{}", BINDING_PREFIX, id)),
    }
}

fn profiles_key() -> StorageKey {
    StorageKey(PROFILES_KEY.to_string())
}

/// Recover the vault id from a raw binding key listed by the store
pub(crate) fn binding_owner(raw_key: &str) -> Option<VaultId> {
    raw_key
        .strip_prefix(BINDING_PREFIX)
        .and_then(|id| VaultId::parse(id).ok())
}

pub(crate) fn binding_prefix() -> &'static str {
    BINDING_PREFIX
}

// ═══════════════════════════════════════════════════════════════════════════
// PROFILES
// ═══════════════════════════════════════════════════════════════════════════

/// Display metadata for one vault on this device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub vault_id: VaultId,
    pub display_name: String,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub has_biometric: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "version")]
enum ProfilesDocument {
    #[serde(rename = "1")]
    V1 { profiles: Vec<Profile> },
}

/// Device-wide registry of vault profiles
pub struct VaultRegistry<S> {
    store: Arc<S>,
    // Serializes read-modify-write of the profile list
    write_lock: Arc<Mutex<()>>,
}

impl<S> Clone for VaultRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl<S: KeyValueStore> VaultRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Underlying store, for components that hold keys minted here
    pub fn store(&self) -> &S {
        &self.store
    }

    /// All known profiles, most recently active first
    pub fn list_profiles(&self) -> VaultResult<Vec<Profile>> {
        let mut profiles = self.load()?;
        profiles.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        Ok(profiles)
    }

    pub fn get_profile(&self, id: &VaultId) -> VaultResult<Option<Profile>> {
        Ok(self.load()?.into_iter().find(|p| &p.vault_id == id))
    }

    /// Record a successful unlock.
    ///
    /// An unseen identity gets a new profile named `name` (or `Vault N` when
    /// absent), disambiguated against existing names. A known identity only
    /// has its activity timestamp bumped; `name` is ignored.
    pub fn upsert_profile(&self, id: &VaultId, name: Option<&str>) -> VaultResult<Profile> {
        let _guard = self.write_lock.lock();
        let mut profiles = self.load()?;
        let now = Utc::now();

        if let Some(existing) = profiles.iter_mut().find(|p| &p.vault_id == id) {
            existing.last_active = now;
            let updated = existing.clone();
            self.save(profiles)?;
            return Ok(updated);
        }

        let base = match name.map(clean_name).transpose()? {
            Some(chosen) => chosen,
            None => format!("Vault {}", profiles.len() + 1),
        };
        let taken: Vec<&str> = profiles.iter().map(|p| p.display_name.as_str()).collect();
        let display_name = unique_display_name(&base, &taken);

        let profile = Profile {
            vault_id: id.clone(),
            display_name,
            last_active: now,
            created_at: now,
            has_biometric: false,
        };
        log::info!("Registered vault {} as {:?}", id, profile.display_name);

        profiles.push(profile.clone());
        self.save(profiles)?;
        Ok(profile)
    }

    /// Explicit rename. Fails with `NameTaken` if another vault uses the name.
    pub fn rename_profile(&self, id: &VaultId, name: &str) -> VaultResult<Profile> {
        let _guard = self.write_lock.lock();
        let mut profiles = self.load()?;
        let name = clean_name(name)?;

        let clash = profiles
            .iter()
            .any(|p| &p.vault_id != id && same_name(&p.display_name, &name));
        if clash {
            return Err(VaultError::NameTaken(name));
        }

        let profile = profiles
            .iter_mut()
            .find(|p| &p.vault_id == id)
            .ok_or_else(|| VaultError::ProfileNotFound(id.to_string()))?;
        profile.display_name = name;
        let updated = profile.clone();

        self.save(profiles)?;
        Ok(updated)
    }

    pub fn set_biometric_flag(&self, id: &VaultId, enabled: bool) -> VaultResult<()> {
        let _guard = self.write_lock.lock();
        let mut profiles = self.load()?;

        match profiles.iter_mut().find(|p| &p.vault_id == id) {
            Some(profile) if profile.has_biometric != enabled => {
                profile.has_biometric = enabled;
                self.save(profiles)
            }
            Some(_) => Ok(()),
            None => Err(VaultError::ProfileNotFound(id.to_string())),
        }
    }

    /// Store a biometric binding record and raise the profile's flag in one
    /// atomic batch. The profile must exist.
    pub fn store_binding(&self, id: &VaultId, record: Vec<u8>) -> VaultResult<()> {
        let _guard = self.write_lock.lock();
        let mut profiles = self.load()?;

        let profile = profiles
            .iter_mut()
            .find(|p| &p.vault_id == id)
            .ok_or_else(|| VaultError::ProfileNotFound(id.to_string()))?;
        profile.has_biometric = true;

        let batch = [
            WriteOp::Set(namespaced_key(id, StorageKind::BiometricBinding), record),
            WriteOp::Set(profiles_key(), encode(profiles)?),
        ];
        self.store.apply(&batch)
    }

    /// Drop a biometric binding and clear the profile's flag together.
    /// A missing profile only removes the record.
    pub fn remove_binding(&self, id: &VaultId) -> VaultResult<()> {
        let _guard = self.write_lock.lock();
        let mut profiles = self.load()?;

        let mut batch = vec![WriteOp::Delete(namespaced_key(id, StorageKind::BiometricBinding))];
        if let Some(profile) = profiles.iter_mut().find(|p| &p.vault_id == id) {
            profile.has_biometric = false;
            batch.push(WriteOp::Set(profiles_key(), encode(profiles)?));
        }
        self.store.apply(&batch)
    }

    /// Destroy everything stored for `id`: profile, encrypted blob and
    /// biometric binding, in one atomic batch. Irreversible.
    pub fn delete_profile(&self, id: &VaultId) -> VaultResult<()> {
        let _guard = self.write_lock.lock();
        let mut profiles = self.load()?;
        profiles.retain(|p| &p.vault_id != id);

        let batch = [
            WriteOp::Delete(namespaced_key(id, StorageKind::Notes)),
            WriteOp::Delete(namespaced_key(id, StorageKind::BiometricBinding)),
            WriteOp::Set(profiles_key(), encode(profiles)?),
        ];
        self.store.apply(&batch)?;

        log::warn!("Vault {} destroyed", id);
        Ok(())
    }

    fn load(&self) -> VaultResult<Vec<Profile>> {
        let Some(bytes) = self.store.get(&profiles_key())? else {
            return Ok(Vec::new());
        };

        match serde_json::from_slice::<ProfilesDocument>(&bytes) {
            Ok(ProfilesDocument::V1 { profiles }) => Ok(profiles),
            Err(e) => Err(VaultError::CorruptData(format!("profile registry: {}", e))),
        }
    }

    fn save(&self, profiles: Vec<Profile>) -> VaultResult<()> {
        self.store.set(&profiles_key(), &encode(profiles)?)
    }
}

fn encode(profiles: Vec<Profile>) -> VaultResult<Vec<u8>> {
    Ok(serde_json::to_vec(&ProfilesDocument::V1 { profiles })?)
}

fn clean_name(name: &str) -> VaultResult<String> {
    let trimmed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(VaultError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// First of `base`, `base (2)`, `base (3)`, ... not already in `existing`.
/// Comparison ignores case.
pub fn unique_display_name(base: &str, existing: &[&str]) -> String {
    let taken = |candidate: &str| existing.iter().any(|e| same_name(e, candidate));

    if !taken(base) {
        return base.to_string();
    }

    // The base is shortened so the suffix never pushes past MAX_NAME_CHARS
    (2..)
        .map(|n| {
            let suffix = format!(" ({})", n);
            let keep = MAX_NAME_CHARS.saturating_sub(suffix.chars().count());
            let stem: String = base.chars().take(keep).collect();
            format!("{}{}", stem.trim_end(), suffix)
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
