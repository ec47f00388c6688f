//! ALFA Notes Vault - Vault Session
//!
//! Unlock with a mnemonic, mutate notes in memory, re-encrypt on every
//! change. Locking drops the key and phrase; only ciphertext stays behind.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::{decrypt, derive_key, derive_vault_id, encrypt, MnemonicPhrase, VaultId, VaultKey};
use crate::error::{VaultError, VaultResult};
use crate::note::{export_notes, import_notes, merge_notes, MergeReport, Note, NoteUpdate};
use crate::ranker::{rank, RankedNote};
use crate::registry::{namespaced_key, Profile, StorageKind, VaultRegistry};
use crate::storage::KeyValueStore;

/// Vault state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    Locked,
    Unlocked,
}

#[derive(Serialize)]
#[serde(tag = "version")]
enum VaultDocumentRef<'a> {
    #[serde(rename = "1")]
    V1 { notes: &'a [Note] },
}

#[derive(Deserialize)]
#[serde(tag = "version")]
enum VaultDocument {
    #[serde(rename = "1")]
    V1 { notes: Vec<Note> },
}

// Early vaults stored the bare note array
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDocument {
    Versioned(VaultDocument),
    Legacy(Vec<Note>),
}

/// Everything that exists only while a vault is unlocked
pub(crate) struct Session {
    pub(crate) vault_id: VaultId,
    key: VaultKey,
    pub(crate) mnemonic: MnemonicPhrase,
    notes: Vec<Note>,
    /// In-memory changes not yet persisted
    dirty: bool,
}

/// Notes Vault - one unlocked vault at a time over a shared store
pub struct NotesVault<S> {
    registry: VaultRegistry<S>,
    session: RwLock<Option<Session>>,
}

impl<S: KeyValueStore> NotesVault<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_registry(VaultRegistry::new(store))
    }

    pub fn with_registry(registry: VaultRegistry<S>) -> Self {
        Self {
            registry,
            session: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &VaultRegistry<S> {
        &self.registry
    }

    // ═══════════════════════════════════════════════════════════════════════
    // UNLOCK / LOCK
    // ═══════════════════════════════════════════════════════════════════════

    /// Unlock (or create) the vault belonging to `phrase`.
    ///
    /// A phrase nobody has used before opens an empty vault and registers a
    /// profile for it; `display_name` is only used in that case.
    pub fn unlock(&self, phrase: &str, display_name: Option<&str>) -> VaultResult<Profile> {
        let mnemonic = MnemonicPhrase::parse(phrase)?;
        self.unlock_with(mnemonic, display_name)
    }

    /// Unlock with an already validated phrase (e.g. from biometric unlock)
    pub fn unlock_with(
        &self,
        mnemonic: MnemonicPhrase,
        display_name: Option<&str>,
    ) -> VaultResult<Profile> {
        let key = derive_key(&mnemonic)?;
        let vault_id = derive_vault_id(&mnemonic);

        // Unsaved changes of the open session must reach storage before it is replaced
        let mut guard = self.session.write();
        if let Some(prev) = guard.as_mut().filter(|s| s.dirty) {
            if let Err(e) = self.save(prev) {
                return Err(VaultError::StorageFailure(format!(
                    "vault {} has unsaved changes: {}",
                    prev.vault_id, e
                )));
            }
        }

        let notes = self.load_notes(&vault_id, &key)?;
        let profile = self.registry.upsert_profile(&vault_id, display_name)?;

        log::info!("Vault {} unlocked ({} notes)", vault_id, notes.len());

        *guard = Some(Session {
            vault_id,
            key,
            mnemonic,
            notes,
            dirty: false,
        });

        Ok(profile)
    }

    /// Lock the vault, wiping key and phrase from memory
    pub fn lock(&self) {
        if let Some(session) = self.session.write().take() {
            warn_if_dirty(&session);
            log::info!("Vault {} locked", session.vault_id);
        }
    }

    pub fn state(&self) -> VaultState {
        if self.session.read().is_some() {
            VaultState::Unlocked
        } else {
            VaultState::Locked
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.state() == VaultState::Unlocked
    }

    /// Identity of the unlocked vault
    pub fn active_vault(&self) -> Option<VaultId> {
        self.session.read().as_ref().map(|s| s.vault_id.clone())
    }

    /// True when the last persist failed and memory is ahead of storage
    pub fn has_unsaved_changes(&self) -> bool {
        self.session.read().as_ref().map_or(false, |s| s.dirty)
    }

    /// Destroy a vault: profile, encrypted notes and biometric binding.
    /// Locks first if it is the one currently open.
    pub fn destroy(&self, id: &VaultId) -> VaultResult<()> {
        {
            let mut session = self.session.write();
            if session.as_ref().map_or(false, |s| &s.vault_id == id) {
                *session = None;
            }
        }
        self.registry.delete_profile(id)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // NOTE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Snapshot of the decrypted collection
    pub fn notes(&self) -> VaultResult<Vec<Note>> {
        self.read(|s| Ok(s.notes.clone()))
    }

    pub fn get_note(&self, id: &str) -> VaultResult<Note> {
        self.read(|s| {
            s.notes
                .iter()
                .find(|n| n.id == id)
                .cloned()
                .ok_or_else(|| VaultError::NoteNotFound(id.to_string()))
        })
    }

    /// Add a note and persist. Returns its id.
    pub fn add_note(&self, note: Note) -> VaultResult<String> {
        self.mutate(|notes| {
            let id = note.id.clone();
            notes.push(note);
            Ok(id)
        })
    }

    pub fn update_note(&self, id: &str, update: NoteUpdate) -> VaultResult<Note> {
        self.mutate(|notes| {
            let note = notes
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| VaultError::NoteNotFound(id.to_string()))?;
            note.apply(update);
            Ok(note.clone())
        })
    }

    pub fn delete_note(&self, id: &str) -> VaultResult<Note> {
        self.mutate(|notes| {
            let pos = notes
                .iter()
                .position(|n| n.id == id)
                .ok_or_else(|| VaultError::NoteNotFound(id.to_string()))?;
            Ok(notes.remove(pos))
        })
    }

    /// `(id, text)` for every note still waiting for an embedding
    pub fn pending_embeddings(&self) -> VaultResult<Vec<(String, String)>> {
        self.read(|s| {
            Ok(s.notes
                .iter()
                .filter(|n| n.vector.is_none())
                .map(|n| (n.id.clone(), n.embedding_text()))
                .filter(|(_, text)| !text.is_empty())
                .collect())
        })
    }

    /// Store computed vectors. A vector is dropped if its note was deleted
    /// or edited since `text` was read.
    pub fn apply_vectors(&self, vectors: Vec<(String, String, Vec<f32>)>) -> VaultResult<usize> {
        self.mutate(|notes| {
            let mut applied = 0;
            for (id, text, vector) in vectors {
                if let Some(note) = notes.iter_mut().find(|n| n.id == id) {
                    if note.vector.is_none() && note.embedding_text() == text {
                        note.vector = Some(vector);
                        applied += 1;
                    }
                }
            }
            Ok(applied)
        })
    }

    /// Rank the collection against a query
    pub fn search(
        &self,
        query_vector: Option<&[f32]>,
        query_text: &str,
        selected_tags: &[String],
    ) -> VaultResult<Vec<RankedNote>> {
        self.read(|s| Ok(rank(&s.notes, query_vector, query_text, selected_tags)))
    }

    /// Plaintext JSON export of the open vault
    pub fn export(&self) -> VaultResult<String> {
        self.read(|s| export_notes(&s.notes))
    }

    /// Merge an exported document into the open vault
    pub fn import(&self, json: &str) -> VaultResult<MergeReport> {
        let incoming = import_notes(json)?;
        self.mutate(|notes| Ok(merge_notes(notes, incoming)))
    }

    /// Re-encrypt and store the collection
    pub fn persist(&self) -> VaultResult<()> {
        let mut guard = self.session.write();
        let session = guard.as_mut().ok_or(VaultError::VaultLocked)?;
        self.save(session)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // INTERNAL
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn read<T>(&self, f: impl FnOnce(&Session) -> VaultResult<T>) -> VaultResult<T> {
        let guard = self.session.read();
        let session = guard.as_ref().ok_or(VaultError::VaultLocked)?;
        f(session)
    }

    // A failed save leaves the change in memory, flagged dirty, so the next
    // successful persist catches storage up.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<Note>) -> VaultResult<T>) -> VaultResult<T> {
        let mut guard = self.session.write();
        let session = guard.as_mut().ok_or(VaultError::VaultLocked)?;

        let out = f(&mut session.notes)?;
        session.dirty = true;
        self.save(session)?;
        Ok(out)
    }

    fn save(&self, session: &mut Session) -> VaultResult<()> {
        let json = Zeroizing::new(serde_json::to_vec(&VaultDocumentRef::V1 {
            notes: &session.notes,
        })?);
        let blob = encrypt(&json, &session.key)?;
        let key = namespaced_key(&session.vault_id, StorageKind::Notes);

        if let Err(e) = self.registry.store().set(&key, blob.as_bytes()) {
            session.dirty = true;
            log::error!("Failed to persist vault {}: {}", session.vault_id, e);
            return Err(e);
        }

        session.dirty = false;
        Ok(())
    }

    fn load_notes(&self, id: &VaultId, key: &VaultKey) -> VaultResult<Vec<Note>> {
        let storage_key = namespaced_key(id, StorageKind::Notes);
        let Some(bytes) = self.registry.store().get(&storage_key)? else {
            return Ok(Vec::new());
        };

        let blob = std::str::from_utf8(&bytes).map_err(|_| VaultError::AuthenticationFailed)?;
        let plaintext = decrypt(blob, key)?;

        match serde_json::from_slice::<StoredDocument>(&plaintext) {
            Ok(StoredDocument::Versioned(VaultDocument::V1 { notes })) => Ok(notes),
            Ok(StoredDocument::Legacy(notes)) => Ok(notes),
            Err(_) => Err(VaultError::CorruptData(format!(
                "vault {} holds an unrecognised document",
                id
            ))),
        }
    }
}

fn warn_if_dirty(session: &Session) {
    if session.dirty {
        log::warn!(
            "Discarding unsaved changes for vault {}",
            session.vault_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::registry::StorageKey;
    use crate::storage::{MemoryStore, WriteOp};

    const ABANDON: &str = "abandon abandon abandon abandon abandon abandon \
                           abandon abandon abandon abandon abandon about";
    const LEGAL: &str = "legal winner thank year wave sausage worth useful \
                         legal winner thank yellow";

    /// MemoryStore whose writes can be switched off
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> VaultResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(VaultError::StorageFailure("disk full".into()))
            } else {
                Ok(())
            }
        }
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &StorageKey) -> VaultResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }
        fn set(&self, key: &StorageKey, value: &[u8]) -> VaultResult<()> {
            self.check()?;
            self.inner.set(key, value)
        }
        fn delete(&self, key: &StorageKey) -> VaultResult<()> {
            self.check()?;
            self.inner.delete(key)
        }
        fn list_keys_with_prefix(&self, prefix: &str) -> VaultResult<Vec<String>> {
            self.inner.list_keys_with_prefix(prefix)
        }
        fn apply(&self, batch: &[WriteOp]) -> VaultResult<()> {
            self.check()?;
            self.inner.apply(batch)
        }
    }

    fn vault() -> NotesVault<MemoryStore> {
        NotesVault::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_new_phrase_opens_empty_vault() {
        let vault = vault();
        let profile = vault.unlock(ABANDON, None).unwrap();

        assert_eq!(profile.vault_id.as_str(), "c557eec878dfd852");
        assert_eq!(profile.display_name, "Vault 1");
        assert!(vault.notes().unwrap().is_empty());
        assert!(vault.is_unlocked());
    }

    #[test]
    fn test_notes_survive_lock_unlock() {
        let vault = vault();
        vault.unlock(ABANDON, None).unwrap();
        let id = vault
            .add_note(Note::new("Groceries", "milk").with_tags(["home"]))
            .unwrap();
        vault.lock();

        assert!(matches!(vault.notes(), Err(VaultError::VaultLocked)));

        vault.unlock(ABANDON, None).unwrap();
        let notes = vault.notes().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, id);
        assert_eq!(notes[0].tags, vec!["home"]);
    }

    #[test]
    fn test_vaults_are_isolated() {
        let vault = vault();
        vault.unlock(ABANDON, None).unwrap();
        vault.add_note(Note::new("a", "only in abandon")).unwrap();

        vault.unlock(LEGAL, None).unwrap();
        assert!(vault.notes().unwrap().is_empty());
        assert_eq!(vault.registry().list_profiles().unwrap().len(), 2);
    }

    #[test]
    fn test_stored_blob_is_ciphertext() {
        let store = Arc::new(MemoryStore::new());
        let vault = NotesVault::new(Arc::clone(&store));
        let profile = vault.unlock(ABANDON, None).unwrap();
        vault.add_note(Note::new("secret title", "secret body")).unwrap();

        let raw = store
            .get(&namespaced_key(&profile.vault_id, StorageKind::Notes))
            .unwrap()
            .unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(!raw.contains("secret"));
    }

    #[test]
    fn test_invalid_phrase_derives_nothing() {
        let vault = vault();
        let result = vault.unlock("abandon abandon", None);

        assert!(matches!(result, Err(VaultError::InvalidMnemonic)));
        assert!(vault.registry().list_profiles().unwrap().is_empty());
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn test_tampered_blob_fails_authentication() {
        let store = Arc::new(MemoryStore::new());
        let vault = NotesVault::new(Arc::clone(&store));
        let profile = vault.unlock(ABANDON, None).unwrap();
        vault.add_note(Note::new("a", "b")).unwrap();
        vault.lock();

        let key = namespaced_key(&profile.vault_id, StorageKind::Notes);
        let mut raw = store.get(&key).unwrap().unwrap();
        // Swap one base64 character for another valid one
        raw[20] = if raw[20] == b'A' { b'B' } else { b'A' };
        store.set(&key, &raw).unwrap();

        assert!(matches!(
            vault.unlock(ABANDON, None),
            Err(VaultError::AuthenticationFailed)
        ));
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn test_legacy_array_document_loads() {
        let store = Arc::new(MemoryStore::new());
        let phrase = MnemonicPhrase::parse(ABANDON).unwrap();
        let key = derive_key(&phrase).unwrap();
        let id = derive_vault_id(&phrase);

        let legacy = serde_json::to_vec(&vec![Note::new("old", "format")]).unwrap();
        let blob = encrypt(&legacy, &key).unwrap();
        store
            .set(&namespaced_key(&id, StorageKind::Notes), blob.as_bytes())
            .unwrap();

        let vault = NotesVault::new(store);
        vault.unlock(ABANDON, None).unwrap();
        assert_eq!(vault.notes().unwrap()[0].title, "old");
    }

    #[test]
    fn test_unrecognised_document_is_corrupt() {
        let store = Arc::new(MemoryStore::new());
        let phrase = MnemonicPhrase::parse(ABANDON).unwrap();
        let key = derive_key(&phrase).unwrap();
        let id = derive_vault_id(&phrase);

        let blob = encrypt(br#"{"version":"99","notes":[]}"#, &key).unwrap();
        store
            .set(&namespaced_key(&id, StorageKind::Notes), blob.as_bytes())
            .unwrap();

        let vault = NotesVault::new(store);
        assert!(matches!(
            vault.unlock(ABANDON, None),
            Err(VaultError::CorruptData(_))
        ));
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let store = Arc::new(FlakyStore::default());
        let vault = NotesVault::new(Arc::clone(&store));
        vault.unlock(ABANDON, None).unwrap();

        store.failing.store(true, Ordering::SeqCst);
        let result = vault.add_note(Note::new("unsaved", "x"));
        assert!(matches!(result, Err(VaultError::StorageFailure(_))));
        assert_eq!(vault.notes().unwrap().len(), 1);
        assert!(vault.has_unsaved_changes());

        store.failing.store(false, Ordering::SeqCst);
        vault.persist().unwrap();
        assert!(!vault.has_unsaved_changes());

        vault.lock();
        vault.unlock(ABANDON, None).unwrap();
        assert_eq!(vault.notes().unwrap()[0].title, "unsaved");
    }

    #[test]
    fn test_switching_vaults_flushes_unsaved_changes() {
        let store = Arc::new(FlakyStore::default());
        let vault = NotesVault::new(Arc::clone(&store));
        let first = vault.unlock(ABANDON, None).unwrap();

        store.failing.store(true, Ordering::SeqCst);
        assert!(vault.add_note(Note::new("pending", "x")).is_err());
        assert!(vault.has_unsaved_changes());

        // Still failing: the switch is refused and the dirty session stays open
        assert!(matches!(
            vault.unlock(LEGAL, None),
            Err(VaultError::StorageFailure(_))
        ));
        assert_eq!(vault.active_vault(), Some(first.vault_id.clone()));
        assert!(vault.has_unsaved_changes());

        store.failing.store(false, Ordering::SeqCst);
        let second = vault.unlock(LEGAL, None).unwrap();
        assert_eq!(vault.active_vault(), Some(second.vault_id));
        assert!(!vault.has_unsaved_changes());

        vault.unlock(ABANDON, None).unwrap();
        let notes = vault.notes().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "pending");
    }

    #[test]
    fn test_update_and_delete() {
        let vault = vault();
        vault.unlock(ABANDON, None).unwrap();
        let id = vault.add_note(Note::new("t", "x")).unwrap();

        let updated = vault
            .update_note(
                &id,
                NoteUpdate {
                    title: Some("renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "renamed");

        vault.delete_note(&id).unwrap();
        assert!(matches!(vault.get_note(&id), Err(VaultError::NoteNotFound(_))));
        assert!(matches!(vault.delete_note(&id), Err(VaultError::NoteNotFound(_))));
    }

    #[test]
    fn test_stale_vectors_are_dropped() {
        let vault = vault();
        vault.unlock(ABANDON, None).unwrap();
        let a = vault.add_note(Note::new("a", "alpha")).unwrap();
        let b = vault.add_note(Note::new("b", "beta")).unwrap();

        let pending = vault.pending_embeddings().unwrap();
        assert_eq!(pending.len(), 2);

        // b is edited while its embedding is in flight
        vault
            .update_note(
                &b,
                NoteUpdate {
                    text: Some("beta, revised".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let vectors = pending
            .into_iter()
            .map(|(id, text)| (id, text, vec![1.0, 0.0]))
            .collect();
        assert_eq!(vault.apply_vectors(vectors).unwrap(), 1);

        assert!(vault.get_note(&a).unwrap().vector.is_some());
        assert!(vault.get_note(&b).unwrap().vector.is_none());
    }

    #[test]
    fn test_destroy_active_vault() {
        let vault = vault();
        let profile = vault.unlock(ABANDON, None).unwrap();
        vault.add_note(Note::new("a", "b")).unwrap();

        vault.destroy(&profile.vault_id).unwrap();

        assert!(!vault.is_unlocked());
        assert!(vault.registry().list_profiles().unwrap().is_empty());

        // Same phrase now opens a fresh, empty vault
        vault.unlock(ABANDON, None).unwrap();
        assert!(vault.notes().unwrap().is_empty());
    }

    #[test]
    fn test_export_import_between_vaults() {
        let vault = vault();
        vault.unlock(ABANDON, None).unwrap();
        vault.add_note(Note::new("shared", "note")).unwrap();
        let exported = vault.export().unwrap();

        vault.unlock(LEGAL, None).unwrap();
        let report = vault.import(&exported).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(vault.notes().unwrap()[0].title, "shared");
    }
}
