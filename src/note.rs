//! ALFA Notes Vault - Note Model
//!
//! Notes only ever exist inside a vault's decrypted collection. The JSON
//! shape (camelCase, millisecond timestamps) is also the export format.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// A file attached to a note, carried inline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Base64 payload
    pub data: String,
}

/// Single note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Embedding of the note's content; absent until indexed
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            text: text.into(),
            summary: None,
            vector: None,
            attachment: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = clean_tags(tags.into_iter().map(Into::into));
        self
    }

    /// Text sent to the embedding service
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![self.title.trim(), self.text.trim()];
        if let Some(summary) = &self.summary {
            parts.push(summary.trim());
        }
        parts.retain(|p| !p.is_empty());
        parts.join("\n\n")
    }

    /// True when every selected tag is on this note
    pub fn has_all_tags(&self, selected: &[String]) -> bool {
        selected.iter().all(|t| self.tags.contains(t))
    }

    /// Apply an edit. Content changes drop the stale vector.
    pub fn apply(&mut self, update: NoteUpdate) {
        let mut content_changed = false;

        if let Some(title) = update.title {
            content_changed |= title != self.title;
            self.title = title;
        }
        if let Some(text) = update.text {
            content_changed |= text != self.text;
            self.text = text;
        }
        if let Some(summary) = update.summary {
            content_changed |= summary != self.summary;
            self.summary = summary;
        }
        if let Some(tags) = update.tags {
            self.tags = clean_tags(tags);
        }
        if let Some(attachment) = update.attachment {
            self.attachment = attachment;
        }

        if content_changed {
            self.vector = None;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial edit of a note; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub text: Option<String>,
    pub summary: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub attachment: Option<Option<Attachment>>,
}

fn clean_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Every distinct tag across a collection, sorted
pub fn all_tags(notes: &[Note]) -> Vec<String> {
    let mut tags: Vec<String> = notes.iter().flat_map(|n| n.tags.iter().cloned()).collect();
    tags.sort();
    tags.dedup();
    tags
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPORT / IMPORT
// ═══════════════════════════════════════════════════════════════════════════

/// Outcome of merging an imported collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Plaintext export: a JSON array of notes
pub fn export_notes(notes: &[Note]) -> VaultResult<String> {
    Ok(serde_json::to_string_pretty(notes)?)
}

/// Parse an exported document
pub fn import_notes(json: &str) -> VaultResult<Vec<Note>> {
    serde_json::from_str(json)
        .map_err(|e| VaultError::SerializationError(format!("import: {}", e)))
}

/// Merge `incoming` into `existing` by id; the newer `updatedAt` wins
pub fn merge_notes(existing: &mut Vec<Note>, incoming: Vec<Note>) -> MergeReport {
    let mut report = MergeReport::default();
    let mut index: HashMap<String, usize> = existing
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.clone(), i))
        .collect();

    for note in incoming {
        match index.get(&note.id) {
            Some(&i) if note.updated_at > existing[i].updated_at => {
                existing[i] = note;
                report.updated += 1;
            }
            Some(_) => report.skipped += 1,
            None => {
                index.insert(note.id.clone(), existing.len());
                existing.push(note);
                report.added += 1;
            }
        }
    }
    report
}
