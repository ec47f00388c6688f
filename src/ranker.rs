//! ALFA Notes Vault - Ranker
//!
//! Pure ordering of a decrypted note collection:
//!
//! 1. tag pre-filter (note tags ⊇ selected tags)
//! 2. query vector → cosine score, stable sort descending
//! 3. otherwise query text → case-insensitive substring filter, order kept
//!
//! Nothing is cached between calls.

use crate::note::Note;

/// One ranked result. `score` is `Some` only for vector queries.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedNote {
    pub note: Note,
    pub score: Option<f32>,
}

/// Cosine similarity; 0 for zero magnitude, length mismatch or non-finite input.
///
/// Accumulates in `f64` so tiny or huge components neither vanish nor overflow.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    let sim = (dot / (norm_a * norm_b)) as f32;

    if sim.is_finite() {
        sim
    } else {
        0.0
    }
}

fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Rank `notes` against a query
pub fn rank(
    notes: &[Note],
    query_vector: Option<&[f32]>,
    query_text: &str,
    selected_tags: &[String],
) -> Vec<RankedNote> {
    let candidates = notes.iter().filter(|n| n.has_all_tags(selected_tags));

    if let Some(query) = query_vector {
        let mut scored: Vec<RankedNote> = candidates
            .map(|note| RankedNote {
                score: Some(
                    note.vector
                        .as_deref()
                        .map_or(0.0, |v| cosine_similarity(query, v)),
                ),
                note: note.clone(),
            })
            .collect();

        // sort_by is stable: equal scores keep collection order
        scored.sort_by(|a, b| {
            let (a, b) = (a.score.unwrap_or(0.0), b.score.unwrap_or(0.0));
            b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
        });
        return scored;
    }

    let needle = query_text.to_lowercase();

    candidates
        .filter(|note| needle.is_empty() || matches_text(note, &needle))
        .map(|note| RankedNote {
            note: note.clone(),
            score: None,
        })
        .collect()
}

fn matches_text(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle)
        || note.text.to_lowercase().contains(needle)
        || note
            .summary
            .as_deref()
            .map_or(false, |s| s.to_lowercase().contains(needle))
}
