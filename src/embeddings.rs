//! ALFA Notes Vault - Semantic Index
//!
//! Fills in missing note vectors through an external embedding service:
//! - one task per note, dispatched in parallel on a `JoinSet`
//! - each task retried independently with the shared [`RetryPolicy`]
//! - partial success is a normal outcome ([`IndexReport`])
//!
//! Ranking never depends on this module; it only reads `Note::vector`.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::error::{VaultError, VaultResult};
use crate::note::Note;
use crate::retry::RetryPolicy;
use crate::storage::KeyValueStore;
use crate::vault::NotesVault;

/// Error type for embedding operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbeddingError {
    /// Rate limiting, 5xx, network trouble: worth another attempt
    #[error("Transient embedding failure: {0}")]
    Transient(String),

    #[error("Embedding request rejected: {0}")]
    Permanent(String),

    #[error("Embedding has {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl EmbeddingError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Transient(_))
    }
}

impl From<EmbeddingError> for VaultError {
    fn from(e: EmbeddingError) -> Self {
        VaultError::EmbeddingServiceFailure(e.to_string())
    }
}

/// External text → vector service
pub trait EmbeddingService: Send + Sync + 'static {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

/// Embed every text in parallel. Results line up with `texts`.
///
/// Vectors whose dimension differs from the first successful one are
/// rejected, as are empty vectors.
pub async fn embed_batch<E: EmbeddingService>(
    service: Arc<E>,
    texts: Vec<String>,
    policy: &RetryPolicy,
) -> Vec<Result<Vec<f32>, EmbeddingError>> {
    let count = texts.len();
    let mut tasks = JoinSet::new();

    for (i, text) in texts.into_iter().enumerate() {
        let service = Arc::clone(&service);
        let policy = policy.clone();

        tasks.spawn(async move {
            let result = policy
                .run(|_| service.embed(&text), EmbeddingError::is_transient)
                .await;
            (i, result)
        });
    }

    let mut slots: Vec<Option<Result<Vec<f32>, EmbeddingError>>> = vec![None; count];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((i, result)) => slots[i] = Some(result),
            Err(e) => log::error!("embedding task panicked: {}", e),
        }
    }

    let mut expected: Option<usize> = None;
    slots
        .into_iter()
        .map(|slot| {
            let vector = slot
                .unwrap_or_else(|| Err(EmbeddingError::Permanent("embedding task aborted".into())))?;
            if vector.is_empty() {
                return Err(EmbeddingError::Permanent("service returned an empty vector".into()));
            }
            match expected {
                None => {
                    expected = Some(vector.len());
                    Ok(vector)
                }
                Some(dim) if dim == vector.len() => Ok(vector),
                Some(dim) => Err(EmbeddingError::DimensionMismatch {
                    expected: dim,
                    got: vector.len(),
                }),
            }
        })
        .collect()
}

/// Outcome of an indexing pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexReport {
    /// Ids of notes that received a vector
    pub embedded: Vec<String>,
    /// Ids of notes that did not, with the reason
    pub failed: Vec<(String, EmbeddingError)>,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keeps note vectors up to date
pub struct SemanticIndexer<E> {
    service: Arc<E>,
    policy: RetryPolicy,
}

impl<E: EmbeddingService> SemanticIndexer<E> {
    pub fn new(service: E, policy: RetryPolicy) -> Self {
        Self {
            service: Arc::new(service),
            policy,
        }
    }

    /// Embed a search query
    pub async fn embed_query(&self, text: &str) -> VaultResult<Vec<f32>> {
        let vector = self
            .policy
            .run(|_| self.service.embed(text), EmbeddingError::is_transient)
            .await?;
        Ok(vector)
    }

    /// Embed every note lacking a vector, in place
    pub async fn index_notes(&self, notes: &mut [Note]) -> IndexReport {
        let pending: Vec<usize> = notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.vector.is_none() && !n.embedding_text().is_empty())
            .map(|(i, _)| i)
            .collect();
        let texts = pending.iter().map(|&i| notes[i].embedding_text()).collect();

        let results = embed_batch(Arc::clone(&self.service), texts, &self.policy).await;

        let mut report = IndexReport::default();
        for (i, result) in pending.into_iter().zip(results) {
            let note = &mut notes[i];
            match result {
                Ok(vector) => {
                    note.vector = Some(vector);
                    report.embedded.push(note.id.clone());
                }
                Err(e) => {
                    log::warn!("note {} not embedded: {}", note.id, e);
                    report.failed.push((note.id.clone(), e));
                }
            }
        }
        report
    }

    /// Index the open vault and persist the new vectors
    pub async fn index_vault<S: KeyValueStore>(
        &self,
        vault: &NotesVault<S>,
    ) -> VaultResult<IndexReport> {
        let pending = vault.pending_embeddings()?;
        let texts = pending.iter().map(|(_, text)| text.clone()).collect();

        let results = embed_batch(Arc::clone(&self.service), texts, &self.policy).await;

        let mut report = IndexReport::default();
        let mut vectors = Vec::new();
        for ((id, text), result) in pending.into_iter().zip(results) {
            match result {
                Ok(vector) => {
                    report.embedded.push(id.clone());
                    vectors.push((id, text, vector));
                }
                Err(e) => {
                    log::warn!("note {} not embedded: {}", id, e);
                    report.failed.push((id, e));
                }
            }
        }

        if !vectors.is_empty() {
            let applied = vault.apply_vectors(vectors)?;
            log::info!(
                "Indexed {} notes ({} failed, {} superseded by edits)",
                applied,
                report.failed.len(),
                report.embedded.len() - applied
            );
        }
        Ok(report)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP CLIENT (OpenAI-compatible /embeddings)
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(feature = "http-embeddings")]
pub use http::HttpEmbeddingClient;

#[cfg(feature = "http-embeddings")]
mod http {
    use std::future::Future;
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    use super::{EmbeddingError, EmbeddingService};
    use crate::config::EmbeddingConfig;
    use crate::error::{VaultError, VaultResult};

    #[derive(Serialize)]
    struct EmbeddingRequest<'a> {
        model: &'a str,
        input: &'a str,
    }

    #[derive(Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingDatum>,
    }

    #[derive(Deserialize)]
    struct EmbeddingDatum {
        embedding: Vec<f32>,
    }

    /// Client for any service speaking the OpenAI embeddings protocol
    pub struct HttpEmbeddingClient {
        client: reqwest::Client,
        endpoint: String,
        model: String,
        api_key: Option<String>,
    }

    impl HttpEmbeddingClient {
        pub fn new(config: &EmbeddingConfig) -> VaultResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| VaultError::EmbeddingServiceFailure(e.to_string()))?;

            let api_key = config
                .api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|k| !k.is_empty());

            Ok(Self {
                client,
                endpoint: config.endpoint.clone(),
                model: config.model.clone(),
                api_key,
            })
        }
    }

    impl EmbeddingService for HttpEmbeddingClient {
        fn embed(
            &self,
            text: &str,
        ) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send {
            let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            });
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            async move {
                let response = request.send().await.map_err(classify)?;
                let status = response.status();

                if status.as_u16() == 429 || status.is_server_error() {
                    return Err(EmbeddingError::Transient(format!("HTTP {}", status)));
                }
                if !status.is_success() {
                    return Err(EmbeddingError::Permanent(format!("HTTP {}", status)));
                }

                let body: EmbeddingResponse = response
                    .json()
                    .await
                    .map_err(|e| EmbeddingError::Permanent(format!("bad response: {}", e)))?;

                body.data
                    .into_iter()
                    .next()
                    .map(|d| d.embedding)
                    .ok_or_else(|| EmbeddingError::Permanent("response has no data".into()))
            }
        }
    }

    fn classify(e: reqwest::Error) -> EmbeddingError {
        if e.is_builder() {
            EmbeddingError::Permanent(e.to_string())
        } else {
            EmbeddingError::Transient(e.to_string())
        }
    }
}
