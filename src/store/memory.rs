use super::DocumentStore;
use crate::core::{VersionConflict, VersionedDocument};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Optimistic lock conflict for '{id}': expected version {expected}, actual {actual}")]
    VersionConflict { id: Uuid, expected: i64, actual: i64 },

    #[error("Document '{0}' not found")]
    NotFound(Uuid),

    #[error("Document '{0}' already exists")]
    AlreadyExists(Uuid),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl VersionConflict for StoreError {
    fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// In-memory document store enforcing optimistic locking on every save.
///
/// Saving a document whose version differs from the stored one fails with
/// [`StoreError::VersionConflict`]. A successful save of an existing
/// document bumps its version by one; the first save of a new document
/// keeps version 0.
#[derive(Debug)]
pub struct InMemoryDocumentStore<T> {
    documents: RwLock<HashMap<Uuid, VersionedDocument<T>>>,
}

impl<T> InMemoryDocumentStore<T>
where
    T: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Creates and persists a new document holding `body`.
    pub async fn insert(&self, body: T) -> Result<VersionedDocument<T>, StoreError> {
        self.save_document(VersionedDocument::new(body)).await
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    async fn load_document(&self, id: Uuid) -> Result<VersionedDocument<T>, StoreError> {
        self.documents
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn save_document(
        &self,
        mut document: VersionedDocument<T>,
    ) -> Result<VersionedDocument<T>, StoreError> {
        let mut documents = self.documents.write().await;
        let now = Utc::now();

        match documents.get(&document.id) {
            None if document.metadata.persisted => {
                return Err(StoreError::NotFound(document.id));
            }
            None => {
                document.metadata.persisted = true;
            }
            Some(_) if !document.metadata.persisted => {
                return Err(StoreError::AlreadyExists(document.id));
            }
            Some(stored) => {
                let actual = stored.metadata.version;
                if actual != document.metadata.version {
                    debug!(
                        "Rejecting stale write to '{}': expected version {}, actual {}",
                        document.id, document.metadata.version, actual
                    );
                    return Err(StoreError::VersionConflict {
                        id: document.id,
                        expected: document.metadata.version,
                        actual,
                    });
                }
                document.metadata.version = actual + 1;
                document.metadata.created_at = stored.metadata.created_at;
            }
        }

        document.metadata.updated_at = now;
        documents.insert(document.id, document.clone());
        Ok(document)
    }
}

impl<T> InMemoryDocumentStore<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned,
{
    /// Serializes every stored document to a JSON array.
    pub async fn export_json(&self) -> Result<String, StoreError> {
        let documents = self.documents.read().await;
        let mut snapshot: Vec<&VersionedDocument<T>> = documents.values().collect();
        snapshot.sort_by_key(|document| document.id);
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Builds a store from the output of [`export_json`](Self::export_json),
    /// keeping every document's version.
    pub fn import_json(json: &str) -> Result<Self, StoreError> {
        let snapshot: Vec<VersionedDocument<T>> = serde_json::from_str(json)?;
        let documents = snapshot
            .into_iter()
            .map(|document| (document.id, document))
            .collect();
        Ok(Self {
            documents: RwLock::new(documents),
        })
    }
}

impl<T> Default for InMemoryDocumentStore<T>
where
    T: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> DocumentStore for InMemoryDocumentStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Body = T;
    type Error = StoreError;

    async fn load(&self, id: Uuid) -> Result<VersionedDocument<T>, StoreError> {
        self.load_document(id).await
    }

    async fn save(
        &self,
        document: VersionedDocument<T>,
    ) -> Result<VersionedDocument<T>, StoreError> {
        self.save_document(document).await
    }
}
