//! Document store boundary and a wiring helper for the retrying saver.

pub mod memory;

pub use memory::{InMemoryDocumentStore, StoreError};

use crate::config::SaverConfig;
use crate::core::{Result, VersionConflict, VersionedDocument};
use crate::saver::attempt_save;
use async_trait::async_trait;
use uuid::Uuid;

/// A store of versioned documents with optimistic-lock checked writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    type Body: Send;
    type Error: VersionConflict + Send;

    /// Fetches the current state of a document.
    async fn load(
        &self,
        id: Uuid,
    ) -> std::result::Result<VersionedDocument<Self::Body>, Self::Error>;

    /// Persists `document`, failing with a version conflict when its version
    /// no longer matches the stored one.
    async fn save(
        &self,
        document: VersionedDocument<Self::Body>,
    ) -> std::result::Result<VersionedDocument<Self::Body>, Self::Error>;
}

#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Loads document `id`, applies `mutate` to its body and saves it,
    /// reloading and reapplying on version conflicts within `config.retries`.
    async fn update_with_retries<F>(
        &self,
        id: Uuid,
        config: &SaverConfig,
        mutate: F,
    ) -> Result<VersionedDocument<Self::Body>, Self::Error>
    where
        F: Fn(&mut Self::Body) + Send + Sync,
    {
        attempt_save(
            || self.load(id),
            |mut document: VersionedDocument<Self::Body>| {
                mutate(&mut document.body);
                self.save(document)
            },
            config.retries,
        )
        .await
        .map(|report| report.document)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStoreExt for S {}
