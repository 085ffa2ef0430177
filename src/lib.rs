// ============================================================================
// versioned-save Library
// ============================================================================

//! Bounded reload-and-retry for saving documents under optimistic locking.
//!
//! A [`VersionedSaver`] wraps two operations supplied by the caller: one that
//! loads the latest version of a document and one that tries to save it. When
//! the save is rejected with a version conflict, the document is loaded again
//! and the save repeated, up to the configured number of retries.
//!
//! ```
//! use versioned_save::{DocumentStoreExt, InMemoryDocumentStore, SaverConfig};
//!
//! # tokio_test::block_on(async {
//! let store = InMemoryDocumentStore::new();
//! let doc = store.insert(vec!["non-fiction".to_string()]).await.unwrap();
//!
//! let saved = store
//!     .update_with_retries(doc.id, &SaverConfig::default(), |tags| {
//!         tags.push("fiction".to_string())
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(saved.version(), 1);
//! assert_eq!(saved.body, vec!["non-fiction", "fiction"]);
//! # });
//! ```

pub mod config;
pub mod core;
pub mod saver;
pub mod store;

// Re-export main types for convenience
pub use crate::config::{ConfigError, SaverConfig};
pub use crate::core::{
    DocumentIdentity, DocumentMetadata, Result, SaveError, VersionConflict, VersionedDocument,
};
pub use saver::{RetrySession, SaveReport, SaveState, VersionedSaver, attempt_save};
pub use store::{DocumentStore, DocumentStoreExt, InMemoryDocumentStore, StoreError};
