use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Optional identity of a document, used only in diagnostics.
///
/// The saver never inspects documents otherwise, so the default
/// implementation reporting no identifier is always valid.
pub trait DocumentIdentity {
    fn document_id(&self) -> Option<String> {
        None
    }
}

impl<T: DocumentIdentity> DocumentIdentity for Option<T> {
    fn document_id(&self) -> Option<String> {
        self.as_ref().and_then(DocumentIdentity::document_id)
    }
}

/// Metadata associated with a stored document.
///
/// Tracks the optimistic-lock version and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// The optimistic locking version.
    pub version: i64,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last successful save.
    pub updated_at: DateTime<Utc>,
    /// Whether the document has been written to a store at least once.
    pub persisted: bool,
}

impl DocumentMetadata {
    /// Creates new metadata initialized with the given time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: 0,
            created_at: now,
            updated_at: now,
            persisted: false,
        }
    }
}

/// A document body paired with its identity and version tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedDocument<T> {
    pub id: Uuid,
    pub metadata: DocumentMetadata,
    pub body: T,
}

impl<T> VersionedDocument<T> {
    /// Wraps `body` as a new, not yet persisted document with a fresh id.
    pub fn new(body: T) -> Self {
        Self::with_id(Uuid::new_v4(), body)
    }

    pub fn with_id(id: Uuid, body: T) -> Self {
        Self {
            id,
            metadata: DocumentMetadata::new(Utc::now()),
            body,
        }
    }

    pub fn version(&self) -> i64 {
        self.metadata.version
    }

    pub fn is_persisted(&self) -> bool {
        self.metadata.persisted
    }
}

impl<T> DocumentIdentity for VersionedDocument<T> {
    fn document_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}
