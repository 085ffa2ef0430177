use thiserror::Error;

/// Capability a store error must expose so the saver can tell an
/// optimistic-lock rejection apart from every other failure.
pub trait VersionConflict {
    /// Returns `true` when the store rejected a write because the document's
    /// stored version no longer matches the version the writer loaded.
    fn is_version_conflict(&self) -> bool;
}

/// Errors surfaced by [`VersionedSaver`](crate::VersionedSaver) and
/// [`attempt_save`](crate::attempt_save).
///
/// Collaborator failures other than an exhausted conflict budget are carried
/// in [`SaveError::Store`] exactly as the collaborator returned them.
#[derive(Error, Debug)]
pub enum SaveError<E> {
    #[error(transparent)]
    Store(E),

    #[error(
        "Failed to save document id {id} after {max_retries} retries",
        id = .document_id.as_deref().unwrap_or("unknown")
    )]
    RetriesExhausted {
        document_id: Option<String>,
        max_retries: u32,
        attempts: u32,
        #[source]
        last_conflict: E,
    },
}

impl<E> SaveError<E> {
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// Borrows the collaborator error, if this is a propagated failure.
    pub fn store_error(&self) -> Option<&E> {
        match self {
            Self::Store(err) => Some(err),
            Self::RetriesExhausted { .. } => None,
        }
    }

    /// Gives back the collaborator error untouched, if this is a propagated failure.
    pub fn into_store_error(self) -> Option<E> {
        match self {
            Self::Store(err) => Some(err),
            Self::RetriesExhausted { .. } => None,
        }
    }
}

pub type Result<T, E> = std::result::Result<T, SaveError<E>>;
