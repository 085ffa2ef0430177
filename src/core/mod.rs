pub mod document;
pub mod error;

pub use document::{DocumentIdentity, DocumentMetadata, VersionedDocument};
pub use error::{Result, SaveError, VersionConflict};
