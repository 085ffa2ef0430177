//! Reload-and-retry loop for saves guarded by optimistic locking.

pub mod session;

pub use session::{RetrySession, SaveState};

use crate::config::SaverConfig;
use crate::core::{DocumentIdentity, Result, SaveError, VersionConflict};
use log::{debug, warn};
use std::future::Future;

/// Outcome of a successful save together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport<D> {
    pub document: D,
    pub attempts: u32,
}

/// Loads a document, saves it, and on a version conflict reloads and saves
/// again, at most `max_retries` times after the first attempt.
///
/// Load failures are never retried. Save failures that are not version
/// conflicts are returned as [`SaveError::Store`] without further attempts.
/// Once the retry budget is spent the last conflict is reported through
/// [`SaveError::RetriesExhausted`].
pub async fn attempt_save<D, E, L, LF, S, SF>(
    mut load: L,
    mut save: S,
    max_retries: u32,
) -> Result<SaveReport<D>, E>
where
    D: DocumentIdentity,
    E: VersionConflict,
    L: FnMut() -> LF,
    LF: Future<Output = std::result::Result<D, E>>,
    S: FnMut(D) -> SF,
    SF: Future<Output = std::result::Result<D, E>>,
{
    let mut session = RetrySession::new(max_retries);
    loop {
        session.begin_attempt();

        let document = match load().await {
            Ok(document) => document,
            Err(err) => {
                session.failed();
                return Err(SaveError::Store(err));
            }
        };
        let document_id = document.document_id();
        session.loaded();

        let err = match save(document).await {
            Ok(saved) => {
                session.succeeded();
                return Ok(SaveReport {
                    document: saved,
                    attempts: session.attempt(),
                });
            }
            Err(err) if err.is_version_conflict() => err,
            Err(err) => {
                session.failed();
                return Err(SaveError::Store(err));
            }
        };

        debug!(
            "Handling version conflict for document {:?}: attempt {}, retries remaining {}",
            document_id,
            session.attempt(),
            session.retries_remaining()
        );

        if !session.conflicted() {
            warn!(
                "Giving up on document {:?} after {} attempts ({} retries allowed)",
                document_id,
                session.attempt(),
                max_retries
            );
            return Err(SaveError::RetriesExhausted {
                document_id,
                max_retries,
                attempts: session.attempt(),
                last_conflict: err,
            });
        }

        warn!(
            "Version conflict on document {:?}, reloading (attempt {} of {})",
            document_id,
            session.attempt() + 1,
            u64::from(max_retries) + 1
        );
    }
}

/// Saves a versioned document through injected load/save operations,
/// retrying on version conflicts.
///
/// The saver keeps no per-call state, so one instance can drive any number
/// of independent saves.
///
/// # Examples
///
/// ```
/// use versioned_save::{DocumentIdentity, VersionConflict, VersionedSaver};
///
/// #[derive(Debug)]
/// struct Stale;
///
/// impl VersionConflict for Stale {
///     fn is_version_conflict(&self) -> bool {
///         true
///     }
/// }
///
/// struct Note(u32);
///
/// impl DocumentIdentity for Note {}
///
/// # tokio_test::block_on(async {
/// let saver = VersionedSaver::new(
///     || async { Ok::<_, Stale>(Note(1)) },
///     |note: Note| async move { Ok(Note(note.0 + 1)) },
/// )
/// .with_retries(3);
///
/// let saved = saver.save().await.unwrap();
/// assert_eq!(saved.0, 2);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct VersionedSaver<L, S> {
    load: L,
    save: S,
    config: SaverConfig,
}

impl<L, S> VersionedSaver<L, S> {
    /// Creates a saver with the default retry budget.
    pub fn new(load: L, save: S) -> Self {
        Self {
            load,
            save,
            config: SaverConfig::default(),
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.config = self.config.retries(retries);
        self
    }

    pub fn with_config(mut self, config: SaverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.config.retries
    }

    /// Runs one save-with-retries operation and returns the persisted document.
    pub async fn save<D, E, LF, SF>(&self) -> Result<D, E>
    where
        D: DocumentIdentity,
        E: VersionConflict,
        L: Fn() -> LF,
        LF: Future<Output = std::result::Result<D, E>>,
        S: Fn(D) -> SF,
        SF: Future<Output = std::result::Result<D, E>>,
    {
        self.save_with_report().await.map(|report| report.document)
    }

    /// Like [`save`](Self::save), also reporting how many attempts were made.
    pub async fn save_with_report<D, E, LF, SF>(&self) -> Result<SaveReport<D>, E>
    where
        D: DocumentIdentity,
        E: VersionConflict,
        L: Fn() -> LF,
        LF: Future<Output = std::result::Result<D, E>>,
        S: Fn(D) -> SF,
        SF: Future<Output = std::result::Result<D, E>>,
    {
        attempt_save(&self.load, &self.save, self.config.retries).await
    }
}
