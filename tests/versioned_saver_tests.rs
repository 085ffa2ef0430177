use std::fmt;
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};
use versioned_save::{
    DocumentIdentity, SaveError, SaverConfig, VersionConflict, VersionedSaver, attempt_save,
};

#[derive(Debug, Clone, PartialEq)]
enum StoreFailure {
    Conflict,
    Connection(&'static str),
    Validation(&'static str),
}

impl fmt::Display for StoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "version conflict"),
            Self::Connection(msg) => write!(f, "connection error: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
        }
    }
}

impl std::error::Error for StoreFailure {}

impl VersionConflict for StoreFailure {
    fn is_version_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Book {
    id: &'static str,
    loaded_on: u32,
    saved_on: u32,
}

impl DocumentIdentity for Book {
    fn document_id(&self) -> Option<String> {
        Some(self.id.to_string())
    }
}

/// Counts load and save calls and conflicts until `succeed_on` (0 = never).
#[derive(Clone, Default)]
struct ScriptedStore {
    loads: Arc<AtomicU32>,
    saves: Arc<AtomicU32>,
    succeed_on: u32,
}

impl ScriptedStore {
    fn succeeding_on(attempt: u32) -> Self {
        Self {
            succeed_on: attempt,
            ..Self::default()
        }
    }

    fn always_conflicting() -> Self {
        Self::default()
    }

    async fn load(&self) -> Result<Book, StoreFailure> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Book {
            id: "book-1",
            loaded_on: n,
            saved_on: 0,
        })
    }

    async fn save(&self, mut book: Book) -> Result<Book, StoreFailure> {
        let n = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.succeed_on {
            book.saved_on = n;
            Ok(book)
        } else {
            Err(StoreFailure::Conflict)
        }
    }

    fn loads(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }

    fn saves(&self) -> u32 {
        self.saves.load(Ordering::SeqCst)
    }
}

async fn run(store: &ScriptedStore, retries: u32) -> versioned_save::Result<Book, StoreFailure> {
    VersionedSaver::new(|| store.load(), |book| store.save(book))
        .with_retries(retries)
        .save()
        .await
}

#[tokio::test]
async fn test_default_retries_succeed_on_third_attempt() {
    let store = ScriptedStore::succeeding_on(3);
    let saver = VersionedSaver::new(|| store.load(), |book| store.save(book));
    assert_eq!(saver.max_retries(), 2);

    let report = saver.save_with_report().await.unwrap();

    assert_eq!(report.attempts, 3);
    assert_eq!(
        report.document,
        Book {
            id: "book-1",
            loaded_on: 3,
            saved_on: 3
        }
    );
    assert_eq!(store.loads(), 3);
    assert_eq!(store.saves(), 3);
}

#[tokio::test]
async fn test_zero_retries_fail_on_first_conflict() {
    let store = ScriptedStore::always_conflicting();
    let err = run(&store, 0).await.unwrap_err();

    assert!(err.is_retries_exhausted());
    assert!(err.to_string().contains("Failed to save document id book-1"));
    assert_eq!(store.loads(), 1);
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn test_negative_configured_retries_behave_like_zero() {
    let store = ScriptedStore::always_conflicting();
    let config = SaverConfig::from_json(r#"{"retries": -1}"#).unwrap();
    let err = VersionedSaver::new(|| store.load(), |book| store.save(book))
        .with_config(config)
        .save()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaveError::RetriesExhausted {
            max_retries: 0,
            attempts: 1,
            ..
        }
    ));
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn test_two_retries_exhausted_after_three_attempts() {
    let store = ScriptedStore::always_conflicting();
    let err = run(&store, 2).await.unwrap_err();

    match err {
        SaveError::RetriesExhausted {
            document_id,
            max_retries,
            attempts,
            last_conflict,
        } => {
            assert_eq!(document_id.as_deref(), Some("book-1"));
            assert_eq!(max_retries, 2);
            assert_eq!(attempts, 3);
            assert_eq!(last_conflict, StoreFailure::Conflict);
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(store.loads(), 3);
    assert_eq!(store.saves(), 3);
}

#[tokio::test]
async fn test_immediate_success_makes_one_attempt() {
    let store = ScriptedStore::succeeding_on(1);
    let report = VersionedSaver::new(|| store.load(), |book| store.save(book))
        .save_with_report()
        .await
        .unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(report.document.saved_on, 1);
    assert_eq!(store.loads(), 1);
    assert_eq!(store.saves(), 1);
}

#[tokio::test]
async fn test_attempt_count_for_every_budget() {
    for retries in 0..6u32 {
        let store = ScriptedStore::always_conflicting();
        let err = run(&store, retries).await.unwrap_err();
        assert!(err.is_retries_exhausted());
        assert_eq!(store.loads(), retries + 1, "loads with {retries} retries");
        assert_eq!(store.saves(), retries + 1, "saves with {retries} retries");

        for k in 1..=retries + 1 {
            let store = ScriptedStore::succeeding_on(k);
            let book = run(&store, retries).await.unwrap();
            assert_eq!(book.saved_on, k);
            assert_eq!(store.saves(), k);
            assert_eq!(store.loads(), k);
        }
    }
}

#[tokio::test]
async fn test_load_failure_propagates_unmodified() {
    let saves = AtomicU32::new(0);
    let err = attempt_save(
        || async { Err::<Book, _>(StoreFailure::Connection("refused")) },
        |book: Book| {
            saves.fetch_add(1, Ordering::SeqCst);
            async move { Ok(book) }
        },
        5,
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "connection error: refused");
    assert_eq!(err.into_store_error(), Some(StoreFailure::Connection("refused")));
    assert_eq!(saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_load_failure_after_conflict_stops_retrying() {
    let loads = AtomicU32::new(0);
    let err = attempt_save(
        || {
            let n = loads.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Ok(Book {
                        id: "book-2",
                        loaded_on: n,
                        saved_on: 0,
                    })
                } else {
                    Err(StoreFailure::Connection("reset"))
                }
            }
        },
        |_book: Book| async { Err::<Book, _>(StoreFailure::Conflict) },
        5,
    )
    .await
    .unwrap_err();

    assert_eq!(err.store_error(), Some(&StoreFailure::Connection("reset")));
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_non_conflict_save_error_ignores_remaining_budget() {
    let store = ScriptedStore::default();
    let err = attempt_save(
        || store.load(),
        |_book: Book| async { Err::<Book, _>(StoreFailure::Validation("title required")) },
        10,
    )
    .await
    .unwrap_err();

    assert!(!err.is_retries_exhausted());
    assert_eq!(err.to_string(), "validation error: title required");
    assert_eq!(store.loads(), 1);
}

#[tokio::test]
async fn test_conflict_then_other_error_returns_other_error() {
    let saves = AtomicU32::new(0);
    let store = ScriptedStore::default();
    let err = attempt_save(
        || store.load(),
        |_book: Book| {
            let n = saves.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Err::<Book, _>(StoreFailure::Conflict)
                } else {
                    Err(StoreFailure::Connection("timeout"))
                }
            }
        },
        4,
    )
    .await
    .unwrap_err();

    assert_eq!(err.into_store_error(), Some(StoreFailure::Connection("timeout")));
    assert_eq!(saves.load(Ordering::SeqCst), 2);
    assert_eq!(store.loads(), 2);
}

#[tokio::test]
async fn test_exhausted_error_exposes_last_conflict_as_source() {
    let store = ScriptedStore::always_conflicting();
    let err = run(&store, 1).await.unwrap_err();

    let source = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("version conflict"));
    assert_eq!(err.to_string(), "Failed to save document id book-1 after 1 retries");
}
