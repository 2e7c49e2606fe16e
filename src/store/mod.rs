pub mod memory;
pub mod sqlite;

pub use memory::InMemoryReportStore;
pub use sqlite::SqliteReportStore;

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AnalysisResult, Demographics, LabEntry, Report, Upload};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Invalid stored value: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Store task failed: {0}")]
    TaskJoin(String),
}

/// Persistence for uploads and reports. Implementations must be safe to
/// share across request tasks.
pub trait ReportRepository: Send + Sync {
    fn save_upload(
        &self,
        demographics: Demographics,
        raw_entries: Vec<LabEntry>,
    ) -> Result<Upload, StoreError>;

    fn find_upload(&self, id: &Uuid) -> Result<Option<Upload>, StoreError>;

    /// All uploads, newest first.
    fn list_uploads(&self) -> Result<Vec<Upload>, StoreError>;

    /// Fails with `NotFound` when `upload_id` does not exist.
    fn save_report(&self, upload_id: &Uuid, result: AnalysisResult) -> Result<Report, StoreError>;

    fn find_report(&self, id: &Uuid) -> Result<Option<Report>, StoreError>;

    fn find_report_by_upload(&self, upload_id: &Uuid) -> Result<Option<Report>, StoreError>;
}

/// Run one repository call on the blocking pool. SQLite work holds a mutex
/// and touches disk, so request tasks never call the store directly.
pub async fn run_blocking<T, F>(store: &Arc<dyn ReportRepository>, f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce(&dyn ReportRepository) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
}

/// Current UTC time as RFC 3339 with millisecond precision.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}


#[cfg(test)]
mod timestamp_tests {
    use super::*;

    #[test]
    fn timestamps_are_rfc3339_utc() {
        let ts = now_rfc3339();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}

#[cfg(test)]
mod blocking_tests {
    use super::*;

    fn sqlite_store() -> Arc<dyn ReportRepository> {
        Arc::new(SqliteReportStore::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn blocking_calls_reach_the_repository() {
        let store = sqlite_store();
        let upload = run_blocking(&store, |repo| {
            repo.save_upload(test_support::demographics(), test_support::entries())
        })
        .await
        .unwrap();

        let id = upload.id;
        let found = run_blocking(&store, move |repo| repo.find_upload(&id))
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(id));
    }

    #[tokio::test]
    async fn repository_errors_cross_the_pool() {
        let store = sqlite_store();
        let err = run_blocking(&store, |repo| {
            repo.save_report(&Uuid::new_v4(), test_support::analysis())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn panicking_call_becomes_task_error() {
        let store = sqlite_store();
        let err = run_blocking(&store, |_| -> Result<(), StoreError> { panic!("boom") })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::TaskJoin(_)));
    }
}
