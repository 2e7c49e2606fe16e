use std::sync::Mutex;

use uuid::Uuid;

use super::{now_rfc3339, ReportRepository, StoreError};
use crate::models::{AnalysisResult, Demographics, LabEntry, Report, Upload};

#[derive(Default)]
struct Tables {
    uploads: Vec<Upload>,
    reports: Vec<Report>,
}

/// Process-memory store, used by tests and when no data directory is usable.
#[derive(Default)]
pub struct InMemoryReportStore {
    tables: Mutex<Tables>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T, StoreError> {
        let mut guard = self.tables.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(f(&mut guard))
    }
}

impl ReportRepository for InMemoryReportStore {
    fn save_upload(
        &self,
        demographics: Demographics,
        raw_entries: Vec<LabEntry>,
    ) -> Result<Upload, StoreError> {
        let upload = Upload {
            id: Uuid::new_v4(),
            created_at: now_rfc3339(),
            demographics,
            raw_entries,
        };
        self.with_tables(|t| t.uploads.push(upload.clone()))?;
        Ok(upload)
    }

    fn find_upload(&self, id: &Uuid) -> Result<Option<Upload>, StoreError> {
        self.with_tables(|t| t.uploads.iter().find(|u| &u.id == id).cloned())
    }

    fn list_uploads(&self) -> Result<Vec<Upload>, StoreError> {
        self.with_tables(|t| t.uploads.iter().rev().cloned().collect())
    }

    fn save_report(&self, upload_id: &Uuid, result: AnalysisResult) -> Result<Report, StoreError> {
        self.with_tables(|t| {
            if !t.uploads.iter().any(|u| &u.id == upload_id) {
                return Err(StoreError::NotFound {
                    entity_type: "Upload".into(),
                    id: upload_id.to_string(),
                });
            }
            let report = Report {
                id: Uuid::new_v4(),
                upload_id: *upload_id,
                created_at: now_rfc3339(),
                result_json: result,
            };
            t.reports.push(report.clone());
            Ok(report)
        })?
    }

    fn find_report(&self, id: &Uuid) -> Result<Option<Report>, StoreError> {
        self.with_tables(|t| t.reports.iter().find(|r| &r.id == id).cloned())
    }

    fn find_report_by_upload(&self, upload_id: &Uuid) -> Result<Option<Report>, StoreError> {
        self.with_tables(|t| {
            t.reports
                .iter()
                .rev()
                .find(|r| &r.upload_id == upload_id)
                .cloned()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::exercise_repository;

    #[test]
    fn in_memory_store_contract() {
        exercise_repository(&InMemoryReportStore::new());
    }
}
