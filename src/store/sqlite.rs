use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{now_rfc3339, ReportRepository, StoreError};
use crate::models::{AnalysisResult, Demographics, LabEntry, Report, Upload};

/// SQLite-backed store. One connection behind a mutex; statements are short.
pub struct SqliteReportStore {
    conn: Mutex<Connection>,
}

impl SqliteReportStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        configure_pragmas(&conn)?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }
    Ok(())
}

/// Current schema version (0 if no schema exists yet).
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad id '{raw}': {e}")))
}

/// Raw upload columns, decoded after the row borrow ends.
struct UploadRow {
    id: String,
    created_at: String,
    demographics_json: String,
    raw_entries_json: String,
}

fn upload_row(row: &Row<'_>) -> rusqlite::Result<UploadRow> {
    Ok(UploadRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        demographics_json: row.get(2)?,
        raw_entries_json: row.get(3)?,
    })
}

fn upload_from_row(row: UploadRow) -> Result<Upload, StoreError> {
    Ok(Upload {
        id: parse_uuid(&row.id)?,
        created_at: row.created_at,
        demographics: serde_json::from_str(&row.demographics_json)?,
        raw_entries: serde_json::from_str(&row.raw_entries_json)?,
    })
}

struct ReportRow {
    id: String,
    upload_id: String,
    created_at: String,
    result_json: String,
}

fn report_row(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        upload_id: row.get(1)?,
        created_at: row.get(2)?,
        result_json: row.get(3)?,
    })
}

fn report_from_row(row: ReportRow) -> Result<Report, StoreError> {
    Ok(Report {
        id: parse_uuid(&row.id)?,
        upload_id: parse_uuid(&row.upload_id)?,
        created_at: row.created_at,
        result_json: serde_json::from_str(&row.result_json)?,
    })
}

impl ReportRepository for SqliteReportStore {
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
        let demographics_json = serde_json::to_string(&upload.demographics)?;
        let raw_entries_json = serde_json::to_string(&upload.raw_entries)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO uploads (id, created_at, demographics_json, raw_entries_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    upload.id.to_string(),
                    upload.created_at,
                    demographics_json,
                    raw_entries_json,
                ],
            )?;
            Ok(())
        })?;
        Ok(upload)
    }

    fn find_upload(&self, id: &Uuid) -> Result<Option<Upload>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, created_at, demographics_json, raw_entries_json
                 FROM uploads WHERE id = ?1",
                params![id.to_string()],
                upload_row,
            )
            .optional()?
            .map(upload_from_row)
            .transpose()
        })
    }

    fn list_uploads(&self) -> Result<Vec<Upload>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, demographics_json, raw_entries_json
                 FROM uploads ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map([], upload_row)?;

            let mut uploads = Vec::new();
            for row in rows {
                uploads.push(upload_from_row(row?)?);
            }
            Ok(uploads)
        })
    }

    fn save_report(&self, upload_id: &Uuid, result: AnalysisResult) -> Result<Report, StoreError> {
        let report = Report {
            id: Uuid::new_v4(),
            upload_id: *upload_id,
            created_at: now_rfc3339(),
            result_json: result,
        };
        let result_json = serde_json::to_string(&report.result_json)?;
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM uploads WHERE id = ?1)",
                params![upload_id.to_string()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(StoreError::NotFound {
                    entity_type: "Upload".into(),
                    id: upload_id.to_string(),
                });
            }
            conn.execute(
                "INSERT INTO reports (id, upload_id, created_at, result_json)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    report.id.to_string(),
                    report.upload_id.to_string(),
                    report.created_at,
                    result_json,
                ],
            )?;
            Ok(())
        })?;
        Ok(report)
    }

    fn find_report(&self, id: &Uuid) -> Result<Option<Report>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, upload_id, created_at, result_json FROM reports WHERE id = ?1",
                params![id.to_string()],
                report_row,
            )
            .optional()?
            .map(report_from_row)
            .transpose()
        })
    }

    fn find_report_by_upload(&self, upload_id: &Uuid) -> Result<Option<Report>, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, upload_id, created_at, result_json FROM reports
                 WHERE upload_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![upload_id.to_string()],
                report_row,
            )
            .optional()?
            .map(report_from_row)
            .transpose()
        })
    }
}
