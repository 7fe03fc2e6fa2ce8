use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension};

use super::{schema, DocumentStore, StoreError, StoreResult, Version};
use crate::models::Project;

const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// SQLite-backed store: one row per project, the tree serialised as JSON.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "casebook")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("casebook.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }
}

impl DocumentStore for SqliteStore {
    fn load(&self, project_id: &str) -> StoreResult<(Project, Version)> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT document, version FROM project_documents WHERE project_id = ?",
                [project_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (document, version) = row.ok_or_else(|| StoreError::NotFound(project_id.to_string()))?;
        let project = parse_document(project_id, &document)?;
        Ok((project, Version(version as u64)))
    }

    fn commit_if_unchanged(
        &self,
        project_id: &str,
        expected: Version,
        project: &Project,
    ) -> StoreResult<Version> {
        let document = serde_json::to_string(project)?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let conn = self.conn.lock().expect("database lock poisoned");

        if expected == Version::NEW {
            let created_at = project
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true);
            let inserted = conn.execute(
                "INSERT INTO project_documents (project_id, version, document, created_at, updated_at)
                 VALUES (?, 1, ?, ?, ?)",
                (project_id, &document, &created_at, &now),
            );
            return match inserted {
                Ok(_) => Ok(Version::NEW.next()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::Conflict {
                        project_id: project_id.to_string(),
                        expected,
                    })
                }
                Err(e) => Err(e.into()),
            };
        }

        let updated = conn.execute(
            "UPDATE project_documents SET version = version + 1, document = ?, updated_at = ?
             WHERE project_id = ? AND version = ?",
            (&document, &now, project_id, expected.0 as i64),
        )?;
        if updated == 1 {
            return Ok(expected.next());
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM project_documents WHERE project_id = ?)",
            [project_id],
            |row| row.get(0),
        )?;
        if exists {
            Err(StoreError::Conflict {
                project_id: project_id.to_string(),
                expected,
            })
        } else {
            Err(StoreError::NotFound(project_id.to_string()))
        }
    }

    fn delete(&self, project_id: &str) -> StoreResult<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let deleted = conn.execute(
            "DELETE FROM project_documents WHERE project_id = ?",
            [project_id],
        )?;
        Ok(deleted > 0)
    }

    fn list(&self) -> StoreResult<Vec<(Project, Version)>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT project_id, document, version FROM project_documents
             ORDER BY created_at DESC, project_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, document, version)| {
                Ok((parse_document(&id, &document)?, Version(version as u64)))
            })
            .collect()
    }
}

fn parse_document(project_id: &str, document: &str) -> StoreResult<Project> {
    serde_json::from_str(document).map_err(|source| StoreError::Corrupt {
        project_id: project_id.to_string(),
        source,
    })
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}
