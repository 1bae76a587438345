use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::now_s;
use crate::application::ports::HazardStorePort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::hazard::{NewHazard, PersistedHazard};

/// Append-only hazard log in a SQLite file.
#[derive(Clone)]
pub struct SqliteHazardStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHazardStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open hazard database '{db_path}'"))?;
        Self::with_connection(conn)
    }

    /// Like `open`, but refuses to create a database that isn't there yet.
    pub fn open_existing(db_path: &str) -> Result<Self> {
        if !Path::new(db_path).exists() {
            return Err(anyhow!("hazard database '{db_path}' not found; run the server first"));
        }
        Self::open(db_path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        self.lock()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS hazards (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              hazard_type TEXT NOT NULL,
              timestamp INTEGER NOT NULL,
              location_data TEXT NOT NULL,
              severity INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_hazards_type ON hazards(hazard_type);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("hazard database lock poisoned"))
    }

    pub fn insert(&self, hazard: &NewHazard) -> Result<PersistedHazard> {
        let conn = self.lock()?;
        let timestamp = now_s();
        conn.execute(
            r#"
            INSERT INTO hazards(hazard_type, timestamp, location_data, severity)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![hazard.hazard_type, timestamp, hazard.location_data, hazard.severity],
        )?;
        Ok(PersistedHazard {
            id: conn.last_insert_rowid(),
            hazard_type: hazard.hazard_type.clone(),
            timestamp,
            location_data: hazard.location_data.clone(),
            severity: hazard.severity,
        })
    }

    pub fn latest(&self, limit: usize) -> Result<Vec<PersistedHazard>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, hazard_type, timestamp, location_data, severity
             FROM hazards ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], row_to_hazard)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn first(&self) -> Result<Option<PersistedHazard>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, hazard_type, timestamp, location_data, severity
                 FROM hazards ORDER BY id ASC LIMIT 1",
                [],
                row_to_hazard,
            )
            .optional()?;
        Ok(row)
    }

    pub fn total(&self) -> Result<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM hazards", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    async fn blocking<T, F>(&self, f: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteHazardStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| DomainError::Storage(format!("storage task failed: {e}")))?
            .map_err(|e| DomainError::Storage(format!("{e:#}")))
    }
}

fn row_to_hazard(row: &Row<'_>) -> rusqlite::Result<PersistedHazard> {
    Ok(PersistedHazard {
        id: row.get(0)?,
        hazard_type: row.get(1)?,
        timestamp: row.get(2)?,
        location_data: row.get(3)?,
        severity: row.get(4)?,
    })
}

#[async_trait]
impl HazardStorePort for SqliteHazardStore {
    async fn save(&self, hazard: NewHazard) -> DomainResult<PersistedHazard> {
        self.blocking(move |store| store.insert(&hazard)).await
    }

    async fn recent(&self, limit: usize) -> DomainResult<Vec<PersistedHazard>> {
        self.blocking(move |store| store.latest(limit)).await
    }

    async fn count(&self) -> DomainResult<u64> {
        self.blocking(|store| store.total()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn hazard(kind: &str, frame: u64, severity: i64) -> NewHazard {
        NewHazard {
            hazard_type: kind.into(),
            location_data: format!("Frame {frame}"),
            severity,
        }
    }

    #[test]
    fn rows_get_increasing_ids_and_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hazard_log.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteHazardStore::open(path).unwrap();
            let a = store.insert(&hazard("Pothole", 3, 8)).unwrap();
            let b = store.insert(&hazard("Rash Driving", 6, 10)).unwrap();
            assert_eq!(a.id, 1);
            assert_eq!(b.id, 2);
            assert!(b.timestamp > 0);
        }

        let reopened = SqliteHazardStore::open(path).unwrap();
        assert_eq!(reopened.total().unwrap(), 2);
        let first = reopened.first().unwrap().unwrap();
        assert_eq!(first.hazard_type, "Pothole");
        assert_eq!(first.location_data, "Frame 3");
        assert_eq!(first.severity, 8);
    }

    #[test]
    fn open_existing_never_creates_a_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let path = path.to_str().unwrap();

        let err = SqliteHazardStore::open_existing(path).err().unwrap();
        assert!(err.to_string().contains("not found"));
        assert!(!Path::new(path).exists());

        SqliteHazardStore::open(path).unwrap().insert(&hazard("Pothole", 3, 8)).unwrap();
        assert_eq!(SqliteHazardStore::open_existing(path).unwrap().total().unwrap(), 1);
    }

    #[test]
    fn latest_is_newest_first_and_limited() {
        let store = SqliteHazardStore::open_in_memory().unwrap();
        for frame in [3, 6, 9] {
            store.insert(&hazard("Pothole", frame, 8)).unwrap();
        }
        let rows = store.latest(2).unwrap();
        let locations: Vec<_> = rows.iter().map(|r| r.location_data.as_str()).collect();
        assert_eq!(locations, vec!["Frame 9", "Frame 6"]);
    }

    #[test]
    fn empty_log_has_no_first_record() {
        let store = SqliteHazardStore::open_in_memory().unwrap();
        assert_eq!(store.total().unwrap(), 0);
        assert!(store.first().unwrap().is_none());
    }

    #[tokio::test]
    async fn port_methods_run_off_the_async_threads() {
        let store = SqliteHazardStore::open_in_memory().unwrap();
        let row = store.save(hazard("Rash Driving", 12, 7)).await.unwrap();
        assert_eq!(row.id, 1);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.recent(10).await.unwrap(), vec![row]);
    }
}
