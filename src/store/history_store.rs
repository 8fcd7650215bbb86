use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::error::{StorageError, StoreFault};
use crate::store::schema::{HistoryTable, SCHEMA_VERSION, TestRecord};

const TABLE_FILE: &str = "test_history.json";

/// Default location of the store: `<data_dir>/examprep`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("examprep")
}

/// An open history table.
///
/// Every operation is one transaction: the table lock is held while the file
/// is read, modified and atomically replaced, so readers never see a partial
/// write and writers to the same id are applied last-write-wins.
pub struct HistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryStore {
    /// Open the table under `base_dir`, creating the directory and an empty
    /// table on first use.
    pub fn open(base_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(base_dir).map_err(|e| StorageError::Open(e.into()))?;
        let store = Self {
            path: base_dir.join(TABLE_FILE),
            lock: Mutex::new(()),
        };
        if !store.path.exists() {
            store
                .write_table(&HistoryTable::default())
                .map_err(StorageError::Open)?;
            tracing::info!(path = %store.path.display(), "created test history table");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert `record`, replacing any stored record with the same id.
    pub fn put_record(&self, record: &TestRecord) -> Result<(), StorageError> {
        self.transaction(|table| {
            table.records.insert(record.id.clone(), record.clone());
            true
        })
        .map_err(|fault| {
            tracing::error!(id = %record.id, error = %fault, "error saving test");
            StorageError::Save(fault)
        })?;
        tracing::debug!(id = %record.id, "saved test record");
        Ok(())
    }

    /// All records, newest first.
    pub fn get_all_records(&self) -> Result<Vec<TestRecord>, StorageError> {
        let table = self
            .transaction(|_| false)
            .map_err(|fault| {
                tracing::error!(error = %fault, "error fetching history");
                StorageError::Read(fault)
            })?;

        let mut records: Vec<TestRecord> = table.records.into_values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Delete every record. There is no way to recover them.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.transaction(|table| {
            table.records.clear();
            true
        })
        .map_err(|fault| {
            tracing::error!(error = %fault, "error clearing history");
            StorageError::Clear(fault)
        })?;
        tracing::info!("cleared test history");
        Ok(())
    }

    /// Run `apply` against the current table under the lock. When it returns
    /// true the modified table is written back before the lock is released.
    fn transaction<F>(&self, apply: F) -> Result<HistoryTable, StoreFault>
    where
        F: FnOnce(&mut HistoryTable) -> bool,
    {
        let _guard = self.acquire()?;
        let mut table = self.read_table()?;
        if apply(&mut table) {
            self.write_table(&table)?;
        }
        Ok(table)
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, StoreFault> {
        self.lock.lock().map_err(|_| StoreFault::Poisoned)
    }

    fn read_table(&self) -> Result<HistoryTable, StoreFault> {
        let content = fs::read_to_string(&self.path)?;
        let table: HistoryTable = serde_json::from_str(&content)?;
        if table.schema_version != SCHEMA_VERSION {
            return Err(StoreFault::Schema {
                found: table.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        Ok(table)
    }

    fn write_table(&self, table: &HistoryTable) -> Result<(), StoreFault> {
        let tmp_path = self.path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(table)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Lazily opened, process-wide handle to the history table.
///
/// Concurrent callers of [`StoreHandle::initialize`] all receive the same
/// `Arc<HistoryStore>`. A failed open is not remembered, so the next call
/// tries again.
pub struct StoreHandle {
    base_dir: PathBuf,
    store: OnceLock<Arc<HistoryStore>>,
    opening: Mutex<()>,
}

impl StoreHandle {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            store: OnceLock::new(),
            opening: Mutex::new(()),
        }
    }

    pub fn initialize(&self) -> Result<Arc<HistoryStore>, StorageError> {
        if let Some(store) = self.store.get() {
            return Ok(Arc::clone(store));
        }

        let _guard = self
            .opening
            .lock()
            .map_err(|_| StorageError::Open(StoreFault::Poisoned))?;
        if let Some(store) = self.store.get() {
            return Ok(Arc::clone(store));
        }

        let store = HistoryStore::open(&self.base_dir).map_err(|e| {
            tracing::error!(dir = %self.base_dir.display(), error = ?e, "error opening history store");
            e
        })?;
        let store = Arc::new(store);
        // Only this thread can be setting the cell while `opening` is held.
        let _ = self.store.set(Arc::clone(&store));
        Ok(store)
    }

    pub fn put_record(&self, record: &TestRecord) -> Result<(), StorageError> {
        self.initialize()?.put_record(record)
    }

    pub fn get_all_records(&self) -> Result<Vec<TestRecord>, StorageError> {
        self.initialize()?.get_all_records()
    }

    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.initialize()?.clear_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{Evaluation, Question};
    use crate::store::schema::{AnsweredQuestion, Difficulty, MockTestOptions};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, HistoryStore) {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn record(id: &str, minutes: i64, total: f64) -> TestRecord {
        TestRecord {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap()
                + Duration::minutes(minutes),
            options: MockTestOptions {
                num_questions: 1,
                chapters: vec!["Microorganisms".to_string()],
                difficulty: Difficulty::Medium,
            },
            questions: vec![AnsweredQuestion {
                question: Question {
                    question: "Name a nitrogen-fixing bacterium.".to_string(),
                    answer: "Rhizobium".to_string(),
                    chapter: "Microorganisms".to_string(),
                    marks: 2.0,
                },
                user_answer: "Rhizobium".to_string(),
                evaluation: Some(Evaluation {
                    score: total,
                    feedback: "Correct".to_string(),
                }),
            }],
            total_score: total,
            max_score: 2.0,
        }
    }

    #[test]
    fn open_creates_empty_table() {
        let (_dir, store) = make_test_store();
        assert!(store.path().exists());
        assert!(store.get_all_records().unwrap().is_empty());
    }

    #[test]
    fn reopening_keeps_records() {
        let dir = TempDir::new().unwrap();
        HistoryStore::open(dir.path())
            .unwrap()
            .put_record(&record("a", 0, 1.0))
            .unwrap();

        let reopened = HistoryStore::open(dir.path()).unwrap();
        let records = reopened.get_all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "a");
    }

    #[test]
    fn put_same_id_overwrites() {
        let (_dir, store) = make_test_store();
        store.put_record(&record("same", 0, 1.0)).unwrap();
        store.put_record(&record("same", 5, 2.0)).unwrap();

        let records = store.get_all_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_score, 2.0);
    }

    #[test]
    fn corrupt_table_surfaces_read_error() {
        let (_dir, store) = make_test_store();
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.get_all_records().unwrap_err();
        assert_eq!(err.to_string(), "Failed to retrieve test history.");
        assert!(matches!(err, StorageError::Read(StoreFault::Malformed(_))));

        let err = store.put_record(&record("x", 0, 0.0)).unwrap_err();
        assert!(matches!(err, StorageError::Save(_)));
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let (_dir, store) = make_test_store();
        fs::write(store.path(), r#"{"schemaVersion": 99, "records": {}}"#).unwrap();
        let err = store.clear_all().unwrap_err();
        assert!(matches!(
            err,
            StorageError::Clear(StoreFault::Schema { found: 99, .. })
        ));
    }

    #[test]
    fn writes_leave_no_temp_file() {
        let (dir, store) = make_test_store();
        store.put_record(&record("a", 0, 1.0)).unwrap();
        store.clear_all().unwrap();

        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }

    #[test]
    fn failed_open_is_retried_on_next_initialize() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocked");
        fs::write(&blocker, "a file, not a directory").unwrap();

        let handle = StoreHandle::new(blocker.clone());
        let err = handle.initialize().err().unwrap();
        assert_eq!(err.to_string(), "Error opening database");

        fs::remove_file(&blocker).unwrap();
        assert!(handle.initialize().is_ok());
    }
}
