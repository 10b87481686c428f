//! Dataset Connection Registry
//!
//! Each worker owns one registry. The registry maps a dataset file to a
//! read-only SQLite connection that is opened lazily on first use and then
//! reused for every later task on the same worker. The main table of a
//! dataset is discovered once, when its connection is opened.
//!
//! Registries are never shared: dropping the worker's registry closes every
//! connection it holds.

use super::types::{TaskError, TaskErrorKind};

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const BUSY_TIMEOUT_MS: u64 = 5_000;

const DISCOVER_MAIN_TABLE: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' LIMIT 1";

/// One open dataset on one worker.
pub struct DatasetHandle {
    pub path: PathBuf,
    pub conn: Connection,
    /// First user table of the file, if it has any.
    pub main_table: Option<String>,
}

impl DatasetHandle {
    fn open(path: PathBuf) -> Result<Self, TaskError> {
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            TaskError::new(
                TaskErrorKind::DatasetUnavailable,
                format!("cannot open {}: {}", path.display(), e),
            )
        })?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        conn.pragma_update(None, "query_only", 1)?;

        // Opening is lazy in SQLite; this is the first real read of the file.
        let main_table = conn
            .query_row(DISCOVER_MAIN_TABLE, [], |row| row.get::<_, String>(0))
            .optional()
            .map_err(|e| {
                TaskError::new(
                    TaskErrorKind::DatasetUnavailable,
                    format!("cannot read schema of {}: {}", path.display(), e),
                )
            })?;

        tracing::debug!(
            "Opened dataset {} (main table: {:?})",
            path.display(),
            main_table
        );

        Ok(Self {
            path,
            conn,
            main_table,
        })
    }
}

/// Per-worker map from dataset file name to its open handle.
pub struct ConnectionRegistry {
    data_dir: PathBuf,
    handles: HashMap<String, DatasetHandle>,
}

impl ConnectionRegistry {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            handles: HashMap::new(),
        }
    }

    /// Returns the handle for `dataset`, opening it on first use.
    ///
    /// A failed open is not cached; the next task retries the open.
    pub fn handle(&mut self, dataset: &str) -> Result<&mut DatasetHandle, TaskError> {
        validate_dataset_name(dataset)?;

        if !self.handles.contains_key(dataset) {
            let handle = DatasetHandle::open(self.data_dir.join(dataset))?;
            self.handles.insert(dataset.to_string(), handle);
        }

        self.handles.get_mut(dataset).ok_or_else(|| {
            TaskError::new(
                TaskErrorKind::DatasetUnavailable,
                format!("dataset {} vanished from registry", dataset),
            )
        })
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn is_open(&self, dataset: &str) -> bool {
        self.handles.contains_key(dataset)
    }

    /// Closes every connection. Close failures are ignored.
    pub fn close_all(&mut self) {
        for (name, handle) in self.handles.drain() {
            if let Err((_, e)) = handle.conn.close() {
                tracing::trace!("Ignoring close error for {}: {}", name, e);
            }
        }
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Dataset names are plain file names inside the data directory.
fn validate_dataset_name(dataset: &str) -> Result<(), TaskError> {
    let valid = !dataset.is_empty()
        && !dataset.starts_with('.')
        && dataset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(TaskError::new(
            TaskErrorKind::InvalidRequest,
            format!("invalid dataset name: {:?}", dataset),
        ))
    }
}
