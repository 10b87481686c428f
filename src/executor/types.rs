use rusqlite::types::{ToSql, ToSqlOutput};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A heterogeneous dataset row, keyed by column name.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Identifier of a task inside one pool.
///
/// Monotonic per pool; the coordinator hands them out in submission order,
/// so a smaller id always means an earlier submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of a worker in the pool. A replacement worker keeps the slot of
/// the worker it replaces and gets a new generation instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WorkerSlot(pub usize);

impl fmt::Display for WorkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many rows a task returns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchMode {
    /// First row or nothing.
    One,
    /// Every row, in statement order.
    All,
}

impl FromStr for FetchMode {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one" | "get" => Ok(FetchMode::One),
            "all" => Ok(FetchMode::All),
            other => Err(TaskError::new(
                TaskErrorKind::InvalidRequest,
                format!("unsupported fetch mode: {}", other),
            )),
        }
    }
}

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindValue {
    Text(String),
    Integer(i64),
    Null,
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        BindValue::Text(value.to_string())
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        BindValue::Text(value)
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        BindValue::Integer(value)
    }
}

impl ToSql for BindValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            BindValue::Text(text) => text.to_sql(),
            BindValue::Integer(n) => n.to_sql(),
            BindValue::Null => rusqlite::types::Null.to_sql(),
        }
    }
}

/// Parameters of a task, either by position or by `:name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindValues {
    Positional(Vec<BindValue>),
    Named(Vec<(String, BindValue)>),
}

impl BindValues {
    pub fn none() -> Self {
        BindValues::Positional(Vec::new())
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<BindValue>,
    {
        BindValues::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            BindValues::Positional(values) => values.len(),
            BindValues::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a caller asks the pool to run: one pre-authored statement template
/// against one dataset file.
///
/// Templates are `&'static str` so only authored statements can ever reach a
/// worker; the placeholders `${mainTable}` and `${ftsTable}` are filled in by
/// the worker that runs the task.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// Dataset file name, relative to the data directory.
    pub dataset: &'static str,
    pub template: &'static str,
    pub binds: BindValues,
    pub fetch: FetchMode,
    pub fts_table: Option<&'static str>,
}

impl QueryRequest {
    pub fn all(dataset: &'static str, template: &'static str, binds: BindValues) -> Self {
        Self {
            dataset,
            template,
            binds,
            fetch: FetchMode::All,
            fts_table: None,
        }
    }

    pub fn one(dataset: &'static str, template: &'static str, binds: BindValues) -> Self {
        Self {
            fetch: FetchMode::One,
            ..Self::all(dataset, template, binds)
        }
    }

    pub fn with_fts(mut self, fts_table: &'static str) -> Self {
        self.fts_table = Some(fts_table);
        self
    }
}

/// A request once the coordinator has accepted it and given it an id.
#[derive(Debug, Clone)]
pub struct QueryTask {
    pub id: TaskId,
    pub request: QueryRequest,
}

/// Result of a task, shaped by its fetch mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryOutput {
    Row(Option<Record>),
    Rows(Vec<Record>),
}

impl QueryOutput {
    /// Coerces either shape into a list of rows.
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            QueryOutput::Row(row) => row.into_iter().collect(),
            QueryOutput::Rows(rows) => rows,
        }
    }
}

/// Categories of failure a worker can report for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskErrorKind {
    /// A placeholder could not be filled, or the value for it is not a safe identifier.
    SchemaResolution,
    /// The request itself is malformed (fetch mode, empty statement, bad dataset name).
    InvalidRequest,
    /// SQLite rejected or failed the statement.
    Query,
    /// The dataset file could not be opened.
    DatasetUnavailable,
}

impl TaskErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskErrorKind::SchemaResolution => "SchemaResolutionError",
            TaskErrorKind::InvalidRequest => "InvalidRequestError",
            TaskErrorKind::Query => "QueryError",
            TaskErrorKind::DatasetUnavailable => "DatasetUnavailableError",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "SchemaResolutionError" => TaskErrorKind::SchemaResolution,
            "InvalidRequestError" => TaskErrorKind::InvalidRequest,
            "DatasetUnavailableError" => TaskErrorKind::DatasetUnavailable,
            _ => TaskErrorKind::Query,
        }
    }
}

/// A task failure as seen by the caller of the pool.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}: {message}", .kind.name())]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
    /// Driver error code, when SQLite produced one.
    pub code: Option<String>,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl From<rusqlite::Error> for TaskError {
    fn from(err: rusqlite::Error) -> Self {
        let code = err.sqlite_error_code().map(|code| format!("{:?}", code));
        Self {
            kind: TaskErrorKind::Query,
            message: err.to_string(),
            code,
        }
    }
}

/// Errors returned by [`crate::executor::pool::WorkerPool`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoolError {
    /// The worker running (or about to run) the task died.
    #[error("worker {slot} failed: {reason}")]
    WorkerFailure { slot: WorkerSlot, reason: String },
    /// The pool is shutting down or already shut down.
    #[error("worker pool is shutting down")]
    ShuttingDown,
    /// The task ran and failed.
    #[error(transparent)]
    Task(#[from] TaskError),
}
