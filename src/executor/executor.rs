//! Worker Executor
//!
//! Runs on a dedicated OS thread and processes one task at a time, in the
//! order the coordinator hands them over.
//!
//! ## Responsibilities
//! - **Resolution**: filling `${mainTable}` / `${ftsTable}` in the statement template.
//! - **Execution**: running the statement on the worker's private connection.
//! - **Conversion**: turning SQLite rows into JSON records.
//! - **Reporting**: sending exactly one response per task, and a final exit notice.

use super::protocol::{
    ErrorEnvelope, FTS_TABLE_PLACEHOLDER, MAIN_TABLE_PLACEHOLDER, TaskResponse, WorkerEvent,
};
use super::registry::ConnectionRegistry;
use super::types::*;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use crossbeam_channel::Receiver;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{Row, Statement};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedSender;

/// Something that can run a task on a worker thread.
///
/// One instance lives on each worker and is dropped when the worker exits,
/// so state such as open connections stays private to that worker.
pub trait TaskHandler: Send {
    fn execute(&mut self, request: &QueryRequest) -> Result<QueryOutput, TaskError>;
}

/// Builds a fresh handler for a (re)spawned worker.
pub type HandlerFactory = Arc<dyn Fn(WorkerSlot) -> Box<dyn TaskHandler> + Send + Sync>;

/// The production handler: runs templates against the dataset files.
pub struct DatasetExecutor {
    registry: ConnectionRegistry,
}

impl DatasetExecutor {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: ConnectionRegistry::new(data_dir),
        }
    }

    pub fn factory(data_dir: impl Into<PathBuf>) -> HandlerFactory {
        let data_dir = data_dir.into();
        Arc::new(move |_slot: WorkerSlot| {
            Box::new(DatasetExecutor::new(data_dir.clone())) as Box<dyn TaskHandler>
        })
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}

impl TaskHandler for DatasetExecutor {
    fn execute(&mut self, request: &QueryRequest) -> Result<QueryOutput, TaskError> {
        if request.template.trim().is_empty() {
            return Err(TaskError::new(
                TaskErrorKind::InvalidRequest,
                "empty statement template",
            ));
        }

        let handle = self.registry.handle(request.dataset)?;
        let sql = resolve_template(
            request.template,
            handle.main_table.as_deref(),
            request.fts_table,
        )?;

        let mut stmt = handle.conn.prepare_cached(&sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        match request.fetch {
            FetchMode::One => {
                let row = query_rows(&mut stmt, &request.binds, &columns, Some(1))?;
                Ok(QueryOutput::Row(row.into_iter().next()))
            }
            FetchMode::All => Ok(QueryOutput::Rows(query_rows(
                &mut stmt,
                &request.binds,
                &columns,
                None,
            )?)),
        }
    }
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("identifier pattern is valid"));

/// Checks that a table name is safe to splice into a statement.
pub fn validate_identifier(name: &str) -> Result<(), TaskError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(TaskError::new(
            TaskErrorKind::SchemaResolution,
            format!("invalid table identifier: {:?}", name),
        ))
    }
}

/// Substitutes the table placeholders of `template`.
///
/// A placeholder that appears in the template must have a value; a value
/// with no matching placeholder is ignored.
pub fn resolve_template(
    template: &str,
    main_table: Option<&str>,
    fts_table: Option<&str>,
) -> Result<String, TaskError> {
    let mut sql = template.to_string();

    for (placeholder, value, what) in [
        (MAIN_TABLE_PLACEHOLDER, main_table, "main table"),
        (FTS_TABLE_PLACEHOLDER, fts_table, "full-text table"),
    ] {
        if !sql.contains(placeholder) {
            continue;
        }
        let name = value.ok_or_else(|| {
            TaskError::new(
                TaskErrorKind::SchemaResolution,
                format!("statement needs a {} but none is known", what),
            )
        })?;
        validate_identifier(name)?;
        sql = sql.replace(placeholder, name);
    }

    Ok(sql)
}

fn query_rows(
    stmt: &mut Statement<'_>,
    binds: &BindValues,
    columns: &[String],
    limit: Option<usize>,
) -> Result<Vec<Record>, TaskError> {
    let mut rows = match binds {
        BindValues::Positional(values) => stmt.query(rusqlite::params_from_iter(values.iter()))?,
        BindValues::Named(values) => {
            let named: Vec<(&str, &dyn rusqlite::ToSql)> = values
                .iter()
                .map(|(name, value)| (name.as_str(), value as &dyn rusqlite::ToSql))
                .collect();
            stmt.query(named.as_slice())?
        }
    };

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(row_to_record(row, columns)?);
        if limit.is_some_and(|limit| records.len() >= limit) {
            break;
        }
    }
    Ok(records)
}

fn row_to_record(row: &Row<'_>, columns: &[String]) -> Result<Record, TaskError> {
    let mut record = Record::new();
    for (idx, name) in columns.iter().enumerate() {
        record.insert(name.clone(), value_to_json(row.get_ref(idx)?));
    }
    Ok(record)
}

/// Maps one SQLite value to JSON. Blobs become base64 text.
pub fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::from(n),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(BASE64.encode(bytes)),
    }
}

/// Sends `Exited` when the worker thread ends, including by panic.
struct ExitNotice {
    slot: WorkerSlot,
    generation: u64,
    events: UnboundedSender<WorkerEvent>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let panicked = std::thread::panicking();
        // The coordinator may already be gone during shutdown.
        let _ = self.events.send(WorkerEvent::Exited {
            slot: self.slot,
            generation: self.generation,
            panicked,
        });
    }
}

/// Starts a worker thread for `slot`.
///
/// The thread runs until its task channel is closed. Every task produces one
/// `Completed` event; the thread's last event is always `Exited`.
pub fn spawn_worker(
    slot: WorkerSlot,
    generation: u64,
    factory: HandlerFactory,
    tasks: Receiver<QueryTask>,
    events: UnboundedSender<WorkerEvent>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("dataset-worker-{}", slot))
        .spawn(move || {
            let _notice = ExitNotice {
                slot,
                generation,
                events: events.clone(),
            };
            // Declared after the notice so connections are closed before it fires.
            let mut handler = factory(slot);

            tracing::info!("Worker {} started (generation {})", slot, generation);

            while let Ok(task) = tasks.recv() {
                tracing::trace!("Worker {} running task {}", slot, task.id);

                let outcome = handler
                    .execute(&task.request)
                    .map_err(ErrorEnvelope::from);
                if let Err(envelope) = &outcome {
                    tracing::debug!(
                        "Task {} on {} failed: {}",
                        task.id,
                        task.request.dataset,
                        envelope.message
                    );
                }

                let response = TaskResponse::from_result(task.id, outcome);
                if events
                    .send(WorkerEvent::Completed {
                        slot,
                        generation,
                        response,
                    })
                    .is_err()
                {
                    break;
                }
            }

            tracing::info!("Worker {} stopped (generation {})", slot, generation);
        })
}
