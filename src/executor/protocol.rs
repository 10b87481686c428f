//! Worker Message Protocol
//!
//! Messages exchanged between the coordinator and the worker threads. Only
//! plain data crosses the thread boundary: a worker never sees the caller's
//! reply channel, and a caller never sees a worker's connection.
//!
//! Errors travel as an [`ErrorEnvelope`] (`name`, `message`, `code`) and are
//! rebuilt into a [`TaskError`] on the coordinator side.

use super::types::*;
use serde::{Deserialize, Serialize};

pub const MAIN_TABLE_PLACEHOLDER: &str = "${mainTable}";
pub const FTS_TABLE_PLACEHOLDER: &str = "${ftsTable}";

/// Serializable form of a task failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<TaskError> for ErrorEnvelope {
    fn from(err: TaskError) -> Self {
        Self {
            name: err.kind.name().to_string(),
            message: err.message,
            code: err.code,
        }
    }
}

impl From<ErrorEnvelope> for TaskError {
    fn from(envelope: ErrorEnvelope) -> Self {
        Self {
            kind: TaskErrorKind::from_name(&envelope.name),
            message: envelope.message,
            code: envelope.code,
        }
    }
}

/// Response for exactly one task; either `result` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl TaskResponse {
    pub fn from_result(task_id: TaskId, outcome: Result<QueryOutput, ErrorEnvelope>) -> Self {
        match outcome {
            Ok(output) => Self {
                task_id,
                result: Some(output),
                error: None,
            },
            Err(envelope) => Self {
                task_id,
                result: None,
                error: Some(envelope),
            },
        }
    }

    pub fn into_result(self) -> Result<QueryOutput, TaskError> {
        match (self.result, self.error) {
            (_, Some(envelope)) => Err(envelope.into()),
            (Some(output), None) => Ok(output),
            (None, None) => Err(TaskError::new(
                TaskErrorKind::InvalidRequest,
                format!("empty response for task {}", self.task_id),
            )),
        }
    }
}

/// Worker to coordinator notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// A task finished (successfully or not).
    Completed {
        slot: WorkerSlot,
        generation: u64,
        response: TaskResponse,
    },
    /// The worker thread is gone. Always the last event of a generation.
    Exited {
        slot: WorkerSlot,
        generation: u64,
        panicked: bool,
    },
}
