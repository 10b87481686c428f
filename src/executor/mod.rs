//! Worker Pool Executor Module
//!
//! This module implements the dispatch engine that runs dataset queries on a
//! fixed set of isolated worker threads.
//!
//! ## Architecture Overview
//! The executor follows a **Push-based** model with **Affinity** tracking:
//! 1. **Submission**: Callers submit a `QueryRequest` through a `WorkerPool` handle.
//!    The coordinator gives it a `TaskId` and appends it to a FIFO queue.
//! 2. **Dispatch**: Whenever a worker is idle, the oldest queued task is pushed to it.
//!    A worker never holds more than one task at a time.
//! 3. **Execution**: Each worker thread owns private read-only SQLite connections,
//!    opened lazily per dataset file, and runs tasks strictly one after another.
//! 4. **Failure**: If a worker dies, its in-flight call is rejected (at-most-once
//!    semantics) and a replacement worker takes over the same slot.
//!
//! ## Submodules
//! - **`types`**: Task, request, output and error types shared by every layer.
//! - **`protocol`**: Messages exchanged between the coordinator and the workers.
//! - **`registry`**: Per-worker map of dataset files to open connections.
//! - **`executor`**: The worker thread loop and the statement runner.
//! - **`queue`**: The coordinator's dispatch state (queue, pending calls, worker slots).
//! - **`pool`**: The public handle and the coordinator task.

pub mod executor;
pub mod pool;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;
