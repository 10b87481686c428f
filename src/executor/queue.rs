//! Dispatch Queue
//!
//! The coordinator's bookkeeping: a FIFO of accepted tasks, the table of
//! pending calls, and the state of every worker slot. All of it is owned by
//! the single coordinator task in [`super::pool`], so none of it is locked.
//!
//! ## Rules
//! - **Affinity**: a worker holds at most one in-flight task; a task is only
//!   handed to an idle worker.
//! - **Order**: tasks leave the queue in submission order.
//! - **Failure**: when a worker dies, every call assigned to it is rejected
//!   with `WorkerFailure` (never retried) and the slot is refilled.
//! - **Shutdown**: every outstanding call is rejected with `ShuttingDown`.

use super::executor::{HandlerFactory, spawn_worker};
use super::protocol::{TaskResponse, WorkerEvent};
use super::types::*;

use crossbeam_channel::Sender;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

pub type Reply = oneshot::Sender<Result<QueryOutput, PoolError>>;

/// A caller waiting for its task.
pub struct PendingCall {
    pub reply: Reply,
    /// Worker currently running the task; `None` while it is still queued.
    pub assigned: Option<WorkerSlot>,
}

struct WorkerState {
    slot: WorkerSlot,
    generation: u64,
    /// `None` once the worker is known to be dead or released.
    sender: Option<Sender<QueryTask>>,
    in_flight: Option<TaskId>,
}

impl WorkerState {
    fn is_idle(&self) -> bool {
        self.sender.is_some() && self.in_flight.is_none()
    }
}

/// Point-in-time view of one worker slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerSnapshot {
    pub slot: usize,
    pub generation: u64,
    pub alive: bool,
    pub in_flight: usize,
}

/// Point-in-time view of the whole pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSnapshot {
    pub workers: Vec<WorkerSnapshot>,
    pub queued: usize,
    pub pending: usize,
    /// Tasks accepted since the pool started.
    pub submitted: u64,
    pub shutting_down: bool,
}

pub struct Dispatcher {
    queue: VecDeque<QueryTask>,
    pending: HashMap<TaskId, PendingCall>,
    workers: Vec<WorkerState>,
    factory: HandlerFactory,
    events: UnboundedSender<WorkerEvent>,
    next_id: u64,
    shutting_down: bool,
}

impl Dispatcher {
    /// Spawns `size` workers. Fails if any worker thread cannot be started.
    pub fn start(
        size: usize,
        factory: HandlerFactory,
        events: UnboundedSender<WorkerEvent>,
    ) -> Result<Self, PoolError> {
        let mut dispatcher = Self {
            queue: VecDeque::new(),
            pending: HashMap::new(),
            workers: Vec::with_capacity(size),
            factory,
            events,
            next_id: 0,
            shutting_down: false,
        };

        for idx in 0..size.max(1) {
            let slot = WorkerSlot(idx);
            let sender = dispatcher.spawn(slot, 0)?;
            dispatcher.workers.push(WorkerState {
                slot,
                generation: 0,
                sender: Some(sender),
                in_flight: None,
            });
        }

        Ok(dispatcher)
    }

    fn spawn(&self, slot: WorkerSlot, generation: u64) -> Result<Sender<QueryTask>, PoolError> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        spawn_worker(
            slot,
            generation,
            self.factory.clone(),
            receiver,
            self.events.clone(),
        )
        .map_err(|e| PoolError::WorkerFailure {
            slot,
            reason: format!("cannot spawn worker thread: {}", e),
        })?;
        Ok(sender)
    }

    /// Accepts a request, queues it, and dispatches what can be dispatched.
    pub fn submit(&mut self, request: QueryRequest, reply: Reply) {
        if self.shutting_down {
            let _ = reply.send(Err(PoolError::ShuttingDown));
            return;
        }

        let id = TaskId(self.next_id);
        self.next_id += 1;

        tracing::trace!("Queued task {} for {}", id, request.dataset);

        self.pending.insert(
            id,
            PendingCall {
                reply,
                assigned: None,
            },
        );
        self.queue.push_back(QueryTask { id, request });
        self.drain();
    }

    /// Hands queued tasks to idle workers, oldest task first.
    pub fn drain(&mut self) {
        while !self.queue.is_empty() {
            let Some(worker) = self.workers.iter_mut().find(|w| w.is_idle()) else {
                break;
            };
            let Some(task) = self.queue.pop_front() else {
                break;
            };

            // The caller may have given up while the task was queued.
            if self.pending.get(&task.id).is_none_or(|call| call.reply.is_closed()) {
                self.pending.remove(&task.id);
                tracing::trace!("Dropping abandoned task {}", task.id);
                continue;
            }

            let id = task.id;
            let Some(sender) = worker.sender.as_ref() else {
                self.queue.push_front(task);
                break;
            };

            match sender.send(task) {
                Ok(()) => {
                    worker.in_flight = Some(id);
                    if let Some(call) = self.pending.get_mut(&id) {
                        call.assigned = Some(worker.slot);
                    }
                    tracing::debug!("Dispatched task {} to worker {}", id, worker.slot);
                }
                Err(crossbeam_channel::SendError(task)) => {
                    // Worker died; its exit event will arrive shortly.
                    tracing::debug!("Worker {} is gone, requeueing task {}", worker.slot, id);
                    worker.sender = None;
                    self.queue.push_front(task);
                }
            }
        }
    }

    pub fn handle_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Completed {
                slot,
                generation,
                response,
            } => self.on_completed(slot, generation, response),
            WorkerEvent::Exited {
                slot,
                generation,
                panicked,
            } => self.on_exited(slot, generation, panicked),
        }
    }

    fn on_completed(&mut self, slot: WorkerSlot, generation: u64, response: TaskResponse) {
        if let Some(worker) = self.worker_mut(slot, generation) {
            if worker.in_flight == Some(response.task_id) {
                worker.in_flight = None;
            }
        }

        let task_id = response.task_id;
        match self.pending.remove(&task_id) {
            Some(call) => {
                // A dropped receiver just means the caller stopped waiting.
                let _ = call.reply.send(response.into_result().map_err(PoolError::from));
            }
            None => tracing::trace!("No pending call for task {}", task_id),
        }

        self.drain();
    }

    fn on_exited(&mut self, slot: WorkerSlot, generation: u64, panicked: bool) {
        let Some(worker) = self.worker_mut(slot, generation) else {
            return;
        };
        worker.sender = None;
        worker.in_flight = None;

        if self.shutting_down {
            return;
        }

        let reason = if panicked {
            "worker panicked".to_string()
        } else {
            "worker exited unexpectedly".to_string()
        };
        tracing::error!("Worker {} (generation {}) died: {}", slot, generation, reason);

        self.reject_assigned(slot, &reason);

        let generation = generation + 1;
        match self.spawn(slot, generation) {
            Ok(sender) => {
                if let Some(worker) = self.workers.get_mut(slot.0) {
                    worker.generation = generation;
                    worker.sender = Some(sender);
                }
                tracing::info!("Replaced worker {} (generation {})", slot, generation);
            }
            Err(e) => {
                tracing::error!("Could not replace worker {}: {}", slot, e);
                if self.workers.iter().all(|w| w.sender.is_none()) {
                    self.reject_queued(PoolError::WorkerFailure {
                        slot,
                        reason: "no live workers".to_string(),
                    });
                }
            }
        }

        self.drain();
    }

    fn reject_assigned(&mut self, slot: WorkerSlot, reason: &str) {
        let failed: Vec<TaskId> = self
            .pending
            .iter()
            .filter(|(_, call)| call.assigned == Some(slot))
            .map(|(id, _)| *id)
            .collect();

        for id in failed {
            if let Some(call) = self.pending.remove(&id) {
                tracing::warn!("Rejecting task {} after worker {} failure", id, slot);
                let _ = call.reply.send(Err(PoolError::WorkerFailure {
                    slot,
                    reason: reason.to_string(),
                }));
            }
        }
    }

    fn reject_queued(&mut self, error: PoolError) {
        for task in self.queue.drain(..) {
            if let Some(call) = self.pending.remove(&task.id) {
                let _ = call.reply.send(Err(error.clone()));
            }
        }
    }

    /// Rejects every outstanding call and releases every worker.
    ///
    /// Idempotent. Worker threads are not joined: a worker stuck in a long
    /// statement finishes it and then sees its channel closed.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        tracing::info!(
            "Shutting down worker pool ({} pending calls)",
            self.pending.len()
        );

        self.queue.clear();
        for (_, call) in self.pending.drain() {
            let _ = call.reply.send(Err(PoolError::ShuttingDown));
        }
        for worker in &mut self.workers {
            worker.sender = None;
            worker.in_flight = None;
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            workers: self
                .workers
                .iter()
                .map(|w| WorkerSnapshot {
                    slot: w.slot.0,
                    generation: w.generation,
                    alive: w.sender.is_some(),
                    in_flight: usize::from(w.in_flight.is_some()),
                })
                .collect(),
            queued: self.queue.len(),
            pending: self.pending.len(),
            submitted: self.next_id,
            shutting_down: self.shutting_down,
        }
    }

    fn worker_mut(&mut self, slot: WorkerSlot, generation: u64) -> Option<&mut WorkerState> {
        self.workers
            .get_mut(slot.0)
            .filter(|w| w.generation == generation)
    }
}
