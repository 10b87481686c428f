//! Worker Pool Handle
//!
//! [`WorkerPool`] is a cheap, cloneable handle to a coordinator task that owns
//! the [`Dispatcher`]. Callers talk to the coordinator through a command
//! channel; workers talk to it through an event channel. The coordinator
//! processes both, one message at a time.

use super::executor::{DatasetExecutor, HandlerFactory};
use super::protocol::WorkerEvent;
use super::queue::{Dispatcher, PoolSnapshot, Reply};
use super::types::*;

use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

enum Command {
    Submit { request: QueryRequest, reply: Reply },
    Snapshot { reply: oneshot::Sender<PoolSnapshot> },
    Shutdown { reply: oneshot::Sender<()> },
}

#[derive(Clone)]
pub struct WorkerPool {
    commands: mpsc::UnboundedSender<Command>,
    size: usize,
}

impl WorkerPool {
    /// Starts a pool of `size` workers, each with a handler built by `factory`.
    ///
    /// Must be called from inside a Tokio runtime.
    pub fn with_handler(size: usize, factory: HandlerFactory) -> Result<Self, PoolError> {
        let size = size.max(1);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let dispatcher = Dispatcher::start(size, factory, event_tx)?;
        tokio::spawn(coordinate(dispatcher, command_rx, event_rx));

        tracing::info!("Worker pool started with {} workers", size);

        Ok(Self {
            commands: command_tx,
            size,
        })
    }

    /// Starts a pool whose workers run statements against files in `data_dir`.
    pub fn for_datasets(size: usize, data_dir: impl Into<PathBuf>) -> Result<Self, PoolError> {
        Self::with_handler(size, DatasetExecutor::factory(data_dir))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs one request on some worker and waits for its result.
    pub async fn submit(&self, request: QueryRequest) -> Result<QueryOutput, PoolError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Submit { request, reply })
            .map_err(|_| PoolError::ShuttingDown)?;
        rx.await.unwrap_or(Err(PoolError::ShuttingDown))
    }

    /// Rejects all outstanding work and releases the workers. Idempotent.
    pub async fn shutdown(&self) -> Result<(), PoolError> {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).is_err() {
            return Ok(());
        }
        let _ = rx.await;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<PoolSnapshot, PoolError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .map_err(|_| PoolError::ShuttingDown)?;
        rx.await.map_err(|_| PoolError::ShuttingDown)
    }
}

async fn coordinate(
    mut dispatcher: Dispatcher,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut events: mpsc::UnboundedReceiver<WorkerEvent>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Submit { request, reply }) => dispatcher.submit(request, reply),
                Some(Command::Snapshot { reply }) => {
                    let _ = reply.send(dispatcher.snapshot());
                }
                Some(Command::Shutdown { reply }) => {
                    dispatcher.shutdown();
                    let _ = reply.send(());
                }
                None => {
                    // Every handle is gone.
                    dispatcher.shutdown();
                    break;
                }
            },
            Some(event) = events.recv() => dispatcher.handle_event(event),
        }
    }

    tracing::debug!("Worker pool coordinator stopped");
}
