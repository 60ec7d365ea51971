use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    core::store::{OptimisticState, OptimisticStore, OptimisticUpdateOptions, RollbackCause},
    op::{OperationId, OperationKind},
};

use super::events::StoreEvent;

/// Failure talking to a collection runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// The runtime task has stopped.
    #[error("collection runtime is not running")]
    ChannelClosed,
}

/// Channel sizing for a collection runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Bound of the command queue.
    pub command_queue_bound: usize,
    /// Capacity of the event broadcast ring.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_capacity: 1024,
        }
    }
}

/// Cloneable handle to a collection owned by a runtime task.
pub struct CollectionHandle<T> {
    cmd_tx: mpsc::Sender<Command<T>>,
    events_tx: broadcast::Sender<StoreEvent>,
}

impl<T> Clone for CollectionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

type StoreFn<T> = Box<dyn FnOnce(&mut OptimisticStore<T>) -> Option<OperationId> + Send>;
type ReconcileFn<T> = Box<dyn FnOnce(&T) -> T + Send>;

enum Command<T> {
    Apply {
        run: StoreFn<T>,
    },
    Confirm {
        id: OperationId,
        reconcile: Option<ReconcileFn<T>>,
        options: OptimisticUpdateOptions<T>,
        resp: oneshot::Sender<bool>,
    },
    Rollback {
        id: OperationId,
        cause: Option<RollbackCause>,
        options: OptimisticUpdateOptions<T>,
        resp: oneshot::Sender<bool>,
    },
    RollbackAll {
        resp: oneshot::Sender<Vec<OperationId>>,
    },
    UpdateServerData {
        value: T,
        resp: oneshot::Sender<()>,
    },
    ClearError {
        resp: oneshot::Sender<()>,
    },
    State {
        resp: oneshot::Sender<OptimisticState<T>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Moves `store` into a new single-writer task and returns its handle.
///
/// Must be called inside a tokio runtime.
pub fn spawn_collection<T>(store: OptimisticStore<T>, config: RuntimeConfig) -> CollectionHandle<T>
where
    T: Clone + Send + 'static,
{
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command<T>>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<StoreEvent>(config.event_capacity.max(1));

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut store = store;

        loop {
            let deadline = store.next_deadline();
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    if handle_command(cmd, &mut store, &events_tx_loop) {
                        break;
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    for id in store.expire_due(Instant::now()) {
                        warn!(op_id = %id, "optimistic operation timed out, rolled back");
                        let _ = events_tx_loop.send(StoreEvent::TimedOut { id });
                    }
                }
            }
        }
    });

    CollectionHandle { cmd_tx, events_tx }
}

impl<T> CollectionHandle<T>
where
    T: Clone + Send + 'static,
{
    /// Subscribes to store events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events_tx.subscribe()
    }

    /// Makes `updated` visible immediately and records a rollback point.
    pub async fn apply(
        &self,
        updated: T,
        kind: OperationKind,
        data: serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<OperationId, RuntimeError> {
        self.apply_with(kind, data, timeout, move |_| Ok::<T, RuntimeError>(updated))
            .await
    }

    /// Computes the next value from the current one inside the runtime, so
    /// no other transition can interleave. An `Err` from `f` records
    /// nothing.
    pub async fn apply_with<E, F>(
        &self,
        kind: OperationKind,
        data: serde_json::Value,
        timeout: Option<Duration>,
        f: F,
    ) -> Result<OperationId, E>
    where
        E: From<RuntimeError> + Send + 'static,
        F: FnOnce(&T) -> Result<T, E> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel::<Result<OperationId, E>>();
        let run: StoreFn<T> = Box::new(move |store| {
            let res = store.apply_with(kind, data, timeout, f);
            let id = res.as_ref().ok().cloned();
            let _ = tx.send(res);
            id
        });
        self.cmd_tx
            .send(Command::Apply { run })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Confirms `id`; returns false if it was already resolved.
    pub async fn confirm(
        &self,
        id: OperationId,
        server_value: Option<T>,
        options: OptimisticUpdateOptions<T>,
    ) -> Result<bool, RuntimeError> {
        let reconcile = server_value.map(|value| -> ReconcileFn<T> { Box::new(move |_: &T| value) });
        self.send_confirm(id, reconcile, options).await
    }

    /// Confirms `id`, computing server truth from the value current at
    /// resolution time.
    pub async fn confirm_with<F>(
        &self,
        id: OperationId,
        reconcile: F,
        options: OptimisticUpdateOptions<T>,
    ) -> Result<bool, RuntimeError>
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.send_confirm(id, Some(Box::new(reconcile)), options).await
    }

    async fn send_confirm(
        &self,
        id: OperationId,
        reconcile: Option<ReconcileFn<T>>,
        options: OptimisticUpdateOptions<T>,
    ) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Confirm {
                id,
                reconcile,
                options,
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Rolls back `id`; returns false if it was already resolved.
    pub async fn rollback(
        &self,
        id: OperationId,
        cause: Option<RollbackCause>,
        options: OptimisticUpdateOptions<T>,
    ) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Rollback {
                id,
                cause,
                options,
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Discards every pending operation.
    pub async fn rollback_all(&self) -> Result<Vec<OperationId>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::RollbackAll { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Hands server truth to the store.
    pub async fn update_server_data(&self, value: T) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::UpdateServerData { value, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Clears the last rollback cause.
    pub async fn clear_error(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ClearError { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Snapshot of the store.
    pub async fn state(&self) -> Result<OptimisticState<T>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::State { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Stops the runtime task; pending deadlines no longer fire.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

fn handle_command<T: Clone>(
    cmd: Command<T>,
    store: &mut OptimisticStore<T>,
    events_tx: &broadcast::Sender<StoreEvent>,
) -> bool {
    match cmd {
        Command::Apply { run } => {
            if let Some(id) = run(store) {
                if let Some(op) = store.pending_operations().iter().rev().find(|op| op.id == id) {
                    debug!(op_id = %id, kind = %op.kind, "optimistic update applied");
                    let _ = events_tx.send(StoreEvent::Applied {
                        id,
                        kind: op.kind.clone(),
                    });
                }
            }
        }
        Command::Confirm {
            id,
            reconcile,
            options,
            resp,
        } => {
            let resolved = match reconcile {
                Some(f) => store.confirm_with(&id, f, options),
                None => store.confirm(&id, None, options),
            };
            if resolved {
                debug!(op_id = %id, "optimistic update confirmed");
                let _ = events_tx.send(StoreEvent::Confirmed { id });
            } else {
                debug!(op_id = %id, "confirm ignored, operation already resolved");
            }
            let _ = resp.send(resolved);
        }
        Command::Rollback {
            id,
            cause,
            options,
            resp,
        } => {
            let resolved = store.rollback(&id, cause, options);
            if resolved {
                let cause = store.error().cloned().unwrap_or(RollbackCause::Manual);
                debug!(op_id = %id, %cause, "optimistic update rolled back");
                let _ = events_tx.send(StoreEvent::RolledBack { id, cause });
            } else {
                debug!(op_id = %id, "rollback ignored, operation already resolved");
            }
            let _ = resp.send(resolved);
        }
        Command::RollbackAll { resp } => {
            let ids = store.rollback_all();
            if !ids.is_empty() {
                info!(count = ids.len(), "discarded all pending optimistic updates");
                let _ = events_tx.send(StoreEvent::RolledBackAll { ids: ids.clone() });
            }
            let _ = resp.send(ids);
        }
        Command::UpdateServerData { value, resp } => {
            store.update_server_data(value);
            let deferred = store.deferred().is_some();
            let _ = events_tx.send(StoreEvent::ServerData { deferred });
            let _ = resp.send(());
        }
        Command::ClearError { resp } => {
            store.clear_error();
            let _ = events_tx.send(StoreEvent::ErrorCleared);
            let _ = resp.send(());
        }
        Command::State { resp } => {
            let _ = resp.send(store.state());
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}
