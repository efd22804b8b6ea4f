//! The collection actor.
//!
//! One task per collection owns the records and the backend; handles are
//! cheap clones of an mpsc sender. Because every operation flows through
//! that single channel, the FIFO queue *is* the synchronization primitive:
//! no locks, no torn reads, no lost updates.
//!
//! Persistence runs inline on the collection task, write-and-fsync per
//! mutation. Collections are small JSON files and writes are serialized per
//! collection anyway, so the fsync stalls only this collection's queue;
//! readers of other collections and the rest of the runtime keep going.

use crate::backend::StorageBackend;
use crate::errors::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// Operation queue depth. Enqueueing beyond this applies backpressure
/// rather than growing without bound.
const QUEUE_DEPTH: usize = 256;

type Apply<R> = Box<dyn FnOnce(&mut Vec<R>) + Send>;

enum Op<R> {
    ReadAll {
        reply: oneshot::Sender<Vec<R>>,
    },
    ReplaceAll {
        records: Vec<R>,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    Update {
        apply: Apply<R>,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
}

/// Handle to a durable, totally-ordered collection of records.
///
/// Clones share the same underlying task and therefore the same ordering.
pub struct Collection<R> {
    name: &'static str,
    tx: mpsc::Sender<Op<R>>,
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<R> Collection<R>
where
    R: Serialize + DeserializeOwned + Clone + Send + 'static,
{
    /// Open a collection: load the durable state (missing backend contents
    /// mean first-time initialization, i.e. empty) and spawn the owning
    /// task. Any other load failure is surfaced, never masked as empty.
    pub fn open<B: StorageBackend>(name: &'static str, backend: B) -> Result<Self, StoreError> {
        let records = match backend.load()? {
            Some(bytes) => serde_json::from_slice::<Vec<R>>(&bytes).map_err(|e| {
                StoreError::Corrupt {
                    message: format!("{name}: {e}"),
                }
            })?,
            None => {
                debug!(collection = name, "no durable state, starting empty");
                Vec::new()
            }
        };

        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(run_collection(name, backend, records, rx));
        Ok(Self { name, tx })
    }

    /// Snapshot of all records. Never observes a half-applied write because
    /// the read is queued behind any in-flight operation.
    pub async fn read_all(&self) -> Result<Vec<R>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Op::ReadAll { reply })
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Replace the entire collection. Durable before the next queued
    /// operation runs.
    pub async fn replace_all(&self, records: Vec<R>) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Op::ReplaceAll { records, reply })
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Read-modify-write as one queued operation.
    ///
    /// The closure runs inside the queue with exclusive access to the
    /// records; its return value is handed back only after the mutation is
    /// durable. On persist failure the in-memory state is rolled back and
    /// the closure's result is discarded.
    pub async fn update<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Vec<R>) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (value_tx, value_rx) = oneshot::channel::<T>();
        let apply: Apply<R> = Box::new(move |records| {
            let value = f(records);
            // Receiver dropped only if the caller gave up; the mutation
            // still lands (cancellation does not withdraw a queued write).
            let _ = value_tx.send(value);
        });

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Op::Update { apply, reply })
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)??;
        value_rx.await.map_err(|_| StoreError::Closed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

async fn run_collection<R, B>(
    name: &'static str,
    mut backend: B,
    mut records: Vec<R>,
    mut rx: mpsc::Receiver<Op<R>>,
) where
    R: Serialize + Clone + Send + 'static,
    B: StorageBackend,
{
    // Last state known to be durable; persist failures roll back to it.
    let mut durable = records.clone();

    while let Some(op) = rx.recv().await {
        match op {
            Op::ReadAll { reply } => {
                let _ = reply.send(records.clone());
            }
            Op::ReplaceAll {
                records: next,
                reply,
            } => {
                records = next;
                let result = persist(name, &mut backend, &records);
                match &result {
                    Ok(()) => durable = records.clone(),
                    Err(_) => records = durable.clone(),
                }
                let _ = reply.send(result);
            }
            Op::Update { apply, reply } => {
                apply(&mut records);
                let result = persist(name, &mut backend, &records);
                match &result {
                    Ok(()) => durable = records.clone(),
                    Err(_) => records = durable.clone(),
                }
                let _ = reply.send(result);
            }
        }
    }
    debug!(collection = name, "collection task shutting down");
}

fn persist<R: Serialize, B: StorageBackend>(
    name: &'static str,
    backend: &mut B,
    records: &[R],
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(records).map_err(|e| StoreError::Serialization {
        message: format!("{name}: {e}"),
    })?;
    backend.persist(&bytes).map_err(|e| {
        error!(collection = name, error = %e, "persist failed, rolling back");
        e
    })
}
