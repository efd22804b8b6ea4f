//! # Record Store
//!
//! Durable ID-keyed collections with serialized, totally-ordered writes.
//!
//! ## Architecture
//!
//! Each [`Collection`] is backed by a dedicated task that owns both the
//! in-memory records and the [`StorageBackend`]. Every operation, whether a
//! read, a replace, or a read-modify-write, is a message on one mpsc channel, so:
//!
//! - all writes against a collection are totally ordered (FIFO): operation
//!   N+1 begins only after operation N's durable write has completed,
//!   success or failure;
//! - a read never observes a partially written state; it is a snapshot
//!   taken between queued operations;
//! - a caller's read-modify-write submitted as one [`Collection::update`]
//!   closure is atomic relative to every other queued operation, which is
//!   what prevents lost updates under concurrent writers.
//!
//! ## Failure semantics
//!
//! Underlying I/O failure surfaces as a [`StoreError`]; it is never treated
//! as "empty". The single exception is first-time initialization: a missing
//! collection file means an empty collection. A failed persist rolls the
//! in-memory state back to the last durable snapshot, so later reads do not
//! observe an unflushed write.
//!
//! Once an operation is enqueued it either lands fully or the process dies
//! before flushing; dropping the caller's future does not withdraw it.

pub mod backend;
pub mod collection;
pub mod errors;

pub use backend::{InMemoryBackend, JsonFileBackend, StorageBackend};
pub use collection::Collection;
pub use errors::StoreError;
