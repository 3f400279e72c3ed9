pub mod config;
pub mod error;

/// Index of a replica in the roster, in `[0, N)`.
pub type ReplicaId = usize;

/// Register values and timestamps, as carried on the wire.
pub type Value = i64;
pub type Timestamp = i64;

/// Correlation token of one operation, `id * N + counter`.
pub type SequenceNumber = u64;
