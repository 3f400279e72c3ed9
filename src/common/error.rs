use thiserror::Error;

use super::ReplicaId;
use crate::register::OperationKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cluster must contain at least one replica")]
    EmptyCluster,

    #[error("cannot tolerate {f} crashes with {n} replicas, need n > 2f")]
    FaultBudgetExceeded { n: usize, f: usize },

    #[error("replica id {id} is outside the roster of {n} replicas")]
    ReplicaIdOutOfRange { id: ReplicaId, n: usize },
}

/// Rejections raised by the Operation Coordinator. None of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("replica {id} already has a {in_flight} in flight")]
    Busy { id: ReplicaId, in_flight: OperationKind },

    #[error("replica {id} has no roster installed")]
    RosterNotInstalled { id: ReplicaId },

    #[error("replica {id} has crashed")]
    Crashed { id: ReplicaId },
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("replica {id} task failed: {source}")]
    ReplicaFailed {
        id: ReplicaId,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("correct replicas {pending:?} did not finish before the deadline")]
    Stalled { pending: Vec<ReplicaId> },
}
