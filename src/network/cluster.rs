use std::collections::{BTreeMap, BTreeSet};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedReceiver},
    time::{timeout_at, Instant},
};
use tracing::{debug, info, warn};

use super::node::{spawn_replica, ReplicaHandle};
use crate::{
    common::{config::ClusterConfig, error::ClusterError, ReplicaId},
    register::{Completion, ReplicaEvent, Roster, Versioned},
};

/// Outcome of one cluster run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterReport {
    pub faulty: Vec<ReplicaId>,
    pub correct: Vec<ReplicaId>,
    /// Completed operations per replica, in completion order.
    pub completions: BTreeMap<ReplicaId, Vec<Completion>>,
    /// Register pair each replica held when it stopped.
    pub registers: BTreeMap<ReplicaId, Versioned>,
}

/// Bootstrap harness: owns every replica task and the shared event stream.
pub struct Cluster {
    config: ClusterConfig,
    replicas: Vec<ReplicaHandle>,
    event_rx: UnboundedReceiver<ReplicaEvent>,
    finished: BTreeSet<ReplicaId>,
    report: ClusterReport,
}

impl Cluster {
    /// Spawns N replicas and installs the full roster on each of them.
    pub fn spawn(config: ClusterConfig) -> Result<Self, ClusterError> {
        config.validate()?;
        info!(n = config.n, f = config.f, m = config.m, "starting cluster");

        let (event_tx, event_rx) = unbounded_channel();
        let replicas = (0..config.n)
            .map(|id| spawn_replica(config.replica(id), Some(event_tx.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        let roster = Roster::new(replicas.iter().map(|r| r.inbox.clone()).collect());
        for replica in &replicas {
            replica.install_roster(roster.clone());
        }

        Ok(Cluster {
            config,
            replicas,
            event_rx,
            finished: BTreeSet::new(),
            report: ClusterReport::default(),
        })
    }

    /// Picks f replicas at random to be faulty. Returns `(faulty, correct)`.
    pub fn choose_faulty(&self) -> (Vec<ReplicaId>, Vec<ReplicaId>) {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut ids: Vec<ReplicaId> = (0..self.config.n).collect();
        ids.shuffle(&mut rng);

        let mut faulty = ids[..self.config.f].to_vec();
        let mut correct = ids[self.config.f..].to_vec();
        faulty.sort_unstable();
        correct.sort_unstable();
        (faulty, correct)
    }

    pub fn crash(&mut self, ids: &[ReplicaId]) {
        for &id in ids {
            if let Some(replica) = self.replicas.get(id) {
                replica.crash();
            }
        }
        self.report.faulty.extend_from_slice(ids);
    }

    pub fn launch(&mut self, ids: &[ReplicaId]) {
        for &id in ids {
            if let Some(replica) = self.replicas.get(id) {
                replica.launch();
            }
        }
        self.report.correct.extend_from_slice(ids);
    }

    /// Waits until every replica in `ids` has finished its schedule, or the
    /// configured wait elapses.
    pub async fn wait_for(&mut self, ids: &[ReplicaId]) -> Result<(), ClusterError> {
        let deadline = Instant::now() + self.config.wait;
        while !ids.iter().all(|id| self.finished.contains(id)) {
            match timeout_at(deadline, self.event_rx.recv()).await {
                Ok(Some(event)) => self.record(event),
                // Channel closed or deadline passed.
                Ok(None) | Err(_) => break,
            }
        }

        let pending: Vec<_> = ids
            .iter()
            .copied()
            .filter(|id| !self.finished.contains(id))
            .collect();
        if pending.is_empty() {
            Ok(())
        } else {
            warn!(?pending, "replicas did not finish");
            Err(ClusterError::Stalled { pending })
        }
    }

    /// Stops every replica and returns the report.
    pub async fn shutdown(mut self) -> Result<ClusterReport, ClusterError> {
        for replica in &self.replicas {
            replica.crash();
        }
        for replica in std::mem::take(&mut self.replicas) {
            replica
                .task
                .await
                .map_err(|source| ClusterError::ReplicaFailed { id: replica.id, source })?;
        }
        while let Ok(event) = self.event_rx.try_recv() {
            self.record(event);
        }
        info!("cluster stopped");
        Ok(self.report)
    }

    /// Tears the cluster down without waiting for the tasks.
    pub fn abort(self) {
        for replica in &self.replicas {
            replica.task.abort();
        }
    }

    fn record(&mut self, event: ReplicaEvent) {
        debug!(?event, "replica event");
        match event {
            ReplicaEvent::Launched { .. } => {}
            ReplicaEvent::OperationCompleted { replica, completion } => {
                self.report.completions.entry(replica).or_default().push(completion);
            }
            ReplicaEvent::AllOperationsCompleted { replica } => {
                self.finished.insert(replica);
            }
            ReplicaEvent::Crashed { replica, register } => {
                self.report.registers.insert(replica, register);
            }
        }
    }
}

/// Runs one full experiment: crash f random replicas, launch the rest, wait
/// for them to finish their Puts and Gets, then stop everything.
pub async fn run_cluster(config: ClusterConfig) -> Result<ClusterReport, ClusterError> {
    let mut cluster = Cluster::spawn(config)?;

    let (faulty, correct) = cluster.choose_faulty();
    info!(?faulty, ?correct, "selected faulty replicas");
    cluster.crash(&faulty);

    info!("launching operations");
    cluster.launch(&correct);

    if let Err(err) = cluster.wait_for(&correct).await {
        cluster.abort();
        return Err(err);
    }
    cluster.shutdown().await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{common::error::ConfigError, register::OperationKind};

    fn config(n: usize, f: usize, m: usize, seed: u64) -> ClusterConfig {
        ClusterConfig {
            n,
            f,
            m,
            seed: Some(seed),
            wait: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_three_replicas_one_crash() {
        let report = run_cluster(config(3, 1, 3, 7)).await.unwrap();

        assert_eq!(report.faulty.len(), 1);
        assert_eq!(report.correct.len(), 2);
        for id in &report.correct {
            let ops = &report.completions[id];
            assert_eq!(ops.len(), 6);
            assert!(ops[..3].iter().all(|c| c.kind == OperationKind::Put));
            assert!(ops[3..].iter().all(|c| c.kind == OperationKind::Get));
        }
        for id in &report.faulty {
            assert!(!report.completions.contains_key(id));
            assert_eq!(report.registers[id], Versioned::default());
        }
        assert_eq!(report.registers.len(), 3);
    }

    #[tokio::test]
    async fn test_write_quorums_intersect_in_correct_replicas() {
        let report = run_cluster(config(5, 2, 2, 11)).await.unwrap();

        // The newest imposed pair must sit on a majority of replicas, and
        // every majority contains at least one correct replica.
        let newest = report
            .completions
            .values()
            .flatten()
            .map(|c| Versioned::new(c.value, c.timestamp))
            .max()
            .unwrap();
        let holders: Vec<_> = report
            .registers
            .iter()
            .filter(|(_, pair)| **pair >= newest)
            .map(|(id, _)| *id)
            .collect();
        assert!(holders.len() > 5 / 2);
        assert!(holders.iter().any(|id| report.correct.contains(id)));
    }

    #[tokio::test]
    async fn test_seeded_selection_is_reproducible() {
        let first = Cluster::spawn(config(5, 2, 0, 42)).unwrap();
        let second = Cluster::spawn(config(5, 2, 0, 42)).unwrap();

        let (faulty, correct) = first.choose_faulty();
        assert_eq!((faulty.clone(), correct.clone()), second.choose_faulty());
        assert_eq!(faulty.len(), 2);
        assert_eq!(correct.len(), 3);

        first.shutdown().await.unwrap();
        second.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_too_many_faults() {
        let err = run_cluster(config(4, 2, 1, 0)).await.unwrap_err();
        assert!(matches!(
            err,
            ClusterError::Config(ConfigError::FaultBudgetExceeded { n: 4, f: 2 })
        ));
    }

    #[tokio::test]
    async fn test_stalls_when_majority_is_gone() {
        let mut cluster = Cluster::spawn(ClusterConfig {
            wait: Duration::from_millis(200),
            ..config(3, 1, 1, 0)
        })
        .unwrap();
        cluster.crash(&[1, 2]);
        cluster.launch(&[0]);

        let err = cluster.wait_for(&[0]).await.unwrap_err();
        assert!(matches!(err, ClusterError::Stalled { ref pending } if pending == &vec![0]));
        cluster.abort();
    }
}
