use std::time::Duration;

use super::{error::ConfigError, ReplicaId};

pub const DEFAULT_REPLICAS: usize = 3;
pub const DEFAULT_FAULTY: usize = 1;
pub const DEFAULT_OPERATIONS: usize = 3;
pub const DEFAULT_WAIT: Duration = Duration::from_secs(10);

/// Static parameters of a single replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaConfig {
    pub id: ReplicaId,
    /// Roster size.
    pub n: usize,
    /// Number of Puts, and then of Gets, performed after launch.
    pub m: usize,
}

impl ReplicaConfig {
    pub fn new(id: ReplicaId, n: usize, m: usize) -> Self {
        ReplicaConfig { id, n, m }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::EmptyCluster);
        }
        if self.id >= self.n {
            return Err(ConfigError::ReplicaIdOutOfRange { id: self.id, n: self.n });
        }
        Ok(())
    }

    /// Strict majority of the roster: any set larger than this is a quorum.
    pub fn majority_threshold(&self) -> usize {
        self.n / 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    pub n: usize,
    /// Replicas crashed before launch.
    pub f: usize,
    pub m: usize,
    /// Seed for picking the faulty replicas; `None` draws from the OS.
    pub seed: Option<u64>,
    /// How long the harness waits for the correct replicas to finish.
    pub wait: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            n: DEFAULT_REPLICAS,
            f: DEFAULT_FAULTY,
            m: DEFAULT_OPERATIONS,
            seed: None,
            wait: DEFAULT_WAIT,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::EmptyCluster);
        }
        if self.n <= 2 * self.f {
            return Err(ConfigError::FaultBudgetExceeded { n: self.n, f: self.f });
        }
        Ok(())
    }

    pub fn replica(&self, id: ReplicaId) -> ReplicaConfig {
        ReplicaConfig::new(id, self.n, self.m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cluster_is_valid() {
        let config = ClusterConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!((config.n, config.f, config.m), (3, 1, 3));
    }

    #[test]
    fn test_fault_budget() {
        let config = ClusterConfig { n: 4, f: 2, ..ClusterConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::FaultBudgetExceeded { n: 4, f: 2 }));

        let config = ClusterConfig { n: 5, f: 2, ..ClusterConfig::default() };
        assert_eq!(config.validate(), Ok(()));

        let config = ClusterConfig { n: 0, f: 0, ..ClusterConfig::default() };
        assert_eq!(config.validate(), Err(ConfigError::EmptyCluster));
    }

    #[test]
    fn test_replica_config() {
        assert_eq!(ReplicaConfig::new(2, 3, 1).validate(), Ok(()));
        assert_eq!(
            ReplicaConfig::new(3, 3, 1).validate(),
            Err(ConfigError::ReplicaIdOutOfRange { id: 3, n: 3 })
        );
        assert_eq!(ReplicaConfig::new(0, 3, 1).majority_threshold(), 1);
        assert_eq!(ReplicaConfig::new(0, 4, 1).majority_threshold(), 2);
    }
}
