use std::collections::BTreeMap;

use super::store::Versioned;
use crate::common::ReplicaId;

/*
    A quorum is any set of more than n/2 replicas. Two quorums of the same
    roster always share a member, so a write imposed on one quorum is seen
    by every later read from another. Replies are counted per sender: the
    same replica answering twice, or two replicas answering with identical
    content, never changes how many distinct replicas have replied.
*/

#[derive(Debug, Clone)]
pub struct QuorumTracker<T> {
    n: usize,
    replies: BTreeMap<ReplicaId, T>,
}

impl<T> QuorumTracker<T> {
    pub fn new(n: usize) -> Self {
        QuorumTracker {
            n,
            replies: BTreeMap::new(),
        }
    }

    /// Records the first reply from `from` and reports whether a majority
    /// has now replied. Later replies from the same sender are ignored.
    pub fn record(&mut self, from: ReplicaId, reply: T) -> bool {
        self.replies.entry(from).or_insert(reply);
        self.has_quorum()
    }

    pub fn has_quorum(&self) -> bool {
        self.replies.len() > self.n / 2
    }

    pub fn len(&self) -> usize {
        self.replies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replies.is_empty()
    }

    pub fn contains(&self, from: ReplicaId) -> bool {
        self.replies.contains_key(&from)
    }

    pub fn senders(&self) -> impl Iterator<Item = ReplicaId> + '_ {
        self.replies.keys().copied()
    }

    pub fn clear(&mut self) {
        self.replies.clear();
    }
}

impl QuorumTracker<Versioned> {
    /// The most recent pair reported, under the register ordering.
    pub fn latest(&self) -> Option<Versioned> {
        self.replies.values().max().copied()
    }
}
