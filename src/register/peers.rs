use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use super::message::{Message, Payload};
use crate::common::ReplicaId;

/// Inbox handles of every replica, indexed by replica id.
///
/// The member list is shared and never mutated; installing a new roster
/// replaces the whole snapshot.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Arc<[UnboundedSender<Message>]>,
}

impl Roster {
    pub fn new(members: Vec<UnboundedSender<Message>>) -> Self {
        Roster {
            members: members.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_member(&self, id: ReplicaId) -> bool {
        id < self.members.len()
    }

    /// Sends at most once. A stopped or unknown replica loses the message.
    pub fn send(&self, from: ReplicaId, to: ReplicaId, payload: Payload) -> bool {
        match self.members.get(to) {
            Some(inbox) => inbox.send(Message::Protocol { from, payload }).is_ok(),
            None => false,
        }
    }

    /// Sends `payload` to every member, the sender included. Returns how many
    /// inboxes accepted it.
    pub fn broadcast(&self, from: ReplicaId, payload: Payload) -> usize {
        self.members
            .iter()
            .filter(|inbox| inbox.send(Message::Protocol { from, payload }).is_ok())
            .count()
    }
}
