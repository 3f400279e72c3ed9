use std::fmt;

use super::{peers::Roster, store::Versioned};
use crate::common::{ReplicaId, SequenceNumber, Timestamp, Value};

/*
    Every replica is both a register server and, for its own Put and Get
    calls, a client. A client asks all replicas for their pair with a
    ReadRequest, imposes a pair on all replicas with a WriteRequest, and in
    both phases waits for replies from a strict majority. Replies carry the
    sequence number of the request they answer so the client can tell the
    current operation apart from stale ones.
*/

/// Everything a replica's inbox can carry.
#[derive(Debug)]
pub enum Message {
    /// Protocol traffic from a peer (possibly the replica itself).
    Protocol { from: ReplicaId, payload: Payload },
    /// Signals from the bootstrap harness.
    Control(Control),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload {
    ReadRequest(ReadRequest),
    ReadResponse(ReadResponse),
    WriteRequest(WriteRequest),
    WriteAck(WriteAck),
}

#[derive(Debug)]
pub enum Control {
    InstallRoster(Roster),
    Launch,
    Crash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadRequest {
    pub seq: SequenceNumber,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReadResponse {
    pub value: Value,
    pub timestamp: Timestamp,
    pub seq: SequenceNumber,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteRequest {
    pub value: Value,
    pub timestamp: Timestamp,
    pub seq: SequenceNumber,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteAck {
    pub value: Value,
    pub timestamp: Timestamp,
    pub seq: SequenceNumber,
}

impl ReadResponse {
    pub fn versioned(&self) -> Versioned {
        Versioned::new(self.value, self.timestamp)
    }
}

impl WriteRequest {
    pub fn new(pair: Versioned, seq: SequenceNumber) -> Self {
        WriteRequest {
            value: pair.value,
            timestamp: pair.timestamp,
            seq,
        }
    }

    pub fn versioned(&self) -> Versioned {
        Versioned::new(self.value, self.timestamp)
    }
}

impl WriteAck {
    pub fn versioned(&self) -> Versioned {
        Versioned::new(self.value, self.timestamp)
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::ReadRequest(m) => write!(f, "ReadRequest r={}", m.seq),
            Payload::ReadResponse(m) => {
                write!(f, "ReadResponse v={} t={} r={}", m.value, m.timestamp, m.seq)
            }
            Payload::WriteRequest(m) => {
                write!(f, "WriteRequest v={} t={} r={}", m.value, m.timestamp, m.seq)
            }
            Payload::WriteAck(m) => write!(f, "WriteAck v={} t={} r={}", m.value, m.timestamp, m.seq),
        }
    }
}
