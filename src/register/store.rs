use super::message::{ReadRequest, ReadResponse, WriteAck, WriteRequest};
use crate::common::{Timestamp, Value};

/// A register value together with its timestamp.
///
/// Field order matters: the derived ordering compares `timestamp` first and
/// breaks ties on `value`, which is exactly the "more recent than" relation
/// replicas use to decide whether to overwrite their stored pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Versioned {
    pub timestamp: Timestamp,
    pub value: Value,
}

impl Versioned {
    pub fn new(value: Value, timestamp: Timestamp) -> Self {
        Versioned { timestamp, value }
    }

    pub fn is_more_recent_than(&self, other: &Versioned) -> bool {
        self > other
    }
}

/// The replica's local copy of the emulated register.
#[derive(Debug, Default)]
pub struct RegisterState {
    current: Versioned,
}

impl RegisterState {
    pub fn new() -> Self {
        RegisterState {
            current: Versioned::default(),
        }
    }

    pub fn current(&self) -> Versioned {
        self.current
    }

    pub fn handle_read_request(&self, request: &ReadRequest) -> ReadResponse {
        ReadResponse {
            value: self.current.value,
            timestamp: self.current.timestamp,
            seq: request.seq,
        }
    }

    /// Applies the write rule and acknowledges with the pair held afterwards.
    pub fn handle_write_request(&mut self, request: &WriteRequest) -> WriteAck {
        self.apply(request.versioned());
        WriteAck {
            value: self.current.value,
            timestamp: self.current.timestamp,
            seq: request.seq,
        }
    }

    /// Returns whether the stored pair was replaced.
    pub fn apply(&mut self, candidate: Versioned) -> bool {
        if candidate.is_more_recent_than(&self.current) {
            self.current = candidate;
            true
        } else {
            false
        }
    }
}
