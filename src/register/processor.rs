use std::fmt;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::{
    message::{Control, Message, Payload, ReadRequest, ReadResponse, WriteAck, WriteRequest},
    peers::Roster,
    quorum::QuorumTracker,
    store::{RegisterState, Versioned},
};
use crate::common::{
    config::ReplicaConfig, error::OperationError, ReplicaId, SequenceNumber, Timestamp, Value,
};

pub struct ReplicaProcessor {
    pub config: ReplicaConfig,
    pub register: RegisterState,
    pub phase: Phase,
    pub schedule: Schedule,
    pub lifecycle: Lifecycle,
    pub roster: Option<Roster>,
    /// Operations this replica has coordinated to completion, oldest first.
    pub history: Vec<Completion>,
    pub msg_rx: UnboundedReceiver<Message>,
    pub event_tx: Option<UnboundedSender<ReplicaEvent>>,
    counter: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Put(Value),
    Get,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Put,
    Get,
}

/// Coordinator state. A single slot holds the operation in flight, so a
/// replica can never be reading or writing for two operations at once.
#[derive(Debug)]
pub enum Phase {
    Idle,
    Reading {
        op: Operation,
        seq: SequenceNumber,
        responses: QuorumTracker<Versioned>,
    },
    Writing {
        op: Operation,
        seq: SequenceNumber,
        imposed: Versioned,
        acks: QuorumTracker<()>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Serving peers, waiting for the launch signal.
    Standby,
    /// Working through the Put/Get schedule.
    Launched,
    /// Schedule done; still serving peers.
    Finished,
    Crashed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    pub kind: OperationKind,
    pub seq: SequenceNumber,
    pub value: Value,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicaEvent {
    Launched { replica: ReplicaId },
    OperationCompleted { replica: ReplicaId, completion: Completion },
    AllOperationsCompleted { replica: ReplicaId },
    Crashed { replica: ReplicaId, register: Versioned },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// M Puts followed by M Gets, one at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub m: usize,
    pub puts_started: usize,
    pub gets_started: usize,
}

impl Schedule {
    pub fn new(m: usize) -> Self {
        Schedule {
            m,
            puts_started: 0,
            gets_started: 0,
        }
    }

    /// The k-th Put of replica `id` writes `id * n + k`.
    pub fn next_operation(&self, id: ReplicaId, n: usize) -> Option<Operation> {
        if self.puts_started < self.m {
            Some(Operation::Put((id * n + self.puts_started + 1) as Value))
        } else if self.gets_started < self.m {
            Some(Operation::Get)
        } else {
            None
        }
    }

    pub fn record_started(&mut self, op: Operation) {
        match op {
            Operation::Put(_) => self.puts_started += 1,
            Operation::Get => self.gets_started += 1,
        }
    }
}

impl ReplicaProcessor {
    pub fn new(config: ReplicaConfig, msg_rx: UnboundedReceiver<Message>) -> Self {
        ReplicaProcessor {
            config,
            register: RegisterState::new(),
            phase: Phase::Idle,
            schedule: Schedule::new(config.m),
            lifecycle: Lifecycle::Standby,
            roster: None,
            history: Vec::new(),
            msg_rx,
            event_tx: None,
            counter: 0,
        }
    }

    pub fn with_events(mut self, event_tx: UnboundedSender<ReplicaEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn id(&self) -> ReplicaId {
        self.config.id
    }

    pub async fn run(&mut self) {
        info!(replica = self.id(), n = self.config.n, m = self.config.m, "running replica processor");
        while let Some(message) = self.msg_rx.recv().await {
            if self.handle(message) == Flow::Stop {
                break;
            }
        }
        debug!(replica = self.id(), "replica processor stopped");
    }

    /// Processes one inbox message to completion.
    pub fn handle(&mut self, message: Message) -> Flow {
        if self.lifecycle == Lifecycle::Crashed {
            return Flow::Stop;
        }
        match message {
            Message::Control(control) => self.handle_control(control),
            Message::Protocol { from, payload } => {
                self.handle_protocol(from, payload);
                Flow::Continue
            }
        }
    }

    fn handle_control(&mut self, control: Control) -> Flow {
        match control {
            Control::InstallRoster(roster) => {
                self.install_roster(roster);
                Flow::Continue
            }
            Control::Launch => {
                self.launch();
                Flow::Continue
            }
            Control::Crash => {
                self.crash();
                Flow::Stop
            }
        }
    }

    fn handle_protocol(&mut self, from: ReplicaId, payload: Payload) {
        debug!(replica = self.id(), from, "received {}", payload);
        if from >= self.config.n {
            warn!(replica = self.id(), from, "dropping {} from a sender outside the roster", payload);
            return;
        }
        match payload {
            Payload::ReadRequest(request) => self.handle_read_request(from, request),
            Payload::WriteRequest(request) => self.handle_write_request(from, request),
            Payload::ReadResponse(response) => self.handle_read_response(from, response),
            Payload::WriteAck(ack) => self.handle_write_ack(from, ack),
        }
    }

    pub fn install_roster(&mut self, roster: Roster) {
        if roster.len() != self.config.n {
            warn!(
                replica = self.id(),
                expected = self.config.n,
                got = roster.len(),
                "ignoring roster of the wrong size"
            );
            return;
        }
        if self.in_flight().is_some() {
            warn!(replica = self.id(), "replacing roster while an operation is in flight");
        }
        debug!(replica = self.id(), members = roster.len(), "installed roster");
        self.roster = Some(roster);
    }

    pub fn launch(&mut self) {
        if self.lifecycle != Lifecycle::Standby {
            warn!(replica = self.id(), lifecycle = ?self.lifecycle, "ignoring repeated launch");
            return;
        }
        if self.roster.is_none() {
            warn!(replica = self.id(), "cannot launch before a roster is installed");
            return;
        }
        info!(replica = self.id(), "launched");
        self.lifecycle = Lifecycle::Launched;
        self.emit(ReplicaEvent::Launched { replica: self.id() });
        self.start_next_operation();
    }

    /// One-way: the processor handles nothing after this and `run` returns.
    pub fn crash(&mut self) {
        info!(replica = self.id(), "crashed");
        self.lifecycle = Lifecycle::Crashed;
        self.msg_rx.close();
        self.emit(ReplicaEvent::Crashed {
            replica: self.id(),
            register: self.register.current(),
        });
    }

    pub fn put(&mut self, value: Value) -> Result<SequenceNumber, OperationError> {
        self.start(Operation::Put(value))
    }

    pub fn get(&mut self) -> Result<SequenceNumber, OperationError> {
        self.start(Operation::Get)
    }

    pub fn in_flight(&self) -> Option<OperationKind> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Reading { op, .. } | Phase::Writing { op, .. } => Some(op.kind()),
        }
    }

    fn start(&mut self, op: Operation) -> Result<SequenceNumber, OperationError> {
        let id = self.id();
        if self.lifecycle == Lifecycle::Crashed {
            return Err(OperationError::Crashed { id });
        }
        if let Some(in_flight) = self.in_flight() {
            warn!(replica = id, %in_flight, requested = %op.kind(), "replica is already operating");
            return Err(OperationError::Busy { id, in_flight });
        }
        let roster = self
            .roster
            .clone()
            .ok_or(OperationError::RosterNotInstalled { id })?;

        self.counter += 1;
        let seq = (id * self.config.n) as SequenceNumber + self.counter;
        self.phase = Phase::Reading {
            op,
            seq,
            responses: QuorumTracker::new(self.config.n),
        };
        info!(replica = id, seq, ?op, "starting operation");

        roster.broadcast(id, Payload::ReadRequest(ReadRequest { seq }));
        Ok(seq)
    }

    fn start_next_operation(&mut self) {
        let Some(op) = self.schedule.next_operation(self.id(), self.config.n) else {
            info!(replica = self.id(), "completed all operations");
            self.lifecycle = Lifecycle::Finished;
            self.emit(ReplicaEvent::AllOperationsCompleted { replica: self.id() });
            return;
        };
        match self.start(op) {
            Ok(_) => self.schedule.record_started(op),
            Err(err) => warn!(replica = self.id(), %err, "could not start next operation"),
        }
    }

    fn handle_read_request(&mut self, from: ReplicaId, request: ReadRequest) {
        let response = self.register.handle_read_request(&request);
        self.reply(from, Payload::ReadResponse(response));
    }

    fn handle_write_request(&mut self, from: ReplicaId, request: WriteRequest) {
        let before = self.register.current();
        let ack = self.register.handle_write_request(&request);
        if ack.versioned() != before {
            debug!(replica = self.id(), value = ack.value, timestamp = ack.timestamp, "register updated");
        }
        self.reply(from, Payload::WriteAck(ack));
    }

    fn reply(&self, to: ReplicaId, payload: Payload) {
        let delivered = match &self.roster {
            Some(roster) => roster.send(self.id(), to, payload),
            None => false,
        };
        if !delivered {
            debug!(replica = self.id(), to, "reply not delivered: {}", payload);
        }
    }

    fn handle_read_response(&mut self, from: ReplicaId, response: ReadResponse) {
        let Phase::Reading { op, seq, responses } = &mut self.phase else {
            debug!(replica = self.config.id, r = response.seq, "dropping read response outside a read phase");
            return;
        };
        if response.seq != *seq {
            debug!(replica = self.config.id, r = response.seq, current = *seq, "dropping stale read response");
            return;
        }
        if !responses.record(from, response.versioned()) {
            return;
        }
        let Some(latest) = responses.latest() else {
            return;
        };

        // Put imposes its own value one tick past the newest timestamp seen;
        // Get writes back the newest pair it read.
        let imposed = match *op {
            Operation::Put(value) => Versioned::new(value, latest.timestamp + 1),
            Operation::Get => latest,
        };
        let (op, seq) = (*op, *seq);
        debug!(
            replica = self.id(),
            seq,
            value = imposed.value,
            timestamp = imposed.timestamp,
            "read quorum reached, imposing"
        );
        self.phase = Phase::Writing {
            op,
            seq,
            imposed,
            acks: QuorumTracker::new(self.config.n),
        };

        if let Some(roster) = &self.roster {
            roster.broadcast(self.config.id, Payload::WriteRequest(WriteRequest::new(imposed, seq)));
        }
    }

    fn handle_write_ack(&mut self, from: ReplicaId, ack: WriteAck) {
        let Phase::Writing { op, seq, imposed, acks } = &mut self.phase else {
            debug!(replica = self.config.id, r = ack.seq, "dropping write ack outside a write phase");
            return;
        };
        if ack.seq != *seq {
            debug!(replica = self.config.id, r = ack.seq, current = *seq, "dropping stale write ack");
            return;
        }
        if !acks.record(from, ()) {
            return;
        }

        let completion = Completion {
            kind: op.kind(),
            seq: *seq,
            value: imposed.value,
            timestamp: imposed.timestamp,
        };
        self.phase = Phase::Idle;
        info!(
            replica = self.id(),
            seq = completion.seq,
            value = completion.value,
            timestamp = completion.timestamp,
            "completed {} operation",
            completion.kind
        );
        self.history.push(completion);
        self.emit(ReplicaEvent::OperationCompleted {
            replica: self.id(),
            completion,
        });

        if self.lifecycle == Lifecycle::Launched {
            self.start_next_operation();
        }
    }

    fn emit(&self, event: ReplicaEvent) {
        if let Some(event_tx) = &self.event_tx {
            // Nobody listening is fine.
            let _ = event_tx.send(event);
        }
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Put(_) => OperationKind::Put,
            Operation::Get => OperationKind::Get,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Put => write!(f, "Put"),
            OperationKind::Get => write!(f, "Get"),
        }
    }
}
