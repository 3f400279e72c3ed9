use tokio::{
    sync::mpsc::{unbounded_channel, UnboundedSender},
    task::JoinHandle,
};

use crate::{
    common::{config::ReplicaConfig, error::ConfigError, ReplicaId},
    register::{Control, Message, ReplicaEvent, ReplicaProcessor, Roster},
};

/// The harness side of a running replica task.
pub struct ReplicaHandle {
    pub id: ReplicaId,
    pub inbox: UnboundedSender<Message>,
    pub task: JoinHandle<()>,
}

pub fn spawn_replica(
    config: ReplicaConfig,
    event_tx: Option<UnboundedSender<ReplicaEvent>>,
) -> Result<ReplicaHandle, ConfigError> {
    config.validate()?;

    let (inbox, msg_rx) = unbounded_channel();
    let mut processor = ReplicaProcessor::new(config, msg_rx);
    if let Some(event_tx) = event_tx {
        processor = processor.with_events(event_tx);
    }

    let task = tokio::spawn(async move {
        processor.run().await;
    });

    Ok(ReplicaHandle {
        id: config.id,
        inbox,
        task,
    })
}

impl ReplicaHandle {
    pub fn install_roster(&self, roster: Roster) -> bool {
        self.signal(Control::InstallRoster(roster))
    }

    pub fn launch(&self) -> bool {
        self.signal(Control::Launch)
    }

    pub fn crash(&self) -> bool {
        self.signal(Control::Crash)
    }

    /// False once the replica has stopped.
    fn signal(&self, control: Control) -> bool {
        self.inbox.send(Message::Control(control)).is_ok()
    }
}
