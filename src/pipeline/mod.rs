//! Statement/ledger pipeline.
//!
//! The coordinator is the only writer of the statement and the ledger. UI
//! code talks to it through [`Command`]s and reads [`Update`]s back.

pub mod coordinator;
pub mod events;
pub mod stream;

pub use coordinator::{
    Coordinator, ExportJob, SignCompletion, SignOutcome, SignRequest, VerificationJob,
    VerificationResult, VerificationTicket, VerifiedSnapshot,
};
pub use events::{Command, ExportedBundle, Update};
pub use stream::{UpdateSender, UpdateStream};

use crate::crypto::traits::SignatureRecovery;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffered commands before senders wait
const COMMAND_BUFFER: usize = 64;

/// Handle to a coordinator running on its own task
pub struct PipelineHandle<R> {
    pub commands: mpsc::Sender<Command>,
    pub updates: UpdateStream,
    pub task: JoinHandle<Coordinator<R>>,
}

/// Spawn `coordinator` onto the runtime.
///
/// The task ends when every command sender is dropped and hands the
/// coordinator back through `task`.
pub fn spawn<R>(coordinator: Coordinator<R>) -> PipelineHandle<R>
where
    R: SignatureRecovery + 'static,
{
    let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
    let (updates, sender) = UpdateStream::new();
    let task = tokio::spawn(coordinator.run(receiver, sender));
    PipelineHandle {
        commands,
        updates,
        task,
    }
}
