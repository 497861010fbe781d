use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;
use tracing::trace;

/// A pending hidden-side auto-move. `generation` is the session generation
/// the ticket was issued for; a ticket from an older generation is stale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AutoMove {
    pub generation: u64,
    pub delay: Duration,
}

/// Delivers the generation of every scheduled ticket once its delay has
/// elapsed. Each ticket sleeps on its own worker thread; nothing is ever
/// cancelled, stale generations are filtered by the receiver.
pub struct AutoMoveTimer {
    sender: Sender<u64>,
    receiver: Receiver<u64>,
}

impl Default for AutoMoveTimer {
    fn default() -> Self {
        let (sender, receiver) = mpsc::channel();
        AutoMoveTimer { sender, receiver }
    }
}

impl AutoMoveTimer {
    pub fn new() -> AutoMoveTimer {
        Self::default()
    }

    pub fn schedule(&self, ticket: AutoMove) {
        let sender = self.sender.clone();
        thread::spawn(move || {
            thread::sleep(ticket.delay);
            // The timer may have been dropped in the meantime
            let _ = sender.send(ticket.generation);
        });
        trace!(generation = ticket.generation, delay_ms = ticket.delay.as_millis() as u64, "auto-move scheduled");
    }

    /// Blocks until a ticket fires, or `timeout` runs out
    pub fn wait(&self, timeout: Duration) -> Option<u64> {
        match self.receiver.recv_timeout(timeout) {
            Ok(generation) => Some(generation),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}
