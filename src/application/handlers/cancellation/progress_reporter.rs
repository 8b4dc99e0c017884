//! Delivers processing progress to an optional listener.

use tokio::sync::mpsc;

use crate::domain::cancellation::{CancellationProgress, ProcessingPhase, ProgressTracker};

/// Sends monotone `CancellationProgress` updates over an mpsc channel.
///
/// The reporter is moved into the processor and dropped before it returns,
/// which closes the channel: no update can arrive after the result.
#[derive(Debug)]
pub struct ProgressReporter {
    sender: Option<mpsc::Sender<CancellationProgress>>,
    tracker: ProgressTracker,
}

impl ProgressReporter {
    pub fn new(sender: mpsc::Sender<CancellationProgress>) -> Self {
        Self {
            sender: Some(sender),
            tracker: ProgressTracker::new(),
        }
    }

    /// Reporter with a fresh bounded channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CancellationProgress>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Reporter that tracks progress but sends nothing.
    pub fn disabled() -> Self {
        Self {
            sender: None,
            tracker: ProgressTracker::new(),
        }
    }

    /// Reports `completed` of `total` items in `phase`.
    ///
    /// Regressions are dropped. A listener that went away stops delivery
    /// without affecting processing.
    pub async fn report(
        &mut self,
        phase: ProcessingPhase,
        completed: usize,
        total: usize,
        message: impl Into<String>,
    ) {
        let Some(update) = self.tracker.update(phase, completed, total, message) else {
            return;
        };
        if let Some(sender) = &self.sender {
            if sender.send(update).await.is_err() {
                tracing::debug!("Progress listener dropped");
                self.sender = None;
            }
        }
    }

    pub fn current(&self) -> f64 {
        self.tracker.current()
    }
}
