//! Processing progress values and the monotone tracker that produces them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Processing phases, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPhase {
    Calculating,
    Notifying,
    Refunding,
    Finalizing,
}

impl ProcessingPhase {
    pub const ALL: [ProcessingPhase; 4] = [
        ProcessingPhase::Calculating,
        ProcessingPhase::Notifying,
        ProcessingPhase::Refunding,
        ProcessingPhase::Finalizing,
    ];

    /// Overall progress range covered by this phase.
    fn span(&self) -> (f64, f64) {
        match self {
            ProcessingPhase::Calculating => (0.0, 0.1),
            ProcessingPhase::Notifying => (0.1, 0.4),
            ProcessingPhase::Refunding => (0.4, 0.95),
            ProcessingPhase::Finalizing => (0.95, 1.0),
        }
    }

    /// 1-based position.
    pub fn step_number(&self) -> u32 {
        match self {
            ProcessingPhase::Calculating => 1,
            ProcessingPhase::Notifying => 2,
            ProcessingPhase::Refunding => 3,
            ProcessingPhase::Finalizing => 4,
        }
    }
}

impl fmt::Display for ProcessingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingPhase::Calculating => "calculating",
            ProcessingPhase::Notifying => "notifying",
            ProcessingPhase::Refunding => "refunding",
            ProcessingPhase::Finalizing => "finalizing",
        };
        f.write_str(s)
    }
}

/// A single progress update emitted while processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationProgress {
    pub phase: ProcessingPhase,
    /// Overall completion in `[0, 1]`.
    pub progress: f64,
    pub message: String,
    pub current_step: u32,
    pub total_steps: u32,
}

/// Produces progress values that never move backwards.
///
/// Reports for an earlier phase, or for a lower overall value, are
/// rejected with `None`.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    last: Option<(ProcessingPhase, f64)>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the update for `completed` of `total` items in `phase`.
    pub fn update(
        &mut self,
        phase: ProcessingPhase,
        completed: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Option<CancellationProgress> {
        let (start, end) = phase.span();
        let fraction = if total == 0 {
            1.0
        } else {
            (completed.min(total) as f64) / (total as f64)
        };
        let progress = if fraction >= 1.0 {
            end
        } else {
            start + (end - start) * fraction
        };

        if let Some((last_phase, last_progress)) = self.last {
            if phase < last_phase || progress < last_progress {
                return None;
            }
        }
        self.last = Some((phase, progress));

        Some(CancellationProgress {
            phase,
            progress,
            message: message.into(),
            current_step: phase.step_number(),
            total_steps: ProcessingPhase::ALL.len() as u32,
        })
    }

    /// Last progress value produced.
    pub fn current(&self) -> f64 {
        self.last.map(|(_, p)| p).unwrap_or(0.0)
    }
}
