//! Processor state types.
//!
//! # State Transitions
//!
//! ```text
//!             start()                 stop()
//! Created ─────────────→ Running ─────────────→ Stopped
//!    │                                             ↑
//!    └─────────────────── stop() ──────────────────┘
//! ```
//!
//! `Stopped` is terminal: `start()` after `stop()` is a no-op.

use crate::types::EMPTY_MESSAGE_ID;
use std::time::SystemTime;

/// Lifecycle state of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProcessorState {
    /// Constructed, poll loop not spawned.
    Created = 0,
    /// Poll loop running.
    Running = 1,
    /// Poll loop has exited (or was never started). Terminal.
    Stopped = 2,
}

impl ProcessorState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => ProcessorState::Created,
            1 => ProcessorState::Running,
            _ => ProcessorState::Stopped,
        }
    }
}

impl std::fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessorState::Created => write!(f, "Created"),
            ProcessorState::Running => write!(f, "Running"),
            ProcessorState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Replication progress against one source cluster.
///
/// `last_processed_message_id <= last_retrieved_message_id` always holds and
/// neither value ever decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    /// Position up to which tasks have been fetched.
    pub last_retrieved_message_id: i64,
    /// Position up to which tasks have been applied or quarantined.
    pub last_processed_message_id: i64,
}

impl Default for Watermarks {
    fn default() -> Self {
        Self::starting_at(EMPTY_MESSAGE_ID)
    }
}

impl Watermarks {
    /// Both watermarks at `message_id`.
    pub fn starting_at(message_id: i64) -> Self {
        Self {
            last_retrieved_message_id: message_id,
            last_processed_message_id: message_id,
        }
    }

    /// Move both watermarks to `target`, never backwards.
    ///
    /// Returns `true` if anything changed.
    pub fn advance_to(&mut self, target: i64) -> bool {
        let retrieved = self.last_retrieved_message_id.max(target);
        let processed = self.last_processed_message_id.max(target.min(retrieved));
        let changed = retrieved != self.last_retrieved_message_id
            || processed != self.last_processed_message_id;
        self.last_retrieved_message_id = retrieved;
        self.last_processed_message_id = processed;
        changed
    }
}

/// Why a cycle did not talk to the remote cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another host owns this source cluster.
    NotOwner,
    /// The membership lookup failed.
    LookupFailed,
}

/// Per-cycle task accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleStats {
    /// Tasks returned by the remote cluster.
    pub fetched: usize,
    /// Domain tasks applied locally.
    pub applied: usize,
    /// Domain tasks that failed and were written to the DLQ.
    pub quarantined: usize,
    /// Non-domain tasks ignored.
    pub skipped: usize,
    /// Domain tasks dropped for missing attributes.
    pub malformed: usize,
}

/// Result of one fetch-and-dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(SkipReason),
    /// Remote fetch failed after retries; watermarks untouched.
    FetchFailed,
    /// Every task was applied, quarantined, skipped or dropped as malformed.
    Completed(CycleStats),
    /// A task could be neither applied nor quarantined; dispatch stopped there.
    Halted {
        stats: CycleStats,
        /// Source id of the task left unhandled.
        failed_task_id: i64,
    },
}

impl CycleOutcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Skipped(SkipReason::NotOwner) => "not_owner",
            CycleOutcome::Skipped(SkipReason::LookupFailed) => "lookup_failed",
            CycleOutcome::FetchFailed => "fetch_failed",
            CycleOutcome::Completed(_) => "completed",
            CycleOutcome::Halted { .. } => "halted",
        }
    }
}

/// Point-in-time view of a processor, for health endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorStatus {
    pub source_cluster: String,
    pub state: ProcessorState,
    pub watermarks: Watermarks,
    pub last_cycle: Option<CycleOutcome>,
    /// Time (per the processor's time source) of the last successful fetch.
    pub last_fetch_success: Option<SystemTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_state_display() {
        assert_eq!(ProcessorState::Created.to_string(), "Created");
        assert_eq!(ProcessorState::Running.to_string(), "Running");
        assert_eq!(ProcessorState::Stopped.to_string(), "Stopped");
    }

    #[test]
    fn test_processor_state_from_u8() {
        assert_eq!(ProcessorState::from_u8(ProcessorState::Created as u8), ProcessorState::Created);
        assert_eq!(ProcessorState::from_u8(ProcessorState::Running as u8), ProcessorState::Running);
        assert_eq!(ProcessorState::from_u8(ProcessorState::Stopped as u8), ProcessorState::Stopped);
    }

    #[test]
    fn test_watermarks_default_empty() {
        let wm = Watermarks::default();
        assert_eq!(wm.last_retrieved_message_id, EMPTY_MESSAGE_ID);
        assert_eq!(wm.last_processed_message_id, EMPTY_MESSAGE_ID);
    }

    #[test]
    fn test_watermarks_advance_forward() {
        let mut wm = Watermarks::default();
        assert!(wm.advance_to(1000));
        assert_eq!(wm, Watermarks::starting_at(1000));
    }

    #[test]
    fn test_watermarks_never_move_backwards() {
        let mut wm = Watermarks::starting_at(1000);
        assert!(!wm.advance_to(10));
        assert!(!wm.advance_to(1000));
        assert_eq!(wm, Watermarks::starting_at(1000));
    }

    #[test]
    fn test_cycle_outcome_labels() {
        assert_eq!(CycleOutcome::Skipped(SkipReason::NotOwner).label(), "not_owner");
        assert_eq!(CycleOutcome::FetchFailed.label(), "fetch_failed");
        assert_eq!(CycleOutcome::Completed(CycleStats::default()).label(), "completed");
        assert_eq!(
            CycleOutcome::Halted { stats: CycleStats::default(), failed_task_id: 3 }.label(),
            "halted"
        );
    }
}
