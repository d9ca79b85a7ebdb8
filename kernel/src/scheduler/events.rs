/*
 * Scheduler Event Definitions
 *
 * This module defines the events that the scheduler mechanism reports to
 * interested collaborators (observers). The memory manager, for example,
 * releases a process's frames when it sees ProcessTerminated.
 *
 * Observers are called while the scheduler lock is held, so they must not
 * call back into the process manager.
 */

use super::{ProcessId, types::{PolicyKind, SlotId}};

/// Events that the scheduler mechanism reports to observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedEvent {
    /// A new process was created and admitted to the ready queues
    ProcessCreated {
        pid: ProcessId,
    },

    /// A process was moved from a ready queue onto a slot
    ProcessDispatched {
        pid: ProcessId,
        slot: SlotId,
        level: Option<usize>,
    },

    /// A process finished its quantum and went back to a ready queue
    ///
    /// `level` is the queue level it re-entered (always 0 outside MLFQ).
    ProcessRequeued {
        pid: ProcessId,
        level: usize,
    },

    /// A process was terminated and will not run again
    ProcessTerminated {
        pid: ProcessId,
    },

    /// The active scheduling policy was replaced
    PolicyChanged {
        old: PolicyKind,
        new: PolicyKind,
    },
}

impl SchedEvent {
    /// Get a short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SchedEvent::ProcessCreated { .. } => "ProcessCreated",
            SchedEvent::ProcessDispatched { .. } => "ProcessDispatched",
            SchedEvent::ProcessRequeued { .. } => "ProcessRequeued",
            SchedEvent::ProcessTerminated { .. } => "ProcessTerminated",
            SchedEvent::PolicyChanged { .. } => "PolicyChanged",
        }
    }
}

/// Receiver of scheduler events
pub trait SchedObserver: Send + Sync {
    fn on_event(&self, event: &SchedEvent);
}
