/*
 * Round-Robin Scheduling Policy
 *
 * This module implements the round-robin scheduling policy.
 * It maintains a FIFO ready queue and rotates through it, giving each
 * process an equal time slice.
 *
 * Features:
 * - Simple FIFO ready queue
 * - Equal time slices for all processes (the RR quantum)
 * - Every dispatched process goes back to the tail, so it is revisited only
 *   after all of its currently queued peers
 *
 * The quantum is nominal: nothing preempts a slot early. The rotation is
 * what makes this round-robin; the process is put back at the tail when it
 * leaves its slot, which keeps it in exactly one place at any instant.
 */

use super::super::{
    ProcessId,
    queues::QueueSet,
    traits::{KernelSchedCtx, Scheduler},
    types::{DispatchDecision, PolicyKind, SlotId, TimeSliceTicks},
};

/// Round-Robin scheduling policy
///
/// On each scheduling decision (pick_next), it pops the front process; when
/// the slot gives it back (requeue), it is pushed to the back of the queue.
pub struct RoundRobinPolicy {
    /// Time slice for every dispatch
    quantum: TimeSliceTicks,

    /// Rotation counter: number of dispatches performed so far
    rotations: u64,
}

impl RoundRobinPolicy {
    /// Create a new Round-Robin policy
    pub fn new(quantum: TimeSliceTicks) -> Self {
        Self {
            quantum,
            rotations: 0,
        }
    }

    /// Number of rotations (dispatches) performed
    pub fn rotations(&self) -> u64 {
        self.rotations
    }
}

impl Scheduler for RoundRobinPolicy {
    fn pick_next(
        &mut self,
        queues: &mut QueueSet,
        _ctx: &dyn KernelSchedCtx,
        _slot: SlotId,
    ) -> DispatchDecision {
        match queues.pop_front() {
            Some((pid, _)) => {
                self.rotations += 1;
                DispatchDecision::run_process(pid, self.quantum)
            }
            // No runnable processes, idle
            None => DispatchDecision::idle(),
        }
    }

    fn requeue(&mut self, queues: &mut QueueSet, pid: ProcessId, _from_level: Option<usize>) {
        // Back of the line
        queues.push(pid, 0);
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::RoundRobin
    }

    fn name(&self) -> &'static str {
        "Round-Robin"
    }
}

impl Default for RoundRobinPolicy {
    fn default() -> Self {
        Self::new(TimeSliceTicks(2))
    }
}
