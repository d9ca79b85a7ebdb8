/*
 * First-In-First-Out Scheduling Policy
 *
 * The simplest policy: pop the head of the single ready queue. Dispatched
 * processes are not put back by the policy at dispatch time; the core
 * worker (or the manual switch path) requeues them at the tail when their
 * quantum ends.
 */

use super::super::{
    ProcessId,
    queues::QueueSet,
    traits::{KernelSchedCtx, Scheduler},
    types::{DispatchDecision, PolicyKind, SlotId, TimeSliceTicks},
};

/// FIFO scheduling policy
pub struct FifoPolicy {
    /// Time slice handed to every dispatch
    quantum: TimeSliceTicks,
}

impl FifoPolicy {
    pub fn new(quantum: TimeSliceTicks) -> Self {
        Self { quantum }
    }
}

impl Scheduler for FifoPolicy {
    fn pick_next(
        &mut self,
        queues: &mut QueueSet,
        _ctx: &dyn KernelSchedCtx,
        _slot: SlotId,
    ) -> DispatchDecision {
        match queues.pop_front() {
            Some((pid, _)) => DispatchDecision::run_process(pid, self.quantum),
            None => DispatchDecision::idle(),
        }
    }

    fn requeue(&mut self, queues: &mut QueueSet, pid: ProcessId, _from_level: Option<usize>) {
        queues.push(pid, 0);
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Fifo
    }

    fn name(&self) -> &'static str {
        "FIFO"
    }
}

impl Default for FifoPolicy {
    fn default() -> Self {
        Self::new(TimeSliceTicks::DEFAULT)
    }
}
