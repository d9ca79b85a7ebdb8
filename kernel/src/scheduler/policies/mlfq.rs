/*
 * Multi-Level Feedback Queue Scheduling Policy
 *
 * Three FIFO levels, level 0 being the highest priority. Each level has its
 * own quantum (1, 2 and 4 ticks by default), so processes that keep getting
 * demoted run less often but for longer.
 *
 * Rules:
 * - New processes enter level 0
 * - Dispatch takes the head of the highest non-empty level
 * - A process that uses up its quantum is demoted one level, and stays in
 *   the lowest level once it gets there
 *
 * There is no periodic priority boost. A steady supply of fresh processes
 * can starve the lowest level; that is the textbook behavior this policy
 * demonstrates.
 */

use super::super::{
    ProcessId,
    queues::QueueSet,
    traits::{KernelSchedCtx, Scheduler},
    types::{DispatchDecision, LOWEST_LEVEL, MLFQ_LEVELS, PolicyKind, SlotId, TimeSliceTicks},
};

/// MLFQ scheduling policy
pub struct MlfqPolicy {
    /// Quantum for each level, level 0 first
    quanta: [TimeSliceTicks; MLFQ_LEVELS],
}

impl MlfqPolicy {
    pub fn new(quanta: [TimeSliceTicks; MLFQ_LEVELS]) -> Self {
        Self { quanta }
    }

    /// Quantum handed to a process dispatched from `level`
    pub fn quantum_for(&self, level: usize) -> TimeSliceTicks {
        self.quanta[level.min(LOWEST_LEVEL)]
    }

    /// Level a process re-enters after running from `from_level`
    pub fn demoted(from_level: Option<usize>) -> usize {
        match from_level {
            // Dispatched before the switch to MLFQ: starts over at the top
            None => 0,
            Some(level) => (level + 1).min(LOWEST_LEVEL),
        }
    }
}

impl Scheduler for MlfqPolicy {
    fn pick_next(
        &mut self,
        queues: &mut QueueSet,
        _ctx: &dyn KernelSchedCtx,
        _slot: SlotId,
    ) -> DispatchDecision {
        match queues.pop_front() {
            Some((pid, level)) => {
                let level = level.unwrap_or(0);
                DispatchDecision::run_from_level(pid, level, self.quantum_for(level))
            }
            None => DispatchDecision::idle(),
        }
    }

    fn requeue(&mut self, queues: &mut QueueSet, pid: ProcessId, from_level: Option<usize>) {
        let level = Self::demoted(from_level);
        log::debug!("[MLFQ] PID {} requeued at level {}", pid, level);
        queues.push(pid, level);
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Mlfq
    }

    fn name(&self) -> &'static str {
        "MLFQ"
    }
}

impl Default for MlfqPolicy {
    fn default() -> Self {
        Self::new([TimeSliceTicks(1), TimeSliceTicks(2), TimeSliceTicks(4)])
    }
}
