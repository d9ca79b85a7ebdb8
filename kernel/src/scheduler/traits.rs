/*
 * Scheduler Trait Definitions
 *
 * This module defines the traits that separate scheduling policy from mechanism:
 *
 * - Scheduler: The policy interface that different algorithms implement
 * - KernelSchedCtx: The read-only view policies use to inspect processes
 *
 * This separation allows:
 * 1. Swapping scheduling algorithms without changing the core worker loop
 * 2. Testing policies in isolation against a plain queue set
 * 3. Clear ownership boundaries (policies never touch Process records directly)
 */

use super::{
    PowerProfile, ProcessId,
    queues::QueueSet,
    types::{DispatchDecision, PolicyKind, SlotId},
};

/// Scheduling policy trait
///
/// FIFO, Round-Robin, MLFQ and Power-aware implement this trait. The
/// SchedulerCore (mechanism) owns the queue set and lends it to the policy
/// for the duration of one call, always while holding the scheduler lock.
///
/// Policies are responsible for:
/// - Deciding which process runs next (pick_next)
/// - Deciding where a process goes when its quantum ends (requeue)
/// - Deciding where a new process enters (admit)
pub trait Scheduler: Send {
    /// Choose the next process to run on `slot`
    ///
    /// The chosen PID must be removed from `queues`. An empty queue set is
    /// not an error: return `DispatchDecision::idle()`.
    fn pick_next(
        &mut self,
        queues: &mut QueueSet,
        ctx: &dyn KernelSchedCtx,
        slot: SlotId,
    ) -> DispatchDecision;

    /// Put a process back after its quantum on a slot
    ///
    /// # Arguments
    /// - `pid`: The process leaving the slot
    /// - `from_level`: The level it was dispatched from (None if it was
    ///   dispatched by a policy without levels)
    fn requeue(&mut self, queues: &mut QueueSet, pid: ProcessId, from_level: Option<usize>);

    /// Insert a newly created process
    fn admit(&mut self, queues: &mut QueueSet, pid: ProcessId) {
        queues.push(pid, 0);
    }

    /// Which policy this is
    fn kind(&self) -> PolicyKind;

    /// Get the policy name for debugging
    fn name(&self) -> &'static str;
}

/// Kernel context interface for scheduling policies
///
/// This trait is the ONLY way policies can query process state. The
/// mechanism provides an implementation backed by the process table.
pub trait KernelSchedCtx {
    /// Get the power profile of a process
    fn power_profile(&self, pid: ProcessId) -> Option<PowerProfile>;
}
