/*
 * Multi-Core Process Scheduler
 *
 * This module implements the simulated kernel's scheduler: a process table,
 * four interchangeable scheduling policies, and one worker thread per
 * simulated CPU core pulling work concurrently.
 *
 * ARCHITECTURE:
 * =============
 *
 * The scheduler is split into policy and mechanism:
 *
 * - Policy (policies/): decides WHICH process runs next and WHERE it goes
 *   when its quantum ends. FIFO, Round-Robin, MLFQ and Power-aware are the
 *   cases of the closed ActivePolicy enum.
 * - Mechanism (sched_core.rs): owns the process table, the ready queues and
 *   the slots, and applies policy decisions to them.
 * - Workers (worker.rs): one thread per core, looping dispatch -> simulated
 *   quantum -> complete until stopped.
 * - Control (scheduler_manager.rs): the ProcessManager API used by the shell.
 *
 * PROCESS LIFECYCLE:
 * ==================
 *
 *   create -> Ready -> Running (on a core or the console) -> Ready -> ...
 *                                   |
 *                                   +-> Terminated (explicit terminate only)
 *
 * Processes never exit on their own; they cycle until terminated.
 *
 * LOCKING:
 * ========
 *
 * All scheduler state sits behind one spin lock (SharedCore). "Pick next
 * process and mark it running" happens under that lock as one step, so two
 * cores can never dispatch the same process. The quantum itself is spent
 * outside the lock.
 *
 * INVARIANT:
 * ==========
 *
 * A live process is in exactly one ready queue level or exactly one slot.
 * SchedSnapshot::verify() checks this on any snapshot.
 */

pub mod error;
pub mod events;
pub mod policies;
pub mod process;
pub mod queues;
pub mod sched_core;
pub mod scheduler_manager;
pub mod snapshot;
pub mod traits;
pub mod types;
pub mod worker;

pub use error::SchedError;
pub use events::{SchedEvent, SchedObserver};
pub use policies::{ActivePolicy, FifoPolicy, MlfqPolicy, PowerAwarePolicy, RoundRobinPolicy};
pub use process::{PowerProfile, Process, ProcessId, ProcessState};
pub use queues::QueueSet;
pub use sched_core::{
    CompletionOutcome, CoreSlot, DispatchOutcome, SchedulerCore, SharedCore, SwitchOutcome,
    TerminateOutcome,
};
pub use scheduler_manager::{ProcessManager, StartOutcome, StopOutcome};
pub use snapshot::{CoreTable, Location, ProcessInfo, ProcessList, QueueSnapshot, SchedSnapshot, SlotInfo};
pub use traits::{KernelSchedCtx, Scheduler};
pub use types::{
    BatteryMode, CpuId, DispatchDecision, LOWEST_LEVEL, MLFQ_LEVELS, PolicyKind, Running, SlotId,
    TimeSliceTicks,
};
pub use worker::{CoreWorker, StopSignal, StopToken, WorkerTiming, stop_channel};
