/*
 * Scheduler Core - Mechanism Layer
 *
 * This module implements SchedulerCore, the mechanism layer that:
 * 1. Holds the active scheduling policy (ActivePolicy)
 * 2. Owns the process table, the ready queues and every slot
 * 3. Executes dispatch decisions (pick-and-mark as one step)
 * 4. Puts processes back when their quantum ends, or removes them when a
 *    termination was requested
 * 5. Reports what happened as SchedEvents to registered observers
 *
 * A SchedulerCore is shared between the core workers and the process
 * manager as SharedCore (one spin lock). Every method here runs with that
 * lock held and never sleeps, so holding it is always brief; the simulated
 * quantum is spent by the worker outside the lock.
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use spin::Mutex;

use crate::config::SchedConfig;

use super::{
    PowerProfile, Process, ProcessId, ProcessState, SchedError,
    events::{SchedEvent, SchedObserver},
    policies::ActivePolicy,
    queues::QueueSet,
    snapshot::{CoreTable, Location, ProcessInfo, ProcessList, QueueSnapshot, SchedSnapshot, SlotInfo},
    traits::{KernelSchedCtx, Scheduler},
    types::{BatteryMode, CpuId, PolicyKind, Running, SlotId},
};

/// The scheduler state shared by workers and the manager
pub type SharedCore = Arc<Mutex<SchedulerCore>>;

/// Per-slot scheduling state
///
/// One per simulated core, plus one for the console.
#[derive(Debug)]
pub struct CoreSlot {
    /// Which slot this is
    pub slot: SlotId,

    /// Process currently occupying the slot
    pub running: Option<Running>,

    /// Remove the occupant instead of requeueing it when its quantum ends
    pub terminate_requested: bool,

    /// Number of dispatches onto this slot
    pub dispatches: u64,

    /// Number of dispatch attempts that found nothing to run
    pub idle_polls: u64,
}

impl CoreSlot {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            running: None,
            terminate_requested: false,
            dispatches: 0,
            idle_polls: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.running.is_none()
    }
}

/// Result of asking a slot to pick up work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Nothing runnable; the slot stays idle
    Idle,
    Dispatched(Running),
}

/// Result of ending the quantum on a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The slot was already empty
    Idle,
    Requeued { pid: ProcessId, level: usize },
    /// A pending termination was carried out
    Terminated(ProcessId),
}

/// Result of a termination request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateOutcome {
    /// Removed from the process table right away
    Terminated(ProcessId),
    /// Marked; the worker of `cpu` removes it when the quantum ends
    Pending { pid: ProcessId, cpu: CpuId },
    /// No slot is occupied
    NothingRunning,
}

/// Result of a manual console switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// `previous` (if any) went back to the queue and nothing was runnable
    Idle { previous: Option<ProcessId> },
    Switched {
        previous: Option<ProcessId>,
        next: Running,
    },
}

/// Policy view of the process table
struct TableCtx<'a> {
    processes: &'a BTreeMap<ProcessId, Process>,
}

impl KernelSchedCtx for TableCtx<'_> {
    fn power_profile(&self, pid: ProcessId) -> Option<PowerProfile> {
        self.processes.get(&pid).map(|p| p.power_profile)
    }
}

/// Scheduler Core - The Mechanism Layer
///
/// The policy returns DispatchDecisions; SchedulerCore applies them to the
/// process table and the slots, so a PID is always in exactly one queue or
/// exactly one slot.
pub struct SchedulerCore {
    config: SchedConfig,

    /// The active scheduling policy (swappable at runtime)
    policy: ActivePolicy,

    /// Ready queues, shaped for the active policy
    queues: QueueSet,

    /// Live processes by PID
    processes: BTreeMap<ProcessId, Process>,

    /// One slot per simulated core
    cores: Vec<CoreSlot>,

    /// Slot used by manual switching
    console: CoreSlot,

    /// PID handed to the next created process
    next_pid: ProcessId,

    /// PIDs removed by termination, in order
    terminated: Vec<ProcessId>,

    observers: Vec<Arc<dyn SchedObserver>>,
}

impl SchedulerCore {
    /// Create a new SchedulerCore from the scheduler configuration
    pub fn new(config: SchedConfig) -> Self {
        let policy = ActivePolicy::new(config.policy, &config);
        let queues = QueueSet::for_levels(config.policy.uses_levels());
        let cores = (0..config.cores)
            .map(|i| CoreSlot::new(SlotId::Core(CpuId(i as u32))))
            .collect();

        log::info!("SchedulerCore initialized with policy: {}", policy.name());
        log::info!("Managing {} core(s)", config.cores);

        Self {
            config,
            policy,
            queues,
            processes: BTreeMap::new(),
            cores,
            console: CoreSlot::new(SlotId::Console),
            next_pid: ProcessId(1),
            terminated: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Wrap in the shared lock used by workers
    pub fn into_shared(self) -> SharedCore {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Get the name of the active policy
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    pub fn process(&self, pid: ProcessId) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// Register a collaborator interested in scheduler events
    pub fn add_observer(&mut self, observer: Arc<dyn SchedObserver>) {
        self.observers.push(observer);
    }

    fn notify(&self, event: SchedEvent) {
        log::trace!("[Sched] event {} {:?}", event.name(), event);
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    fn slot_mut(&mut self, slot: SlotId) -> Option<&mut CoreSlot> {
        match slot {
            SlotId::Console => Some(&mut self.console),
            SlotId::Core(cpu) => self.cores.get_mut(cpu.as_usize()),
        }
    }

    fn slot_ref(&self, slot: SlotId) -> Option<&CoreSlot> {
        match slot {
            SlotId::Console => Some(&self.console),
            SlotId::Core(cpu) => self.cores.get(cpu.as_usize()),
        }
    }

    // ========================================================================
    // PROCESS LIFECYCLE
    // ========================================================================

    /// Create a process and admit it to the ready queues
    pub fn create_process(&mut self, name: &str, power_profile: PowerProfile) -> ProcessId {
        let pid = self.next_pid;
        self.next_pid = pid.next();

        self.processes.insert(pid, Process::new(pid, name, power_profile));
        self.policy.admit(&mut self.queues, pid);

        log::info!(
            "Created process {} ({}) with {} power profile",
            pid,
            name,
            power_profile
        );
        self.notify(SchedEvent::ProcessCreated { pid });
        pid
    }

    /// Terminate the process occupying a slot
    ///
    /// Console occupants are removed at once. Core occupants are marked and
    /// removed by their worker at the end of the current quantum, so a worker
    /// never finds its process gone mid-quantum.
    pub fn terminate(&mut self, pid: ProcessId) -> Result<TerminateOutcome, SchedError> {
        if !self.processes.contains_key(&pid) {
            return Err(SchedError::NoSuchProcess(pid));
        }

        if self.console.running.map(|r| r.pid) == Some(pid) {
            self.console.running = None;
            self.console.terminate_requested = false;
            self.remove_process(pid);
            return Ok(TerminateOutcome::Terminated(pid));
        }

        let core = self
            .cores
            .iter_mut()
            .find(|c| c.running.map(|r| r.pid) == Some(pid));
        let Some(core) = core else {
            return Err(SchedError::NotRunning(pid));
        };
        let SlotId::Core(cpu) = core.slot else {
            return Err(SchedError::NotRunning(pid));
        };

        core.terminate_requested = true;
        if let Some(process) = self.processes.get_mut(&pid) {
            process.state = ProcessState::Terminated;
        }
        log::info!("Process {} marked for termination on {}", pid, cpu);
        Ok(TerminateOutcome::Pending { pid, cpu })
    }

    /// Terminate whatever is running: the console first, then the lowest core
    pub fn terminate_running(&mut self) -> TerminateOutcome {
        let target = self
            .console
            .running
            .or_else(|| {
                self.cores
                    .iter()
                    .filter(|c| !c.terminate_requested)
                    .find_map(|c| c.running)
            })
            .map(|r| r.pid);

        match target {
            // Always occupies a slot, so terminate() cannot fail here
            Some(pid) => self
                .terminate(pid)
                .unwrap_or(TerminateOutcome::NothingRunning),
            None => {
                log::info!("No process running to terminate");
                TerminateOutcome::NothingRunning
            }
        }
    }

    fn remove_process(&mut self, pid: ProcessId) {
        if let Some(process) = self.processes.remove(&pid) {
            log::info!("Terminated process {} ({})", pid, process.name);
        }
        self.terminated.push(pid);
        self.notify(SchedEvent::ProcessTerminated { pid });
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    /// Pick the next process for `slot` and mark it running
    ///
    /// An occupied slot is completed first, so its occupant is requeued
    /// before the policy decides.
    pub fn dispatch(&mut self, slot: SlotId) -> DispatchOutcome {
        let occupied = match self.slot_ref(slot) {
            Some(s) => !s.is_idle(),
            None => {
                log::warn!("[{}] Dispatch to unknown slot ignored", slot);
                return DispatchOutcome::Idle;
            }
        };
        if occupied {
            self.complete(slot);
        }

        let ctx = TableCtx {
            processes: &self.processes,
        };
        let decision = self.policy.pick_next(&mut self.queues, &ctx, slot);

        let Some(pid) = decision.next else {
            if let Some(s) = self.slot_mut(slot) {
                s.idle_polls += 1;
            }
            return DispatchOutcome::Idle;
        };

        let running = Running {
            pid,
            level: decision.level,
            timeslice: decision.timeslice,
        };
        if let Some(s) = self.slot_mut(slot) {
            s.running = Some(running);
            s.terminate_requested = false;
            s.dispatches += 1;
        }

        let name = match self.processes.get_mut(&pid) {
            Some(process) => {
                process.mark_running();
                process.name.clone()
            }
            None => String::new(),
        };

        match decision.level {
            Some(level) => log::info!("[{}] Running PID {} ({}) from level {}", slot, pid, name, level),
            None => log::info!("[{}] Running PID {} ({})", slot, pid, name),
        }
        self.notify(SchedEvent::ProcessDispatched {
            pid,
            slot,
            level: decision.level,
        });
        DispatchOutcome::Dispatched(running)
    }

    /// End the quantum of whatever occupies `slot`
    ///
    /// The occupant is requeued under the policy active now, or removed if a
    /// termination was requested while it ran.
    pub fn complete(&mut self, slot: SlotId) -> CompletionOutcome {
        let Some(s) = self.slot_mut(slot) else {
            return CompletionOutcome::Idle;
        };
        let Some(running) = s.running.take() else {
            return CompletionOutcome::Idle;
        };
        let terminate = core::mem::take(&mut s.terminate_requested);

        let pid = running.pid;
        let terminated = terminate
            || self
                .processes
                .get(&pid)
                .is_none_or(|p| p.state == ProcessState::Terminated);
        if terminated {
            self.remove_process(pid);
            return CompletionOutcome::Terminated(pid);
        }

        if let Some(process) = self.processes.get_mut(&pid) {
            process.mark_ready(running.timeslice.get());
        }
        self.policy.requeue(&mut self.queues, pid, running.level);
        let level = self.queues.level_of(pid).unwrap_or(0);

        log::debug!("[{}] PID {} back to ready queue (level {})", slot, pid, level);
        self.notify(SchedEvent::ProcessRequeued { pid, level });
        CompletionOutcome::Requeued { pid, level }
    }

    /// Manual single-step: return the console occupant and dispatch again
    pub fn switch_console(&mut self) -> SwitchOutcome {
        let previous = match self.complete(SlotId::Console) {
            CompletionOutcome::Requeued { pid, .. } => Some(pid),
            _ => None,
        };
        match self.dispatch(SlotId::Console) {
            DispatchOutcome::Dispatched(next) => SwitchOutcome::Switched { previous, next },
            DispatchOutcome::Idle => SwitchOutcome::Idle { previous },
        }
    }

    // ========================================================================
    // RECONFIGURATION
    // ========================================================================

    /// Replace the active policy, migrating the queues atomically
    ///
    /// Entering MLFQ moves the single queue into level 0; leaving it
    /// concatenates levels 0..2. Levels recorded for running processes are
    /// dropped, so they re-enter MLFQ at level 0.
    pub fn set_policy(&mut self, kind: PolicyKind) -> PolicyKind {
        let old = self.policy.kind();
        if old == kind {
            log::info!("Scheduler already set to {}", kind);
            return old;
        }

        self.config.policy = kind;
        self.policy = ActivePolicy::new(kind, &self.config);
        let queues = core::mem::take(&mut self.queues);
        self.queues = queues.reshape(kind.uses_levels());
        for s in self.cores.iter_mut().chain(core::iter::once(&mut self.console)) {
            if let Some(running) = s.running.as_mut() {
                running.level = None;
            }
        }

        log::info!(
            "Scheduler changed from {} to {} ({} queued process(es) migrated)",
            old,
            kind,
            self.queues.len()
        );
        self.notify(SchedEvent::PolicyChanged { old, new: kind });
        old
    }

    /// Change the battery source used by the power-aware policy
    pub fn set_battery(&mut self, battery: BatteryMode) {
        self.config.battery = battery;
        if let Some(policy) = self.policy.power_aware_mut() {
            policy.set_battery(battery);
        }
        log::info!("Battery source set to {:?}", battery);
    }

    /// Resize the core slot array
    ///
    /// Only called while no worker runs. Occupants of removed slots are
    /// completed (requeued or removed) first.
    pub fn resize_cores(&mut self, count: usize) {
        while self.cores.len() > count {
            let slot = self.cores[self.cores.len() - 1].slot;
            self.complete(slot);
            self.cores.pop();
        }
        while self.cores.len() < count {
            let cpu = CpuId(self.cores.len() as u32);
            self.cores.push(CoreSlot::new(SlotId::Core(cpu)));
        }
        self.config.cores = count;
        log::info!("Core count set to {}", count);
    }

    // ========================================================================
    // SNAPSHOTS
    // ========================================================================

    fn slot_info(&self, slot: &CoreSlot) -> SlotInfo {
        SlotInfo {
            slot: slot.slot,
            running: slot.running.map(|r| {
                let name = self
                    .processes
                    .get(&r.pid)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                (r.pid, name, r.level)
            }),
            terminate_requested: slot.terminate_requested,
            dispatches: slot.dispatches,
            idle_polls: slot.idle_polls,
        }
    }

    fn location_of(&self, pid: ProcessId) -> Option<Location> {
        if let Some(level) = self.queues.level_of(pid) {
            return Some(Location::Queued { level });
        }
        self.cores
            .iter()
            .chain(core::iter::once(&self.console))
            .find(|s| s.running.map(|r| r.pid) == Some(pid))
            .map(|s| Location::Running(s.slot))
    }

    /// Copy the complete state
    pub fn snapshot(&self) -> SchedSnapshot {
        let processes = self
            .processes
            .values()
            .map(|p| ProcessInfo {
                pid: p.id,
                name: p.name.clone(),
                power_profile: p.power_profile,
                state: p.state,
                dispatches: p.dispatches,
                cpu_ticks: p.cpu_ticks,
                // A live process without a location would be a lost process;
                // verify() reports it through the queue/slot counts.
                location: self
                    .location_of(p.id)
                    .unwrap_or(Location::Queued { level: usize::MAX }),
            })
            .collect();

        SchedSnapshot {
            processes: ProcessList(processes),
            queues: QueueSnapshot {
                policy: self.policy.kind(),
                levels: self.queues.levels(),
            },
            cores: CoreTable {
                cores: self.cores.iter().map(|s| self.slot_info(s)).collect(),
                console: self.slot_info(&self.console),
            },
            created: self.next_pid.as_usize() - 1,
            terminated: self.terminated.len(),
        }
    }
}

impl core::fmt::Debug for SchedulerCore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SchedulerCore")
            .field("policy", &self.policy.name())
            .field("queued", &self.queues.len())
            .field("processes", &self.processes.len())
            .field("cores", &self.cores)
            .field("console", &self.console)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_with(policy: PolicyKind, cores: usize) -> SchedulerCore {
        let config = SchedConfig {
            policy,
            cores,
            ..SchedConfig::default()
        };
        SchedulerCore::new(config)
    }

    #[test]
    fn test_create_assigns_increasing_pids() {
        let mut core = core_with(PolicyKind::Fifo, 1);
        let a = core.create_process("a", PowerProfile::Low);
        let b = core.create_process("b", PowerProfile::High);
        assert_eq!((a, b), (ProcessId(1), ProcessId(2)));
        assert_eq!(core.snapshot().queues.levels, vec![vec![a, b]]);
    }

    #[test]
    fn test_dispatch_marks_running_and_complete_requeues() {
        let mut core = core_with(PolicyKind::Fifo, 2);
        let a = core.create_process("a", PowerProfile::Low);
        let slot = SlotId::Core(CpuId(1));

        let DispatchOutcome::Dispatched(running) = core.dispatch(slot) else {
            panic!("expected a dispatch");
        };
        assert_eq!(running.pid, a);
        assert_eq!(core.process(a).unwrap().state, ProcessState::Running);
        assert_eq!(core.dispatch(SlotId::Core(CpuId(0))), DispatchOutcome::Idle);

        assert_eq!(core.complete(slot), CompletionOutcome::Requeued { pid: a, level: 0 });
        let p = core.process(a).unwrap();
        assert_eq!((p.state, p.dispatches, p.cpu_ticks), (ProcessState::Ready, 1, 2));
        assert_eq!(core.complete(slot), CompletionOutcome::Idle);
        assert_eq!(core.snapshot().verify(), Ok(()));
    }

    #[test]
    fn test_terminate_on_core_is_deferred() {
        let mut core = core_with(PolicyKind::RoundRobin, 1);
        let a = core.create_process("a", PowerProfile::Low);
        let b = core.create_process("b", PowerProfile::Low);
        let slot = SlotId::Core(CpuId(0));
        core.dispatch(slot);

        assert_eq!(core.terminate(b), Err(SchedError::NotRunning(b)));
        assert_eq!(core.terminate(ProcessId(99)), Err(SchedError::NoSuchProcess(ProcessId(99))));
        assert_eq!(
            core.terminate(a),
            Ok(TerminateOutcome::Pending { pid: a, cpu: CpuId(0) })
        );
        assert_eq!(core.process(a).unwrap().state, ProcessState::Terminated);
        assert_eq!(core.snapshot().verify(), Ok(()));

        assert_eq!(core.complete(slot), CompletionOutcome::Terminated(a));
        assert!(core.process(a).is_none());
        let snap = core.snapshot();
        assert_eq!((snap.created, snap.terminated), (2, 1));
        assert_eq!(snap.verify(), Ok(()));
    }

    #[test]
    fn test_terminate_running_prefers_console() {
        let mut core = core_with(PolicyKind::Fifo, 1);
        assert_eq!(core.terminate_running(), TerminateOutcome::NothingRunning);

        let a = core.create_process("a", PowerProfile::Low);
        let b = core.create_process("b", PowerProfile::Low);
        core.dispatch(SlotId::Core(CpuId(0)));
        core.switch_console();

        assert_eq!(core.terminate_running(), TerminateOutcome::Terminated(b));
        assert_eq!(
            core.terminate_running(),
            TerminateOutcome::Pending { pid: a, cpu: CpuId(0) }
        );
        // Already marked: nothing else left to terminate
        assert_eq!(core.terminate_running(), TerminateOutcome::NothingRunning);
    }

    #[test]
    fn test_policy_switch_migrates_queues() {
        let mut core = core_with(PolicyKind::Mlfq, 1);
        let a = core.create_process("a", PowerProfile::Low);
        let b = core.create_process("b", PowerProfile::Low);
        let c = core.create_process("c", PowerProfile::Low);

        // a: level 0 -> 1
        core.switch_console();
        core.switch_console();
        // b is on the console now, a sits at level 1
        assert_eq!(core.snapshot().queues.levels, vec![vec![c], vec![a], vec![]]);

        assert_eq!(core.set_policy(PolicyKind::Fifo), PolicyKind::Mlfq);
        assert_eq!(core.snapshot().queues.levels, vec![vec![c, a]]);

        core.set_policy(PolicyKind::Mlfq);
        assert_eq!(core.snapshot().queues.levels, vec![vec![c, a], vec![], vec![]]);

        // b lost its level with the switch and re-enters at level 0
        core.switch_console();
        assert_eq!(core.snapshot().queues.levels, vec![vec![a, b], vec![], vec![]]);
        assert_eq!(core.snapshot().verify(), Ok(()));
    }

    #[test]
    fn test_resize_requeues_removed_slots() {
        let mut core = core_with(PolicyKind::Fifo, 2);
        let a = core.create_process("a", PowerProfile::Low);
        core.dispatch(SlotId::Core(CpuId(1)));

        core.resize_cores(1);
        assert_eq!(core.core_count(), 1);
        assert_eq!(core.snapshot().queues.levels, vec![vec![a]]);
        core.resize_cores(3);
        assert_eq!(core.snapshot().cores.cores.len(), 3);
    }
}
