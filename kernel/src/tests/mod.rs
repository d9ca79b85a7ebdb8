/*
 * Kernel Scenario Tests
 *
 * End-to-end scenarios across subsystems, driven through the same entry
 * points the shell uses.
 *
 * ## Scenarios
 * - Policy walkthroughs: FIFO, Round-Robin, MLFQ demotion, power-aware picks
 * - Termination: immediate, deferred to the worker, nothing running
 * - Memory release on termination (scheduler -> memory observer)
 * - Core start/stop
 *
 * ## Stress
 * - `stress`: seeded random operation sequences, and many processes on
 *   several concurrent cores, checking the location invariant throughout
 */


use std::time::Duration;

use crate::Kernel;
use crate::config::{SchedConfig, SimConfig};
use crate::scheduler::{
    BatteryMode, CompletionOutcome, CpuId, DispatchOutcome, PolicyKind, PowerProfile, ProcessId,
    ProcessManager, SchedulerCore, SlotId, StopOutcome, SwitchOutcome, TerminateOutcome,
};

/// Millisecond ticks so worker tests finish quickly
pub(crate) fn fast_sched(policy: PolicyKind) -> SchedConfig {
    SchedConfig {
        tick: Duration::from_millis(1),
        idle_pause: Duration::from_millis(1),
        stop_timeout: Duration::from_secs(5),
        policy,
        ..SchedConfig::default()
    }
}

fn switched_pid(outcome: SwitchOutcome) -> Option<ProcessId> {
    match outcome {
        SwitchOutcome::Switched { next, .. } => Some(next.pid),
        SwitchOutcome::Idle { .. } => None,
    }
}

// ============================================================================
// POLICY WALKTHROUGHS
// ============================================================================

#[test]
fn test_fifo_runs_in_arrival_order() {
    let pm = ProcessManager::new(fast_sched(PolicyKind::Fifo));
    let a = pm.spawn("A", PowerProfile::Medium);
    let b = pm.spawn("B", PowerProfile::Medium);
    let c = pm.spawn("C", PowerProfile::Medium);

    let order: Vec<_> = (0..3).filter_map(|_| switched_pid(pm.switch_process())).collect();
    assert_eq!(order, vec![a, b, c]);
    assert_eq!(pm.snapshot().verify(), Ok(()));
}

#[test]
fn test_round_robin_alternates() {
    let pm = ProcessManager::new(fast_sched(PolicyKind::RoundRobin));
    let a = pm.spawn("A", PowerProfile::Low);
    let b = pm.spawn("B", PowerProfile::Low);

    let order: Vec<_> = (0..4).filter_map(|_| switched_pid(pm.switch_process())).collect();
    assert_eq!(order, vec![a, b, a, b]);

    // Whoever is not on the console waits in the queue, once
    let snap = pm.snapshot();
    assert_eq!(snap.queues.levels, vec![vec![a]]);
    assert_eq!(snap.verify(), Ok(()));
}

#[test]
fn test_mlfq_demotes_to_lowest_level() {
    let mut core = SchedulerCore::new(fast_sched(PolicyKind::Mlfq));
    let pid = core.create_process("cruncher", PowerProfile::High);

    let mut seen = Vec::new();
    for _ in 0..4 {
        let DispatchOutcome::Dispatched(running) = core.dispatch(SlotId::Console) else {
            panic!("expected a dispatch");
        };
        let CompletionOutcome::Requeued { level, .. } = core.complete(SlotId::Console) else {
            panic!("expected a requeue");
        };
        seen.push((running.level, running.timeslice.get(), level));
    }

    assert_eq!(
        seen,
        vec![(Some(0), 1, 1), (Some(1), 2, 2), (Some(2), 4, 2), (Some(2), 4, 2)]
    );
    assert_eq!(core.snapshot().queues.levels, vec![vec![], vec![], vec![pid]]);
}

#[test]
fn test_mlfq_prefers_higher_level() {
    let mut core = SchedulerCore::new(fast_sched(PolicyKind::Mlfq));
    let old = core.create_process("old", PowerProfile::Medium);
    core.dispatch(SlotId::Console);
    core.complete(SlotId::Console);
    let fresh = core.create_process("fresh", PowerProfile::Medium);

    let DispatchOutcome::Dispatched(running) = core.dispatch(SlotId::Console) else {
        panic!("expected a dispatch");
    };
    assert_eq!(running.pid, fresh);
    assert_eq!(core.snapshot().queues.levels[1], vec![old]);
}

#[test]
fn test_power_aware_follows_battery() {
    let mut config = fast_sched(PolicyKind::PowerAware);
    config.battery = BatteryMode::Fixed(10);
    let pm = ProcessManager::new(config);
    let high = pm.spawn("render", PowerProfile::High);
    let low = pm.spawn("sensor", PowerProfile::Low);

    // Low battery: the low-power process jumps the queue
    assert_eq!(switched_pid(pm.switch_process()), Some(low));

    // Plenty of battery: plain FIFO
    pm.set_battery(BatteryMode::Fixed(80));
    assert_eq!(switched_pid(pm.switch_process()), Some(high));
}

#[test]
fn test_policy_switch_keeps_every_process() {
    let pm = ProcessManager::new(fast_sched(PolicyKind::Mlfq));
    for name in ["a", "b", "c", "d"] {
        pm.spawn(name, PowerProfile::Medium);
    }
    pm.switch_process();
    pm.switch_process();

    for kind in [PolicyKind::Fifo, PolicyKind::Mlfq, PolicyKind::RoundRobin, PolicyKind::PowerAware] {
        pm.set_policy_kind(kind);
        let snap = pm.snapshot();
        assert_eq!(snap.verify(), Ok(()));
        assert_eq!(snap.processes.0.len(), 4);
    }
}

// ============================================================================
// TERMINATION
// ============================================================================

#[test]
fn test_terminate_with_nothing_running() {
    let pm = ProcessManager::new(fast_sched(PolicyKind::Fifo));
    let pid = pm.spawn("waiting", PowerProfile::Low);
    let before = pm.snapshot();

    assert_eq!(pm.terminate_running(), TerminateOutcome::NothingRunning);
    assert_eq!(pm.terminate(pid), Err(crate::scheduler::SchedError::NotRunning(pid)));
    assert_eq!(
        pm.terminate(ProcessId(42)),
        Err(crate::scheduler::SchedError::NoSuchProcess(ProcessId(42)))
    );
    assert_eq!(pm.snapshot(), before);
}

#[test]
fn test_terminate_releases_memory() {
    let kernel = Kernel::boot(SimConfig::default()).unwrap();
    let pid = kernel.processes.spawn("db", PowerProfile::High);
    kernel.memory.lock().create_page_table(pid, 3).unwrap();
    kernel.processes.switch_process();

    assert_eq!(kernel.processes.terminate(pid), Ok(TerminateOutcome::Terminated(pid)));
    let snap = kernel.processes.snapshot();
    assert!(snap.processes.0.iter().all(|p| p.pid != pid));
    assert_eq!(snap.terminated, 1);

    let memory = kernel.memory.lock();
    assert!(memory.page_table(pid).is_none());
    assert!(memory.frames().iter().all(Option::is_none));
}

#[test]
fn test_terminate_on_core_is_deferred() {
    let kernel = Kernel::boot(SimConfig::default()).unwrap();
    let pid = kernel.processes.spawn("job", PowerProfile::Medium);
    kernel.memory.lock().create_page_table(pid, 1).unwrap();

    let core = kernel.processes.shared();
    let slot = SlotId::Core(CpuId(0));
    assert!(matches!(core.lock().dispatch(slot), DispatchOutcome::Dispatched(_)));

    assert_eq!(
        kernel.processes.terminate(pid),
        Ok(TerminateOutcome::Pending { pid, cpu: CpuId(0) })
    );
    // Still on the core until its quantum ends
    assert!(kernel.memory.lock().page_table(pid).is_some());
    assert_eq!(kernel.processes.snapshot().verify(), Ok(()));

    assert_eq!(core.lock().complete(slot), CompletionOutcome::Terminated(pid));
    assert!(kernel.memory.lock().page_table(pid).is_none());
    let snap = kernel.processes.snapshot();
    assert!(snap.processes.0.is_empty());
    assert_eq!(snap.verify(), Ok(()));
}

// ============================================================================
// CORE CONTROL
// ============================================================================

#[test]
fn test_cores_run_and_stop_cleanly() {
    let mut pm = ProcessManager::new(fast_sched(PolicyKind::RoundRobin));
    pm.set_core_count(2).unwrap();
    for i in 0..5 {
        pm.spawn(&format!("p{}", i), PowerProfile::Medium);
    }

    pm.start_cores().unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(pm.stop_cores(), Ok(StopOutcome::Stopped { cores: 2 }));

    let snap = pm.snapshot();
    assert_eq!(snap.verify(), Ok(()));
    assert!(snap.cores.cores.iter().all(|s| s.running.is_none()));
    assert!(snap.processes.0.iter().any(|p| p.dispatches > 0));
    assert_eq!(snap.processes.0.len(), 5);
}
