/*
 * Process Manager
 *
 * This module provides the ProcessManager, the control surface of the
 * scheduler. It owns the shared SchedulerCore and the set of core workers
 * and offers:
 * - Process lifecycle: create, terminate, manual switching
 * - Reconfiguration: policy, core count, battery source
 * - Core control: start and stop the worker threads
 * - Snapshot queries for the front end
 *
 * Every query and mutation goes through the same scheduler lock the workers
 * use, so callers never observe a half-applied dispatch.
 */

use std::sync::Arc;
use std::time::Duration;

use super::{
    PowerProfile, ProcessId, SchedError,
    events::SchedObserver,
    sched_core::{SchedulerCore, SharedCore, SwitchOutcome, TerminateOutcome},
    snapshot::{CoreTable, ProcessList, QueueSnapshot, SchedSnapshot},
    types::{BatteryMode, CpuId, PolicyKind},
    worker::{CoreWorker, StopSignal, WorkerTiming, stop_channel},
};
use crate::config::SchedConfig;

/// Result of start_cores()
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { cores: usize },
    /// Workers are already tracked; nothing was spawned
    AlreadyRunning,
}

/// Result of a successful stop_cores()
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped { cores: usize },
    NotRunning,
}

/// Scheduling control and system state
///
/// # Examples
///
/// ```
/// use simos_kernel::config::SchedConfig;
/// use simos_kernel::scheduler::{ProcessManager, SwitchOutcome};
///
/// let pm = ProcessManager::new(SchedConfig::default());
/// let pid = pm.create_process("editor", "low").unwrap();
/// assert!(matches!(pm.switch_process(), SwitchOutcome::Switched { next, .. } if next.pid == pid));
/// ```
pub struct ProcessManager {
    core: SharedCore,
    workers: Vec<CoreWorker>,
    /// Present while workers have not been told to stop
    stop: Option<StopSignal>,
    /// Read once at construction; stopping never waits on the scheduler lock
    stop_timeout: Duration,
}

impl ProcessManager {
    pub fn new(config: SchedConfig) -> Self {
        Self {
            stop_timeout: config.stop_timeout,
            core: SchedulerCore::new(config).into_shared(),
            workers: Vec::new(),
            stop: None,
        }
    }

    /// The shared scheduler state, as seen by the workers
    pub fn shared(&self) -> SharedCore {
        self.core.clone()
    }

    pub fn add_observer(&self, observer: Arc<dyn SchedObserver>) {
        self.core.lock().add_observer(observer);
    }

    // ========================================================================
    // PROCESS LIFECYCLE
    // ========================================================================

    /// Create a process from user input
    ///
    /// The power profile is matched case-insensitively; anything other than
    /// low/medium/high is rejected and no process is created.
    pub fn create_process(&self, name: &str, power_profile: &str) -> Result<ProcessId, SchedError> {
        let profile = power_profile.parse::<PowerProfile>().inspect_err(|e| {
            log::warn!("create_process: {}", e);
        })?;
        Ok(self.spawn(name, profile))
    }

    /// Create a process with an already validated power profile
    pub fn spawn(&self, name: &str, power_profile: PowerProfile) -> ProcessId {
        self.core.lock().create_process(name, power_profile)
    }

    /// Terminate the process running as `pid`
    pub fn terminate(&self, pid: ProcessId) -> Result<TerminateOutcome, SchedError> {
        self.core.lock().terminate(pid)
    }

    /// Terminate the running process (console first, then the lowest core)
    pub fn terminate_running(&self) -> TerminateOutcome {
        self.core.lock().terminate_running()
    }

    /// Return the console's process to the queue and dispatch once
    pub fn switch_process(&self) -> SwitchOutcome {
        self.core.lock().switch_console()
    }

    // ========================================================================
    // RECONFIGURATION
    // ========================================================================

    /// Change the policy by name, returning the previous one
    ///
    /// Allowed while cores run: the queue migration is atomic under the
    /// scheduler lock. An invalid name leaves the policy unchanged.
    pub fn set_policy(&self, name: &str) -> Result<PolicyKind, SchedError> {
        let kind = name.parse::<PolicyKind>().inspect_err(|e| {
            log::warn!("set_policy: {}", e);
        })?;
        Ok(self.set_policy_kind(kind))
    }

    pub fn set_policy_kind(&self, kind: PolicyKind) -> PolicyKind {
        self.core.lock().set_policy(kind)
    }

    pub fn policy(&self) -> PolicyKind {
        self.core.lock().policy_kind()
    }

    pub fn set_battery(&self, battery: BatteryMode) {
        self.core.lock().set_battery(battery);
    }

    /// Resize the core slot array; cores must be stopped
    pub fn set_core_count(&self, count: usize) -> Result<(), SchedError> {
        let mut core = self.core.lock();
        if count == 0 || count > core.config().max_cores {
            log::warn!("set_core_count: {} is outside 1..={}", count, core.config().max_cores);
            return Err(SchedError::InvalidCoreCount(count));
        }
        if !self.workers.is_empty() {
            log::warn!("set_core_count: stop the cores first");
            return Err(SchedError::CoresRunning);
        }
        core.resize_cores(count);
        Ok(())
    }

    pub fn core_count(&self) -> usize {
        self.core.lock().core_count()
    }

    // ========================================================================
    // CORE CONTROL
    // ========================================================================

    /// Whether any worker is still tracked (running or not yet confirmed stopped)
    pub fn cores_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Spawn one worker per configured core
    pub fn start_cores(&mut self) -> Result<StartOutcome, SchedError> {
        if !self.workers.is_empty() {
            log::warn!("Cores are already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let (count, timing) = {
            let core = self.core.lock();
            let config = core.config();
            let timing = WorkerTiming {
                tick: config.tick,
                idle_pause: config.idle_pause,
            };
            (core.core_count(), timing)
        };

        let (signal, token) = stop_channel();
        self.stop = Some(signal);
        for i in 0..count {
            let cpu = CpuId(i as u32);
            match CoreWorker::spawn(cpu, self.core.clone(), token.clone(), timing) {
                Ok(worker) => self.workers.push(worker),
                Err(e) => {
                    log::error!("Failed to spawn worker for {}: {}", cpu, e);
                    if let Err(stop_err) = self.stop_cores() {
                        log::warn!("{}", stop_err);
                    }
                    return Err(SchedError::SpawnFailed(e.to_string()));
                }
            }
        }

        log::info!("Started {} core(s)", count);
        Ok(StartOutcome::Started { cores: count })
    }

    /// Stop every worker and wait for each, up to the stop timeout
    ///
    /// Workers that do not exit in time stay tracked and are reported; a
    /// later call waits for them again.
    pub fn stop_cores(&mut self) -> Result<StopOutcome, SchedError> {
        if self.workers.is_empty() {
            return Ok(StopOutcome::NotRunning);
        }

        if let Some(signal) = self.stop.take() {
            signal.stop();
        }
        let timeout = self.stop_timeout;

        let mut stopped = 0;
        let mut stalled = Vec::new();
        for mut worker in self.workers.drain(..) {
            if worker.wait(timeout) {
                stopped += 1;
            } else {
                log::warn!("[{}] Worker did not stop within {:?}", worker.cpu(), timeout);
                stalled.push(worker);
            }
        }
        self.workers = stalled;

        if self.workers.is_empty() {
            log::info!("Stopped {} core(s)", stopped);
            Ok(StopOutcome::Stopped { cores: stopped })
        } else {
            Err(SchedError::StopTimeout(
                self.workers.iter().map(CoreWorker::cpu).collect(),
            ))
        }
    }

    // ========================================================================
    // SNAPSHOT QUERIES
    // ========================================================================

    pub fn snapshot(&self) -> SchedSnapshot {
        self.core.lock().snapshot()
    }

    pub fn list_processes(&self) -> ProcessList {
        self.snapshot().processes
    }

    pub fn visualize_queues(&self) -> QueueSnapshot {
        self.snapshot().queues
    }

    pub fn show_cores(&self) -> CoreTable {
        self.snapshot().cores
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        if let Err(e) = self.stop_cores() {
            log::warn!("Process manager dropped with live workers: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn fast_config() -> SchedConfig {
        SchedConfig {
            tick: Duration::from_millis(1),
            idle_pause: Duration::from_millis(1),
            stop_timeout: Duration::from_secs(5),
            ..SchedConfig::default()
        }
    }

    #[test]
    fn test_create_rejects_bad_profile() {
        let pm = ProcessManager::new(fast_config());
        assert_eq!(
            pm.create_process("x", "turbo"),
            Err(SchedError::InvalidPowerProfile("turbo".to_string()))
        );
        assert!(pm.list_processes().0.is_empty());
        assert_eq!(pm.create_process("x", "LOW"), Ok(ProcessId(1)));
    }

    #[test]
    fn test_invalid_policy_keeps_previous() {
        let pm = ProcessManager::new(fast_config());
        assert!(matches!(pm.set_policy("lottery"), Err(SchedError::InvalidPolicy(_))));
        assert_eq!(pm.policy(), PolicyKind::Fifo);
        assert_eq!(pm.set_policy("rr"), Ok(PolicyKind::Fifo));
        assert_eq!(pm.policy(), PolicyKind::RoundRobin);
    }

    #[test]
    fn test_core_count_validation() {
        let mut pm = ProcessManager::new(fast_config());
        assert_eq!(pm.set_core_count(0), Err(SchedError::InvalidCoreCount(0)));
        assert_eq!(pm.set_core_count(17), Err(SchedError::InvalidCoreCount(17)));
        assert_eq!(pm.set_core_count(4), Ok(()));
        assert_eq!(pm.core_count(), 4);

        assert_eq!(pm.start_cores(), Ok(StartOutcome::Started { cores: 4 }));
        assert_eq!(pm.set_core_count(2), Err(SchedError::CoresRunning));
        assert_eq!(pm.start_cores(), Ok(StartOutcome::AlreadyRunning));
        assert_eq!(pm.stop_cores(), Ok(StopOutcome::Stopped { cores: 4 }));
        assert_eq!(pm.stop_cores(), Ok(StopOutcome::NotRunning));
        assert_eq!(pm.set_core_count(2), Ok(()));
    }

    #[test]
    fn test_drop_stops_workers() {
        let mut pm = ProcessManager::new(fast_config());
        pm.spawn("a", PowerProfile::High);
        let core = pm.shared();
        pm.start_cores().unwrap();
        drop(pm);

        let snap = core.lock().snapshot();
        assert!(snap.cores.cores.iter().all(|s| s.running.is_none()));
        assert_eq!(snap.verify(), Ok(()));
    }

    #[test]
    fn test_stop_reports_worker_stuck_on_lock() {
        let mut config = fast_config();
        config.cores = 1;
        config.stop_timeout = Duration::from_millis(20);
        let mut pm = ProcessManager::new(config);
        let pid = pm.spawn("busy", PowerProfile::Medium);
        assert_eq!(pm.start_cores(), Ok(StartOutcome::Started { cores: 1 }));

        // Wait for the worker to be in its loop
        let mut spins = 0;
        while pm.snapshot().processes.0.iter().all(|p| p.pid != pid || p.dispatches == 0) && spins < 2000 {
            std::thread::sleep(Duration::from_millis(1));
            spins += 1;
        }

        // Hold the scheduler lock from another thread until told to let go
        let core = pm.shared();
        let (locked_tx, locked_rx) = crossbeam_channel::bounded(0);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
        let holder = std::thread::spawn(move || {
            let _guard = core.lock();
            locked_tx.send(()).unwrap();
            let _ = release_rx.recv();
        });
        locked_rx.recv().unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(pm.stop_cores(), Err(SchedError::StopTimeout(vec![CpuId(0)])));
        assert!(pm.cores_running());
        assert_eq!(pm.start_cores(), Ok(StartOutcome::AlreadyRunning));

        release_tx.send(()).unwrap();
        holder.join().unwrap();
        assert_eq!(pm.stop_cores(), Ok(StopOutcome::Stopped { cores: 1 }));
        assert!(!pm.cores_running());
        assert_eq!(pm.snapshot().verify(), Ok(()));
    }

    #[test]
    fn test_terminate_running_under_load() {
        let mut config = fast_config();
        config.cores = 4;
        let mut pm = ProcessManager::new(config);
        for i in 0..20 {
            pm.spawn(&format!("job{}", i), PowerProfile::Medium);
        }
        pm.start_cores().unwrap();

        let mut requested = HashSet::new();
        for _ in 0..500 {
            match pm.terminate_running() {
                TerminateOutcome::Terminated(pid) | TerminateOutcome::Pending { pid, .. } => {
                    requested.insert(pid);
                }
                TerminateOutcome::NothingRunning => {}
            }
            assert_eq!(pm.snapshot().verify(), Ok(()));
            if requested.len() >= 5 {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(pm.stop_cores(), Ok(StopOutcome::Stopped { cores: 4 }));

        // Pending requests resolve when the quantum ends, even on shutdown
        let snap = pm.snapshot();
        assert_eq!(snap.verify(), Ok(()));
        assert!(!requested.is_empty());
        assert_eq!(snap.terminated, requested.len());
        assert!(snap.processes.0.iter().all(|p| !requested.contains(&p.pid)));
        assert_eq!(snap.processes.0.len() + requested.len(), 20);
    }
}
