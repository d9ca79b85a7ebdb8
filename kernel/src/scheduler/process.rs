/*
 * Process Abstraction
 *
 * This module implements the Process Control Block (PCB) for the simulated
 * kernel. A Process is a passive record:
 * - Identity (PID, display name, power profile)
 * - Lifecycle state (Ready, Running, Terminated)
 * - Accounting (how often it was dispatched, how many ticks it consumed)
 *
 * Why this is important:
 * - The scheduler core moves PIDs between queues and core slots; this record
 *   is what those PIDs refer to
 * - The power profile drives the power-aware dispatch policy
 * - The state field is the observable half of the "at most one running
 *   location" invariant
 */

use core::fmt;
use core::str::FromStr;

use super::SchedError;

/// Unique identifier for a process
///
/// PIDs are assigned from a monotonically increasing counter starting at 1
/// and are never reused, even after the process is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub usize);

impl ProcessId {
    /// Create a new ProcessId
    pub fn new(id: usize) -> Self {
        ProcessId(id)
    }

    /// Get the raw ID value
    pub fn as_usize(&self) -> usize {
        self.0
    }

    /// The PID that follows this one
    pub(crate) fn next(self) -> Self {
        ProcessId(self.0 + 1)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Power profile of a process
///
/// Only the power-aware policy looks at this; the other policies ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerProfile {
    Low,
    Medium,
    High,
}

impl PowerProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerProfile::Low => "low",
            PowerProfile::Medium => "medium",
            PowerProfile::High => "high",
        }
    }
}

impl FromStr for PowerProfile {
    type Err = SchedError;

    /// Case-insensitive parse of `low`, `medium` or `high`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PowerProfile::Low),
            "medium" => Ok(PowerProfile::Medium),
            "high" => Ok(PowerProfile::High),
            _ => Err(SchedError::InvalidPowerProfile(s.to_string())),
        }
    }
}

impl fmt::Display for PowerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process lifecycle state
///
/// Ready -> Running -> Ready -> ... -> Terminated
///
/// There is no automatic exit: a process only reaches Terminated through an
/// explicit termination of the slot that is running it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Ready,
    Running,
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Terminated => "TERMINATED",
        })
    }
}

/// Process Control Block
#[derive(Debug, Clone)]
pub struct Process {
    /// Unique process identifier
    pub id: ProcessId,

    /// Human-readable process name (for display only)
    pub name: String,

    /// Power profile used by the power-aware policy
    pub power_profile: PowerProfile,

    /// Current lifecycle state
    pub state: ProcessState,

    /// Number of times this process has been dispatched onto a slot
    pub dispatches: u64,

    /// Total simulated ticks consumed across all quanta
    pub cpu_ticks: u64,
}

impl Process {
    /// Create a new process in the Ready state
    pub fn new(id: ProcessId, name: &str, power_profile: PowerProfile) -> Self {
        Process {
            id,
            name: String::from(name),
            power_profile,
            state: ProcessState::Ready,
            dispatches: 0,
            cpu_ticks: 0,
        }
    }

    /// Check if the process is waiting in a ready queue
    pub fn is_ready(&self) -> bool {
        self.state == ProcessState::Ready
    }

    /// Check if the process currently occupies a slot
    pub fn is_running(&self) -> bool {
        self.state == ProcessState::Running
    }

    /// Record a dispatch onto a slot
    pub(crate) fn mark_running(&mut self) {
        self.state = ProcessState::Running;
        self.dispatches += 1;
    }

    /// Record the end of a quantum of `ticks` length
    pub(crate) fn mark_ready(&mut self, ticks: u32) {
        self.state = ProcessState::Ready;
        self.cpu_ticks += u64::from(ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_profile_parse() {
        assert_eq!("low".parse::<PowerProfile>().ok(), Some(PowerProfile::Low));
        assert_eq!(" HIGH ".parse::<PowerProfile>().ok(), Some(PowerProfile::High));
        assert_eq!("Medium".parse::<PowerProfile>().ok(), Some(PowerProfile::Medium));
        assert!(matches!(
            "turbo".parse::<PowerProfile>(),
            Err(SchedError::InvalidPowerProfile(s)) if s == "turbo"
        ));
    }

    #[test]
    fn test_process_accounting() {
        let mut p = Process::new(ProcessId(1), "init", PowerProfile::Low);
        assert!(p.is_ready());

        p.mark_running();
        assert!(p.is_running());
        p.mark_ready(4);

        assert_eq!(p.dispatches, 1);
        assert_eq!(p.cpu_ticks, 4);
        assert_eq!(p.state.to_string(), "READY");
    }

    #[test]
    fn test_pid_honours_width() {
        assert_eq!(format!("{:>5}|{:<3}|", ProcessId(2), ProcessId(17)), "    2|17 |");
    }
}
