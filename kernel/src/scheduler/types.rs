/*
 * Scheduler Type Definitions
 *
 * This module defines the core types used throughout the scheduler subsystem.
 * These types are designed to be lightweight, Copy-able, and suitable for
 * use in both policy and mechanism layers.
 */

use core::fmt;
use core::str::FromStr;

use super::{ProcessId, SchedError};

/// Number of MLFQ priority levels (0 = highest)
pub const MLFQ_LEVELS: usize = 3;

/// Lowest MLFQ level; processes demoted here stay here
pub const LOWEST_LEVEL: usize = MLFQ_LEVELS - 1;

/// CPU identifier
///
/// Represents one simulated CPU core, indexed from 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuId(pub u32);

impl CpuId {
    /// Get the CPU ID as a usize for indexing
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Core {}", self.0)
    }
}

/// Where a running process lives
///
/// Every simulated core owns one slot. The console slot is used by the
/// manual `switch_process` path, so interactive single-stepping follows the
/// same bookkeeping as the concurrent workers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SlotId {
    Core(CpuId),
    Console,
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Core(cpu) => write!(f, "{}", cpu),
            SlotId::Console => f.write_str("Console"),
        }
    }
}

/// Time slice duration in simulated ticks
///
/// The worker sleeps `tick * timeslice` while a process occupies its slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSliceTicks(pub u32);

impl TimeSliceTicks {
    /// Default time slice (2 ticks = 1 s with the default 500 ms tick)
    pub const DEFAULT: TimeSliceTicks = TimeSliceTicks(2);

    /// Get the value as u32
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Dispatch decision made by a scheduling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchDecision {
    /// Process to run next (None = no work available, slot goes idle)
    pub next: Option<ProcessId>,

    /// MLFQ level the process was taken from (None outside MLFQ)
    pub level: Option<usize>,

    /// Time slice for the selected process
    pub timeslice: TimeSliceTicks,
}

impl DispatchDecision {
    /// Create a decision to run a specific process
    pub fn run_process(pid: ProcessId, timeslice: TimeSliceTicks) -> Self {
        Self {
            next: Some(pid),
            level: None,
            timeslice,
        }
    }

    /// Create a decision to run a process taken from an MLFQ level
    pub fn run_from_level(pid: ProcessId, level: usize, timeslice: TimeSliceTicks) -> Self {
        Self {
            next: Some(pid),
            level: Some(level),
            timeslice,
        }
    }

    /// Create a decision to idle the slot
    pub fn idle() -> Self {
        Self {
            next: None,
            level: None,
            timeslice: TimeSliceTicks::DEFAULT,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.next.is_none()
    }
}

/// A process occupying a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Running {
    pub pid: ProcessId,
    /// Level it was dispatched from, needed for demotion on completion
    pub level: Option<usize>,
    pub timeslice: TimeSliceTicks,
}

/// Scheduling policy selector
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Fifo,
    RoundRobin,
    Mlfq,
    PowerAware,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Fifo,
        PolicyKind::RoundRobin,
        PolicyKind::Mlfq,
        PolicyKind::PowerAware,
    ];

    /// Whether this policy keeps its ready processes in priority levels
    pub fn uses_levels(self) -> bool {
        matches!(self, PolicyKind::Mlfq)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Fifo => "FIFO",
            PolicyKind::RoundRobin => "RR",
            PolicyKind::Mlfq => "MLFQ",
            PolicyKind::PowerAware => "POWER",
        }
    }
}

impl FromStr for PolicyKind {
    type Err = SchedError;

    /// Case-insensitive; accepts the long and short spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "rr" | "round_robin" | "roundrobin" => Ok(PolicyKind::RoundRobin),
            "mlfq" => Ok(PolicyKind::Mlfq),
            "power" | "power_aware" | "poweraware" => Ok(PolicyKind::PowerAware),
            _ => Err(SchedError::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the simulated battery level read by the power-aware policy
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BatteryMode {
    /// Uniformly re-rolled in 1..=100 on every dispatch decision
    Simulated,
    /// Pinned to a level (1..=100), for tests and demonstrations
    Fixed(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parse() {
        assert_eq!("fifo".parse::<PolicyKind>().ok(), Some(PolicyKind::Fifo));
        assert_eq!("RR".parse::<PolicyKind>().ok(), Some(PolicyKind::RoundRobin));
        assert_eq!("Round_Robin".parse::<PolicyKind>().ok(), Some(PolicyKind::RoundRobin));
        assert_eq!("round-robin".parse::<PolicyKind>().ok(), Some(PolicyKind::RoundRobin));
        assert_eq!("mlfq".parse::<PolicyKind>().ok(), Some(PolicyKind::Mlfq));
        assert_eq!("POWER".parse::<PolicyKind>().ok(), Some(PolicyKind::PowerAware));
        assert_eq!("power_aware".parse::<PolicyKind>().ok(), Some(PolicyKind::PowerAware));
        assert!(matches!(
            "lottery".parse::<PolicyKind>(),
            Err(SchedError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_idle_decision() {
        assert!(DispatchDecision::idle().is_idle());
        let d = DispatchDecision::run_from_level(ProcessId(3), 1, TimeSliceTicks(2));
        assert_eq!(d.next, Some(ProcessId(3)));
        assert_eq!(d.level, Some(1));
    }
}
