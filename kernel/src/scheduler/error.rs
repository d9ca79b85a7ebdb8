/*
 * Scheduler Errors
 *
 * Validation failures and shutdown problems reported by the process
 * manager. Empty-resource conditions (nothing queued, nothing running) are
 * not errors; they are reported through the outcome enums instead.
 */

use core::fmt;

use super::{CpuId, ProcessId};

/// Scheduler errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// Power profile is not one of low/medium/high
    InvalidPowerProfile(String),
    /// Policy name is not one of FIFO/RR/MLFQ/POWER
    InvalidPolicy(String),
    /// Core count is zero or above the configured maximum
    InvalidCoreCount(usize),
    /// Operation requires the core workers to be stopped first
    CoresRunning,
    /// PID is not in the process table
    NoSuchProcess(ProcessId),
    /// PID exists but is waiting in a queue, not occupying a slot
    NotRunning(ProcessId),
    /// These core workers did not exit within the stop timeout
    StopTimeout(Vec<CpuId>),
    /// The OS refused to spawn a worker thread
    SpawnFailed(String),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::InvalidPowerProfile(p) => {
                write!(f, "Invalid power profile '{}' (expected low/medium/high)", p)
            }
            SchedError::InvalidPolicy(p) => {
                write!(f, "Invalid scheduler '{}' (expected FIFO/RR/MLFQ/POWER)", p)
            }
            SchedError::InvalidCoreCount(n) => write!(f, "Invalid core count {}", n),
            SchedError::CoresRunning => write!(f, "Cores are running; stop them first"),
            SchedError::NoSuchProcess(pid) => write!(f, "No process with PID {}", pid),
            SchedError::NotRunning(pid) => write!(f, "PID {} is not running", pid),
            SchedError::StopTimeout(cpus) => {
                write!(f, "Workers did not stop in time:")?;
                for cpu in cpus {
                    write!(f, " {}", cpu)?;
                }
                Ok(())
            }
            SchedError::SpawnFailed(msg) => write!(f, "Failed to spawn core worker: {}", msg),
        }
    }
}

impl std::error::Error for SchedError {}
