/*
 * Scheduler Snapshots
 *
 * Read-only copies of the scheduler state, taken under a single acquisition
 * of the scheduler lock so they never show a torn state. The front end only
 * ever renders these; it never looks at live scheduler structures.
 *
 * Three views are rendered from a snapshot:
 * - ProcessList: the process table (ps)
 * - QueueSnapshot: the ready queue(s) of the active policy
 * - CoreTable: every core slot plus the console slot
 */

use core::fmt;

use super::{
    PowerProfile, ProcessId, ProcessState,
    types::{PolicyKind, SlotId},
};

/// Where a live process currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Waiting in a ready queue (level is always 0 outside MLFQ)
    Queued { level: usize },
    /// Occupying a slot
    Running(SlotId),
}

/// One row of the process table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub name: String,
    pub power_profile: PowerProfile,
    pub state: ProcessState,
    pub dispatches: u64,
    pub cpu_ticks: u64,
    pub location: Location,
}

/// One slot: a simulated core or the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot: SlotId,
    /// Occupant: PID, name and dispatch level
    pub running: Option<(ProcessId, String, Option<usize>)>,
    pub terminate_requested: bool,
    pub dispatches: u64,
    pub idle_polls: u64,
}

impl SlotInfo {
    pub fn pid(&self) -> Option<ProcessId> {
        self.running.as_ref().map(|(pid, _, _)| *pid)
    }
}

/// Process table view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessList(pub Vec<ProcessInfo>);

/// Ready queue view, one Vec per level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub policy: PolicyKind,
    pub levels: Vec<Vec<ProcessId>>,
}

/// Core slot view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreTable {
    pub cores: Vec<SlotInfo>,
    pub console: SlotInfo,
}

impl CoreTable {
    /// Every occupied slot, cores first
    pub fn occupied(&self) -> impl Iterator<Item = &SlotInfo> {
        self.cores
            .iter()
            .chain(core::iter::once(&self.console))
            .filter(|s| s.running.is_some())
    }
}

/// Consistent copy of the whole scheduler state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedSnapshot {
    pub processes: ProcessList,
    pub queues: QueueSnapshot,
    pub cores: CoreTable,
    /// Processes ever created
    pub created: usize,
    /// Processes terminated and removed from the table
    pub terminated: usize,
}

impl SchedSnapshot {
    /// Check the location invariant
    ///
    /// Every live PID is in exactly one queue or exactly one slot, and
    /// live + terminated == created.
    pub fn verify(&self) -> Result<(), String> {
        let queued: Vec<ProcessId> = self.queues.levels.iter().flatten().copied().collect();
        let running: Vec<ProcessId> = self.cores.occupied().filter_map(SlotInfo::pid).collect();

        for info in &self.processes.0 {
            let in_queues = queued.iter().filter(|&&p| p == info.pid).count();
            let in_slots = running.iter().filter(|&&p| p == info.pid).count();
            if in_queues + in_slots != 1 {
                return Err(format!(
                    "PID {} found {} time(s) in queues and {} time(s) in slots",
                    info.pid, in_queues, in_slots
                ));
            }
            let state_ok = match info.location {
                Location::Queued { .. } => info.state == ProcessState::Ready,
                Location::Running(_) => info.state != ProcessState::Ready,
            };
            if !state_ok {
                return Err(format!("PID {} is {} at {:?}", info.pid, info.state, info.location));
            }
        }

        let live = self.processes.0.len();
        if queued.len() + running.len() != live {
            return Err(format!(
                "{} queued + {} running, but {} live processes",
                queued.len(),
                running.len(),
                live
            ));
        }
        if live + self.terminated != self.created {
            return Err(format!(
                "{} live + {} terminated != {} created",
                live, self.terminated, self.created
            ));
        }
        Ok(())
    }
}

impl fmt::Display for ProcessList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No processes.");
        }
        writeln!(
            f,
            "{:>5}  {:<16} {:<7} {:<11} {:>6} {:>6}  {}",
            "PID", "NAME", "POWER", "STATE", "RUNS", "TICKS", "WHERE"
        )?;
        for p in &self.0 {
            let location = match p.location {
                Location::Queued { level } => format!("queue L{}", level),
                Location::Running(slot) => slot.to_string(),
            };
            writeln!(
                f,
                "{:>5}  {:<16} {:<7} {:<11} {:>6} {:>6}  {}",
                p.pid,
                p.name,
                p.power_profile.as_str(),
                p.state.to_string(),
                p.dispatches,
                p.cpu_ticks,
                location
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scheduler: {}", self.policy)?;
        let leveled = self.levels.len() > 1;
        for (level, queue) in self.levels.iter().enumerate() {
            if leveled {
                write!(f, "Level {}: ", level)?;
            } else {
                write!(f, "Ready queue: ")?;
            }
            if queue.is_empty() {
                writeln!(f, "(empty)")?;
                continue;
            }
            let pids: Vec<String> = queue.iter().map(|p| format!("P{}", p)).collect();
            writeln!(f, "{}", pids.join(" -> "))?;
        }
        Ok(())
    }
}

impl fmt::Display for SlotInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8}: ", self.slot.to_string())?;
        match &self.running {
            Some((pid, name, level)) => {
                write!(f, "PID {} ({})", pid, name)?;
                if let Some(level) = level {
                    write!(f, " from L{}", level)?;
                }
                if self.terminate_requested {
                    write!(f, " [terminating]")?;
                }
            }
            None => write!(f, "idle")?,
        }
        write!(f, "  dispatches={} idle_polls={}", self.dispatches, self.idle_polls)
    }
}

impl fmt::Display for CoreTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in &self.cores {
            writeln!(f, "{}", slot)?;
        }
        writeln!(f, "{}", self.console)
    }
}
