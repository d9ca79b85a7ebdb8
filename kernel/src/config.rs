/*
 * Simulator Configuration
 *
 * All tunables of the simulated kernel live here, grouped per subsystem.
 * Defaults reproduce the classic teaching setup: one core, FIFO, a one
 * second quantum, MLFQ quanta of 1/2/4 ticks, and 8 frames of 1 KiB.
 *
 * The front end builds a SimConfig from its command line and hands it to
 * Kernel::boot(); nothing reads configuration from global state.
 */

use core::fmt;
use std::time::Duration;

use log::LevelFilter;

use crate::scheduler::{BatteryMode, MLFQ_LEVELS, PolicyKind, TimeSliceTicks};

/// Default upper bound on simulated cores
pub const DEFAULT_MAX_CORES: usize = 16;

/// Scheduler tunables
#[derive(Debug, Clone)]
pub struct SchedConfig {
    /// Number of simulated cores started by start_cores()
    pub cores: usize,

    /// Upper bound accepted by set_core_count()
    pub max_cores: usize,

    /// Wall-clock length of one simulated tick
    pub tick: Duration,

    /// Pause between worker loop iterations
    pub idle_pause: Duration,

    /// How long stop_cores() waits for each worker
    pub stop_timeout: Duration,

    /// Policy active at boot
    pub policy: PolicyKind,

    /// Quantum for FIFO and Power-aware dispatches
    pub default_quantum: TimeSliceTicks,

    /// Quantum for Round-Robin dispatches
    pub rr_quantum: TimeSliceTicks,

    /// Per-level MLFQ quanta, level 0 first
    pub mlfq_quanta: [TimeSliceTicks; MLFQ_LEVELS],

    /// Battery level below which the power-aware policy prefers low-power processes
    pub low_battery_threshold: u8,

    /// Where the power-aware policy reads the battery level from
    pub battery: BatteryMode,
}

impl SchedConfig {
    /// The longest quantum any policy can hand out
    pub fn longest_quantum(&self) -> TimeSliceTicks {
        self.mlfq_quanta
            .iter()
            .chain([&self.default_quantum, &self.rr_quantum])
            .copied()
            .max_by_key(|t| t.get())
            .unwrap_or(TimeSliceTicks::DEFAULT)
    }

    /// Wall-clock duration of a time slice
    pub fn slice_duration(&self, slice: TimeSliceTicks) -> Duration {
        self.tick * slice.get()
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        let tick = Duration::from_millis(500);
        Self {
            cores: 1,
            max_cores: DEFAULT_MAX_CORES,
            tick,
            idle_pause: Duration::from_millis(100),
            // Twice the longest MLFQ quantum
            stop_timeout: tick * 8,
            policy: PolicyKind::Fifo,
            default_quantum: TimeSliceTicks::DEFAULT,
            rr_quantum: TimeSliceTicks(2),
            mlfq_quanta: [TimeSliceTicks(1), TimeSliceTicks(2), TimeSliceTicks(4)],
            low_battery_threshold: 30,
            battery: BatteryMode::Simulated,
        }
    }
}

/// Memory manager tunables
#[derive(Debug, Clone, Copy)]
pub struct MemoryConfig {
    /// Number of physical frames
    pub num_frames: usize,

    /// Bytes per page and per frame
    pub page_size: u64,

    /// Maximum number of processes with a resident page table
    pub max_resident: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            num_frames: 8,
            page_size: 1024,
            max_resident: 4,
        }
    }
}

/// Complete simulator configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub sched: SchedConfig,
    pub memory: MemoryConfig,
    pub log_level: LevelFilter,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            sched: SchedConfig::default(),
            memory: MemoryConfig::default(),
            log_level: LevelFilter::Info,
        }
    }
}

/// A configuration value that cannot be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Cores { cores: usize, max: usize },
    ZeroTick,
    ZeroQuantum,
    Battery(u8),
    Threshold(u8),
    Memory(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Cores { cores, max } => {
                write!(f, "core count {} must be within 1..={}", cores, max)
            }
            ConfigError::ZeroTick => write!(f, "tick must be non-zero"),
            ConfigError::ZeroQuantum => write!(f, "quanta must be at least one tick"),
            ConfigError::Battery(level) => write!(f, "battery level {} must be within 1..=100", level),
            ConfigError::Threshold(t) => write!(f, "battery threshold {} must be within 1..=100", t),
            ConfigError::Memory(what) => write!(f, "memory {} must be non-zero", what),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SimConfig {
    /// Check every value before the kernel boots with it
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sched;
        if s.cores == 0 || s.cores > s.max_cores {
            return Err(ConfigError::Cores {
                cores: s.cores,
                max: s.max_cores,
            });
        }
        if s.tick.is_zero() {
            return Err(ConfigError::ZeroTick);
        }
        let quanta = s.mlfq_quanta.iter().chain([&s.default_quantum, &s.rr_quantum]);
        if quanta.into_iter().any(|q| q.get() == 0) {
            return Err(ConfigError::ZeroQuantum);
        }
        if let BatteryMode::Fixed(level) = s.battery {
            if !(1..=100).contains(&level) {
                return Err(ConfigError::Battery(level));
            }
        }
        if !(1..=100).contains(&s.low_battery_threshold) {
            return Err(ConfigError::Threshold(s.low_battery_threshold));
        }

        let m = &self.memory;
        if m.num_frames == 0 {
            return Err(ConfigError::Memory("frame count"));
        }
        if m.page_size == 0 {
            return Err(ConfigError::Memory("page size"));
        }
        if m.max_resident == 0 {
            return Err(ConfigError::Memory("resident limit"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.sched.longest_quantum(), TimeSliceTicks(4));
        assert_eq!(
            config.sched.slice_duration(TimeSliceTicks::DEFAULT),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = SimConfig::default();
        config.sched.cores = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Cores { .. })));

        let mut config = SimConfig::default();
        config.sched.battery = BatteryMode::Fixed(0);
        assert_eq!(config.validate(), Err(ConfigError::Battery(0)));

        let mut config = SimConfig::default();
        config.memory.page_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::Memory("page size")));

        let mut config = SimConfig::default();
        config.sched.rr_quantum = TimeSliceTicks(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroQuantum));
    }
}
