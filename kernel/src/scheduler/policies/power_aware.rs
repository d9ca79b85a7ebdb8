/*
 * Power-Aware Scheduling Policy
 *
 * Reads a (simulated) battery level on every dispatch decision. While the
 * battery is below the threshold, the first queued process with the Low
 * power profile is preferred; if none is queued, or the battery is fine,
 * the policy behaves exactly like FIFO.
 *
 * The battery gauge is either re-rolled uniformly in 1..=100 per decision
 * or pinned to a fixed level so the low-battery branch can be exercised
 * deterministically.
 */

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::super::{
    PowerProfile, ProcessId,
    queues::QueueSet,
    traits::{KernelSchedCtx, Scheduler},
    types::{BatteryMode, DispatchDecision, PolicyKind, SlotId, TimeSliceTicks},
};

/// Where battery readings come from
#[derive(Debug)]
enum BatteryGauge {
    Simulated(StdRng),
    Fixed(u8),
}

impl BatteryGauge {
    fn from_mode(mode: BatteryMode) -> Self {
        match mode {
            BatteryMode::Simulated => BatteryGauge::Simulated(StdRng::from_entropy()),
            BatteryMode::Fixed(level) => BatteryGauge::Fixed(level.clamp(1, 100)),
        }
    }

    fn read(&mut self) -> u8 {
        match self {
            BatteryGauge::Simulated(rng) => rng.gen_range(1..=100),
            BatteryGauge::Fixed(level) => *level,
        }
    }
}

/// Power-aware scheduling policy
pub struct PowerAwarePolicy {
    quantum: TimeSliceTicks,
    /// Battery level strictly below which Low processes are preferred
    threshold: u8,
    gauge: BatteryGauge,
    /// Level seen by the most recent dispatch decision
    last_reading: Option<u8>,
}

impl PowerAwarePolicy {
    pub fn new(quantum: TimeSliceTicks, threshold: u8, battery: BatteryMode) -> Self {
        Self {
            quantum,
            threshold,
            gauge: BatteryGauge::from_mode(battery),
            last_reading: None,
        }
    }

    /// Replace the battery source
    pub fn set_battery(&mut self, battery: BatteryMode) {
        self.gauge = BatteryGauge::from_mode(battery);
    }

    /// Seed the simulated gauge, for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        if let BatteryGauge::Simulated(_) = self.gauge {
            self.gauge = BatteryGauge::Simulated(StdRng::seed_from_u64(seed));
        }
        self
    }

    pub fn last_reading(&self) -> Option<u8> {
        self.last_reading
    }
}

impl Scheduler for PowerAwarePolicy {
    fn pick_next(
        &mut self,
        queues: &mut QueueSet,
        ctx: &dyn KernelSchedCtx,
        slot: SlotId,
    ) -> DispatchDecision {
        if queues.is_empty() {
            return DispatchDecision::idle();
        }

        let battery = self.gauge.read();
        self.last_reading = Some(battery);

        if battery < self.threshold {
            let low = queues.take_first(|pid| ctx.power_profile(pid) == Some(PowerProfile::Low));
            if let Some((pid, _)) = low {
                log::debug!(
                    "[Power] {}: battery {}% < {}%, picked low-power PID {}",
                    slot,
                    battery,
                    self.threshold,
                    pid
                );
                return DispatchDecision::run_process(pid, self.quantum);
            }
            log::debug!("[Power] {}: battery {}% low but no low-power process queued", slot, battery);
        }

        match queues.pop_front() {
            Some((pid, _)) => DispatchDecision::run_process(pid, self.quantum),
            None => DispatchDecision::idle(),
        }
    }

    fn requeue(&mut self, queues: &mut QueueSet, pid: ProcessId, _from_level: Option<usize>) {
        queues.push(pid, 0);
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::PowerAware
    }

    fn name(&self) -> &'static str {
        "Power-aware"
    }
}
