/*
 * Scheduling Policies Module
 *
 * This module contains the scheduling policy implementations.
 * Each policy implements the Scheduler trait and is plugged into the
 * SchedulerCore through ActivePolicy, which can be swapped at runtime.
 *
 * Available policies:
 * - Fifo: Dispatch in arrival order
 * - RoundRobin: Rotate through the ready queue with a fixed quantum
 * - Mlfq: Three-level multi-level feedback queue with demotion
 * - PowerAware: Prefer low-power processes while the battery is low
 */

pub mod fifo;
pub mod mlfq;
pub mod power_aware;
pub mod round_robin;

pub use fifo::FifoPolicy;
pub use mlfq::MlfqPolicy;
pub use power_aware::PowerAwarePolicy;
pub use round_robin::RoundRobinPolicy;

use crate::config::SchedConfig;

use super::{
    ProcessId,
    queues::QueueSet,
    traits::{KernelSchedCtx, Scheduler},
    types::{DispatchDecision, PolicyKind, SlotId},
};

/// The policy currently plugged into the scheduler core
///
/// A closed set: the manager switches between these four by name, so an
/// enum is simpler than a boxed trait object and keeps the concrete policy
/// reachable for configuration (battery mode, statistics).
pub enum ActivePolicy {
    Fifo(FifoPolicy),
    RoundRobin(RoundRobinPolicy),
    Mlfq(MlfqPolicy),
    PowerAware(PowerAwarePolicy),
}

impl ActivePolicy {
    /// Build a fresh policy of `kind` configured from `config`
    pub fn new(kind: PolicyKind, config: &SchedConfig) -> Self {
        match kind {
            PolicyKind::Fifo => ActivePolicy::Fifo(FifoPolicy::new(config.default_quantum)),
            PolicyKind::RoundRobin => {
                ActivePolicy::RoundRobin(RoundRobinPolicy::new(config.rr_quantum))
            }
            PolicyKind::Mlfq => ActivePolicy::Mlfq(MlfqPolicy::new(config.mlfq_quanta)),
            PolicyKind::PowerAware => ActivePolicy::PowerAware(PowerAwarePolicy::new(
                config.default_quantum,
                config.low_battery_threshold,
                config.battery,
            )),
        }
    }

    fn inner(&self) -> &dyn Scheduler {
        match self {
            ActivePolicy::Fifo(p) => p,
            ActivePolicy::RoundRobin(p) => p,
            ActivePolicy::Mlfq(p) => p,
            ActivePolicy::PowerAware(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Scheduler {
        match self {
            ActivePolicy::Fifo(p) => p,
            ActivePolicy::RoundRobin(p) => p,
            ActivePolicy::Mlfq(p) => p,
            ActivePolicy::PowerAware(p) => p,
        }
    }

    /// The power-aware policy, if it is the active one
    pub fn power_aware_mut(&mut self) -> Option<&mut PowerAwarePolicy> {
        match self {
            ActivePolicy::PowerAware(p) => Some(p),
            _ => None,
        }
    }
}

impl Scheduler for ActivePolicy {
    fn pick_next(
        &mut self,
        queues: &mut QueueSet,
        ctx: &dyn KernelSchedCtx,
        slot: SlotId,
    ) -> DispatchDecision {
        self.inner_mut().pick_next(queues, ctx, slot)
    }

    fn requeue(&mut self, queues: &mut QueueSet, pid: ProcessId, from_level: Option<usize>) {
        self.inner_mut().requeue(queues, pid, from_level)
    }

    fn admit(&mut self, queues: &mut QueueSet, pid: ProcessId) {
        self.inner_mut().admit(queues, pid)
    }

    fn kind(&self) -> PolicyKind {
        self.inner().kind()
    }

    fn name(&self) -> &'static str {
        self.inner().name()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::scheduler::{BatteryMode, PowerProfile, TimeSliceTicks};

    /// Minimal process table for driving policies directly
    #[derive(Default)]
    struct TestCtx {
        profiles: BTreeMap<ProcessId, PowerProfile>,
    }

    impl TestCtx {
        fn with(procs: &[(usize, PowerProfile)]) -> Self {
            Self {
                profiles: procs.iter().map(|&(id, p)| (ProcessId(id), p)).collect(),
            }
        }
    }

    impl KernelSchedCtx for TestCtx {
        fn power_profile(&self, pid: ProcessId) -> Option<PowerProfile> {
            self.profiles.get(&pid).copied()
        }
    }

    fn admit_all(policy: &mut dyn Scheduler, queues: &mut QueueSet, ids: &[usize]) {
        for &id in ids {
            policy.admit(queues, ProcessId(id));
        }
    }

    const CONSOLE: SlotId = SlotId::Console;

    #[test]
    fn test_fifo_dispatches_in_arrival_order() {
        let ctx = TestCtx::with(&[(1, PowerProfile::High), (2, PowerProfile::Low)]);
        let mut policy = FifoPolicy::default();
        let mut queues = QueueSet::single();
        admit_all(&mut policy, &mut queues, &[1, 2]);

        let d = policy.pick_next(&mut queues, &ctx, CONSOLE);
        assert_eq!(d.next, Some(ProcessId(1)));
        assert_eq!(d.timeslice, TimeSliceTicks::DEFAULT);
        assert!(!queues.contains(ProcessId(1)));

        policy.requeue(&mut queues, ProcessId(1), None);
        assert_eq!(queues.levels(), vec![vec![ProcessId(2), ProcessId(1)]]);
    }

    #[test]
    fn test_round_robin_rotates() {
        let ctx = TestCtx::with(&[(1, PowerProfile::Low), (2, PowerProfile::Low)]);
        let mut policy = RoundRobinPolicy::new(TimeSliceTicks(3));
        let mut queues = QueueSet::single();
        admit_all(&mut policy, &mut queues, &[1, 2]);

        let mut order = Vec::new();
        for _ in 0..4 {
            let d = policy.pick_next(&mut queues, &ctx, CONSOLE);
            let pid = d.next.unwrap();
            assert_eq!(d.timeslice, TimeSliceTicks(3));
            order.push(pid.0);
            policy.requeue(&mut queues, pid, d.level);
        }
        assert_eq!(order, vec![1, 2, 1, 2]);
        assert_eq!(policy.rotations(), 4);
    }

    #[test]
    fn test_mlfq_demotes_to_lowest_level() {
        let ctx = TestCtx::with(&[(1, PowerProfile::Medium)]);
        let mut policy = MlfqPolicy::default();
        let mut queues = QueueSet::leveled();
        admit_all(&mut policy, &mut queues, &[1]);

        let mut seen = Vec::new();
        for _ in 0..4 {
            let d = policy.pick_next(&mut queues, &ctx, CONSOLE);
            seen.push((d.level, d.timeslice.get()));
            policy.requeue(&mut queues, ProcessId(1), d.level);
        }
        assert_eq!(
            seen,
            vec![(Some(0), 1), (Some(1), 2), (Some(2), 4), (Some(2), 4)]
        );
    }

    #[test]
    fn test_mlfq_prefers_higher_levels() {
        let ctx = TestCtx::with(&[(1, PowerProfile::Low), (2, PowerProfile::Low)]);
        let mut policy = MlfqPolicy::default();
        let mut queues = QueueSet::leveled();
        queues.push(ProcessId(1), 2);
        queues.push(ProcessId(2), 1);

        let d = policy.pick_next(&mut queues, &ctx, CONSOLE);
        assert_eq!((d.next, d.level), (Some(ProcessId(2)), Some(1)));
        assert_eq!(MlfqPolicy::demoted(None), 0);
    }

    #[test]
    fn test_power_aware_prefers_low_when_battery_low() {
        let ctx = TestCtx::with(&[
            (1, PowerProfile::High),
            (2, PowerProfile::Medium),
            (3, PowerProfile::Low),
        ]);
        let mut policy = PowerAwarePolicy::new(TimeSliceTicks::DEFAULT, 30, BatteryMode::Fixed(10));
        let mut queues = QueueSet::single();
        admit_all(&mut policy, &mut queues, &[1, 2, 3]);

        assert_eq!(policy.pick_next(&mut queues, &ctx, CONSOLE).next, Some(ProcessId(3)));
        assert_eq!(policy.last_reading(), Some(10));

        // No low-power process left: plain FIFO
        assert_eq!(policy.pick_next(&mut queues, &ctx, CONSOLE).next, Some(ProcessId(1)));
    }

    #[test]
    fn test_power_aware_behaves_like_fifo_when_charged() {
        let ctx = TestCtx::with(&[(1, PowerProfile::High), (2, PowerProfile::Low)]);
        let mut policy = PowerAwarePolicy::new(TimeSliceTicks::DEFAULT, 30, BatteryMode::Fixed(80));
        let mut queues = QueueSet::single();
        admit_all(&mut policy, &mut queues, &[1, 2]);

        assert_eq!(policy.pick_next(&mut queues, &ctx, CONSOLE).next, Some(ProcessId(1)));

        policy.set_battery(BatteryMode::Fixed(30));
        // Threshold is strict: 30 is not below 30
        assert_eq!(policy.pick_next(&mut queues, &ctx, CONSOLE).next, Some(ProcessId(2)));
    }

    #[test]
    fn test_power_aware_simulated_readings_in_range() {
        let ctx = TestCtx::with(&[(1, PowerProfile::High)]);
        let mut policy = PowerAwarePolicy::new(TimeSliceTicks::DEFAULT, 30, BatteryMode::Simulated)
            .with_seed(7);
        let mut queues = QueueSet::single();
        for _ in 0..50 {
            policy.admit(&mut queues, ProcessId(1));
            assert_eq!(policy.pick_next(&mut queues, &ctx, CONSOLE).next, Some(ProcessId(1)));
            let reading = policy.last_reading().unwrap();
            assert!((1..=100).contains(&reading));
        }
    }

    #[test]
    fn test_active_policy_delegates() {
        let config = SchedConfig::default();
        for kind in PolicyKind::ALL {
            let policy = ActivePolicy::new(kind, &config);
            assert_eq!(policy.kind(), kind);
        }
        let mut policy = ActivePolicy::new(PolicyKind::PowerAware, &config);
        assert!(policy.power_aware_mut().is_some());
        assert_eq!(policy.name(), "Power-aware");
    }
}
