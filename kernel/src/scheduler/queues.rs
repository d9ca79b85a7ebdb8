/*
 * Ready Queue Set
 *
 * The holding area for processes waiting to be dispatched. It has two
 * shapes:
 * - Single: one FIFO queue shared by FIFO, Round-Robin and Power-aware
 * - Leveled: MLFQ_LEVELS FIFO queues, level 0 being the highest priority
 *
 * The queue set only stores PIDs. It never duplicates a PID: callers push a
 * PID only after taking it out of a slot or creating it.
 */

use std::collections::VecDeque;

use super::{ProcessId, types::{LOWEST_LEVEL, MLFQ_LEVELS}};

#[derive(Debug, Clone)]
pub enum QueueSet {
    Single(VecDeque<ProcessId>),
    Leveled([VecDeque<ProcessId>; MLFQ_LEVELS]),
}

impl QueueSet {
    pub fn single() -> Self {
        QueueSet::Single(VecDeque::new())
    }

    pub fn leveled() -> Self {
        QueueSet::Leveled(Default::default())
    }

    /// Build an empty queue set shaped for a policy
    pub fn for_levels(leveled: bool) -> Self {
        if leveled { Self::leveled() } else { Self::single() }
    }

    /// Append a PID at the tail of a level
    ///
    /// The level is clamped to the lowest level and ignored in single mode.
    pub fn push(&mut self, pid: ProcessId, level: usize) {
        match self {
            QueueSet::Single(q) => q.push_back(pid),
            QueueSet::Leveled(levels) => levels[level.min(LOWEST_LEVEL)].push_back(pid),
        }
    }

    /// Pop the head of the highest-priority non-empty queue
    ///
    /// Returns the PID and the level it came from (None in single mode).
    pub fn pop_front(&mut self) -> Option<(ProcessId, Option<usize>)> {
        match self {
            QueueSet::Single(q) => q.pop_front().map(|pid| (pid, None)),
            QueueSet::Leveled(levels) => levels
                .iter_mut()
                .enumerate()
                .find_map(|(level, q)| q.pop_front().map(|pid| (pid, Some(level)))),
        }
    }

    /// Remove and return the first PID, in dispatch order, matching `pred`
    pub fn take_first<F>(&mut self, mut pred: F) -> Option<(ProcessId, Option<usize>)>
    where
        F: FnMut(ProcessId) -> bool,
    {
        match self {
            QueueSet::Single(q) => {
                let idx = q.iter().position(|&pid| pred(pid))?;
                q.remove(idx).map(|pid| (pid, None))
            }
            QueueSet::Leveled(levels) => {
                for (level, q) in levels.iter_mut().enumerate() {
                    if let Some(idx) = q.iter().position(|&pid| pred(pid)) {
                        return q.remove(idx).map(|pid| (pid, Some(level)));
                    }
                }
                None
            }
        }
    }

    /// Remove a PID wherever it is queued
    pub fn remove(&mut self, pid: ProcessId) -> bool {
        self.take_first(|p| p == pid).is_some()
    }

    pub fn contains(&self, pid: ProcessId) -> bool {
        self.iter().any(|p| p == pid)
    }

    /// Level a queued PID sits at (Some(0) for every PID in single mode)
    pub fn level_of(&self, pid: ProcessId) -> Option<usize> {
        match self {
            QueueSet::Single(q) => q.contains(&pid).then_some(0),
            QueueSet::Leveled(levels) => levels.iter().position(|q| q.contains(&pid)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            QueueSet::Single(q) => q.len(),
            QueueSet::Leveled(levels) => levels.iter().map(VecDeque::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every queued PID in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = ProcessId> + '_ {
        let queues: Vec<&VecDeque<ProcessId>> = match self {
            QueueSet::Single(q) => vec![q],
            QueueSet::Leveled(levels) => levels.iter().collect(),
        };
        queues.into_iter().flat_map(|q| q.iter().copied())
    }

    /// Copy of the queue contents, one Vec per level
    pub fn levels(&self) -> Vec<Vec<ProcessId>> {
        match self {
            QueueSet::Single(q) => vec![q.iter().copied().collect()],
            QueueSet::Leveled(levels) => levels
                .iter()
                .map(|q| q.iter().copied().collect())
                .collect(),
        }
    }

    /// Reshape the queue set, keeping every PID exactly once
    ///
    /// Single -> Leveled moves everything into level 0 in order.
    /// Leveled -> Single concatenates levels 0, 1, 2 in order.
    pub fn reshape(self, leveled: bool) -> Self {
        match (self, leveled) {
            (QueueSet::Single(q), true) => {
                let mut levels: [VecDeque<ProcessId>; MLFQ_LEVELS] = Default::default();
                levels[0] = q;
                QueueSet::Leveled(levels)
            }
            (QueueSet::Leveled(levels), false) => {
                QueueSet::Single(levels.into_iter().flatten().collect())
            }
            (same, _) => same,
        }
    }
}

impl Default for QueueSet {
    fn default() -> Self {
        Self::single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pids(ids: &[usize]) -> Vec<ProcessId> {
        ids.iter().map(|&i| ProcessId(i)).collect()
    }

    #[test]
    fn test_single_fifo_order() {
        let mut q = QueueSet::single();
        for i in 1..=3 {
            q.push(ProcessId(i), 0);
        }
        assert_eq!(q.pop_front(), Some((ProcessId(1), None)));
        assert_eq!(q.pop_front(), Some((ProcessId(2), None)));
        assert_eq!(q.pop_front(), Some((ProcessId(3), None)));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn test_leveled_scans_from_top() {
        let mut q = QueueSet::leveled();
        q.push(ProcessId(1), 2);
        q.push(ProcessId(2), 1);
        q.push(ProcessId(3), 7); // clamped to the lowest level

        assert_eq!(q.level_of(ProcessId(3)), Some(LOWEST_LEVEL));
        assert_eq!(q.pop_front(), Some((ProcessId(2), Some(1))));
        assert_eq!(q.pop_front(), Some((ProcessId(1), Some(2))));
        assert_eq!(q.pop_front(), Some((ProcessId(3), Some(2))));
    }

    #[test]
    fn test_take_first_keeps_order_of_rest() {
        let mut q = QueueSet::single();
        for i in 1..=4 {
            q.push(ProcessId(i), 0);
        }
        assert_eq!(q.take_first(|p| p.0 % 2 == 0), Some((ProcessId(2), None)));
        assert_eq!(q.levels(), vec![pids(&[1, 3, 4])]);
        assert!(q.take_first(|p| p.0 > 10).is_none());
    }

    #[test]
    fn test_reshape_preserves_every_pid_once() {
        let mut q = QueueSet::leveled();
        q.push(ProcessId(1), 0);
        q.push(ProcessId(2), 2);
        q.push(ProcessId(3), 1);

        let flat = q.reshape(false);
        assert_eq!(flat.levels(), vec![pids(&[1, 3, 2])]);

        let leveled = flat.reshape(true);
        assert_eq!(leveled.levels(), vec![pids(&[1, 3, 2]), vec![], vec![]]);
        assert_eq!(leveled.len(), 3);
    }

    #[test]
    fn test_remove() {
        let mut q = QueueSet::leveled();
        q.push(ProcessId(5), 1);
        assert!(q.contains(ProcessId(5)));
        assert!(q.remove(ProcessId(5)));
        assert!(!q.remove(ProcessId(5)));
        assert!(q.is_empty());
    }
}
