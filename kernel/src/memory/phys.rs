/*
 * Physical Frame Table
 *
 * Fixed-size table of simulated physical frames. Each frame is either free
 * or owned by one (pid, page) pair. Allocation is first-fit from frame 0,
 * and callers reserve a whole batch at once so a failed request never
 * leaves frames half allocated.
 */

use super::types::FrameOwner;

/// Simulated physical memory
#[derive(Debug, Clone)]
pub struct FrameTable {
    frames: Vec<Option<FrameOwner>>,
}

impl FrameTable {
    /// Create a table of `count` free frames
    pub fn new(count: usize) -> Self {
        Self {
            frames: vec![None; count],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Find the lowest free frame
    pub fn find_free(&self) -> Option<usize> {
        self.frames.iter().position(Option::is_none)
    }

    pub fn free_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_none()).count()
    }

    /// Claim the first `count` free frames, or none at all
    ///
    /// The owners are assigned in order; returns the frame numbers.
    pub fn claim<I>(&mut self, owners: I) -> Option<Vec<usize>>
    where
        I: ExactSizeIterator<Item = FrameOwner>,
    {
        if owners.len() > self.free_count() {
            return None;
        }

        let mut claimed = Vec::with_capacity(owners.len());
        for owner in owners {
            // Enough frames were checked above
            let frame = self.find_free()?;
            self.frames[frame] = Some(owner);
            claimed.push(frame);
        }
        Some(claimed)
    }

    /// Free a frame
    pub fn free(&mut self, frame: usize) {
        if let Some(slot) = self.frames.get_mut(frame) {
            *slot = None;
        }
    }

    /// Owner of every frame, in frame order
    pub fn frames(&self) -> &[Option<FrameOwner>] {
        &self.frames
    }

    /// Number of maximal runs of consecutive free frames
    pub fn fragment_count(&self) -> usize {
        let mut fragments = 0;
        let mut in_fragment = false;
        for frame in &self.frames {
            match frame {
                None if !in_fragment => {
                    fragments += 1;
                    in_fragment = true;
                }
                None => {}
                Some(_) => in_fragment = false,
            }
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ProcessId;

    fn owners(pid: usize, pages: usize) -> impl ExactSizeIterator<Item = FrameOwner> {
        (0..pages).map(move |page| FrameOwner {
            pid: ProcessId(pid),
            page,
        })
    }

    #[test]
    fn test_claim_is_all_or_nothing() {
        let mut table = FrameTable::new(4);
        assert_eq!(table.claim(owners(1, 3)), Some(vec![0, 1, 2]));
        assert_eq!(table.claim(owners(2, 2)), None);
        assert_eq!(table.free_count(), 1);
    }

    #[test]
    fn test_fragment_count() {
        let mut table = FrameTable::new(6);
        assert_eq!(table.fragment_count(), 1);

        table.claim(owners(1, 6));
        assert_eq!(table.fragment_count(), 0);

        table.free(0);
        table.free(2);
        table.free(3);
        table.free(5);
        // [free, used, free, free, used, free]
        assert_eq!(table.fragment_count(), 3);
        assert_eq!(table.find_free(), Some(0));
    }
}
