/*
 * Memory Types
 *
 * This module defines the core memory types used throughout the memory
 * subsystem: page table entries and the owner record kept per frame.
 */

use core::fmt;

use crate::scheduler::ProcessId;

/// A page table entry: virtual page -> physical frame
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PageTableEntry {
    /// Virtual page number within the process
    pub page: usize,
    /// Physical frame number (stale while swapped out)
    pub frame: usize,
    /// Whether the mapping may be used for translation
    pub valid: bool,
}

impl PageTableEntry {
    pub fn new(page: usize, frame: usize) -> Self {
        Self {
            page,
            frame,
            valid: true,
        }
    }
}

/// Who is using a physical frame
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameOwner {
    pub pid: ProcessId,
    pub page: usize,
}

impl fmt::Display for FrameOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID {}, Page {}", self.pid, self.page)
    }
}
