/*
 * Memory Management
 *
 * Simulated paging with swap. Ties together:
 *  - The physical frame table (phys)
 *  - Per-process page tables (pid -> [PageTableEntry])
 *  - A swap area holding the page tables of swapped-out processes
 *
 * At most `max_resident` processes can have a page table in memory at once.
 * Every allocation (page table creation, swap-in) either gets all the frames
 * it needs or none.
 *
 * The memory manager listens to scheduler events: when a process is
 * terminated, its page table and swap image are released.
 */

pub mod phys;
pub mod types;

use core::fmt;
use std::collections::BTreeMap;

use spin::Mutex;

pub use phys::FrameTable;
pub use types::{FrameOwner, PageTableEntry};

use crate::config::MemoryConfig;
use crate::scheduler::{ProcessId, SchedEvent, SchedObserver};

/// Memory manager errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The resident process limit is reached
    MemoryFull,
    /// Not enough free frames for the request
    NoFreeFrames { needed: usize, free: usize },
    /// The PID already has a page table in memory
    AlreadyResident(ProcessId),
    /// The PID's page table is in the swap area
    SwappedOut(ProcessId),
    /// The PID has no page table in memory
    NoPageTable(ProcessId),
    /// The page is not mapped for the PID
    InvalidPage { pid: ProcessId, page: u64 },
    /// The PID is not in the swap area
    NotSwapped(ProcessId),
    /// A page table needs at least one page
    InvalidPageCount,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::MemoryFull => write!(f, "Memory full! Cannot allocate more processes"),
            MemoryError::NoFreeFrames { needed, free } => {
                write!(f, "No free frames available ({} needed, {} free)", needed, free)
            }
            MemoryError::AlreadyResident(pid) => write!(f, "PID {} already has a page table", pid),
            MemoryError::SwappedOut(pid) => write!(f, "PID {} is swapped out", pid),
            MemoryError::NoPageTable(pid) => write!(f, "No page table for PID {}", pid),
            MemoryError::InvalidPage { pid, page } => {
                write!(f, "Invalid page access: page {} of PID {}", page, pid)
            }
            MemoryError::NotSwapped(pid) => write!(f, "PID {} is not on disk", pid),
            MemoryError::InvalidPageCount => write!(f, "Page count must be at least 1"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Simulated memory manager
#[derive(Debug)]
pub struct MemoryManager {
    config: MemoryConfig,
    frames: FrameTable,
    /// Resident page tables
    page_tables: BTreeMap<ProcessId, Vec<PageTableEntry>>,
    /// Swapped-out page tables (simulated disk)
    swapped: BTreeMap<ProcessId, Vec<PageTableEntry>>,
}

impl MemoryManager {
    pub fn new(config: MemoryConfig) -> Self {
        log::info!(
            "Memory manager: {} frames of {} bytes, up to {} resident processes",
            config.num_frames,
            config.page_size,
            config.max_resident
        );
        Self {
            config,
            frames: FrameTable::new(config.num_frames),
            page_tables: BTreeMap::new(),
            swapped: BTreeMap::new(),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.config.page_size
    }

    fn ensure_capacity(&self, pages: usize) -> Result<(), MemoryError> {
        if self.page_tables.len() >= self.config.max_resident {
            return Err(MemoryError::MemoryFull);
        }
        let free = self.frames.free_count();
        if pages > free {
            return Err(MemoryError::NoFreeFrames { needed: pages, free });
        }
        Ok(())
    }

    /// Create a page table for `pid` with `pages` pages, allocating frames
    pub fn create_page_table(&mut self, pid: ProcessId, pages: usize) -> Result<(), MemoryError> {
        if pages == 0 {
            return Err(MemoryError::InvalidPageCount);
        }
        if self.page_tables.contains_key(&pid) {
            return Err(MemoryError::AlreadyResident(pid));
        }
        if self.swapped.contains_key(&pid) {
            return Err(MemoryError::SwappedOut(pid));
        }
        self.ensure_capacity(pages)?;

        let frames = self
            .frames
            .claim((0..pages).map(|page| FrameOwner { pid, page }))
            .ok_or(MemoryError::NoFreeFrames {
                needed: pages,
                free: self.frames.free_count(),
            })?;
        let table = frames
            .into_iter()
            .enumerate()
            .map(|(page, frame)| PageTableEntry::new(page, frame))
            .collect();
        self.page_tables.insert(pid, table);

        log::info!("Page table created for PID {} ({} pages)", pid, pages);
        Ok(())
    }

    /// Translate a virtual address of `pid` to a physical address
    pub fn translate(&self, pid: ProcessId, vaddr: u64) -> Result<u64, MemoryError> {
        let table = self
            .page_tables
            .get(&pid)
            .ok_or(MemoryError::NoPageTable(pid))?;

        let page = vaddr / self.config.page_size;
        let offset = vaddr % self.config.page_size;
        let entry = table
            .iter()
            .find(|e| e.page as u64 == page && e.valid)
            .ok_or(MemoryError::InvalidPage { pid, page })?;

        let physical = entry.frame as u64 * self.config.page_size + offset;
        log::debug!("PID {}: virtual {} -> physical {}", pid, vaddr, physical);
        Ok(physical)
    }

    /// Frame owners in frame order
    pub fn frames(&self) -> &[Option<FrameOwner>] {
        self.frames.frames()
    }

    /// Number of maximal runs of free frames
    pub fn fragment_count(&self) -> usize {
        self.frames.fragment_count()
    }

    pub fn page_table(&self, pid: ProcessId) -> Option<&[PageTableEntry]> {
        self.page_tables.get(&pid).map(Vec::as_slice)
    }

    pub fn is_swapped(&self, pid: ProcessId) -> bool {
        self.swapped.contains_key(&pid)
    }

    pub fn resident_count(&self) -> usize {
        self.page_tables.len()
    }

    /// Move `pid`'s page table to disk and free its frames
    pub fn swap_out(&mut self, pid: ProcessId) -> Result<(), MemoryError> {
        let table = self
            .page_tables
            .remove(&pid)
            .ok_or(MemoryError::NoPageTable(pid))?;
        for entry in &table {
            self.frames.free(entry.frame);
        }
        self.swapped.insert(pid, table);

        log::info!("Process {} swapped out to disk", pid);
        Ok(())
    }

    /// Bring `pid`'s page table back, assigning fresh frames
    pub fn swap_in(&mut self, pid: ProcessId) -> Result<(), MemoryError> {
        let pages = self
            .swapped
            .get(&pid)
            .map(Vec::len)
            .ok_or(MemoryError::NotSwapped(pid))?;
        self.ensure_capacity(pages)?;

        let Some(mut table) = self.swapped.remove(&pid) else {
            return Err(MemoryError::NotSwapped(pid));
        };
        let owners: Vec<FrameOwner> = table
            .iter()
            .map(|e| FrameOwner { pid, page: e.page })
            .collect();
        let Some(frames) = self.frames.claim(owners.into_iter()) else {
            let free = self.frames.free_count();
            self.swapped.insert(pid, table);
            return Err(MemoryError::NoFreeFrames { needed: pages, free });
        };
        for (entry, frame) in table.iter_mut().zip(frames) {
            entry.frame = frame;
        }
        self.page_tables.insert(pid, table);

        log::info!("Process {} swapped in from disk", pid);
        Ok(())
    }

    /// Drop everything held for `pid`; returns whether anything was held
    pub fn release(&mut self, pid: ProcessId) -> bool {
        let resident = self.page_tables.remove(&pid);
        if let Some(table) = &resident {
            for entry in table {
                self.frames.free(entry.frame);
            }
        }
        let swapped = self.swapped.remove(&pid);

        let released = resident.is_some() || swapped.is_some();
        if released {
            log::info!("Released memory of PID {}", pid);
        }
        released
    }
}

impl fmt::Display for MemoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames().iter().enumerate() {
            match frame {
                Some(owner) => writeln!(f, "Frame {}: {}", i, owner)?,
                None => writeln!(f, "Frame {}: Free", i)?,
            }
        }
        Ok(())
    }
}

/// Free a terminated process's memory
impl SchedObserver for Mutex<MemoryManager> {
    fn on_event(&self, event: &SchedEvent) {
        if let SchedEvent::ProcessTerminated { pid } = event {
            self.lock().release(*pid);
        }
    }
}
