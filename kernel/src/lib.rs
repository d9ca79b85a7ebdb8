/*
 * SimOS Kernel Library
 *
 * A teaching operating system simulated in user space. The kernel is a
 * library: a front end (the simos-shell binary, or a test) builds a
 * SimConfig, boots a Kernel from it, and drives it through the KShell or
 * the subsystem APIs directly.
 *
 * Subsystems:
 * - scheduler: process table, FIFO/RR/MLFQ/Power-aware policies, one
 *   worker thread per simulated core
 * - memory: frames, per-process page tables, swap
 * - sync: bounded producer/consumer buffer
 * - fs: in-memory file system with users and permissions
 * - utils: logging backend and the shell
 *
 * The scheduler reports terminations to the memory manager through the
 * SchedObserver seam, so a terminated process never keeps its frames.
 * Lock order is scheduler before memory.
 */

use std::sync::Arc;

use spin::Mutex;

pub mod config;
pub mod fs;
pub mod memory;
pub mod scheduler;
pub mod sync;
pub mod utils;

#[cfg(test)]
mod tests;

use config::{ConfigError, SimConfig};
use fs::FileSystem;
use memory::MemoryManager;
use scheduler::ProcessManager;
use sync::BoundedBuffer;

/// Memory manager as shared with the scheduler's observer list
pub type SharedMemory = Arc<Mutex<MemoryManager>>;

/// Every subsystem of one simulated machine
pub struct Kernel {
    pub processes: ProcessManager,
    pub memory: SharedMemory,
    pub buffer: Arc<BoundedBuffer>,
    pub fs: FileSystem,
}

impl Kernel {
    /// Validate the configuration and bring up every subsystem
    ///
    /// Core workers are not started; call `processes.start_cores()`.
    pub fn boot(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let processes = ProcessManager::new(config.sched.clone());
        let memory: SharedMemory = Arc::new(Mutex::new(MemoryManager::new(config.memory)));
        processes.add_observer(memory.clone());

        log::info!(
            "Kernel booted: {} core(s), {} scheduler, {} frame(s) of {} bytes",
            config.sched.cores,
            config.sched.policy,
            config.memory.num_frames,
            config.memory.page_size
        );

        Ok(Self {
            processes,
            memory,
            buffer: Arc::new(BoundedBuffer::new()),
            fs: FileSystem::new(),
        })
    }
}
