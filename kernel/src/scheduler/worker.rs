/*
 * Core Workers
 *
 * One OS thread per simulated core. Each worker loops:
 *
 *   check stop token -> lock, dispatch onto its slot, unlock
 *     -> idle: pause briefly and retry
 *     -> dispatched: spend the quantum (tick * timeslice) outside the lock,
 *        then lock and complete the slot (requeue or remove)
 *
 * Shutdown is cooperative. The manager holds a StopSignal; dropping it
 * disconnects the channel every StopToken listens on, which wakes pausing
 * workers at once. A worker that is stopped mid-quantum still completes its
 * slot, so no process is ever left behind in a stopped core.
 *
 * Each worker reports its exit on a private done channel, from a drop guard
 * so a panicking worker reports too. The manager waits on those channels
 * with a bound instead of joining blindly.
 */

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use super::{
    sched_core::{DispatchOutcome, SharedCore},
    types::{CpuId, SlotId},
};

/// Owner side of the stop channel; dropping it stops every worker
#[derive(Debug)]
pub struct StopSignal {
    _tx: Sender<()>,
}

/// Worker side of the stop channel
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: Receiver<()>,
}

/// Create a connected signal/token pair
pub fn stop_channel() -> (StopSignal, StopToken) {
    let (tx, rx) = crossbeam_channel::bounded(0);
    (StopSignal { _tx: tx }, StopToken { rx })
}

impl StopSignal {
    /// Signal every token
    pub fn stop(self) {
        drop(self);
    }
}

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for up to `duration`, returning early (true) when stopped
    pub fn pause(&self, duration: Duration) -> bool {
        matches!(
            self.rx.recv_timeout(duration),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// Timing parameters for a worker loop
#[derive(Debug, Clone, Copy)]
pub struct WorkerTiming {
    /// Wall-clock length of one tick
    pub tick: Duration,
    /// Pause after an idle poll
    pub idle_pause: Duration,
}

/// Sends on the done channel when the worker thread unwinds or returns
struct DoneGuard(Sender<()>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// Handle to one running core worker
#[derive(Debug)]
pub struct CoreWorker {
    cpu: CpuId,
    handle: Option<JoinHandle<()>>,
    done: Receiver<()>,
}

impl CoreWorker {
    /// Spawn the worker thread for `cpu`
    pub fn spawn(
        cpu: CpuId,
        core: SharedCore,
        token: StopToken,
        timing: WorkerTiming,
    ) -> std::io::Result<Self> {
        let (done_tx, done) = crossbeam_channel::bounded(1);
        let handle = thread::Builder::new()
            .name(format!("core-{}", cpu.0))
            .spawn(move || {
                let _guard = DoneGuard(done_tx);
                run(cpu, &core, &token, timing);
            })?;

        Ok(Self {
            cpu,
            handle: Some(handle),
            done,
        })
    }

    pub fn cpu(&self) -> CpuId {
        self.cpu
    }

    /// Wait up to `timeout` for the worker to exit
    ///
    /// Returns false if it is still running; the worker stays joinable and
    /// can be waited on again.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        log::error!("[{}] Worker panicked", self.cpu);
                    }
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

/// The worker loop for one core
fn run(cpu: CpuId, core: &SharedCore, token: &StopToken, timing: WorkerTiming) {
    let slot = SlotId::Core(cpu);
    log::info!("[{}] Worker started", cpu);

    while !token.is_stopped() {
        let outcome = core.lock().dispatch(slot);
        match outcome {
            DispatchOutcome::Idle => {
                token.pause(timing.idle_pause);
            }
            DispatchOutcome::Dispatched(running) => {
                // Simulated CPU work; a stop request cuts it short
                token.pause(timing.tick * running.timeslice.get());
                core.lock().complete(slot);
            }
        }
    }

    log::info!("[{}] Worker stopped", cpu);
}
