/*
 * Producer/Consumer Buffer
 *
 * The classic bounded-buffer demonstration. Producers append item names
 * ("item1", "item2", ...) until the buffer holds BUFFER_CAPACITY items;
 * consumers take them in FIFO order.
 *
 * Two flavors of each operation:
 * - try_produce / try_consume: report Full / Empty immediately
 * - produce_timeout / consume_timeout: block on a condition variable until
 *   space or an item appears, or the timeout elapses
 *
 * The buffer storage is a fixed-capacity heapless::Deque guarded by a real
 * mutex; `not_full` and `not_empty` are the two condition variables.
 */

use core::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use heapless::Deque;

/// Number of items the buffer holds
pub const BUFFER_CAPACITY: usize = 3;

/// Bounded buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// No room for another item
    Full,
    /// Nothing to consume
    Empty,
    /// The blocking wait ran out
    Timeout,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferError::Full => write!(f, "Buffer full"),
            BufferError::Empty => write!(f, "Buffer empty"),
            BufferError::Timeout => write!(f, "Timed out waiting on the buffer"),
        }
    }
}

impl std::error::Error for BufferError {}

#[derive(Debug)]
struct BufferState {
    items: Deque<String, BUFFER_CAPACITY>,
    /// Number of items ever produced; names the next item
    produced: u64,
}

impl BufferState {
    fn push_next(&mut self) -> Result<String, BufferError> {
        let name = format!("item{}", self.produced + 1);
        self.items
            .push_back(name.clone())
            .map_err(|_| BufferError::Full)?;
        self.produced += 1;
        Ok(name)
    }
}

/// Bounded producer/consumer buffer
#[derive(Debug)]
pub struct BoundedBuffer {
    state: Mutex<BufferState>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl BoundedBuffer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BufferState {
                items: Deque::new(),
                produced: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        // Nothing panics while holding the lock; recover the data regardless
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Produce one item if there is room
    pub fn try_produce(&self) -> Result<String, BufferError> {
        let item = self.lock().push_next()?;
        self.not_empty.notify_one();
        log::info!("[Producer] Produced {}", item);
        Ok(item)
    }

    /// Consume the oldest item if there is one
    pub fn try_consume(&self) -> Result<String, BufferError> {
        let item = self.lock().items.pop_front().ok_or(BufferError::Empty)?;
        self.not_full.notify_one();
        log::info!("[Consumer] Consumed {}", item);
        Ok(item)
    }

    /// Produce one item, waiting up to `timeout` for room
    pub fn produce_timeout(&self, timeout: Duration) -> Result<String, BufferError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while state.items.is_full() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BufferError::Timeout);
            }
            state = match self.not_full.wait_timeout(state, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        let item = state.push_next()?;
        drop(state);

        self.not_empty.notify_one();
        log::info!("[Producer] Produced {}", item);
        Ok(item)
    }

    /// Consume one item, waiting up to `timeout` for one to appear
    pub fn consume_timeout(&self, timeout: Duration) -> Result<String, BufferError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                log::info!("[Consumer] Consumed {}", item);
                return Ok(item);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BufferError::Timeout);
            }
            state = match self.not_empty.wait_timeout(state, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    /// Copy of the buffered items, oldest first
    pub fn contents(&self) -> Vec<String> {
        self.lock().items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BoundedBuffer {
    fn default() -> Self {
        Self::new()
    }
}
