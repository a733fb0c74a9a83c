//! Cap on concurrently running subprocesses.

use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Counting semaphore bounding how many subprocesses run at once.
///
/// Connection threads call [`ExecutionLimiter::acquire`] before spawning and
/// hold the returned permit until the subprocess has finished. Clones share
/// the same budget.
#[derive(Debug, Clone)]
pub struct ExecutionLimiter {
    state: Arc<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    capacity: usize,
    in_use: Mutex<usize>,
    released: Condvar,
}

impl ExecutionLimiter {
    /// Creates a limiter admitting `capacity` concurrent runs.
    ///
    /// A capacity of zero is raised to one so callers can never deadlock.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Arc::new(LimiterState {
                capacity: capacity.max(1),
                in_use: Mutex::new(0),
                released: Condvar::new(),
            }),
        }
    }

    /// Maximum number of concurrent runs.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    /// Number of permits currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        *self
            .state
            .in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a permit is available.
    pub fn acquire(&self) -> ExecutionPermit {
        let mut in_use = self
            .state
            .in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *in_use >= self.state.capacity {
            in_use = self
                .state
                .released
                .wait(in_use)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_use += 1;
        ExecutionPermit {
            state: Arc::clone(&self.state),
        }
    }

    /// Takes a permit only if one is free right now.
    #[must_use]
    pub fn try_acquire(&self) -> Option<ExecutionPermit> {
        let mut in_use = self
            .state
            .in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *in_use >= self.state.capacity {
            return None;
        }
        *in_use += 1;
        Some(ExecutionPermit {
            state: Arc::clone(&self.state),
        })
    }
}

/// Slot in the [`ExecutionLimiter`] budget, returned on drop.
#[derive(Debug)]
pub struct ExecutionPermit {
    state: Arc<LimiterState>,
}

impl Drop for ExecutionPermit {
    fn drop(&mut self) {
        let mut in_use = self
            .state
            .in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *in_use = in_use.saturating_sub(1);
        self.state.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn permits_are_returned_on_drop() {
        let limiter = ExecutionLimiter::new(2);
        let first = limiter.acquire();
        let second = limiter.acquire();
        assert_eq!(limiter.in_use(), 2);
        assert!(limiter.try_acquire().is_none());

        drop(first);
        assert_eq!(limiter.in_use(), 1);
        assert!(limiter.try_acquire().is_some());
        drop(second);
        assert_eq!(limiter.in_use(), 0);
    }

    #[rstest]
    fn zero_capacity_still_admits_one_run() {
        let limiter = ExecutionLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[rstest]
    fn acquire_blocks_until_a_permit_is_released() {
        let limiter = ExecutionLimiter::new(1);
        let held = limiter.acquire();
        let (sender, receiver) = mpsc::channel();

        let waiter = {
            let limiter = limiter.clone();
            thread::spawn(move || {
                let _permit = limiter.acquire();
                sender.send(()).expect("send acquisition");
            })
        };

        assert!(
            receiver.recv_timeout(Duration::from_millis(100)).is_err(),
            "second acquire should block while the permit is held"
        );
        drop(held);
        receiver
            .recv_timeout(Duration::from_secs(2))
            .expect("waiter should acquire after release");
        waiter.join().expect("join waiter");
    }
}
