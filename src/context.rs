//! The locked atomic-context: the simplest of the two
//! [`AtomicContext`](crate::AtomicContext)-shaped entry points.

use crate::locks::RawLock;

/// Binds to any [`RawLock`]-satisfying lock and runs a closure under
/// it exactly once per [`LockedContext::atomic`] call.
///
/// Release happens on every exit path, including an unwinding panic,
/// because it is driven by an RAII guard rather than code that runs
/// only after a normal return. Recursive `atomic` calls on the same
/// context are not supported — spec §4.4 leaves that behavior
/// undefined, and a spin-based lock would simply deadlock.
pub struct LockedContext<L: RawLock> {
    lock: L,
}

impl<L: RawLock> LockedContext<L> {
    /// Bind a new context to `lock`.
    #[inline]
    pub fn new(lock: L) -> Self {
        Self { lock }
    }

    /// Acquire the lock, run `commiter` exactly once, then release —
    /// even if `commiter` panics.
    #[inline]
    pub fn atomic<F, R>(&self, commiter: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.lock.lock();
        let _release = ReleaseOnDrop { lock: &self.lock };
        commiter()
    }
}

struct ReleaseOnDrop<'a, L: RawLock> {
    lock: &'a L,
}

impl<L: RawLock> Drop for ReleaseOnDrop<'_, L> {
    #[inline]
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locks::{HLESpinMutex, SystemMutex};
    use std::sync::Arc;
    use std::thread;

    /// Scaled-down version of spec §8 scenario 1: eight threads each
    /// bump a random slot of a shared array through one
    /// `LockedContext`; the slots must sum to the total increment
    /// count regardless of interleaving.
    fn mutex_correctness<L: RawLock + Send + Sync + 'static>(lock: L) {
        const THREADS: usize = 8;
        const ITERATIONS: usize = 20_000;
        const ARRAY_LEN: usize = 100;

        let ctx = Arc::new(LockedContext::new(lock));
        let arr: Arc<Vec<std::sync::atomic::AtomicU64>> = Arc::new(
            (0..ARRAY_LEN)
                .map(|_| std::sync::atomic::AtomicU64::new(0))
                .collect(),
        );

        let handles: Vec<_> = (0..THREADS)
            .map(|seed| {
                let ctx = ctx.clone();
                let arr = arr.clone();
                thread::spawn(move || {
                    let mut state = seed as u64 + 1;
                    for _ in 0..ITERATIONS {
                        // xorshift, no allocation, good enough for
                        // index scatter in a test.
                        state ^= state << 13;
                        state ^= state >> 7;
                        state ^= state << 17;
                        let index = (state as usize) % ARRAY_LEN;
                        ctx.atomic(|| {
                            arr[index].fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        });
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let sum: u64 = arr.iter().map(|c| c.load(std::sync::atomic::Ordering::Relaxed)).sum();
        assert_eq!(sum, (THREADS * ITERATIONS) as u64);
    }

    #[test]
    fn mutex_correctness_system_mutex() {
        mutex_correctness(SystemMutex::new());
    }

    #[test]
    fn mutex_correctness_hle_spin_mutex() {
        mutex_correctness(HLESpinMutex::new());
    }

    #[test]
    fn release_runs_even_if_commiter_panics() {
        use crate::locks::SpinMutex;

        let ctx = LockedContext::new(SpinMutex::new());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ctx.atomic(|| panic!("boom"));
        }));
        assert!(result.is_err());

        // If the release guard did not run, this would deadlock.
        ctx.atomic(|| {});
    }
}
