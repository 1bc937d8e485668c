//! Lock types: [`SpinMutex`], [`HLESpinMutex`], [`SystemMutex`].
//!
//! All three satisfy [`RawLock`], the small capability interface spec
//! §9 calls for in place of runtime polymorphism: [`LockedContext`] and
//! [`crate::rtm::RTMContext`]'s fallback lock are both generic over
//! `L: RawLock`, so the lock/unlock sequence monomorphizes inline
//! rather than going through a vtable.
//!
//! [`LockedContext`]: crate::context::LockedContext

use core::sync::atomic::{AtomicU32, Ordering};

use lock_api::RawMutex as _;

use crate::arch;
use crate::error::UnsupportedFeature;
use crate::spin;

/// Default spin budget before a production spin lock yields to the
/// scheduler once and retries. A performance tunable, not a
/// correctness knob — see spec §4.3.
pub const LOCK_ATTEMPTS: u32 = 200;

/// The capability every lock type in this crate provides: acquire and
/// release. Deliberately not `Sync`-bounded here — the concrete lock
/// types in this module are all auto-`Sync` already (their interior
/// mutability lives entirely behind `AtomicU32`/`parking_lot::RawMutex`);
/// a future `RawLock` backed by an `UnsafeCell` would need its own
/// `unsafe impl Sync` with a justifying comment, not this trait adding
/// the bound for it.
pub trait RawLock {
    /// Acquire the lock, blocking (by spinning or suspending,
    /// depending on the implementation) until it succeeds.
    fn lock(&self);
    /// Release the lock. Must only be called by the current holder.
    fn unlock(&self);
}

/// A racy, unsynchronized peek at whether a lock is currently held.
/// Spec §4.3: "used only by speculative code" — never rely on this for
/// correctness, only as a hint (e.g. to decide whether a transaction
/// should abort early rather than waiting).
pub trait IsLocked {
    /// Read the lock's held/free state without synchronizing with the
    /// holder. The result may already be stale by the time it is
    /// observed.
    fn is_locked(&self) -> bool;
}

/// A plain test-and-test-and-set spinlock with an attempt budget.
///
/// [`RawLock::lock`] spins for up to `attempts` tries; if the budget is
/// exhausted it yields to the scheduler once via
/// [`std::thread::yield_now`] and starts a fresh budget. This is the
/// "production" variant from spec §4.3: it prevents pathological
/// starvation when a holder has been descheduled, while keeping the
/// fast (uncontended) path a single exchange.
pub struct SpinMutex {
    word: AtomicU32,
    attempts: u32,
}

impl SpinMutex {
    /// Create an unlocked spin mutex with the default attempt budget
    /// ([`LOCK_ATTEMPTS`]).
    #[inline]
    pub const fn new() -> Self {
        Self::with_attempts(LOCK_ATTEMPTS)
    }

    /// Create an unlocked spin mutex with a custom attempt budget.
    /// `attempts` must be at least 1.
    #[inline]
    pub const fn with_attempts(attempts: u32) -> Self {
        Self {
            word: AtomicU32::new(0),
            attempts,
        }
    }
}

impl Default for SpinMutex {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl RawLock for SpinMutex {
    #[inline]
    fn lock(&self) {
        debug_assert!(self.attempts > 0, "SpinMutex attempt budget must be > 0");
        loop {
            let mut budget = self.attempts;
            spin::spin_count_lock(&self.word, &mut budget);
            if budget > 0 {
                return;
            }
            std::thread::yield_now();
        }
    }

    #[inline]
    fn unlock(&self) {
        // Release store: spec §9's open question resolves in favor of
        // an explicit release, not the source's unguarded plain store.
        self.word.store(0, Ordering::Release);
    }
}

impl IsLocked for SpinMutex {
    #[inline]
    fn is_locked(&self) -> bool {
        self.word.load(Ordering::Relaxed) != 0
    }
}

/// An HLE-elided spinlock with the same attempt-budget/yield policy as
/// [`SpinMutex`].
///
/// On hardware without HLE, the `XACQUIRE`/`XRELEASE` hint prefixes are
/// architecturally defined to be ignored, so this type is always
/// correct — it simply never elides, behaving exactly like
/// [`SpinMutex`]. [`HLESpinMutex::try_new_strict`] is available for
/// callers who want construction to fail instead.
pub struct HLESpinMutex {
    word: AtomicU32,
    attempts: u32,
}

impl HLESpinMutex {
    /// Create an unlocked HLE spin mutex with the default attempt
    /// budget ([`LOCK_ATTEMPTS`]). Always succeeds, even without HLE.
    #[inline]
    pub const fn new() -> Self {
        Self::with_attempts(LOCK_ATTEMPTS)
    }

    /// Create an unlocked HLE spin mutex with a custom attempt budget.
    #[inline]
    pub const fn with_attempts(attempts: u32) -> Self {
        Self {
            word: AtomicU32::new(0),
            attempts,
        }
    }

    /// Like [`HLESpinMutex::new`], but fails if this CPU does not
    /// support HLE rather than silently degrading to a plain spinlock.
    #[inline]
    pub fn try_new_strict() -> Result<Self, UnsupportedFeature> {
        if arch::hle_available() {
            Ok(Self::new())
        } else {
            Err(UnsupportedFeature::Hle)
        }
    }
}

impl Default for HLESpinMutex {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl RawLock for HLESpinMutex {
    #[inline]
    fn lock(&self) {
        debug_assert!(self.attempts > 0, "HLESpinMutex attempt budget must be > 0");
        loop {
            let mut budget = self.attempts;
            // SAFETY: release always goes through `unlock` below on the
            // same word, on the same thread, with no intervening
            // reschedule inside the spin helper.
            unsafe { spin::hle_spin_count_lock(&self.word, &mut budget) };
            if budget > 0 {
                return;
            }
            std::thread::yield_now();
        }
    }

    #[inline]
    fn unlock(&self) {
        // SAFETY: releases the word most recently acquired by `lock`.
        unsafe { arch::hle_store_zero_32(&self.word) };
    }
}

impl IsLocked for HLESpinMutex {
    #[inline]
    fn is_locked(&self) -> bool {
        self.word.load(Ordering::Relaxed) != 0
    }
}

/// A thin wrapper over the host OS mutex, exposing the same
/// [`RawLock`] capability as the spin-based types.
///
/// Built on [`parking_lot::RawMutex`] rather than `std::sync::Mutex`
/// because `RawLock` needs `lock`/`unlock` as independent calls with no
/// RAII guard threading the release back to the caller — exactly the
/// interface `parking_lot`'s `RawMutex` (via the `lock_api::RawMutex`
/// trait) already provides, and the same building block
/// `hybrid-lock`-style crates in this ecosystem use for the same
/// reason.
pub struct SystemMutex(parking_lot::RawMutex);

impl SystemMutex {
    /// Create a new, unlocked system mutex.
    #[inline]
    pub const fn new() -> Self {
        Self(parking_lot::RawMutex::INIT)
    }
}

impl Default for SystemMutex {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl RawLock for SystemMutex {
    #[inline]
    fn lock(&self) {
        self.0.lock();
    }

    #[inline]
    fn unlock(&self) {
        // SAFETY: called by the current holder, matching `lock` above.
        unsafe { self.0.unlock() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn spin_mutex_excludes_concurrent_increments() {
        let lock = Arc::new(SpinMutex::new());
        let counter = Arc::new(core::sync::atomic::AtomicU64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        lock.lock();
                        counter.fetch_add(1, Ordering::Relaxed);
                        lock.unlock();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 80_000);
    }

    #[test]
    fn hle_spin_mutex_excludes_concurrent_increments() {
        let lock = Arc::new(HLESpinMutex::new());
        let counter = Arc::new(core::sync::atomic::AtomicU64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        lock.lock();
                        counter.fetch_add(1, Ordering::Relaxed);
                        lock.unlock();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 80_000);
    }

    #[test]
    fn system_mutex_excludes_concurrent_increments() {
        let lock = Arc::new(SystemMutex::new());
        let counter = Arc::new(core::sync::atomic::AtomicU64::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        lock.lock();
                        counter.fetch_add(1, Ordering::Relaxed);
                        lock.unlock();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 80_000);
    }

    #[test]
    fn is_locked_reflects_held_state() {
        let lock = SpinMutex::new();
        assert!(!lock.is_locked());
        lock.lock();
        assert!(lock.is_locked());
        lock.unlock();
        assert!(!lock.is_locked());
    }
}
