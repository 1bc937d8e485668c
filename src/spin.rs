//! Spin-acquire loops: test-and-test-and-set, plain and HLE-elided,
//! unbounded and attempt-bounded.
//!
//! These are the primitives [`crate::locks`] builds its lock types on.
//! They operate directly on a caller-owned [`AtomicU32`] rather than
//! wrapping it in a type, matching the Lock/Unlock capability interface
//! [`crate::locks::RawLock`] dispatches to — see spec §9's "Polymorphism
//! over lock type" note.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::arch;

/// Poll `word` until it reads 0, then attempt the exchange; repeat on
/// failure. Never returns without the lock held — there is no bound on
/// how long this may spin if the current holder is descheduled.
///
/// The read-then-exchange shape (test-and-test-and-set) means a
/// contended waiter only *reads* the cache line while polling, and only
/// issues the coherence-invalidating exchange once it looks free.
#[inline]
pub fn spin_lock(word: &AtomicU32) {
    loop {
        while word.load(Ordering::Relaxed) != 0 {
            arch::pause();
        }
        if arch::xchg_set_32(word) == 0 {
            return;
        }
    }
}

/// Like [`spin_lock`] but gives up after `*attempts` tries. Decrements
/// `*attempts` once per attempt. On success returns with `*attempts` in
/// `[0, initial - 1]` and the word held; on failure returns with
/// `*attempts == 0` and the word untouched by this call — it never
/// acquires silently past the budget.
#[inline]
pub fn spin_count_lock(word: &AtomicU32, attempts: &mut u32) {
    while *attempts > 0 {
        *attempts -= 1;
        if word.load(Ordering::Relaxed) == 0 && arch::xchg_set_32(word) == 0 {
            return;
        }
        arch::pause();
    }
}

/// HLE-elided counterpart of [`spin_lock`]: the exchange carries the
/// `XACQUIRE` hint, so a successful acquisition may commit as a
/// speculative elision that never touches the cache line for real.
///
/// # Safety
///
/// See [`arch::hle_xchg_set_32`]: the matching release must go through
/// [`crate::locks::HLESpinMutex::unlock`] (or directly through
/// [`arch::hle_store_zero_32`]), and nothing between acquire and
/// release may reschedule the thread.
#[inline]
pub unsafe fn hle_spin_lock(word: &AtomicU32) {
    loop {
        while word.load(Ordering::Relaxed) != 0 {
            arch::pause();
        }
        if arch::hle_xchg_set_32(word) == 0 {
            return;
        }
    }
}

/// HLE-elided counterpart of [`spin_count_lock`]; same budget contract.
///
/// # Safety
///
/// Same obligations as [`hle_spin_lock`].
#[inline]
pub unsafe fn hle_spin_count_lock(word: &AtomicU32, attempts: &mut u32) {
    while *attempts > 0 {
        *attempts -= 1;
        if word.load(Ordering::Relaxed) == 0 && arch::hle_xchg_set_32(word) == 0 {
            return;
        }
        arch::pause();
    }
}
