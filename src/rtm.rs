//! The RTM atomic-context: the transactional-memory driver with its
//! non-transactional fallback lock.
//!
//! See spec §4.5 for the authoritative state machine; this module is a
//! direct transcription of it into an explicit `loop` + status match
//! (spec §9: "replace the source's label-based retry loop with an
//! explicit loop and a tagged status").

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::arch;
use crate::error::UnsupportedFeature;
use crate::locks::{RawLock, SystemMutex};

/// Transactional atomic-context with fallback-lock coordination.
///
/// Owns the fallback word (nonzero iff a fallback-path holder is
/// active), the fallback lock itself (any [`RawLock`], defaulting to
/// [`SystemMutex`]), and a monotonically nondecreasing capacity-abort
/// counter that is purely observational — nothing in [`RTMContext`]
/// branches on it.
///
/// `rtm_available()` is probed once at construction and cached: if RTM
/// is unsupported, `atomic` never executes `XBEGIN` and always takes
/// the fallback-lock path, so this type is safe to construct and use
/// unconditionally on any x86-64 CPU, and on any other architecture
/// (see [`crate::arch::generic`]).
pub struct RTMContext<L: RawLock = SystemMutex> {
    fallback_word: AtomicU32,
    fallback_lock: L,
    capacity_aborts: AtomicU64,
    rtm_supported: bool,
}

impl RTMContext<SystemMutex> {
    /// Create a context with the default fallback lock
    /// ([`SystemMutex`]). Always succeeds, on any hardware.
    #[inline]
    pub fn new() -> Self {
        Self::with_lock(SystemMutex::new())
    }
}

impl Default for RTMContext<SystemMutex> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<L: RawLock> RTMContext<L> {
    /// Create a context with a caller-supplied fallback lock. Always
    /// succeeds, on any hardware — see the type-level docs for why.
    #[inline]
    pub fn with_lock(lock: L) -> Self {
        Self {
            fallback_word: AtomicU32::new(0),
            fallback_lock: lock,
            capacity_aborts: AtomicU64::new(0),
            rtm_supported: arch::rtm_available(),
        }
    }

    /// Like [`RTMContext::with_lock`], but fails if this CPU does not
    /// support RTM rather than silently degrading to the fallback lock
    /// for every call.
    #[inline]
    pub fn try_with_lock_strict(lock: L) -> Result<Self, UnsupportedFeature> {
        if arch::rtm_available() {
            Ok(Self::with_lock(lock))
        } else {
            Err(UnsupportedFeature::Rtm)
        }
    }

    /// The number of times a transaction attempted by this context has
    /// aborted due to exceeding hardware transactional resources.
    /// Observational only; monotonically nondecreasing.
    #[inline]
    pub fn capacity_aborts(&self) -> u64 {
        self.capacity_aborts.load(Ordering::Relaxed)
    }

    /// Run `commiter` "as if" under a mutex, attempting a hardware
    /// transaction first. Exactly-once invocation, either path; the
    /// context never fails and never surfaces an error to the caller.
    ///
    /// `commiter` must be short, touch a bounded memory footprint, and
    /// must not allocate, call into the allocator, perform I/O, or
    /// otherwise reschedule — any of those force an unconditional
    /// hardware abort while speculating. This is a caller contract the
    /// type system cannot check (spec §4.5).
    pub fn atomic<F, R>(&self, commiter: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.rtm_supported {
            return self.fallback(commiter);
        }

        loop {
            // SAFETY: `rtm_supported` confirms RTM is available on
            // this CPU.
            let status = unsafe { arch::tx_begin() };

            if status == arch::STARTED {
                if self.fallback_word.load(Ordering::Relaxed) != 0 {
                    // A fallback holder is active: stepping aside now
                    // is cheaper than waiting inside a transaction,
                    // which would defeat the purpose of speculating at
                    // all. The hardware reports this as an EXPLICIT
                    // abort on the next `tx_begin`.
                    //
                    // SAFETY: a transaction is open (status == STARTED).
                    unsafe { arch::tx_abort() };
                    continue;
                }

                let result = commiter();
                // SAFETY: the transaction opened above is still live;
                // nothing between `tx_begin` and here aborted it.
                unsafe { arch::tx_end() };
                return result;
            }

            // `tx_begin` reports an abort-reason bitfield. Per spec
            // §9's resolved Open Question, only RETRY is auto-retried
            // here; CONFLICT (and the EXPLICIT abort we raise against
            // ourselves above) both fall through to FALLBACK, bounding
            // worst-case retry churn.
            if status & arch::RETRY != 0 {
                continue;
            }
            if status & arch::CAPACITY != 0 {
                self.capacity_aborts.fetch_add(1, Ordering::Relaxed);
            }
            return self.fallback(commiter);
        }
    }

    /// FALLBACK state of the §4.5 state machine: acquire the fallback
    /// lock, publish `fallback = 1` with a store-load fence so any
    /// concurrent transactional reader is guaranteed to observe it and
    /// abort, run the closure, then unpublish and release.
    fn fallback<F, R>(&self, commiter: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.fallback_lock.lock();
        let _release = FallbackRelease { ctx: self };
        arch::store_and_fence_32(&self.fallback_word);
        commiter()
    }
}

/// Resets the fallback word and releases the fallback lock on drop, so
/// both happen on every exit path from [`RTMContext::fallback`]
/// including an unwinding panic in `commiter` — spec §4.5 leaves the
/// post-panic memory state undefined, but the lock itself must not
/// leak held forever.
struct FallbackRelease<'a, L: RawLock> {
    ctx: &'a RTMContext<L>,
}

impl<L: RawLock> Drop for FallbackRelease<'_, L> {
    #[inline]
    fn drop(&mut self) {
        // Plain store is acceptable under the lock (spec §4.5).
        self.ctx.fallback_word.store(0, Ordering::Relaxed);
        self.ctx.fallback_lock.unlock();
    }
}
