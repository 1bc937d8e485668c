//! # atomex
//!
//! Mutual-exclusion primitives for x86-64 that let a caller run a short
//! user-supplied critical section "atomically" with respect to other
//! concurrent invocations, trying the cheapest available hardware
//! mechanism first: Hardware Lock Elision (HLE), then Restricted
//! Transactional Memory (RTM), falling back to a plain spinlock or the
//! host OS mutex when the hardware doesn't support either.
//!
//! A caller picks exactly one [`AtomicContext`] — a [`LockedContext`]
//! bound to a lock, or an [`RTMContext`] bound to a fallback lock — and
//! repeatedly submits a zero-argument closure to `atomic`. Every
//! invocation appears atomic with respect to every other invocation on
//! the same context; the library never surfaces an error to the
//! caller, and runs the closure exactly once per call regardless of
//! which underlying mechanism handled it.
//!
//! ## Module organization
//!
//! ### Foundation
//! - [`arch`] — CPU primitives: pause, lock-prefixed exchange, HLE hint
//!   prefixes, RTM transaction control, and capability detection.
//! - [`error`] — the one fallible path in the crate: strict,
//!   fail-at-construction variants of the hardware-gated types.
//!
//! ### Spin loops and lock types
//! - [`spin`] — bounded and unbounded test-and-test-and-set spin
//!   acquire, plain and HLE-elided.
//! - [`locks`] — [`locks::SpinMutex`], [`locks::HLESpinMutex`], and
//!   [`locks::SystemMutex`], all implementing the shared
//!   [`locks::RawLock`] capability.
//!
//! ### Atomic contexts
//! - [`context`] — [`LockedContext`], the lock-backed atomic context.
//! - [`rtm`] — [`RTMContext`], the transactional atomic context with
//!   fallback-lock coordination.
//!
//! Deliberately out of scope: condition variables, reader/writer
//! locks, fair queueing, priority inheritance, non-x86 portability
//! beyond graceful degradation, and lock-free data structures. These
//! primitives are unfair and spin-based by design, targeting very
//! short critical sections.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod arch;
pub mod context;
pub mod error;
pub mod locks;
pub mod rtm;
pub mod spin;

pub use context::LockedContext;
pub use error::UnsupportedFeature;
pub use locks::{HLESpinMutex, IsLocked, RawLock, SpinMutex, SystemMutex, LOCK_ATTEMPTS};
pub use rtm::RTMContext;

/// A synchronization primitive capable of running a closure in an
/// atomic context.
///
/// `atomic` executes `commiter` exactly once per call, in a manner
/// that appears atomic with respect to every other call made through
/// this same context. Both [`LockedContext`] and [`RTMContext`]
/// already expose an inherent `atomic` method with this exact
/// signature; this trait exists for code that wants to stay generic
/// over which kind of context it was handed, the way the rest of this
/// crate's callers usually don't need to be.
pub trait AtomicContext {
    /// Run `commiter` exactly once, atomically with respect to other
    /// calls on this same context.
    fn atomic<F, R>(&self, commiter: F) -> R
    where
        F: FnOnce() -> R;
}

impl<L: RawLock> AtomicContext for LockedContext<L> {
    #[inline]
    fn atomic<F, R>(&self, commiter: F) -> R
    where
        F: FnOnce() -> R,
    {
        LockedContext::atomic(self, commiter)
    }
}

impl<L: RawLock> AtomicContext for RTMContext<L> {
    #[inline]
    fn atomic<F, R>(&self, commiter: F) -> R
    where
        F: FnOnce() -> R,
    {
        RTMContext::atomic(self, commiter)
    }
}
