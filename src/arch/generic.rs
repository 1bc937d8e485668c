//! Software fallback for targets without HLE/RTM.
//!
//! Every function here has the same signature and contract as its
//! `x86_64` counterpart in [`super::x86_64`], so the spin loops, lock
//! types, and [`crate::rtm::RTMContext`] compile unchanged on any
//! target. The difference is purely behavioral: there is no elision and
//! no transaction, so [`tx_begin`] never reports [`STARTED`] and the
//! HLE-hinted operations are indistinguishable from plain ones.

use core::sync::atomic::{fence, AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Sentinel a successful [`tx_begin`] would report. Unreachable on this
/// target — kept so callers can write one codepath for both arches.
pub const STARTED: u32 = u32::MAX;
/// Always set in [`tx_begin`]'s return value here, since there is no
/// hardware retry hint to offer.
pub const RETRY: u32 = 0;
pub const CONFLICT: u32 = 0;
pub const CAPACITY: u32 = 0;
pub const EXPLICIT: u32 = 0;
pub const DEBUG: u32 = 0;
pub const NESTED: u32 = 0;

#[inline(always)]
pub fn pause() {
    core::hint::spin_loop();
}

#[inline(always)]
pub fn xchg_set_8(p: &AtomicU8) -> u8 {
    p.swap(1, Ordering::SeqCst)
}

#[inline(always)]
pub fn xchg_set_16(p: &AtomicU16) -> u16 {
    p.swap(1, Ordering::SeqCst)
}

#[inline(always)]
pub fn xchg_set_32(p: &AtomicU32) -> u32 {
    p.swap(1, Ordering::SeqCst)
}

#[inline(always)]
pub fn xchg_set_64(p: &AtomicU64) -> u64 {
    p.swap(1, Ordering::SeqCst)
}

/// # Safety
///
/// No hardware precondition on this target; kept `unsafe` to match
/// [`super::x86_64::hle_xchg_set_32`]'s signature.
#[inline(always)]
pub unsafe fn hle_xchg_set_32(p: &AtomicU32) -> u32 {
    p.swap(1, Ordering::SeqCst)
}

/// # Safety
///
/// No hardware precondition on this target; kept `unsafe` to match
/// [`super::x86_64::hle_store_zero_32`]'s signature.
#[inline(always)]
pub unsafe fn hle_store_zero_32(p: &AtomicU32) {
    p.store(0, Ordering::Release);
}

#[inline(always)]
pub fn store_and_fence_32(p: &AtomicU32) {
    p.store(1, Ordering::Relaxed);
    fence(Ordering::SeqCst);
}

/// Always reports an abort with no flags set, so
/// [`crate::rtm::RTMContext::atomic`] falls straight through to the
/// fallback-lock path without ever looping.
///
/// # Safety
///
/// No hardware precondition on this target.
#[inline(always)]
pub unsafe fn tx_begin() -> u32 {
    0
}

/// # Safety
///
/// Never called on this target: [`tx_begin`] never reports [`STARTED`].
#[inline(always)]
pub unsafe fn tx_end() {}

/// # Safety
///
/// Never called on this target: [`tx_begin`] never reports [`STARTED`].
#[inline(always)]
pub unsafe fn tx_abort() {}

/// # Safety
///
/// No hardware precondition on this target.
#[inline(always)]
pub unsafe fn tx_test() -> bool {
    false
}

/// Always `false`: this target has no HLE.
#[inline]
pub fn hle_available() -> bool {
    false
}

/// Always `false`: this target has no RTM.
#[inline]
pub fn rtm_available() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_test_reports_false_outside_a_transaction() {
        // SAFETY: no hardware precondition on this target.
        unsafe { assert!(!tx_test()) };
    }

    #[test]
    fn tx_begin_never_reports_started() {
        // SAFETY: no hardware precondition on this target.
        assert_ne!(unsafe { tx_begin() }, STARTED);
    }
}
