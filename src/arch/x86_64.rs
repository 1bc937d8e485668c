//! x86-64 CPU primitives: pause, lock-prefixed exchange, HLE hint
//! prefixes, and RTM transaction control.
//!
//! All functions here are leaves: they touch only the memory the caller
//! hands them and never call into the allocator or the scheduler. Any
//! scheduler interruption while executing inside the region bracketed by
//! [`tx_begin`]/[`tx_end`], or between an [`hle_xchg_set_32`] and its
//! matching [`hle_store_zero_32`], forces a hardware abort — callers
//! must not allocate, log, or otherwise reschedule in between.

use core::sync::atomic::{fence, AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};
use core::sync::atomic::compiler_fence;
use std::sync::OnceLock;

pub use core::arch::x86_64::{
    _XABORT_CAPACITY as CAPACITY, _XABORT_CONFLICT as CONFLICT, _XABORT_DEBUG as DEBUG,
    _XABORT_EXPLICIT as EXPLICIT, _XABORT_NESTED as NESTED, _XABORT_RETRY as RETRY,
    _XBEGIN_STARTED as STARTED,
};

/// Immediate operand `xabort` carries when we abort a speculative
/// transaction because a fallback-lock holder is active (see
/// [`crate::rtm::RTMContext`]). The value itself is observational only;
/// nothing decodes it.
const FALLBACK_ABORT_CODE: u32 = 0xff;

/// Emit the architectural spin-wait hint (`PAUSE`). No memory effect.
#[inline(always)]
pub fn pause() {
    core::hint::spin_loop();
}

/// Atomically store 1 into `*p`, returning the prior value. Full fence
/// in both directions — suitable as a lock-acquire primitive.
#[inline(always)]
pub fn xchg_set_8(p: &AtomicU8) -> u8 {
    p.swap(1, Ordering::SeqCst)
}

/// 16-bit counterpart of [`xchg_set_8`].
#[inline(always)]
pub fn xchg_set_16(p: &AtomicU16) -> u16 {
    p.swap(1, Ordering::SeqCst)
}

/// 32-bit counterpart of [`xchg_set_8`]. This is the width every spin
/// lock in this crate is built on.
#[inline(always)]
pub fn xchg_set_32(p: &AtomicU32) -> u32 {
    p.swap(1, Ordering::SeqCst)
}

/// 64-bit counterpart of [`xchg_set_8`].
#[inline(always)]
pub fn xchg_set_64(p: &AtomicU64) -> u64 {
    p.swap(1, Ordering::SeqCst)
}

/// Like [`xchg_set_32`] but the exchange carries the `XACQUIRE` hint
/// prefix, letting the processor speculatively elide the lock. Returns
/// the prior value exactly as a plain exchange would; software cannot
/// distinguish an elided acquisition from a real one.
///
/// # Safety
///
/// The caller must pair every successful acquire with a matching
/// [`hle_store_zero_32`] release on the same word, with no intervening
/// call that could reschedule the thread (allocation, syscalls,
/// logging) — any of those forces the speculative region to abort.
#[inline(always)]
pub unsafe fn hle_xchg_set_32(p: &AtomicU32) -> u32 {
    let ptr = p.as_ptr();
    let old: u32;
    core::arch::asm!(
        "xacquire lock xchg [{ptr}], {val}",
        ptr = in(reg) ptr,
        val = inout(reg) 1u32 => old,
        options(nostack),
    );
    old
}

/// Store 0 into `*p` with the `XRELEASE` hint prefix, committing an
/// elided region if one is open or performing a plain release store
/// otherwise.
///
/// # Safety
///
/// Must only be called to release a word most recently acquired via
/// [`hle_xchg_set_32`] by the same thread.
#[inline(always)]
pub unsafe fn hle_store_zero_32(p: &AtomicU32) {
    let ptr = p.as_ptr();
    core::arch::asm!(
        "xrelease mov [{ptr}], {val:e}",
        ptr = in(reg) ptr,
        val = in(reg) 0u32,
        options(nostack),
    );
}

/// Write 1 to `*p`, then erect an explicit store-load fence so that the
/// write is globally visible to any processor's subsequent load before
/// this function returns. Used by [`crate::rtm::RTMContext`] to publish
/// `fallback = 1` before running the fallback critical section, so that
/// concurrent transactional readers are guaranteed to see it and abort.
#[inline(always)]
pub fn store_and_fence_32(p: &AtomicU32) {
    p.store(1, Ordering::Relaxed);
    fence(Ordering::SeqCst);
}

/// Start an RTM region.
///
/// Returns [`STARTED`] if the transaction began executing
/// speculatively. Otherwise returns a bitfield of abort-reason flags
/// ([`RETRY`], [`CONFLICT`], [`CAPACITY`], [`EXPLICIT`], [`DEBUG`],
/// [`NESTED`]) describing why the transaction did not start.
///
/// # Safety
///
/// Must only be called after confirming [`rtm_available`]; executing
/// `XBEGIN` on hardware without RTM support is an illegal instruction.
#[inline(always)]
#[target_feature(enable = "rtm")]
pub unsafe fn tx_begin() -> u32 {
    core::arch::x86_64::_xbegin()
}

/// Commit the currently open transaction.
///
/// # Safety
///
/// Must only be called between a [`tx_begin`] that returned [`STARTED`]
/// and any abort of that same transaction.
#[inline(always)]
#[target_feature(enable = "rtm")]
pub unsafe fn tx_end() {
    core::arch::x86_64::_xend()
}

/// Explicitly abort the currently open transaction. Used by
/// [`crate::rtm::RTMContext`] when it observes a fallback-lock holder
/// mid-transaction; the next [`tx_begin`] will report [`EXPLICIT`].
///
/// # Safety
///
/// Must only be called while a transaction started by [`tx_begin`] is
/// open.
#[inline(always)]
#[target_feature(enable = "rtm")]
pub unsafe fn tx_abort() {
    core::arch::x86_64::_xabort(FALLBACK_ABORT_CODE as u8);
}

/// Report whether the calling thread is currently executing inside an
/// open RTM transaction.
///
/// # Safety
///
/// Must only be called after confirming [`rtm_available`].
#[inline(always)]
#[target_feature(enable = "rtm")]
pub unsafe fn tx_test() -> bool {
    core::arch::x86_64::_xtest() != 0
}

static HLE_AVAILABLE: OnceLock<bool> = OnceLock::new();
static RTM_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Whether this CPU supports Hardware Lock Elision. Probed once via
/// `CPUID` and cached for the life of the process.
#[inline]
pub fn hle_available() -> bool {
    *HLE_AVAILABLE.get_or_init(|| {
        let supported = std::is_x86_feature_detected!("hle");
        log::debug!("HLE availability probe: {supported}");
        supported
    })
}

/// Whether this CPU supports Restricted Transactional Memory. Probed
/// once via `CPUID` and cached for the life of the process.
#[inline]
pub fn rtm_available() -> bool {
    *RTM_AVAILABLE.get_or_init(|| {
        let supported = std::is_x86_feature_detected!("rtm");
        log::debug!("RTM availability probe: {supported}");
        supported
    })
}

/// A pure compiler barrier: prevents the compiler from reordering
/// memory operations across this point without emitting a hardware
/// fence. Used by tests that need to pin the ordering of plain reads
/// around an `asm!` block without paying for `mfence`.
#[inline(always)]
pub fn compiler_barrier() {
    compiler_fence(Ordering::SeqCst);
}
