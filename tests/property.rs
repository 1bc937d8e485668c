//! Property-based checks for the quantified invariants in spec §8:
//! the xchg/HLE primitives' fixed-point contracts and the bounded
//! spin loop's attempts bookkeeping, across a spread of inputs rather
//! than a handful of hand-picked ones.

use std::sync::atomic::{AtomicU32, Ordering};

use atomex::arch;
use atomex::spin;
use proptest::prelude::*;

proptest! {
    /// `xchg_set_32(x)` on `x=0` returns 0 and leaves `x=1`; on `x=1`
    /// returns 1 and leaves `x=1` -- for any starting value in {0,1}.
    #[test]
    fn xchg_set_32_fixed_point(initial in 0u32..=1) {
        let word = AtomicU32::new(initial);
        let prior = arch::xchg_set_32(&word);
        prop_assert_eq!(prior, initial);
        prop_assert_eq!(word.load(Ordering::SeqCst), 1);
    }

    /// Same contract for the HLE-hinted exchange and its release.
    #[test]
    fn hle_xchg_set_32_fixed_point(initial in 0u32..=1) {
        let word = AtomicU32::new(initial);
        unsafe {
            let prior = arch::hle_xchg_set_32(&word);
            prop_assert_eq!(prior, initial);
            prop_assert_eq!(word.load(Ordering::SeqCst), 1);
            arch::hle_store_zero_32(&word);
        }
        prop_assert_eq!(word.load(Ordering::SeqCst), 0);
    }

    /// `SpinCountLock` with initial attempts `A` either returns with
    /// the word held and attempts in `[0, A-1]`, or gives up with
    /// attempts exactly 0 -- never a silent acquire past budget.
    #[test]
    fn spin_count_lock_on_contended_word_gives_up_at_zero(attempts in 1u32..500) {
        let word = AtomicU32::new(1); // permanently held by "someone else"
        let mut budget = attempts;
        spin::spin_count_lock(&word, &mut budget);
        prop_assert_eq!(budget, 0);
        prop_assert_eq!(word.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spin_count_lock_on_free_word_acquires_within_budget(attempts in 1u32..500) {
        let word = AtomicU32::new(0);
        let mut budget = attempts;
        spin::spin_count_lock(&word, &mut budget);
        prop_assert!(budget < attempts);
        prop_assert_eq!(word.load(Ordering::SeqCst), 1);
    }

    /// Same two properties for the HLE-elided bounded acquire.
    #[test]
    fn hle_spin_count_lock_on_contended_word_gives_up_at_zero(attempts in 1u32..500) {
        let word = AtomicU32::new(1);
        let mut budget = attempts;
        unsafe { spin::hle_spin_count_lock(&word, &mut budget) };
        prop_assert_eq!(budget, 0);
    }

    #[test]
    fn hle_spin_count_lock_on_free_word_acquires_within_budget(attempts in 1u32..500) {
        let word = AtomicU32::new(0);
        let mut budget = attempts;
        unsafe { spin::hle_spin_count_lock(&word, &mut budget) };
        prop_assert!(budget < attempts);
        prop_assert_eq!(word.load(Ordering::SeqCst), 1);
    }
}
