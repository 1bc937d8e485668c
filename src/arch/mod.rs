//! Architecture-gated CPU primitives.
//!
//! Everything the rest of the crate needs from the hardware — the spin
//! hint, the lock-prefixed exchange, the HLE hint prefixes, and the RTM
//! transaction primitives — lives behind this module so that the spin
//! loops, lock types, and [`crate::rtm::RTMContext`] never branch on
//! `target_arch` themselves.
//!
//! On `x86_64` [`x86_64`] provides the real thing. On every other target
//! [`generic`] provides a software-only stand-in that satisfies the same
//! contract: `tx_begin` never reports [`STARTED`](generic::STARTED), so
//! [`crate::rtm::RTMContext`] always takes the fallback-lock path, and
//! the HLE hint is simply absent rather than stubbed as an error.

#[cfg(target_arch = "x86_64")]
mod x86_64;
#[cfg(target_arch = "x86_64")]
pub use self::x86_64::*;

#[cfg(not(target_arch = "x86_64"))]
mod generic;
#[cfg(not(target_arch = "x86_64"))]
pub use generic::*;
