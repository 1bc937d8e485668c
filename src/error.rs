//! Construction-time error type.
//!
//! Nothing in this crate's `atomic` entry points can fail — spec.md §7
//! is explicit that the closure runs exactly once regardless of which
//! path executed. The one place a caller can opt into failure is at
//! construction, when a transactional or elided type is asked to be
//! built on hardware that does not support the feature it needs; the
//! default constructors degrade silently instead (see
//! [`crate::rtm::RTMContext::new`] and
//! [`crate::locks::HLESpinMutex::new`]), but strict counterparts are
//! offered for callers who would rather fail loudly:
//! [`crate::rtm::RTMContext::try_with_lock_strict`] and
//! [`crate::locks::HLESpinMutex::try_new_strict`].

/// A hardware feature required by a strict constructor was not
/// detected on this CPU.
#[derive(Debug, thiserror::Error)]
pub enum UnsupportedFeature {
    /// Restricted Transactional Memory (`RTM`) is not available.
    #[error("this CPU does not support Intel RTM")]
    Rtm,
    /// Hardware Lock Elision (`HLE`) is not available.
    #[error("this CPU does not support Intel HLE")]
    Hle,
}
