//! Global configuration for merge runtime behavior.
//!
//! Set once at startup and read when record heaps are constructed.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether new record heaps reject a second pending record from the same sample.
///
/// The k-way merge only produces globally ordered output when each sample
/// stream has at most one undelivered record in the heap. Strict heaps turn
/// a violation into an error instead of silently mis-ordered output.
static STRICT_PENDING: AtomicBool = AtomicBool::new(true);

/// Enable or disable the one-pending-record-per-sample check for new heaps.
///
/// # Example
///
/// ```
/// use vcfstore_merge::config;
///
/// config::set_strict_pending(false);
/// assert!(!config::is_strict_pending());
/// config::set_strict_pending(true);
/// ```
#[inline]
pub fn set_strict_pending(enabled: bool) {
    STRICT_PENDING.store(enabled, Ordering::Release);
}

/// Check whether new heaps enforce one pending record per sample.
#[inline]
pub fn is_strict_pending() -> bool {
    STRICT_PENDING.load(Ordering::Acquire)
}
