//! Monotonic package identifier allocation.
//!
//! Identifiers are allocated by an explicit [`IdAllocator`] handed to the
//! package constructors, so tests can start from a fresh counter and get
//! deterministic IDs. Production callers use [`IdAllocator::process_default`],
//! which guarantees that no identifier repeats within one process run.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of unique, monotonically increasing package identifiers.
///
/// # Examples
///
/// ```
/// use testengine_api::IdAllocator;
///
/// let ids = IdAllocator::new();
/// assert_eq!(ids.next_id(), "1");
/// assert_eq!(ids.next_id(), "2");
/// ```
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

static PROCESS_IDS: IdAllocator = IdAllocator::new();

impl IdAllocator {
    /// Creates an allocator whose first identifier is `"1"`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the process-wide allocator shared by default constructors.
    #[must_use]
    pub fn process_default() -> &'static Self {
        &PROCESS_IDS
    }

    /// Allocates the next identifier.
    #[must_use]
    pub fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
