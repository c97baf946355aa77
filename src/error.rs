//! Ambient-layer error types. The core `allocate`/`release`/`resize` operations
//! never return these — they report failure by returning `None`, per their
//! documented contracts. These exist only for the fallible constructors and
//! the global current-context convenience layer.

/// Failure modes surfaced by the wrapper layer around [`crate::heap::Heap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// The supplied buffer was too small to hold what was asked of it.
    BufferTooSmall {
        /// Minimum number of bytes required.
        required: usize,
        /// Number of bytes actually supplied.
        got: usize,
    },
    /// [`heap::allocate`](crate::heap::allocate) or
    /// [`heap::release`](crate::heap::release) was called before
    /// [`set_current`](crate::heap::set_current) ever ran.
    NoCurrentContext,
    /// A global `allocate` convenience call ran out of memory: either no
    /// growth callback was installed, or the installed one returned `None`
    /// or fewer bytes than requested.
    ExternalAllocFailed,
}

impl core::fmt::Display for HeapError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HeapError::BufferTooSmall { required, got } => write!(
                f,
                "buffer too small: required at least {required} bytes, got {got}"
            ),
            HeapError::NoCurrentContext => {
                write!(f, "no current heap context has been set")
            }
            HeapError::ExternalAllocFailed => {
                write!(f, "external allocation callback failed or under-supplied memory")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HeapError {}

/// Reasons the integrity auditor can fail, carried alongside the address of
/// the first offending entity in [`AuditFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditReason {
    /// A bin sentinel's status or size field was corrupted.
    BadSentinel,
    /// A chunk within a bin's list had a status other than FREE.
    BadChunkStatus,
    /// A chunk's `prev` link did not point back to the expected predecessor.
    BrokenLink,
    /// A chunk's header size did not match its footer size.
    SizeMismatch,
    /// The accumulated free byte count did not match `Heap::free_bytes`.
    FreeByteMismatch,
}

/// Returned by [`Heap::audit`](crate::heap::Heap::audit) when corruption is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditFault {
    /// Address of the first offending chunk, footer, bin sentinel, or the
    /// context itself (for a free-byte accounting mismatch).
    pub at: *const u8,
    /// Why this location was flagged.
    pub reason: AuditReason,
}
