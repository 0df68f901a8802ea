//! Error conditions the collector and allocator façade can raise.
//!
//! Kept deliberately small: §7 of the spec only names two recoverable
//! conditions, and both unwind through the host language's exception
//! mechanism rather than being handled internally.

/// Errors raised by the allocator façade (§4.A) and the arena (§4.D).
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum GcError {
    /// The host allocator returned null twice, bracketing one collection.
    #[error("Out of memory")]
    OutOfMemory,
    /// A `protect`/auto-pin would have exceeded the arena's capacity.
    #[error("arena overflow error")]
    ArenaOverflow,
}
