//! The host allocator façade (§4.A): `malloc`/`calloc`/`realloc`/`free`
//! semantics with a single GC-retry on allocation failure, transcribed from
//! `mrb_realloc` in the original. Collection is triggered at most once per
//! call; if the allocator is still out of memory afterward, the second
//! failure is reported rather than retried again (the original also
//! refuses to raise twice while already unwinding from an out-of-memory
//! condition).
//!
//! The optional `gc_allocator` feature additionally exposes an
//! [`allocator_api2::alloc::Allocator`] façade so GC-internal containers can
//! allocate through the same retry-and-collect path, mirroring the teacher
//! crate's `alloc::gc_allocator::GcAllocator`.

use core::cell::Cell;
use core::ptr::NonNull;

use rust_alloc::alloc::{Layout, alloc, dealloc, realloc};

use crate::error::GcError;

/// Tracks whether the last allocation attempt already failed once, so a
/// second consecutive failure is reported instead of raising twice
/// (`mrb->out_of_memory`).
#[derive(Default)]
pub struct OutOfMemoryFlag(Cell<bool>);

impl OutOfMemoryFlag {
    pub fn is_set(&self) -> bool {
        self.0.get()
    }

    fn clear(&self) {
        self.0.set(false);
    }

    fn set(&self) {
        self.0.set(true);
    }
}

/// Allocates `layout`, running `collect` once and retrying on the first
/// failure (§4.A, §7). `heap_initialized` gates the retry exactly as the
/// original gates it on `mrb->heaps` being non-null: the very first
/// allocation during bootstrap has nothing to sweep yet.
pub fn alloc_with_retry(
    layout: Layout,
    heap_initialized: bool,
    oom: &OutOfMemoryFlag,
    mut collect: impl FnMut(),
) -> Result<NonNull<u8>, GcError> {
    // SAFETY: `layout` is caller-supplied and non-zero-sized per its own
    // invariants; `alloc` is the standard allocator entry point.
    let mut ptr = unsafe { alloc(layout) };

    if ptr.is_null() && layout.size() > 0 && heap_initialized {
        collect();
        ptr = unsafe { alloc(layout) };
    }

    finish(ptr, layout.size(), oom)
}

/// Reallocates `ptr` (originally allocated with `old_layout`) to
/// `new_layout`'s size, with the same collect-and-retry behavior.
///
/// # Safety
/// `ptr` must have been allocated with `old_layout` via this façade (or be
/// null, for a fresh allocation), and must not be used again if this
/// returns `Ok`.
pub unsafe fn realloc_with_retry(
    ptr: *mut u8,
    old_layout: Layout,
    new_size: usize,
    heap_initialized: bool,
    oom: &OutOfMemoryFlag,
    mut collect: impl FnMut(),
) -> Result<NonNull<u8>, GcError> {
    // SAFETY: forwarded from the caller's contract.
    let mut p2 = unsafe { realloc(ptr, old_layout, new_size) };

    if p2.is_null() && new_size > 0 && heap_initialized {
        collect();
        // SAFETY: `ptr` is unchanged since the first attempt failed.
        p2 = unsafe { realloc(ptr, old_layout, new_size) };
    }

    finish(p2, new_size, oom)
}

/// Allocates `count * size` bytes zeroed, rejecting the request outright if
/// the product would overflow rather than silently wrapping (§4.A `calloc`).
pub fn calloc_with_retry(
    count: usize,
    size: usize,
    align: usize,
    heap_initialized: bool,
    oom: &OutOfMemoryFlag,
    collect: impl FnMut(),
) -> Result<NonNull<u8>, GcError> {
    let total = count.checked_mul(size).ok_or(GcError::OutOfMemory)?;
    let layout = Layout::from_size_align(total, align).map_err(|_| GcError::OutOfMemory)?;
    let ptr = alloc_with_retry(layout, heap_initialized, oom, collect)?;
    if total > 0 {
        // SAFETY: `ptr` was just allocated with exactly `layout`, so the
        // whole region is writable for `total` bytes.
        unsafe { ptr.as_ptr().write_bytes(0, total) };
    }
    Ok(ptr)
}

/// # Safety
/// `ptr` must have been allocated with `layout` via this façade.
pub unsafe fn free(ptr: NonNull<u8>, layout: Layout) {
    // SAFETY: forwarded from the caller's contract.
    unsafe { dealloc(ptr.as_ptr(), layout) };
}

fn finish(ptr: *mut u8, requested: usize, oom: &OutOfMemoryFlag) -> Result<NonNull<u8>, GcError> {
    match NonNull::new(ptr) {
        Some(nn) => {
            oom.clear();
            Ok(nn)
        }
        None if requested == 0 => Ok(NonNull::dangling()),
        None => {
            if oom.is_set() {
                // Already unwinding from a prior out-of-memory condition;
                // the original panics here rather than raising again.
                Err(GcError::OutOfMemory)
            } else {
                oom.set();
                Err(GcError::OutOfMemory)
            }
        }
    }
}

#[cfg(feature = "gc_allocator")]
mod gc_allocator {
    use super::{OutOfMemoryFlag, alloc_with_retry, free, realloc_with_retry};
    use allocator_api2::alloc::{AllocError, Allocator, Layout};
    use core::cell::Cell;
    use core::ptr::NonNull;

    /// An [`Allocator`] that routes through the GC's retry-and-collect
    /// façade, so containers backing GC-managed objects (the `ThinVec`s and
    /// `HashMap`s in [`crate::object::body`]) can trigger a collection
    /// under memory pressure instead of aborting.
    pub struct GcAllocator<'h> {
        oom: &'h OutOfMemoryFlag,
        heap_initialized: &'h Cell<bool>,
        collect: &'h dyn Fn(),
    }

    impl<'h> GcAllocator<'h> {
        pub fn new(
            oom: &'h OutOfMemoryFlag,
            heap_initialized: &'h Cell<bool>,
            collect: &'h dyn Fn(),
        ) -> Self {
            Self {
                oom,
                heap_initialized,
                collect,
            }
        }
    }

    unsafe impl<'h> Allocator for GcAllocator<'h> {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            let initialized = self.heap_initialized.get();
            let ptr = alloc_with_retry(layout, initialized, self.oom, || (self.collect)())
                .map_err(|_| AllocError)?;
            Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            // SAFETY: forwarded from the `Allocator` contract.
            unsafe { free(ptr, layout) }
        }

        unsafe fn grow(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            let initialized = self.heap_initialized.get();
            // SAFETY: forwarded from the `Allocator::grow` contract.
            let new_ptr = unsafe {
                realloc_with_retry(
                    ptr.as_ptr(),
                    old_layout,
                    new_layout.size(),
                    initialized,
                    self.oom,
                    || (self.collect)(),
                )
            }
            .map_err(|_| AllocError)?;
            Ok(NonNull::slice_from_raw_parts(new_ptr, new_layout.size()))
        }
    }
}

#[cfg(feature = "gc_allocator")]
pub use gc_allocator::GcAllocator;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_is_reported_and_flag_set() {
        let oom = OutOfMemoryFlag::default();
        assert!(!oom.is_set());
        oom.set();
        assert!(oom.is_set());
        oom.clear();
        assert!(!oom.is_set());
    }

    #[test]
    fn calloc_zeroes_memory_and_rejects_overflowing_product() {
        let oom = OutOfMemoryFlag::default();
        let ptr = calloc_with_retry(8, 8, 8, true, &oom, || {}).unwrap();
        // SAFETY: freshly allocated 64-byte region.
        let bytes = unsafe { core::slice::from_raw_parts(ptr.as_ptr(), 64) };
        assert!(bytes.iter().all(|b| *b == 0));
        unsafe { free(ptr, Layout::from_size_align(64, 8).unwrap()) };

        let err = calloc_with_retry(usize::MAX, 2, 8, true, &oom, || {}).unwrap_err();
        assert!(matches!(err, GcError::OutOfMemory));
    }

    #[test]
    fn alloc_with_retry_succeeds_without_collecting_when_memory_is_available() {
        let oom = OutOfMemoryFlag::default();
        let mut collected = false;
        let layout = Layout::from_size_align(64, 8).unwrap();
        let ptr = alloc_with_retry(layout, true, &oom, || collected = true).unwrap();
        assert!(!collected);
        unsafe { free(ptr, layout) };
    }
}
