//! Pages: fixed-size arrays of slots, threaded onto two doubly-linked lists
//! (`struct heap_page` in the original `gc.c`) — one holding every page, one
//! holding only pages with at least one free slot. Per-page intra-page
//! freedom is tracked by chaining `Slot::free_next` (§3 "page", §4.B).
//!
//! Grounded in the same fixed-slot-buffer shape as the teacher's
//! `alloc::arena2::Arena`, but slot storage is a plain boxed slice rather
//! than a raw byte buffer plus bitmap — slot liveness is carried in each
//! `Slot`'s own header instead of an out-of-band bitmap, since the header is
//! needed anyway for the tag/color bits.

use core::cell::Cell;
use core::ptr::NonNull;

use rust_alloc::boxed::Box;

use crate::object::{ObjRef, Slot};

/// One page's fixed-size backing storage plus its position in both
/// intrusive page lists.
pub struct Page {
    slots: Box<[Slot]>,
    /// Head of this page's intra-page free-list, or `None` if full.
    freelist: Cell<Option<NonNull<Slot>>>,
    pub(crate) prev: Cell<Option<NonNull<Page>>>,
    pub(crate) next: Cell<Option<NonNull<Page>>>,
    pub(crate) free_prev: Cell<Option<NonNull<Page>>>,
    pub(crate) free_next: Cell<Option<NonNull<Page>>>,
    /// Whether this page is currently threaded onto the free-pages list.
    pub(crate) in_free_list: Cell<bool>,
}

impl Page {
    /// Allocates a new page of `size` slots, all linked onto its own
    /// free-list (`add_heap`).
    pub fn new(size: usize) -> Box<Self> {
        assert!(size > 0, "page must hold at least one slot");
        let mut slots: rust_alloc::vec::Vec<Slot> = rust_alloc::vec::Vec::with_capacity(size);
        for _ in 0..size {
            slots.push(Slot::new_free(None));
        }
        let slots = slots.into_boxed_slice();

        // Thread the intra-page free-list through the freshly allocated
        // slots, last-to-first so `freelist` ends up pointing at slot 0.
        let mut head: Option<NonNull<Slot>> = None;
        for slot in slots.iter().rev() {
            let ptr = NonNull::from(slot);
            slot.set_free_next(head);
            head = Some(ptr);
        }

        Box::new(Self {
            slots,
            freelist: Cell::new(head),
            prev: Cell::new(None),
            next: Cell::new(None),
            free_prev: Cell::new(None),
            free_next: Cell::new(None),
            in_free_list: Cell::new(false),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn has_free_slot(&self) -> bool {
        self.freelist.get().is_some()
    }

    /// Pops one slot off this page's free-list. Caller must initialize the
    /// returned slot before it is visible to the marker.
    pub fn pop_free(&self) -> Option<ObjRef> {
        let head = self.freelist.get()?;
        // SAFETY: `head` came from this page's own free-list, which only
        // ever threads slots owned by `self.slots`.
        let next = unsafe { head.as_ref() }.free_next.get();
        self.freelist.set(next);
        // SAFETY: the slot belongs to this page and outlives `self`.
        Some(unsafe { ObjRef::from_raw(head) })
    }

    /// Returns a slot to this page's free-list (`sweep`'s per-slot reclaim).
    pub fn push_free(&self, slot: &Slot) {
        let ptr = NonNull::from(slot);
        slot.set_free_next(self.freelist.get());
        self.freelist.set(Some(ptr));
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn contains(&self, obj: ObjRef) -> bool {
        let ptr = obj.as_slot() as *const Slot as usize;
        let base = self.slots.as_ptr() as usize;
        let end = base + self.slots.len() * core::mem::size_of::<Slot>();
        (base..end).contains(&ptr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_page_links_every_slot_free() {
        let page = Page::new(4);
        assert_eq!(page.len(), 4);
        assert!(page.has_free_slot());
        let mut popped = rust_alloc::vec::Vec::new();
        while let Some(obj) = page.pop_free() {
            popped.push(obj);
        }
        assert_eq!(popped.len(), 4);
        assert!(!page.has_free_slot());
    }

    #[test]
    fn freed_slot_is_reusable() {
        let page = Page::new(2);
        let obj = page.pop_free().unwrap();
        page.push_free(obj.as_slot());
        assert!(page.has_free_slot());
        let again = page.pop_free().unwrap();
        assert_eq!(again.as_slot() as *const _, obj.as_slot() as *const _);
    }
}
