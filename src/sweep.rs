//! The sweep phase: reclaim every white (or born-dead) slot, repaint
//! survivors white for the next cycle, and report whether the page just
//! swept has gone fully idle (§4.G).
//!
//! Transcribed from the original `sweep()`'s per-page loop: a page is only a
//! candidate for retirement when it contributed no newly-freed slots this
//! pass but also holds no live object — see SPEC_FULL.md §4 for the reading
//! of `dead_slot && freed < page_size` this crate implements.

use crate::finalize::finalize_slot;
use crate::object::Color;
use crate::page::Page;

/// Outcome of sweeping one page.
pub struct PageSweepResult {
    /// Slots finalized and returned to the free-list this pass.
    pub freed: usize,
    /// True when every slot was already free before this pass began and
    /// sweep found no survivors — the page should be retired.
    pub retire: bool,
    /// True when the page had no free slot before this pass (so it was off
    /// the free-pages list) but now does.
    pub became_free: bool,
}

/// Sweeps a single page: finalizes every white slot, repaints black
/// survivors white, and reports whether the page is now empty or newly has
/// free space.
pub fn sweep_page(page: &Page) -> PageSweepResult {
    let was_full = !page.has_free_slot();
    let mut freed = 0usize;
    let mut dead_slot = true;

    for slot in page.slots() {
        let tag = slot.header.tag();
        if tag == crate::object::Tag::Free {
            continue;
        }
        if slot.header.is_white() {
            finalize_slot(slot);
            page.push_free(slot);
            freed += 1;
        } else {
            slot.header.set_color(Color::White);
            dead_slot = false;
        }
    }

    let retire = dead_slot && freed < page.len();
    let became_free = was_full && freed > 0;

    PageSweepResult {
        freed,
        retire,
        became_free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Body, Color as ObjColor, InstanceData, Tag};

    #[test]
    fn sweeping_all_white_objects_retires_only_when_none_preexisted_free() {
        let page = Page::new(2);
        let a = page.pop_free().unwrap();
        let b = page.pop_free().unwrap();
        a.as_slot()
            .initialize(Tag::Object, None, Body::Object(InstanceData::default()));
        b.as_slot()
            .initialize(Tag::Object, None, Body::Object(InstanceData::default()));

        let result = sweep_page(&page);
        // both slots were live and white -> both freed this pass, so
        // freed == page.len() and the page must NOT be retired.
        assert_eq!(result.freed, 2);
        assert!(!result.retire);
    }

    #[test]
    fn page_with_only_preexisting_free_slots_retires() {
        let page = Page::new(2);
        let result = sweep_page(&page);
        assert_eq!(result.freed, 0);
        assert!(result.retire);
    }

    #[test]
    fn black_objects_are_repainted_white_and_survive() {
        let page = Page::new(1);
        let obj = page.pop_free().unwrap();
        obj.as_slot()
            .initialize(Tag::Object, None, Body::Object(InstanceData::default()));
        obj.as_slot().header.set_color(ObjColor::Black);

        let result = sweep_page(&page);
        assert_eq!(result.freed, 0);
        assert!(!result.retire);
        assert!(obj.as_slot().header.is_white());
    }
}
