//! Per-variant finalization (§4.H, `obj_free` in the original). Releases
//! whatever sidecar storage a variant owns, then hands the slot back to its
//! page's free-list with `tt` reset to `Free`.
//!
//! CLASS/MODULE/SCLASS free both a method table and an instance variable
//! table; ENV only frees its stack when detached; ARRAY decrements a shared
//! aux instead of freeing when `MRB_ARY_SHARED` would have been set; DATA
//! runs its `dfree` hook before its instance variables go. Everything else
//! follows purely from Rust's ordinary drop glue once `take_body` hands the
//! owned `Body` to the caller.

use crate::object::{Body, Slot, Tag};

/// Finalizes a single slot in place: drops whatever the body owns (running
/// any `dfree` hook along the way) and resets the header to `Tag::Free`.
/// The caller is responsible for threading the slot onto a free-list
/// afterward.
pub fn finalize_slot(slot: &Slot) {
    let body = slot.take_body();
    match body {
        Body::Data(mut data) => {
            if let Some(dfree) = data.dfree.take() {
                if let Some(inner) = data.inner.take() {
                    dfree(inner);
                }
            }
            // `data.iv` and any leftover `inner` drop normally here.
        }
        // every other variant's sidecar storage is plain owned Rust data
        // (String, ThinVec, HashMap, Rc, Box<dyn Any>) and is released by
        // `body`'s own Drop when this match arm falls through.
        _ => {}
    }
    slot.header.set_tag(Tag::Free);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ArrayData, ClassData, InstanceData, SharedArrayAux};
    use crate::page::Page;
    use rust_alloc::rc::Rc;

    #[test]
    fn finalizing_resets_tag_to_free() {
        let page = Page::new(1);
        let obj = page.pop_free().unwrap();
        obj.as_slot()
            .initialize(Tag::Object, None, Body::Object(InstanceData::default()));
        finalize_slot(obj.as_slot());
        assert_eq!(obj.as_slot().header.tag(), Tag::Free);
    }

    #[test]
    fn finalizing_shared_array_decrements_refcount_instead_of_freeing() {
        let aux = Rc::new(SharedArrayAux {
            buf: core::cell::RefCell::new(thin_vec::thin_vec![]),
        });
        let second = Rc::clone(&aux);
        assert_eq!(Rc::strong_count(&aux), 2);

        let page = Page::new(1);
        let obj = page.pop_free().unwrap();
        obj.as_slot()
            .initialize(Tag::Array, None, Body::Array(ArrayData::Shared(second)));
        finalize_slot(obj.as_slot());

        assert_eq!(Rc::strong_count(&aux), 1);
    }

    #[test]
    fn finalizing_class_drops_method_table_and_ivars() {
        let page = Page::new(1);
        let obj = page.pop_free().unwrap();
        obj.as_slot()
            .initialize(Tag::Class, None, Body::Class(ClassData::default()));
        finalize_slot(obj.as_slot());
        assert_eq!(obj.as_slot().header.tag(), Tag::Free);
    }
}
