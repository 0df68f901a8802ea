//! The object heap: page list management (§4.B), the allocator entry point
//! (§4.C), and the collection driver that ties mark (§4.F), sweep (§4.G),
//! and finalization (§4.H) together. This is the top-level state struct
//! analogous to the teacher's `MarkSweepGarbageCollector` — built entirely
//! from `Cell`/`RefCell` fields since the collector is single-threaded and
//! stop-the-world (§5), never `Mutex`.

use core::cell::{Cell, RefCell};
use core::ptr::NonNull;

use log::{debug, trace};
use rust_alloc::boxed::Box;
use rust_alloc::vec::Vec;

use crate::alloc_facade::OutOfMemoryFlag;
use crate::arena::{Arena, ArenaIndex};
use crate::config::{CompatSettings, GcConfig};
use crate::context::{Context, Irep};
use crate::error::GcError;
use crate::mark::{mark_context, mark_ireps, mark_object};
use crate::object::{Body, ObjRef, Tag};
use crate::page::Page;
use crate::roots::GlobalRoots;
use crate::sweep::sweep_page;

/// Page-list and free-list threading, operating on the intrusive
/// `prev`/`next`/`free_prev`/`free_next` cells (`link_heap_page` /
/// `unlink_heap_page` / `link_free_heap_page` / `unlink_free_heap_page`).
struct PageLists {
    all: Cell<Option<NonNull<Page>>>,
    free: Cell<Option<NonNull<Page>>>,
}

impl PageLists {
    fn new() -> Self {
        Self {
            all: Cell::new(None),
            free: Cell::new(None),
        }
    }

    fn link_all(&self, page: NonNull<Page>) {
        // SAFETY: `page` outlives the list (owned by `Heap::pages`).
        let p = unsafe { page.as_ref() };
        p.prev.set(None);
        p.next.set(self.all.get());
        if let Some(head) = self.all.get() {
            unsafe { head.as_ref() }.prev.set(Some(page));
        }
        self.all.set(Some(page));
    }

    fn unlink_all(&self, page: NonNull<Page>) {
        let p = unsafe { page.as_ref() };
        match p.prev.get() {
            Some(prev) => unsafe { prev.as_ref() }.next.set(p.next.get()),
            None => self.all.set(p.next.get()),
        }
        if let Some(next) = p.next.get() {
            unsafe { next.as_ref() }.prev.set(p.prev.get());
        }
    }

    fn link_free(&self, page: NonNull<Page>) {
        let p = unsafe { page.as_ref() };
        if p.in_free_list.get() {
            return;
        }
        p.free_prev.set(None);
        p.free_next.set(self.free.get());
        if let Some(head) = self.free.get() {
            unsafe { head.as_ref() }.free_prev.set(Some(page));
        }
        self.free.set(Some(page));
        p.in_free_list.set(true);
    }

    fn unlink_free(&self, page: NonNull<Page>) {
        let p = unsafe { page.as_ref() };
        if !p.in_free_list.get() {
            return;
        }
        match p.free_prev.get() {
            Some(prev) => unsafe { prev.as_ref() }.free_next.set(p.free_next.get()),
            None => self.free.set(p.free_next.get()),
        }
        if let Some(next) = p.free_next.get() {
            unsafe { next.as_ref() }.free_prev.set(p.free_prev.get());
        }
        p.in_free_list.set(false);
    }
}

/// The object heap and collector state. Owns every page, the arena, the
/// non-object root sources, and the root execution context.
pub struct Heap {
    config: GcConfig,
    pages: Vec<Box<Page>>,
    lists: PageLists,
    arena: RefCell<Arena>,
    pub roots: RefCell<GlobalRoots>,
    /// The top-level execution context; always a root, never swept (it is
    /// not itself a heap object).
    pub root_context: Context,
    ireps: Vec<Irep>,
    live: Cell<usize>,
    disabled: Cell<bool>,
    oom: OutOfMemoryFlag,
    /// Storage for the `GC.interval_ratio`/`step_ratio`/`generational_mode`
    /// compatibility surface (§6); consulted by nothing in this collector.
    pub compat: CompatSettings,
}

impl Heap {
    pub fn new(config: GcConfig) -> Self {
        let mut heap = Self {
            config,
            pages: Vec::new(),
            lists: PageLists::new(),
            arena: RefCell::new(Arena::new(config.arena_size())),
            roots: RefCell::new(GlobalRoots::default()),
            root_context: Context::new(128),
            ireps: Vec::new(),
            live: Cell::new(0),
            disabled: Cell::new(false),
            oom: OutOfMemoryFlag::default(),
            compat: CompatSettings::new(&config),
        };
        heap.add_heap();
        heap
    }

    pub fn live_count(&self) -> usize {
        self.live.get()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled.get()
    }

    /// `GC.disable` (§6): sets the disabled flag, returning its previous
    /// value so callers can restore it later.
    pub fn disable(&self) -> bool {
        self.disabled.replace(true)
    }

    /// `GC.enable` (§6): clears the disabled flag, returning its previous
    /// value.
    pub fn enable(&self) -> bool {
        self.disabled.replace(false)
    }

    /// `GC.start` (§6): the user-visible entry point, identical to
    /// [`Heap::collect`] (the original distinguishes them only because
    /// `collect` is also called internally from the allocator's slow path).
    pub fn start(&mut self) {
        self.collect();
    }

    pub fn add_irep(&mut self, irep: Irep) {
        self.ireps.push(irep);
    }

    pub fn arena_save(&self) -> ArenaIndex {
        self.arena.borrow().save()
    }

    pub fn arena_restore(&self, idx: ArenaIndex) {
        self.arena.borrow_mut().restore(idx);
    }

    /// Explicitly pins `value` in the arena (`mrb_gc_protect`); immediates
    /// are ignored since they are never heap-allocated and so never need
    /// rooting (§4.D, §6).
    pub fn protect(&self, value: crate::value::Value) -> Result<(), GcError> {
        match value.as_heap() {
            Some(obj) => self.arena.borrow_mut().push(obj).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Allocates a fresh page, linking it onto both the all-pages and
    /// free-pages lists (`add_heap`).
    fn add_heap(&mut self) -> NonNull<Page> {
        debug!("allocating heap page ({} slots)", self.config.heap_page_size());
        let mut boxed = Page::new(self.config.heap_page_size());
        let ptr = NonNull::from(boxed.as_mut());
        self.pages.push(boxed);
        self.lists.link_all(ptr);
        self.lists.link_free(ptr);
        ptr
    }

    /// Allocates a new object of `tag`/`class` with `body`, collecting once
    /// if no page currently has a free slot (`mrb_obj_alloc`). Every newly
    /// allocated object is automatically pinned in the arena (`gc_protect`),
    /// so it survives any collection triggered before the caller has a
    /// chance to use it.
    pub fn alloc(&mut self, tag: Tag, class: Option<ObjRef>, body: Body) -> Result<ObjRef, GcError> {
        if self.lists.free.get().is_none() {
            self.collect();
            self.add_heap();
        }

        let page_ptr = self.lists.free.get().expect("add_heap just linked a free page");
        // SAFETY: pages are owned by `self.pages` and never moved or freed
        // while referenced from the free-pages list.
        let page = unsafe { page_ptr.as_ref() };
        let obj = page.pop_free().expect("page was on the free-pages list");
        if !page.has_free_slot() {
            self.lists.unlink_free(page_ptr);
        }

        obj.as_slot().initialize(tag, class, body);
        self.live.set(self.live.get() + 1);
        self.arena.borrow_mut().push(obj)?;
        Ok(obj)
    }

    /// Runs one full stop-the-world collection (`mrb_garbage_collect`): mark
    /// every root, then sweep every page, finalizing the unreached and
    /// retiring pages that end up wholly idle.
    pub fn collect(&mut self) {
        if self.disabled.get() {
            return;
        }
        trace!("collect: {} live objects, {} pages", self.live.get(), self.pages.len());

        self.mark_roots();
        self.sweep_all();
    }

    fn mark_roots(&self) {
        self.roots.borrow().mark();
        for obj in self.arena.borrow().iter() {
            mark_object(*obj);
        }
        mark_context(&self.root_context);
        mark_ireps(self.ireps.iter());
    }

    fn sweep_all(&mut self) {
        let mut freed_total = 0usize;
        let mut retired = Vec::new();
        let mut cursor = self.lists.all.get();

        while let Some(page_ptr) = cursor {
            // SAFETY: `page_ptr` came from the all-pages list, which only
            // ever threads pages owned by `self.pages`.
            let page = unsafe { page_ptr.as_ref() };
            cursor = page.next.get();

            let result = sweep_page(page);
            freed_total += result.freed;

            if result.retire {
                self.lists.unlink_all(page_ptr);
                self.lists.unlink_free(page_ptr);
                retired.push(page_ptr);
            } else if result.became_free {
                self.lists.link_free(page_ptr);
            }
        }

        self.live.set(self.live.get().saturating_sub(freed_total));
        debug!("sweep freed {freed_total} objects, retiring {} pages", retired.len());

        if !retired.is_empty() {
            self.pages.retain(|boxed| {
                let ptr = NonNull::from(&**boxed);
                !retired.contains(&ptr)
            });
        }
    }

    /// Visits every slot in every page, live or free, for the `GC.each_object`
    /// surface (§4.I: "invoke callback for every slot in every page ... the
    /// callback inspects `tt`"). The caller, not this method, decides what to
    /// do with `Tag::Free` slots.
    pub fn each_object(&self, mut f: impl FnMut(ObjRef)) {
        let mut cursor = self.lists.all.get();
        while let Some(page_ptr) = cursor {
            let page = unsafe { page_ptr.as_ref() };
            cursor = page.next.get();
            for slot in page.slots() {
                // SAFETY: the slot is owned by this page, which outlives
                // this call.
                f(unsafe { ObjRef::from_raw(NonNull::from(slot)) });
            }
        }
    }

    /// Write barrier hook for a field store (`mrb_field_write_barrier`).
    /// Inert: this collector never runs incrementally, so no tri-color
    /// invariant can be violated between a black object and a white target
    /// (Non-goals: incremental collection).
    pub fn field_write_barrier(&self, _owner: ObjRef, _target: ObjRef) {}

    /// Write barrier hook for an object transitioning state
    /// (`mrb_write_barrier`). Inert for the same reason as
    /// [`Heap::field_write_barrier`].
    pub fn write_barrier(&self, _obj: ObjRef) {}
}

impl Drop for Heap {
    /// Finalizes every still-live object and releases every page
    /// (`mrb_free_heap`), used when the whole embedding shuts down.
    fn drop(&mut self) {
        for boxed in &self.pages {
            for slot in boxed.slots() {
                if slot.header.tag() != Tag::Free {
                    crate::finalize::finalize_slot(slot);
                }
            }
        }
    }
}
