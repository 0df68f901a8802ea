//! The object header, the closed variant tag set, and the uniform slot
//! that every page is an array of (§3).

mod body;

pub use body::{
    ArrayData, Body, ClassData, DataBox, EnvData, FiberData, HashData, IClassData, InstanceData,
    InstanceVars, MethodTable, ProcData, RangeData, RangeEdges, SharedArrayAux,
};

use core::cell::{Cell, UnsafeCell};
use core::hash::{Hash, Hasher};
use core::ptr::NonNull;

/// The closed set of heap-resident variants (§3). `FALSE`/`TRUE`/`FIXNUM`/
/// `SYMBOL` from the spec's variant list are immediates (`crate::Value`)
/// and never get a `Slot`, so they are not tags here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Free,
    Float,
    Object,
    Class,
    Module,
    SClass,
    IClass,
    Proc,
    Env,
    Fiber,
    Array,
    Hash,
    String,
    Range,
    Data,
}

/// Collector color (§3 invariant 5). Only two colors are stored; gray is
/// implicit on the native call stack of the recursive marker (§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

/// The common header prefix shared by every heap object.
pub struct Header {
    tt: Cell<Tag>,
    color: Cell<Color>,
    class: Cell<Option<NonNull<Slot>>>,
}

impl Header {
    fn new(tt: Tag, class: Option<ObjRef>) -> Self {
        Self {
            tt: Cell::new(tt),
            // objects are born white; the arena roots them instead of
            // a born-black scheme so a collection mid-allocation-burst
            // cannot sweep a temporary that hasn't been pinned yet.
            color: Cell::new(Color::White),
            class: Cell::new(class.map(|o| o.0)),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tt.get()
    }

    pub(crate) fn set_tag(&self, tag: Tag) {
        self.tt.set(tag);
    }

    pub fn color(&self) -> Color {
        self.color.get()
    }

    pub(crate) fn set_color(&self, color: Color) {
        self.color.set(color);
    }

    pub fn is_white(&self) -> bool {
        self.color.get() == Color::White
    }

    pub fn class(&self) -> Option<ObjRef> {
        self.class.get().map(ObjRef)
    }

    pub fn set_class(&self, class: Option<ObjRef>) {
        self.class.set(class.map(|o| o.0));
    }
}

/// A fixed-size slot: the header plus a tagged-sum body, uniformly sized so
/// every slot in a page can hold any variant (§3 "uniform slot"). Freed
/// slots reuse `free_next` as the page free-list's intrusive pointer; a
/// dedicated `Cell` stands in for the original's byte-overlay trick since a
/// live Rust enum's bytes cannot be safely reinterpreted as a raw pointer
/// (see DESIGN.md).
pub struct Slot {
    pub(crate) header: Header,
    body: UnsafeCell<Body>,
    pub(crate) free_next: Cell<Option<NonNull<Slot>>>,
}

// SAFETY: the collector is single-threaded and stop-the-world (§5); nothing
// in this crate sends a `Slot` across threads, this only documents that the
// `Cell`/`UnsafeCell` fields are not a `Sync`/`Send` violation for our use.
unsafe impl Send for Slot {}

impl Slot {
    pub(crate) fn new_free(prev: Option<NonNull<Slot>>) -> Self {
        Self {
            header: Header::new(Tag::Free, None),
            body: UnsafeCell::new(Body::Free),
            free_next: Cell::new(prev),
        }
    }

    /// Turns a free slot into a live object of `tag`/`class`, zeroing the
    /// body (§4.C step 3).
    pub(crate) fn initialize(&self, tag: Tag, class: Option<ObjRef>, body: Body) {
        debug_assert_eq!(self.header.tag(), Tag::Free, "slot wasn't on the free-list");
        self.header.set_tag(tag);
        self.header.set_color(Color::White);
        self.header.set_class(class);
        // SAFETY: nothing else holds a live reference into the body of a
        // slot that was, until this call, `Body::Free` on a free-list.
        unsafe {
            *self.body.get() = body;
        }
    }

    /// Read-only access to the body, used by the marker and by field
    /// accessors. Sound because the mutator never runs concurrently with a
    /// mark/sweep pass (§5), and nothing else takes `&mut` to the body
    /// outside of `finalize`/`initialize`.
    pub fn body(&self) -> &Body {
        unsafe { &*self.body.get() }
    }

    /// Replaces the body with `Body::Free`, returning the old value so the
    /// caller (the finalizer, §4.H) can release its owned sidecars.
    pub(crate) fn take_body(&self) -> Body {
        // SAFETY: called only from the sweeper, which has exclusive access
        // to the heap while the mutator is stopped (§5).
        unsafe { core::mem::replace(&mut *self.body.get(), Body::Free) }
    }

    pub(crate) fn set_free_next(&self, next: Option<NonNull<Slot>>) {
        self.free_next.set(next);
    }
}

/// A handle to a heap-resident object: the address of its `Slot`.
///
/// Deliberately `Copy` and address-sized, matching the teacher crate's
/// `ArenaPointer`/`ErasedArenaPointer` pattern of a thin `NonNull` wrapper
/// that the rest of the crate treats as an opaque handle.
#[derive(Clone, Copy)]
pub struct ObjRef(pub(crate) NonNull<Slot>);

impl ObjRef {
    /// # Safety
    /// `ptr` must point at a live `Slot` for as long as the returned
    /// `ObjRef` is used.
    pub(crate) unsafe fn from_raw(ptr: NonNull<Slot>) -> Self {
        Self(ptr)
    }

    pub(crate) fn as_slot(&self) -> &Slot {
        // SAFETY: `ObjRef`s are only ever constructed from a live slot
        // and the collector never moves slots.
        unsafe { self.0.as_ref() }
    }

    pub fn tag(&self) -> Tag {
        self.as_slot().header.tag()
    }

    pub fn body(&self) -> &Body {
        self.as_slot().body()
    }

    pub fn class(&self) -> Option<ObjRef> {
        self.as_slot().header.class()
    }
}

impl core::fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ObjRef({:?}, {:?})", self.0, self.tag())
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for ObjRef {}

impl Hash for ObjRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ptr().hash(state);
    }
}
