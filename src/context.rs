//! Execution contexts and compiled units — the two non-arena root sources
//! traced by `mark_context` and the constant-pool walk (§4.E).
//!
//! These are "external collaborator" concerns (spec.md §1: the
//! interpreter/bytecode layer is out of scope), but the GC still needs a
//! concrete shape to walk, so minimal real layouts are defined here rather
//! than stubbed out.

use core::cell::Cell;
use core::ptr::NonNull;

use rust_alloc::vec::Vec;

use crate::object::ObjRef;
use crate::value::Value;

/// One activation record in the call-info chain (`mrb_callinfo`).
#[derive(Clone, Copy, Default)]
pub struct CallInfo {
    pub env: Option<ObjRef>,
    pub proc: Option<ObjRef>,
    pub target_class: Option<ObjRef>,
    /// Registers this frame claims off the shared value stack.
    pub nregs: usize,
    /// How many of `Context::ensure` belong to this frame.
    pub eidx: usize,
}

/// A fiber/coroutine's execution context (`mrb_context`).
///
/// `prev` is a non-owning link to the context that resumed into this one;
/// `fiber` is the reverse link used by `mark_context`'s last rule ("if
/// `c->prev` exists and it has a backing fiber object, mark that fiber").
pub struct Context {
    /// Register stack storage (`stbase`).
    pub stbase: Vec<Value>,
    /// `c->stack - c->stbase`: index of the next free register.
    pub stack_len: usize,
    /// Clamp bound (`stend - stbase`); never walk past this even if a
    /// frame's `nregs` would overshoot.
    pub stend: usize,
    pub ensure: Vec<ObjRef>,
    pub cibase: Vec<CallInfo>,
    /// Index of the current frame (`ci`) within `cibase`.
    pub ci_index: usize,
    pub prev: Cell<Option<NonNull<Context>>>,
    pub fiber: Cell<Option<ObjRef>>,
}

impl Context {
    pub fn new(stack_capacity: usize) -> Self {
        Self {
            stbase: Vec::with_capacity(stack_capacity),
            stack_len: 0,
            stend: stack_capacity,
            ensure: Vec::new(),
            cibase: Vec::new(),
            ci_index: 0,
            prev: Cell::new(None),
            fiber: Cell::new(None),
        }
    }

    pub fn current_ci(&self) -> Option<&CallInfo> {
        self.cibase.get(self.ci_index)
    }

    /// Number of value-stack slots to mark: `stack_len` plus the current
    /// frame's register count, clamped to `stend` (§4.E).
    pub fn mark_len(&self) -> usize {
        let mut e = self.stack_len;
        if let Some(ci) = self.current_ci() {
            e += ci.nregs;
        }
        e.min(self.stend).min(self.stbase.len())
    }

    /// Number of ensure-stack entries belonging to the current frame.
    pub fn ensure_len(&self) -> usize {
        self.current_ci().map_or(0, |ci| ci.eidx).min(self.ensure.len())
    }

    /// The call-info chain from `cibase` through the current frame,
    /// inclusive (§4.E: "from `c->cibase` through `c->ci`").
    pub fn call_chain(&self) -> &[CallInfo] {
        let end = (self.ci_index + 1).min(self.cibase.len());
        &self.cibase[..end]
    }

    /// # Safety
    /// `prev` must outlive `self` or be cleared before it is freed.
    pub unsafe fn set_prev(&self, prev: Option<NonNull<Context>>) {
        self.prev.set(prev);
    }

    pub fn prev(&self) -> Option<&Context> {
        // SAFETY: callers of `set_prev` guarantee `prev` stays valid.
        self.prev.get().map(|p| unsafe { p.as_ref() })
    }
}

/// One loaded compiled unit's constant pool (`mrb_irep`). Only the pool is
/// modeled — bytecode itself carries no GC references.
#[derive(Default)]
pub struct Irep {
    pub pool: Vec<Value>,
}
