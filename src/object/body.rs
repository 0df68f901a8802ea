//! Concrete sidecar layouts for every heap-resident variant (§3, §4.F, §4.H).
//!
//! The interpreter/class-table/string-array-hash *semantics* are out of
//! scope for this crate (spec.md §1), but the GC still owns and must
//! define the *memory* each variant carries, since it is the one that
//! marks and frees it.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use rust_alloc::boxed::Box;
use rust_alloc::rc::Rc;
use rust_alloc::string::String;
use thin_vec::ThinVec;

use crate::context::Context;
use crate::object::ObjRef;
use crate::value::{Symbol, Value};

pub type InstanceVars = HashMap<Symbol, Value, FxBuildHasher>;

/// `OBJECT`'s instance variable table (§4.F/§4.H "mark/free instance
/// variable table").
#[derive(Default)]
pub struct InstanceData {
    pub iv: InstanceVars,
}

/// The method table `CLASS`/`MODULE`/`SCLASS` mark and free "delegated to
/// a collaborator" (§4.F/§4.H) — here, a plain symbol-to-proc map.
#[derive(Default)]
pub struct MethodTable {
    pub methods: HashMap<Symbol, ObjRef, FxBuildHasher>,
}

impl MethodTable {
    pub fn iter(&self) -> impl Iterator<Item = &ObjRef> {
        self.methods.values()
    }
}

/// Shared body for `CLASS`, `MODULE`, `SCLASS` (mruby's `struct RClass`):
/// a method table, a superclass link, and (because the mark switch falls
/// through to the object case) an instance variable table.
#[derive(Default)]
pub struct ClassData {
    pub mtable: MethodTable,
    pub super_: Option<ObjRef>,
    pub iv: InstanceVars,
}

/// `ICLASS`, the included-module proxy. Per §4.F its mark arm only traces
/// `super`; it does not own (and so does not mark or free) a method table
/// or instance variables of its own — it shares the module's.
pub struct IClassData {
    pub super_: Option<ObjRef>,
}

pub struct ProcData {
    pub env: Option<ObjRef>,
    pub target_class: Option<ObjRef>,
}

/// A closure environment. `stack` is only owned (and so only marked/freed)
/// when `cioff < 0`, i.e. the environment has been detached from the
/// execution context that originally held its registers (§4.F, §4.H).
pub struct EnvData {
    pub cioff: i32,
    pub stack: Option<ThinVec<Value>>,
}

impl EnvData {
    pub fn is_detached(&self) -> bool {
        self.cioff < 0
    }
}

pub struct FiberData {
    pub context: Box<Context>,
}

/// Backing storage shared by more than one `ARRAY` (mruby's
/// `MRB_ARY_SHARED` / `aux.shared`). Reference-counted: the finalizer
/// decrements and only the last owner frees the buffer (§3 Ownership,
/// §4.H, §8 scenario 4).
pub struct SharedArrayAux {
    pub buf: core::cell::RefCell<ThinVec<Value>>,
}

pub enum ArrayData {
    Owned(ThinVec<Value>),
    Shared(Rc<SharedArrayAux>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::Owned(v) => v.len(),
            ArrayData::Shared(aux) => aux.buf.borrow().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<Value> {
        match self {
            ArrayData::Owned(v) => v.get(i).copied(),
            ArrayData::Shared(aux) => aux.buf.borrow().get(i).copied(),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, ArrayData::Shared(_))
    }

    /// The shared aux's current strong count, for tests observing §8
    /// scenario 4 ("aux refcount decremented to 1").
    pub fn shared_refcount(&self) -> Option<usize> {
        match self {
            ArrayData::Shared(aux) => Some(Rc::strong_count(aux)),
            ArrayData::Owned(_) => None,
        }
    }
}

/// `HASH` carries its own instance variable table in addition to the table
/// proper — unlike `STRING`/`ARRAY`/`RANGE` (§9 open question, implemented
/// literally as the spec directs: HASH finalizes and marks both).
#[derive(Default)]
pub struct HashData {
    pub iv: InstanceVars,
    pub table: HashMap<Value, Value, FxBuildHasher>,
}

pub struct RangeEdges {
    pub beg: Value,
    pub end: Value,
    pub exclusive: bool,
}

/// `edges` is nullable (§4.F: "if edges non-null, mark edges->beg and
/// edges->end").
#[derive(Default)]
pub struct RangeData {
    pub edges: Option<Box<RangeEdges>>,
}

/// A user-supplied opaque payload with a free hook (mruby's `mrb_data_type`
/// / `RData`).
pub struct DataBox {
    pub type_name: &'static str,
    pub inner: Option<Box<dyn core::any::Any>>,
    pub dfree: Option<fn(Box<dyn core::any::Any>)>,
    pub iv: InstanceVars,
}

/// The tagged sum every `Slot` body is one of (§3, §9 design note: "model
/// this as a tagged sum over the variant set").
pub enum Body {
    Free,
    Float(f64),
    Object(InstanceData),
    Class(ClassData),
    Module(ClassData),
    SClass(ClassData),
    IClass(IClassData),
    Proc(ProcData),
    Env(EnvData),
    Fiber(FiberData),
    Array(ArrayData),
    Hash(HashData),
    String(String),
    Range(RangeData),
    Data(DataBox),
}
