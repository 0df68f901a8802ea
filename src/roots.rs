//! Root enumeration (§4.E): everything the mark phase starts from besides
//! the arena (component D, traced by the heap directly) — the global
//! variable table, the class hierarchy's root class, the top-level self
//! object, and the in-flight exception, if any.
//!
//! Execution-context and constant-pool root tracing lives in
//! [`crate::mark::mark_context`] / [`crate::mark::mark_ireps`] since both
//! need direct access to the mark dispatch; this module only owns the data
//! those don't cover.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::mark::mark_object;
use crate::object::ObjRef;
use crate::value::{Symbol, Value};

/// Root sources that are not themselves heap objects requiring their own
/// slot: the global variable table, the object-class root, top-self, and
/// the current exception (`mrb_gc_mark_gv`, `mrb->object_class`,
/// `mrb->top_self`, `mrb->exc` in the original).
#[derive(Default)]
pub struct GlobalRoots {
    pub globals: HashMap<Symbol, Value, FxBuildHasher>,
    pub object_class: Option<ObjRef>,
    pub top_self: Option<ObjRef>,
    pub exc: Option<ObjRef>,
}

impl GlobalRoots {
    /// Marks every global variable's value, then the three singleton roots
    /// that are always alive for the lifetime of the runtime.
    pub fn mark(&self) {
        for value in self.globals.values() {
            if let Some(obj) = value.as_heap() {
                mark_object(obj);
            }
        }
        if let Some(object_class) = self.object_class {
            mark_object(object_class);
        }
        if let Some(top_self) = self.top_self {
            mark_object(top_self);
        }
        if let Some(exc) = self.exc {
            mark_object(exc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Body, InstanceData, Tag};
    use crate::page::Page;

    #[test]
    fn global_table_values_are_marked() {
        let page = Page::new(1);
        let obj = page.pop_free().unwrap();
        obj.as_slot()
            .initialize(Tag::Object, None, Body::Object(InstanceData::default()));

        let mut roots = GlobalRoots::default();
        roots.globals.insert(Symbol(0), Value::Heap(obj));
        roots.mark();

        assert_eq!(obj.as_slot().header.color(), crate::object::Color::Black);
    }
}
