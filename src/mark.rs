//! The mark phase: a recursive tri-color trace over every reachable object
//! (§4.F). Gray is never stored — the native call stack plays the gray set,
//! exactly as the original's recursive `gc_mark` does.

use crate::object::{Body, ObjRef};
use crate::value::Value;

/// Marks `obj` black and recurses into everything it references, unless it
/// is already black (cycle/DAG guard).
pub fn mark_object(obj: ObjRef) {
    let slot = obj.as_slot();
    if !slot.header.is_white() {
        return;
    }
    slot.header.set_color(crate::object::Color::Black);

    if let Some(class) = obj.class() {
        mark_object(class);
    }

    match obj.body() {
        // A free slot cannot genuinely be reachable, but §7 directs the
        // marker to treat unexpected tags as benign and skip rather than
        // abort, so this is a no-op rather than a panic.
        Body::Free => {}
        Body::Float(_) => {}
        Body::Object(data) => mark_instance_vars(&data.iv),
        Body::Class(data) | Body::Module(data) | Body::SClass(data) => {
            for target in data.mtable.iter() {
                mark_object(*target);
            }
            if let Some(sup) = data.super_ {
                mark_object(sup);
            }
            mark_instance_vars(&data.iv);
        }
        Body::IClass(data) => {
            if let Some(sup) = data.super_ {
                mark_object(sup);
            }
        }
        Body::Proc(data) => {
            if let Some(env) = data.env {
                mark_object(env);
            }
            if let Some(target_class) = data.target_class {
                mark_object(target_class);
            }
        }
        Body::Env(data) => {
            if data.is_detached() {
                if let Some(stack) = &data.stack {
                    for value in stack.iter() {
                        mark_value(*value);
                    }
                }
            }
        }
        Body::Fiber(data) => {
            mark_context(&data.context);
        }
        Body::Array(data) => match data {
            crate::object::ArrayData::Owned(v) => {
                for value in v.iter() {
                    mark_value(*value);
                }
            }
            crate::object::ArrayData::Shared(aux) => {
                for value in aux.buf.borrow().iter() {
                    mark_value(*value);
                }
            }
        },
        Body::Hash(data) => {
            mark_instance_vars(&data.iv);
            for (key, value) in data.table.iter() {
                mark_value(*key);
                mark_value(*value);
            }
        }
        Body::String(_) => {}
        Body::Range(data) => {
            if let Some(edges) = &data.edges {
                mark_value(edges.beg);
                mark_value(edges.end);
            }
        }
        Body::Data(data) => mark_instance_vars(&data.iv),
    }
}

fn mark_value(value: Value) {
    if let Some(obj) = value.as_heap() {
        mark_object(obj);
    }
}

fn mark_instance_vars(iv: &crate::object::InstanceVars) {
    for value in iv.values() {
        mark_value(*value);
    }
}

/// Traces a single execution context: the live portion of its value stack,
/// the live portion of its ensure stack, every call-info frame's `env` /
/// `proc` / `target_class`, and — if it resumed from another fiber — that
/// fiber object too (§4.E).
pub fn mark_context(ctx: &crate::context::Context) {
    let mark_len = ctx.mark_len();
    for value in &ctx.stbase[..mark_len] {
        mark_value(*value);
    }

    let ensure_len = ctx.ensure_len();
    for obj in &ctx.ensure[..ensure_len] {
        mark_object(*obj);
    }

    for ci in ctx.call_chain() {
        if let Some(env) = ci.env {
            mark_object(env);
        }
        if let Some(proc) = ci.proc {
            mark_object(proc);
        }
        if let Some(target_class) = ci.target_class {
            mark_object(target_class);
        }
    }

    if let Some(prev) = ctx.prev() {
        if let Some(fiber) = prev.fiber.get() {
            mark_object(fiber);
        }
    }
}

/// Marks every loaded compiled unit's constant pool (§4.E point 7).
pub fn mark_ireps<'a>(ireps: impl Iterator<Item = &'a crate::context::Irep>) {
    for irep in ireps {
        for value in &irep.pool {
            mark_value(*value);
        }
    }
}
