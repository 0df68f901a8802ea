//! A page-backed object heap and tracing mark-sweep garbage collector for an
//! embeddable dynamic-language runtime.
//!
//! Objects live in fixed-size slots carved out of fixed-size pages; a stop-
//! the-world mark pass traces roots (globals, the C-API arena, the class
//! hierarchy, and every live execution context) and paints reachable objects
//! black, then a sweep pass reclaims everything left white and retires pages
//! that have gone fully idle.

#![no_std]

extern crate alloc as rust_alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod alloc_facade;
pub mod arena;
pub mod config;
pub mod context;
pub mod error;
pub mod finalize;
pub mod heap;
pub mod mark;
pub mod object;
pub mod page;
pub mod roots;
pub mod sweep;
pub mod value;

pub use config::{CompatSettings, GcConfig};
pub use error::GcError;
pub use heap::Heap;
pub use object::{ObjRef, Tag};
pub use value::{Symbol, Value};
