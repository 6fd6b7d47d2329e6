//! A small reference-counted, garbage-collected object runtime.
//!
//! Objects live in raw, C-layout memory obtained from [`alloc`], every object
//! starts with the same two-word header and GC-tracked objects carry a
//! [`GcHead`] immediately before their first byte. Type descriptors hold an
//! attribute table and function-pointer slot tables; operators are dispatched
//! through those slots only, never through attribute lookup.
//!
//! This is the heap the rest of the crate inspects. It deliberately exposes
//! its internals (`Raw*` structs, slot tables, the allocation registry) so
//! that layout tables can be validated against it.

pub mod abstract_ops;
pub mod alloc;
pub mod dict;
pub mod object;
pub mod objects;
pub mod slots;
pub mod types;

#[cfg(test)]
mod runtime_tests;

pub use abstract_ops::{
    binary_op, call, call_method, descr_get, getattr, hash, item, length, negate, repr, truthy,
    BinaryOp,
};
pub use dict::{dict, dict_del, dict_get, dict_items, dict_set, keys_equal, DictEntry, RawDict, RawDictKeys};
pub use object::{decref, incref, GcHead, ObjRef, RawObject, RawVarObject, GC_HEAD_SIZE};
pub use objects::*;
pub use types::{
    flags, builtin_type, is_type, new_type, type_del_attr, type_lookup, type_name, type_own_attr,
    type_set_attr, BuiltinType, NumberMethods, RawType, SequenceMethods,
};

use std::{cell::RefCell, ptr};
use thiserror::Error;

/// Major and minor version of the runtime's binary layout.
pub const BUILD_VERSION: (u16, u16) = (1, 1);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("TypeError: {0}")]
    Type(String),
    #[error("AttributeError: type object '{owner}' has no attribute '{name}'")]
    Attribute { owner: String, name: String },
    #[error("TypeError: cannot set '{name}' attribute of immutable type '{owner}'")]
    ImmutableType { owner: String, name: String },
    #[error("TypeError: '{0}' object is not callable")]
    NotCallable(String),
    #[error("IndexError: {0}")]
    Index(String),
    #[error("KeyError: {0}")]
    Key(String),
    #[error("OverflowError: {0}")]
    Overflow(String),
    #[error("MemoryError: failed to allocate {0} bytes")]
    OutOfMemory(usize),
    #[error("SystemError: {0}")]
    System(String),
}

thread_local! {
    static CURRENT_ERROR: RefCell<Option<RuntimeError>> = const { RefCell::new(None) };
}

/// Record `err` as the pending error of this thread and return the NULL
/// object pointer slot functions use to signal failure.
pub(crate) fn raise(err: RuntimeError) -> *mut RawObject {
    CURRENT_ERROR.with(|e| *e.borrow_mut() = Some(err));
    ptr::null_mut()
}

/// Take the pending error. A missing error is itself reported as one.
pub(crate) fn take_error() -> RuntimeError {
    try_take_error()
        .unwrap_or_else(|| RuntimeError::System("slot returned NULL without setting an error".into()))
}

pub(crate) fn try_take_error() -> Option<RuntimeError> {
    CURRENT_ERROR.with(|e| e.borrow_mut().take())
}
