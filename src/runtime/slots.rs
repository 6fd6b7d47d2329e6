//! Slot trampolines.
//!
//! Each function here has the signature of a type slot and forwards the call
//! to the matching special attribute found by attribute lookup on the
//! receiver's type. Installing one into a slot table makes the operator
//! follow whatever the attribute table currently holds.

use super::{
    abstract_ops::{call, descr_get},
    object::{ObjRef, RawObject},
    objects::{self, has_flag, int, int_value},
    raise, take_error,
    types::{flags, type_lookup, type_name},
    RuntimeError,
};
use std::ffi::c_int;

fn call_special(op: *mut RawObject, name: &str, args: &[ObjRef]) -> Result<ObjRef, RuntimeError> {
    let obj = unsafe { ObjRef::from_borrowed(op) }
        .ok_or_else(|| RuntimeError::System(format!("{} called on NULL", name)))?;
    let ty = obj.type_object();
    let attr = type_lookup(&ty, name).ok_or_else(|| RuntimeError::Attribute {
        owner: type_name(&ty),
        name: name.to_string(),
    })?;
    let bound = descr_get(&attr, Some(&obj), &ty)?;
    call(&bound, args)
}

fn borrowed(op: *mut RawObject) -> Result<ObjRef, RuntimeError> {
    unsafe { ObjRef::from_borrowed(op) }.ok_or_else(take_error)
}

fn to_raw(result: Result<ObjRef, RuntimeError>) -> *mut RawObject {
    match result {
        Ok(obj) => obj.into_raw(),
        Err(e) => raise(e),
    }
}

fn binary(name: &str, a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    to_raw(borrowed(b).and_then(|b| call_special(a, name, &[b])))
}

pub unsafe extern "C" fn slot_nb_add(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    binary("__add__", a, b)
}

pub unsafe extern "C" fn slot_nb_subtract(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    binary("__sub__", a, b)
}

pub unsafe extern "C" fn slot_nb_multiply(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    binary("__mul__", a, b)
}

pub unsafe extern "C" fn slot_nb_matrix_multiply(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    binary("__matmul__", a, b)
}

pub unsafe extern "C" fn slot_nb_negative(op: *mut RawObject) -> *mut RawObject {
    to_raw(call_special(op, "__neg__", &[]))
}

fn int_result(name: &str, result: Result<ObjRef, RuntimeError>) -> Result<i64, RuntimeError> {
    let value = result?;
    int_value(&value).map_err(|_| {
        RuntimeError::Type(format!(
            "{} should return an int, not '{}'",
            name,
            value.type_name()
        ))
    })
}

pub unsafe extern "C" fn slot_nb_bool(op: *mut RawObject) -> c_int {
    match int_result("__bool__", call_special(op, "__bool__", &[])) {
        Ok(v) => (v != 0) as c_int,
        Err(e) => {
            raise(e);
            -1
        }
    }
}

pub unsafe extern "C" fn slot_sq_length(op: *mut RawObject) -> isize {
    let result = int_result("__len__", call_special(op, "__len__", &[])).and_then(|n| {
        if n < 0 {
            Err(RuntimeError::Type("__len__() should return >= 0".into()))
        } else {
            Ok(n as isize)
        }
    });
    match result {
        Ok(n) => n,
        Err(e) => {
            raise(e);
            -1
        }
    }
}

pub unsafe extern "C" fn slot_sq_item(op: *mut RawObject, index: isize) -> *mut RawObject {
    to_raw(int(index as i64).and_then(|i| call_special(op, "__getitem__", &[i])))
}

pub unsafe extern "C" fn slot_tp_repr(op: *mut RawObject) -> *mut RawObject {
    let result = call_special(op, "__repr__", &[]).and_then(|r| {
        if has_flag(&r, flags::BYTES_SUBCLASS) {
            Ok(r)
        } else {
            Err(RuntimeError::Type(format!(
                "__repr__ returned non-string (type {})",
                r.type_name()
            )))
        }
    });
    to_raw(result)
}

pub unsafe extern "C" fn slot_tp_hash(op: *mut RawObject) -> isize {
    match int_result("__hash__", call_special(op, "__hash__", &[])) {
        Ok(-1) => -2,
        Ok(h) => h as isize,
        Err(e) => {
            raise(e);
            -1
        }
    }
}

/// Text result helper for functions installed as `__repr__`.
pub fn repr_result(text: &str) -> Result<ObjRef, RuntimeError> {
    objects::bytes(text.as_bytes())
}
