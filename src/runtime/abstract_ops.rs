//! Generic operations: attribute access, calls and slot-dispatched operators.

use super::{
    object::ObjRef,
    objects::{self, has_flag, invoke_function, text},
    take_error, try_take_error,
    types::{
        builtin_type_ptr, flags, is_type, type_lookup, type_name, BinaryFunc, BuiltinType, HashFunc,
        InquiryFunc, LenFunc, RawType, SizeArgFunc, UnaryFunc,
    },
    RuntimeError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    MatrixMultiply,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::MatrixMultiply => "@",
        }
    }

    pub fn dunder(self) -> &'static str {
        match self {
            BinaryOp::Add => "__add__",
            BinaryOp::Subtract => "__sub__",
            BinaryOp::Multiply => "__mul__",
            BinaryOp::MatrixMultiply => "__matmul__",
        }
    }

    fn slot(self, ty: &RawType) -> Option<BinaryFunc> {
        let nb = unsafe { ty.tp_as_number.as_ref() }?;
        match self {
            BinaryOp::Add => nb.nb_add,
            BinaryOp::Subtract => nb.nb_subtract,
            BinaryOp::Multiply => nb.nb_multiply,
            BinaryOp::MatrixMultiply => nb.nb_matrix_multiply,
        }
    }
}

pub(crate) fn expect_args(name: &str, args: &[ObjRef], count: usize) -> Result<(), RuntimeError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(RuntimeError::Type(format!(
            "{}() takes {} arguments ({} given)",
            name,
            count,
            args.len()
        )))
    }
}

fn new_ref(ptr: *mut super::RawObject) -> Result<ObjRef, RuntimeError> {
    // SAFETY: slot functions return a new reference or NULL with an error set
    unsafe { ObjRef::from_owned(ptr) }.ok_or_else(take_error)
}

fn check_code<T: PartialEq + From<i8>>(code: T) -> Result<T, RuntimeError> {
    if code == T::from(-1) {
        if let Some(e) = try_take_error() {
            return Err(e);
        }
    }
    Ok(code)
}

pub(crate) fn call_unary(f: UnaryFunc, obj: &ObjRef) -> Result<ObjRef, RuntimeError> {
    new_ref(unsafe { f(obj.as_ptr()) })
}

pub(crate) fn call_binary(f: BinaryFunc, a: &ObjRef, b: &ObjRef) -> Result<ObjRef, RuntimeError> {
    new_ref(unsafe { f(a.as_ptr(), b.as_ptr()) })
}

pub(crate) fn call_hash(f: HashFunc, obj: &ObjRef) -> Result<isize, RuntimeError> {
    check_code(unsafe { f(obj.as_ptr()) })
}

pub(crate) fn call_inquiry(f: InquiryFunc, obj: &ObjRef) -> Result<bool, RuntimeError> {
    check_code(unsafe { f(obj.as_ptr()) }).map(|v| v != 0)
}

pub(crate) fn call_len(f: LenFunc, obj: &ObjRef) -> Result<isize, RuntimeError> {
    check_code(unsafe { f(obj.as_ptr()) })
}

pub(crate) fn call_size_arg(f: SizeArgFunc, obj: &ObjRef, index: isize) -> Result<ObjRef, RuntimeError> {
    new_ref(unsafe { f(obj.as_ptr(), index) })
}

fn raw_type(obj: &ObjRef) -> &RawType {
    // every live object has a type
    unsafe { obj.type_ptr().as_ref() }
        .unwrap_or_else(|| panic!("object at {:#x} has a NULL type", obj.address()))
}

pub fn call(func: &ObjRef, args: &[ObjRef]) -> Result<ObjRef, RuntimeError> {
    if has_flag(func, flags::FUNCTION_SUBCLASS) {
        unsafe { invoke_function(func.as_ptr(), args) }
    } else {
        Err(RuntimeError::NotCallable(func.type_name()))
    }
}

fn bind(func: &ObjRef, first: &ObjRef) -> Result<ObjRef, RuntimeError> {
    let name = objects::function_name(func).unwrap_or_else(|| "?".to_string());
    let func = func.clone();
    let first = first.clone();
    objects::function(&name, move |args| {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(first.clone());
        full.extend_from_slice(args);
        call(&func, &full)
    })
}

fn is_builtin(obj: &ObjRef, which: BuiltinType) -> bool {
    obj.type_ptr() == builtin_type_ptr(which)
}

/// Apply the descriptor protocol to a value found on a type.
pub fn descr_get(attr: &ObjRef, instance: Option<&ObjRef>, owner: &ObjRef) -> Result<ObjRef, RuntimeError> {
    if is_builtin(attr, BuiltinType::StaticMethod) {
        return objects::wrapped(attr).ok_or_else(|| RuntimeError::System("empty staticmethod".into()));
    }
    if is_builtin(attr, BuiltinType::ClassMethod) {
        let inner = objects::wrapped(attr).ok_or_else(|| RuntimeError::System("empty classmethod".into()))?;
        return bind(&inner, owner);
    }
    if is_builtin(attr, BuiltinType::Property) {
        return match instance {
            Some(instance) => {
                let getter = objects::wrapped(attr)
                    .ok_or_else(|| RuntimeError::System("empty property".into()))?;
                call(&getter, std::slice::from_ref(instance))
            }
            None => Ok(attr.clone()),
        };
    }
    match instance {
        Some(instance) if has_flag(attr, flags::FUNCTION_SUBCLASS) => bind(attr, instance),
        _ => Ok(attr.clone()),
    }
}

pub fn getattr(obj: &ObjRef, name: &str) -> Result<ObjRef, RuntimeError> {
    if is_type(obj) {
        if let Some(found) = type_lookup(obj, name) {
            return descr_get(&found, None, obj);
        }
        return Err(RuntimeError::Attribute {
            owner: type_name(obj),
            name: name.to_string(),
        });
    }
    let ty = obj.type_object();
    match type_lookup(&ty, name) {
        Some(found) => descr_get(&found, Some(obj), &ty),
        None => Err(RuntimeError::Attribute {
            owner: type_name(&ty),
            name: name.to_string(),
        }),
    }
}

pub fn call_method(obj: &ObjRef, name: &str, args: &[ObjRef]) -> Result<ObjRef, RuntimeError> {
    call(&getattr(obj, name)?, args)
}

pub fn binary_op(op: BinaryOp, a: &ObjRef, b: &ObjRef) -> Result<ObjRef, RuntimeError> {
    match op.slot(raw_type(a)) {
        Some(f) => call_binary(f, a, b),
        None => Err(RuntimeError::Type(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            a.type_name(),
            b.type_name()
        ))),
    }
}

pub fn negate(obj: &ObjRef) -> Result<ObjRef, RuntimeError> {
    let slot = unsafe { raw_type(obj).tp_as_number.as_ref() }.and_then(|nb| nb.nb_negative);
    match slot {
        Some(f) => call_unary(f, obj),
        None => Err(RuntimeError::Type(format!(
            "bad operand type for unary -: '{}'",
            obj.type_name()
        ))),
    }
}

pub fn truthy(obj: &ObjRef) -> Result<bool, RuntimeError> {
    let ty = raw_type(obj);
    if let Some(f) = unsafe { ty.tp_as_number.as_ref() }.and_then(|nb| nb.nb_bool) {
        return call_inquiry(f, obj);
    }
    if let Some(f) = unsafe { ty.tp_as_sequence.as_ref() }.and_then(|sq| sq.sq_length) {
        return call_len(f, obj).map(|n| n != 0);
    }
    Ok(!objects::is_none(obj))
}

pub fn length(obj: &ObjRef) -> Result<isize, RuntimeError> {
    match unsafe { raw_type(obj).tp_as_sequence.as_ref() }.and_then(|sq| sq.sq_length) {
        Some(f) => call_len(f, obj),
        None => Err(RuntimeError::Type(format!(
            "object of type '{}' has no len()",
            obj.type_name()
        ))),
    }
}

/// Subscript with a possibly negative index.
pub fn item(obj: &ObjRef, index: isize) -> Result<ObjRef, RuntimeError> {
    let Some(f) = unsafe { raw_type(obj).tp_as_sequence.as_ref() }.and_then(|sq| sq.sq_item) else {
        return Err(RuntimeError::Type(format!(
            "'{}' object is not subscriptable",
            obj.type_name()
        )));
    };
    let index = if index < 0 { index + length(obj)? } else { index };
    call_size_arg(f, obj, index)
}

pub fn repr(obj: &ObjRef) -> Result<String, RuntimeError> {
    match raw_type(obj).tp_repr {
        Some(f) => text(&call_unary(f, obj)?),
        None => Ok(format!("<{} object at {:#x}>", obj.type_name(), obj.address())),
    }
}

pub fn hash(obj: &ObjRef) -> Result<isize, RuntimeError> {
    match raw_type(obj).tp_hash {
        Some(f) => call_hash(f, obj),
        None => Err(RuntimeError::Type(format!(
            "unhashable type: '{}'",
            obj.type_name()
        ))),
    }
}
