//! Concrete object layouts, constructors and their native slot functions.

use super::{
    abstract_ops, alloc,
    object::{decref, free_object, incref, ObjRef, RawObject, RawVarObject},
    raise,
    types::{self, builtin_type_ptr, flags, BuiltinType, RawType},
    RuntimeError,
};
use std::{
    ffi::{c_char, c_int, CStr, CString},
    mem::{offset_of, size_of},
    ptr,
};

/// Body of a native function object.
pub type NativeFn = Box<dyn Fn(&[ObjRef]) -> Result<ObjRef, RuntimeError>>;

#[repr(C)]
pub struct RawInt {
    pub ob_base: RawObject,
    pub ob_ival: i64,
}

#[repr(C)]
pub struct RawFloat {
    pub ob_base: RawObject,
    pub ob_fval: f64,
}

/// Bytes are stored inline and always followed by a NUL byte.
#[repr(C)]
pub struct RawBytes {
    pub ob_base: RawVarObject,
    /// Cached hash, -1 until computed.
    pub ob_shash: isize,
    pub ob_sval: [u8; 1],
}

#[repr(C)]
pub struct RawTuple {
    pub ob_base: RawVarObject,
    pub ob_item: [*mut RawObject; 0],
}

#[repr(C)]
pub struct RawList {
    pub ob_base: RawVarObject,
    pub ob_item: *mut *mut RawObject,
    pub allocated: isize,
}

#[repr(C)]
pub struct RawFunction {
    pub ob_base: RawObject,
    pub fn_name: *const c_char,
    pub fn_impl: *mut NativeFn,
}

/// Shared layout of `staticmethod`, `classmethod` and `property`.
#[repr(C)]
pub struct RawWrapper {
    pub ob_base: RawObject,
    pub wrapped: *mut RawObject,
}

pub(crate) fn type_flags(ty: *const RawType) -> u64 {
    unsafe { ty.as_ref() }.map_or(0, |t| t.tp_flags)
}

pub fn has_flag(obj: &ObjRef, flag: u64) -> bool {
    type_flags(obj.type_ptr()) & flag != 0
}

/// Allocate `size` zeroed bytes for an instance of `ty` with a fresh header.
///
/// # Safety
/// `ty` must be a live type descriptor.
pub(crate) unsafe fn alloc_object(ty: *mut RawType, size: usize) -> Result<*mut RawObject, RuntimeError> {
    let gc = type_flags(ty) & flags::HAVE_GC != 0;
    let op = alloc::allocate(size, gc)?.as_ptr().cast::<RawObject>();
    unsafe {
        (*op).ob_refcnt = 1;
        (*op).ob_type = ty;
    }
    if type_flags(ty) & flags::HEAPTYPE != 0 {
        unsafe { incref(ty.cast()) };
    }
    Ok(op)
}

pub(crate) unsafe fn alloc_fixed(ty: *mut RawType) -> Result<*mut RawObject, RuntimeError> {
    let size = unsafe { (*ty).tp_basicsize } as usize;
    unsafe { alloc_object(ty, size) }
}

pub(crate) unsafe fn alloc_int(ty: *mut RawType, value: i64) -> Result<*mut RawObject, RuntimeError> {
    let op = unsafe { alloc_fixed(ty)? };
    unsafe { (*op.cast::<RawInt>()).ob_ival = value };
    Ok(op)
}

pub(crate) unsafe fn alloc_function(
    ty: *mut RawType,
    name: &str,
    body: NativeFn,
) -> Result<*mut RawObject, RuntimeError> {
    let name = CString::new(name)
        .map_err(|_| RuntimeError::Type(format!("function name {:?} contains NUL", name)))?;
    let op = unsafe { alloc_fixed(ty)? };
    let func = op.cast::<RawFunction>();
    unsafe {
        (*func).fn_name = name.into_raw();
        (*func).fn_impl = Box::into_raw(Box::new(body));
    }
    Ok(op)
}

fn owned(op: *mut RawObject) -> Result<ObjRef, RuntimeError> {
    // SAFETY: callers pass freshly allocated objects
    unsafe { ObjRef::from_owned(op) }
        .ok_or_else(|| RuntimeError::System("allocation returned NULL".into()))
}

pub fn int(value: i64) -> Result<ObjRef, RuntimeError> {
    owned(unsafe { alloc_int(builtin_type_ptr(BuiltinType::Int), value)? })
}

/// An int-layout object of an arbitrary int subclass.
pub fn new_int_of_type(ty: &ObjRef, value: i64) -> Result<ObjRef, RuntimeError> {
    if !types::is_type(ty) || type_flags(ty.as_ptr().cast()) & flags::INT_SUBCLASS == 0 {
        return Err(RuntimeError::Type(format!(
            "'{}' is not an int subclass",
            types::type_name(ty)
        )));
    }
    owned(unsafe { alloc_int(ty.as_ptr().cast(), value)? })
}

pub fn float(value: f64) -> Result<ObjRef, RuntimeError> {
    let op = unsafe { alloc_fixed(builtin_type_ptr(BuiltinType::Float))? };
    unsafe { (*op.cast::<RawFloat>()).ob_fval = value };
    owned(op)
}

pub fn boolean(value: bool) -> ObjRef {
    unsafe { ObjRef::from_borrowed(types::bool_ptr(value)) }
        .unwrap_or_else(|| unreachable!("bool singletons are never NULL"))
}

pub fn none() -> ObjRef {
    unsafe { ObjRef::from_borrowed(types::none_ptr()) }
        .unwrap_or_else(|| unreachable!("None is never NULL"))
}

pub fn is_none(obj: &ObjRef) -> bool {
    obj.as_ptr() == types::none_ptr()
}

pub fn bytes(value: &[u8]) -> Result<ObjRef, RuntimeError> {
    let ty = builtin_type_ptr(BuiltinType::Bytes);
    let size = offset_of!(RawBytes, ob_sval) + value.len() + 1;
    let op = unsafe { alloc_object(ty, size)? };
    let raw = op.cast::<RawBytes>();
    unsafe {
        (*raw).ob_base.ob_size = value.len() as isize;
        (*raw).ob_shash = -1;
        let data = ptr::addr_of_mut!((*raw).ob_sval).cast::<u8>();
        ptr::copy_nonoverlapping(value.as_ptr(), data, value.len());
    }
    owned(op)
}

pub fn tuple(items: &[ObjRef]) -> Result<ObjRef, RuntimeError> {
    let ty = builtin_type_ptr(BuiltinType::Tuple);
    let size = offset_of!(RawTuple, ob_item) + items.len() * size_of::<*mut RawObject>();
    let op = unsafe { alloc_object(ty, size)? };
    let raw = op.cast::<RawTuple>();
    unsafe {
        (*raw).ob_base.ob_size = items.len() as isize;
        let slots = tuple_slots(raw);
        for (i, item) in items.iter().enumerate() {
            *slots.add(i) = item.clone().into_raw();
        }
    }
    owned(op)
}

pub fn list(items: &[ObjRef]) -> Result<ObjRef, RuntimeError> {
    let ty = builtin_type_ptr(BuiltinType::List);
    let op = unsafe { alloc_fixed(ty)? };
    let raw = op.cast::<RawList>();
    let buffer = alloc::allocate(items.len() * size_of::<*mut RawObject>(), false);
    let buffer = match buffer {
        Ok(b) => b.as_ptr().cast::<*mut RawObject>(),
        Err(e) => {
            unsafe { free_object(op) };
            return Err(e);
        }
    };
    unsafe {
        for (i, item) in items.iter().enumerate() {
            *buffer.add(i) = item.clone().into_raw();
        }
        (*raw).ob_item = buffer;
        (*raw).allocated = items.len() as isize;
        (*raw).ob_base.ob_size = items.len() as isize;
    }
    owned(op)
}

pub fn function<F>(name: &str, body: F) -> Result<ObjRef, RuntimeError>
where
    F: Fn(&[ObjRef]) -> Result<ObjRef, RuntimeError> + 'static,
{
    let ty = builtin_type_ptr(BuiltinType::Function);
    owned(unsafe { alloc_function(ty, name, Box::new(body))? })
}

fn wrapper(which: BuiltinType, wrapped: &ObjRef) -> Result<ObjRef, RuntimeError> {
    let op = unsafe { alloc_fixed(builtin_type_ptr(which))? };
    unsafe { (*op.cast::<RawWrapper>()).wrapped = wrapped.clone().into_raw() };
    owned(op)
}

pub fn staticmethod(wrapped: &ObjRef) -> Result<ObjRef, RuntimeError> {
    wrapper(BuiltinType::StaticMethod, wrapped)
}

pub fn classmethod(wrapped: &ObjRef) -> Result<ObjRef, RuntimeError> {
    wrapper(BuiltinType::ClassMethod, wrapped)
}

/// A read-only property calling `getter(instance)`.
pub fn property(getter: &ObjRef) -> Result<ObjRef, RuntimeError> {
    wrapper(BuiltinType::Property, getter)
}

/// The callable inside a `staticmethod`, `classmethod` or `property`.
pub fn wrapped(obj: &ObjRef) -> Option<ObjRef> {
    let ty = obj.type_ptr();
    let is_wrapper = [BuiltinType::StaticMethod, BuiltinType::ClassMethod, BuiltinType::Property]
        .into_iter()
        .any(|w| builtin_type_ptr(w) == ty);
    if !is_wrapper {
        return None;
    }
    unsafe { ObjRef::from_borrowed((*obj.as_ptr().cast::<RawWrapper>()).wrapped) }
}

/// Zero-initialised instance of `ty`, using its basic size.
pub fn instance(ty: &ObjRef) -> Result<ObjRef, RuntimeError> {
    if !types::is_type(ty) {
        return Err(RuntimeError::Type(format!(
            "'{}' object is not a type",
            ty.type_name()
        )));
    }
    let raw = ty.as_ptr().cast::<RawType>();
    let fl = type_flags(raw);
    if fl & flags::LIST_SUBCLASS != 0 || fl & flags::TYPE_SUBCLASS != 0 {
        return Err(RuntimeError::Type(format!(
            "cannot create '{}' instances directly",
            types::type_name(ty)
        )));
    }
    let op = unsafe { alloc_fixed(raw)? };
    if fl & flags::BYTES_SUBCLASS != 0 {
        unsafe { (*op.cast::<RawBytes>()).ob_shash = -1 };
    }
    owned(op)
}

pub fn int_value(obj: &ObjRef) -> Result<i64, RuntimeError> {
    if !has_flag(obj, flags::INT_SUBCLASS) {
        return Err(RuntimeError::Type(format!(
            "expected int, got '{}'",
            obj.type_name()
        )));
    }
    Ok(unsafe { (*obj.as_ptr().cast::<RawInt>()).ob_ival })
}

pub fn float_value(obj: &ObjRef) -> Result<f64, RuntimeError> {
    if has_flag(obj, flags::FLOAT_SUBCLASS) {
        Ok(unsafe { (*obj.as_ptr().cast::<RawFloat>()).ob_fval })
    } else {
        int_value(obj).map(|v| v as f64)
    }
}

pub fn var_size(obj: &ObjRef) -> isize {
    unsafe { (*obj.as_ptr().cast::<RawVarObject>()).ob_size }
}

pub fn bytes_value(obj: &ObjRef) -> Result<Vec<u8>, RuntimeError> {
    if !has_flag(obj, flags::BYTES_SUBCLASS) {
        return Err(RuntimeError::Type(format!(
            "expected bytes, got '{}'",
            obj.type_name()
        )));
    }
    let raw = obj.as_ptr().cast::<RawBytes>();
    let len = var_size(obj).max(0) as usize;
    let data = unsafe { ptr::addr_of!((*raw).ob_sval).cast::<u8>() };
    Ok(unsafe { std::slice::from_raw_parts(data, len) }.to_vec())
}

/// Text of a bytes object, lossily decoded.
pub fn text(obj: &ObjRef) -> Result<String, RuntimeError> {
    bytes_value(obj).map(|b| String::from_utf8_lossy(&b).into_owned())
}

/// # Safety
/// `raw` must point to a live tuple-layout object.
pub(crate) unsafe fn tuple_slots(raw: *mut RawTuple) -> *mut *mut RawObject {
    unsafe { ptr::addr_of_mut!((*raw).ob_item).cast() }
}

/// Strong references to the first `ob_size` elements of a tuple or list.
pub fn sequence_items(obj: &ObjRef) -> Result<Vec<ObjRef>, RuntimeError> {
    let len = var_size(obj).max(0) as usize;
    let slots = if has_flag(obj, flags::TUPLE_SUBCLASS) {
        unsafe { tuple_slots(obj.as_ptr().cast()) }
    } else if has_flag(obj, flags::LIST_SUBCLASS) {
        unsafe { (*obj.as_ptr().cast::<RawList>()).ob_item }
    } else {
        return Err(RuntimeError::Type(format!(
            "expected tuple or list, got '{}'",
            obj.type_name()
        )));
    };
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let item = unsafe { ObjRef::from_borrowed(*slots.add(i)) }
            .ok_or_else(|| RuntimeError::System(format!("NULL item at index {}", i)))?;
        out.push(item);
    }
    Ok(out)
}

pub fn function_name(obj: &ObjRef) -> Option<String> {
    if !has_flag(obj, flags::FUNCTION_SUBCLASS) {
        return None;
    }
    let name = unsafe { (*obj.as_ptr().cast::<RawFunction>()).fn_name };
    if name.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
}

/// # Safety
/// `op` must be a live function object.
pub(crate) unsafe fn invoke_function(op: *mut RawObject, args: &[ObjRef]) -> Result<ObjRef, RuntimeError> {
    let body = unsafe { (*op.cast::<RawFunction>()).fn_impl };
    match unsafe { body.as_ref() } {
        Some(body) => body(args),
        None => Err(RuntimeError::System("function has no body".into())),
    }
}

fn return_new(result: Result<ObjRef, RuntimeError>) -> *mut RawObject {
    match result {
        Ok(obj) => obj.into_raw(),
        Err(e) => raise(e),
    }
}

fn return_text(text: String) -> *mut RawObject {
    return_new(bytes(text.as_bytes()))
}

unsafe fn borrowed(op: *mut RawObject) -> ObjRef {
    unsafe { ObjRef::from_borrowed(op) }.unwrap_or_else(|| panic!("slot called with NULL object"))
}

fn unsupported(symbol: &str, a: &ObjRef, b: &ObjRef) -> RuntimeError {
    RuntimeError::Type(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        symbol,
        a.type_name(),
        b.type_name()
    ))
}

pub(crate) unsafe extern "C" fn object_repr(op: *mut RawObject) -> *mut RawObject {
    let obj = unsafe { borrowed(op) };
    return_text(format!("<{} object at {:#x}>", obj.type_name(), obj.address()))
}

pub(crate) unsafe extern "C" fn object_hash(op: *mut RawObject) -> isize {
    (op as usize >> 4) as isize
}

pub(crate) unsafe extern "C" fn none_repr(_op: *mut RawObject) -> *mut RawObject {
    return_text("None".to_string())
}

pub(crate) unsafe extern "C" fn int_repr(op: *mut RawObject) -> *mut RawObject {
    return_text(unsafe { (*op.cast::<RawInt>()).ob_ival }.to_string())
}

pub(crate) unsafe extern "C" fn bool_repr(op: *mut RawObject) -> *mut RawObject {
    let value = unsafe { (*op.cast::<RawInt>()).ob_ival };
    let text = if value != 0 { "True" } else { "False" };
    return_text(text.to_string())
}

pub(crate) unsafe extern "C" fn int_hash(op: *mut RawObject) -> isize {
    let value = unsafe { (*op.cast::<RawInt>()).ob_ival } as isize;
    if value == -1 {
        -2
    } else {
        value
    }
}

fn int_binary(
    a: *mut RawObject,
    b: *mut RawObject,
    symbol: &str,
    op: fn(i64, i64) -> Option<i64>,
) -> *mut RawObject {
    let (a, b) = unsafe { (borrowed(a), borrowed(b)) };
    let result = match (int_value(&a), int_value(&b)) {
        (Ok(x), Ok(y)) => op(x, y)
            .ok_or_else(|| RuntimeError::Overflow(format!("integer overflow in {}", symbol)))
            .and_then(int),
        _ => Err(unsupported(symbol, &a, &b)),
    };
    return_new(result)
}

pub(crate) unsafe extern "C" fn int_add(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    int_binary(a, b, "+", i64::checked_add)
}

pub(crate) unsafe extern "C" fn int_subtract(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    int_binary(a, b, "-", i64::checked_sub)
}

pub(crate) unsafe extern "C" fn int_multiply(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    int_binary(a, b, "*", i64::checked_mul)
}

pub(crate) unsafe extern "C" fn int_negative(op: *mut RawObject) -> *mut RawObject {
    let value = unsafe { (*op.cast::<RawInt>()).ob_ival };
    return_new(
        value
            .checked_neg()
            .ok_or_else(|| RuntimeError::Overflow("integer overflow in negation".into()))
            .and_then(int),
    )
}

pub(crate) unsafe extern "C" fn int_bool(op: *mut RawObject) -> c_int {
    (unsafe { (*op.cast::<RawInt>()).ob_ival } != 0) as c_int
}

pub(crate) unsafe extern "C" fn float_repr(op: *mut RawObject) -> *mut RawObject {
    let value = unsafe { (*op.cast::<RawFloat>()).ob_fval };
    return_text(format!("{:?}", value))
}

pub(crate) unsafe extern "C" fn float_hash(op: *mut RawObject) -> isize {
    let value = unsafe { (*op.cast::<RawFloat>()).ob_fval };
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        let h = value as isize;
        if h == -1 {
            -2
        } else {
            h
        }
    } else {
        value.to_bits() as isize & isize::MAX
    }
}

fn float_binary(a: *mut RawObject, b: *mut RawObject, symbol: &str, op: fn(f64, f64) -> f64) -> *mut RawObject {
    let (a, b) = unsafe { (borrowed(a), borrowed(b)) };
    let result = match (float_value(&a), float_value(&b)) {
        (Ok(x), Ok(y)) => float(op(x, y)),
        _ => Err(unsupported(symbol, &a, &b)),
    };
    return_new(result)
}

pub(crate) unsafe extern "C" fn float_add(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    float_binary(a, b, "+", |x, y| x + y)
}

pub(crate) unsafe extern "C" fn float_subtract(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    float_binary(a, b, "-", |x, y| x - y)
}

pub(crate) unsafe extern "C" fn float_multiply(a: *mut RawObject, b: *mut RawObject) -> *mut RawObject {
    float_binary(a, b, "*", |x, y| x * y)
}

pub(crate) unsafe extern "C" fn float_negative(op: *mut RawObject) -> *mut RawObject {
    return_new(float(-unsafe { (*op.cast::<RawFloat>()).ob_fval }))
}

pub(crate) unsafe extern "C" fn float_bool(op: *mut RawObject) -> c_int {
    (unsafe { (*op.cast::<RawFloat>()).ob_fval } != 0.0) as c_int
}

pub(crate) unsafe extern "C" fn var_length(op: *mut RawObject) -> isize {
    unsafe { (*op.cast::<RawVarObject>()).ob_size }
}

fn index_error(kind: &str) -> *mut RawObject {
    raise(RuntimeError::Index(format!("{} index out of range", kind)))
}

pub(crate) unsafe extern "C" fn bytes_repr(op: *mut RawObject) -> *mut RawObject {
    let obj = unsafe { borrowed(op) };
    return_new(bytes_value(&obj).and_then(|b| bytes(escape_bytes(&b).as_bytes())))
}

/// `b'...'` rendering with non-printable bytes escaped.
pub fn escape_bytes(data: &[u8]) -> String {
    let mut out = String::from("b'");
    for &byte in data {
        match byte {
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(byte as char),
            _ => out.push_str(&format!("\\x{:02x}", byte)),
        }
    }
    out.push('\'');
    out
}

pub(crate) unsafe extern "C" fn bytes_hash(op: *mut RawObject) -> isize {
    let raw = op.cast::<RawBytes>();
    let cached = unsafe { (*raw).ob_shash };
    if cached != -1 {
        return cached;
    }
    let len = unsafe { (*raw).ob_base.ob_size }.max(0) as usize;
    let data = unsafe { std::slice::from_raw_parts(ptr::addr_of!((*raw).ob_sval).cast::<u8>(), len) };
    // FNV-1a
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    let mut h = (h as isize) & isize::MAX;
    if h == -1 {
        h = -2;
    }
    unsafe { (*raw).ob_shash = h };
    h
}

pub(crate) unsafe extern "C" fn bytes_item(op: *mut RawObject, index: isize) -> *mut RawObject {
    let raw = op.cast::<RawBytes>();
    let len = unsafe { (*raw).ob_base.ob_size };
    if index < 0 || index >= len {
        return index_error("bytes");
    }
    let byte = unsafe { *ptr::addr_of!((*raw).ob_sval).cast::<u8>().add(index as usize) };
    return_new(int(byte as i64))
}

pub(crate) unsafe extern "C" fn tuple_item(op: *mut RawObject, index: isize) -> *mut RawObject {
    let raw = op.cast::<RawTuple>();
    let len = unsafe { (*raw).ob_base.ob_size };
    if index < 0 || index >= len {
        return index_error("tuple");
    }
    let item = unsafe { *tuple_slots(raw).add(index as usize) };
    unsafe { incref(item) };
    item
}

pub(crate) unsafe extern "C" fn list_item(op: *mut RawObject, index: isize) -> *mut RawObject {
    let raw = op.cast::<RawList>();
    let len = unsafe { (*raw).ob_base.ob_size };
    if index < 0 || index >= len {
        return index_error("list");
    }
    let item = unsafe { *(*raw).ob_item.add(index as usize) };
    unsafe { incref(item) };
    item
}

fn sequence_repr(op: *mut RawObject, open: &str, close: &str) -> *mut RawObject {
    let obj = unsafe { borrowed(op) };
    let result = sequence_items(&obj).and_then(|items| {
        let parts = items
            .iter()
            .map(abstract_ops::repr)
            .collect::<Result<Vec<_>, _>>()?;
        let trailing = if open == "(" && parts.len() == 1 { "," } else { "" };
        Ok(format!("{}{}{}{}", open, parts.join(", "), trailing, close))
    });
    match result {
        Ok(text) => return_text(text),
        Err(e) => raise(e),
    }
}

pub(crate) unsafe extern "C" fn tuple_repr(op: *mut RawObject) -> *mut RawObject {
    sequence_repr(op, "(", ")")
}

pub(crate) unsafe extern "C" fn list_repr(op: *mut RawObject) -> *mut RawObject {
    sequence_repr(op, "[", "]")
}

pub(crate) unsafe extern "C" fn tuple_dealloc(op: *mut RawObject) {
    let raw = op.cast::<RawTuple>();
    unsafe {
        let len = (*raw).ob_base.ob_size.max(0) as usize;
        let slots = tuple_slots(raw);
        for i in 0..len {
            let item = std::mem::replace(&mut *slots.add(i), ptr::null_mut());
            decref(item);
        }
        free_object(op);
    }
}

pub(crate) unsafe extern "C" fn list_dealloc(op: *mut RawObject) {
    let raw = op.cast::<RawList>();
    unsafe {
        let len = (*raw).ob_base.ob_size.max(0) as usize;
        let buffer = std::mem::replace(&mut (*raw).ob_item, ptr::null_mut());
        if !buffer.is_null() {
            for i in 0..len {
                decref(*buffer.add(i));
            }
            alloc::release(buffer.cast());
        }
        free_object(op);
    }
}

pub(crate) unsafe extern "C" fn function_repr(op: *mut RawObject) -> *mut RawObject {
    let obj = unsafe { borrowed(op) };
    let name = function_name(&obj).unwrap_or_else(|| "?".to_string());
    return_text(format!("<function {} at {:#x}>", name, obj.address()))
}

pub(crate) unsafe extern "C" fn function_dealloc(op: *mut RawObject) {
    let func = op.cast::<RawFunction>();
    unsafe {
        let name = std::mem::replace(&mut (*func).fn_name, ptr::null());
        if !name.is_null() {
            drop(CString::from_raw(name as *mut c_char));
        }
        let body = std::mem::replace(&mut (*func).fn_impl, ptr::null_mut());
        if !body.is_null() {
            drop(Box::from_raw(body));
        }
        free_object(op);
    }
}

pub(crate) unsafe extern "C" fn wrapper_dealloc(op: *mut RawObject) {
    let raw = op.cast::<RawWrapper>();
    unsafe {
        let inner = std::mem::replace(&mut (*raw).wrapped, ptr::null_mut());
        decref(inner);
        free_object(op);
    }
}
