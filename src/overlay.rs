//! Typed field access over raw object memory.

use crate::{
    error::{InspectError, LayoutError},
    layout::{FieldKind, FieldLayout, HasLayout, Layout, Scalar, PTR_SIZE},
    runtime::RawObject,
};
use std::{fmt, ptr, sync::Arc};
use tracing::trace;

/// A value read from or written to a field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Borrowed object pointer, possibly NULL.
    Object(*mut RawObject),
    /// Any other pointer-sized field.
    Ptr(usize),
    Items(Vec<*mut RawObject>),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Object(_) => "object",
            Value::Ptr(_) => "pointer",
            Value::Items(_) => "items",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match *self {
            Value::Int(v) => usize::try_from(v).ok(),
            Value::UInt(v) => usize::try_from(v).ok(),
            Value::Ptr(p) => Some(p),
            Value::Object(p) => Some(p as usize),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<*mut RawObject> {
        match *self {
            Value::Object(p) => Some(p),
            Value::Ptr(p) => Some(p as *mut RawObject),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:?}", v),
            Value::Object(p) if p.is_null() => f.write_str("NULL"),
            Value::Object(p) => write!(f, "{:#x}", *p as usize),
            Value::Ptr(0) => f.write_str("NULL"),
            Value::Ptr(p) => write!(f, "{:#x}", p),
            Value::Items(items) => {
                let parts: Vec<_> = items.iter().map(|p| format!("{:#x}", *p as usize)).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Bytes(b) => f.write_str(&crate::runtime::escape_bytes(b)),
        }
    }
}

/// A layout bound to an address. Never copies the underlying bytes and does
/// not keep the object alive.
#[derive(Clone, Debug)]
pub struct Overlay {
    addr: usize,
    layout: Arc<Layout>,
}

impl Overlay {
    /// # Safety
    /// `addr` must point to memory shaped like `layout` for as long as the
    /// overlay is used.
    pub unsafe fn new(addr: usize, layout: Arc<Layout>) -> Self {
        Self { addr, layout }
    }

    pub fn address(&self) -> usize {
        self.addr
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    pub fn field(&self, name: &str) -> Result<&FieldLayout, LayoutError> {
        self.layout.field(name)
    }

    pub fn field_addr(&self, name: &str) -> Result<usize, LayoutError> {
        Ok(self.addr + self.field(name)?.offset)
    }

    /// Same address, different layout. No validation happens here.
    pub fn reinterpret(&self, layout: Arc<Layout>) -> Overlay {
        Overlay {
            addr: self.addr,
            layout,
        }
    }

    /// Current value of the length field, read from memory on every call.
    pub fn len(&self) -> Option<isize> {
        let name = self.layout.length_field?;
        let field = self.layout.field(name).ok()?;
        Some(unsafe { ptr::read_unaligned((self.addr + field.offset) as *const isize) })
    }

    fn live_len(&self) -> usize {
        self.len().map_or(0, |n| n.max(0) as usize)
    }

    pub fn read(&self, name: &str) -> Result<Value, LayoutError> {
        let field = self.field(name)?.clone();
        Ok(unsafe { self.read_field(&field) })
    }

    /// # Safety
    /// `field` must belong to this overlay's layout.
    pub unsafe fn read_field(&self, field: &FieldLayout) -> Value {
        let at = self.addr + field.offset;
        unsafe {
            match field.kind {
                FieldKind::Scalar(s) => read_scalar(at, s),
                FieldKind::ObjectRef | FieldKind::TypeRef => {
                    Value::Object(ptr::read_unaligned(at as *const *mut RawObject))
                }
                FieldKind::CStr
                | FieldKind::FnPtr
                | FieldKind::RawPtr
                | FieldKind::Table(_)
                | FieldKind::ItemBuffer => Value::Ptr(ptr::read_unaligned(at as *const usize)),
                FieldKind::ItemArray => {
                    let len = self.live_len();
                    let items = (0..len)
                        .map(|i| ptr::read_unaligned((at + i * PTR_SIZE) as *const *mut RawObject))
                        .collect();
                    Value::Items(items)
                }
                FieldKind::ByteBuffer => {
                    let len = self.live_len();
                    Value::Bytes(std::slice::from_raw_parts(at as *const u8, len).to_vec())
                }
            }
        }
    }

    /// Store `value` directly into memory. Element pointers written here are
    /// not reference counted.
    pub fn write(&self, name: &str, value: &Value) -> Result<(), LayoutError> {
        let field = self.field(name)?;
        let at = self.addr + field.offset;
        let mismatch = || LayoutError::KindMismatch {
            layout: self.layout.name().to_string(),
            field: name.to_string(),
            expected: field.kind.type_tag(),
            got: value.kind_name().to_string(),
        };
        trace!("write {}.{} at {:#x}: {}", self.layout.name(), name, at, value);
        unsafe {
            match (field.kind, value) {
                (FieldKind::Scalar(s), Value::Float(v)) if s == Scalar::Float64 => {
                    ptr::write_unaligned(at as *mut f64, *v)
                }
                (FieldKind::Scalar(s), Value::Int(_) | Value::UInt(_)) if s != Scalar::Float64 => {
                    let bits = match *value {
                        Value::Int(v) => v as u64,
                        Value::UInt(v) => v,
                        _ => unreachable!(),
                    };
                    write_scalar(at, s, bits)
                }
                (kind, Value::Object(_) | Value::Ptr(_)) if kind.is_pointer() => {
                    let p = value.as_usize().ok_or_else(mismatch)?;
                    ptr::write_unaligned(at as *mut usize, p)
                }
                (FieldKind::ItemArray, Value::Items(items)) => {
                    for (i, item) in items.iter().enumerate() {
                        ptr::write_unaligned((at + i * PTR_SIZE) as *mut *mut RawObject, *item);
                    }
                }
                (FieldKind::ByteBuffer, Value::Bytes(bytes)) => {
                    ptr::copy_nonoverlapping(bytes.as_ptr(), at as *mut u8, bytes.len())
                }
                _ => return Err(mismatch()),
            }
        }
        Ok(())
    }

    /// Address of element `index` of the variable-length field, bounds
    /// checked against the live length.
    pub fn element_addr(&self, index: isize) -> Result<usize, InspectError> {
        let len = self.live_len();
        if index < 0 || index as usize >= len {
            return Err(InspectError::Index { index, len });
        }
        Ok(self.element_addr_unchecked(index)?)
    }

    /// Address element `index` would have, without any bounds check.
    pub fn element_addr_unchecked(&self, index: isize) -> Result<usize, LayoutError> {
        let field = self.layout.items_field().ok_or_else(|| LayoutError::NotIndexable {
            layout: self.layout.name().to_string(),
            field: "<items>".to_string(),
        })?;
        let elem = field.kind.element_size().unwrap_or(PTR_SIZE) as isize;
        let start = match field.kind {
            FieldKind::ItemBuffer => unsafe { ptr::read_unaligned((self.addr + field.offset) as *const usize) },
            _ => self.addr + field.offset,
        };
        Ok(start.wrapping_add_signed(index * elem))
    }

    /// Object pointer stored at element `index`.
    pub fn element(&self, index: isize) -> Result<*mut RawObject, InspectError> {
        let at = self.element_addr(index)?;
        if self.layout.items_field().map(|f| f.kind) == Some(FieldKind::ByteBuffer) {
            return Err(LayoutError::KindMismatch {
                layout: self.layout.name().to_string(),
                field: "<items>".to_string(),
                expected: "[u8]".to_string(),
                got: "object".to_string(),
            }
            .into());
        }
        Ok(unsafe { ptr::read_unaligned(at as *const *mut RawObject) })
    }

    /// Bytes covered by the fixed part of the layout.
    pub fn basic_size(&self) -> usize {
        self.layout.size()
    }
}

unsafe fn read_scalar(at: usize, s: Scalar) -> Value {
    unsafe {
        match s {
            Scalar::Int8 => Value::Int(ptr::read_unaligned(at as *const i8) as i64),
            Scalar::UInt8 => Value::UInt(ptr::read_unaligned(at as *const u8) as u64),
            Scalar::Int16 => Value::Int(ptr::read_unaligned(at as *const i16) as i64),
            Scalar::UInt16 => Value::UInt(ptr::read_unaligned(at as *const u16) as u64),
            Scalar::Int32 => Value::Int(ptr::read_unaligned(at as *const i32) as i64),
            Scalar::UInt32 => Value::UInt(ptr::read_unaligned(at as *const u32) as u64),
            Scalar::Int64 => Value::Int(ptr::read_unaligned(at as *const i64)),
            Scalar::UInt64 => Value::UInt(ptr::read_unaligned(at as *const u64)),
            Scalar::NativeInt => Value::Int(ptr::read_unaligned(at as *const isize) as i64),
            Scalar::NativeUInt => Value::UInt(ptr::read_unaligned(at as *const usize) as u64),
            Scalar::Float64 => Value::Float(ptr::read_unaligned(at as *const f64)),
        }
    }
}

/// Truncating store of the low bits of `bits`.
unsafe fn write_scalar(at: usize, s: Scalar, bits: u64) {
    unsafe {
        match s.size() {
            1 => ptr::write_unaligned(at as *mut u8, bits as u8),
            2 => ptr::write_unaligned(at as *mut u16, bits as u16),
            4 => ptr::write_unaligned(at as *mut u32, bits as u32),
            _ => ptr::write_unaligned(at as *mut u64, bits),
        }
    }
}
