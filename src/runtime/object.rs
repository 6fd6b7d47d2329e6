use super::{alloc, flags, types::RawType};
use std::{
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    mem::size_of,
    ptr::NonNull,
};

/// Reference counts at or above this value are never changed.
pub const IMMORTAL_REFCNT: isize = isize::MAX / 2;

/// Header shared by every object.
#[repr(C)]
#[derive(Debug)]
pub struct RawObject {
    pub ob_refcnt: isize,
    pub ob_type: *mut RawType,
}

/// Header of variable-length objects.
#[repr(C)]
#[derive(Debug)]
pub struct RawVarObject {
    pub ob_base: RawObject,
    pub ob_size: isize,
}

/// Stored immediately before GC-tracked objects. `gc_next == 0` means the
/// object is not tracked.
#[repr(C)]
#[derive(Debug, Default)]
pub struct GcHead {
    pub gc_next: usize,
    pub gc_prev: usize,
}

pub const GC_HEAD_SIZE: usize = size_of::<GcHead>();

/// # Safety
/// `op` must be NULL or point to a live object.
pub unsafe fn incref(op: *mut RawObject) {
    if op.is_null() {
        return;
    }
    let obj = unsafe { &mut *op };
    if obj.ob_refcnt < IMMORTAL_REFCNT {
        obj.ob_refcnt += 1;
    }
}

/// # Safety
/// `op` must be NULL or point to a live object owning at least one reference.
pub unsafe fn decref(op: *mut RawObject) {
    if op.is_null() {
        return;
    }
    let obj = unsafe { &mut *op };
    if obj.ob_refcnt >= IMMORTAL_REFCNT {
        return;
    }
    obj.ob_refcnt -= 1;
    if obj.ob_refcnt == 0 {
        unsafe { dealloc(op) };
    }
}

unsafe fn dealloc(op: *mut RawObject) {
    let ty = unsafe { (*op).ob_type };
    match unsafe { ty.as_ref() }.and_then(|t| t.tp_dealloc) {
        Some(destructor) => unsafe { destructor(op) },
        None => unsafe { free_object(op) },
    }
}

/// Release the memory of `op` and the reference it holds on a heap type.
///
/// # Safety
/// `op` must be a live object whose reference count reached zero.
pub(crate) unsafe fn free_object(op: *mut RawObject) {
    let ty = unsafe { (*op).ob_type };
    unsafe { alloc::release(op.cast()) };
    if let Some(t) = unsafe { ty.as_ref() } {
        if t.tp_flags & flags::HEAPTYPE != 0 {
            unsafe { decref(ty.cast()) };
        }
    }
}

pub(crate) unsafe fn make_immortal(op: *mut RawObject) {
    unsafe { (*op).ob_refcnt = IMMORTAL_REFCNT };
}

/// An owned (strong) reference to a runtime object.
#[repr(transparent)]
pub struct ObjRef(NonNull<RawObject>);

impl ObjRef {
    /// Take ownership of a reference the caller already owns.
    ///
    /// # Safety
    /// `ptr` must be NULL or a live object carrying a reference that is
    /// transferred to the returned value.
    pub unsafe fn from_owned(ptr: *mut RawObject) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Create a new strong reference to a borrowed object.
    ///
    /// # Safety
    /// `ptr` must be NULL or a live object.
    pub unsafe fn from_borrowed(ptr: *mut RawObject) -> Option<Self> {
        let nn = NonNull::new(ptr)?;
        unsafe { incref(ptr) };
        Some(Self(nn))
    }

    pub fn as_ptr(&self) -> *mut RawObject {
        self.0.as_ptr()
    }

    pub fn address(&self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Give up ownership without decrementing the reference count.
    pub fn into_raw(self) -> *mut RawObject {
        let ptr = self.as_ptr();
        std::mem::forget(self);
        ptr
    }

    pub fn ref_count(&self) -> isize {
        unsafe { (*self.as_ptr()).ob_refcnt }
    }

    pub fn type_ptr(&self) -> *mut RawType {
        unsafe { (*self.as_ptr()).ob_type }
    }

    /// Strong reference to this object's type.
    pub fn type_object(&self) -> ObjRef {
        // every live object has a type
        unsafe { ObjRef::from_borrowed(self.type_ptr().cast()) }
            .unwrap_or_else(|| panic!("object at {:#x} has a NULL type", self.address()))
    }

    pub fn type_name(&self) -> String {
        unsafe { super::types::raw_type_name(self.type_ptr()) }
    }

    pub fn is(&self, other: &ObjRef) -> bool {
        self.0 == other.0
    }
}

impl Clone for ObjRef {
    fn clone(&self) -> Self {
        unsafe { incref(self.as_ptr()) };
        Self(self.0)
    }
}

impl Drop for ObjRef {
    fn drop(&mut self) {
        unsafe { decref(self.as_ptr()) };
    }
}

impl PartialEq for ObjRef {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}
impl Eq for ObjRef {}

impl Hash for ObjRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0.as_ptr(), state);
    }
}

impl Debug for ObjRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<{} at {:#x}>", self.type_name(), self.address())
    }
}
