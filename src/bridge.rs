//! The primitives the inspector needs from the runtime that owns the heap.
//!
//! [`HostBridge`] answers them from the in-process [`runtime`](crate::runtime);
//! [`NativeBridge`] resolves the same entry points from a shared library.

use crate::{
    error::BridgeError,
    layout::{LayoutKind, RuntimeBuild},
    runtime::{self, alloc, builtin_type, flags, BuiltinType, RawObject, RawType},
};
use libloading::Library;
use parking_lot::Mutex;
use std::{collections::HashMap, ffi::OsStr, sync::Arc};
use tracing::debug;

pub trait RuntimeBridge: Send + Sync {
    /// Build identifier used to select layout tables.
    fn build(&self) -> RuntimeBuild;

    /// # Safety
    /// `addr` must be a live object.
    unsafe fn increment_refcount(&self, addr: usize);

    /// # Safety
    /// `addr` must be a live object owning the reference being released.
    unsafe fn decrement_refcount(&self, addr: usize);

    /// Usable bytes of the allocation starting at `addr`, 0 if unknown.
    fn allocation_size(&self, addr: usize) -> usize;

    fn is_gc_tracked(&self, addr: usize) -> bool;

    /// Clear the immutability flag of a type. Returns whether it was set.
    ///
    /// # Safety
    /// `ty` must be a live object.
    unsafe fn relax_immutability(&self, ty: usize) -> Result<bool, BridgeError>;

    /// # Safety
    /// `ty` must be a live object.
    unsafe fn restore_immutability(&self, ty: usize) -> Result<(), BridgeError>;

    /// `(basic size, item size)` the runtime reports for a category, when it
    /// can tell.
    fn reported_sizes(&self, _kind: LayoutKind) -> Option<(usize, usize)> {
        None
    }

    /// Whether `addr` still belongs to a live allocation.
    fn is_live(&self, addr: usize) -> bool {
        self.allocation_size(addr) != 0
    }
}

/// Bridge over the in-process runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostBridge;

unsafe fn as_type(ty: usize) -> Result<*mut RawType, BridgeError> {
    let obj = ty as *mut RawObject;
    let meta = unsafe { (*obj).ob_type };
    match unsafe { meta.as_ref() } {
        Some(m) if m.tp_flags & flags::TYPE_SUBCLASS != 0 => Ok(obj.cast()),
        _ => Err(BridgeError::NotAType(ty)),
    }
}

impl RuntimeBridge for HostBridge {
    fn build(&self) -> RuntimeBuild {
        let (major, minor) = runtime::BUILD_VERSION;
        RuntimeBuild { major, minor }
    }

    unsafe fn increment_refcount(&self, addr: usize) {
        unsafe { runtime::incref(addr as *mut RawObject) }
    }

    unsafe fn decrement_refcount(&self, addr: usize) {
        unsafe { runtime::decref(addr as *mut RawObject) }
    }

    fn allocation_size(&self, addr: usize) -> usize {
        alloc::allocation_size(addr)
    }

    fn is_gc_tracked(&self, addr: usize) -> bool {
        alloc::is_gc_tracked(addr)
    }

    unsafe fn relax_immutability(&self, ty: usize) -> Result<bool, BridgeError> {
        let raw = unsafe { as_type(ty)? };
        let t = unsafe { &mut *raw };
        let was_immutable = t.tp_flags & flags::IMMUTABLETYPE != 0;
        t.tp_flags &= !flags::IMMUTABLETYPE;
        Ok(was_immutable)
    }

    unsafe fn restore_immutability(&self, ty: usize) -> Result<(), BridgeError> {
        let raw = unsafe { as_type(ty)? };
        unsafe { (*raw).tp_flags |= flags::IMMUTABLETYPE };
        Ok(())
    }

    fn reported_sizes(&self, kind: LayoutKind) -> Option<(usize, usize)> {
        let which = match kind {
            LayoutKind::Object => BuiltinType::Object,
            LayoutKind::Int => BuiltinType::Int,
            LayoutKind::Float => BuiltinType::Float,
            LayoutKind::Bytes => BuiltinType::Bytes,
            LayoutKind::Tuple => BuiltinType::Tuple,
            LayoutKind::List => BuiltinType::List,
            LayoutKind::Dict => BuiltinType::Dict,
            LayoutKind::Type => BuiltinType::Type,
            LayoutKind::Function => BuiltinType::Function,
            LayoutKind::Wrapper => BuiltinType::StaticMethod,
            _ => return None,
        };
        let ty = builtin_type(which);
        let raw = unsafe { &*ty.as_ptr().cast::<RawType>() };
        Some((raw.tp_basicsize as usize, raw.tp_itemsize as usize))
    }

    fn is_live(&self, addr: usize) -> bool {
        alloc::is_live(addr)
    }
}

type AddrFn = unsafe extern "C" fn(usize);
type SizeFn = unsafe extern "C" fn(usize) -> usize;
type PredicateFn = unsafe extern "C" fn(usize) -> i32;
type VersionFn = unsafe extern "C" fn() -> u32;

/// Bridge resolving the runtime primitives from a shared library.
///
/// Expected exports: `heapview_build_version` (major in the high 16 bits),
/// `heapview_incref`, `heapview_decref`, `heapview_allocation_size`,
/// `heapview_is_gc_tracked`, `heapview_relax_immutability` and
/// `heapview_restore_immutability`. The last two return a negative value on
/// failure; relax returns 1 when the flag was set.
pub struct NativeBridge {
    build: RuntimeBuild,
    incref: AddrFn,
    decref: AddrFn,
    allocation_size: SizeFn,
    is_gc_tracked: PredicateFn,
    relax: PredicateFn,
    restore: PredicateFn,
    // keeps the function pointers above valid
    _library: Library,
}

impl NativeBridge {
    pub fn open(path: impl AsRef<OsStr>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        debug!("loading runtime library {:?}", path);
        let library = unsafe { Library::new(path) }.map_err(|e| BridgeError::Library(e.to_string()))?;

        fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T, BridgeError> {
            let sym = unsafe { library.get::<T>(name.as_bytes()) }
                .map_err(|_| BridgeError::MissingSymbol(name.to_string()))?;
            Ok(*sym)
        }

        let version: VersionFn = symbol(&library, "heapview_build_version")?;
        let packed = unsafe { version() };
        Ok(Self {
            build: RuntimeBuild {
                major: (packed >> 16) as u16,
                minor: (packed & 0xffff) as u16,
            },
            incref: symbol(&library, "heapview_incref")?,
            decref: symbol(&library, "heapview_decref")?,
            allocation_size: symbol(&library, "heapview_allocation_size")?,
            is_gc_tracked: symbol(&library, "heapview_is_gc_tracked")?,
            relax: symbol(&library, "heapview_relax_immutability")?,
            restore: symbol(&library, "heapview_restore_immutability")?,
            _library: library,
        })
    }
}

impl RuntimeBridge for NativeBridge {
    fn build(&self) -> RuntimeBuild {
        self.build
    }

    unsafe fn increment_refcount(&self, addr: usize) {
        unsafe { (self.incref)(addr) }
    }

    unsafe fn decrement_refcount(&self, addr: usize) {
        unsafe { (self.decref)(addr) }
    }

    fn allocation_size(&self, addr: usize) -> usize {
        unsafe { (self.allocation_size)(addr) }
    }

    fn is_gc_tracked(&self, addr: usize) -> bool {
        unsafe { (self.is_gc_tracked)(addr) != 0 }
    }

    unsafe fn relax_immutability(&self, ty: usize) -> Result<bool, BridgeError> {
        match unsafe { (self.relax)(ty) } {
            r if r < 0 => Err(BridgeError::NotAType(ty)),
            r => Ok(r == 1),
        }
    }

    unsafe fn restore_immutability(&self, ty: usize) -> Result<(), BridgeError> {
        match unsafe { (self.restore)(ty) } {
            r if r < 0 => Err(BridgeError::NotAType(ty)),
            _ => Ok(()),
        }
    }
}

/// Reference-count calls observed by a [`CountingBridge`] for one address.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefCalls {
    pub increments: usize,
    pub decrements: usize,
}

/// Wraps another bridge and records every reference-count call per address.
pub struct CountingBridge<B = HostBridge> {
    inner: B,
    calls: Mutex<HashMap<usize, RefCalls>>,
}

impl<B: RuntimeBridge> CountingBridge<B> {
    pub fn new(inner: B) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: Mutex::new(HashMap::new()),
        })
    }

    pub fn calls(&self, addr: usize) -> RefCalls {
        self.calls.lock().get(&addr).copied().unwrap_or_default()
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

impl<B: RuntimeBridge> RuntimeBridge for CountingBridge<B> {
    fn build(&self) -> RuntimeBuild {
        self.inner.build()
    }

    unsafe fn increment_refcount(&self, addr: usize) {
        self.calls.lock().entry(addr).or_default().increments += 1;
        unsafe { self.inner.increment_refcount(addr) }
    }

    unsafe fn decrement_refcount(&self, addr: usize) {
        self.calls.lock().entry(addr).or_default().decrements += 1;
        unsafe { self.inner.decrement_refcount(addr) }
    }

    fn allocation_size(&self, addr: usize) -> usize {
        self.inner.allocation_size(addr)
    }

    fn is_gc_tracked(&self, addr: usize) -> bool {
        self.inner.is_gc_tracked(addr)
    }

    unsafe fn relax_immutability(&self, ty: usize) -> Result<bool, BridgeError> {
        unsafe { self.inner.relax_immutability(ty) }
    }

    unsafe fn restore_immutability(&self, ty: usize) -> Result<(), BridgeError> {
        unsafe { self.inner.restore_immutability(ty) }
    }

    fn reported_sizes(&self, kind: LayoutKind) -> Option<(usize, usize)> {
        self.inner.reported_sizes(kind)
    }

    fn is_live(&self, addr: usize) -> bool {
        self.inner.is_live(addr)
    }
}
