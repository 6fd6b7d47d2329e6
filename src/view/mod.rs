//! Views: typed, checked access to one live object.
//!
//! Every view wraps a [`BaseView`], which owns the overlay, the safety gate
//! and (usually) a strong reference keeping the object alive. The concrete
//! view types add category-specific operations and are collected in the
//! closed [`View`] enum, which dereferences to [`BaseView`].
//!
//! Mutations are checked against the allocation size reported by the
//! runtime bridge unless the view's gate is in an unsafe scope:
//!
//! ```ignore
//! let view = inspector.view(&tuple)?;
//! view.resize(3)?;               // fits, succeeds
//! assert!(view.resize(100).is_err());
//! {
//!     let _scope = view.unsafe_scope();
//!     view.resize(100)?;         // unchecked
//! }
//! ```

mod bytes;
mod dict;
mod display;
pub(crate) mod factory;
mod function;
mod gate;
mod scalar;
mod sequence;
mod type_view;
#[cfg(test)]
mod view_tests;

pub use bytes::BytesView;
pub use dict::DictView;
pub use function::FunctionView;
pub use gate::{SafetyGate, UnsafeScope, UnsafeScopes};
pub use scalar::{FloatView, IntView};
pub use sequence::{ListView, SequenceView, TupleView};
pub use type_view::TypeView;

use crate::{
    error::{InspectError, Result, UnsafeOperationError},
    inspector::Inspector,
    layout::{FieldKind, HasLayout, Layout, LayoutKind, PTR_SIZE},
    overlay::{Overlay, Value},
    runtime::{is_type, ObjRef, RuntimeError},
};
use enum_dispatch::enum_dispatch;
use std::{
    ffi::{c_char, CStr},
    fmt,
    ops::Deref,
    ptr,
    sync::Arc,
};
use tracing::{debug, warn};

/// State shared by every view category.
pub struct BaseView {
    overlay: Overlay,
    inspector: Inspector,
    base: Option<ObjRef>,
    gate: SafetyGate,
}

impl BaseView {
    pub(crate) fn new(inspector: Inspector, overlay: Overlay, base: Option<ObjRef>) -> Self {
        let base = base.filter(|_| inspector.config().hold_references);
        debug!(
            "view of {} at {:#x} (holds reference: {})",
            overlay.layout().name(),
            overlay.address(),
            base.is_some()
        );
        Self {
            overlay,
            inspector,
            base,
            gate: SafetyGate::new(),
        }
    }

    pub fn address(&self) -> usize {
        self.overlay.address()
    }

    pub fn layout(&self) -> &Arc<Layout> {
        self.overlay.layout()
    }

    pub fn kind(&self) -> LayoutKind {
        self.layout().kind
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn inspector(&self) -> &Inspector {
        &self.inspector
    }

    /// The object this view keeps alive, if any.
    pub fn base(&self) -> Option<&ObjRef> {
        self.base.as_ref()
    }

    /// A new strong reference to the viewed object.
    pub fn object(&self) -> Result<ObjRef> {
        if let Some(base) = &self.base {
            return Ok(base.clone());
        }
        self.check_live();
        unsafe { ObjRef::from_borrowed(self.address() as *mut _) }
            .ok_or_else(|| RuntimeError::System("view of a NULL address".into()).into())
    }

    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    pub fn is_unsafe(&self) -> bool {
        self.gate.is_unsafe()
    }

    pub fn unsafe_scope(&self) -> UnsafeScope<'_> {
        self.gate.enter()
    }

    /// Let a failed admission check through when inside an unsafe scope.
    pub(crate) fn admit(&self, err: UnsafeOperationError) -> Result<()> {
        if self.is_unsafe() {
            warn!("unsafe scope bypasses check on {:#x}: {}", self.address(), err);
            Ok(())
        } else {
            Err(err.into())
        }
    }

    #[inline]
    pub(crate) fn check_live(&self) {
        #[cfg(feature = "memory-validation")]
        if !self.inspector.bridge().is_live(self.address()) {
            panic!(
                "view of {} at {:#x} outlived its object",
                self.layout().name(),
                self.address()
            );
        }
    }

    pub fn get(&self, field: &str) -> Result<Value> {
        self.check_live();
        Ok(self.overlay.read(field)?)
    }

    /// Store `value` into `field`. Guarded fields need an unsafe scope and
    /// the write must end inside the allocation. Object pointers written
    /// here are not reference counted.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.check_live();
        let value = value.into();
        let layout = self.overlay.field(field)?.clone();
        if layout.guarded {
            self.admit(UnsafeOperationError::GuardedField(field.to_string()))?;
        }
        let size = match (&layout.kind, &value) {
            (FieldKind::ItemArray, Value::Items(items)) => items.len() * PTR_SIZE,
            (FieldKind::ByteBuffer, Value::Bytes(bytes)) => bytes.len(),
            (kind, _) => kind.size(),
        };
        let allocated = self.mem_allocated();
        if layout.offset + size > allocated {
            self.admit(UnsafeOperationError::OutOfBounds {
                offset: layout.offset,
                size,
                allocated,
            })?;
        }
        Ok(self.overlay.write(field, &value)?)
    }

    /// Read a NUL-terminated string field. `None` for a NULL pointer.
    pub fn get_str(&self, field: &str) -> Result<Option<String>> {
        let ptr = self.get(field)?.as_usize().unwrap_or(0);
        if ptr == 0 {
            return Ok(None);
        }
        let s = unsafe { CStr::from_ptr(ptr as *const c_char) };
        Ok(Some(s.to_string_lossy().into_owned()))
    }

    pub fn ref_count(&self) -> Result<isize> {
        Ok(self.get("ob_refcnt")?.as_int().unwrap_or_default() as isize)
    }

    pub fn set_ref_count(&self, count: isize) -> Result<()> {
        self.set("ob_refcnt", count as i64)
    }

    pub fn type_object(&self) -> Result<ObjRef> {
        let ty = self.get("ob_type")?.as_object().unwrap_or(ptr::null_mut());
        unsafe { ObjRef::from_borrowed(ty) }
            .ok_or_else(|| RuntimeError::System(format!("object at {:#x} has a NULL type", self.address())).into())
    }

    /// Point the object at another type. The object's reference moves from
    /// the old type to the new one.
    pub fn set_type(&self, ty: &ObjRef) -> Result<()> {
        if !is_type(ty) {
            return Err(RuntimeError::Type(format!("'{}' object is not a type", ty.type_name())).into());
        }
        let old = self.get("ob_type")?.as_usize().unwrap_or(0);
        self.set("ob_type", Value::Object(ty.as_ptr()))?;
        let bridge = self.inspector.bridge();
        unsafe {
            bridge.increment_refcount(ty.address());
            if old != 0 {
                bridge.decrement_refcount(old);
            }
        }
        Ok(())
    }

    /// Live value of the length field, `None` for fixed-size layouts.
    pub fn len(&self) -> Option<isize> {
        self.check_live();
        self.overlay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len().unwrap_or(0) == 0
    }

    pub fn set_len(&self, len: isize) -> Result<()> {
        let field = self.layout().length_field.ok_or(InspectError::Unsupported {
            operation: "set_len",
            kind: self.kind(),
        })?;
        self.set(field, len as i64)
    }

    /// Bytes the object occupies according to its type:
    /// `tp_basicsize + |len| * tp_itemsize`.
    pub fn mem_size(&self) -> Result<usize> {
        let ty = self.get("ob_type")?.as_usize().unwrap_or(0);
        if ty == 0 {
            return Err(RuntimeError::System(format!("object at {:#x} has a NULL type", self.address())).into());
        }
        let ty = unsafe { Overlay::new(ty, self.inspector.layout(LayoutKind::Type)?) };
        let basic = ty.read("tp_basicsize")?.as_usize().unwrap_or(0);
        let item = ty.read("tp_itemsize")?.as_usize().unwrap_or(0);
        let len = self.len().unwrap_or(0).unsigned_abs();
        Ok(basic + len * item)
    }

    /// Usable bytes of the allocation, as reported by the bridge.
    pub fn mem_allocated(&self) -> usize {
        self.inspector.bridge().allocation_size(self.address())
    }

    pub fn is_gc(&self) -> bool {
        self.inspector.bridge().is_gc_tracked(self.address())
    }

    /// Overlay of the GC header in front of a tracked object.
    pub fn gc_head(&self) -> Result<Option<Overlay>> {
        if !self.is_gc() {
            return Ok(None);
        }
        let layout = self.inspector.layout(LayoutKind::GcHead)?;
        let addr = self.address() - layout.basic_size;
        Ok(Some(unsafe { Overlay::new(addr, layout) }))
    }

    /// The same memory through another layout.
    pub fn reinterpret(&self, kind: LayoutKind) -> Result<Overlay> {
        let layout = self.inspector.layout(kind)?;
        let allocated = self.mem_allocated();
        if layout.basic_size > allocated {
            self.admit(UnsafeOperationError::Reinterpret {
                layout: layout.name().to_string(),
                required: layout.basic_size,
                allocated,
            })?;
        }
        Ok(self.overlay.reinterpret(layout))
    }

    /// Admission check for a resize of an inline-item layout.
    pub(crate) fn admit_resize(&self, new_len: usize) -> Result<()> {
        let layout = self.layout();
        if layout.length_field.is_none() || layout.item_size == 0 {
            return Err(InspectError::Unsupported {
                operation: "resize",
                kind: self.kind(),
            });
        }
        let required = layout.size_for(new_len);
        let allocated = self.mem_allocated();
        if required > allocated {
            self.admit(UnsafeOperationError::Resize {
                requested: new_len,
                required,
                allocated,
            })?;
        }
        Ok(())
    }

    /// Set the length of an inline-item layout, zeroing slots gained.
    /// Elements dropped by shrinking are not released.
    pub(crate) fn apply_resize(&self, new_len: usize) -> Result<()> {
        let old = self.len().unwrap_or(0).max(0) as usize;
        if new_len > old {
            let start = self.overlay.element_addr_unchecked(old as isize)?;
            let bytes = (new_len - old) * self.layout().item_size;
            unsafe { ptr::write_bytes(start as *mut u8, 0, bytes) };
        }
        let field = self.layout().length_field.ok_or(InspectError::Unsupported {
            operation: "resize",
            kind: self.kind(),
        })?;
        self.overlay.write(field, &Value::Int(new_len as i64))?;
        debug!(
            "resized {} at {:#x} from {} to {}",
            self.layout().name(),
            self.address(),
            old,
            new_len
        );
        Ok(())
    }
}

impl fmt::Debug for BaseView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseView")
            .field("layout", &self.layout().name())
            .field("address", &format_args!("{:#x}", self.address()))
            .field("unsafe", &self.is_unsafe())
            .finish()
    }
}

/// Behaviour every view category provides, dispatched over [`View`].
#[enum_dispatch]
pub trait InspectView {
    fn as_base(&self) -> &BaseView;

    /// Change the live length, zeroing slots gained. Checked against the
    /// allocation unless in an unsafe scope.
    fn resize(&self, new_len: usize) -> Result<()> {
        let base = self.as_base();
        base.admit_resize(new_len)?;
        base.apply_resize(new_len)
    }

    /// Field-by-field dump in layout order.
    fn info(&self) -> Result<String> {
        display::info(self.as_base())
    }
}

/// Any object with no more specific view; also the fallback of the factory.
#[derive(Debug)]
pub struct ObjectView(BaseView);

impl ObjectView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }
}

impl InspectView for ObjectView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }
}

#[enum_dispatch(InspectView)]
pub enum View {
    ObjectView,
    IntView,
    FloatView,
    BytesView,
    TupleView,
    ListView,
    DictView,
    TypeView,
    FunctionView,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_base(), f)
    }
}

impl Deref for View {
    type Target = BaseView;

    fn deref(&self) -> &BaseView {
        self.as_base()
    }
}

macro_rules! downcast {
    ($($name:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $name(&self) -> Option<&$variant> {
                match self {
                    View::$variant(v) => Some(v),
                    _ => None,
                }
            }
        )*
    };
}

impl View {
    downcast! {
        int => IntView,
        float => FloatView,
        bytes => BytesView,
        tuple => TupleView,
        list => ListView,
        dict => DictView,
        type_view => TypeView,
        function => FunctionView,
    }

    pub fn as_sequence(&self) -> Option<&dyn SequenceView> {
        match self {
            View::TupleView(v) => Some(v as &dyn SequenceView),
            View::ListView(v) => Some(v as &dyn SequenceView),
            _ => None,
        }
    }

    fn sequence(&self, operation: &'static str) -> Result<&dyn SequenceView> {
        self.as_sequence().ok_or(InspectError::Unsupported {
            operation,
            kind: self.kind(),
        })
    }

    /// Element `index`; negative indexes count from the end.
    pub fn item(&self, index: isize) -> Result<Option<ObjRef>> {
        self.sequence("indexing")?.item(index)
    }

    /// Replace element `index`, moving ownership from the old element to
    /// `value`.
    pub fn set_item(&self, index: isize, value: &ObjRef) -> Result<()> {
        self.sequence("item assignment")?.set_item(index, value)
    }

    /// Copy `src` over this view's object. See [`crate::moves::move_view`].
    pub fn move_from(&self, src: &View) -> Result<View> {
        crate::moves::move_view(self, src, None)
    }

    /// Copy this view's object over `dest`.
    pub fn move_to(&self, dest: &View) -> Result<View> {
        crate::moves::move_view(dest, self, None)
    }
}

/// Enter an unsafe scope on every view at once.
pub fn unsafe_all<'a>(views: &[&'a View]) -> UnsafeScopes<'a> {
    UnsafeScopes::enter(views.iter().copied().map(|v| v.as_base().gate()))
}
