use super::{BaseView, InspectView};
use crate::{
    error::{InspectError, Result, UnsafeOperationError},
    layout::PTR_SIZE,
    overlay::Value,
    runtime::{ObjRef, RawObject, RuntimeError},
};
use std::{cmp::Ordering, ops::Range, ptr};
use tracing::{debug, warn};

fn normalize(index: isize, len: usize) -> isize {
    if index < 0 {
        index + len as isize
    } else {
        index
    }
}

/// Index access over containers of object pointers.
///
/// Assignment through [`SequenceView::set_item`] transfers ownership through
/// the runtime bridge: the new element gains a reference and the replaced one
/// loses one. Writing the element array through [`BaseView::set`] does not.
pub trait SequenceView: InspectView {
    fn length(&self) -> usize {
        self.as_base().len().unwrap_or(0).max(0) as usize
    }

    /// Element `index`, `None` for an empty (NULL) slot. Negative indexes
    /// count from the end.
    fn item(&self, index: isize) -> Result<Option<ObjRef>> {
        let base = self.as_base();
        let index = normalize(index, self.length());
        let ptr = base.overlay().element(index)?;
        Ok(unsafe { ObjRef::from_borrowed(ptr) })
    }

    /// Start address of the element storage and its usable size.
    fn storage(&self) -> Result<(usize, usize)> {
        let base = self.as_base();
        Ok((base.address(), base.mem_allocated()))
    }

    /// Replace element `index` with `value`.
    ///
    /// Out of range, or a slot past the end of the element storage, is an
    /// error in checked mode. In an unsafe scope the pointer is stored at the
    /// computed address anyway and nothing is released, since whatever was
    /// there is not an element.
    fn set_item(&self, index: isize, value: &ObjRef) -> Result<()> {
        let base = self.as_base();
        base.check_live();
        let bridge = base.inspector().bridge();
        let index = normalize(index, self.length());
        let addr = match base.overlay().element_addr(index) {
            Ok(addr) => addr,
            Err(InspectError::Index { index, len }) if base.is_unsafe() => {
                warn!("unsafe scope writes element {} of {} at {:#x}", index, len, base.address());
                let addr = base.overlay().element_addr_unchecked(index)?;
                return store_unreleased(base, addr, value);
            }
            Err(e) => return Err(e),
        };
        let (start, allocated) = self.storage()?;
        let offset = addr.saturating_sub(start);
        if offset + PTR_SIZE > allocated {
            base.admit(UnsafeOperationError::OutOfBounds {
                offset,
                size: PTR_SIZE,
                allocated,
            })?;
            return store_unreleased(base, addr, value);
        }
        unsafe {
            let old = ptr::read_unaligned(addr as *const *mut RawObject);
            bridge.increment_refcount(value.address());
            ptr::write_unaligned(addr as *mut *mut RawObject, value.as_ptr());
            if !old.is_null() {
                bridge.decrement_refcount(old as usize);
            }
        }
        Ok(())
    }

    /// Strong references to every element. Empty slots are skipped.
    fn items(&self) -> Result<Vec<ObjRef>> {
        self.slice(0..self.length())
    }

    fn slice(&self, range: Range<usize>) -> Result<Vec<ObjRef>> {
        let len = self.length();
        let mut out = Vec::with_capacity(range.len());
        for i in range {
            if i >= len {
                return Err(InspectError::Index { index: i as isize, len });
            }
            out.extend(self.item(i as isize)?);
        }
        Ok(out)
    }
}

fn store_unreleased(base: &BaseView, addr: usize, value: &ObjRef) -> Result<()> {
    unsafe {
        base.inspector().bridge().increment_refcount(value.address());
        ptr::write_unaligned(addr as *mut *mut RawObject, value.as_ptr());
    }
    Ok(())
}

/// Tuples keep their elements inline, so growing them is bounded by the
/// allocation the tuple already has.
#[derive(Debug)]
pub struct TupleView(BaseView);

impl TupleView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }

    fn slot(&self, index: usize) -> Result<*mut *mut RawObject> {
        Ok(self.0.overlay().element_addr_unchecked(index as isize)? as *mut *mut RawObject)
    }

    /// Insert `value` before `index`, clamped to `0..=len` like a list insert.
    pub fn insert(&self, index: isize, value: &ObjRef) -> Result<()> {
        let len = self.length();
        let index = normalize(index, len).clamp(0, len as isize) as usize;
        self.0.admit_resize(len + 1)?;
        self.0.apply_resize(len + 1)?;
        unsafe {
            let at = self.slot(index)?;
            ptr::copy(at, at.add(1), len - index);
            self.0.inspector().bridge().increment_refcount(value.address());
            ptr::write(at, value.as_ptr());
        }
        debug!("inserted into tuple at {:#x}[{}]", self.0.address(), index);
        Ok(())
    }

    pub fn append(&self, value: &ObjRef) -> Result<()> {
        self.insert(self.length() as isize, value)
    }

    fn take(&self, index: isize) -> Result<*mut RawObject> {
        let len = self.length();
        let index = normalize(index, len);
        let item = self.0.overlay().element(index)?;
        self.0.admit_resize(len - 1)?;
        let index = index as usize;
        unsafe {
            let at = self.slot(index)?;
            ptr::copy(at.add(1), at, len - index - 1);
            ptr::write(self.slot(len - 1)?, ptr::null_mut());
        }
        self.0.apply_resize(len - 1)?;
        Ok(item)
    }

    /// Remove element `index` (the last one by default) and hand its
    /// reference to the caller.
    pub fn pop(&self, index: Option<isize>) -> Result<Option<ObjRef>> {
        let item = self.take(index.unwrap_or(-1))?;
        Ok(unsafe { ObjRef::from_owned(item) })
    }

    /// Remove element `index` and release its reference.
    pub fn delete(&self, index: isize) -> Result<()> {
        let item = self.take(index)?;
        if !item.is_null() {
            unsafe { self.0.inspector().bridge().decrement_refcount(item as usize) };
        }
        Ok(())
    }

    /// Replace the elements in `range` with `values`, growing or shrinking
    /// the tuple in place. Bounds past the end are clamped. The new elements
    /// gain a reference and the replaced ones lose one.
    pub fn set_slice(&self, range: Range<usize>, values: &[ObjRef]) -> Result<()> {
        let len = self.length();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        let new_len = len - (end - start) + values.len();
        self.0.admit_resize(new_len)?;

        let bridge = self.0.inspector().bridge();
        let mut removed = Vec::with_capacity(end - start);
        for i in start..end {
            removed.push(unsafe { ptr::read(self.slot(i)?) });
        }
        if new_len > len {
            self.0.apply_resize(new_len)?;
        }
        unsafe {
            ptr::copy(self.slot(end)?, self.slot(start + values.len())?, len - end);
            for (i, value) in values.iter().enumerate() {
                bridge.increment_refcount(value.address());
                ptr::write(self.slot(start + i)?, value.as_ptr());
            }
            for i in new_len..len {
                ptr::write(self.slot(i)?, ptr::null_mut());
            }
        }
        if new_len < len {
            self.0.apply_resize(new_len)?;
        }
        for old in removed.into_iter().filter(|p| !p.is_null()) {
            unsafe { bridge.decrement_refcount(old as usize) };
        }
        debug!(
            "replaced {}..{} of tuple at {:#x} with {} items",
            start,
            end,
            self.0.address(),
            values.len()
        );
        Ok(())
    }

    /// Remove the elements in `range` and release their references.
    pub fn delete_slice(&self, range: Range<usize>) -> Result<()> {
        self.set_slice(range, &[])
    }

    /// Sort the elements in place with a stable sort. Only the element order
    /// changes; no reference counts do.
    pub fn sort_by<F>(&self, mut compare: F) -> Result<()>
    where
        F: FnMut(&ObjRef, &ObjRef) -> Ordering,
    {
        let len = self.length();
        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            let item = unsafe { ObjRef::from_borrowed(ptr::read(self.slot(i)?)) }
                .ok_or_else(|| RuntimeError::System(format!("cannot sort tuple with NULL item at index {}", i)))?;
            items.push(item);
        }
        items.sort_by(|a, b| compare(a, b));
        for (i, item) in items.iter().enumerate() {
            unsafe { ptr::write(self.slot(i)?, item.as_ptr()) };
        }
        Ok(())
    }
}

impl InspectView for TupleView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }
}

impl SequenceView for TupleView {}

/// Lists keep their elements in a separate buffer; resizes are bounded by
/// the buffer's allocation.
#[derive(Debug)]
pub struct ListView(BaseView);

impl ListView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }

    /// Capacity recorded in the list header.
    pub fn allocated(&self) -> Result<isize> {
        Ok(self.0.get("allocated")?.as_int().unwrap_or(0) as isize)
    }

    fn buffer(&self) -> Result<usize> {
        Ok(self.0.get("ob_item")?.as_usize().unwrap_or(0))
    }
}

impl InspectView for ListView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }

    fn resize(&self, new_len: usize) -> Result<()> {
        let base = &self.0;
        let buffer = self.buffer()?;
        let required = new_len * PTR_SIZE;
        let allocated = base.inspector().bridge().allocation_size(buffer);
        if required > allocated {
            base.admit(UnsafeOperationError::Resize {
                requested: new_len,
                required,
                allocated,
            })?;
        }
        let old = self.length();
        if new_len > old && buffer != 0 {
            let start = (buffer + old * PTR_SIZE) as *mut u8;
            unsafe { ptr::write_bytes(start, 0, (new_len - old) * PTR_SIZE) };
        }
        base.overlay().write("ob_size", &Value::Int(new_len as i64))?;
        debug!("resized list at {:#x} from {} to {}", base.address(), old, new_len);
        Ok(())
    }
}

impl SequenceView for ListView {
    fn storage(&self) -> Result<(usize, usize)> {
        let buffer = self.buffer()?;
        Ok((buffer, self.0.inspector().bridge().allocation_size(buffer)))
    }
}
