//! Copying one object's memory over another's.
//!
//! A move overwrites the destination in place: every existing reference to
//! the destination observes the source's type and contents afterwards. The
//! bytes are copied verbatim, so any object pointers in the copied region
//! end up referenced from both objects without their counts being raised.
//! Caches the runtime keeps by identity (interned values, hashes stored in
//! other containers) are not updated.

use crate::{
    error::{Result, UnsafeOperationError},
    layout::LayoutKind,
    overlay::Overlay,
    view::{factory, View},
};
use std::{mem::size_of, ptr};
use tracing::debug;

/// Bytes skipped at the start of a move by default: the reference count, so
/// the destination keeps its own.
pub const DEFAULT_OFFSET: usize = size_of::<isize>();

/// Check a move against the destination's gate.
fn admit(dest: &View, src: &View, offset: usize, copy_length: usize) -> Result<()> {
    let source_tracked = src.is_gc();
    let dest_tracked = dest.is_gc();
    if source_tracked != dest_tracked {
        dest.admit(UnsafeOperationError::GcMismatch {
            source_tracked,
            dest_tracked,
        })?;
    }
    let required = offset + copy_length;
    let allocated = dest.mem_allocated();
    if required > allocated {
        dest.admit(UnsafeOperationError::Move {
            offset,
            copy_length,
            required,
            allocated,
        })?;
    }
    Ok(())
}

fn invalidate_hash(view: &View) -> Result<()> {
    if let Some(bytes) = view.bytes() {
        bytes.invalidate_hash()?;
    }
    Ok(())
}

/// Copy `src`'s memory from `offset` (default [`DEFAULT_OFFSET`]) to the end
/// of its object over the same range of `dest`, and return a view of `dest`
/// shaped like `src`.
///
/// Checked unless `dest` is in an unsafe scope: the copy must end inside
/// `dest`'s allocation and both objects must agree on GC tracking. If the
/// type pointer is overwritten, the reference `dest` held on its old type
/// moves to the new one.
pub fn move_view(dest: &View, src: &View, offset: Option<usize>) -> Result<View> {
    dest.check_live();
    src.check_live();
    let offset = offset.unwrap_or(DEFAULT_OFFSET);
    let copy_length = src.mem_size()?.saturating_sub(offset);
    admit(dest, src, offset, copy_length)?;

    let inspector = dest.inspector();
    let header = unsafe { Overlay::new(dest.address(), inspector.layout(LayoutKind::Object)?) };
    let old_type = header.read("ob_type")?.as_usize().unwrap_or(0);

    invalidate_hash(src)?;
    unsafe {
        ptr::copy(
            (src.address() + offset) as *const u8,
            (dest.address() + offset) as *mut u8,
            copy_length,
        );
    }

    let new_type = header.read("ob_type")?.as_usize().unwrap_or(0);
    if new_type != old_type {
        let bridge = inspector.bridge();
        unsafe {
            if new_type != 0 {
                bridge.increment_refcount(new_type);
            }
            if old_type != 0 {
                bridge.decrement_refcount(old_type);
            }
        }
    }
    debug!(
        "moved {} bytes of {} at {:#x} over {:#x} (offset {})",
        copy_length,
        src.layout().name(),
        src.address(),
        dest.address(),
        offset
    );

    let moved = factory::view_with(inspector, dest.address(), src.kind(), dest.base().cloned())?;
    invalidate_hash(&moved)?;
    Ok(moved)
}
