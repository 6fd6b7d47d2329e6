//! Allocation registry.
//!
//! Every block handed out by the runtime is recorded here with its usable
//! size, keyed by the address callers see (the object start, after any GC
//! header). This is what `allocation_size` answers from.

use super::{object::GcHead, RuntimeError, GC_HEAD_SIZE};
use crate::layout::align_up;
use parking_lot::Mutex;
use std::{alloc::Layout, collections::BTreeMap, ptr::NonNull};

/// Allocation granularity; usable sizes are rounded up to a multiple of this.
pub const GRANULE: usize = 16;

/// `gc_next` value of the last tracked object.
const GC_LIST_END: usize = 1;

struct Allocation {
    base: usize,
    layout: Layout,
    prefix: usize,
    usable: usize,
}

struct Heap {
    blocks: BTreeMap<usize, Allocation>,
    /// Address of the most recently tracked GC header, 0 when none.
    gc_tail: usize,
}

static HEAP: Mutex<Heap> = parking_lot::const_mutex(Heap {
    blocks: BTreeMap::new(),
    gc_tail: 0,
});

/// Allocate a zeroed block of at least `size` bytes. When `gc` is set the
/// block is prefixed by a [`GcHead`] and linked into the tracked list.
pub fn allocate(size: usize, gc: bool) -> Result<NonNull<u8>, RuntimeError> {
    let usable = align_up(size.max(1), GRANULE);
    let prefix = if gc { GC_HEAD_SIZE } else { 0 };
    let layout = Layout::from_size_align(prefix + usable, GRANULE)
        .map_err(|_| RuntimeError::OutOfMemory(size))?;

    let base = NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
        .ok_or(RuntimeError::OutOfMemory(size))?;
    let start = unsafe { base.as_ptr().add(prefix) };

    let mut heap = HEAP.lock();
    heap.blocks.insert(
        start as usize,
        Allocation {
            base: base.as_ptr() as usize,
            layout,
            prefix,
            usable,
        },
    );
    if gc {
        let head = base.as_ptr().cast::<GcHead>();
        unsafe { heap.track(head) };
    }

    // SAFETY: `start` lies inside a non-null allocation
    Ok(unsafe { NonNull::new_unchecked(start) })
}

/// Return a block obtained from [`allocate`].
///
/// # Safety
/// `start` must have been returned by [`allocate`] and not released since.
/// Releasing an unknown address is heap corruption and panics.
pub unsafe fn release(start: *mut u8) {
    let mut heap = HEAP.lock();
    let Some(block) = heap.blocks.remove(&(start as usize)) else {
        panic!("release of unknown or already released block {:p}", start);
    };
    if block.prefix != 0 {
        unsafe { heap.untrack(block.base as *mut GcHead) };
    }
    drop(heap);
    unsafe { std::alloc::dealloc(block.base as *mut u8, block.layout) };
}

/// Usable bytes starting at `addr`, or 0 when `addr` is not the start of a
/// live block.
pub fn allocation_size(addr: usize) -> usize {
    HEAP.lock().blocks.get(&addr).map_or(0, |b| b.usable)
}

pub fn is_live(addr: usize) -> bool {
    HEAP.lock().blocks.contains_key(&addr)
}

pub fn has_gc_head(addr: usize) -> bool {
    HEAP.lock()
        .blocks
        .get(&addr)
        .is_some_and(|b| b.prefix == GC_HEAD_SIZE)
}

/// Whether the object at `addr` has a GC header that is linked into the
/// tracked list.
pub fn is_gc_tracked(addr: usize) -> bool {
    let heap = HEAP.lock();
    match heap.blocks.get(&addr) {
        Some(b) if b.prefix == GC_HEAD_SIZE => {
            let head = b.base as *const GcHead;
            unsafe { (*head).gc_next != 0 }
        }
        _ => false,
    }
}

/// Number of live blocks, for leak checks in tests.
pub fn live_blocks() -> usize {
    HEAP.lock().blocks.len()
}

impl Heap {
    unsafe fn track(&mut self, head: *mut GcHead) {
        unsafe {
            (*head).gc_prev = self.gc_tail;
            (*head).gc_next = GC_LIST_END;
            if self.gc_tail != 0 {
                (*(self.gc_tail as *mut GcHead)).gc_next = head as usize;
            }
        }
        self.gc_tail = head as usize;
    }

    unsafe fn untrack(&mut self, head: *mut GcHead) {
        unsafe {
            if (*head).gc_next == 0 {
                return;
            }
            let prev = (*head).gc_prev;
            let next = (*head).gc_next;
            if prev != 0 {
                (*(prev as *mut GcHead)).gc_next = next;
            }
            if next == GC_LIST_END {
                self.gc_tail = prev;
            } else {
                (*(next as *mut GcHead)).gc_prev = prev;
            }
            (*head).gc_next = 0;
            (*head).gc_prev = 0;
        }
    }
}
