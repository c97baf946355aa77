//! A mutex-guarded wrapper installing a [`Heap`] as the process or
//! per-object allocator, via [`GlobalAlloc`] and (behind the `allocator`
//! feature) `allocator-api2`'s stable polyfill of the unstable `Allocator`
//! trait.

use core::alloc::{GlobalAlloc, Layout};
use core::mem::size_of;
use core::ptr::NonNull;

use crate::error::HeapError;
use crate::heap::Heap;

/// Minimum alignment the core allocator's chunks are guaranteed to satisfy.
/// Requests at or below this need no extra padding.
const MIN_ALIGN: usize = 8;

/// Guards a [`Heap`] behind a `lock_api`-compatible mutex.
///
/// The wrapped heap is not owned by value — it lives inside a caller-supplied
/// buffer, as [`Heap::new`] requires — so `Heaplock` starts out uninitialised
/// and is pointed at a heap via [`init`](Heaplock::init).
pub struct Heaplock<R> {
    mutex: lock_api::Mutex<R, *mut Heap>,
}

unsafe impl<R: lock_api::RawMutex + Send> Send for Heaplock<R> {}
unsafe impl<R: lock_api::RawMutex + Send> Sync for Heaplock<R> {}

impl<R: lock_api::RawMutex> Heaplock<R> {
    /// Creates an uninitialised lock. Call [`init`](Heaplock::init) before
    /// allocating through it.
    pub const fn new() -> Self {
        Self { mutex: lock_api::Mutex::const_new(R::INIT, core::ptr::null_mut()) }
    }

    /// Places a heap context at the head of `buffer` and installs it as the
    /// context this lock guards, replacing whatever was installed before.
    ///
    /// ### Safety
    /// `buffer` must remain valid and not be accessed by anything else for
    /// as long as it remains installed here.
    pub unsafe fn init(&self, buffer: &'static mut [u8]) -> Result<(), HeapError> {
        let heap = Heap::new(buffer)?;
        *self.mutex.lock() = heap as *mut Heap;
        Ok(())
    }
}

impl<R: lock_api::RawMutex> Default for Heaplock<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Rounds `size` up so that an aligned pointer plus a stashed offset both
/// fit within it, for alignments beyond what the core allocator guarantees.
fn padded_layout(layout: Layout) -> (usize, usize) {
    if layout.align() <= MIN_ALIGN {
        (layout.size(), 0)
    } else {
        (layout.size() + layout.align() + size_of::<usize>(), layout.align())
    }
}

unsafe fn heap_alloc(heap: &mut Heap, layout: Layout) -> *mut u8 {
    let (total, align) = padded_layout(layout);

    let Some(raw) = heap.allocate(total) else { return core::ptr::null_mut() };

    if align == 0 {
        return raw.as_ptr();
    }

    let raw_addr = raw.as_ptr() as usize;
    let aligned_addr = (raw_addr + size_of::<usize>() + align - 1) & !(align - 1);
    let aligned = aligned_addr as *mut u8;

    unsafe { (aligned as *mut usize).sub(1).write(raw_addr) };
    aligned
}

unsafe fn heap_dealloc(heap: &mut Heap, ptr: *mut u8, layout: Layout) {
    if layout.align() <= MIN_ALIGN {
        heap.release(NonNull::new(ptr));
        return;
    }

    let raw_addr = unsafe { (ptr as *mut usize).sub(1).read() };
    heap.release(NonNull::new(raw_addr as *mut u8));
}

unsafe impl<R: lock_api::RawMutex> GlobalAlloc for Heaplock<R> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let mut guard = self.mutex.lock();
        match unsafe { guard.as_mut() } {
            Some(heap) => unsafe { heap_alloc(heap, layout) },
            None => core::ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let mut guard = self.mutex.lock();
        if let Some(heap) = unsafe { guard.as_mut() } {
            unsafe { heap_dealloc(heap, ptr, layout) };
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > MIN_ALIGN {
            // Alignments beyond MIN_ALIGN stash metadata ahead of the
            // returned pointer; resizing in place would require re-deriving
            // that layout, so fall back to alloc + copy + dealloc.
            let new_layout = Layout::from_size_align_unchecked(new_size, layout.align());
            let new_ptr = unsafe { GlobalAlloc::alloc(self, new_layout) };
            if !new_ptr.is_null() {
                let copy_len = layout.size().min(new_size);
                unsafe { core::ptr::copy_nonoverlapping(ptr, new_ptr, copy_len) };
                unsafe { GlobalAlloc::dealloc(self, ptr, layout) };
            }
            return new_ptr;
        }

        let mut guard = self.mutex.lock();
        match unsafe { guard.as_mut() } {
            Some(heap) => {
                let total = new_size.max(1);
                match heap.resize(NonNull::new(ptr), total) {
                    Some(p) => p.as_ptr(),
                    None => core::ptr::null_mut(),
                }
            }
            None => core::ptr::null_mut(),
        }
    }
}

#[cfg(feature = "allocator")]
mod allocator_api {
    use super::*;
    use allocator_api2::alloc::{AllocError, Allocator};

    unsafe impl<R: lock_api::RawMutex> Allocator for Heaplock<R> {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            let mut guard = self.mutex.lock();
            let heap = unsafe { guard.as_mut() }.ok_or(AllocError)?;
            let ptr = unsafe { heap_alloc(heap, layout) };
            let ptr = NonNull::new(ptr).ok_or(AllocError)?;
            Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            let mut guard = self.mutex.lock();
            if let Some(heap) = unsafe { guard.as_mut() } {
                unsafe { heap_dealloc(heap, ptr.as_ptr(), layout) };
            }
        }
    }
}
