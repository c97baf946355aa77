//! The allocator context: buffer registration, allocation, release, resize
//! and the integrity auditor.

use core::mem::size_of;
use core::ptr::NonNull;

use crate::bin::{self, BIN_COUNT, BIN_SIZES};
use crate::chunk::{self, FreeHeader, InuseHeader, MIN_FREE_CHUNK, MIN_INUSE_CHUNK};
use crate::error::{AuditFault, AuditReason, HeapError};
use crate::llist::LlistNode;
use crate::tag::Tag;

/// Size, in bytes, of the synthetic in-use chunk planted at each end of a
/// registered buffer to terminate coalescing.
const SENTINEL_SIZE: u32 = (size_of::<InuseHeader>() + size_of::<crate::chunk::Footer>()) as u32;

/// A caller-supplied function that grows the heap when it runs out of memory.
///
/// Returns the base of a fresh region and its actual byte count (which must
/// be `>= ` the requested minimum), or `None` if no more memory is available.
pub type GrowCallback = fn(min_bytes: usize) -> Option<(NonNull<u8>, usize)>;

/// A dynamic memory allocator over one or more caller-supplied buffers.
///
/// `Heap` is placed at the head of the first buffer handed to [`Heap::new`]:
/// it borrows that memory rather than owning a heap-allocated copy of
/// itself, so it never needs an allocator of its own. `MAX_SMALL_REQUEST`
/// tunes the locality heuristic used by [`Heap::allocate`] (see that
/// method's docs); 256 bytes, the historical default, is used if
/// unspecified.
pub struct Heap<const MAX_SMALL_REQUEST: usize = 256> {
    free_bytes: usize,
    last_chunk: *mut FreeHeader,
    last_chunk_size: u32,
    external_alloc: Option<GrowCallback>,
    bins: [FreeHeader; BIN_COUNT],
}

// Raw pointers make this type `!Send`/`!Sync` by default, which matches
// the single-threaded, single-owner design (see crate-level docs). Callers
// wanting shared/concurrent access go through `Heaplock`.

impl<const MAX_SMALL_REQUEST: usize> Heap<MAX_SMALL_REQUEST> {
    /// Carves a context out of the head of `buffer` and registers the
    /// remainder as free memory.
    ///
    /// `buffer.len()` must be at least `size_of::<Heap>()`; if not,
    /// `HeapError::BufferTooSmall` is returned and `buffer` is untouched.
    pub fn new(buffer: &mut [u8]) -> Result<&mut Self, HeapError> {
        let required = size_of::<Self>();
        let got = buffer.len();
        if got < required {
            return Err(HeapError::BufferTooSmall { required, got });
        }

        let ctx_ptr = buffer.as_mut_ptr().cast::<Self>();

        unsafe {
            core::ptr::addr_of_mut!((*ctx_ptr).free_bytes).write(0);
            core::ptr::addr_of_mut!((*ctx_ptr).last_chunk).write(core::ptr::null_mut());
            core::ptr::addr_of_mut!((*ctx_ptr).last_chunk_size).write(0);
            core::ptr::addr_of_mut!((*ctx_ptr).external_alloc).write(None);

            for i in 0..BIN_COUNT {
                let bin_ptr = core::ptr::addr_of_mut!((*ctx_ptr).bins[i]);
                bin::init_bin(bin_ptr);
            }

            let heap = &mut *ctx_ptr;
            let rest_ptr = buffer.as_mut_ptr().add(required);
            let rest_len = got - required;
            let rest = core::slice::from_raw_parts_mut(rest_ptr, rest_len);
            heap.add_buffer(rest);

            #[cfg(feature = "logging")]
            log::debug!("heap initialised, {} bytes free", heap.free_bytes);

            Ok(heap)
        }
    }

    /// Registers `buffer` as additional memory this context can allocate from.
    ///
    /// If `buffer` is too small to hold two boundary sentinels plus a
    /// minimum free chunk, it is silently ignored — use [`try_add_buffer`]
    /// to be told about it instead.
    ///
    /// [`try_add_buffer`]: Heap::try_add_buffer
    pub fn add_buffer(&mut self, buffer: &mut [u8]) {
        let _ = self.try_add_buffer(buffer);
    }

    /// Fallible form of [`add_buffer`](Heap::add_buffer).
    pub fn try_add_buffer(&mut self, buffer: &mut [u8]) -> Result<(), HeapError> {
        let got = buffer.len();
        let required = 2 * SENTINEL_SIZE as usize + MIN_FREE_CHUNK;
        if got < required {
            return Err(HeapError::BufferTooSmall { required, got });
        }

        unsafe { self.register_buffer(buffer.as_mut_ptr(), got as u32) };
        Ok(())
    }

    unsafe fn register_buffer(&mut self, memory: *mut u8, size: u32) {
        // The free region's size must stay a multiple of `chunk::ALIGN`; any
        // slop from a buffer length that isn't is dropped from the tail.
        let free_size = (size - 2 * SENTINEL_SIZE) & !(chunk::ALIGN - 1);

        (*memory.cast::<InuseHeader>()).tag = Tag::new(SENTINEL_SIZE, true);
        (*chunk::footer_of(memory, SENTINEL_SIZE)).tag = Tag::new(SENTINEL_SIZE, true);

        let back = memory.add(SENTINEL_SIZE as usize + free_size as usize);
        (*back.cast::<InuseHeader>()).tag = Tag::new(SENTINEL_SIZE, true);
        (*chunk::footer_of(back, SENTINEL_SIZE)).tag = Tag::new(SENTINEL_SIZE, true);

        let free_ptr = memory.add(SENTINEL_SIZE as usize);
        self.add_free_chunk(free_ptr, free_size);
        self.free_bytes += free_size as usize;
    }

    unsafe fn add_free_chunk(&mut self, ptr: *mut u8, size: u32) {
        debug_assert!(size as usize >= MIN_FREE_CHUNK);
        (*ptr.cast::<FreeHeader>()).tag = Tag::new(size, false);
        (*chunk::footer_of(ptr, size)).tag = Tag::new(size, false);
        bin::insert(self.bins.as_mut_ptr(), ptr.cast());
    }

    /// Rounds a user request up to a chunk size, or `None` if it cannot be
    /// represented (the request plus overhead would reach 2 GiB).
    fn round_up_request(size: usize) -> Option<u32> {
        let total = size.checked_add(MIN_INUSE_CHUNK)?;
        let total = total.max(MIN_FREE_CHUNK);
        if total > u32::MAX as usize {
            return None;
        }
        let total = chunk::round_up(total as u32);
        if total as usize >= BIN_SIZES[BIN_COUNT - 1] as usize {
            return None;
        }
        Some(total)
    }

    /// Allocates `size` bytes, or `None` on exhaustion (after attempting the
    /// growth callback, if one is set).
    ///
    /// **Locality heuristic:** when the chosen chunk is larger than strictly
    /// necessary, the most-recently-split remainder (`last_chunk`) is reused
    /// instead, provided it is large enough and the request is small
    /// (`<= MAX_SMALL_REQUEST`). This keeps small, frequent allocations
    /// clustered rather than scattered across whichever oversized chunk the
    /// fit search happened to land on.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        let need = Self::round_up_request(size)?;
        self.allocate_need(need)
    }

    fn allocate_need(&mut self, need: u32) -> Option<NonNull<u8>> {
        if need as usize > self.free_bytes {
            return self.out_of_memory(need);
        }

        unsafe {
            let bins_ptr = self.bins.as_mut_ptr();
            let mut bin_idx = bin::find_bin(need);

            while LlistNode::is_empty(bins_ptr.add(bin_idx).cast()) {
                bin_idx += 1;
                if bin_idx >= BIN_COUNT {
                    return self.out_of_memory(need);
                }
            }

            let mut chunk = bin::find_chunk(bins_ptr.add(bin_idx), need);

            if chunk == bins_ptr.add(bin_idx) {
                loop {
                    bin_idx += 1;
                    if bin_idx >= BIN_COUNT {
                        return self.out_of_memory(need);
                    }
                    if !LlistNode::is_empty(bins_ptr.add(bin_idx).cast()) {
                        break;
                    }
                }
                chunk = (*bins_ptr.add(bin_idx)).node.next.cast();
            }

            if need < (*chunk).tag.size()
                && need as usize <= self.last_chunk_size as usize
                && need as usize <= MAX_SMALL_REQUEST
            {
                chunk = self.last_chunk;
            }

            bin::remove(chunk);

            let chunk_size = (*chunk).tag.size();
            let header = self.split_chunk(chunk.cast::<u8>(), chunk_size, need);

            NonNull::new(chunk::user_ptr_of(header))
        }
    }

    /// Splits an unlinked free chunk of `total_size` bytes into an in-use
    /// chunk of exactly `want` bytes, returning the remainder to the bins
    /// (as `last_chunk`) if it would be a usable free chunk. If the
    /// remainder is too small to stand alone, it is absorbed into the
    /// allocation instead.
    unsafe fn split_chunk(&mut self, header: *mut u8, total_size: u32, want: u32) -> *mut u8 {
        let mut want = want;
        let residue = total_size - want;

        if (residue as usize) < MIN_FREE_CHUNK {
            want += residue;
            self.last_chunk_size = 0;
        } else {
            let remainder = header.add(want as usize);
            self.add_free_chunk(remainder, residue);
            self.last_chunk = remainder.cast();
            self.last_chunk_size = residue;
        }

        (*header.cast::<InuseHeader>()).tag = Tag::new(want, true);
        (*chunk::footer_of(header, want)).tag = Tag::new(want, true);
        self.free_bytes -= want as usize;

        header
    }

    /// Invokes the growth callback (if any) for at least `need + 2 *
    /// MIN_INUSE_CHUNK` bytes, registers what it returns, and retries the
    /// allocation once.
    fn out_of_memory(&mut self, need: u32) -> Option<NonNull<u8>> {
        let callback = self.external_alloc?;
        let total = need as usize + 2 * MIN_INUSE_CHUNK;
        let (ptr, got) = callback(total)?;
        if got < total {
            return None;
        }

        #[cfg(feature = "logging")]
        log::warn!("heap exhausted, grew by {got} bytes via external callback");

        unsafe {
            let region = core::slice::from_raw_parts_mut(ptr.as_ptr(), got);
            self.add_buffer(region);
        }

        let user_size = need as usize - MIN_INUSE_CHUNK;
        self.allocate(user_size)
    }

    /// Returns a previously-allocated chunk to the heap. `None` is a no-op.
    ///
    /// Merges with either or both address-adjacent neighbours if they are
    /// free, then reinserts the (possibly merged) chunk into the
    /// appropriate bin.
    ///
    /// ### Safety-relevant precondition
    /// `ptr`, if `Some`, must have been returned by a prior `allocate`,
    /// `resize` or `zero_allocate` call on this same context and not
    /// already released. Violating this is a caller bug; debug builds
    /// assert it, release builds leave behaviour unspecified.
    pub fn release(&mut self, ptr: Option<NonNull<u8>>) {
        let Some(ptr) = ptr else { return };

        unsafe {
            let header = chunk::header_of_user_ptr(ptr.as_ptr());
            let size = (*header.cast::<InuseHeader>()).tag.size();
            let footer = chunk::footer_of(header, size);

            debug_assert!((*header.cast::<InuseHeader>()).tag.is_inuse());
            debug_assert_eq!((*footer).tag.size(), size);

            self.free_bytes += size as usize;

            let mut merged_header = header;
            let mut merged_size = size;

            let prev_footer = chunk::prev_footer(header);
            if (*prev_footer).tag.is_free() {
                let prev_header = chunk::prev_chunk(prev_footer).cast::<FreeHeader>();
                debug_assert_eq!((*prev_header).tag.size(), (*prev_footer).tag.size());
                bin::remove(prev_header);
                merged_size += (*prev_header).tag.size();
                merged_header = prev_header.cast();
            }

            let next_header = chunk::next_chunk(header, size).cast::<FreeHeader>();
            if (*next_header).tag.is_free() {
                bin::remove(next_header);
                merged_size += (*next_header).tag.size();
                if core::ptr::eq(self.last_chunk, next_header) {
                    self.last_chunk_size = 0;
                }
            }

            self.add_free_chunk(merged_header, merged_size);
        }
    }

    /// Resizes a previously-allocated chunk to `new_size` bytes, preserving
    /// its contents up to `min(old_size, new_size)`.
    ///
    /// `ptr == None` behaves as `allocate(new_size)`. Tries, in order: shrink
    /// in place (if the residue would be usable, otherwise the chunk is left
    /// unchanged and the original pointer returned); absorb a free
    /// right-neighbour in place if doing so is sufficient; otherwise
    /// allocate a fresh chunk, copy, and release the old one.
    pub fn resize(&mut self, ptr: Option<NonNull<u8>>, new_size: usize) -> Option<NonNull<u8>> {
        let Some(ptr) = ptr else { return self.allocate(new_size) };

        unsafe {
            let header = chunk::header_of_user_ptr(ptr.as_ptr());
            let old_size = (*header.cast::<InuseHeader>()).tag.size();
            let old_footer = chunk::footer_of(header, old_size);

            debug_assert!((*header.cast::<InuseHeader>()).tag.is_inuse());
            debug_assert_eq!((*old_footer).tag.size(), old_size);

            let need = Self::round_up_request(new_size)?;

            if need <= old_size {
                let residue = old_size - need;
                if (residue as usize) < MIN_FREE_CHUNK {
                    return Some(ptr);
                }

                (*header.cast::<InuseHeader>()).tag = Tag::new(need, true);
                (*chunk::footer_of(header, need)).tag = Tag::new(need, true);

                let tail = header.add(need as usize);
                (*tail.cast::<InuseHeader>()).tag = Tag::new(residue, true);
                (*chunk::footer_of(tail, residue)).tag = Tag::new(residue, true);

                self.release(NonNull::new(chunk::user_ptr_of(tail)));

                return Some(ptr);
            }

            let next_header = chunk::next_chunk(header, old_size).cast::<FreeHeader>();
            if (*next_header).tag.is_free() {
                let next_size = (*next_header).tag.size();
                let combined = old_size + next_size;

                // Corrected predicate: the historical source's `<` here is
                // inverted and would reject a sufficient neighbour.
                if combined >= need {
                    bin::remove(next_header);
                    if core::ptr::eq(self.last_chunk, next_header) {
                        self.last_chunk_size = 0;
                    }
                    self.free_bytes -= next_size as usize;

                    (*header.cast::<InuseHeader>()).tag = Tag::new(combined, true);
                    (*chunk::footer_of(header, combined)).tag = Tag::new(combined, true);

                    return Some(ptr);
                }
            }

            let old_user_size = old_size as usize - MIN_INUSE_CHUNK;
            let new_ptr = self.allocate(new_size)?;
            let copy_len = old_user_size.min(new_size);
            core::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), copy_len);
            self.release(Some(ptr));

            Some(new_ptr)
        }
    }

    /// Allocates `count * size` bytes and fills them with zero.
    ///
    /// `count.checked_mul(size)` guards the multiplication; `None` is
    /// returned on overflow rather than silently truncating.
    pub fn zero_allocate(&mut self, count: usize, size: usize) -> Option<NonNull<u8>> {
        let total = count.checked_mul(size)?;
        let ptr = self.allocate(total)?;
        unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0, total) };
        Some(ptr)
    }

    /// Installs (or clears) the growth callback invoked on out-of-memory.
    pub fn set_external_alloc(&mut self, callback: Option<GrowCallback>) {
        self.external_alloc = callback;
    }

    /// Total bytes currently held in free chunks across every attached buffer.
    pub fn free_bytes(&self) -> usize {
        self.free_bytes
    }

    /// Walks every bin, verifying chunk/footer/link consistency and that
    /// the accumulated free byte total matches [`free_bytes`](Heap::free_bytes).
    ///
    /// Returns the first corruption found, or `None` if the heap is clean.
    /// Never called implicitly; this is a diagnostic the caller opts into.
    pub fn audit(&self) -> Option<AuditFault> {
        let mut sum = 0usize;

        unsafe {
            for i in 0..BIN_COUNT {
                let bin_ptr = (core::ptr::addr_of!(self.bins[i])) as *mut FreeHeader;

                if (*bin_ptr).tag.is_inuse()
                    || (*bin_ptr).tag.size() != size_of::<FreeHeader>() as u32
                {
                    return Some(Self::fault(bin_ptr.cast(), AuditReason::BadSentinel));
                }

                let sentinel = bin_ptr.cast::<LlistNode>();
                let mut last = sentinel;
                let mut node = (*sentinel).next;

                while node != sentinel {
                    let chunk = node.cast::<FreeHeader>();

                    if (*chunk).tag.is_inuse() {
                        return Some(Self::fault(chunk.cast(), AuditReason::BadChunkStatus));
                    }
                    if (*node).prev != last {
                        return Some(Self::fault(chunk.cast(), AuditReason::BrokenLink));
                    }

                    let size = (*chunk).tag.size();
                    let footer = chunk::footer_of(chunk.cast(), size);
                    if (*footer).tag.size() != size {
                        return Some(Self::fault(footer.cast(), AuditReason::SizeMismatch));
                    }

                    sum += size as usize;
                    last = node;
                    node = (*node).next;
                }
            }
        }

        if sum != self.free_bytes {
            return Some(Self::fault(
                self as *const Self as *const u8,
                AuditReason::FreeByteMismatch,
            ));
        }

        None
    }

    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    fn fault(at: *const u8, reason: AuditReason) -> AuditFault {
        #[cfg(feature = "logging")]
        log::error!("heap corruption detected: {reason:?} at {at:p}");
        AuditFault { at, reason }
    }
}

impl<const MAX_SMALL_REQUEST: usize> core::fmt::Debug for Heap<MAX_SMALL_REQUEST> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut occupied_bins = 0usize;
        unsafe {
            for i in 0..BIN_COUNT {
                let bin_ptr = core::ptr::addr_of!(self.bins[i]) as *mut LlistNode;
                if !LlistNode::is_empty(bin_ptr) {
                    occupied_bins += 1;
                }
            }
        }

        f.debug_struct("Heap")
            .field("free_bytes", &self.free_bytes)
            .field("last_chunk_size", &self.last_chunk_size)
            .field("bin_count", &BIN_COUNT)
            .field("occupied_bins", &occupied_bins)
            .finish()
    }
}

static mut CURRENT: *mut Heap = core::ptr::null_mut();

/// Returns the process-wide current heap context, if one has been installed.
///
/// ### Safety
/// Single-threaded use only: calling this concurrently with [`set_current`]
/// from another thread is undefined behaviour. The returned reference is
/// only as valid as the pointer last installed by `set_current`.
pub unsafe fn current() -> Option<&'static mut Heap> {
    unsafe { CURRENT.as_mut() }
}

/// Installs `ptr` as the process-wide current heap context.
///
/// ### Safety
/// `ptr` must be valid (or null) for as long as it remains installed, and
/// this must not race with another thread's call to `current`/`set_current`.
pub unsafe fn set_current(ptr: *mut Heap) {
    unsafe { CURRENT = ptr };
}

/// Allocates `size` bytes from the process-wide current context.
///
/// A thin convenience wrapper around [`Heap::allocate`] for callers who'd
/// rather thread a [`set_current`]-installed context implicitly than carry
/// a `&mut Heap` themselves. Fails with `NoCurrentContext` if none has been
/// installed yet, or `ExternalAllocFailed` if the context is exhausted.
///
/// ### Safety
/// Same as [`current`]: single-threaded use only.
pub unsafe fn allocate(size: usize) -> Result<NonNull<u8>, HeapError> {
    let heap = unsafe { current() }.ok_or(HeapError::NoCurrentContext)?;
    heap.allocate(size).ok_or(HeapError::ExternalAllocFailed)
}

/// Releases a pointer previously returned by [`allocate`] back to the
/// process-wide current context.
///
/// ### Safety
/// Same as [`current`]: single-threaded use only. `ptr`, if `Some`, must
/// satisfy [`Heap::release`]'s precondition.
pub unsafe fn release(ptr: Option<NonNull<u8>>) -> Result<(), HeapError> {
    let heap = unsafe { current() }.ok_or(HeapError::NoCurrentContext)?;
    heap.release(ptr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_heap(buf: &mut [u8]) -> &mut Heap {
        Heap::new(buf).expect("buffer large enough")
    }

    #[test]
    fn allocate_and_release_round_trips_free_bytes() {
        let mut buf = [0u8; 65536];
        let heap = new_heap(&mut buf);
        let initial = heap.free_bytes();

        let p = heap.allocate(64).expect("allocation succeeds");
        assert!(heap.free_bytes() < initial);

        heap.release(Some(p));
        assert_eq!(heap.free_bytes(), initial);
        assert_eq!(heap.audit(), None);
    }

    #[test]
    fn release_none_is_a_no_op() {
        let mut buf = [0u8; 65536];
        let heap = new_heap(&mut buf);
        let before = heap.free_bytes();
        heap.release(None);
        assert_eq!(heap.free_bytes(), before);
    }

    #[test]
    fn split_then_coalesce_restores_single_free_chunk() {
        let mut buf = [0u8; 65536];
        let heap = new_heap(&mut buf);
        let initial = heap.free_bytes();

        let a = heap.allocate(64).unwrap();
        let b = heap.allocate(64).unwrap();
        let c = heap.allocate(64).unwrap();

        heap.release(Some(a));
        heap.release(Some(c));
        heap.release(Some(b));

        assert_eq!(heap.free_bytes(), initial);
        assert_eq!(heap.audit(), None);
    }

    #[test]
    fn resize_shrink_keeps_pointer_and_preserves_prefix() {
        let mut buf = [0u8; 65536];
        let heap = new_heap(&mut buf);

        let p = heap.allocate(200).unwrap();
        unsafe { core::ptr::write_bytes(p.as_ptr(), 0xAB, 50) };

        let q = heap.resize(Some(p), 50).expect("shrink succeeds");
        assert_eq!(q, p);

        for i in 0..50 {
            assert_eq!(unsafe { *q.as_ptr().add(i) }, 0xAB);
        }
        assert_eq!(heap.audit(), None);
    }

    #[test]
    fn resize_grow_beyond_buffer_neighbour_reallocates() {
        let mut buf = [0u8; 65536];
        let heap = new_heap(&mut buf);

        let p = heap.allocate(100).unwrap();
        unsafe { core::ptr::write_bytes(p.as_ptr(), 0x42, 100) };

        let r = heap.resize(Some(p), 3000).expect("grow succeeds");
        for i in 0..100 {
            assert_eq!(unsafe { *r.as_ptr().add(i) }, 0x42);
        }
        assert_eq!(heap.audit(), None);
    }

    #[test]
    fn zero_allocate_fills_with_zero() {
        let mut buf = [0xFFu8; 65536];
        let heap = new_heap(&mut buf);
        let p = heap.zero_allocate(10, 8).unwrap();
        for i in 0..80 {
            assert_eq!(unsafe { *p.as_ptr().add(i) }, 0);
        }
    }

    #[test]
    fn zero_allocate_overflow_returns_none() {
        let mut buf = [0u8; 65536];
        let heap = new_heap(&mut buf);
        assert!(heap.zero_allocate(usize::MAX, 2).is_none());
    }

    // Exercises both branches of the global convenience layer in one test:
    // `CURRENT` is process-wide state, so letting another test mutate it
    // concurrently would race.
    #[test]
    fn global_allocate_and_release_dispatch_through_current_context() {
        unsafe { set_current(core::ptr::null_mut()) };
        assert_eq!(unsafe { allocate(64) }, Err(HeapError::NoCurrentContext));
        assert_eq!(unsafe { release(None) }, Err(HeapError::NoCurrentContext));

        let mut buf = [0u8; 65536];
        let heap = new_heap(&mut buf);
        unsafe { set_current(heap as *mut Heap) };

        let p = unsafe { allocate(64) }.expect("context installed");
        unsafe { release(Some(p)) }.expect("context installed");
        assert_eq!(heap.audit(), None);

        unsafe { set_current(core::ptr::null_mut()) };
    }

    #[test]
    fn out_of_memory_without_callback_returns_none() {
        let mut buf = [0u8; 4096];
        let heap = new_heap(&mut buf);
        let mut allocations = alloc::vec::Vec::new();

        loop {
            match heap.allocate(64) {
                Some(p) => allocations.push(p),
                None => break,
            }
        }

        assert!(heap.free_bytes() < 64 + MIN_FREE_CHUNK);

        for p in allocations {
            heap.release(Some(p));
        }
        assert_eq!(heap.audit(), None);
    }

    #[test]
    fn lru_tie_break_picks_oldest_chunk_first() {
        let mut buf = [0u8; 65536];
        let heap = new_heap(&mut buf);

        let a = heap.allocate(64).unwrap();
        let b = heap.allocate(64).unwrap();
        let c = heap.allocate(64).unwrap();

        heap.release(Some(a));
        heap.release(Some(c));
        heap.release(Some(b));

        let next = heap.allocate(64).unwrap();
        assert_eq!(next, a);
    }

    #[test]
    fn multi_buffer_allocation_stays_auditable() {
        let mut first = [0u8; 65536];
        let mut second = [0u8; 16384];

        let heap = new_heap(&mut first);
        heap.add_buffer(&mut second);

        let p1 = heap.allocate(4096).unwrap();
        let p2 = heap.allocate(1600).unwrap();
        let p3 = heap.allocate(1600).unwrap();
        heap.release(Some(p1));
        let p1b = heap.allocate(1600).unwrap();
        heap.release(Some(p3));
        heap.release(Some(p1b));
        heap.release(Some(p2));

        assert_eq!(heap.audit(), None);
    }
}
