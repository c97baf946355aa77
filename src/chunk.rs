//! Chunk layout and the pointer arithmetic used to walk between chunks.
//!
//! A free chunk looks like:
//!
//! ```text
//!  ______________________
//! | STATUS (free)        |  \
//! |______________________|   FreeHeader
//! | SIZE (in bytes)      |  /
//! |______________________|
//! | PREVIOUS FREE CHUNK   |  \
//! |______________________|   LlistNode
//! | NEXT FREE CHUNK       |  /
//! |______________________|
//! |      ...free...      |
//! |______________________|
//! | SIZE (in bytes)      |  Footer
//! |______________________|
//! ```
//!
//! and an in-use chunk looks like:
//!
//! ```text
//!  _____________________
//! | STATUS (inuse)      |  InuseHeader
//! |_____________________|
//! |        DATA         |
//! |        ...          |
//! |_____________________|
//! | SIZE (in bytes)     |  Footer
//! |_____________________|
//! ```
//!
//! The footer lets [`prev_chunk`] walk backwards without scanning: every
//! chunk, free or in-use, ends with a footer carrying its own size.

use core::mem::size_of;

use crate::llist::LlistNode;
use crate::tag::Tag;

/// Header prefixing a free chunk.
///
/// `node` is placed first so a `*mut FreeHeader` and its embedded
/// `*mut LlistNode` share an address — [`crate::bin`] casts freely between
/// the two instead of threading field offsets through every list walk.
#[repr(C)]
pub(crate) struct FreeHeader {
    pub node: LlistNode,
    pub tag: Tag,
}

/// Header prefixing an in-use (allocated) chunk.
#[repr(C)]
pub(crate) struct InuseHeader {
    pub tag: Tag,
}

/// Trailer present at the end of every chunk, free or in-use.
#[repr(C)]
pub(crate) struct Footer {
    pub tag: Tag,
}

/// Every chunk's byte size is kept a multiple of this, so that a `FreeHeader`'s
/// internal pointers, wherever the chunk starts, stay pointer-aligned, and so
/// the in-use flag packed into `Tag`'s low bit never collides with a real size bit.
pub(crate) const ALIGN: u32 = 8;

#[inline]
pub(crate) const fn round_up(n: u32) -> u32 {
    (n + (ALIGN - 1)) & !(ALIGN - 1)
}

#[inline]
const fn round_up_usize(n: usize) -> usize {
    (n + (ALIGN as usize - 1)) & !(ALIGN as usize - 1)
}

pub(crate) const MIN_FREE_CHUNK: usize =
    round_up_usize(size_of::<FreeHeader>() + size_of::<Footer>());
pub(crate) const MIN_INUSE_CHUNK: usize =
    round_up_usize(size_of::<InuseHeader>() + size_of::<Footer>());

/// Returns the footer belonging to the chunk starting at `header` with the given `size`.
///
/// ### Safety
/// `header .. header + size` must be a valid chunk.
#[inline]
pub(crate) unsafe fn footer_of(header: *mut u8, size: u32) -> *mut Footer {
    header.add(size as usize).sub(size_of::<Footer>()).cast()
}

/// Returns the header of the chunk immediately following `header`, given its `size`.
///
/// ### Safety
/// `header .. header + size` must be a valid chunk, and a further chunk must exist past it.
#[inline]
pub(crate) unsafe fn next_chunk(header: *mut u8, size: u32) -> *mut u8 {
    header.add(size as usize)
}

/// Returns the footer of the chunk immediately preceding `header`.
///
/// ### Safety
/// A chunk must exist immediately before `header`.
#[inline]
pub(crate) unsafe fn prev_footer(header: *mut u8) -> *mut Footer {
    header.sub(size_of::<Footer>()).cast()
}

/// Returns the header of the chunk ending at `footer`.
///
/// ### Safety
/// `footer` must be the valid footer of some chunk.
#[inline]
pub(crate) unsafe fn prev_chunk(footer: *mut Footer) -> *mut u8 {
    let size = (*footer).tag.size();
    (footer.cast::<u8>()).add(size_of::<Footer>()).sub(size as usize)
}

/// Returns the user-visible data pointer for an in-use chunk starting at `header`.
#[inline]
pub(crate) unsafe fn user_ptr_of(header: *mut u8) -> *mut u8 {
    header.add(size_of::<InuseHeader>())
}

/// Returns the chunk header corresponding to a user data pointer handed back to `free`/`realloc`.
#[inline]
pub(crate) unsafe fn header_of_user_ptr(ptr: *mut u8) -> *mut u8 {
    ptr.sub(size_of::<InuseHeader>())
}
