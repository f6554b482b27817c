//! In-region layout primitives.
//!
//! ```text
//! region:  [PoolHeader | pad | block | block | ... | unused tail]
//! block:   [owner: usize | size: isize | user bytes ........ | footer: usize]
//! ```
//!
//! Every structure is addressed by byte offset from the region base, so two
//! processes mapping the same bytes agree on all bookkeeping. A block's `size`
//! field holds its total byte count (header and footer included) and is
//! negated while the block is free. The footer repeats the total so the
//! previous contiguous block is reachable by address arithmetic alone. A free
//! block stores its free-list links (next and prev, as header offsets) in the
//! first two words of its user area, which is why no allocation may be
//! smaller than two words.

use std::mem;
use std::ptr::{addr_of, addr_of_mut};
use std::sync::atomic::AtomicU32;

pub(crate) const WORD: usize = mem::size_of::<usize>();
pub(crate) const BLOCK_HDR: usize = 2 * WORD;
pub(crate) const FOOTER: usize = WORD;
pub(crate) const LINKS: usize = 2 * WORD;

/// Free-list link value designating the in-header sentinel node.
/// Offset 0 is the pool header itself, which is never a block.
pub(crate) const SENTINEL: usize = 0;

#[repr(C)]
pub(crate) struct PoolHeader {
    pool_id: usize,
    lock_word: AtomicU32,
    scheduled: AtomicU32,
    alignment: usize,
    region_bytes: usize,
    blocks_start: usize,
    blocks_end: usize,
    free_next: usize,
    free_prev: usize,
}

pub(crate) const POOL_HDR: usize = mem::size_of::<PoolHeader>();

/// The smallest block worth keeping after a split.
pub(crate) fn min_block_total(stride: usize) -> usize {
    round_up(BLOCK_HDR + LINKS + FOOTER, stride)
}

/// Internal rounding unit: the alignment, widened so block headers stay
/// word-aligned no matter how many blocks precede them.
pub(crate) fn stride_of(alignment: usize) -> usize {
    alignment.max(WORD)
}

pub(crate) fn round_up(n: usize, unit: usize) -> usize {
    n.div_ceil(unit) * unit
}

/// Raw accessor over a pool region. Copyable; carries no ownership.
///
/// All methods are `unsafe`: the caller must guarantee the base points at a
/// live pool region, and that any free-list read or mutation happens under
/// the pool lock. Header fields are read and written through raw pointers
/// only; no `&PoolHeader` is ever formed, so concurrent mappings never
/// alias a Rust reference with in-region writes.
#[derive(Clone, Copy)]
pub(crate) struct RawRegion {
    base: *mut u8,
}

unsafe impl Send for RawRegion {}
unsafe impl Sync for RawRegion {}

impl RawRegion {
    pub(crate) fn new(base: *mut u8) -> Self {
        Self { base }
    }

    pub(crate) fn base_addr(&self) -> usize {
        self.base as usize
    }

    fn hdr(&self) -> *mut PoolHeader {
        self.base.cast::<PoolHeader>()
    }

    /* Pool header fields. */

    pub(crate) unsafe fn pool_id(&self) -> usize {
        addr_of!((*self.hdr()).pool_id).read()
    }

    pub(crate) unsafe fn alignment(&self) -> usize {
        addr_of!((*self.hdr()).alignment).read()
    }

    pub(crate) unsafe fn blocks_start(&self) -> usize {
        addr_of!((*self.hdr()).blocks_start).read()
    }

    pub(crate) unsafe fn blocks_end(&self) -> usize {
        addr_of!((*self.hdr()).blocks_end).read()
    }

    /// Atomics may be shared by reference; the 'static-like lifetime is
    /// bounded in practice by the region's mapping.
    pub(crate) unsafe fn lock_word<'a>(&self) -> &'a AtomicU32 {
        &*addr_of!((*self.hdr()).lock_word)
    }

    pub(crate) unsafe fn scheduled<'a>(&self) -> &'a AtomicU32 {
        &*addr_of!((*self.hdr()).scheduled)
    }

    pub(crate) unsafe fn init_header(
        &self,
        pool_id: usize,
        alignment: usize,
        region_bytes: usize,
        blocks_start: usize,
        blocks_end: usize,
    ) {
        let hdr = self.hdr();
        addr_of_mut!((*hdr).pool_id).write(pool_id);
        addr_of_mut!((*hdr).lock_word).write(AtomicU32::new(0));
        addr_of_mut!((*hdr).scheduled).write(AtomicU32::new(0));
        addr_of_mut!((*hdr).alignment).write(alignment);
        addr_of_mut!((*hdr).region_bytes).write(region_bytes);
        addr_of_mut!((*hdr).blocks_start).write(blocks_start);
        addr_of_mut!((*hdr).blocks_end).write(blocks_end);
        addr_of_mut!((*hdr).free_next).write(blocks_start);
        addr_of_mut!((*hdr).free_prev).write(blocks_start);
    }

    /* Raw words at offsets. */

    unsafe fn word_at(&self, off: usize) -> usize {
        *self.base.add(off).cast::<usize>()
    }

    unsafe fn set_word_at(&self, off: usize, v: usize) {
        *self.base.add(off).cast::<usize>() = v;
    }

    /* Block header fields. `off` is always a block-header offset. */

    pub(crate) unsafe fn block_owner(&self, off: usize) -> usize {
        self.word_at(off)
    }

    pub(crate) unsafe fn set_block_owner(&self, off: usize, owner: usize) {
        self.set_word_at(off, owner);
    }

    pub(crate) unsafe fn block_is_free(&self, off: usize) -> bool {
        (self.word_at(off + WORD) as isize) < 0
    }

    pub(crate) unsafe fn block_total(&self, off: usize) -> usize {
        (self.word_at(off + WORD) as isize).unsigned_abs()
    }

    pub(crate) unsafe fn mark_free(&self, off: usize, total: usize) {
        self.set_word_at(off + WORD, (total as isize).wrapping_neg() as usize);
    }

    pub(crate) unsafe fn mark_in_use(&self, off: usize, total: usize) {
        self.set_word_at(off + WORD, total);
    }

    /// Writes the size footer in the block's last word.
    pub(crate) unsafe fn set_footer(&self, off: usize, total: usize) {
        self.set_word_at(off + total - FOOTER, total);
    }

    /// Total size of the block ending immediately before `off`.
    pub(crate) unsafe fn footer_before(&self, off: usize) -> usize {
        self.word_at(off - FOOTER)
    }

    /* Free-list links, stored in a free block's first user words. */

    pub(crate) unsafe fn free_next_of(&self, off: usize) -> usize {
        self.word_at(off + BLOCK_HDR)
    }

    pub(crate) unsafe fn free_prev_of(&self, off: usize) -> usize {
        self.word_at(off + BLOCK_HDR + WORD)
    }

    pub(crate) unsafe fn set_free_next_of(&self, off: usize, v: usize) {
        self.set_word_at(off + BLOCK_HDR, v);
    }

    pub(crate) unsafe fn set_free_prev_of(&self, off: usize, v: usize) {
        self.set_word_at(off + BLOCK_HDR + WORD, v);
    }

    /* Sentinel links, stored in the pool header. */

    pub(crate) unsafe fn sentinel_next(&self) -> usize {
        addr_of!((*self.hdr()).free_next).read()
    }

    pub(crate) unsafe fn sentinel_prev(&self) -> usize {
        addr_of!((*self.hdr()).free_prev).read()
    }

    pub(crate) unsafe fn set_sentinel_next(&self, v: usize) {
        addr_of_mut!((*self.hdr()).free_next).write(v);
    }

    pub(crate) unsafe fn set_sentinel_prev(&self, v: usize) {
        addr_of_mut!((*self.hdr()).free_prev).write(v);
    }

    /// Uniform link setters: `SENTINEL` designates the in-header node.
    pub(crate) unsafe fn set_next_link(&self, off: usize, v: usize) {
        if off == SENTINEL {
            self.set_sentinel_next(v);
        } else {
            self.set_free_next_of(off, v);
        }
    }

    pub(crate) unsafe fn set_prev_link(&self, off: usize, v: usize) {
        if off == SENTINEL {
            self.set_sentinel_prev(v);
        } else {
            self.set_free_prev_of(off, v);
        }
    }

    pub(crate) unsafe fn user_ptr(&self, off: usize) -> *mut u8 {
        self.base.add(off + BLOCK_HDR)
    }
}
