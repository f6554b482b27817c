use crate::error::PoolError;
use crate::layout::{
    min_block_total, round_up, stride_of, RawRegion, BLOCK_HDR, FOOTER, LINKS, POOL_HDR, SENTINEL,
    WORD,
};
use crate::region_lock::{RegionGuard, RegionLock};
use log::debug;
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::Ordering;
use std::sync::Arc;

mod test;

pub const ALIGN_MIN: usize = 4;
pub const ALIGN_MAX: usize = 8192;

/// Heap-backed regions are handed out at this alignment, which satisfies the
/// pool-header word alignment for every permitted block alignment.
const REGION_ALIGN: usize = 64;

const LIVE: u32 = 0;
const SCHEDULED: u32 = 1;
const TORN_DOWN: u32 = 2;

const MAGIC_COOKIE: usize = 0xFADE;

/// A first-fit, coalescing allocator over one contiguous byte region.
///
/// The pool never calls into the OS allocator for its bookkeeping: block
/// headers, free-list links, and the lock word are all embedded in the
/// region, addressed by offset. A region may be private heap memory
/// ([`StreamingPool::with_capacity`]) or any caller-supplied mapping,
/// including shared memory visible to several processes
/// ([`StreamingPool::create_in`] in one process, [`StreamingPool::attach`]
/// in the others).
///
/// Handles are cheap to clone and may be used from multiple threads; every
/// free-list operation serializes on the in-region lock.
#[derive(Clone)]
pub struct StreamingPool {
    region: RawRegion,
    _owned: Option<Arc<OwnedRegion>>,
}

struct OwnedRegion {
    ptr: NonNull<u8>,
    layout: Layout,
}

unsafe impl Send for OwnedRegion {}
unsafe impl Sync for OwnedRegion {}

impl Drop for OwnedRegion {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

fn validate_alignment(alignment: usize) -> Result<(), PoolError> {
    if !alignment.is_power_of_two() || alignment < ALIGN_MIN || alignment > ALIGN_MAX {
        return Err(PoolError::BadAlignment(alignment));
    }
    Ok(())
}

impl StreamingPool {
    /// Creates a pool over a freshly heap-allocated region of `bytes` bytes.
    /// The region is released when the last handle drops.
    pub fn with_capacity(bytes: usize, alignment: usize) -> Result<Self, PoolError> {
        validate_alignment(alignment)?;
        let layout = Layout::from_size_align(bytes.max(1), REGION_ALIGN)
            .map_err(|_| PoolError::RegionTooSmall(bytes))?;
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let Some(base) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(layout);
        };
        let owned = Arc::new(OwnedRegion { ptr: base, layout });
        let mut pool = unsafe { Self::create_in(base, bytes, alignment)? };
        pool._owned = Some(owned);
        Ok(pool)
    }

    /// Initializes a fresh pool over a caller-supplied region.
    ///
    /// # Safety
    /// `base` must point to `bytes` writable bytes that outlive every handle
    /// to this pool and are not used for anything else while the pool lives.
    pub unsafe fn create_in(
        base: NonNull<u8>,
        bytes: usize,
        alignment: usize,
    ) -> Result<Self, PoolError> {
        validate_alignment(alignment)?;
        let base_addr = base.as_ptr() as usize;
        if base_addr % WORD != 0 {
            return Err(PoolError::UnalignedRegion(base_addr));
        }

        let region = RawRegion::new(base.as_ptr());
        let stride = stride_of(alignment);

        // Place the first block header on a word boundary such that its user
        // bytes land on the requested alignment. Block totals are multiples
        // of `stride`, so every later block inherits both properties.
        let mut blocks_start = round_up(POOL_HDR, WORD);
        while (base_addr + blocks_start + BLOCK_HDR) % alignment != 0 {
            blocks_start += WORD;
        }
        if blocks_start >= bytes {
            return Err(PoolError::RegionTooSmall(bytes));
        }
        let usable = (bytes - blocks_start) / stride * stride;
        if usable < min_block_total(stride) {
            return Err(PoolError::RegionTooSmall(bytes));
        }
        let blocks_end = blocks_start + usable;

        region.init_header(base_addr, alignment, bytes, blocks_start, blocks_end);

        // The whole usable span starts as one free block, the sole member of
        // the circular free list anchored at the in-header sentinel.
        region.set_block_owner(blocks_start, base_addr);
        region.mark_free(blocks_start, usable);
        region.set_footer(blocks_start, usable);
        region.set_free_next_of(blocks_start, SENTINEL);
        region.set_free_prev_of(blocks_start, SENTINEL);

        debug!(
            "pool {base_addr:#x}: {usable} usable bytes at alignment {alignment} (of {bytes} region bytes)",
        );

        Ok(Self {
            region,
            _owned: None,
        })
    }

    /// Wraps an already-initialized pool region, e.g. the same shared mapping
    /// attached from another process.
    ///
    /// # Safety
    /// `base` must point at a region previously initialized by
    /// [`StreamingPool::create_in`] and still live.
    pub unsafe fn attach(base: NonNull<u8>) -> Self {
        Self {
            region: RawRegion::new(base.as_ptr()),
            _owned: None,
        }
    }

    fn lock(&self) -> RegionGuard<'_> {
        RegionLock::new(unsafe { self.region.lock_word() }).acquire()
    }

    pub fn alignment(&self) -> usize {
        unsafe { self.region.alignment() }
    }

    /// User bytes available when the pool is pristine.
    pub fn usable_capacity(&self) -> usize {
        let r = &self.region;
        unsafe { r.blocks_end() - r.blocks_start() - BLOCK_HDR - FOOTER }
    }

    /// Serves `bytes_requested` user bytes from the first free block that
    /// fits, splitting off the remainder when it is still a viable block.
    pub fn allocate(&self, bytes_requested: usize) -> Result<NonNull<u8>, PoolError> {
        let r = self.region;
        let alignment = unsafe { r.alignment() };
        let stride = stride_of(alignment);
        // Every block must be able to hold free-list links once deallocated.
        let user_min = bytes_requested.max(LINKS);
        let total_needed = round_up(BLOCK_HDR + user_min + FOOTER, stride);

        let ptr = {
            let _guard = self.lock();
            unsafe {
                let mut off = r.sentinel_next();
                while off != SENTINEL && r.block_total(off) < total_needed {
                    off = r.free_next_of(off);
                }
                if off == SENTINEL {
                    debug!(
                        "pool {:#x}: no free block satisfies {bytes_requested} bytes",
                        r.pool_id()
                    );
                    return Err(PoolError::OutOfMemory(bytes_requested));
                }

                let have = r.block_total(off);
                let remainder = have - total_needed;
                if remainder >= min_block_total(stride) {
                    // The tail becomes a free block occupying the found
                    // block's position in the free list.
                    let tail = off + total_needed;
                    r.set_block_owner(tail, r.pool_id());
                    r.mark_free(tail, remainder);
                    r.set_footer(tail, remainder);
                    let prev = r.free_prev_of(off);
                    let next = r.free_next_of(off);
                    r.set_free_next_of(tail, next);
                    r.set_free_prev_of(tail, prev);
                    r.set_next_link(prev, tail);
                    r.set_prev_link(next, tail);
                    r.mark_in_use(off, total_needed);
                    r.set_footer(off, total_needed);
                } else {
                    self.unlink(off);
                    r.mark_in_use(off, have);
                }
                r.user_ptr(off)
            }
        };

        let addr = ptr as usize;
        if addr % alignment != 0 {
            return Err(PoolError::Misaligned(addr, alignment));
        }
        Ok(unsafe { NonNull::new_unchecked(ptr) })
    }

    /// Returns a block to the pool, merging it with whichever contiguous
    /// neighbors are free. Freeing adjacent blocks in any order leaves one
    /// fully merged free block.
    ///
    /// # Safety
    /// `ptr` must have been returned by [`StreamingPool::allocate`] on this
    /// pool and not deallocated through a different handle since. (Passing
    /// the same pointer twice through this handle is detected and reported
    /// as [`PoolError::DoubleFree`].)
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) -> Result<(), PoolError> {
        let r = self.region;
        let addr = ptr.as_ptr() as usize;
        let base = r.base_addr();
        let (blocks_start, blocks_end) = (r.blocks_start(), r.blocks_end());
        if addr < base + blocks_start + BLOCK_HDR || addr >= base + blocks_end {
            return Err(PoolError::ForeignPointer(addr));
        }
        let off = addr - base - BLOCK_HDR;
        if r.block_owner(off) != r.pool_id() {
            return Err(PoolError::ForeignPointer(addr));
        }
        if r.block_is_free(off) {
            return Err(PoolError::DoubleFree(off));
        }

        let ready_to_teardown;
        {
            let _guard = self.lock();

            let mut cur = off;
            let mut total = r.block_total(cur);

            // Merge with the following contiguous block, then the preceding
            // one, both by address arithmetic rather than via the free list.
            let next = cur + total;
            if next < blocks_end && r.block_is_free(next) {
                self.unlink(next);
                total += r.block_total(next);
            }
            if cur > blocks_start {
                let prev_total = r.footer_before(cur);
                let prev = cur - prev_total;
                if r.block_is_free(prev) {
                    self.unlink(prev);
                    total += prev_total;
                    cur = prev;
                }
            }

            r.mark_free(cur, total);
            r.set_footer(cur, total);
            self.link_front(cur);

            ready_to_teardown = r.scheduled().load(Ordering::Relaxed) == SCHEDULED
                && self.is_pristine_locked();
        }

        // Teardown runs outside the lock: a pristine, scheduled pool has no
        // other live users by definition.
        if ready_to_teardown {
            self.teardown();
        }
        Ok(())
    }

    /// Marks the pool for teardown. Runs teardown immediately when the pool
    /// is already pristine, otherwise defers it to the deallocation that
    /// makes the pool pristine.
    pub fn schedule_for_deletion(&self) {
        let ready = {
            let _guard = self.lock();
            unsafe {
                self.region.scheduled().store(SCHEDULED, Ordering::Relaxed);
                self.is_pristine_locked()
            }
        };
        if ready {
            self.teardown();
        }
    }

    /// Whether the entire usable span is one free block.
    pub fn is_pristine(&self) -> bool {
        let _guard = self.lock();
        unsafe { self.is_pristine_locked() }
    }

    /// Whether no free block remains.
    pub fn is_full(&self) -> bool {
        let _guard = self.lock();
        unsafe { self.region.sentinel_next() == SENTINEL }
    }

    /// User bytes of the largest free block, or 0 when full.
    pub fn biggest_free_block(&self) -> usize {
        let r = self.region;
        let _guard = self.lock();
        let mut biggest = 0;
        unsafe {
            let mut off = r.sentinel_next();
            while off != SENTINEL {
                let user = r.block_total(off) - BLOCK_HDR - FOOTER;
                biggest = biggest.max(user);
                off = r.free_next_of(off);
            }
        }
        biggest
    }

    /* Magic-cookie provenance tagging (best effort). */

    /// Stamps the block's first two words with an obfuscated
    /// (pool identity, self address) pair.
    ///
    /// # Safety
    /// `ptr` must be a live allocation from this pool.
    pub unsafe fn stamp_cookie(&self, ptr: NonNull<u8>) {
        let words = ptr.as_ptr().cast::<usize>();
        *words = MAGIC_COOKIE ^ self.region.pool_id();
        *words.add(1) = MAGIC_COOKIE ^ (ptr.as_ptr() as usize);
    }

    /// Whether `ptr` carries this pool's cookie. Reverses the XOR and
    /// cross-checks both the recovered self-address and the block header's
    /// recorded owner: a forged word fails one of the two checks, so a
    /// positive answer is never wrong. An adversary copying a whole stamped
    /// block could still fool it.
    pub fn check_cookie(&self, ptr: NonNull<u8>) -> bool {
        let r = self.region;
        let addr = ptr.as_ptr() as usize;
        let base = r.base_addr();
        unsafe {
            if addr < base + r.blocks_start() + BLOCK_HDR || addr >= base + r.blocks_end() {
                return false;
            }
            let words = ptr.as_ptr().cast::<usize>();
            if *words.add(1) ^ MAGIC_COOKIE != addr {
                return false;
            }
            let claimed_pool = *words ^ MAGIC_COOKIE;
            let off = addr - base - BLOCK_HDR;
            claimed_pool == r.pool_id() && r.block_owner(off) == claimed_pool
        }
    }

    /// # Safety
    /// `ptr` must be a live allocation from this pool.
    pub unsafe fn clean_cookie(&self, ptr: NonNull<u8>) {
        let words = ptr.as_ptr().cast::<usize>();
        *words = 0;
        *words.add(1) = 0;
    }

    /* Internals. Lock must be held. */

    unsafe fn is_pristine_locked(&self) -> bool {
        let r = self.region;
        let blocks_start = r.blocks_start();
        r.sentinel_next() == blocks_start
            && r.sentinel_prev() == blocks_start
            && r.block_is_free(blocks_start)
            && r.block_total(blocks_start) == r.blocks_end() - blocks_start
    }

    unsafe fn unlink(&self, off: usize) {
        let r = self.region;
        let next = r.free_next_of(off);
        let prev = r.free_prev_of(off);
        r.set_next_link(prev, next);
        r.set_prev_link(next, prev);
    }

    unsafe fn link_front(&self, off: usize) {
        let r = self.region;
        let first = r.sentinel_next();
        r.set_free_next_of(off, first);
        r.set_free_prev_of(off, SENTINEL);
        r.set_prev_link(first, off);
        r.set_sentinel_next(off);
    }

    fn teardown(&self) {
        unsafe {
            self.region.scheduled().store(TORN_DOWN, Ordering::Relaxed);
        }
        debug!(
            "pool {:#x}: torn down (pristine with deletion scheduled)",
            unsafe { self.region.pool_id() }
        );
    }

    #[cfg(test)]
    pub(crate) fn torn_down(&self) -> bool {
        unsafe { self.region.scheduled().load(Ordering::Relaxed) == TORN_DOWN }
    }
}

impl std::fmt::Debug for StreamingPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingPool")
            .field("id", &format_args!("{:#x}", unsafe { self.region.pool_id() }))
            .field("alignment", &self.alignment())
            .finish()
    }
}

const _: () = assert!(LIVE == 0, "fresh header memory must read as LIVE");
