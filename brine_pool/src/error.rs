use derive_more::Display;
use std::error::Error;

/// Failure modes of [`StreamingPool`](crate::StreamingPool) operations.
///
/// None of these are retried internally; each one is fatal to the operation
/// that raised it.
#[derive(Display, PartialEq, Eq, Clone, Copy, Debug)]
pub enum PoolError {
    /// Alignment is not a power of two, or is outside `[ALIGN_MIN, ALIGN_MAX]`.
    #[display(fmt = "alignment {} is not a supported power of two", _0)]
    BadAlignment(usize),

    /// The region cannot hold the pool header plus one minimum-size block.
    #[display(fmt = "region of {} bytes is too small to host a pool", _0)]
    RegionTooSmall(usize),

    /// The region base address does not satisfy the pool's own header alignment.
    #[display(fmt = "region base {:#x} is not word-aligned", _0)]
    UnalignedRegion(usize),

    /// No free block can satisfy the requested size.
    #[display(fmt = "no free block can satisfy a request of {} bytes", _0)]
    OutOfMemory(usize),

    /// The block addressed by a `deallocate` call is already free.
    #[display(fmt = "block at offset {} is already free", _0)]
    DoubleFree(usize),

    /// The pointer does not address a block owned by this pool.
    #[display(fmt = "pointer {:#x} was not allocated by this pool", _0)]
    ForeignPointer(usize),

    /// A pointer about to be returned violates the alignment contract.
    /// Indicates an allocator bug, not a caller error.
    #[display(fmt = "allocated pointer {:#x} is not a multiple of {}", _0, _1)]
    Misaligned(usize, usize),
}

impl Error for PoolError {}
