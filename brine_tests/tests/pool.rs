use anyhow::Result;
use brine_pool::{PoolError, StreamingPool};
use brine_types::types::{PodArr, Proxy, ProxyBody};
use rand::prelude::*;

/// For any sequence of allocations that fits, freeing all of them in any
/// order leaves one free block spanning the whole usable region.
pub fn test_pristine_under_any_free_order() -> Result<()> {
    let mut rng = rand::thread_rng();
    for round in 0..30 {
        let pool = StreamingPool::with_capacity(8 * 1024, 8)?;
        let mut ptrs = vec![];
        for _ in 0..(round % 7) + 2 {
            match pool.allocate(rng.gen_range(1..500)) {
                Ok(ptr) => ptrs.push(ptr),
                Err(PoolError::OutOfMemory(_)) => break,
                Err(other) => return Err(other.into()),
            }
        }
        ptrs.shuffle(&mut rng);
        for ptr in ptrs {
            unsafe { pool.deallocate(ptr)? };
        }
        assert!(pool.is_pristine());
        assert_eq!(pool.usable_capacity(), pool.biggest_free_block());
    }
    Ok(())
}

pub fn test_alignment_sweep() -> Result<()> {
    for alignment in [4, 8, 16, 32] {
        let pool = StreamingPool::with_capacity(8 * 1024, alignment)?;
        assert_eq!(alignment, pool.alignment());
        let mut ptrs = vec![];
        for size in [1, 2, 9, 33, 130] {
            let ptr = pool.allocate(size)?;
            assert_eq!(0, ptr.as_ptr() as usize % alignment);
            ptrs.push(ptr);
        }
        for ptr in ptrs {
            unsafe { pool.deallocate(ptr)? };
        }
        assert!(pool.is_pristine());
    }
    Ok(())
}

/// Three equal blocks freed in the order B, A, C coalesce back into a
/// single free block of the full usable capacity.
pub fn test_equal_blocks_freed_b_a_c() -> Result<()> {
    let pool = StreamingPool::with_capacity(4 * 1024, 8)?;
    let a = pool.allocate(256)?;
    let b = pool.allocate(256)?;
    let c = pool.allocate(256)?;
    unsafe {
        pool.deallocate(b)?;
        pool.deallocate(a)?;
        pool.deallocate(c)?;
    }
    assert!(pool.is_pristine());
    assert_eq!(pool.usable_capacity(), pool.biggest_free_block());
    Ok(())
}

pub fn test_double_free_is_an_error() -> Result<()> {
    let pool = StreamingPool::with_capacity(4 * 1024, 8)?;
    let a = pool.allocate(100)?;
    let b = pool.allocate(100)?;
    unsafe {
        pool.deallocate(a)?;
        assert!(matches!(
            pool.deallocate(a),
            Err(PoolError::DoubleFree(_))
        ));
        // The rejected call must not have corrupted the free list.
        pool.deallocate(b)?;
    }
    assert!(pool.is_pristine());
    Ok(())
}

/// Whole-pool teardown is gated on pristineness, independently of any one
/// proxy's reference count.
pub fn test_deferred_teardown_with_proxies() -> Result<()> {
    let pool = StreamingPool::with_capacity(16 * 1024, 8)?;
    let a = Proxy::new_shared(ProxyBody::Pod(PodArr::U8(vec![1; 100])), &pool)?;
    let b = Proxy::new_shared(ProxyBody::Pod(PodArr::U8(vec![2; 100])), &pool)?;

    pool.schedule_for_deletion();
    assert!(!pool.is_pristine());

    drop(a);
    assert!(!pool.is_pristine());
    drop(b);
    // The deallocation that emptied the pool ran the deferred teardown.
    assert!(pool.is_pristine());
    Ok(())
}
