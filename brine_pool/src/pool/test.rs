#[cfg(test)]
mod test {
    use super::super::*;
    use itertools::Itertools;
    use rand::seq::SliceRandom;
    use rand::Rng;
    use std::thread;

    const CAPACITY: usize = 4096;

    fn fresh_pool(alignment: usize) -> StreamingPool {
        StreamingPool::with_capacity(CAPACITY, alignment).unwrap()
    }

    #[test]
    fn rejects_bad_alignment() {
        for bad in [0, 2, 3, 6, 24, ALIGN_MAX * 2] {
            let res = StreamingPool::with_capacity(CAPACITY, bad);
            assert_eq!(Err(PoolError::BadAlignment(bad)), res.map(|_| ()));
        }
    }

    #[test]
    fn rejects_tiny_region() {
        let res = StreamingPool::with_capacity(16, 8);
        assert!(matches!(res, Err(PoolError::RegionTooSmall(16))));
    }

    #[test]
    fn fresh_pool_is_pristine() {
        let pool = fresh_pool(8);
        assert!(pool.is_pristine());
        assert!(!pool.is_full());
        assert_eq!(pool.usable_capacity(), pool.biggest_free_block());
    }

    #[test]
    fn allocate_respects_alignment() {
        for alignment in [4, 8, 16, 32] {
            let pool = fresh_pool(alignment);
            let mut ptrs = vec![];
            for size in [1, 3, 7, 20, 63, 129] {
                let ptr = pool.allocate(size).unwrap();
                assert_eq!(
                    0,
                    ptr.as_ptr() as usize % alignment,
                    "alignment {alignment} size {size}"
                );
                ptrs.push(ptr);
            }
            for ptr in ptrs {
                unsafe { pool.deallocate(ptr).unwrap() };
            }
            assert!(pool.is_pristine());
        }
    }

    #[test]
    fn allocated_bytes_are_usable() {
        let pool = fresh_pool(8);
        let ptr = pool.allocate(100).unwrap();
        unsafe {
            for i in 0..100 {
                *ptr.as_ptr().add(i) = i as u8;
            }
            for i in 0..100 {
                assert_eq!(i as u8, *ptr.as_ptr().add(i));
            }
            pool.deallocate(ptr).unwrap();
        }
        assert!(pool.is_pristine());
    }

    #[test]
    fn free_order_b_a_c_coalesces_fully() {
        let pool = fresh_pool(8);
        let a = pool.allocate(512).unwrap();
        let b = pool.allocate(512).unwrap();
        let c = pool.allocate(512).unwrap();
        unsafe {
            pool.deallocate(b).unwrap();
            pool.deallocate(a).unwrap();
            pool.deallocate(c).unwrap();
        }
        assert!(pool.is_pristine());
        assert_eq!(pool.usable_capacity(), pool.biggest_free_block());
    }

    #[test]
    fn every_free_order_leaves_pristine() {
        let sizes = [40, 100, 8, 256, 24];
        for order in (0..sizes.len()).permutations(sizes.len()) {
            let pool = fresh_pool(8);
            let ptrs = sizes
                .iter()
                .map(|&size| pool.allocate(size).unwrap())
                .collect::<Vec<_>>();
            for i in order {
                unsafe { pool.deallocate(ptrs[i]).unwrap() };
            }
            assert!(pool.is_pristine());
            assert_eq!(pool.usable_capacity(), pool.biggest_free_block());
        }
    }

    #[test]
    fn shuffled_random_sizes_leave_pristine() {
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            let pool = fresh_pool(16);
            let mut ptrs = vec![];
            loop {
                let size = rng.gen_range(1..200);
                match pool.allocate(size) {
                    Ok(ptr) => ptrs.push(ptr),
                    Err(PoolError::OutOfMemory(_)) => break,
                    Err(other) => panic!("{other}"),
                }
            }
            ptrs.shuffle(&mut rng);
            for ptr in ptrs {
                unsafe { pool.deallocate(ptr).unwrap() };
            }
            assert!(pool.is_pristine());
        }
    }

    #[test]
    fn double_free_is_detected() {
        let pool = fresh_pool(8);
        let a = pool.allocate(64).unwrap();
        let _b = pool.allocate(64).unwrap();
        unsafe {
            pool.deallocate(a).unwrap();
            let res = pool.deallocate(a);
            assert!(matches!(res, Err(PoolError::DoubleFree(_))), "{res:?}");
        }
        // The free list must still be sound after the rejected call.
        let again = pool.allocate(64).unwrap();
        assert_eq!(a, again);
    }

    #[test]
    fn exhaustion_reports_out_of_memory() {
        let pool = fresh_pool(8);
        let res = pool.allocate(pool.usable_capacity() + 1);
        assert!(matches!(res, Err(PoolError::OutOfMemory(_))));

        let whole = pool.allocate(pool.usable_capacity()).unwrap();
        assert!(pool.is_full());
        assert_eq!(0, pool.biggest_free_block());
        assert!(matches!(pool.allocate(1), Err(PoolError::OutOfMemory(1))));
        unsafe { pool.deallocate(whole).unwrap() };
        assert!(pool.is_pristine());
    }

    #[test]
    fn first_fit_reuses_leftmost_hole() {
        let pool = fresh_pool(8);
        let a = pool.allocate(128).unwrap();
        let _b = pool.allocate(128).unwrap();
        unsafe { pool.deallocate(a).unwrap() };
        let again = pool.allocate(128).unwrap();
        assert_eq!(a, again);
    }

    #[test]
    fn foreign_pointer_is_rejected() {
        let pool = fresh_pool(8);
        let other = fresh_pool(8);
        let theirs = other.allocate(64).unwrap();
        let res = unsafe { pool.deallocate(theirs) };
        assert!(matches!(res, Err(PoolError::ForeignPointer(_))));
    }

    #[test]
    fn cookie_roundtrip() {
        let pool = fresh_pool(8);
        let ptr = pool.allocate(64).unwrap();
        unsafe {
            pool.stamp_cookie(ptr);
            assert!(pool.check_cookie(ptr));
            pool.clean_cookie(ptr);
            assert!(!pool.check_cookie(ptr));
        }

        let other = fresh_pool(8);
        let theirs = other.allocate(64).unwrap();
        unsafe { other.stamp_cookie(theirs) };
        assert!(other.check_cookie(theirs));
        assert!(!pool.check_cookie(theirs));
    }

    #[test]
    fn scheduled_deletion_on_pristine_pool_is_immediate() {
        let pool = fresh_pool(8);
        pool.schedule_for_deletion();
        assert!(pool.torn_down());
    }

    #[test]
    fn scheduled_deletion_defers_until_pristine() {
        let pool = fresh_pool(8);
        let a = pool.allocate(64).unwrap();
        let b = pool.allocate(64).unwrap();
        pool.schedule_for_deletion();
        assert!(!pool.torn_down());
        unsafe {
            pool.deallocate(a).unwrap();
            assert!(!pool.torn_down());
            pool.deallocate(b).unwrap();
        }
        assert!(pool.torn_down());
    }

    #[test]
    fn concurrent_callers_serialize_on_the_pool_lock() {
        let pool = StreamingPool::with_capacity(64 * 1024, 8).unwrap();
        thread::scope(|scope| {
            for t in 0..4 {
                let pool = pool.clone();
                scope.spawn(move || {
                    for i in 0..200 {
                        let size = 16 + (t * 40 + i) % 100;
                        let ptr = pool.allocate(size).unwrap();
                        unsafe {
                            *ptr.as_ptr() = t as u8;
                            pool.deallocate(ptr).unwrap();
                        }
                    }
                });
            }
        });
        assert!(pool.is_pristine());
    }
}
