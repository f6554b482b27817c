use std::hint;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

/// A spin lock whose state word lives inside the managed region.
///
/// Because the word is part of the region bytes, every thread (and, for a
/// shared mapping, every process) that attaches to the region contends on
/// the same word. The lock tracks no owner and never poisons; acquisition
/// has no timeout parameter.
pub(crate) struct RegionLock<'a> {
    word: &'a AtomicU32,
}

impl<'a> RegionLock<'a> {
    /// The caller must hand in a reference to the lock word embedded in the
    /// pool header.
    pub(crate) fn new(word: &'a AtomicU32) -> Self {
        Self { word }
    }

    pub(crate) fn acquire(&self) -> RegionGuard<'a> {
        let mut spins = 0u32;
        loop {
            match self
                .word
                .compare_exchange_weak(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return RegionGuard { word: self.word },
                Err(_) => {
                    spins += 1;
                    if spins % 64 == 0 {
                        thread::yield_now();
                    } else {
                        hint::spin_loop();
                    }
                }
            }
        }
    }
}

pub(crate) struct RegionGuard<'a> {
    word: &'a AtomicU32,
}

impl Drop for RegionGuard<'_> {
    fn drop(&mut self) {
        self.word.store(UNLOCKED, Ordering::Release);
    }
}
