//! Spin locks guarding register data
//!
//! Critical sections here are O(capacity) byte copies, so waiters spin
//! instead of parking. `SpinLock` serializes every access; `RwSpinLock`
//! lets readers overlap each other but never a writer.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[inline]
fn backoff(spins: &mut u32) {
    *spins = spins.wrapping_add(1);
    for _ in 0..(*spins).min(64) {
        core::hint::spin_loop();
    }
}

/// Mutual-exclusion spin lock
pub struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// Safety: SpinLock hands out access to T to one holder at a time
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        SpinLock {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, spinning while it is held
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let mut spins = 0u32;
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return SpinLockGuard { lock: self };
            }
            while self.locked.load(Ordering::Relaxed) {
                backoff(&mut spins);
            }
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        SpinLock::new(T::default())
    }
}

impl<T> core::fmt::Debug for SpinLock<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// Releases the [`SpinLock`] when dropped
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<'a, T> Deref for SpinLockGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: we hold the lock
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> DerefMut for SpinLockGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: we hold the lock
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T> Drop for SpinLockGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

const WRITER: usize = 1 << (usize::BITS - 1);

/// Reader/writer spin lock
///
/// The high bit of `state` marks a writer; the remaining bits count
/// readers. A writer only gets in when the count is zero.
pub struct RwSpinLock<T> {
    state: AtomicUsize,
    data: UnsafeCell<T>,
}

// Safety: readers get &T (needs Sync), the single writer gets &mut T
unsafe impl<T: Send> Send for RwSpinLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwSpinLock<T> {}

impl<T> RwSpinLock<T> {
    #[inline]
    pub const fn new(value: T) -> Self {
        RwSpinLock {
            state: AtomicUsize::new(0),
            data: UnsafeCell::new(value),
        }
    }

    /// Shared access; waits only while a writer holds the lock
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut spins = 0u32;
        loop {
            let s = self.state.load(Ordering::Relaxed);
            if s & WRITER == 0
                && self
                    .state
                    .compare_exchange_weak(s, s + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                return ReadGuard { lock: self };
            }
            backoff(&mut spins);
        }
    }

    /// Exclusive access; waits for readers and any writer to leave
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut spins = 0u32;
        loop {
            if self
                .state
                .compare_exchange_weak(0, WRITER, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return WriteGuard { lock: self };
            }
            backoff(&mut spins);
        }
    }

    /// Number of readers currently inside (racy, diagnostics only)
    pub fn readers(&self) -> usize {
        self.state.load(Ordering::Relaxed) & !WRITER
    }

    pub fn is_write_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & WRITER != 0
    }
}

impl<T: Default> Default for RwSpinLock<T> {
    fn default() -> Self {
        RwSpinLock::new(T::default())
    }
}

impl<T> core::fmt::Debug for RwSpinLock<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RwSpinLock")
            .field("readers", &self.readers())
            .field("write_locked", &self.is_write_locked())
            .finish_non_exhaustive()
    }
}

pub struct ReadGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<'a, T> Deref for ReadGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: no writer while any reader is counted
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> Drop for ReadGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.state.fetch_sub(1, Ordering::Release);
    }
}

pub struct WriteGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<'a, T> Deref for WriteGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // Safety: we are the only writer and no readers are counted
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T> DerefMut for WriteGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // Safety: as above
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T> Drop for WriteGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.lock.state.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_spinlock_guard_unlocks() {
        let lock = SpinLock::new(0u32);

        let mut guard = lock.lock();
        *guard += 1;
        assert!(lock.is_locked());

        drop(guard);
        assert!(!lock.is_locked());
        assert_eq!(*lock.lock(), 1);
    }

    #[test]
    fn test_spinlock_concurrent() {
        let lock = Arc::new(SpinLock::new(Vec::new()));
        let mut handles = vec![];

        for t in 0..4u8 {
            let lock = Arc::clone(&lock);
            handles.push(thread::spawn(move || {
                for _ in 0..500 {
                    lock.lock().push(t);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(lock.lock().len(), 2000);
    }

    #[test]
    fn test_rwlock_readers_overlap() {
        let lock = RwSpinLock::new(5u8);
        let r1 = lock.read();
        let r2 = lock.read();
        assert_eq!(lock.readers(), 2);
        assert_eq!(*r1 + *r2, 10);
        drop(r1);
        drop(r2);
        assert_eq!(lock.readers(), 0);

        *lock.write() = 9;
        assert!(!lock.is_write_locked());
        assert_eq!(*lock.read(), 9);
    }

    #[test]
    fn test_rwlock_writer_excludes_readers() {
        // Writers store a pair that must always be observed consistent
        let lock = Arc::new(RwSpinLock::new((0u64, 0u64)));
        let mut handles = vec![];

        for _ in 0..2 {
            let lock = Arc::clone(&lock);
            handles.push(thread::spawn(move || {
                for _ in 0..2000 {
                    let mut w = lock.write();
                    w.0 += 1;
                    w.1 += 1;
                }
            }));
        }
        for _ in 0..4 {
            let lock = Arc::clone(&lock);
            handles.push(thread::spawn(move || {
                for _ in 0..2000 {
                    let r = lock.read();
                    assert_eq!(r.0, r.1);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        let r = lock.read();
        assert_eq!(*r, (4000, 4000));
    }
}
