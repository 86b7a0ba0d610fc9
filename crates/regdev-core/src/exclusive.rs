//! Exclusive-access flag
//!
//! A single-owner binary semaphore built on one compare-and-swap. It never
//! queues waiters: a contended acquire fails immediately with
//! [`RegError::Busy`] and the caller decides whether to retry.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::error::{RegError, RegResult};
use crate::state::DeviceState;

/// Fail-fast exclusive flag
///
/// Holds the [`DeviceState`] of the owning device. Acquiring moves it
/// `Idle -> Open`; dropping the returned guard moves it back.
#[derive(Debug)]
pub struct ExclusiveFlag {
    state: AtomicU8,
}

impl ExclusiveFlag {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(DeviceState::Idle as u8),
        }
    }

    /// Try to take the flag without waiting
    #[inline]
    pub fn try_acquire(&self) -> RegResult<ExclusiveGuard<'_>> {
        self.state
            .compare_exchange(
                DeviceState::Idle as u8,
                DeviceState::Open as u8,
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .map(|_| ExclusiveGuard { flag: self })
            .map_err(|_| RegError::Busy)
    }

    /// Current state (racy, diagnostics only)
    #[inline]
    pub fn state(&self) -> DeviceState {
        DeviceState::from(self.state.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.state().is_open()
    }

    #[inline]
    fn release(&self) {
        self.state.store(DeviceState::Idle as u8, Ordering::Release);
    }
}

impl Default for ExclusiveFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of an [`ExclusiveFlag`]; releases it when dropped
#[derive(Debug)]
pub struct ExclusiveGuard<'a> {
    flag: &'a ExclusiveFlag,
}

impl<'a> Drop for ExclusiveGuard<'a> {
    #[inline]
    fn drop(&mut self) {
        self.flag.release();
    }
}
