//! Session identifier type

use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Identifier of one open session on a device
///
/// Ids are handed out per device by a [`SessionIds`] counter and are only
/// meaningful for logging and diagnostics.
/// The maximum value (u32::MAX) is reserved as a sentinel for "no session".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SessionId(u32);

impl SessionId {
    /// Sentinel value indicating no session
    pub const NONE: SessionId = SessionId(u32::MAX);

    #[inline]
    pub const fn new(id: u32) -> Self {
        SessionId(id)
    }

    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "SessionId(NONE)")
        } else {
            write!(f, "SessionId({})", self.0)
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for SessionId {
    fn default() -> Self {
        SessionId::NONE
    }
}

/// Monotonic session id source, one per device
///
/// Also counts the sessions currently open against it. A session keeps a
/// reference to the `SessionIds` it came from, which is how a device
/// recognizes its own sessions.
#[derive(Debug, Default)]
pub struct SessionIds {
    next: AtomicU32,
    live: AtomicUsize,
}

impl SessionIds {
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
            live: AtomicUsize::new(0),
        }
    }

    /// Sessions opened and not yet closed or dropped
    #[inline]
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn enter(&self) {
        self.live.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn leave(&self) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }

    /// Hand out the next id, skipping the NONE sentinel on wrap
    pub fn next(&self) -> SessionId {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != u32::MAX {
                return SessionId::new(id);
            }
        }
    }
}
