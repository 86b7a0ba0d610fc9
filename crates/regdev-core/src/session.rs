//! Open sessions and their read cursors

use crate::error::{RegError, RegResult};
use crate::exclusive::ExclusiveGuard;
use crate::id::{SessionId, SessionIds};
use crate::register::Register;
use crate::state::SessionState;

/// Per-session read position into a register's message
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    offset: usize,
}

impl Cursor {
    #[inline]
    pub const fn new() -> Self {
        Self { offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.offset += n;
    }

    #[inline]
    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    /// Deliver the next chunk of `reg`'s message into `out`.
    ///
    /// At end of message this returns 0 and rewinds, so the following
    /// read starts again from offset 0.
    pub fn drain(&mut self, reg: &Register, out: &mut [u8]) -> usize {
        if self.offset >= reg.message().len() {
            self.rewind();
            return 0;
        }
        let n = reg.copy_message(self.offset, out);
        self.advance(n);
        n
    }
}

/// Handle returned by a successful open.
///
/// A session is bound to the [`SessionIds`] of the device that opened it
/// and counts as live there until [`close`](Session::close) or drop. On
/// exclusive devices it also owns the device's flag and gives it back at
/// the same point.
#[derive(Debug)]
pub struct Session<'a> {
    id: SessionId,
    owner: &'a SessionIds,
    state: SessionState,
    cursor: Cursor,
    exclusive: Option<ExclusiveGuard<'a>>,
}

impl<'a> Session<'a> {
    /// Session with no device-level ownership
    pub fn shared(owner: &'a SessionIds) -> Self {
        Self::start(owner, None)
    }

    /// Session that holds the device exclusively until closed
    pub fn exclusive(owner: &'a SessionIds, guard: ExclusiveGuard<'a>) -> Self {
        Self::start(owner, Some(guard))
    }

    fn start(owner: &'a SessionIds, exclusive: Option<ExclusiveGuard<'a>>) -> Self {
        let id = owner.next();
        owner.enter();
        Self {
            id,
            owner,
            state: SessionState::Open,
            cursor: Cursor::new(),
            exclusive,
        }
    }

    #[inline]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !self.state.is_closed()
    }

    #[inline]
    pub fn holds_exclusive(&self) -> bool {
        self.exclusive.is_some()
    }

    /// True if the session was opened through `ids`
    #[inline]
    pub fn belongs_to(&self, ids: &SessionIds) -> bool {
        core::ptr::eq(self.owner, ids)
    }

    #[inline]
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    #[inline]
    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    /// `Err(Closed)` once the session has been released
    #[inline]
    pub fn ensure_open(&self) -> RegResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(RegError::Closed)
        }
    }

    /// `Err(Fault)` for a session another device opened, else as
    /// [`ensure_open`](Session::ensure_open)
    #[inline]
    pub fn ensure_owned(&self, ids: &SessionIds) -> RegResult<()> {
        if !self.belongs_to(ids) {
            return Err(RegError::Fault);
        }
        self.ensure_open()
    }

    /// Release the session; a second call is a no-op.
    ///
    /// Returns true if this call did the closing.
    pub fn close(&mut self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        self.state = SessionState::Closed;
        self.exclusive = None;
        self.owner.leave();
        true
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
