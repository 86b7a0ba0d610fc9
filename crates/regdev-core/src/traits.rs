//! Device traits
//!
//! These define the boundary between a caller (a shell, a smoke test, a
//! registry) and a device implementation. Buffers are plain slices: the
//! transport that would copy to and from another address space is not
//! part of this crate.

use crate::error::{RegError, RegResult};
use crate::id::SessionIds;
use crate::session::Session;

/// Argument slot of a control call
///
/// Mirrors the single `unsigned long` an ioctl carries, split by how the
/// command uses it.
#[derive(Debug)]
pub enum IoctlArg<'a> {
    /// No argument
    None,
    /// Plain integer argument
    Value(u64),
    /// Caller buffer the device reads from
    In(&'a [u8]),
    /// Caller buffer the device writes into
    Out(&'a mut [u8]),
}

impl<'a> IoctlArg<'a> {
    /// Integer argument, or `Fault` if the caller passed a buffer
    pub fn value(&self) -> RegResult<u64> {
        match self {
            IoctlArg::Value(v) => Ok(*v),
            _ => Err(RegError::Fault),
        }
    }

    /// Input buffer of at least `min` bytes
    pub fn input(&self, min: usize) -> RegResult<&[u8]> {
        match self {
            IoctlArg::In(buf) if buf.len() >= min => Ok(*buf),
            _ => Err(RegError::Fault),
        }
    }

    /// Output buffer of at least `min` bytes
    pub fn output(&mut self, min: usize) -> RegResult<&mut [u8]> {
        match self {
            IoctlArg::Out(buf) if buf.len() >= min => Ok(&mut **buf),
            _ => Err(RegError::Fault),
        }
    }
}

/// A character-device-like service
///
/// `open` hands out a [`Session`]; the other operations act through it.
/// Defaults implement the "not provided" behavior so a device only
/// overrides what it supports.
///
/// Sessions opened by another device are refused with `Fault`, and
/// releasing one is a no-op.
pub trait CharDevice: Send + Sync {
    /// Name the device is registered under
    fn name(&self) -> &str;

    /// Source of this device's sessions
    fn sessions(&self) -> &SessionIds;

    /// Start a session, or fail with `Busy` on an exclusive device in use
    fn open(&self) -> RegResult<Session<'_>>;

    /// End a session; safe to call on an already-closed session
    fn release(&self, session: &mut Session<'_>) {
        if session.belongs_to(self.sessions()) {
            session.close();
        }
    }

    /// Copy up to `buf.len()` bytes out; 0 signals end of data
    fn read(&self, session: &mut Session<'_>, buf: &mut [u8]) -> RegResult<usize>;

    /// Store `data`, returning how many bytes were consumed
    fn write(&self, session: &mut Session<'_>, _data: &[u8]) -> RegResult<usize> {
        session.ensure_owned(self.sessions())?;
        Err(RegError::Unsupported)
    }

    /// Dispatch a control command
    fn ioctl(&self, session: &mut Session<'_>, cmd: u32, _arg: IoctlArg<'_>) -> RegResult<i64> {
        session.ensure_owned(self.sessions())?;
        Err(RegError::InvalidCommand(cmd))
    }
}
