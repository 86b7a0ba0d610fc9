//! `ValueDevice`: one byte behind a reader/writer lock.
//!
//! Opens never block and carry no per-session state; every access takes
//! the lock for just that call. A second integer (`num`) is set and read
//! back through its own pair of commands.

use std::sync::atomic::{AtomicI32, Ordering};

use libc::c_int;
use regdev_core::error::{RegError, RegResult};
use regdev_core::id::SessionIds;
use regdev_core::lock::RwSpinLock;
use regdev_core::session::Session;
use regdev_core::traits::{CharDevice, IoctlArg};
use regdev_core::{kdebug, kinfo};

use crate::ioctl::value as cmd;
use crate::ioctl::ValArg;

pub const DEVICE_NAME: &str = "ioctltest";

pub struct ValueDevice {
    name: String,
    val: RwSpinLock<u8>,
    num: AtomicI32,
    ids: SessionIds,
}

impl ValueDevice {
    pub fn new(initial: u8) -> Self {
        Self::with_name(DEVICE_NAME, initial)
    }

    pub fn with_name(name: impl Into<String>, initial: u8) -> Self {
        Self {
            name: name.into(),
            val: RwSpinLock::new(initial),
            num: AtomicI32::new(0),
            ids: SessionIds::new(),
        }
    }

    pub fn value(&self) -> u8 {
        *self.val.read()
    }

    pub fn num(&self) -> i32 {
        self.num.load(Ordering::Acquire)
    }

    fn dispatch(&self, command: u32, mut arg: IoctlArg<'_>) -> RegResult<i64> {
        match command {
            cmd::VALSET => {
                let data = ValArg::from_bytes(arg.input(ValArg::SIZE)?).ok_or(RegError::Fault)?;
                kdebug!("{}: IOCTL set val:{:x}", self.name, data.val);
                *self.val.write() = data.val as u8;
                Ok(0)
            }
            cmd::VALGET => {
                let out = arg.output(ValArg::SIZE)?;
                let data = ValArg {
                    val: u32::from(*self.val.read()),
                };
                out[..ValArg::SIZE].copy_from_slice(&data.to_bytes());
                Ok(0)
            }
            cmd::VALGET_NUM => {
                let out = arg.output(core::mem::size_of::<c_int>())?;
                out[..4].copy_from_slice(&self.num().to_ne_bytes());
                Ok(0)
            }
            cmd::VALSET_NUM => {
                let v = arg.value()? as c_int;
                self.num.store(v, Ordering::Release);
                Ok(0)
            }
            other => Err(RegError::InvalidCommand(other)),
        }
    }
}

impl CharDevice for ValueDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn sessions(&self) -> &SessionIds {
        &self.ids
    }

    fn open(&self) -> RegResult<Session<'_>> {
        let session = Session::shared(&self.ids);
        kinfo!("{}: open call (session {})", self.name, session.id());
        Ok(session)
    }

    fn release(&self, session: &mut Session<'_>) {
        if session.belongs_to(&self.ids) && session.close() {
            kinfo!("{}: close call (session {})", self.name, session.id());
        }
    }

    /// Fills all of `buf` with the current value; never reports end of data
    fn read(&self, session: &mut Session<'_>, buf: &mut [u8]) -> RegResult<usize> {
        session.ensure_owned(&self.ids)?;
        let v = *self.val.read();
        buf.fill(v);
        kdebug!("{}: read call ({} bytes)", self.name, buf.len());
        Ok(buf.len())
    }

    fn ioctl(&self, session: &mut Session<'_>, command: u32, arg: IoctlArg<'_>) -> RegResult<i64> {
        session.ensure_owned(&self.ids)?;
        self.dispatch(command, arg)
    }
}
