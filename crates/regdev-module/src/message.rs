//! `MessageDevice`: read/write message register with a control path.
//!
//! Sessions are not exclusive: open and release only track how many are
//! outstanding. The register sits behind a spin lock for every access,
//! and the control dispatcher additionally takes a fail-fast exclusive
//! flag for the whole call, so two control calls never interleave.
//!
//! ```text
//! SET_MSG      In(text)       store text up to its NUL, at most C bytes
//! GET_MSG      Out(buf)       copy message (≤ get_msg_max bytes) + NUL
//! GET_NTH_BYTE Value(index)   return byte at index, OutOfRange past C
//! SET_SCALAR   Value(v)       overwrite the scalar
//! GET_SCALAR   Out(buf[4])    copy the scalar out, also returned
//! ```

use std::sync::atomic::{AtomicI32, Ordering};

use libc::c_int;
use regdev_core::error::{RegError, RegResult};
use regdev_core::exclusive::ExclusiveFlag;
use regdev_core::id::SessionIds;
use regdev_core::lock::SpinLock;
use regdev_core::register::Register;
use regdev_core::session::Session;
use regdev_core::traits::{CharDevice, IoctlArg};
use regdev_core::{kdebug, kinfo};

use crate::ioctl::message as cmd;

pub const DEVICE_NAME: &str = "chardev2";

pub struct MessageDevice {
    name: String,
    control: ExclusiveFlag,
    register: SpinLock<Register>,
    scalar: AtomicI32,
    get_msg_max: usize,
    ids: SessionIds,
}

impl MessageDevice {
    pub fn new(capacity: usize, get_msg_max: usize) -> Self {
        Self::with_name(DEVICE_NAME, capacity, get_msg_max)
    }

    pub fn with_name(name: impl Into<String>, capacity: usize, get_msg_max: usize) -> Self {
        Self {
            name: name.into(),
            control: ExclusiveFlag::new(),
            register: SpinLock::new(Register::new(capacity)),
            scalar: AtomicI32::new(0),
            get_msg_max,
            ids: SessionIds::new(),
        }
    }

    /// Snapshot of the current message
    pub fn message(&self) -> Vec<u8> {
        self.register.lock().message().to_vec()
    }

    pub fn scalar(&self) -> i32 {
        self.scalar.load(Ordering::Acquire)
    }

    /// Sessions opened and not yet released or dropped
    pub fn open_sessions(&self) -> usize {
        self.ids.live()
    }

    /// True while a control call is in progress
    pub fn control_busy(&self) -> bool {
        self.control.is_held()
    }

    fn get_message(&self, out: &mut [u8]) -> RegResult<i64> {
        // Room for at least the terminator
        let Some(room) = out.len().checked_sub(1) else {
            return Err(RegError::Fault);
        };
        let limit = room.min(self.get_msg_max);
        let n = self.register.lock().copy_message(0, &mut out[..limit]);
        out[n] = 0;
        Ok(n as i64)
    }

    fn dispatch(&self, command: u32, mut arg: IoctlArg<'_>) -> RegResult<i64> {
        match command {
            cmd::SET_MSG => {
                let text = arg.input(0)?;
                let n = self.register.lock().set_message(text);
                kdebug!("{}: message set ({} bytes)", self.name, n);
                Ok(n as i64)
            }
            cmd::GET_MSG => self.get_message(arg.output(1)?),
            cmd::GET_NTH_BYTE => {
                let len = self.register.lock().capacity();
                let index = usize::try_from(arg.value()?)
                    .map_err(|_| RegError::OutOfRange { index: usize::MAX, len })?;
                self.register.lock().byte_at(index).map(i64::from)
            }
            cmd::SET_SCALAR => {
                let v = arg.value()? as c_int;
                self.scalar.store(v, Ordering::Release);
                Ok(0)
            }
            cmd::GET_SCALAR => {
                let out = arg.output(core::mem::size_of::<c_int>())?;
                let v = self.scalar();
                out[..4].copy_from_slice(&v.to_ne_bytes());
                Ok(i64::from(v))
            }
            other => Err(RegError::InvalidCommand(other)),
        }
    }
}

impl CharDevice for MessageDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn sessions(&self) -> &SessionIds {
        &self.ids
    }

    fn open(&self) -> RegResult<Session<'_>> {
        let session = Session::shared(&self.ids);
        kinfo!("{}: device_open(session {})", self.name, session.id());
        Ok(session)
    }

    fn release(&self, session: &mut Session<'_>) {
        if session.belongs_to(&self.ids) && session.close() {
            kinfo!("{}: device_release(session {})", self.name, session.id());
        }
    }

    fn read(&self, session: &mut Session<'_>, buf: &mut [u8]) -> RegResult<usize> {
        session.ensure_owned(&self.ids)?;
        let n = {
            let reg = self.register.lock();
            session.cursor_mut().drain(&reg, buf)
        };
        kdebug!("{}: Read {} bytes, {} left", self.name, n, buf.len() - n);
        Ok(n)
    }

    fn write(&self, session: &mut Session<'_>, data: &[u8]) -> RegResult<usize> {
        session.ensure_owned(&self.ids)?;
        let n = self.register.lock().replace(data);
        kdebug!("{}: device_write({} of {} bytes)", self.name, n, data.len());
        Ok(n)
    }

    fn ioctl(&self, session: &mut Session<'_>, command: u32, arg: IoctlArg<'_>) -> RegResult<i64> {
        session.ensure_owned(&self.ids)?;
        // Released on every return path when the guard drops
        let _guard = self.control.try_acquire()?;
        self.dispatch(command, arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn device() -> MessageDevice {
        MessageDevice::new(80, 99)
    }

    #[test]
    fn test_write_read_restart() {
        let dev = device();
        let mut s = dev.open().unwrap();
        assert_eq!(dev.write(&mut s, b"hi"), Ok(2));

        let mut buf = [0u8; 5];
        assert_eq!(dev.read(&mut s, &mut buf), Ok(2));
        assert_eq!(&buf[..2], b"hi");
        assert_eq!(dev.read(&mut s, &mut buf), Ok(0));
        assert_eq!(dev.read(&mut s, &mut buf), Ok(2));
        assert_eq!(&buf[..2], b"hi");
    }

    #[test]
    fn test_write_clamps_and_replaces() {
        let dev = device();
        let mut s = dev.open().unwrap();
        let long = vec![b'x'; 200];
        assert_eq!(dev.write(&mut s, &long), Ok(80));
        assert_eq!(dev.message().len(), 80);

        assert_eq!(dev.write(&mut s, b"short"), Ok(5));
        assert_eq!(dev.message(), b"short");
    }

    #[test]
    fn test_get_message_terminated() {
        let dev = device();
        let mut s = dev.open().unwrap();
        dev.write(&mut s, b"hello").unwrap();

        let mut out = [0xAAu8; 128];
        let n = dev.ioctl(&mut s, cmd::GET_MSG, IoctlArg::Out(&mut out)).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&out[..6], b"hello\0");
    }

    #[test]
    fn test_get_message_caps() {
        // Capacity above the cap: GET_MSG stops at get_msg_max bytes
        let dev = MessageDevice::new(150, 99);
        let mut s = dev.open().unwrap();
        dev.write(&mut s, &[b'y'; 150]).unwrap();

        let mut out = [0u8; 200];
        let n = dev.ioctl(&mut s, cmd::GET_MSG, IoctlArg::Out(&mut out)).unwrap();
        assert_eq!(n, 99);
        assert_eq!(out[99], 0);

        // Small output buffer: truncated but still terminated
        let mut small = [0u8; 4];
        assert_eq!(dev.ioctl(&mut s, cmd::GET_MSG, IoctlArg::Out(&mut small)), Ok(3));
        assert_eq!(&small, b"yyy\0");

        let mut empty: [u8; 0] = [];
        assert_eq!(
            dev.ioctl(&mut s, cmd::GET_MSG, IoctlArg::Out(&mut empty)),
            Err(RegError::Fault)
        );
    }

    #[test]
    fn test_set_message_reads_to_nul() {
        let dev = device();
        let mut s = dev.open().unwrap();
        let n = dev.ioctl(&mut s, cmd::SET_MSG, IoctlArg::In(b"ioctl msg\0ignored")).unwrap();
        assert_eq!(n, 9);
        assert_eq!(dev.message(), b"ioctl msg");

        let mut buf = [0u8; 32];
        assert_eq!(dev.read(&mut s, &mut buf), Ok(9));
    }

    #[test]
    fn test_get_nth_byte() {
        let dev = device();
        let mut s = dev.open().unwrap();
        dev.write(&mut s, b"abc").unwrap();

        assert_eq!(dev.ioctl(&mut s, cmd::GET_NTH_BYTE, IoctlArg::Value(1)), Ok(b'b' as i64));
        assert_eq!(dev.ioctl(&mut s, cmd::GET_NTH_BYTE, IoctlArg::Value(10)), Ok(0));
        assert_eq!(
            dev.ioctl(&mut s, cmd::GET_NTH_BYTE, IoctlArg::Value(80)),
            Err(RegError::OutOfRange { index: 80, len: 80 })
        );
        // Flag released after the error
        assert!(!dev.control_busy());
    }

    #[test]
    fn test_scalar() {
        let dev = device();
        let mut s = dev.open().unwrap();
        assert_eq!(dev.ioctl(&mut s, cmd::SET_SCALAR, IoctlArg::Value(42)), Ok(0));
        assert_eq!(dev.scalar(), 42);

        let mut out = [0u8; 4];
        assert_eq!(dev.ioctl(&mut s, cmd::GET_SCALAR, IoctlArg::Out(&mut out)), Ok(42));
        assert_eq!(i32::from_ne_bytes(out), 42);

        // Scalar is independent of the register
        assert!(dev.message().is_empty());
    }

    #[test]
    fn test_bad_command_and_args_leave_state() {
        let dev = device();
        let mut s = dev.open().unwrap();
        dev.write(&mut s, b"keep").unwrap();

        assert_eq!(dev.ioctl(&mut s, 0xdead, IoctlArg::None), Err(RegError::InvalidCommand(0xdead)));
        assert_eq!(dev.ioctl(&mut s, cmd::SET_MSG, IoctlArg::Value(1)), Err(RegError::Fault));
        assert_eq!(dev.ioctl(&mut s, cmd::SET_SCALAR, IoctlArg::In(b"7")), Err(RegError::Fault));

        assert_eq!(dev.message(), b"keep");
        assert_eq!(dev.scalar(), 0);
        assert!(!dev.control_busy());
    }

    #[test]
    fn test_open_always_succeeds() {
        let dev = device();
        let mut a = dev.open().unwrap();
        let mut b = dev.open().unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(dev.open_sessions(), 2);

        dev.release(&mut a);
        dev.release(&mut a);
        assert_eq!(dev.open_sessions(), 1);
        dev.release(&mut b);
        assert_eq!(dev.open_sessions(), 0);
        assert_eq!(dev.ioctl(&mut a, cmd::SET_SCALAR, IoctlArg::Value(1)), Err(RegError::Closed));
    }

    #[test]
    fn test_foreign_sessions_refused() {
        use crate::counter::CounterDevice;
        use crate::procfs::ProcEntry;

        let dev = device();
        let mut own = dev.open().unwrap();
        dev.write(&mut own, b"secret").unwrap();

        let entry = ProcEntry::new("helloworld");
        let mut proc_session = entry.open().unwrap();
        dev.release(&mut proc_session);
        assert!(proc_session.is_open());
        assert_eq!(dev.open_sessions(), 1);

        let counter = CounterDevice::new(80);
        let mut counter_session = counter.open().unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(dev.read(&mut counter_session, &mut buf), Err(RegError::Fault));
        assert_eq!(dev.write(&mut counter_session, b"x"), Err(RegError::Fault));
        assert_eq!(
            dev.ioctl(&mut counter_session, cmd::SET_SCALAR, IoctlArg::Value(9)),
            Err(RegError::Fault)
        );
        assert_eq!(dev.message(), b"secret");
        assert_eq!(dev.scalar(), 0);

        // Only the counter can give its exclusive flag back
        dev.release(&mut counter_session);
        assert!(counter.is_busy());
        counter.release(&mut counter_session);
        assert!(!counter.is_busy());
    }

    #[test]
    fn test_dropped_session_not_counted() {
        let dev = device();
        {
            let _a = dev.open().unwrap();
            let _b = dev.open().unwrap();
            assert_eq!(dev.open_sessions(), 2);
        }
        assert_eq!(dev.open_sessions(), 0);

        // Release then drop counts once
        let mut s = dev.open().unwrap();
        dev.release(&mut s);
        drop(s);
        assert_eq!(dev.open_sessions(), 0);
    }

    #[test]
    fn test_concurrent_control_busy_or_ok() {
        let dev = Arc::new(device());
        let barrier = Arc::new(Barrier::new(4));
        let mut handles = vec![];

        for t in 0..4u64 {
            let dev = Arc::clone(&dev);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                let mut s = dev.open().unwrap();
                barrier.wait();
                let mut ok = 0;
                for _ in 0..500 {
                    match dev.ioctl(&mut s, cmd::SET_SCALAR, IoctlArg::Value(t)) {
                        Ok(_) => ok += 1,
                        Err(RegError::Busy) => {}
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
                ok
            }));
        }

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(total > 0);
        assert!((0..4).contains(&dev.scalar()));
        assert!(!dev.control_busy());
    }
}
