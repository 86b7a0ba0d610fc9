//! `CounterDevice`: read-only device that counts its opens.
//!
//! Only one session may be open at a time. Each successful open renders
//! a greeting with the number of earlier opens into the register; reads
//! drain it and then signal end-of-data. Writes are refused.

use std::sync::atomic::{AtomicU64, Ordering};

use regdev_core::error::{RegError, RegResult};
use regdev_core::exclusive::ExclusiveFlag;
use regdev_core::id::SessionIds;
use regdev_core::lock::SpinLock;
use regdev_core::register::Register;
use regdev_core::session::Session;
use regdev_core::traits::CharDevice;
use regdev_core::{kdebug, kerror};

pub const DEVICE_NAME: &str = "chardev";

pub struct CounterDevice {
    name: String,
    busy: ExclusiveFlag,
    opens: AtomicU64,
    register: SpinLock<Register>,
    ids: SessionIds,
}

impl CounterDevice {
    pub fn new(capacity: usize) -> Self {
        Self::with_name(DEVICE_NAME, capacity)
    }

    pub fn with_name(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            busy: ExclusiveFlag::new(),
            opens: AtomicU64::new(0),
            register: SpinLock::new(Register::new(capacity)),
            ids: SessionIds::new(),
        }
    }

    /// Number of successful opens so far
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::Relaxed)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_held()
    }

    fn greeting(n: u64) -> String {
        format!("I already told you {} times Hello world!\n", n)
    }
}

impl CharDevice for CounterDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn sessions(&self) -> &SessionIds {
        &self.ids
    }

    fn open(&self) -> RegResult<Session<'_>> {
        let guard = self.busy.try_acquire()?;
        let n = self.opens.fetch_add(1, Ordering::Relaxed);
        self.register.lock().replace(Self::greeting(n).as_bytes());

        let session = Session::exclusive(&self.ids, guard);
        kdebug!("{}: open session {} (count {})", self.name, session.id(), n);
        Ok(session)
    }

    fn release(&self, session: &mut Session<'_>) {
        if session.belongs_to(&self.ids) && session.close() {
            kdebug!("{}: release session {}", self.name, session.id());
        }
    }

    fn read(&self, session: &mut Session<'_>, buf: &mut [u8]) -> RegResult<usize> {
        session.ensure_owned(&self.ids)?;
        let reg = self.register.lock();
        Ok(session.cursor_mut().drain(&reg, buf))
    }

    fn write(&self, session: &mut Session<'_>, _data: &[u8]) -> RegResult<usize> {
        session.ensure_owned(&self.ids)?;
        kerror!("{}: Write operations are not supported.", self.name);
        Err(RegError::Unsupported)
    }
}
