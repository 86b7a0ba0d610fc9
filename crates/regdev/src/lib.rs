//! # regdev - Guarded register devices
//!
//! Small shared buffers and values behind locks, reached the way a
//! character device is: open a session, read and write through it, and
//! multiplex everything else over a numbered control call.
//!
//! ## Quick Start
//!
//! ```ignore
//! use regdev::{load, CharDevice, DeviceConfig};
//!
//! let set = load(DeviceConfig::default())?;
//! let dev = &set.message;
//!
//! let mut session = dev.open()?;
//! dev.write(&mut session, b"hi")?;
//! let text = regdev::read_to_end(dev.as_ref(), &mut session)?;
//! assert_eq!(text, b"hi");
//! dev.release(&mut session);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                               │
//! │            open / read / write / ioctl / release            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DeviceRegistry                           │
//! │       majors, proc entries, /sys/kernel directories         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │  chardev  │      │ chardev2  │      │ ioctltest │
//!    │ exclusive │      │ spin+flag │      │  rw lock  │
//!    └───────────┘      └───────────┘      └───────────┘
//! ```

// Re-export core types
pub use regdev_core::{
    constants,
    CharDevice,
    Cursor,
    DeviceState,
    ExclusiveFlag,
    ExclusiveGuard,
    IoctlArg,
    RegError,
    RegResult,
    Register,
    RwSpinLock,
    Session,
    SessionId,
    SessionState,
    SpinLock,
};

// Re-export kprint macros and the message ring
pub use regdev_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use regdev_core::kprint::{
    dmesg, init as init_logging, install_ring, set_flush_enabled, set_log_level, LogLevel,
    LogRecord,
};

// Re-export env utilities
pub use regdev_core::{env_get, env_get_bool, env_get_opt, env_get_str};

// Re-export devices
pub use regdev_module::{
    errno,
    ioctl,
    pid_info,
    to_ret,
    ConfigError,
    CounterDevice,
    DeviceConfig,
    DeviceRegistry,
    DeviceSet,
    ErrnoExt,
    IntAttribute,
    KObject,
    MessageDevice,
    ProcEntry,
    RegistryBuilder,
    ValArg,
    ValueDevice,
};

/// Initialize logging from the environment and register the default set
///
/// The set stays registered until it is dropped.
pub fn load(config: DeviceConfig) -> RegResult<DeviceSet> {
    init_logging();
    RegistryBuilder::new(config).build()
}

/// Read until the device signals end of data
///
/// Only meaningful on devices that do signal it; a device that always
/// fills the buffer would never return.
pub fn read_to_end<D>(dev: &D, session: &mut Session<'_>) -> RegResult<Vec<u8>>
where
    D: CharDevice + ?Sized,
{
    let mut out = Vec::new();
    let mut buf = [0u8; 64];
    loop {
        let n = dev.read(session, &mut buf)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_to_end_restarts() {
        let dev = MessageDevice::new(80, 99);
        let mut s = dev.open().unwrap();
        dev.write(&mut s, &[b'z'; 70]).unwrap();

        assert_eq!(read_to_end(&dev, &mut s).unwrap(), vec![b'z'; 70]);
        assert_eq!(read_to_end(&dev, &mut s).unwrap(), vec![b'z'; 70]);
    }

    #[test]
    fn test_load_with_own_registry_names() {
        let config = DeviceConfig::new()
            .log_ring(0)
            .proc_name("facade_hello")
            .sysfs_dir("facade_dir");
        let set = load(config).unwrap();
        assert!(set.registry.proc_lookup("facade_hello").is_some());

        let mut s = set.counter.open().unwrap();
        let text = read_to_end(set.counter.as_ref(), &mut s).unwrap();
        assert_eq!(text, b"I already told you 0 times Hello world!\n");
    }
}
