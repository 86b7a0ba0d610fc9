//! Errno mapping for device errors.
//!
//! Callers that speak the host's return convention (a count on success,
//! a negative errno on failure) go through [`to_ret`].

use regdev_core::error::{RegError, RegResult};

/// Positive errno for an error
pub fn errno(err: &RegError) -> i32 {
    match err {
        RegError::Busy => libc::EBUSY,
        RegError::Unsupported => libc::EINVAL,
        RegError::InvalidCommand(_) => libc::ENOTTY,
        RegError::OutOfRange { .. } => libc::ERANGE,
        RegError::Fault => libc::EFAULT,
        RegError::Closed => libc::EBADF,
        RegError::NoSuchProcess(_) => libc::ESRCH,
        RegError::AlreadyRegistered(_) => libc::EBUSY,
        RegError::NotRegistered(_) => libc::ENOENT,
        RegError::NoMemory => libc::ENOMEM,
    }
}

/// Fold a result into `value` or `-errno`
pub fn to_ret<T: Into<i64>>(res: RegResult<T>) -> i64 {
    match res {
        Ok(v) => v.into(),
        Err(e) => -(errno(&e) as i64),
    }
}

/// `errno()` as a method
pub trait ErrnoExt {
    fn errno(&self) -> i32;
}

impl ErrnoExt for RegError {
    fn errno(&self) -> i32 {
        errno(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values() {
        assert_eq!(RegError::Busy.errno(), libc::EBUSY);
        assert_eq!(RegError::InvalidCommand(1).errno(), libc::ENOTTY);
        assert_eq!(RegError::Fault.errno(), libc::EFAULT);
    }

    #[test]
    fn test_to_ret() {
        assert_eq!(to_ret::<i64>(Ok(5)), 5);
        assert_eq!(to_ret::<i64>(Err(RegError::Busy)), -(libc::EBUSY as i64));
        assert_eq!(to_ret::<u32>(Err(RegError::Unsupported)), -(libc::EINVAL as i64));
    }
}
