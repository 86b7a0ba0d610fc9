//! Error types for register devices

use core::fmt;

/// Result type for device operations
pub type RegResult<T> = Result<T, RegError>;

/// Errors that can occur in device operations
///
/// None of these are fatal: the device stays usable after returning any
/// of them, and no operation mutates state on an error path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegError {
    /// Device (or its control path) is held by another caller
    Busy,

    /// Operation not provided by this device
    Unsupported,

    /// Control command number not recognized
    InvalidCommand(u32),

    /// Index outside the register
    OutOfRange { index: usize, len: usize },

    /// Caller-supplied argument buffer missing or too small
    Fault,

    /// Session was already released
    Closed,

    /// No process with this pid
    NoSuchProcess(i32),

    /// Name or major number already taken
    AlreadyRegistered(String),

    /// Name or major number not known to the registry
    NotRegistered(String),

    /// Dynamic number space exhausted
    NoMemory,
}

impl fmt::Display for RegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegError::Busy => write!(f, "device busy"),
            RegError::Unsupported => write!(f, "operation not supported"),
            RegError::InvalidCommand(cmd) => write!(f, "invalid control command {:#x}", cmd),
            RegError::OutOfRange { index, len } => {
                write!(f, "index {} out of range for register of {} bytes", index, len)
            }
            RegError::Fault => write!(f, "bad argument buffer"),
            RegError::Closed => write!(f, "session closed"),
            RegError::NoSuchProcess(pid) => write!(f, "no such process: {}", pid),
            RegError::AlreadyRegistered(what) => write!(f, "already registered: {}", what),
            RegError::NotRegistered(what) => write!(f, "not registered: {}", what),
            RegError::NoMemory => write!(f, "out of device numbers"),
        }
    }
}

impl std::error::Error for RegError {}

impl RegError {
    /// True for contention errors a caller may retry
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, RegError::Busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", RegError::Busy), "device busy");
        assert_eq!(
            format!("{}", RegError::InvalidCommand(0x40086400)),
            "invalid control command 0x40086400"
        );
        assert_eq!(
            format!("{}", RegError::OutOfRange { index: 80, len: 80 }),
            "index 80 out of range for register of 80 bytes"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(RegError::Busy.is_retryable());
        assert!(!RegError::Unsupported.is_retryable());
        assert!(!RegError::Fault.is_retryable());
    }
}
