//! Device and session state types

use core::fmt;

/// Exclusive-access state of a device
///
/// Stored as a `u8` inside [`ExclusiveFlag`](crate::exclusive::ExclusiveFlag)
/// so transitions are a single compare-and-swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceState {
    /// Nobody holds the device
    Idle = 0,

    /// One caller holds the device exclusively
    Open = 1,
}

impl DeviceState {
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, DeviceState::Open)
    }
}

impl From<u8> for DeviceState {
    fn from(v: u8) -> Self {
        match v {
            1 => DeviceState::Open,
            _ => DeviceState::Idle,
        }
    }
}

impl From<DeviceState> for u8 {
    fn from(state: DeviceState) -> u8 {
        state as u8
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Idle => write!(f, "IDLE"),
            DeviceState::Open => write!(f, "OPEN"),
        }
    }
}

/// Lifecycle of a session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

impl SessionState {
    #[inline]
    pub const fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}
