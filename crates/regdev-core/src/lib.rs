//! # regdev-core
//!
//! Core types and traits for guarded register devices: a small shared
//! buffer or value behind a lock, reached through open/read/write and a
//! multiplexed control call.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Device implementations live in `regdev-module`.
//!
//! ## Modules
//!
//! - `error` - Error taxonomy
//! - `id` - Session identifiers
//! - `state` - Device and session state enums
//! - `exclusive` - Fail-fast single-owner flag
//! - `lock` - Spin and reader/writer spin locks
//! - `register` - Bounded byte register
//! - `session` - Sessions and read cursors
//! - `traits` - The `CharDevice` trait and control arguments
//! - `kprint` - Kernel-style print macros and message ring
//! - `env` - Environment variable utilities

pub mod error;
pub mod id;
pub mod state;
pub mod exclusive;
pub mod lock;
pub mod register;
pub mod session;
pub mod traits;
pub mod kprint;
pub mod env;

pub use error::{RegError, RegResult};
pub use id::{SessionId, SessionIds};
pub use state::{DeviceState, SessionState};
pub use exclusive::{ExclusiveFlag, ExclusiveGuard};
pub use lock::{RwSpinLock, SpinLock};
pub use register::Register;
pub use session::{Cursor, Session};
pub use traits::{CharDevice, IoctlArg};
pub use kprint::{LogLevel, LogRecord, LogRing};
pub use env::{env_get, env_get_bool, env_get_opt, env_get_str};

/// Fixed sizes shared by every device
pub mod constants {
    /// Register capacity when no configuration overrides it
    pub const BUF_LEN: usize = 80;

    /// Most bytes GET_MESSAGE copies out before the terminator
    pub const GET_MSG_MAX: usize = 99;

    /// Major number of the message device; its command codes embed it
    pub const MESSAGE_MAJOR: u32 = 100;
}
