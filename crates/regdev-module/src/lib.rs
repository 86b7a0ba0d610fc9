//! # regdev-module - Default device implementations
//!
//! Every device implements [`regdev_core::CharDevice`]; the registry and
//! the proc/sysfs nodes stand in for what the host would provide.
//!
//! ## Default set
//!
//! | Device        | Type            | Access lock                        |
//! |---------------|-----------------|------------------------------------|
//! | chardev       | CounterDevice   | exclusive flag held per session    |
//! | chardev2      | MessageDevice   | spin lock + exclusive control flag |
//! | ioctltest     | ValueDevice     | reader/writer spin lock            |
//! | helloworld    | ProcEntry       | none (fixed content)               |
//! | myvariable    | IntAttribute    | reader/writer spin lock            |

pub mod config;
pub mod counter;
pub mod errno;
pub mod ioctl;
pub mod message;
pub mod pid_info;
pub mod procfs;
pub mod registry;
pub mod sysfs;
pub mod value;

pub use config::{ConfigError, DeviceConfig};
pub use counter::CounterDevice;
pub use errno::{errno, to_ret, ErrnoExt};
pub use ioctl::ValArg;
pub use message::MessageDevice;
pub use procfs::ProcEntry;
pub use registry::{DeviceRegistry, DeviceSet, RegistryBuilder};
pub use sysfs::{IntAttribute, KObject};
pub use value::ValueDevice;
