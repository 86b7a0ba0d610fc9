//! Library defaults for [`DeviceConfig`](super::DeviceConfig)

use regdev_core::constants;

pub const BUF_LEN: usize = constants::BUF_LEN;
pub const GET_MSG_MAX: usize = constants::GET_MSG_MAX;
pub const INITIAL_VALUE: u8 = 0xFF;
pub const LOG_RING: usize = 256;
pub const PROC_NAME: &str = "helloworld";
pub const SYSFS_DIR: &str = "mymodule";
pub const SYSFS_ATTR: &str = "myvariable";
