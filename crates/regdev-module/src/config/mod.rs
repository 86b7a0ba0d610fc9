//! Device configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder setters
//! 2. Environment variables (via `from_env()`)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use regdev_module::config::DeviceConfig;
//!
//! let config = DeviceConfig::from_env().buf_len(128);
//! config.validate()?;
//! ```

pub mod defaults;

use regdev_core::env::{env_get, env_get_str};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Register capacity C
    pub buf_len: usize,
    /// Byte cap of GET_MESSAGE before the terminator
    pub get_msg_max: usize,
    /// Starting byte of the value device
    pub initial_value: u8,
    /// Message ring capacity (0 = no in-memory capture)
    pub log_ring: usize,
    /// Name of the proc entry
    pub proc_name: String,
    /// Directory under /sys/kernel holding the integer attribute
    pub sysfs_dir: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DeviceConfig {
    /// Defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `REGDEV_BUF_LEN` - Register capacity in bytes
    /// - `REGDEV_GET_MSG_MAX` - GET_MESSAGE byte cap
    /// - `REGDEV_INITIAL_VALUE` - Value device start byte (0-255)
    /// - `REGDEV_LOG_RING` - Message ring capacity, 0 to disable
    /// - `REGDEV_PROC_NAME` - Proc entry name
    /// - `REGDEV_SYSFS_DIR` - Sysfs directory name
    pub fn from_env() -> Self {
        Self {
            buf_len: env_get("REGDEV_BUF_LEN", defaults::BUF_LEN),
            get_msg_max: env_get("REGDEV_GET_MSG_MAX", defaults::GET_MSG_MAX),
            initial_value: env_get("REGDEV_INITIAL_VALUE", defaults::INITIAL_VALUE),
            log_ring: env_get("REGDEV_LOG_RING", defaults::LOG_RING),
            proc_name: env_get_str("REGDEV_PROC_NAME", defaults::PROC_NAME),
            sysfs_dir: env_get_str("REGDEV_SYSFS_DIR", defaults::SYSFS_DIR),
        }
    }

    /// Library defaults only, ignoring the environment
    pub fn new() -> Self {
        Self {
            buf_len: defaults::BUF_LEN,
            get_msg_max: defaults::GET_MSG_MAX,
            initial_value: defaults::INITIAL_VALUE,
            log_ring: defaults::LOG_RING,
            proc_name: defaults::PROC_NAME.to_string(),
            sysfs_dir: defaults::SYSFS_DIR.to_string(),
        }
    }

    // Builder methods

    pub fn buf_len(mut self, n: usize) -> Self {
        self.buf_len = n;
        self
    }

    pub fn get_msg_max(mut self, n: usize) -> Self {
        self.get_msg_max = n;
        self
    }

    pub fn initial_value(mut self, v: u8) -> Self {
        self.initial_value = v;
        self
    }

    pub fn log_ring(mut self, n: usize) -> Self {
        self.log_ring = n;
        self
    }

    pub fn proc_name(mut self, name: impl Into<String>) -> Self {
        self.proc_name = name.into();
        self
    }

    pub fn sysfs_dir(mut self, name: impl Into<String>) -> Self {
        self.sysfs_dir = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buf_len == 0 {
            return Err(ConfigError::InvalidValue("buf_len must be > 0"));
        }
        if self.get_msg_max == 0 {
            return Err(ConfigError::InvalidValue("get_msg_max must be > 0"));
        }
        if self.proc_name.is_empty() || self.proc_name.contains('/') {
            return Err(ConfigError::InvalidValue("proc_name must be a plain file name"));
        }
        if self.sysfs_dir.is_empty() || self.sysfs_dir.contains('/') {
            return Err(ConfigError::InvalidValue("sysfs_dir must be a plain directory name"));
        }
        Ok(())
    }

    pub fn print(&self) {
        eprintln!("regdev configuration:");
        eprintln!("  buf_len:        {}", self.buf_len);
        eprintln!("  get_msg_max:    {}", self.get_msg_max);
        eprintln!("  initial_value:  {:#04x}", self.initial_value);
        eprintln!("  log_ring:       {}", self.log_ring);
        eprintln!("  proc_name:      {}", self.proc_name);
        eprintln!("  sysfs_dir:      {}", self.sysfs_dir);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
