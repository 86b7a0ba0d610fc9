//! Sysfs analogue: a directory object holding integer attributes.
//!
//! `show` renders the value as text; `store` parses a leading decimal
//! integer the way `sscanf("%d")` would and leaves the value alone when
//! nothing parses. Either way `store` reports the whole input consumed.

use std::sync::Arc;

use regdev_core::error::{RegError, RegResult};
use regdev_core::lock::{RwSpinLock, SpinLock};
use regdev_core::{kdebug, kinfo};

/// Parent of directories created by the registry
pub const KERNEL_KOBJ: &str = "/sys/kernel";

/// Default attribute mode: owner and group read/write
pub const ATTR_MODE: u16 = 0o660;

/// Parse a leading `%d`: optional whitespace, optional sign, digits.
///
/// Overflow wraps to 32 bits like the host's string-to-long conversion
/// narrowed to `int`.
pub fn scan_int(text: &str) -> Option<i32> {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for b in digits.bytes() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        value = value.wrapping_mul(10).wrapping_add(i64::from(b - b'0'));
    }
    if !seen {
        return None;
    }
    let value = if negative { value.wrapping_neg() } else { value };
    Some(value as i32)
}

#[derive(Debug)]
pub struct IntAttribute {
    name: String,
    mode: u16,
    value: RwSpinLock<i32>,
}

impl IntAttribute {
    pub fn new(name: impl Into<String>, mode: u16) -> Self {
        Self {
            name: name.into(),
            mode,
            value: RwSpinLock::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> u16 {
        self.mode
    }

    pub fn get(&self) -> i32 {
        *self.value.read()
    }

    pub fn show(&self) -> String {
        format!("{}\n", self.get())
    }

    pub fn store(&self, text: &str) -> RegResult<usize> {
        if self.mode & 0o222 == 0 {
            return Err(RegError::Unsupported);
        }
        if let Some(v) = scan_int(text) {
            *self.value.write() = v;
            kdebug!("{}: stored {}", self.name, v);
        }
        Ok(text.len())
    }
}

/// A directory node; attributes are files inside it
#[derive(Debug)]
pub struct KObject {
    name: String,
    parent: String,
    attrs: SpinLock<Vec<Arc<IntAttribute>>>,
}

impl KObject {
    pub fn new(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            attrs: SpinLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> String {
        format!("{}/{}", self.parent, self.name)
    }

    /// Attach an attribute; names are unique within the directory
    pub fn create_file(&self, attr: Arc<IntAttribute>) -> RegResult<()> {
        let mut attrs = self.attrs.lock();
        if attrs.iter().any(|a| a.name() == attr.name()) {
            return Err(RegError::AlreadyRegistered(format!(
                "{}/{}",
                self.path(),
                attr.name()
            )));
        }
        kinfo!("created: {}/{}", self.path(), attr.name());
        attrs.push(attr);
        Ok(())
    }

    pub fn attribute(&self, name: &str) -> Option<Arc<IntAttribute>> {
        self.attrs.lock().iter().find(|a| a.name() == name).cloned()
    }

    pub fn remove_file(&self, name: &str) -> RegResult<Arc<IntAttribute>> {
        let mut attrs = self.attrs.lock();
        match attrs.iter().position(|a| a.name() == name) {
            Some(i) => Ok(attrs.remove(i)),
            None => Err(RegError::NotRegistered(format!("{}/{}", self.path(), name))),
        }
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attrs.lock().iter().map(|a| a.name().to_string()).collect()
    }
}
