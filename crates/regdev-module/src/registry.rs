//! `DeviceRegistry` and the default device set.
//!
//! The registry plays the host's part: it hands out major numbers, keeps
//! devices discoverable by name and number, and holds the proc and sysfs
//! nodes. [`RegistryBuilder`] wires the default devices into one and
//! returns a [`DeviceSet`] that tears them down again on drop.
//!
//! ```text
//! major 254..234  chardev     CounterDevice   (dynamic)
//! major 100       chardev2    MessageDevice   (fixed, embedded in its commands)
//! major 254..234  ioctltest   ValueDevice     (dynamic)
//! /proc/helloworld            ProcEntry
//! /sys/kernel/mymodule        KObject + myvariable
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use regdev_core::constants::MESSAGE_MAJOR;
use regdev_core::error::{RegError, RegResult};
use regdev_core::kprint;
use regdev_core::lock::SpinLock;
use regdev_core::traits::CharDevice;
use regdev_core::{kerror, kinfo};

use crate::config::{defaults, DeviceConfig};
use crate::counter::CounterDevice;
use crate::message::MessageDevice;
use crate::procfs::ProcEntry;
use crate::sysfs::{IntAttribute, KObject, ATTR_MODE, KERNEL_KOBJ};
use crate::value::ValueDevice;

/// Dynamic majors are handed out from the top of this range downwards
pub const DYNAMIC_MAJOR_HIGH: u32 = 254;
pub const DYNAMIC_MAJOR_LOW: u32 = 234;

/// Highest major a fixed registration may ask for
pub const MAX_MAJOR: u32 = 4095;

pub struct DeviceRegistry {
    chrdevs: SpinLock<BTreeMap<u32, Arc<dyn CharDevice>>>,
    procs: SpinLock<BTreeMap<String, Arc<ProcEntry>>>,
    kobjects: SpinLock<BTreeMap<String, Arc<KObject>>>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            chrdevs: SpinLock::new(BTreeMap::new()),
            procs: SpinLock::new(BTreeMap::new()),
            kobjects: SpinLock::new(BTreeMap::new()),
        }
    }

    // ========================================================================
    // Character devices
    // ========================================================================

    /// Register `device` under `major`, or under a free dynamic major if
    /// `major` is 0. Returns the major in use.
    pub fn register_chrdev(&self, major: u32, device: Arc<dyn CharDevice>) -> RegResult<u32> {
        let mut chrdevs = self.chrdevs.lock();

        if chrdevs.values().any(|d| d.name() == device.name()) {
            return Err(RegError::AlreadyRegistered(device.name().to_string()));
        }

        let major = if major == 0 {
            (DYNAMIC_MAJOR_LOW..=DYNAMIC_MAJOR_HIGH)
                .rev()
                .find(|m| !chrdevs.contains_key(m))
                .ok_or(RegError::NoMemory)?
        } else if major > MAX_MAJOR || chrdevs.contains_key(&major) {
            return Err(RegError::AlreadyRegistered(format!("major {}", major)));
        } else {
            major
        };

        kinfo!("{}: I was assigned major number {}.", device.name(), major);
        chrdevs.insert(major, device);
        Ok(major)
    }

    /// Remove the device at `major`; `name` must match what was registered
    pub fn unregister_chrdev(&self, major: u32, name: &str) -> RegResult<Arc<dyn CharDevice>> {
        let mut chrdevs = self.chrdevs.lock();
        match chrdevs.get(&major) {
            Some(dev) if dev.name() == name => {}
            _ => return Err(RegError::NotRegistered(format!("{} (major {})", name, major))),
        }
        chrdevs.remove(&major).ok_or_else(|| RegError::NotRegistered(name.to_string()))
    }

    pub fn chrdev(&self, major: u32) -> Option<Arc<dyn CharDevice>> {
        self.chrdevs.lock().get(&major).cloned()
    }

    pub fn chrdev_by_name(&self, name: &str) -> Option<(u32, Arc<dyn CharDevice>)> {
        self.chrdevs
            .lock()
            .iter()
            .find(|(_, d)| d.name() == name)
            .map(|(m, d)| (*m, Arc::clone(d)))
    }

    /// `(major, name)` of every registered device, by major
    pub fn devices(&self) -> Vec<(u32, String)> {
        self.chrdevs
            .lock()
            .iter()
            .map(|(m, d)| (*m, d.name().to_string()))
            .collect()
    }

    // ========================================================================
    // Proc entries
    // ========================================================================

    pub fn proc_create(&self, entry: ProcEntry) -> RegResult<Arc<ProcEntry>> {
        let mut procs = self.procs.lock();
        if procs.contains_key(entry.name()) {
            kerror!("Error:Could not initialize {}", entry.path());
            return Err(RegError::AlreadyRegistered(entry.path()));
        }
        let entry = Arc::new(entry);
        procs.insert(entry.name().to_string(), Arc::clone(&entry));
        kinfo!("{} created", entry.path());
        Ok(entry)
    }

    pub fn proc_lookup(&self, name: &str) -> Option<Arc<ProcEntry>> {
        self.procs.lock().get(name).cloned()
    }

    pub fn proc_remove(&self, name: &str) -> RegResult<()> {
        match self.procs.lock().remove(name) {
            Some(entry) => {
                kinfo!("{} removed", entry.path());
                Ok(())
            }
            None => Err(RegError::NotRegistered(format!("/proc/{}", name))),
        }
    }

    // ========================================================================
    // Kobjects
    // ========================================================================

    /// Create a directory `name` under `parent`; keyed by its full path
    pub fn kobject_create_and_add(&self, name: &str, parent: &str) -> RegResult<Arc<KObject>> {
        let kobj = KObject::new(name, parent);
        let path = kobj.path();
        let mut kobjects = self.kobjects.lock();
        if kobjects.contains_key(&path) {
            return Err(RegError::AlreadyRegistered(path));
        }
        let kobj = Arc::new(kobj);
        kobjects.insert(path.clone(), Arc::clone(&kobj));
        kinfo!("created: {}", path);
        Ok(kobj)
    }

    pub fn kobject(&self, path: &str) -> Option<Arc<KObject>> {
        self.kobjects.lock().get(path).cloned()
    }

    pub fn kobject_put(&self, path: &str) -> RegResult<()> {
        match self.kobjects.lock().remove(path) {
            Some(_) => {
                kinfo!("deleted: {}", path);
                Ok(())
            }
            None => Err(RegError::NotRegistered(path.to_string())),
        }
    }
}

// ============================================================================
// Default device set
// ============================================================================

/// The default devices, registered and typed.
///
/// Dropping the set unregisters everything it added, in reverse order.
pub struct DeviceSet {
    pub registry: Arc<DeviceRegistry>,
    pub counter: Arc<CounterDevice>,
    pub counter_major: u32,
    pub message: Arc<MessageDevice>,
    pub message_major: u32,
    pub value: Arc<ValueDevice>,
    pub value_major: u32,
    pub proc_entry: Arc<ProcEntry>,
    pub kobject: Arc<KObject>,
    pub attribute: Arc<IntAttribute>,
}

pub struct RegistryBuilder {
    config: DeviceConfig,
    registry: Option<Arc<DeviceRegistry>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new(DeviceConfig::default())
    }
}

impl RegistryBuilder {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            registry: None,
        }
    }

    /// Register into an existing registry instead of a fresh one
    pub fn registry(mut self, registry: Arc<DeviceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the default set.
    ///
    /// 1. Validates the configuration
    /// 2. Installs the log ring (if configured)
    /// 3. Registers the three character devices
    /// 4. Creates the proc entry
    /// 5. Creates the sysfs directory and its attribute
    ///
    /// A failure part-way unregisters what was already added.
    pub fn build(self) -> RegResult<DeviceSet> {
        let config = self.config;
        config.validate().map_err(|e| {
            kerror!("regdev: {}", e);
            RegError::Unsupported
        })?;

        if config.log_ring > 0 {
            kprint::install_ring(config.log_ring);
        }

        let registry = self.registry.unwrap_or_default();
        let mut undo = Undo::new(&registry);

        let counter = Arc::new(CounterDevice::new(config.buf_len));
        let counter_major = registry.register_chrdev(0, counter.clone())?;
        undo.chrdev(counter_major, counter.name());

        let message = Arc::new(MessageDevice::new(config.buf_len, config.get_msg_max));
        let message_major = registry.register_chrdev(MESSAGE_MAJOR, message.clone())?;
        undo.chrdev(message_major, message.name());

        let value = Arc::new(ValueDevice::new(config.initial_value));
        let value_major = registry.register_chrdev(0, value.clone())?;
        undo.chrdev(value_major, value.name());
        kinfo!("{} driver(major: {}) installed.", value.name(), value_major);

        let proc_entry = registry.proc_create(ProcEntry::new(config.proc_name.as_str()))?;
        undo.proc(proc_entry.name());

        let kobject = registry.kobject_create_and_add(&config.sysfs_dir, KERNEL_KOBJ)?;
        undo.kobject(kobject.path());
        let attribute = Arc::new(IntAttribute::new(defaults::SYSFS_ATTR, ATTR_MODE));
        kobject.create_file(Arc::clone(&attribute))?;

        undo.disarm();
        drop(undo);
        Ok(DeviceSet {
            registry,
            counter,
            counter_major,
            message,
            message_major,
            value,
            value_major,
            proc_entry,
            kobject,
            attribute,
        })
    }
}

impl Drop for DeviceSet {
    fn drop(&mut self) {
        let _ = self.kobject.remove_file(self.attribute.name());
        let _ = self.registry.kobject_put(&self.kobject.path());
        let _ = self.registry.proc_remove(self.proc_entry.name());

        let _ = self.registry.unregister_chrdev(self.value_major, self.value.name());
        kinfo!("{} driver removed.", self.value.name());
        let _ = self.registry.unregister_chrdev(self.message_major, self.message.name());
        kinfo!("{}: Exiting.", self.message.name());
        let _ = self.registry.unregister_chrdev(self.counter_major, self.counter.name());
        kinfo!("{}: Exiting.", self.counter.name());
    }
}

/// Rolls back a partial build
struct Undo<'a> {
    registry: &'a DeviceRegistry,
    chrdevs: Vec<(u32, String)>,
    proc: Option<String>,
    kobject: Option<String>,
    armed: bool,
}

impl<'a> Undo<'a> {
    fn new(registry: &'a DeviceRegistry) -> Self {
        Self {
            registry,
            chrdevs: Vec::new(),
            proc: None,
            kobject: None,
            armed: true,
        }
    }

    fn chrdev(&mut self, major: u32, name: &str) {
        self.chrdevs.push((major, name.to_string()));
    }

    fn proc(&mut self, name: &str) {
        self.proc = Some(name.to_string());
    }

    fn kobject(&mut self, path: String) {
        self.kobject = Some(path);
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Undo<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(path) = &self.kobject {
            let _ = self.registry.kobject_put(path);
        }
        if let Some(name) = &self.proc {
            let _ = self.registry.proc_remove(name);
        }
        for (major, name) in self.chrdevs.iter().rev() {
            let _ = self.registry.unregister_chrdev(*major, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ioctl::message as cmd;
    use regdev_core::traits::IoctlArg;

    fn quiet_config() -> DeviceConfig {
        DeviceConfig::new().log_ring(0)
    }

    #[test]
    fn test_dynamic_majors_count_down() {
        let reg = DeviceRegistry::new();
        let a = reg.register_chrdev(0, Arc::new(CounterDevice::with_name("a", 8))).unwrap();
        let b = reg.register_chrdev(0, Arc::new(CounterDevice::with_name("b", 8))).unwrap();
        assert_eq!((a, b), (254, 253));

        reg.unregister_chrdev(a, "a").unwrap();
        let c = reg.register_chrdev(0, Arc::new(CounterDevice::with_name("c", 8))).unwrap();
        assert_eq!(c, 254);
    }

    #[test]
    fn test_dynamic_range_exhausted() {
        let reg = DeviceRegistry::new();
        for i in DYNAMIC_MAJOR_LOW..=DYNAMIC_MAJOR_HIGH {
            reg.register_chrdev(0, Arc::new(CounterDevice::with_name(format!("d{}", i), 8)))
                .unwrap();
        }
        let res = reg.register_chrdev(0, Arc::new(CounterDevice::with_name("extra", 8)));
        assert_eq!(res, Err(RegError::NoMemory));
    }

    #[test]
    fn test_fixed_major_conflicts() {
        let reg = DeviceRegistry::new();
        assert_eq!(reg.register_chrdev(100, Arc::new(MessageDevice::new(80, 99))), Ok(100));
        assert!(matches!(
            reg.register_chrdev(100, Arc::new(ValueDevice::new(0))),
            Err(RegError::AlreadyRegistered(_))
        ));
        // Same name under another major
        assert!(matches!(
            reg.register_chrdev(101, Arc::new(MessageDevice::new(80, 99))),
            Err(RegError::AlreadyRegistered(_))
        ));
        assert!(matches!(
            reg.register_chrdev(MAX_MAJOR + 1, Arc::new(ValueDevice::new(0))),
            Err(RegError::AlreadyRegistered(_))
        ));
        // Name must match on unregister
        assert!(reg.unregister_chrdev(100, "ioctltest").is_err());
        assert!(reg.unregister_chrdev(100, "chardev2").is_ok());
        assert!(reg.devices().is_empty());
    }

    #[test]
    fn test_lookup_through_trait_object() {
        let reg = DeviceRegistry::new();
        let major = reg.register_chrdev(0, Arc::new(MessageDevice::new(80, 99))).unwrap();
        let (found, dev) = reg.chrdev_by_name("chardev2").unwrap();
        assert_eq!(found, major);

        let mut s = dev.open().unwrap();
        dev.write(&mut s, b"via registry").unwrap();
        let mut out = [0u8; 32];
        let n = dev.ioctl(&mut s, cmd::GET_MSG, IoctlArg::Out(&mut out)).unwrap();
        assert_eq!(&out[..n as usize], b"via registry");
        assert!(reg.chrdev(major).is_some());
    }

    #[test]
    fn test_proc_and_kobject() {
        let reg = DeviceRegistry::new();
        let entry = reg.proc_create(ProcEntry::new("helloworld")).unwrap();
        assert!(reg.proc_create(ProcEntry::new("helloworld")).is_err());
        assert!(Arc::ptr_eq(&reg.proc_lookup("helloworld").unwrap(), &entry));
        reg.proc_remove("helloworld").unwrap();
        assert!(reg.proc_remove("helloworld").is_err());

        let kobj = reg.kobject_create_and_add("mymodule", KERNEL_KOBJ).unwrap();
        assert!(reg.kobject_create_and_add("mymodule", KERNEL_KOBJ).is_err());
        assert!(reg.kobject("/sys/kernel/mymodule").is_some());
        assert_eq!(kobj.path(), "/sys/kernel/mymodule");
        reg.kobject_put("/sys/kernel/mymodule").unwrap();
        assert!(reg.kobject("/sys/kernel/mymodule").is_none());
    }

    #[test]
    fn test_build_default_set() {
        let registry = Arc::new(DeviceRegistry::new());
        {
            let set = RegistryBuilder::new(quiet_config())
                .registry(Arc::clone(&registry))
                .build()
                .unwrap();
            assert_eq!(set.counter_major, 254);
            assert_eq!(set.message_major, 100);
            assert_eq!(set.value_major, 253);
            assert_eq!(set.value.value(), 0xFF);

            let names: Vec<String> = registry.devices().into_iter().map(|(_, n)| n).collect();
            assert_eq!(names, vec!["chardev2", "ioctltest", "chardev"]);
            assert!(registry.proc_lookup("helloworld").is_some());

            let kobj = registry.kobject("/sys/kernel/mymodule").unwrap();
            kobj.attribute("myvariable").unwrap().store("42").unwrap();
            assert_eq!(set.attribute.get(), 42);
        }
        // Dropped: everything unregistered
        assert!(registry.devices().is_empty());
        assert!(registry.proc_lookup("helloworld").is_none());
        assert!(registry.kobject("/sys/kernel/mymodule").is_none());
    }

    #[test]
    fn test_failed_build_rolls_back() {
        let registry = Arc::new(DeviceRegistry::new());
        registry.proc_create(ProcEntry::new("helloworld")).unwrap();

        let res = RegistryBuilder::new(quiet_config())
            .registry(Arc::clone(&registry))
            .build();
        assert!(matches!(res, Err(RegError::AlreadyRegistered(_))));
        assert!(registry.devices().is_empty());
        // The pre-existing entry is untouched
        assert!(registry.proc_lookup("helloworld").is_some());
    }

    #[test]
    fn test_release_and_read_logged() {
        kprint::install_ring(1 << 16);
        let counter = CounterDevice::with_name("logcounter", 80);
        let entry = ProcEntry::new("logproc");

        let mut s = counter.open().unwrap();
        counter.release(&mut s);
        counter.release(&mut s);

        let mut p = entry.open().unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(entry.read(&mut p, &mut buf), Ok(13));
        assert_eq!(entry.read(&mut p, &mut buf), Ok(0));
        assert_eq!(entry.read(&mut p, &mut buf), Ok(0));

        let lines: Vec<String> = kprint::dmesg().into_iter().map(|r| r.line).collect();
        let count = |needle: &str| lines.iter().filter(|l| l.contains(needle)).count();
        assert_eq!(count("logcounter: release session"), 1);
        assert_eq!(count("procfile read logproc"), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let res = RegistryBuilder::new(quiet_config().buf_len(0)).build();
        assert!(matches!(res, Err(RegError::Unsupported)));
    }
}
