//! Pid-namespace depth of a process.
//!
//! Level 0 is the initial namespace. On Linux the depth comes from the
//! `NSpid` line of `/proc/<pid>/status`, which lists one pid per
//! namespace from the outermost inwards.

use regdev_core::error::{RegError, RegResult};
use regdev_core::kinfo;

pub const MODULE_NAME: &str = "pid_info";

/// Namespace level from a `status` file body
///
/// `None` if the text has no `NSpid` line or the line is empty.
pub fn parse_nspid_level(status: &str) -> Option<u32> {
    let line = status.lines().find(|l| l.starts_with("NSpid:"))?;
    let count = line["NSpid:".len()..].split_whitespace().count();
    let count = u32::try_from(count).ok()?;
    count.checked_sub(1)
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub fn pid_level(pid: i32) -> RegResult<u32> {
            if pid <= 0 {
                return Err(RegError::NoSuchProcess(pid));
            }
            let status = std::fs::read_to_string(format!("/proc/{}/status", pid))
                .map_err(|_| RegError::NoSuchProcess(pid))?;
            // Kernels without NSpid have no nested namespaces to report
            Ok(parse_nspid_level(&status).unwrap_or(0))
        }
    } else {
        pub fn pid_level(pid: i32) -> RegResult<u32> {
            if pid <= 0 {
                return Err(RegError::NoSuchProcess(pid));
            }
            Err(RegError::Unsupported)
        }
    }
}

/// Look up `pid` and log the outcome
pub fn report(pid: i32) -> RegResult<u32> {
    let res = pid_level(pid);
    match &res {
        Ok(level) => kinfo!("{}: vpid->level: {}", MODULE_NAME, level),
        Err(_) => kinfo!("{}: find_vpid({}) failed.", MODULE_NAME, pid),
    }
    res
}
