//! Environment variable helpers used by device configuration
//!
//! ```ignore
//! use regdev_core::env::{env_get, env_get_bool};
//!
//! let buf_len: usize = env_get("REGDEV_BUF_LEN", 80);
//! let flush = env_get_bool("REGDEV_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;

/// Parse `key` as `T`, falling back to `default` when unset or malformed
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Parse `key` as `T` if set and well-formed
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Boolean flag: "1", "true", "yes", "on" (any case) are true.
///
/// Any other set value is false; unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Raw string value or `default`
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; tests run in parallel.

    #[test]
    fn test_unset_defaults() {
        let n: usize = env_get("__REGDEV_TEST_UNSET__", 80);
        assert_eq!(n, 80);
        assert!(env_get_bool("__REGDEV_TEST_UNSET__", true));
        assert_eq!(env_get_opt::<u32>("__REGDEV_TEST_UNSET__"), None);
        assert_eq!(env_get_str("__REGDEV_TEST_UNSET__", "chardev"), "chardev");
    }

    #[test]
    fn test_parse_with_whitespace() {
        std::env::set_var("__REGDEV_TEST_NUM__", " 123 ");
        let n: usize = env_get("__REGDEV_TEST_NUM__", 0);
        assert_eq!(n, 123);
        std::env::remove_var("__REGDEV_TEST_NUM__");
    }

    #[test]
    fn test_malformed_falls_back() {
        std::env::set_var("__REGDEV_TEST_BAD__", "eighty");
        let n: usize = env_get("__REGDEV_TEST_BAD__", 80);
        assert_eq!(n, 80);
        std::env::remove_var("__REGDEV_TEST_BAD__");
    }

    #[test]
    fn test_bool_variants() {
        for v in ["1", "true", "YES", "On"] {
            std::env::set_var("__REGDEV_TEST_BOOL__", v);
            assert!(env_get_bool("__REGDEV_TEST_BOOL__", false), "{}", v);
        }
        for v in ["0", "false", "garbage"] {
            std::env::set_var("__REGDEV_TEST_BOOL__", v);
            assert!(!env_get_bool("__REGDEV_TEST_BOOL__", true), "{}", v);
        }
        std::env::remove_var("__REGDEV_TEST_BOOL__");
    }
}
