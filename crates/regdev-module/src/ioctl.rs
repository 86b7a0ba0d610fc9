//! Control command numbers.
//!
//! Encoded with the host's `_IOC` layout so the numbers match what a C
//! header built with `_IOW`/`_IOR`/`_IOWR` would produce. On unix the
//! encoding comes from `nix`; elsewhere the asm-generic layout is spelled
//! out by hand.

use core::mem::size_of;

use libc::{c_char, c_int};
use regdev_core::constants::MESSAGE_MAJOR;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        const fn iow(ty: u8, nr: u8, size: usize) -> u32 {
            nix::request_code_write!(ty, nr, size) as u32
        }

        const fn ior(ty: u8, nr: u8, size: usize) -> u32 {
            nix::request_code_read!(ty, nr, size) as u32
        }

        const fn iowr(ty: u8, nr: u8, size: usize) -> u32 {
            nix::request_code_readwrite!(ty, nr, size) as u32
        }
    } else {
        // asm-generic/ioctl.h: dir(2) | size(14) | type(8) | nr(8)
        const IOC_WRITE: u32 = 1;
        const IOC_READ: u32 = 2;

        const fn ioc(dir: u32, ty: u8, nr: u8, size: usize) -> u32 {
            (dir << 30) | (((size as u32) & 0x3fff) << 16) | ((ty as u32) << 8) | nr as u32
        }

        const fn iow(ty: u8, nr: u8, size: usize) -> u32 {
            ioc(IOC_WRITE, ty, nr, size)
        }

        const fn ior(ty: u8, nr: u8, size: usize) -> u32 {
            ioc(IOC_READ, ty, nr, size)
        }

        const fn iowr(ty: u8, nr: u8, size: usize) -> u32 {
            ioc(IOC_READ | IOC_WRITE, ty, nr, size)
        }
    }
}

/// Commands of the message device. The type byte is its major number.
pub mod message {
    use super::*;

    const TY: u8 = MESSAGE_MAJOR as u8;

    /// Store a zero-terminated message
    pub const SET_MSG: u32 = iow(TY, 0, size_of::<*const c_char>());
    /// Copy the message out, zero-terminated
    pub const GET_MSG: u32 = ior(TY, 1, size_of::<*const c_char>());
    /// Return the byte at an index
    pub const GET_NTH_BYTE: u32 = iowr(TY, 2, size_of::<c_int>());
    /// Overwrite the scalar
    pub const SET_SCALAR: u32 = iow(TY, 3, size_of::<c_int>());
    /// Read the scalar back
    pub const GET_SCALAR: u32 = ior(TY, 4, size_of::<c_int>());
}

/// Argument block of VALSET / VALGET
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValArg {
    pub val: u32,
}

impl ValArg {
    pub const SIZE: usize = size_of::<ValArg>();

    pub fn to_bytes(self) -> [u8; 4] {
        self.val.to_ne_bytes()
    }

    /// Decode from the first `SIZE` bytes; `None` if `bytes` is shorter
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = bytes.get(..Self::SIZE)?.try_into().ok()?;
        Some(ValArg {
            val: u32::from_ne_bytes(raw),
        })
    }
}

/// Commands of the value device
pub mod value {
    use super::*;

    pub const MAGIC: u8 = 0x66;

    pub const VALSET: u32 = iow(MAGIC, 0, ValArg::SIZE);
    pub const VALGET: u32 = ior(MAGIC, 1, ValArg::SIZE);
    pub const VALGET_NUM: u32 = ior(MAGIC, 2, size_of::<c_int>());
    pub const VALSET_NUM: u32 = iow(MAGIC, 3, size_of::<c_int>());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_commands_distinct() {
        let cmds = [
            message::SET_MSG,
            message::GET_MSG,
            message::GET_NTH_BYTE,
            message::SET_SCALAR,
            message::GET_SCALAR,
        ];
        for (i, a) in cmds.iter().enumerate() {
            for b in &cmds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_type_and_nr_fields() {
        // type byte and command number sit in the low 16 bits on every layout
        assert_eq!(message::GET_NTH_BYTE & 0xffff, (100 << 8) | 2);
        assert_eq!(value::VALSET_NUM & 0xffff, (0x66 << 8) | 3);
    }

    #[cfg(all(
        target_os = "linux",
        any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "riscv64")
    ))]
    #[test]
    fn test_linux_layout() {
        // _IOW('f', 3, int) with a 4-byte int
        assert_eq!(value::VALSET_NUM, 0x4004_6603);
        // _IOR('f', 1, struct { unsigned int })
        assert_eq!(value::VALGET, 0x8004_6601);
    }

    #[test]
    fn test_valarg_bytes() {
        let arg = ValArg { val: 0xAB };
        assert_eq!(ValArg::from_bytes(&arg.to_bytes()), Some(arg));
        assert_eq!(ValArg::from_bytes(&[1, 2]), None);
    }
}
