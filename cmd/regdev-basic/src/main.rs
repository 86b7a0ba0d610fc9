//! Basic regdev example
//!
//! Loads the default devices and walks through the chardev scenarios:
//! a greeting that counts opens, a rejected second open, and the
//! write/read/restart cycle of the message device.
//!
//! # Environment Variables
//!
//! - `REGDEV_FLUSH_EPRINT=1` - Flush log output immediately
//! - `REGDEV_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `REGDEV_BUF_LEN=16` - Shrink the register to see truncation

use regdev::ioctl::message as cmd;
use regdev::{kinfo, read_to_end, CharDevice, DeviceConfig, IoctlArg, RegResult};

// REGDEV_LOG_LEVEL=debug cargo run -p regdev-basic
fn main() {
    println!("=== regdev Basic Example ===\n");

    if let Err(e) = run() {
        eprintln!("basic: {}", e);
        std::process::exit(1);
    }
}

fn run() -> RegResult<()> {
    let set = regdev::load(DeviceConfig::default())?;

    for (major, name) in set.registry.devices() {
        println!("/dev/{:<10} major {}", name, major);
    }

    // chardev: one reader at a time, greeting counts opens
    let counter = set.counter.as_ref();
    for _ in 0..3 {
        let mut s = counter.open()?;
        let text = read_to_end(counter, &mut s)?;
        print!("cat /dev/chardev: {}", String::from_utf8_lossy(&text));

        match counter.open() {
            Err(e) => println!("  concurrent open: {}", e),
            Ok(_) => println!("  concurrent open unexpectedly succeeded"),
        }
        counter.release(&mut s);
    }

    // chardev2: write, drain, restart
    let message = set.message.as_ref();
    let mut s = message.open()?;
    message.write(&mut s, b"hi")?;

    let mut buf = [0u8; 5];
    for round in 1..=3 {
        let n = message.read(&mut s, &mut buf)?;
        println!("read #{} -> {} bytes {:?}", round, n, String::from_utf8_lossy(&buf[..n]));
    }

    message.ioctl(&mut s, cmd::SET_MSG, IoctlArg::In(b"Message passed by ioctl\0"))?;
    let mut out = [0u8; 100];
    let n = message.ioctl(&mut s, cmd::GET_MSG, IoctlArg::Out(&mut out))? as usize;
    println!("get_msg message: {}", String::from_utf8_lossy(&out[..n]));

    let first = message.ioctl(&mut s, cmd::GET_NTH_BYTE, IoctlArg::Value(0))?;
    println!("get_nth_byte(0): {:?}", char::from(first as u8));

    message.ioctl(&mut s, cmd::SET_SCALAR, IoctlArg::Value(42))?;
    kinfo!("scalar is now {}", message.scalar());
    message.release(&mut s);

    println!("\n/sys/kernel/{}/myvariable: {}", set.kobject.name(), set.attribute.show().trim_end());
    println!("\n=== Done ===");
    Ok(())
}
