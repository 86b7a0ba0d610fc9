//! regdev End-to-End Smoke Test
//!
//! Loads the default device set and drives each device through its
//! public contract:
//!   Part A: chardev: exclusive open, greeting counter, refused writes
//!   Part B: chardev2: drain/restart reads, control commands, contention
//!   Part C: ioctltest: value and num commands under the rw lock
//!   Part D: proc entry, sysfs attribute, pid level
//!   Part E: registry numbering, errno mapping, message ring
//!
//! Run: cargo run -p regdev-smoke

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;

use regdev::ioctl::{message as mcmd, value as vcmd};
use regdev::{
    dmesg, errno, pid_info, read_to_end, to_ret, CharDevice, CounterDevice, DeviceConfig,
    DeviceSet, IoctlArg, RegError, ValArg,
};

// ── Test harness ──

struct TestRunner {
    total: usize,
    passed: usize,
    failed: usize,
}

const LINE: &str = "────────────────────────────────────────────────────────────";

impl TestRunner {
    fn new() -> Self {
        Self { total: 0, passed: 0, failed: 0 }
    }

    fn section(&self, name: &str) {
        println!("\n{}", LINE);
        println!("  {}", name);
        println!("{}", LINE);
    }

    fn pass(&mut self, name: &str) {
        self.total += 1;
        self.passed += 1;
        println!("  [{:2}] {:<52} PASS", self.total, name);
    }

    fn fail(&mut self, name: &str, reason: &str) {
        self.total += 1;
        self.failed += 1;
        println!("  [{:2}] {:<52} FAIL: {}", self.total, name, reason);
    }

    fn check(&mut self, name: &str, ok: bool, reason: &str) {
        if ok { self.pass(name); } else { self.fail(name, reason); }
    }

    fn summary(&self) {
        println!("\n{}", LINE);
        println!(
            "  Total: {}  Passed: {}  Failed: {}",
            self.total, self.passed, self.failed
        );
        println!("{}", LINE);
    }
}

// ════════════════════════════════════════════════════════════
// Part A: chardev
// ════════════════════════════════════════════════════════════

fn test_counter(t: &mut TestRunner, dev: &CounterDevice) {
    t.section("Part A: chardev (exclusive, read-only)");

    let mut first = match dev.open() {
        Ok(s) => { t.pass("open chardev"); s }
        Err(e) => { t.fail("open chardev", &e.to_string()); return; }
    };

    let text = read_to_end(dev, &mut first).unwrap_or_default();
    t.check("greeting counts 0 opens",
        text == b"I already told you 0 times Hello world!\n",
        &String::from_utf8_lossy(&text));

    let second = dev.open();
    t.check("second open -> Busy", matches!(second, Err(RegError::Busy)),
        &format!("{:?}", second.err()));

    let w = dev.write(&mut first, b"nope");
    t.check("write -> Unsupported", w == Err(RegError::Unsupported), &format!("{:?}", w));

    dev.release(&mut first);
    dev.release(&mut first);
    t.check("double release is harmless", !dev.is_busy(), "device still busy");

    match dev.open() {
        Ok(mut s) => {
            let text = read_to_end(dev, &mut s).unwrap_or_default();
            t.check("reopen counts 1 open",
                text == b"I already told you 1 times Hello world!\n",
                &String::from_utf8_lossy(&text));
            dev.release(&mut s);
        }
        Err(e) => t.fail("reopen after release", &e.to_string()),
    }
}

// ════════════════════════════════════════════════════════════
// Part B: chardev2
// ════════════════════════════════════════════════════════════

fn test_message(t: &mut TestRunner, set: &DeviceSet) {
    t.section("Part B: chardev2 (read/write + control)");
    let dev = set.message.as_ref();

    let mut s = match dev.open() {
        Ok(s) => { t.pass("open chardev2"); s }
        Err(e) => { t.fail("open chardev2", &e.to_string()); return; }
    };

    // write("hi"), read(5) x3
    let w = dev.write(&mut s, b"hi");
    t.check("write(\"hi\") -> 2", w == Ok(2), &format!("{:?}", w));
    let mut buf = [0u8; 5];
    let r1 = dev.read(&mut s, &mut buf);
    t.check("read(5) -> \"hi\"", r1 == Ok(2) && &buf[..2] == b"hi", &format!("{:?}", r1));
    let r2 = dev.read(&mut s, &mut buf);
    t.check("read(5) -> 0 (end, cursor reset)", r2 == Ok(0), &format!("{:?}", r2));
    let r3 = dev.read(&mut s, &mut buf);
    t.check("read(5) -> \"hi\" again", r3 == Ok(2) && &buf[..2] == b"hi", &format!("{:?}", r3));

    // Long write is clamped, GET_MSG capped
    let long = [b'a'; 200];
    let w = dev.write(&mut s, &long);
    t.check("write(200) clamps to 80", w == Ok(80), &format!("{:?}", w));
    let mut out = [0xFFu8; 128];
    let g = dev.ioctl(&mut s, mcmd::GET_MSG, IoctlArg::Out(&mut out));
    t.check("GET_MSG -> 80 bytes + NUL", g == Ok(80) && out[80] == 0, &format!("{:?}", g));

    let sm = dev.ioctl(&mut s, mcmd::SET_MSG, IoctlArg::In(b"from ioctl\0tail"));
    t.check("SET_MSG stops at NUL", sm == Ok(10), &format!("{:?}", sm));
    let text = read_to_end(dev, &mut s).unwrap_or_default();
    t.check("read sees SET_MSG text", text == b"from ioctl", &String::from_utf8_lossy(&text));

    let b = dev.ioctl(&mut s, mcmd::GET_NTH_BYTE, IoctlArg::Value(5));
    t.check("GET_NTH_BYTE(5) -> 'i'", b == Ok(i64::from(b'i')), &format!("{:?}", b));
    let b = dev.ioctl(&mut s, mcmd::GET_NTH_BYTE, IoctlArg::Value(80));
    t.check("GET_NTH_BYTE(80) -> OutOfRange",
        matches!(b, Err(RegError::OutOfRange { .. })), &format!("{:?}", b));

    let _ = dev.ioctl(&mut s, mcmd::SET_SCALAR, IoctlArg::Value(1234));
    let mut raw = [0u8; 4];
    let g = dev.ioctl(&mut s, mcmd::GET_SCALAR, IoctlArg::Out(&mut raw));
    t.check("SET_SCALAR/GET_SCALAR round trip",
        g == Ok(1234) && i32::from_ne_bytes(raw) == 1234, &format!("{:?}", g));

    let bad = dev.ioctl(&mut s, 0xBAD, IoctlArg::None);
    t.check("unknown command -> InvalidCommand",
        bad == Err(RegError::InvalidCommand(0xBAD)), &format!("{:?}", bad));
    t.check("control flag released after errors", !dev.control_busy(), "flag still held");

    // Contention: every control call either completes or reports Busy
    let threads = 4;
    let ok = AtomicUsize::new(0);
    let busy = AtomicUsize::new(0);
    let other = AtomicUsize::new(0);
    let barrier = Barrier::new(threads);
    std::thread::scope(|scope| {
        for i in 0..threads {
            let (ok, busy, other, barrier) = (&ok, &busy, &other, &barrier);
            scope.spawn(move || {
                let mut s = match dev.open() {
                    Ok(s) => s,
                    Err(_) => { other.fetch_add(1, Ordering::Relaxed); return; }
                };
                barrier.wait();
                for _ in 0..2000 {
                    match dev.ioctl(&mut s, mcmd::SET_SCALAR, IoctlArg::Value(i as u64)) {
                        Ok(_) => ok.fetch_add(1, Ordering::Relaxed),
                        Err(RegError::Busy) => busy.fetch_add(1, Ordering::Relaxed),
                        Err(_) => other.fetch_add(1, Ordering::Relaxed),
                    };
                }
                dev.release(&mut s);
            });
        }
    });
    let (ok, busy, other) = (ok.into_inner(), busy.into_inner(), other.into_inner());
    t.check(&format!("contended control: {} ok, {} busy", ok, busy),
        ok > 0 && other == 0 && ok + busy == threads * 2000,
        &format!("{} unexpected errors", other));

    dev.release(&mut s);
    t.check("all sessions released", dev.open_sessions() == 0,
        &format!("{} still open", dev.open_sessions()));
}

// ════════════════════════════════════════════════════════════
// Part C: ioctltest
// ════════════════════════════════════════════════════════════

fn test_value(t: &mut TestRunner, set: &DeviceSet) {
    t.section("Part C: ioctltest (reader/writer lock)");
    let dev = set.value.as_ref();

    let mut s = match dev.open() {
        Ok(s) => { t.pass("open ioctltest"); s }
        Err(e) => { t.fail("open ioctltest", &e.to_string()); return; }
    };

    let mut buf = [0u8; 8];
    let r = dev.read(&mut s, &mut buf);
    t.check("read fills buffer with 0xFF", r == Ok(8) && buf == [0xFF; 8], &format!("{:?}", buf));

    let arg = ValArg { val: 0x5A }.to_bytes();
    let set_r = dev.ioctl(&mut s, vcmd::VALSET, IoctlArg::In(&arg));
    let mut out = [0u8; 4];
    let get_r = dev.ioctl(&mut s, vcmd::VALGET, IoctlArg::Out(&mut out));
    t.check("VALSET/VALGET 0x5A",
        set_r.is_ok() && get_r.is_ok() && ValArg::from_bytes(&out) == Some(ValArg { val: 0x5A }),
        &format!("{:?} {:?}", set_r, out));

    let _ = dev.ioctl(&mut s, vcmd::VALSET_NUM, IoctlArg::Value(99));
    let mut out = [0u8; 4];
    let _ = dev.ioctl(&mut s, vcmd::VALGET_NUM, IoctlArg::Out(&mut out));
    t.check("VALSET_NUM/VALGET_NUM 99", i32::from_ne_bytes(out) == 99,
        &format!("{}", i32::from_ne_bytes(out)));

    let short = dev.ioctl(&mut s, vcmd::VALSET, IoctlArg::In(&[1]));
    t.check("short VALSET buffer -> Fault", short == Err(RegError::Fault), &format!("{:?}", short));
    t.check("value unchanged after Fault", dev.value() == 0x5A, &format!("{:#x}", dev.value()));

    let bad = dev.ioctl(&mut s, 0x1, IoctlArg::None);
    t.check("unknown command -> -ENOTTY", to_ret(bad) == -(libc::ENOTTY as i64),
        "wrong errno");

    dev.release(&mut s);
}

// ════════════════════════════════════════════════════════════
// Part D: proc, sysfs, pid
// ════════════════════════════════════════════════════════════

fn test_nodes(t: &mut TestRunner, set: &DeviceSet) {
    t.section("Part D: /proc, /sys/kernel, pid_info");

    let entry = set.proc_entry.as_ref();
    match entry.open() {
        Ok(mut s) => {
            let text = read_to_end(entry, &mut s).unwrap_or_default();
            t.check(&format!("read {}", entry.path()), text == b"HelloWorld!\n\0",
                &String::from_utf8_lossy(&text));
            let mut buf = [0u8; 4];
            t.check("read past end stays 0", entry.read(&mut s, &mut buf) == Ok(0), "non-zero");
        }
        Err(e) => t.fail("open proc entry", &e.to_string()),
    }

    let path = format!("{}/{}", set.kobject.path(), set.attribute.name());
    let attr = set.attribute.as_ref();
    t.check(&format!("{} shows 0", path), attr.show() == "0\n", &attr.show());
    let n = attr.store("42\n");
    t.check("store \"42\" consumes 3 bytes", n == Ok(3), &format!("{:?}", n));
    t.check("show -> \"42\"", attr.show() == "42\n", &attr.show());
    let _ = attr.store("junk");
    t.check("unparseable store keeps value", attr.get() == 42, &attr.show());

    let pid = std::process::id() as i32;
    let level = pid_info::report(pid);
    if cfg!(target_os = "linux") {
        t.check(&format!("pid_level({})", pid), level.is_ok(), &format!("{:?}", level));
    } else {
        t.check("pid_level unsupported here", level == Err(RegError::Unsupported),
            &format!("{:?}", level));
    }
    let missing = pid_info::pid_level(-1);
    t.check("pid_level(-1) -> NoSuchProcess", missing == Err(RegError::NoSuchProcess(-1)),
        &format!("{:?}", missing));
}

// ════════════════════════════════════════════════════════════
// Part E: registry, errno, ring
// ════════════════════════════════════════════════════════════

fn test_registry(t: &mut TestRunner, set: &DeviceSet) {
    t.section("Part E: registry, errno, message ring");

    for (major, name) in set.registry.devices() {
        println!("       major {:3}  {}", major, name);
    }
    t.check("chardev2 on major 100", set.message_major == 100,
        &format!("{}", set.message_major));
    t.check("dynamic majors count down from 254",
        set.counter_major == 254 && set.value_major == 253,
        &format!("{} {}", set.counter_major, set.value_major));

    let looked_up = set.registry.chrdev_by_name("ioctltest").map(|(m, _)| m);
    t.check("lookup ioctltest by name", looked_up == Some(set.value_major),
        &format!("{:?}", looked_up));

    let dup = set.registry.register_chrdev(100, std::sync::Arc::new(CounterDevice::with_name("dup", 8)));
    t.check("fixed major conflict -> -EBUSY", to_ret(dup) == -(libc::EBUSY as i64),
        "wrong errno");
    t.check("Busy maps to EBUSY", errno(&RegError::Busy) == libc::EBUSY, "wrong errno");

    let records = dmesg();
    let assigned = records.iter().any(|r| r.line.contains("I was assigned major number"));
    t.check(&format!("message ring captured {} lines", records.len()), assigned,
        "no registration lines");
}

// ════════════════════════════════════════════════════════════

fn main() {
    println!("=== regdev End-to-End Smoke Test ===");

    let config = DeviceConfig::default();
    if let Err(e) = config.validate() {
        println!("\nFATAL: {}", e);
        std::process::exit(1);
    }
    config.print();

    let mut t = TestRunner::new();

    let set = match regdev::load(config) {
        Ok(set) => set,
        Err(e) => {
            println!("\nFATAL: loading devices failed: {}", e);
            t.summary();
            std::process::exit(1);
        }
    };

    test_counter(&mut t, &set.counter);
    test_message(&mut t, &set);
    test_value(&mut t, &set);
    test_nodes(&mut t, &set);
    test_registry(&mut t, &set);

    drop(set);

    t.summary();
    std::process::exit(if t.failed > 0 { 1 } else { 0 });
}
