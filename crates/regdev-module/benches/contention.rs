//! Lock and control-path costs, uncontended and under contention.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use regdev_core::{CharDevice, ExclusiveFlag, IoctlArg, RwSpinLock};
use regdev_module::ioctl::message as cmd;
use regdev_module::MessageDevice;

fn exclusive_flag(c: &mut Criterion) {
    let flag = ExclusiveFlag::new();
    c.bench_function("exclusive_flag/acquire_release", |b| {
        b.iter(|| {
            let guard = flag.try_acquire();
            black_box(&guard);
        })
    });
}

fn rw_lock(c: &mut Criterion) {
    let lock = Arc::new(RwSpinLock::new(0u8));
    c.bench_function("rw_lock/read_uncontended", |b| b.iter(|| black_box(*lock.read())));

    // Background writer keeps the lock busy while readers are timed
    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let lock = Arc::clone(&lock);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut v = 0u8;
            while !stop.load(Ordering::Relaxed) {
                v = v.wrapping_add(1);
                *lock.write() = v;
            }
        })
    };
    c.bench_function("rw_lock/read_with_writer", |b| b.iter(|| black_box(*lock.read())));
    stop.store(true, Ordering::Relaxed);
    let _ = writer.join();
}

fn message_control(c: &mut Criterion) {
    let dev = MessageDevice::new(80, 99);
    let mut session = match dev.open() {
        Ok(s) => s,
        Err(e) => panic!("open failed: {}", e),
    };
    let mut out = [0u8; 128];

    c.bench_function("message/set_scalar", |b| {
        b.iter(|| black_box(dev.ioctl(&mut session, cmd::SET_SCALAR, IoctlArg::Value(7))))
    });
    c.bench_function("message/get_msg", |b| {
        b.iter(|| black_box(dev.ioctl(&mut session, cmd::GET_MSG, IoctlArg::Out(&mut out))))
    });
}

criterion_group!(benches, exclusive_flag, rw_lock, message_control);
criterion_main!(benches);
