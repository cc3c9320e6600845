// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-handle behaviour: non-blocking acquire, release preconditions,
// close-while-locked, command dispatch and sector I/O.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rdlock::command::{IOC_ACQUIRE, IOC_RELEASE, IOC_TRY_ACQUIRE};
use rdlock::{Device, LockError, LockMode, ProcessId, SECTOR_SIZE};

fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn try_acquire_against_writer_would_block() {
    let dev = Device::with_memory("try_busy", 8).expect("device");
    let w = dev.open_as(ProcessId(1), LockMode::Write);
    w.acquire().expect("writer");

    for (pid, mode) in [(2, LockMode::Read), (3, LockMode::Write)] {
        let h = dev.open_as(ProcessId(pid), mode);
        let start = Instant::now();
        assert_eq!(h.try_acquire(), Err(LockError::WouldBlock));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(!h.is_locked());

        let snap = dev.snapshot();
        assert_eq!((snap.writers, snap.readers), (1, 0));
    }

    w.release().expect("release");
    let r = dev.open_as(ProcessId(2), LockMode::Read);
    r.try_acquire().expect("free device");
    assert!(r.is_locked());
}

#[test]
fn try_acquire_behind_a_waiter_does_not_jump_the_queue() {
    let dev = Device::with_memory("try_queue", 8).expect("device");
    let r0 = dev.open_as(ProcessId(1), LockMode::Read);
    r0.acquire().expect("r0");

    let d = Arc::clone(&dev);
    let writer = thread::spawn(move || {
        let w = d.open_as(ProcessId(2), LockMode::Write);
        w.acquire().expect("writer");
        w.release().expect("writer release");
    });
    wait_until("writer ticket", || dev.snapshot().ticket_head == 2);

    // Compatible with the current reader, but not its turn.
    let r = dev.open_as(ProcessId(3), LockMode::Read);
    assert_eq!(r.try_acquire(), Err(LockError::WouldBlock));
    let snap = dev.snapshot();
    assert_eq!(snap.ticket_tail, 1);
    assert_eq!(snap.invalid_tickets, 1);

    r0.release().expect("r0 release");
    writer.join().unwrap();
    assert!(dev.snapshot().is_idle());
}

#[test]
fn release_without_lock_is_not_held() {
    let dev = Device::with_memory("not_held", 8).expect("device");
    let other = dev.open_as(ProcessId(1), LockMode::Read);
    other.acquire().expect("reader");
    let before = dev.snapshot();

    let h = dev.open_as(ProcessId(2), LockMode::Read);
    assert_eq!(h.release(), Err(LockError::NotHeld));
    assert_eq!(dev.snapshot(), before);

    // The same pid holding through a different handle changes nothing.
    let again = dev.open_as(ProcessId(1), LockMode::Read);
    assert_eq!(again.release(), Err(LockError::NotHeld));
    assert_eq!(dev.snapshot(), before);
    assert!(dev.is_held_by(LockMode::Read, ProcessId(1)));

    other.release().expect("release");
    assert_eq!(other.release(), Err(LockError::NotHeld));
    assert!(dev.snapshot().is_idle());
}

#[test]
fn closing_a_locked_handle_releases_it() {
    let dev = Device::with_memory("close", 8).expect("device");
    let w = dev.open_as(ProcessId(1), LockMode::Write);
    w.acquire().expect("writer");

    let d = Arc::clone(&dev);
    let waiter = thread::spawn(move || {
        let h = d.open_as(ProcessId(2), LockMode::Write);
        h.acquire().expect("granted after close");
    });
    wait_until("waiter ticket", || dev.snapshot().ticket_head == 2);

    drop(w);
    waiter.join().unwrap();

    let snap = dev.snapshot();
    assert!(snap.is_idle());
    assert!(!dev.is_held_by(LockMode::Write, ProcessId(1)));
}

#[test]
fn closing_an_unlocked_handle_is_silent() {
    let dev = Device::with_memory("close_idle", 8).expect("device");
    let before = dev.snapshot();
    drop(dev.open_as(ProcessId(1), LockMode::Write));
    assert_eq!(dev.snapshot(), before);
}

#[test]
fn ioctl_dispatch() {
    let dev = Device::with_memory("ioctl", 8).expect("device");
    let h = dev.open_as(ProcessId(1), LockMode::Write);
    h.ioctl(IOC_ACQUIRE).expect("acquire");
    assert!(h.is_locked());
    h.ioctl(IOC_RELEASE).expect("release");
    h.ioctl(IOC_TRY_ACQUIRE).expect("try acquire");
    h.ioctl(IOC_RELEASE).expect("release");
    assert_eq!(h.ioctl(IOC_RELEASE), Err(LockError::NotHeld));

    let before = dev.snapshot();
    let err = h.ioctl(0x1234).unwrap_err();
    assert_eq!(err, LockError::UnknownOperation(0x1234));
    assert_eq!(err.errno(), libc::ENOTTY);
    assert_eq!(dev.snapshot(), before);
}

#[test]
fn sector_io_is_independent_of_lock() {
    let dev = Device::with_memory("io", 4).expect("device");
    assert_eq!(dev.capacity(), 4);

    let w = dev.open_as(ProcessId(1), LockMode::Write);
    let r = dev.open_as(ProcessId(2), LockMode::Read);

    let block = vec![0x5au8; SECTOR_SIZE * 2];
    w.write_sectors(2, &block).expect("write");

    let mut buf = vec![0u8; SECTOR_SIZE * 2];
    r.read_sectors(2, &mut buf).expect("read");
    assert_eq!(buf, block);

    let mut first = vec![0xffu8; SECTOR_SIZE];
    r.read_sectors(0, &mut first).expect("read untouched");
    assert!(first.iter().all(|&b| b == 0));
    assert!(dev.snapshot().is_idle());
}

#[test]
fn sector_io_rejects_bad_requests() {
    let dev = Device::with_memory("io_bad", 4).expect("device");
    let w = dev.open_as(ProcessId(1), LockMode::Write);
    let r = dev.open_as(ProcessId(2), LockMode::Read);

    let err = r.write_sectors(0, &[0u8; SECTOR_SIZE]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);

    let err = w.write_sectors(3, &[0u8; SECTOR_SIZE * 2]).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

    let mut odd = [0u8; 100];
    let err = r.read_sectors(0, &mut odd).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

    let mut buf = [0u8; SECTOR_SIZE];
    let err = r.read_sectors(u64::MAX, &mut buf).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
}
