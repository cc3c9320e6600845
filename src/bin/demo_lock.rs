// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Demo: one writer and two readers contend for the first device.
//
// Usage:
//   RUST_LOG=debug cargo run --bin demo_lock
//
// The writer locks first; both readers queue behind it and are granted
// together once it releases. RDLOCK_DEVICES / RDLOCK_NSECTORS size the
// device set.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::info;
use rdlock::{DeviceConfig, DeviceRegistry, LockMode, ProcessId, SECTOR_SIZE};

fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = DeviceConfig::from_env()?;
    let registry = DeviceRegistry::new(&config)?;
    let dev = registry
        .get(0)
        .map(Arc::clone)
        .ok_or_else(|| std::io::Error::other("no devices configured"))?;
    info!("using {} ({} sectors)", dev.name(), dev.capacity());

    let writer = dev.open_as(ProcessId(1), LockMode::Write);
    writer.acquire()?;
    writer.write_sectors(0, &[b'w'; SECTOR_SIZE])?;
    info!("writer holds {}", dev.name());

    let readers: Vec<_> = [2u32, 3]
        .into_iter()
        .map(|pid| {
            let dev = Arc::clone(&dev);
            thread::spawn(move || -> std::io::Result<()> {
                let h = dev.open_as(ProcessId(pid), LockMode::Read);
                h.acquire()?;
                let mut buf = [0u8; SECTOR_SIZE];
                h.read_sectors(0, &mut buf)?;
                info!(
                    "reader {pid} granted, sector 0 starts with {:?} ({:?})",
                    buf[0] as char,
                    dev.snapshot()
                );
                thread::sleep(Duration::from_millis(50));
                h.release()?;
                Ok(())
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    info!("releasing writer ({:?})", dev.snapshot());
    writer.release()?;

    for r in readers {
        r.join()
            .map_err(|_| std::io::Error::other("reader thread panicked"))??;
    }

    info!("final state {:?}", dev.snapshot());
    registry.teardown();
    Ok(())
}
