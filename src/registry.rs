// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Owner of a set of devices.
// Devices exist from registry creation until teardown; there is no
// process-wide default set.

use std::io;
use std::sync::Arc;

use log::info;

use crate::config::DeviceConfig;
use crate::device::Device;
use crate::handle::DeviceHandle;
use crate::mode::LockMode;

pub struct DeviceRegistry {
    devices: Vec<Arc<Device>>,
}

impl DeviceRegistry {
    /// Create every device described by `config`, each with empty lock
    /// state and zeroed storage.
    pub fn new(config: &DeviceConfig) -> io::Result<Self> {
        config.validate()?;
        let devices = (0..config.device_count)
            .map(|i| Device::with_memory(config.device_name(i), config.nsectors))
            .collect::<io::Result<Vec<_>>>()?;
        info!(
            "created {} device(s) of {} sectors",
            devices.len(),
            config.nsectors
        );
        Ok(Self { devices })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Device>> {
        self.devices.get(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Device>> {
        self.devices.iter().find(|d| d.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.iter()
    }

    /// Open the named device for the calling process.
    pub fn open(&self, name: &str, mode: LockMode) -> io::Result<DeviceHandle> {
        self.by_name(name).map(|d| d.open(mode)).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no device named {name}"))
        })
    }

    /// Shut every device down, waking all blocked waiters.
    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        for dev in &self.devices {
            dev.shutdown();
        }
        info!("tore down {} device(s)", self.devices.len());
    }
}
