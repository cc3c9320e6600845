// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Device set configuration.
// Defaults describe four 32-sector disks named osprda..osprdd; the
// RDLOCK_DEVICES and RDLOCK_NSECTORS environment variables override them.

use std::io;

use crate::backend::SECTOR_SIZE;

/// Environment override for [`DeviceConfig::device_count`].
pub const ENV_DEVICES: &str = "RDLOCK_DEVICES";
/// Environment override for [`DeviceConfig::nsectors`].
pub const ENV_NSECTORS: &str = "RDLOCK_NSECTORS";

/// Devices are suffixed `a`, `b`, ... so at most 26 can be named.
pub const MAX_DEVICES: usize = 26;

/// Largest in-memory disk, in bytes (1 GiB).
pub const MAX_DEVICE_BYTES: u64 = 1 << 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// How many devices to create.
    pub device_count: usize,
    /// Sectors per device.
    pub nsectors: u64,
    /// Device name stem; the index letter is appended.
    pub name_prefix: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_count: 4,
            nsectors: 32,
            name_prefix: "osprd".to_string(),
        }
    }
}

impl DeviceConfig {
    /// Defaults, overridden by any environment variables that are set.
    pub fn from_env() -> io::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults, overridden by whatever `lookup` returns for each key.
    pub fn from_lookup<F>(lookup: F) -> io::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_DEVICES) {
            cfg.device_count = parse_var(ENV_DEVICES, &v)?;
        }
        if let Some(v) = lookup(ENV_NSECTORS) {
            cfg.nsectors = parse_var(ENV_NSECTORS, &v)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> io::Result<()> {
        if self.device_count == 0 || self.device_count > MAX_DEVICES {
            return Err(invalid(format!(
                "device count {} outside 1..={MAX_DEVICES}",
                self.device_count
            )));
        }
        if self.nsectors == 0 {
            return Err(invalid("device must have at least one sector".to_string()));
        }
        let too_big = self
            .nsectors
            .checked_mul(SECTOR_SIZE as u64)
            .map_or(true, |bytes| bytes > MAX_DEVICE_BYTES);
        if too_big {
            return Err(invalid(format!(
                "{} sectors exceed the {MAX_DEVICE_BYTES}-byte device limit",
                self.nsectors
            )));
        }
        if self.name_prefix.is_empty() {
            return Err(invalid("empty device name prefix".to_string()));
        }
        Ok(())
    }

    /// Name of the device at `index`: prefix plus a letter.
    pub fn device_name(&self, index: usize) -> String {
        let suffix = char::from(b'a' + (index % MAX_DEVICES) as u8);
        format!("{}{}", self.name_prefix, suffix)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> io::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(format!("{key}={value:?} is not a valid number")))
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}
