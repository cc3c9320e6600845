// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// In-memory block devices with a fair, ticket-ordered reader/writer lock.
// Cooperating processes open handles on a device and take a shared (read)
// or exclusive (write) lock on the whole disk. Requests are granted strictly
// in arrival order; interrupted or non-blocking requests retire their ticket
// so the queue never stalls.

mod error;
pub use error::{LockError, LockResult};

mod mode;
pub use mode::{LockMode, ProcessId};

pub mod tickets;
pub use tickets::{InvalidTickets, Ticket};

pub mod holders;
pub use holders::HolderRegistry;

mod state;
pub use state::{LockSnapshot, LockState};

pub mod backend;
pub use backend::{BlockBackend, MemoryBackend, SECTOR_SIZE};

pub mod command;
pub use command::Command;

mod device;
pub use device::Device;

mod handle;
pub use handle::{DeviceHandle, Interrupter};

pub mod config;
pub use config::DeviceConfig;

mod registry;
pub use registry::DeviceRegistry;
