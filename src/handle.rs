// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Open handles on a device: the caller-facing lock operations.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::command::Command;
use crate::device::{Caller, Device};
use crate::error::LockResult;
use crate::mode::{LockMode, ProcessId};

/// An open handle on a [`Device`].
///
/// The mode is fixed at open time. A handle holds at most one lock;
/// dropping it while locked releases the lock.
pub struct DeviceHandle {
    device: Arc<Device>,
    pid: ProcessId,
    mode: LockMode,
    locked: AtomicBool,
    interrupt: Arc<AtomicBool>,
}

impl DeviceHandle {
    pub(crate) fn new(device: Arc<Device>, pid: ProcessId, mode: LockMode) -> Self {
        Self {
            device,
            pid,
            mode,
            locked: AtomicBool::new(false),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Whether this handle currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    fn caller(&self) -> Caller<'_> {
        Caller {
            pid: self.pid,
            mode: self.mode,
            locked: &self.locked,
            interrupt: &self.interrupt,
        }
    }

    /// Take the lock in this handle's mode, blocking until it is this
    /// request's turn and the mode is compatible with current holders.
    ///
    /// # Errors
    /// - `WouldDeadlock` if this process's own holdings make the request
    ///   unsatisfiable (no ticket is taken).
    /// - `Interrupted` if an [`Interrupter`] fired during the wait.
    /// - `ShutDown` if the device is torn down.
    pub fn acquire(&self) -> LockResult<()> {
        self.device.acquire(&self.caller(), None)
    }

    /// Like [`acquire`](Self::acquire), but gives up with `TimedOut` once
    /// `timeout` elapses.
    pub fn acquire_timeout(&self, timeout: Duration) -> LockResult<()> {
        let deadline = Instant::now().checked_add(timeout);
        self.device.acquire(&self.caller(), deadline)
    }

    /// Take the lock only if it can be granted right now; `WouldBlock`
    /// otherwise. Never suspends and performs no deadlock check.
    pub fn try_acquire(&self) -> LockResult<()> {
        self.device.try_acquire(&self.caller())
    }

    /// Give the lock back. `NotHeld` if this handle holds none.
    pub fn release(&self) -> LockResult<()> {
        self.device.release(&self.caller())
    }

    /// Dispatch a numeric command code.
    pub fn ioctl(&self, code: u32) -> LockResult<()> {
        match Command::try_from(code)? {
            Command::Acquire => self.acquire(),
            Command::TryAcquire => self.try_acquire(),
            Command::Release => self.release(),
        }
    }

    /// A cloneable trigger that interrupts this handle's blocking waits.
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            device: Arc::clone(&self.device),
            pending: Arc::clone(&self.interrupt),
        }
    }

    /// Read sectors from the device. Not gated by the lock.
    pub fn read_sectors(&self, sector: u64, buf: &mut [u8]) -> io::Result<()> {
        self.device.backend().read_sectors(sector, buf)
    }

    /// Write sectors to the device. Only handles opened for writing may
    /// write; the lock itself is not consulted.
    pub fn write_sectors(&self, sector: u64, data: &[u8]) -> io::Result<()> {
        if !self.mode.is_write() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{}: handle is not open for writing", self.device.name()),
            ));
        }
        self.device.backend().write_sectors(sector, data)
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.device.close(&self.caller());
    }
}

/// Delivers an asynchronous interruption to one handle's blocking waits.
///
/// An interruption stays pending until a wait on that handle observes it,
/// the same way a signal stays pending until the process sleeps
/// interruptibly. A request that is granted first, without waiting or
/// just as the interruption lands, discards it, so a stale interruption
/// never fails a later acquire.
#[derive(Clone)]
pub struct Interrupter {
    device: Arc<Device>,
    pending: Arc<AtomicBool>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        self.pending.store(true, Ordering::Release);
        self.device.wake_waiters();
    }

    /// Whether an interruption is waiting to be observed.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}
