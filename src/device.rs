// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// A lockable in-memory block device.
// One mutex guards the lock state; one condition variable carries every
// wake-up. Waiters re-check their grant predicate on each broadcast, the
// same wait-if loop a named waiter runs.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::{debug, info, trace, warn};

use crate::backend::{BlockBackend, MemoryBackend};
use crate::error::{LockError, LockResult};
use crate::handle::DeviceHandle;
use crate::mode::{LockMode, ProcessId};
use crate::state::{LockSnapshot, LockState};
use crate::tickets::Ticket;

/// The per-handle facts the lock protocol needs.
pub(crate) struct Caller<'a> {
    pub(crate) pid: ProcessId,
    pub(crate) mode: LockMode,
    /// Whether the handle holds the lock. Only written under the state mutex.
    pub(crate) locked: &'a AtomicBool,
    /// Pending interruption, consumed by the wait that observes it or
    /// cleared when the request is granted.
    pub(crate) interrupt: &'a AtomicBool,
}

/// A block device whose handles coordinate through a fair reader/writer
/// lock.
///
/// Requests are served strictly in ticket order. The lock is advisory:
/// sector I/O through a handle is never checked against it.
pub struct Device {
    name: String,
    state: Mutex<LockState>,
    blockq: Condvar,
    backend: Box<dyn BlockBackend>,
}

impl Device {
    /// Create a device over `backend` with fresh lock state.
    pub fn new(name: impl Into<String>, backend: Box<dyn BlockBackend>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            state: Mutex::new(LockState::new()),
            blockq: Condvar::new(),
            backend,
        })
    }

    /// Create a device backed by `nsectors` zeroed in-memory sectors.
    pub fn with_memory(name: impl Into<String>, nsectors: u64) -> io::Result<Arc<Self>> {
        let backend = MemoryBackend::new(nsectors)?;
        Ok(Self::new(name, Box::new(backend)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of addressable sectors, as reported by the backend.
    pub fn capacity(&self) -> u64 {
        self.backend.capacity()
    }

    pub(crate) fn backend(&self) -> &dyn BlockBackend {
        self.backend.as_ref()
    }

    /// Open a handle for the calling process.
    pub fn open(self: &Arc<Self>, mode: LockMode) -> DeviceHandle {
        self.open_as(ProcessId::current(), mode)
    }

    /// Open a handle on behalf of `pid`.
    pub fn open_as(self: &Arc<Self>, pid: ProcessId, mode: LockMode) -> DeviceHandle {
        DeviceHandle::new(Arc::clone(self), pid, mode)
    }

    pub fn snapshot(&self) -> LockSnapshot {
        self.lock_state().snapshot()
    }

    /// Whether `pid` currently holds the lock in `mode`.
    pub fn is_held_by(&self, mode: LockMode, pid: ProcessId) -> bool {
        self.lock_state().is_held_by(mode, pid)
    }

    /// Refuse new requests and wake every waiter so it can give up.
    /// Holders may still release.
    pub fn shutdown(&self) {
        let mut st = self.lock_state();
        if st.is_shut_down() {
            return;
        }
        st.shut_down();
        self.blockq.notify_all();
        info!("{}: shut down ({:?})", self.name, st.snapshot());
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock_state().is_shut_down()
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocking acquire. `deadline` of `None` waits indefinitely.
    pub(crate) fn acquire(&self, caller: &Caller<'_>, deadline: Option<Instant>) -> LockResult<()> {
        let ticket = {
            let mut st = self.lock_state();
            if st.is_shut_down() {
                return Err(LockError::ShutDown);
            }
            if caller.locked.load(Ordering::Acquire) || st.would_deadlock(caller.pid, caller.mode) {
                warn!(
                    "{}: pid {} {} request would deadlock",
                    self.name, caller.pid, caller.mode
                );
                return Err(LockError::WouldDeadlock);
            }
            st.issue_ticket()
        };
        trace!(
            "{}: pid {} waiting for {} lock, ticket {}",
            self.name,
            caller.pid,
            caller.mode,
            ticket
        );

        let mut st = self.lock_state();
        loop {
            if !st.is_shut_down() && st.can_grant(ticket, caller.mode) {
                self.grant(&mut st, ticket, caller);
                return Ok(());
            }
            if let Some(err) = Self::wait_failure(&st, caller, deadline) {
                self.retire(&mut st, ticket, caller, err);
                return Err(err);
            }
            st = match deadline {
                None => self.blockq.wait(st).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    self.blockq
                        .wait_timeout(st, timeout)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
            trace!("{}: pid {} woke, ticket {}", self.name, caller.pid, ticket);
        }
    }

    /// Non-blocking acquire. Always consumes a ticket, never waits.
    pub(crate) fn try_acquire(&self, caller: &Caller<'_>) -> LockResult<()> {
        let mut st = self.lock_state();
        if st.is_shut_down() {
            return Err(LockError::ShutDown);
        }
        if caller.locked.load(Ordering::Acquire) {
            return Err(LockError::WouldBlock);
        }
        let ticket = st.issue_ticket();
        if st.can_grant(ticket, caller.mode) {
            self.grant(&mut st, ticket, caller);
            Ok(())
        } else {
            self.retire(&mut st, ticket, caller, LockError::WouldBlock);
            Err(LockError::WouldBlock)
        }
    }

    pub(crate) fn release(&self, caller: &Caller<'_>) -> LockResult<()> {
        let mut st = self.lock_state();
        if !caller.locked.load(Ordering::Acquire) {
            return Err(LockError::NotHeld);
        }
        st.release(caller.mode, caller.pid);
        caller.locked.store(false, Ordering::Release);
        self.blockq.notify_all();
        debug!(
            "{}: pid {} released {} lock ({:?})",
            self.name,
            caller.pid,
            caller.mode,
            st.snapshot()
        );
        Ok(())
    }

    /// Last reference to a handle went away: drop its lock if it has one.
    pub(crate) fn close(&self, caller: &Caller<'_>) {
        if !caller.locked.load(Ordering::Acquire) {
            return;
        }
        warn!(
            "{}: pid {} closed handle while holding {} lock",
            self.name, caller.pid, caller.mode
        );
        let _ = self.release(caller);
    }

    /// Wake every waiter so it re-checks its predicate and interrupt flag.
    ///
    /// Taking the mutex first orders the wake after any waiter that is
    /// between its flag check and its wait.
    pub(crate) fn wake_waiters(&self) {
        drop(self.lock_state());
        self.blockq.notify_all();
    }

    fn wait_failure(
        st: &LockState,
        caller: &Caller<'_>,
        deadline: Option<Instant>,
    ) -> Option<LockError> {
        if st.is_shut_down() {
            Some(LockError::ShutDown)
        } else if caller.interrupt.swap(false, Ordering::AcqRel) {
            Some(LockError::Interrupted)
        } else if deadline.map_or(false, |d| Instant::now() >= d) {
            Some(LockError::TimedOut)
        } else {
            None
        }
    }

    fn grant(&self, st: &mut LockState, ticket: Ticket, caller: &Caller<'_>) {
        st.grant(ticket, caller.mode, caller.pid);
        caller.locked.store(true, Ordering::Release);
        // Any interruption aimed at this request is moot once it is granted.
        caller.interrupt.store(false, Ordering::Release);
        self.blockq.notify_all();
        debug!(
            "{}: pid {} granted {} lock, ticket {}",
            self.name, caller.pid, caller.mode, ticket
        );
    }

    fn retire(&self, st: &mut LockState, ticket: Ticket, caller: &Caller<'_>, reason: LockError) {
        let advanced = st.abandon(ticket);
        if advanced {
            self.blockq.notify_all();
        }
        debug!(
            "{}: pid {} retired ticket {} ({}), cursor {}",
            self.name,
            caller.pid,
            ticket,
            reason,
            if advanced { "advanced" } else { "unchanged" }
        );
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("capacity", &self.capacity())
            .field("lock", &self.snapshot())
            .finish()
    }
}
