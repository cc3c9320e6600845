// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Registry of processes currently holding a device lock.
// Each granted handle is one entry, so a process with two read handles
// appears twice in the reader set.

use std::collections::BTreeMap;

use crate::mode::{LockMode, ProcessId};

/// Counted set of process identities.
#[derive(Debug, Default)]
struct PidMultiset {
    entries: BTreeMap<ProcessId, usize>,
    total: usize,
}

impl PidMultiset {
    fn insert(&mut self, pid: ProcessId) {
        *self.entries.entry(pid).or_insert(0) += 1;
        self.total += 1;
    }

    fn remove(&mut self, pid: ProcessId) -> bool {
        let Some(n) = self.entries.get_mut(&pid) else {
            return false;
        };
        *n -= 1;
        if *n == 0 {
            self.entries.remove(&pid);
        }
        self.total -= 1;
        true
    }

    fn contains(&self, pid: ProcessId) -> bool {
        self.entries.contains_key(&pid)
    }
}

/// Reader and writer holder sets for one device.
#[derive(Debug, Default)]
pub struct HolderRegistry {
    readers: PidMultiset,
    writers: PidMultiset,
}

impl HolderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, mode: LockMode) -> &PidMultiset {
        match mode {
            LockMode::Read => &self.readers,
            LockMode::Write => &self.writers,
        }
    }

    fn set_mut(&mut self, mode: LockMode) -> &mut PidMultiset {
        match mode {
            LockMode::Read => &mut self.readers,
            LockMode::Write => &mut self.writers,
        }
    }

    pub fn insert(&mut self, mode: LockMode, pid: ProcessId) {
        self.set_mut(mode).insert(pid);
    }

    /// Drop one entry for `pid`. Absent pids are ignored; returns whether
    /// anything was removed.
    pub fn remove(&mut self, mode: LockMode, pid: ProcessId) -> bool {
        self.set_mut(mode).remove(pid)
    }

    pub fn contains(&self, mode: LockMode, pid: ProcessId) -> bool {
        self.set(mode).contains(pid)
    }

    /// Whether `pid` holds the lock in either mode.
    pub fn holds_any(&self, pid: ProcessId) -> bool {
        self.readers.contains(pid) || self.writers.contains(pid)
    }

    /// Number of entries held in `mode`.
    pub fn count(&self, mode: LockMode) -> usize {
        self.set(mode).total
    }
}
