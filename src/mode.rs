// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Lock modes and process identities.

use std::fmt;

/// Access mode of a handle, fixed when the handle is opened.
///
/// A handle opened for writing takes the exclusive lock; a read-only
/// handle takes the shared lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockMode {
    Read,
    Write,
}

impl LockMode {
    /// Mode for a handle opened with (`true`) or without write access.
    pub fn from_writable(writable: bool) -> Self {
        if writable {
            LockMode::Write
        } else {
            LockMode::Read
        }
    }

    pub fn is_write(self) -> bool {
        self == LockMode::Write
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Read => f.write_str("read"),
            LockMode::Write => f.write_str("write"),
        }
    }
}

/// Identity of a cooperating process, as seen by the holder registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Identity of the calling process.
    pub fn current() -> Self {
        ProcessId(std::process::id())
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        ProcessId(pid)
    }
}
