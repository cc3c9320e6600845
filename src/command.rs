// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Numeric ioctl-style command codes for the lock operations.

use crate::error::LockError;

/// Block until the lock is granted.
pub const IOC_ACQUIRE: u32 = 0x4f01;
/// Take the lock only if it is immediately available.
pub const IOC_TRY_ACQUIRE: u32 = 0x4f02;
/// Give the lock back.
pub const IOC_RELEASE: u32 = 0x4f03;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Acquire,
    TryAcquire,
    Release,
}

impl Command {
    pub fn code(self) -> u32 {
        match self {
            Command::Acquire => IOC_ACQUIRE,
            Command::TryAcquire => IOC_TRY_ACQUIRE,
            Command::Release => IOC_RELEASE,
        }
    }
}

impl TryFrom<u32> for Command {
    type Error = LockError;

    fn try_from(code: u32) -> Result<Self, LockError> {
        match code {
            IOC_ACQUIRE => Ok(Command::Acquire),
            IOC_TRY_ACQUIRE => Ok(Command::TryAcquire),
            IOC_RELEASE => Ok(Command::Release),
            other => Err(LockError::UnknownOperation(other)),
        }
    }
}
