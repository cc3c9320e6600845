// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for device lock operations.
// Every variant maps onto the errno a block-device ioctl would return.

use std::io;

use thiserror::Error;

/// Failure of an acquire, try-acquire or release request.
///
/// None of these are fatal to the device: whoever got the error holds
/// nothing new, and the device stays usable by every other handle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockError {
    /// The caller's own current holdership makes this blocking request
    /// unsatisfiable. No ticket was issued.
    #[error("lock request would deadlock against a lock held by the same process")]
    WouldDeadlock,

    /// The blocking wait was interrupted before the lock was granted.
    /// The ticket has been retired.
    #[error("lock wait interrupted")]
    Interrupted,

    /// A non-blocking request could not be satisfied immediately.
    /// The ticket has been retired.
    #[error("lock is busy")]
    WouldBlock,

    /// Release was requested on a handle that holds no lock.
    #[error("handle does not hold the lock")]
    NotHeld,

    /// The command code does not name a lock operation.
    #[error("unknown lock operation {0:#x}")]
    UnknownOperation(u32),

    /// A timed acquire reached its deadline before the lock was granted.
    #[error("timed out waiting for lock")]
    TimedOut,

    /// The device is being torn down.
    #[error("device has been shut down")]
    ShutDown,
}

impl LockError {
    /// The errno the block-device ioctl interface reports for this error.
    pub fn errno(&self) -> i32 {
        match self {
            LockError::WouldDeadlock => libc::EDEADLK,
            LockError::Interrupted => libc::EINTR,
            LockError::WouldBlock => libc::EBUSY,
            LockError::NotHeld => libc::EINVAL,
            LockError::UnknownOperation(_) => libc::ENOTTY,
            LockError::TimedOut => libc::ETIMEDOUT,
            LockError::ShutDown => libc::ENODEV,
        }
    }
}

impl From<LockError> for io::Error {
    fn from(err: LockError) -> io::Error {
        io::Error::from_raw_os_error(err.errno())
    }
}

/// Result type for lock operations.
pub type LockResult<T> = std::result::Result<T, LockError>;
