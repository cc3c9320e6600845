// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Per-device lock state: ticket counters, holder counts, abandoned tickets.
// Read and write requests share one protocol; the mode only selects the
// compatibility predicate.
//
// Nothing here blocks. The caller owns the mutex and the wait channel.

use crate::holders::HolderRegistry;
use crate::mode::{LockMode, ProcessId};
use crate::tickets::{InvalidTickets, Ticket};

/// Point-in-time copy of a device's lock counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockSnapshot {
    /// Next ticket to be issued.
    pub ticket_head: Ticket,
    /// Ticket currently eligible to be served.
    pub ticket_tail: Ticket,
    pub readers: u32,
    pub writers: u32,
    /// Abandoned tickets still waiting to be skipped.
    pub invalid_tickets: usize,
}

impl LockSnapshot {
    /// Nobody holds the lock and no live ticket is outstanding.
    pub fn is_idle(&self) -> bool {
        self.readers == 0 && self.writers == 0 && self.ticket_head == self.ticket_tail
    }
}

#[derive(Debug, Default)]
pub struct LockState {
    ticket_head: Ticket,
    ticket_tail: Ticket,
    reader_count: u32,
    writer_count: u32,
    invalid: InvalidTickets,
    holders: HolderRegistry,
    shut_down: bool,
}

impl LockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State whose head and tail both start at `ticket`.
    #[cfg(test)]
    pub(crate) fn starting_at(ticket: Ticket) -> Self {
        Self {
            ticket_head: ticket,
            ticket_tail: ticket,
            ..Self::default()
        }
    }

    /// Whether a blocking `mode` request from `pid` can never be satisfied
    /// because of what `pid` already holds on this device.
    ///
    /// Only self-deadlock is detected: a writer asking again in any mode, or
    /// a reader asking for the write lock.
    pub fn would_deadlock(&self, pid: ProcessId, mode: LockMode) -> bool {
        match mode {
            LockMode::Write => self.holders.holds_any(pid),
            LockMode::Read => self.holders.contains(LockMode::Write, pid),
        }
    }

    /// Hand out the next ticket.
    pub fn issue_ticket(&mut self) -> Ticket {
        let ticket = self.ticket_head;
        self.ticket_head = self.ticket_head.wrapping_add(1);
        ticket
    }

    /// Whether `ticket` may be granted in `mode` right now.
    pub fn can_grant(&self, ticket: Ticket, mode: LockMode) -> bool {
        if self.ticket_tail != ticket || self.writer_count != 0 {
            return false;
        }
        match mode {
            LockMode::Read => true,
            LockMode::Write => self.reader_count == 0,
        }
    }

    /// Record `pid` as a holder and move the cursor past `ticket`.
    ///
    /// The caller must have checked `can_grant`.
    pub fn grant(&mut self, ticket: Ticket, mode: LockMode, pid: ProcessId) {
        debug_assert!(self.can_grant(ticket, mode));
        self.holders.insert(mode, pid);
        match mode {
            LockMode::Read => self.reader_count += 1,
            LockMode::Write => self.writer_count += 1,
        }
        self.advance_past(ticket);
    }

    /// Retire a ticket that will never be granted.
    ///
    /// Returns `true` if the cursor moved, in which case other waiters must
    /// be woken to re-check.
    pub fn abandon(&mut self, ticket: Ticket) -> bool {
        if self.ticket_tail == ticket {
            self.advance_past(ticket);
            true
        } else {
            self.invalid.insert(ticket);
            false
        }
    }

    /// Drop one `mode` holding of `pid`. The caller has verified the handle
    /// is locked; a missing registry entry is tolerated.
    pub fn release(&mut self, mode: LockMode, pid: ProcessId) {
        self.holders.remove(mode, pid);
        match mode {
            LockMode::Read => self.reader_count = self.reader_count.saturating_sub(1),
            LockMode::Write => self.writer_count = self.writer_count.saturating_sub(1),
        }
    }

    fn advance_past(&mut self, ticket: Ticket) {
        self.ticket_tail = self.invalid.next_valid(ticket.wrapping_add(1));
    }

    pub fn is_held_by(&self, mode: LockMode, pid: ProcessId) -> bool {
        self.holders.contains(mode, pid)
    }

    pub fn shut_down(&mut self) {
        self.shut_down = true;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            ticket_head: self.ticket_head,
            ticket_tail: self.ticket_tail,
            readers: self.reader_count,
            writers: self.writer_count,
            invalid_tickets: self.invalid.len(),
        }
    }
}
