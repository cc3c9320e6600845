// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Set of abandoned tickets that the serving cursor must skip.

use std::collections::BTreeSet;

/// Position in a device's fairness queue. Wraps on overflow.
pub type Ticket = u32;

/// Tickets that were issued but will never be claimed.
///
/// Only touched while the owning device's state mutex is held.
#[derive(Debug, Default)]
pub struct InvalidTickets {
    set: BTreeSet<Ticket>,
}

impl InvalidTickets {
    pub const fn new() -> Self {
        Self {
            set: BTreeSet::new(),
        }
    }

    /// Mark `ticket` as abandoned. Returns `false` if it already was.
    pub fn insert(&mut self, ticket: Ticket) -> bool {
        self.set.insert(ticket)
    }

    /// Forget `ticket`. Removing a ticket that is not present is a no-op.
    pub fn remove(&mut self, ticket: Ticket) -> bool {
        self.set.remove(&ticket)
    }

    pub fn contains(&self, ticket: Ticket) -> bool {
        self.set.contains(&ticket)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// First ticket at or after `from` (wrapping) that is not abandoned.
    ///
    /// Every abandoned ticket stepped over is dropped from the set: once the
    /// cursor has passed it, it can never matter again.
    pub fn next_valid(&mut self, from: Ticket) -> Ticket {
        let mut ticket = from;
        while self.set.remove(&ticket) {
            ticket = ticket.wrapping_add(1);
        }
        ticket
    }
}
