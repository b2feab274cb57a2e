use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic ticket issued at the start of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Issues tickets and tells whether one is still the latest.
///
/// A result may only be applied while its ticket is current; anything that
/// resumes after a newer ticket was issued is stale and gets dropped.
#[derive(Debug, Default)]
pub(super) struct Sequencer {
    latest: AtomicU64,
}

impl Sequencer {
    pub(super) fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub(super) fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Invalidate every ticket issued so far.
    pub(super) fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}
