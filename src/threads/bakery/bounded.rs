//! Bakery with bounded tickets.
//!
//! Under sustained contention somebody always holds a ticket, so `1 + max`
//! climbs forever. Before taking a ticket, an entrant checks how close the
//! largest ticket is to the ceiling; when too close it waits until every
//! participant has left and all tickets are back to `0`, then starts over
//! from `1`.
use super::memory::SequentiallyConsistent;
use super::protocol::Bakery;
use super::{RawBakery, SynchronizedBakery, Ticket};
use crate::error::BakeryError;
use crate::threads::spin::spin_until;

#[derive(Debug)]
pub struct BoundedBakery {
    inner: Bakery<SequentiallyConsistent>,
    ceiling: Ticket,
    admission_limit: Ticket,
}

impl BoundedBakery {
    /// # Errors
    /// `ceiling` must be larger than `participants`.
    pub fn new(participants: usize, ceiling: Ticket) -> Result<Self, BakeryError> {
        if ceiling <= participants {
            return Err(BakeryError::CeilingTooLow {
                ceiling,
                participants,
            });
        }
        Ok(BoundedBakery {
            inner: Bakery::new(participants),
            ceiling,
            admission_limit: ceiling - participants,
        })
    }

    pub fn ceiling(&self) -> Ticket {
        self.ceiling
    }

    /// Largest ticket an entrant may see and still draw without waiting.
    pub fn admission_limit(&self) -> Ticket {
        self.admission_limit
    }

    pub fn ticket(&self, id: usize) -> Ticket {
        self.inner.ticket(id)
    }

    pub fn max_ticket(&self) -> Ticket {
        self.inner.max_ticket()
    }

    pub fn is_drained(&self) -> bool {
        self.inner.is_drained()
    }

    /// The admission gate.
    ///
    /// Returns at once while the largest ticket is within the admission
    /// limit. Otherwise waits for a full drain, not just for the tickets to
    /// drop below the limit.
    pub fn synchronized_wait_outside(&self, id: usize) {
        let max_ticket = self.inner.max_ticket();
        if max_ticket > self.admission_limit {
            tracing::debug!(
                target: "bakery.gate",
                id,
                max_ticket,
                limit = self.admission_limit,
                "admission gate closed, waiting for drain"
            );
            spin_until(|| self.inner.is_drained());
            tracing::debug!(target: "bakery.gate", id, "drained, admission gate open");
        }
    }
}

impl RawBakery for BoundedBakery {
    fn participants(&self) -> usize {
        self.inner.participants()
    }

    fn lock(&self, id: usize) -> Ticket {
        self.synchronized_wait_outside(id);
        let ticket = self.inner.draw_ticket(id);
        self.inner.wait_for_turn(id);
        ticket
    }

    fn unlock(&self, id: usize) {
        self.inner.release(id);
    }
}

// SAFETY: same accesses as `OrderedBakery`; the gate only adds loads.
unsafe impl SynchronizedBakery for BoundedBakery {}
