//! The ticket allocator and the wait protocol.
//!
//! ```text
//! lock(i):
//!     choosing[i] = true
//!     ticket[i]   = 1 + max(ticket[0..n])
//!     choosing[i] = false
//!     for j != i:
//!         wait until !choosing[j]
//!         wait until ticket[j] == 0 || (ticket[i], i) < (ticket[j], j)
//! unlock(i):
//!     ticket[i] = 0
//! ```
use std::fmt;

use super::memory::{MemoryModel, SequentiallyConsistent, Unordered};
use super::registry::Registry;
use super::{RawBakery, SynchronizedBakery, Ticket};
use crate::threads::spin::spin_until;

/// A bakery lock for a fixed number of participants.
///
/// `M` decides how the registry is accessed, see [`NaiveBakery`] and
/// [`OrderedBakery`].
pub struct Bakery<M> {
    registry: Registry<M>,
}

/// The textbook algorithm with no hardware ordering. Only correct when the
/// machine behaves sequentially consistent.
pub type NaiveBakery = Bakery<Unordered>;

/// Sequentially consistent accesses and a fence after publishing a ticket.
pub type OrderedBakery = Bakery<SequentiallyConsistent>;

/// Does participant `a` have to go before participant `b`?
///
/// Lexicographic order on `(ticket, id)` where a zero ticket means "not
/// contending" and never goes first.
#[inline]
pub fn precedes(a: (Ticket, usize), b: (Ticket, usize)) -> bool {
    a.0 != 0 && a < b
}

impl<M: MemoryModel> Bakery<M> {
    /// Ids `0..participants` are the only valid ids for the lifetime of the lock.
    pub fn new(participants: usize) -> Self {
        Bakery {
            registry: Registry::new(participants),
        }
    }

    pub fn participants(&self) -> usize {
        self.registry.len()
    }

    /// Current ticket of `id`, `0` if it is not contending.
    pub fn ticket(&self, id: usize) -> Ticket {
        self.registry.ticket(id)
    }

    pub fn max_ticket(&self) -> Ticket {
        self.registry.max_ticket()
    }

    /// `true` when nobody holds a ticket.
    pub fn is_drained(&self) -> bool {
        self.max_ticket() == 0
    }

    /// Take a ticket one larger than every ticket currently visible.
    ///
    /// Two participants racing through here may draw the same number; the
    /// id breaks the tie in [`Bakery::wait_for_turn`].
    pub fn draw_ticket(&self, id: usize) -> Ticket {
        debug_assert!(id < self.participants(), "participant {id} out of range");
        debug_assert_eq!(0, self.registry.ticket(id), "participant {id} already holds a ticket");

        self.registry.set_choosing(id, true);
        let ticket = self.registry.max_ticket() + 1;
        self.registry.set_ticket(id, ticket);
        self.registry.set_choosing(id, false);
        M::after_publish();
        ticket
    }

    /// Return once no other participant is ahead of `id`.
    pub fn wait_for_turn(&self, id: usize) {
        let mine = (self.registry.ticket(id), id);
        for other in (0..self.participants()).filter(|&other| other != id) {
            // A half-published ticket must not be compared against.
            spin_until(|| !self.registry.choosing(other));
            spin_until(|| !precedes((self.registry.ticket(other), other), mine));
        }
    }

    pub fn release(&self, id: usize) {
        self.registry.set_ticket(id, 0);
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &Registry<M> {
        &self.registry
    }
}

impl<M: MemoryModel> RawBakery for Bakery<M> {
    fn participants(&self) -> usize {
        Bakery::participants(self)
    }

    fn lock(&self, id: usize) -> Ticket {
        let ticket = self.draw_ticket(id);
        self.wait_for_turn(id);
        ticket
    }

    fn unlock(&self, id: usize) {
        self.release(id);
    }
}

// SAFETY: the `SeqCst` store of `0` in `unlock` is a release that the next
// owner's `SeqCst` loads in `wait_for_turn` acquire.
unsafe impl SynchronizedBakery for OrderedBakery {}

impl<M: MemoryModel> fmt::Debug for Bakery<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bakery")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{precedes, Bakery, NaiveBakery, OrderedBakery};
    use crate::threads::bakery::memory::MemoryModel;
    use crate::threads::bakery::RawBakery;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn single_participant_tickets<M: MemoryModel>() -> Vec<usize> {
        let bakery = Bakery::<M>::new(1);
        (0..5)
            .map(|_| {
                let ticket = bakery.lock(0);
                bakery.unlock(0);
                ticket
            })
            .collect()
    }

    #[test]
    fn it_gives_a_lone_participant_ticket_one_every_time() {
        assert_eq!(vec![1; 5], single_participant_tickets::<super::Unordered>());
        assert_eq!(vec![1; 5], single_participant_tickets::<super::SequentiallyConsistent>());
    }

    #[test]
    fn it_clears_the_ticket_on_unlock() {
        let bakery = OrderedBakery::new(2);
        let ticket = bakery.lock(1);
        assert_eq!(ticket, bakery.ticket(1));
        assert!(!bakery.is_drained());
        bakery.unlock(1);
        assert_eq!(0, bakery.ticket(1));
        assert!(bakery.is_drained());
    }

    #[test]
    fn it_draws_past_every_visible_ticket() {
        let bakery = OrderedBakery::new(2);
        assert_eq!(1, bakery.lock(1));
        assert_eq!(2, bakery.draw_ticket(0));

        // Re-entering while 0 still waits must not reuse the old ticket.
        bakery.unlock(1);
        assert_eq!(3, bakery.draw_ticket(1));

        // 0 holds the smaller ticket, so it does not wait on 1.
        bakery.wait_for_turn(0);
        bakery.unlock(0);
        bakery.wait_for_turn(1);
        bakery.unlock(1);
        assert!(bakery.is_drained());
    }

    #[test]
    fn it_leaves_choosing_false_after_drawing() {
        let bakery = NaiveBakery::new(3);
        bakery.draw_ticket(2);
        assert!(!bakery.registry().choosing(2));
    }

    /// Run `wait_for_turn(id)` on another thread and report whether it is
    /// still waiting after a while.
    fn spawn_waiter(
        bakery: &Arc<OrderedBakery>,
        id: usize,
    ) -> (Arc<AtomicBool>, std::thread::JoinHandle<()>) {
        let entered = Arc::new(AtomicBool::new(false));
        let handle = {
            let bakery = Arc::clone(bakery);
            let entered = Arc::clone(&entered);
            std::thread::spawn(move || {
                bakery.wait_for_turn(id);
                entered.store(true, Ordering::SeqCst);
            })
        };
        std::thread::sleep(Duration::from_millis(50));
        (entered, handle)
    }

    #[test]
    fn it_breaks_ticket_ties_by_smaller_id() {
        let bakery = Arc::new(OrderedBakery::new(2));
        bakery.registry().set_ticket(0, 5);
        bakery.registry().set_ticket(1, 5);

        let (entered, handle) = spawn_waiter(&bakery, 1);
        assert!(!entered.load(Ordering::SeqCst), "1 entered ahead of 0");

        bakery.wait_for_turn(0);
        bakery.unlock(0);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn it_waits_while_another_participant_is_choosing() {
        let bakery = Arc::new(OrderedBakery::new(2));
        bakery.registry().set_ticket(0, 1);
        // 1 is mid-doorway with nothing published yet.
        bakery.registry().set_choosing(1, true);

        let (entered, handle) = spawn_waiter(&bakery, 0);
        assert!(!entered.load(Ordering::SeqCst), "0 compared against a ticket being chosen");

        bakery.registry().set_choosing(1, false);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn it_lets_a_later_ticket_wait_for_an_earlier_one() {
        let bakery = Arc::new(OrderedBakery::new(3));
        bakery.registry().set_ticket(2, 1);
        bakery.registry().set_ticket(0, 2);

        let (entered, handle) = spawn_waiter(&bakery, 0);
        assert!(!entered.load(Ordering::SeqCst));

        bakery.unlock(2);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    proptest! {
        #[test]
        fn precedence_matches_the_proceed_rule(
            mine in 1usize..64,
            theirs in 0usize..64,
            id in 0usize..8,
            other in 0usize..8,
        ) {
            prop_assume!(id != other);
            let proceed = theirs == 0 || theirs > mine || (theirs == mine && other > id);
            prop_assert_eq!(proceed, !precedes((theirs, other), (mine, id)));
        }

        #[test]
        fn exactly_one_of_two_contenders_goes_first(
            a in 1usize..64,
            b in 1usize..64,
            id in 0usize..8,
            other in 0usize..8,
        ) {
            prop_assume!(id != other);
            prop_assert!(precedes((a, id), (b, other)) ^ precedes((b, other), (a, id)));
        }
    }
}
