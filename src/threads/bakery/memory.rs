//! How strongly the bakery's loads and stores are ordered.
//!
//! The algorithm is the same for every variant; only the ordering of the
//! accesses to the registry changes. A `MemoryModel` picks it.
//!
//! This Wiki is good to understand atomic memory ordering: <https://gcc.gnu.org/wiki/Atomic/GCCMM/AtomicSync>
use std::sync::atomic::{compiler_fence, fence, Ordering};

pub trait MemoryModel: Send + Sync + 'static {
    /// Ordering of every load from the registry.
    const LOAD: Ordering;
    /// Ordering of every store to the registry.
    const STORE: Ordering;

    /// Runs after each registry access.
    fn after_access();

    /// Runs once a new ticket is published and `choosing` is cleared.
    fn after_publish();
}

/// Word-sized accesses with no hardware ordering.
///
/// Loads and stores are `Relaxed`, so they are neither torn nor cached in a
/// register across polls, and a compiler fence keeps them in program order.
/// The CPU is still free to reorder them: correct only where the hardware is
/// sequentially consistent (e.g. every participant on one core).
#[derive(Debug)]
pub enum Unordered {}

impl MemoryModel for Unordered {
    const LOAD: Ordering = Ordering::Relaxed;
    const STORE: Ordering = Ordering::Relaxed;

    #[inline]
    fn after_access() {
        compiler_fence(Ordering::SeqCst);
    }

    #[inline]
    fn after_publish() {}
}

/// `SeqCst` everywhere plus a full fence after publishing.
///
/// The fence puts every participant's publish into one total order that all
/// wait loops agree on, which is what the algorithm needs on real
/// multiprocessors. The `SeqCst` store of a zero ticket in `unlock` is a
/// release that the next owner's `SeqCst` load acquires.
#[derive(Debug)]
pub enum SequentiallyConsistent {}

impl MemoryModel for SequentiallyConsistent {
    const LOAD: Ordering = Ordering::SeqCst;
    const STORE: Ordering = Ordering::SeqCst;

    #[inline]
    fn after_access() {}

    #[inline]
    fn after_publish() {
        fence(Ordering::SeqCst);
    }
}
