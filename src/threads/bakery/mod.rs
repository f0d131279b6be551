//! Lamport's bakery lock in three strengths.
//!
//! - [`NaiveBakery`]: the algorithm as written in the paper, assuming
//!   sequentially consistent memory.
//! - [`OrderedBakery`]: `SeqCst` accesses and a fence, correct on real
//!   multiprocessors.
//! - [`BoundedBakery`]: the ordered lock plus an admission gate that keeps
//!   tickets below a ceiling.
//!
//! Participants are plain integer ids in `0..participants`, fixed when the
//! lock is built. Nothing here uses compare-and-swap or fetch-and-add.
mod bounded;
pub mod memory;
mod mutex;
mod protocol;
mod registry;

pub use bounded::BoundedBakery;
pub use mutex::{BakeryGuard, BakeryMutex};
pub use protocol::{precedes, Bakery, NaiveBakery, OrderedBakery};

/// A participant's place in line. `0` means "not contending".
pub type Ticket = usize;

/// The lock interface shared by all variants.
///
/// # Preconditions
///
/// Not checked in release builds; breaking them deadlocks or breaks exclusion.
/// - `id < participants()`.
/// - No two threads use the same `id` at the same time.
/// - `lock(id)` is not called again before `unlock(id)`.
/// - `unlock(id)` only follows a `lock(id)`.
pub trait RawBakery: Sync {
    fn participants(&self) -> usize;

    /// Spin until `id` may enter its critical section. Returns the ticket it
    /// entered with.
    fn lock(&self, id: usize) -> Ticket;

    fn unlock(&self, id: usize);
}

/// A bakery whose `unlock` happens-before the next `lock` that returns.
///
/// # Safety
///
/// Implementors guarantee that writes made before `unlock(i)` are visible to
/// any participant after its `lock(j)` returns. [`BakeryMutex`] relies on it to
/// hand out `&mut T`.
pub unsafe trait SynchronizedBakery: RawBakery {}
