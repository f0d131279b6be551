//! Lamport's bakery algorithm.
//!
//! Mutual exclusion for a fixed set of participants using nothing but loads
//! and stores: every participant takes a ticket one larger than any ticket it
//! can see and waits until its `(ticket, id)` pair is the smallest one around.
//!
//! <https://lamport.azurewebsites.net/pubs/bakery.pdf>

pub mod error;
pub mod harness;
pub mod threads;

pub use error::BakeryError;
pub use threads::bakery::{
    Bakery, BakeryGuard, BakeryMutex, BoundedBakery, NaiveBakery, OrderedBakery, RawBakery,
    SynchronizedBakery, Ticket,
};
