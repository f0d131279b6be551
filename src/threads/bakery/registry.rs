//! Per-participant state: the `choosing` flags and the tickets.
//!
//! Two dense arrays indexed by participant id, allocated once. A participant
//! only ever writes its own slot but reads all of them, so each slot gets its
//! own cache line to keep one participant's writes from invalidating the line
//! its neighbours are polling.
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize};

use super::memory::MemoryModel;
use super::Ticket;

/// One slot per 64-byte cache line (x86-64 and AArch64).
#[repr(C, align(64))]
#[derive(Default)]
struct Padded<T>(T);

impl<T> Deref for Padded<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

pub struct Registry<M> {
    choosing: Box<[Padded<AtomicBool>]>,
    tickets: Box<[Padded<AtomicUsize>]>,
    _model: PhantomData<M>,
}

impl<M: MemoryModel> Registry<M> {
    /// Every participant starts idle: not choosing, ticket `0`.
    pub fn new(participants: usize) -> Self {
        Registry {
            choosing: (0..participants).map(|_| Padded::default()).collect(),
            tickets: (0..participants).map(|_| Padded::default()).collect(),
            _model: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    #[inline]
    pub fn choosing(&self, id: usize) -> bool {
        let value = self.choosing[id].load(M::LOAD);
        M::after_access();
        value
    }

    #[inline]
    pub fn set_choosing(&self, id: usize, value: bool) {
        self.choosing[id].store(value, M::STORE);
        M::after_access();
    }

    #[inline]
    pub fn ticket(&self, id: usize) -> Ticket {
        let value = self.tickets[id].load(M::LOAD);
        M::after_access();
        value
    }

    #[inline]
    pub fn set_ticket(&self, id: usize, ticket: Ticket) {
        self.tickets[id].store(ticket, M::STORE);
        M::after_access();
    }

    /// Largest ticket currently held, `0` when nobody holds one.
    ///
    /// Slots are read one at a time, so this is not a snapshot.
    pub fn max_ticket(&self) -> Ticket {
        (0..self.len()).map(|id| self.ticket(id)).max().unwrap_or(0)
    }
}

impl<M: MemoryModel> fmt::Debug for Registry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tickets: Vec<Ticket> = (0..self.len()).map(|id| self.ticket(id)).collect();
        f.debug_struct("Registry")
            .field("participants", &self.len())
            .field("tickets", &tickets)
            .finish_non_exhaustive()
    }
}
