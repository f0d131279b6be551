//! A bakery lock that owns the data it protects.
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{SynchronizedBakery, Ticket};
use crate::error::BakeryError;

type LockResult<'a, L, T> = Result<BakeryGuard<'a, L, T>, BakeryError>;

pub struct BakeryMutex<L, T> {
    lock: L,
    inner: UnsafeCell<T>,
    // set when a participant panics while holding the lock
    poisoned: AtomicBool,
}

/// RAII
pub struct BakeryGuard<'a, L: SynchronizedBakery, T> {
    mutex: &'a BakeryMutex<L, T>,
    id: usize,
    ticket: Ticket,
}

impl<L: SynchronizedBakery, T> BakeryMutex<L, T> {
    pub fn new(lock: L, inner: T) -> Self {
        BakeryMutex {
            lock,
            inner: inner.into(),
            poisoned: AtomicBool::new(false),
        }
    }

    /// Acquire the lock as participant `id`.
    ///
    /// Same preconditions as [`RawBakery::lock`](super::RawBakery::lock).
    ///
    /// # Errors
    /// Will return an error if the lock is poisoned. The participant does not
    /// hold the lock afterwards.
    pub fn lock(&self, id: usize) -> LockResult<'_, L, T> {
        if self.is_poisoned() {
            return Err(BakeryError::Poisoned);
        }
        let ticket = self.lock.lock(id);
        // Poisoned while we waited in line.
        if self.is_poisoned() {
            self.lock.unlock(id);
            return Err(BakeryError::Poisoned);
        }
        Ok(BakeryGuard {
            mutex: self,
            id,
            ticket,
        })
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    pub fn raw(&self) -> &L {
        &self.lock
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<L: SynchronizedBakery, T> BakeryGuard<'_, L, T> {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Ticket this participant entered with.
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

impl<L: SynchronizedBakery, T> Deref for BakeryGuard<'_, L, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.mutex.inner.get() }
    }
}

impl<L: SynchronizedBakery, T> DerefMut for BakeryGuard<'_, L, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.mutex.inner.get() }
    }
}

impl<L: SynchronizedBakery, T> Drop for BakeryGuard<'_, L, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.mutex.poisoned.store(true, Ordering::Release);
        }
        self.mutex.lock.unlock(self.id);
    }
}

impl<L: SynchronizedBakery + fmt::Debug, T> fmt::Debug for BakeryMutex<L, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BakeryMutex")
            .field("lock", &self.lock)
            .field("poisoned", &self.is_poisoned())
            .finish_non_exhaustive()
    }
}

// SAFETY: `L: SynchronizedBakery` gives exclusive, ordered access to `inner`.
unsafe impl<L: SynchronizedBakery, T: Send> Sync for BakeryMutex<L, T> {}
