// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::{AddrPool, AddrPoolError};
use crate::sync::Mutex;
use std::fmt::{Debug, Formatter};
use std::net::IpAddr;
use std::ops::DerefMut;
use std::sync::PoisonError;

/// An [`AddrPool`] behind a lock, for allocating from several threads.
///
/// Each operation runs as a single critical section, so that the scan and the reservation done by
/// [`SharedAddrPool::take`] cannot interleave with another thread's: two callers never get the same
/// address.
pub struct SharedAddrPool(Mutex<AddrPool>);

impl SharedAddrPool {
    /// Wrap `pool` for shared use
    #[must_use]
    pub fn new(pool: AddrPool) -> Self {
        Self(Mutex::new(pool))
    }

    // None of the pool operations can leave it inconsistent if a holder panics.
    fn lock(&self) -> impl DerefMut<Target = AddrPool> + '_ {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`AddrPool::take`].
    ///
    /// # Errors
    ///
    /// Returns [`AddrPoolError::OutOfAddresses`] if every address of the subnet is in use.
    pub fn take(&self) -> Result<IpAddr, AddrPoolError> {
        self.lock().take()
    }

    /// See [`AddrPool::mark`].
    pub fn mark(&self, addr: IpAddr) {
        self.lock().mark(addr);
    }

    /// See [`AddrPool::release`].
    pub fn release(&self, addr: IpAddr) {
        self.lock().release(addr);
    }

    /// See [`AddrPool::is_used`].
    #[must_use]
    pub fn is_used(&self, addr: IpAddr) -> bool {
        self.lock().is_used(addr)
    }

    /// See [`AddrPool::used_count`].
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.lock().used_count()
    }

    /// Unwrap the inner [`AddrPool`]
    #[must_use]
    pub fn into_inner(self) -> AddrPool {
        self.0.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<AddrPool> for SharedAddrPool {
    fn from(pool: AddrPool) -> Self {
        Self::new(pool)
    }
}

impl Debug for SharedAddrPool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let pool = self.lock();
        f.debug_struct("SharedAddrPool")
            .field("subnet", &pool.subnet())
            .field("used", &pool.used_count())
            .finish()
    }
}
