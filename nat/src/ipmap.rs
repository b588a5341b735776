// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Thread-safe IP address to IP address map

use crate::sync::RwLock;
use ahash::RandomState;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::net::IpAddr;
use std::ops::{Deref, DerefMut};
use std::sync::PoisonError;
use tracing::trace;

type Inner = HashMap<IpAddr, IpAddr, RandomState>;

/// An [`IpMap`] associates IP addresses with IP addresses, typically the virtual address a NAT
/// handed out to a client with the client's real address, and the other way round.
///
/// All methods take `&self` and can be called from several threads: lookups share a read lock,
/// insertions and removals take the write lock. Keys are compared in their canonical form, so that
/// `::ffff:10.0.0.1` and `10.0.0.1` designate the same entry.
pub struct IpMap(RwLock<Inner>);

impl IpMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self(RwLock::new(HashMap::with_hasher(RandomState::with_seed(0))))
    }

    // The map holds plain values and no write leaves it half-updated, so a guard from a poisoned
    // lock is still good to use.
    fn read(&self) -> impl Deref<Target = Inner> + '_ {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> impl DerefMut<Target = Inner> + '_ {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Associate `value` with `key`, replacing any value previously associated with `key`.
    pub fn set(&self, key: IpAddr, value: IpAddr) {
        let key = key.to_canonical();
        if let Some(previous) = self.write().insert(key, value) {
            trace!("Replaced IP map entry {key} -> {previous} with {key} -> {value}");
        } else {
            trace!("Added IP map entry {key} -> {value}");
        }
    }

    /// Look up the value associated with `key`. A missing key is not an error.
    #[must_use]
    pub fn get(&self, key: IpAddr) -> Option<IpAddr> {
        self.read().get(&key.to_canonical()).copied()
    }

    /// Remove the entry for `key`, if any
    pub fn delete(&self, key: IpAddr) {
        let key = key.to_canonical();
        if let Some(value) = self.write().remove(&key) {
            trace!("Removed IP map entry {key} -> {value}");
        }
    }

    /// Number of entries in the map
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if the map has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Default for IpMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for IpMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpMap").field("len", &self.len()).finish()
    }
}
