// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![deny(rustdoc::all)]

//! Address bookkeeping for a user-space NAT
//!
//! This package provides the two stores a NAT gateway consults when it rewrites a packet:
//!
//! - [`AddrPool`] hands out virtual addresses from a subnet, lowest free address first, and takes
//!   them back on release.
//! - [`IpMap`] remembers which virtual address stands for which real address (and the reverse),
//!   so that return traffic can be translated back.
//!
//! Both are independent from packet handling: deciding which packets get translated, and
//! rewriting their headers, is up to the caller.
//!
//! # Example
//!
//! ```
//! use vnat_nat::AddrPool;
//!
//! let mut pool = AddrPool::from_cidr("192.168.0.1/24").unwrap();
//! let first = pool.take().unwrap();
//! let second = pool.take().unwrap();
//! assert_eq!(first.to_string(), "192.168.0.2");
//! assert_eq!(second.to_string(), "192.168.0.3");
//!
//! // Released addresses are handed out again first
//! pool.release(first);
//! assert_eq!(pool.take().unwrap(), first);
//! ```
//!
//! # Limitations
//!
//! - [`AddrPool::take`] scans the subnet from its first address on every call. This keeps the
//!   lowest free address always first in line, at a cost linear in the number of addresses in use.
//! - [`AddrPool`] is not synchronized. Use [`SharedAddrPool`] to allocate from several threads.

mod config;
mod ipmap;
mod pool;
mod sync;

pub use config::AddrPoolConfig;
pub use ipmap::IpMap;
pub use pool::{AddrPool, AddrPoolError, SharedAddrPool};
