// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Virtual address allocation from a subnet
//!
//! An [`AddrPool`] covers one subnet. Its gateway address is reserved at creation time, and
//! [`AddrPool::take`] hands out the other addresses of the subnet, always picking the lowest one
//! not in use. The network address of the subnet is never handed out; the last address of the
//! subnet (the IPv4 broadcast address) is.

use ahash::RandomState;
use ipnet::{IpNet, Ipv4Net};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use tracing::debug;

mod shared;

pub use shared::SharedAddrPool;

/// Errors from creating an [`AddrPool`] or allocating from it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddrPoolError {
    #[error("Gateway address {gateway} is not in subnet {subnet}")]
    BadGateway { gateway: IpAddr, subnet: IpNet },
    #[error("Out of addresses in subnet {0}")]
    OutOfAddresses(IpNet),
    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(#[from] ipnet::AddrParseError),
}

/// Address following `addr`, as a big-endian unsigned integer of the address width, or `None` if
/// `addr` is the last address of its family.
fn next_addr(addr: IpAddr) -> Option<IpAddr> {
    match addr {
        IpAddr::V4(addr) => addr
            .to_bits()
            .checked_add(1)
            .map(|bits| IpAddr::V4(Ipv4Addr::from_bits(bits))),
        IpAddr::V6(addr) => addr
            .to_bits()
            .checked_add(1)
            .map(|bits| IpAddr::V6(Ipv6Addr::from_bits(bits))),
    }
}

/// `net` with host bits cleared, expressed as an IPv4 prefix if it only covers IPv4-mapped IPv6
/// addresses.
fn canonical_net(net: IpNet) -> IpNet {
    let net = net.trunc();
    match net {
        IpNet::V6(v6) if v6.prefix_len() >= 96 => v6
            .network()
            .to_ipv4_mapped()
            .and_then(|addr| Ipv4Net::new(addr, v6.prefix_len() - 96).ok())
            .map_or(net, IpNet::V4),
        _ => net,
    }
}

/// A pool of addresses from one subnet, with a reserved gateway address.
///
/// The pool is not synchronized; see [`SharedAddrPool`] for concurrent use.
#[derive(Debug, Clone)]
pub struct AddrPool {
    subnet: IpNet,
    gateway: IpAddr,
    used: HashSet<IpAddr, RandomState>,
}

impl AddrPool {
    /// Create a pool for `subnet`, reserving `gateway`.
    ///
    /// Host bits set in `subnet` are ignored: the pool covers the whole prefix. A subnet of
    /// IPv4-mapped IPv6 addresses (within `::ffff:0:0/96`) is handled as the IPv4 subnet it maps.
    ///
    /// # Errors
    ///
    /// Returns [`AddrPoolError::BadGateway`] if `gateway` is not inside `subnet`.
    pub fn new(gateway: IpAddr, subnet: IpNet) -> Result<Self, AddrPoolError> {
        let gateway = gateway.to_canonical();
        let subnet = canonical_net(subnet);
        if !subnet.contains(&gateway) {
            return Err(AddrPoolError::BadGateway { gateway, subnet });
        }
        let mut used = HashSet::with_hasher(RandomState::with_seed(0));
        used.insert(gateway);
        debug!("Created address pool for {subnet}, gateway {gateway}");
        Ok(Self {
            subnet,
            gateway,
            used,
        })
    }

    /// Create a pool from a CIDR string such as `192.168.0.1/24`, where the address is the gateway
    /// and the prefix is the subnet.
    ///
    /// # Errors
    ///
    /// Returns [`AddrPoolError::InvalidCidr`] if `cidr` cannot be parsed.
    pub fn from_cidr(cidr: &str) -> Result<Self, AddrPoolError> {
        let net = IpNet::from_str(cidr)?;
        Self::new(net.addr(), net)
    }

    /// The subnet covered by the pool (host bits cleared)
    #[must_use]
    pub fn subnet(&self) -> IpNet {
        self.subnet
    }

    /// The gateway address reserved at creation time
    #[must_use]
    pub fn gateway(&self) -> IpAddr {
        self.gateway
    }

    /// Returns true if `addr` belongs to the subnet of the pool
    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        self.subnet.contains(&addr.to_canonical())
    }

    /// Returns true if `addr` is currently in use (allocated, marked, or the gateway)
    #[must_use]
    pub fn is_used(&self, addr: IpAddr) -> bool {
        self.used.contains(&addr.to_canonical())
    }

    /// Number of addresses currently in use, the gateway included
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Allocate the lowest address of the subnet that is not in use.
    ///
    /// The scan starts over from the network address on every call: an address released earlier is
    /// always preferred over a higher one that was never used.
    ///
    /// # Errors
    ///
    /// Returns [`AddrPoolError::OutOfAddresses`] if every address of the subnet is in use. The pool
    /// is left unchanged.
    pub fn take(&mut self) -> Result<IpAddr, AddrPoolError> {
        let mut candidate = self.subnet.network();
        loop {
            candidate = match next_addr(candidate) {
                Some(next) if self.subnet.contains(&next) => next,
                _ => {
                    debug!("No address left in {}", self.subnet);
                    return Err(AddrPoolError::OutOfAddresses(self.subnet));
                }
            };
            if self.used.insert(candidate) {
                debug!("Allocated {candidate} from {}", self.subnet);
                return Ok(candidate);
            }
        }
    }

    /// Reserve `addr`, so that [`AddrPool::take`] does not hand it out.
    ///
    /// Addresses outside of the subnet are ignored.
    pub fn mark(&mut self, addr: IpAddr) {
        let addr = addr.to_canonical();
        if self.subnet.contains(&addr) {
            self.used.insert(addr);
            debug!("Marked {addr} as used in {}", self.subnet);
        } else {
            debug!("Not marking {addr}: outside of {}", self.subnet);
        }
    }

    /// Return `addr` to the pool.
    ///
    /// Releasing an address that is not in use does nothing. The gateway can be released like any
    /// other address, after which [`AddrPool::take`] may hand it out: callers must not do that.
    pub fn release(&mut self, addr: IpAddr) {
        let addr = addr.to_canonical();
        if self.used.remove(&addr) {
            debug!("Released {addr} to {}", self.subnet);
        }
    }
}

impl FromStr for AddrPool {
    type Err = AddrPoolError;

    fn from_str(cidr: &str) -> Result<Self, Self::Err> {
        Self::from_cidr(cidr)
    }
}
