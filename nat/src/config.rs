// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Serializable description of an address pool

use crate::pool::{AddrPool, AddrPoolError};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Configuration for an [`AddrPool`].
///
/// Accepts either an explicit gateway and subnet:
///
/// ```yaml
/// gateway: 192.168.0.1
/// subnet: 192.168.0.0/24
/// ```
///
/// or the combined CIDR notation, where the address part is the gateway:
///
/// ```yaml
/// cidr: 192.168.0.1/24
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddrPoolConfig {
    Explicit { gateway: IpAddr, subnet: IpNet },
    Cidr { cidr: String },
}

impl TryFrom<&AddrPoolConfig> for AddrPool {
    type Error = AddrPoolError;

    fn try_from(config: &AddrPoolConfig) -> Result<Self, Self::Error> {
        match config {
            AddrPoolConfig::Explicit { gateway, subnet } => AddrPool::new(*gateway, *subnet),
            AddrPoolConfig::Cidr { cidr } => AddrPool::from_cidr(cidr),
        }
    }
}

impl From<&AddrPool> for AddrPoolConfig {
    fn from(pool: &AddrPool) -> Self {
        AddrPoolConfig::Explicit {
            gateway: pool.gateway(),
            subnet: pool.subnet(),
        }
    }
}
