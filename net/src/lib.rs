// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)] // Header access should always be strictly safe
#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! In-place access to the address fields of raw IPv4 and IPv6 packets
//!
//! The codec never owns packet memory: an [`IpPacket`](ip_packet::IpPacket) wraps whatever buffer
//! the caller hands it, and field writes land directly in that buffer. Transport checksums are
//! not recomputed after an address rewrite.
//!
//! ```
//! use std::net::{IpAddr, Ipv4Addr};
//! use vnat_net::ip_packet::{AddrRole, IpPacket};
//!
//! let mut buf = [0u8; 20];
//! buf[0] = 0x45;
//! let mut packet = IpPacket::new(&mut buf[..]);
//! let addr = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 3));
//! packet.set_addr(AddrRole::Source, addr).unwrap();
//! assert_eq!(packet.src_addr().unwrap(), addr);
//! ```

pub mod ip_packet;
