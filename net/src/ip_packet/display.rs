// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::{AddrRole, IpPacket, IpVersion};
use std::fmt::{Display, Formatter};

impl Display for IpVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IPv{}", self.as_u8())
    }
}

impl Display for AddrRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AddrRole::Source => write!(f, "source"),
            AddrRole::Destination => write!(f, "destination"),
        }
    }
}

impl<B: AsRef<[u8]>> Display for IpPacket<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let summary = self.ip_version().and_then(|version| {
            Ok((
                version,
                self.src_addr()?,
                self.dst_addr()?,
                self.total_len()?,
            ))
        });
        match summary {
            Ok((version, src, dst, len)) => write!(f, "{version} {src} -> {dst} ({len} bytes)"),
            Err(e) => write!(f, "<invalid IP packet: {e}>"),
        }
    }
}
