// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Raw IP packet header access
//!
//! [`IpPacket`] interprets a buffer holding one IP datagram, starting at byte 0 of the IP header,
//! and exposes the fields a NAT needs: the IP version, the total length, and the source and
//! destination addresses. Only the fixed part of the header is interpreted. IPv4 options and IPv6
//! extension headers are opaque payload as far as this module is concerned.
//!
//! | Version | Header | Source   | Destination | Length field              |
//! |---------|--------|----------|-------------|---------------------------|
//! | 4       | 20     | `12..16` | `16..20`    | `2..4`, total length      |
//! | 6       | 40     | `8..24`  | `24..40`    | `4..6`, payload length    |

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::Range;
use tracing::trace;

mod display;
mod stream;

pub use stream::{StreamError, read_ip_packet, write_ip_packet};

/// Length of the fixed IPv4 header (no options)
pub const IPV4_HEADER_LEN: usize = 20;

/// Length of the fixed IPv6 header (no extension headers)
pub const IPV6_HEADER_LEN: usize = 40;

/// Number of leading bytes that tell both the version and the total length of a packet, for
/// either IPv4 or IPv6.
pub const MIN_PROBE_LEN: usize = 6;

/// IP version of a packet, as read from the high nibble of its first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
pub enum IpVersion {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl IpVersion {
    /// Length of the fixed header for this version, in bytes
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self {
            IpVersion::V4 => IPV4_HEADER_LEN,
            IpVersion::V6 => IPV6_HEADER_LEN,
        }
    }

    /// Width of an address for this version, in bytes
    #[must_use]
    pub const fn addr_len(self) -> usize {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 16,
        }
    }

    /// Value of the version nibble
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }

    const fn addr_range(self, role: AddrRole) -> Range<usize> {
        match (self, role) {
            (IpVersion::V4, AddrRole::Source) => 12..16,
            (IpVersion::V4, AddrRole::Destination) => 16..20,
            (IpVersion::V6, AddrRole::Source) => 8..24,
            (IpVersion::V6, AddrRole::Destination) => 24..40,
        }
    }

    // Offset of the 16-bit length field (total length for IPv4, payload length for IPv6)
    const fn length_offset(self) -> usize {
        match self {
            IpVersion::V4 => 2,
            IpVersion::V6 => 4,
        }
    }
}

impl TryFrom<u8> for IpVersion {
    type Error = IpPacketError;

    fn try_from(version: u8) -> Result<Self, Self::Error> {
        match version {
            4 => Ok(IpVersion::V4),
            6 => Ok(IpVersion::V6),
            other => Err(IpPacketError::BadVersion(other)),
        }
    }
}

/// Which of the two address fields of a header to access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(any(test, feature = "bolero"), derive(bolero::TypeGenerator))]
pub enum AddrRole {
    /// Source address
    Source,
    /// Destination address
    Destination,
}

/// Errors from reading or writing IP header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IpPacketError {
    /// The buffer is shorter than the header region needed for the operation
    #[error("IP packet too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Number of bytes the operation needs
        expected: usize,
        /// Number of bytes available
        actual: usize,
    },
    /// The version nibble is neither 4 nor 6
    #[error("unsupported IP version {0}")]
    BadVersion(u8),
    /// The supplied address is narrower than the packet's address fields
    #[error("invalid address for this packet: expected at least {expected} bytes, got {actual}")]
    InvalidAddr {
        /// Address width of the packet's IP version
        expected: usize,
        /// Width of the supplied address
        actual: usize,
    },
}

/// An IP packet backed by a caller-supplied buffer
///
/// `B` is typically `&[u8]` for read-only access, `&mut [u8]` for in-place rewrites, or `Vec<u8>`
/// for packets produced by [`read_ip_packet`]. No attribute of the packet is cached: every accessor
/// decodes the buffer as it currently is.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpPacket<B>(B);

impl<B> IpPacket<B> {
    /// Wrap a buffer. The buffer is not validated until a field is accessed.
    pub const fn new(buf: B) -> Self {
        Self(buf)
    }

    /// Give back the wrapped buffer
    pub fn into_inner(self) -> B {
        self.0
    }
}

impl<B: AsRef<[u8]>> IpPacket<B> {
    /// The raw bytes of the packet
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Length of the underlying buffer (not the length declared in the header)
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns true if the underlying buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Returns the version nibble of the packet, or 0 for an empty buffer.
    ///
    /// The value is not validated, see [`IpPacket::ip_version`] for that.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.as_bytes().first().map_or(0, |byte| byte >> 4)
    }

    /// Returns the IP version of the packet.
    ///
    /// # Errors
    ///
    /// Returns [`IpPacketError::BadVersion`] if the version nibble is neither 4 nor 6 (or if the
    /// buffer is empty).
    pub fn ip_version(&self) -> Result<IpVersion, IpPacketError> {
        IpVersion::try_from(self.version())
    }

    fn header(&self) -> Result<(IpVersion, &[u8]), IpPacketError> {
        let version = self.ip_version()?;
        let bytes = self.as_bytes();
        let header_len = version.header_len();
        if bytes.len() < header_len {
            return Err(IpPacketError::TooShort {
                expected: header_len,
                actual: bytes.len(),
            });
        }
        Ok((version, &bytes[..header_len]))
    }

    /// Returns a copy of the source or destination address of the packet.
    ///
    /// # Errors
    ///
    /// Returns [`IpPacketError::BadVersion`] for a version other than 4 or 6, and
    /// [`IpPacketError::TooShort`] if the buffer does not hold the complete fixed header.
    pub fn addr(&self, role: AddrRole) -> Result<IpAddr, IpPacketError> {
        let (version, header) = self.header()?;
        let field = &header[version.addr_range(role)];
        let addr = match version {
            IpVersion::V4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(field);
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            IpVersion::V6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(field);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
        };
        Ok(addr)
    }

    /// Returns a copy of the source address of the packet.
    ///
    /// # Errors
    ///
    /// See [`IpPacket::addr`].
    pub fn src_addr(&self) -> Result<IpAddr, IpPacketError> {
        self.addr(AddrRole::Source)
    }

    /// Returns a copy of the destination address of the packet.
    ///
    /// # Errors
    ///
    /// See [`IpPacket::addr`].
    pub fn dst_addr(&self) -> Result<IpAddr, IpPacketError> {
        self.addr(AddrRole::Destination)
    }

    /// Returns the total length of the datagram as declared by its header, in bytes.
    ///
    /// For IPv4 this is the total length field. For IPv6 this is the payload length field plus the
    /// 40 bytes of the fixed header.
    ///
    /// # Errors
    ///
    /// Returns [`IpPacketError::BadVersion`] for a version other than 4 or 6, and
    /// [`IpPacketError::TooShort`] if the buffer ends before the length field does.
    pub fn total_len(&self) -> Result<usize, IpPacketError> {
        let version = self.ip_version()?;
        let bytes = self.as_bytes();
        let offset = version.length_offset();
        if bytes.len() < offset + 2 {
            return Err(IpPacketError::TooShort {
                expected: offset + 2,
                actual: bytes.len(),
            });
        }
        let field = usize::from(u16::from_be_bytes([bytes[offset], bytes[offset + 1]]));
        match version {
            IpVersion::V4 => Ok(field),
            IpVersion::V6 => Ok(field + IPV6_HEADER_LEN),
        }
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> IpPacket<B> {
    /// The raw bytes of the packet, mutably
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.0.as_mut()
    }

    /// Overwrite the source or destination address field with the given octets.
    ///
    /// `octets` may be wider than the packet's address width, in which case its trailing
    /// (low-order) bytes are written. This makes it possible to pass a 16-byte IPv4-mapped IPv6
    /// address to an IPv4 packet. Neither the IPv4 header checksum nor any transport checksum is
    /// updated.
    ///
    /// # Errors
    ///
    /// Returns [`IpPacketError::BadVersion`] for a version other than 4 or 6,
    /// [`IpPacketError::TooShort`] if the buffer does not hold the complete fixed header, and
    /// [`IpPacketError::InvalidAddr`] if `octets` is narrower than the packet's address width.
    pub fn set_addr_octets(&mut self, role: AddrRole, octets: &[u8]) -> Result<(), IpPacketError> {
        let version = self.ip_version()?;
        let header_len = version.header_len();
        if self.len() < header_len {
            return Err(IpPacketError::TooShort {
                expected: header_len,
                actual: self.len(),
            });
        }
        let width = version.addr_len();
        if octets.len() < width {
            return Err(IpPacketError::InvalidAddr {
                expected: width,
                actual: octets.len(),
            });
        }
        let low_order = &octets[octets.len() - width..];
        self.as_bytes_mut()[version.addr_range(role)].copy_from_slice(low_order);
        trace!("rewrote {role} address of {version} packet");
        Ok(())
    }

    /// Overwrite the source or destination address field.
    ///
    /// An IPv6 address written to an IPv4 packet contributes its last four bytes, so that an
    /// IPv4-mapped address (`::ffff:a.b.c.d`) writes `a.b.c.d`.
    ///
    /// # Errors
    ///
    /// See [`IpPacket::set_addr_octets`]. An IPv4 address given for an IPv6 packet is rejected
    /// with [`IpPacketError::InvalidAddr`].
    pub fn set_addr(&mut self, role: AddrRole, addr: IpAddr) -> Result<(), IpPacketError> {
        match addr {
            IpAddr::V4(addr) => self.set_addr_octets(role, &addr.octets()),
            IpAddr::V6(addr) => self.set_addr_octets(role, &addr.octets()),
        }
    }

    /// Overwrite the source address field.
    ///
    /// # Errors
    ///
    /// See [`IpPacket::set_addr`].
    pub fn set_src_addr(&mut self, addr: IpAddr) -> Result<(), IpPacketError> {
        self.set_addr(AddrRole::Source, addr)
    }

    /// Overwrite the destination address field.
    ///
    /// # Errors
    ///
    /// See [`IpPacket::set_addr`].
    pub fn set_dst_addr(&mut self, addr: IpAddr) -> Result<(), IpPacketError> {
        self.set_addr(AddrRole::Destination, addr)
    }
}

impl<B: AsRef<[u8]>> AsRef<[u8]> for IpPacket<B> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn addr(ip: &str) -> IpAddr {
        IpAddr::from_str(ip).unwrap()
    }

    fn ipv4_packet() -> [u8; IPV4_HEADER_LEN] {
        let mut buf = [0u8; IPV4_HEADER_LEN];
        buf[0] = 0x45;
        buf[12..16].copy_from_slice(&[0xc0, 0xa8, 0x00, 0x01]);
        buf[16..20].copy_from_slice(&[0xc0, 0xa8, 0x00, 0x02]);
        buf
    }

    fn ipv6_packet() -> [u8; IPV6_HEADER_LEN] {
        let mut buf = [0u8; IPV6_HEADER_LEN];
        buf[0] = 0x60;
        buf[8] = 0xfd;
        buf[23] = 0x01;
        buf[24] = 0xfd;
        buf[39] = 0x02;
        buf
    }

    #[test]
    fn test_ipv4_get_set() {
        let mut buf = ipv4_packet();
        let mut packet = IpPacket::new(&mut buf[..]);

        assert_eq!(packet.version(), 4);
        assert_eq!(packet.src_addr().unwrap(), addr("192.168.0.1"));
        assert_eq!(packet.dst_addr().unwrap(), addr("192.168.0.2"));

        packet.set_src_addr(addr("192.168.0.3")).unwrap();
        packet.set_dst_addr(addr("192.168.0.4")).unwrap();
        assert_eq!(buf[15], 0x03);
        assert_eq!(buf[19], 0x04);
        assert_eq!(&buf[12..15], &[0xc0, 0xa8, 0x00]);
    }

    #[test]
    fn test_ipv6_get_set() {
        let mut buf = ipv6_packet();
        let mut packet = IpPacket::new(&mut buf[..]);

        assert_eq!(packet.version(), 6);
        assert_eq!(packet.src_addr().unwrap(), addr("fd00::1"));
        assert_eq!(packet.dst_addr().unwrap(), addr("fd00::2"));

        packet.set_src_addr(addr("fd00::3")).unwrap();
        packet.set_dst_addr(addr("fd00::4")).unwrap();
        assert_eq!(buf[23], 0x03);
        assert_eq!(buf[39], 0x04);
    }

    #[test]
    fn test_version() {
        assert_eq!(IpPacket::new(&[0u8; 0][..]).version(), 0);
        assert_eq!(IpPacket::new(&[0x45u8][..]).version(), 4);
        assert_eq!(IpPacket::new(&[0x60u8][..]).version(), 6);
        assert_eq!(IpPacket::new(&[0x5fu8][..]).version(), 5);

        assert_eq!(
            IpPacket::new(&[0u8; 0][..]).ip_version(),
            Err(IpPacketError::BadVersion(0))
        );
        assert_eq!(IpPacket::new(&[0x45u8][..]).ip_version(), Ok(IpVersion::V4));
        assert_eq!(IpPacket::new(&[0x60u8][..]).ip_version(), Ok(IpVersion::V6));
    }

    #[test]
    fn test_bad_version() {
        let mut buf = [0u8; IPV6_HEADER_LEN];
        buf[0] = 0x50;
        let mut packet = IpPacket::new(&mut buf[..]);
        assert_eq!(packet.src_addr(), Err(IpPacketError::BadVersion(5)));
        assert_eq!(packet.total_len(), Err(IpPacketError::BadVersion(5)));
        assert_eq!(
            packet.set_dst_addr(addr("10.0.0.1")),
            Err(IpPacketError::BadVersion(5))
        );
    }

    #[test]
    fn test_too_short() {
        let buf = ipv4_packet();
        let packet = IpPacket::new(&buf[..19]);
        assert_eq!(
            packet.src_addr(),
            Err(IpPacketError::TooShort {
                expected: 20,
                actual: 19
            })
        );

        let mut buf = ipv6_packet();
        let mut packet = IpPacket::new(&mut buf[..39]);
        assert_eq!(
            packet.set_dst_addr(addr("fd00::9")),
            Err(IpPacketError::TooShort {
                expected: 40,
                actual: 39
            })
        );
        assert_eq!(
            packet.dst_addr(),
            Err(IpPacketError::TooShort {
                expected: 40,
                actual: 39
            })
        );
    }

    #[test]
    fn test_set_addr_width() {
        // IPv4 address is too narrow for an IPv6 header
        let mut buf = ipv6_packet();
        let mut packet = IpPacket::new(&mut buf[..]);
        assert_eq!(
            packet.set_src_addr(addr("192.168.0.1")),
            Err(IpPacketError::InvalidAddr {
                expected: 16,
                actual: 4
            })
        );
        assert_eq!(packet.src_addr().unwrap(), addr("fd00::1"));

        // IPv4-mapped IPv6 address into an IPv4 header: the low-order bytes are written
        let mut buf = ipv4_packet();
        let mut packet = IpPacket::new(&mut buf[..]);
        packet.set_src_addr(addr("::ffff:10.1.2.3")).unwrap();
        assert_eq!(packet.src_addr().unwrap(), addr("10.1.2.3"));

        assert_eq!(
            packet.set_addr_octets(AddrRole::Destination, &[10, 1, 2]),
            Err(IpPacketError::InvalidAddr {
                expected: 4,
                actual: 3
            })
        );
        packet
            .set_addr_octets(AddrRole::Destination, &[0xff, 0xff, 10, 9, 8, 7])
            .unwrap();
        assert_eq!(packet.dst_addr().unwrap(), addr("10.9.8.7"));
    }

    #[test]
    fn test_read_addr_is_a_copy() {
        let mut buf = ipv4_packet();
        let mut packet = IpPacket::new(&mut buf[..]);
        let before = packet.src_addr().unwrap();
        packet.set_src_addr(addr("172.16.0.1")).unwrap();
        assert_eq!(before, addr("192.168.0.1"));
        assert_eq!(packet.src_addr().unwrap(), addr("172.16.0.1"));
    }

    #[test]
    fn test_total_len() {
        let mut buf = ipv4_packet();
        buf[2] = 0x01;
        buf[3] = 0x19;
        assert_eq!(IpPacket::new(&buf[..]).total_len(), Ok(0x119));
        // The length field is all that is needed
        assert_eq!(IpPacket::new(&buf[..4]).total_len(), Ok(0x119));
        assert_eq!(
            IpPacket::new(&buf[..3]).total_len(),
            Err(IpPacketError::TooShort {
                expected: 4,
                actual: 3
            })
        );

        let mut buf = ipv6_packet();
        buf[4] = 0x02;
        buf[5] = 0x05;
        assert_eq!(IpPacket::new(&buf[..]).total_len(), Ok(0x205 + 40));
        assert_eq!(IpPacket::new(&buf[..6]).total_len(), Ok(0x205 + 40));
        assert_eq!(
            IpPacket::new(&buf[..5]).total_len(),
            Err(IpPacketError::TooShort {
                expected: 6,
                actual: 5
            })
        );
    }

    #[test]
    fn ipv4_addr_round_trip() {
        bolero::check!().with_type().for_each(
            |(role, header, octets): &(AddrRole, [u8; IPV4_HEADER_LEN], [u8; 4])| {
                let mut buf = *header;
                buf[0] = 0x40 | (buf[0] & 0x0f);
                let mut packet = IpPacket::new(&mut buf[..]);
                let other = match role {
                    AddrRole::Source => AddrRole::Destination,
                    AddrRole::Destination => AddrRole::Source,
                };
                let untouched = packet.addr(other).unwrap();
                let addr = IpAddr::V4(Ipv4Addr::from(*octets));
                packet.set_addr(*role, addr).unwrap();
                assert_eq!(packet.addr(*role).unwrap(), addr);
                assert_eq!(packet.addr(other).unwrap(), untouched);
            },
        );
    }

    #[test]
    fn ipv6_addr_round_trip() {
        bolero::check!().with_type().for_each(
            |(role, header, octets): &(AddrRole, [u8; IPV6_HEADER_LEN], [u8; 16])| {
                let mut buf = *header;
                buf[0] = 0x60 | (buf[0] & 0x0f);
                let mut packet = IpPacket::new(&mut buf[..]);
                let addr = IpAddr::V6(Ipv6Addr::from(*octets));
                packet.set_addr(*role, addr).unwrap();
                assert_eq!(packet.addr(*role).unwrap(), addr);
                // Everything outside of the address field is left alone
                let range = IpVersion::V6.addr_range(*role);
                for (i, (after, before)) in buf.iter().zip(header.iter()).enumerate().skip(1) {
                    if !range.contains(&i) {
                        assert_eq!(after, before);
                    }
                }
            },
        );
    }

    #[test]
    fn arbitrary_bytes_never_panic() {
        bolero::check!()
            .with_type()
            .for_each(|(role, bytes): &(AddrRole, Vec<u8>)| {
                let mut buf = bytes.clone();
                let mut packet = IpPacket::new(buf.as_mut_slice());
                let version = packet.ip_version();
                match packet.addr(*role) {
                    Ok(IpAddr::V4(_)) => assert!(bytes.len() >= IPV4_HEADER_LEN),
                    Ok(IpAddr::V6(_)) => assert!(bytes.len() >= IPV6_HEADER_LEN),
                    Err(IpPacketError::TooShort { expected, actual }) => {
                        assert_eq!(actual, bytes.len());
                        assert!(actual < expected);
                    }
                    Err(IpPacketError::BadVersion(v)) => {
                        assert!(version.is_err() && v != 4 && v != 6);
                    }
                    Err(e @ IpPacketError::InvalidAddr { .. }) => unreachable!("{e:?}"),
                }
                let _ = packet.total_len();
                let _ = packet.set_addr(*role, IpAddr::V6(Ipv6Addr::LOCALHOST));
                assert_eq!(packet.len(), bytes.len());
            });
    }
}
