// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Packet framing over byte streams
//!
//! A tunnel device or a multiplexed socket delivers IP packets back to back with no framing of
//! their own: the only way to find the end of a packet is its header. [`read_ip_packet`] probes
//! the first [`MIN_PROBE_LEN`] bytes for the version and total length, then reads exactly the rest
//! of the datagram, leaving the stream positioned at the first byte of the next packet.

use super::{IpPacket, IpPacketError, MIN_PROBE_LEN};
use std::io::{self, Read, Write};
use tracing::{trace, warn};

/// Errors from reading or writing packets on a byte stream
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The underlying stream failed, including a clean end of stream
    /// ([`io::ErrorKind::UnexpectedEof`]). The error is passed through unchanged.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The stream produced bytes that do not start a valid IP packet
    #[error(transparent)]
    Packet(#[from] IpPacketError),
}

impl StreamError {
    /// Returns true if the stream ended, cleanly or not, before a full packet could be read
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, StreamError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

// Total length declared by the probe bytes, rejected if it cannot even cover the fixed header
fn declared_len(probe: &[u8]) -> Result<usize, IpPacketError> {
    let probe = IpPacket::new(probe);
    let version = probe.ip_version()?;
    let total_len = probe.total_len()?;
    if total_len < version.header_len() {
        return Err(IpPacketError::TooShort {
            expected: version.header_len(),
            actual: total_len,
        });
    }
    Ok(total_len)
}

/// Read exactly one IP packet from `reader`.
///
/// No byte past the end of the packet is consumed, so consecutive calls on the same reader return
/// consecutive packets.
///
/// # Errors
///
/// Returns [`StreamError::Io`] with the reader's own error if the reader fails or ends before the
/// packet is complete; a truncated packet is never returned. Returns [`StreamError::Packet`] if the
/// probed bytes carry an unsupported version, or declare a total length shorter than the fixed
/// header of their version. In the latter case the declared length is still consumed from the
/// reader (unless it is shorter than the probe itself), so the next call reads the following
/// packet.
pub fn read_ip_packet<R: Read + ?Sized>(reader: &mut R) -> Result<IpPacket<Vec<u8>>, StreamError> {
    let mut buf = vec![0u8; MIN_PROBE_LEN];
    reader.read_exact(&mut buf)?;
    let total_len = match declared_len(&buf) {
        Ok(total_len) => total_len,
        Err(e) => {
            warn!("Cannot frame IP packet from stream: {e}");
            // Skip what is left of the datagram, so that the next call starts on a packet boundary
            let rest = match e {
                IpPacketError::TooShort { actual, .. } => actual.saturating_sub(MIN_PROBE_LEN),
                _ => 0,
            };
            reader.read_exact(&mut vec![0u8; rest])?;
            return Err(e.into());
        }
    };
    buf.resize(total_len, 0);
    reader.read_exact(&mut buf[MIN_PROBE_LEN..])?;
    trace!("Read {total_len} byte IP packet from stream");
    Ok(IpPacket::new(buf))
}

/// Write the datagram held by `packet` to `writer`.
///
/// Exactly the number of bytes declared by the header is written, so trailing bytes of the buffer
/// that are not part of the datagram are left out.
///
/// # Errors
///
/// Returns [`StreamError::Packet`] if the header cannot be decoded or the buffer holds fewer
/// bytes than the header declares, and [`StreamError::Io`] with the writer's own error if writing
/// fails.
pub fn write_ip_packet<W: Write + ?Sized, B: AsRef<[u8]>>(
    writer: &mut W,
    packet: &IpPacket<B>,
) -> Result<(), StreamError> {
    let total_len = packet.total_len()?;
    let bytes = packet.as_bytes();
    if bytes.len() < total_len {
        return Err(IpPacketError::TooShort {
            expected: total_len,
            actual: bytes.len(),
        }
        .into());
    }
    writer.write_all(&bytes[..total_len])?;
    trace!("Wrote {total_len} byte IP packet to stream");
    Ok(())
}
