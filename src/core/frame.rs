//! # Datagram Framer
//!
//! One UDP datagram per frame, carried on a reliable byte stream.
//!
//! ## Wire Format
//! ```text
//! [AddrLen(2)] [PayloadLen(2)] [Address(AddrLen)] [Payload(PayloadLen)]
//! ```
//!
//! Both length fields are big-endian and precede the bytes they describe, so a
//! reader allocates exact buffers and detects truncation without scanning.
//!
//! ## Limits
//! - Address length must be non-zero and at most `max_address_size`
//! - Payload length may be zero and is at most `max_payload_size`
//! - Lengths are validated before any allocation

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::core::address::{Endpoint, MAX_ENCODED_ADDRESS_LEN};
use crate::error::{constants, FramePart, ProtocolError, Result};

/// Size of the two length fields
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload a 16-bit length field can describe
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// Per-frame size limits, enforced on both encode and decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    max_address_size: usize,
    max_payload_size: usize,
}

impl FrameLimits {
    /// Create limits, clamped to what the 16-bit length fields can carry.
    pub fn new(max_address_size: usize, max_payload_size: usize) -> Self {
        Self {
            max_address_size: max_address_size.min(MAX_FRAME_PAYLOAD),
            max_payload_size: max_payload_size.min(MAX_FRAME_PAYLOAD),
        }
    }

    pub fn max_address_size(&self) -> usize {
        self.max_address_size
    }

    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }

    fn check_encode(&self, address_len: usize, payload_len: usize) -> Result<()> {
        if address_len == 0 || address_len > self.max_address_size {
            return Err(ProtocolError::FrameTooLarge {
                part: FramePart::Address,
                size: address_len,
                max: self.max_address_size,
            });
        }
        if payload_len > self.max_payload_size {
            return Err(ProtocolError::FrameTooLarge {
                part: FramePart::Payload,
                size: payload_len,
                max: self.max_payload_size,
            });
        }
        Ok(())
    }

    /// Validate a decoded header, returning `(address_len, payload_len)`.
    pub(crate) fn check_header(&self, header: [u8; FRAME_HEADER_LEN]) -> Result<(usize, usize)> {
        let address_len = u16::from_be_bytes([header[0], header[1]]) as usize;
        let payload_len = u16::from_be_bytes([header[2], header[3]]) as usize;

        if address_len == 0 {
            return Err(ProtocolError::InvalidFrame(constants::ERR_EMPTY_ADDRESS.into()));
        }
        if address_len > self.max_address_size {
            return Err(ProtocolError::InvalidFrame(format!(
                "address length {address_len} exceeds {}",
                self.max_address_size
            )));
        }
        if payload_len > self.max_payload_size {
            return Err(ProtocolError::InvalidFrame(format!(
                "payload length {payload_len} exceeds {}",
                self.max_payload_size
            )));
        }
        Ok((address_len, payload_len))
    }
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self::new(MAX_ENCODED_ADDRESS_LEN, MAX_FRAME_PAYLOAD)
    }
}

/// One datagram as carried by a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Destination (when sending) or source (when relayed back) of the datagram
    pub destination: Endpoint,
    pub payload: Bytes,
}

impl Datagram {
    pub fn new(destination: Endpoint, payload: impl Into<Bytes>) -> Self {
        Self {
            destination,
            payload: payload.into(),
        }
    }

    /// Total bytes this datagram occupies on the wire
    pub fn frame_len(&self) -> usize {
        FRAME_HEADER_LEN + self.destination.encoded_len() + self.payload.len()
    }
}

impl fmt::Display for Datagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.destination, self.payload.len())
    }
}

/// Append one complete frame to `buf`.
#[allow(clippy::cast_possible_truncation)] // lengths bounded by FrameLimits
pub fn encode_frame(
    destination: &Endpoint,
    payload: &[u8],
    limits: &FrameLimits,
    buf: &mut BytesMut,
) -> Result<()> {
    let address_len = destination.encoded_len();
    limits.check_encode(address_len, payload.len())?;

    buf.reserve(FRAME_HEADER_LEN + address_len + payload.len());
    buf.put_u16(address_len as u16);
    buf.put_u16(payload.len() as u16);
    destination.encode(buf);
    buf.put_slice(payload);
    Ok(())
}

/// Decode the address portion of a frame, wrapping failures with context.
///
/// Bytes after a complete address but still inside `addrLen` are ignored, so
/// peers that pad the address field stay interoperable.
pub(crate) fn decode_frame_address(address: &[u8]) -> Result<Endpoint> {
    let (endpoint, consumed) = Endpoint::decode(address).map_err(|e| match e {
        ProtocolError::InvalidAddress(msg) => {
            ProtocolError::InvalidAddress(format!("decode address: {msg}"))
        }
        other => other,
    })?;
    if consumed != address.len() {
        trace!(
            destination = %endpoint,
            ignored = address.len() - consumed,
            "Ignoring trailing address bytes"
        );
    }
    Ok(endpoint)
}

/// Write a single datagram frame with the default limits.
pub async fn write_datagram<W>(writer: &mut W, destination: &Endpoint, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_datagram_with_limits(writer, destination, payload, &FrameLimits::default()).await
}

/// Write a single datagram frame.
///
/// The frame is assembled in memory and handed to the stream in one
/// `write_all`. Callers sharing a stream must still serialize writers.
pub async fn write_datagram_with_limits<W>(
    writer: &mut W,
    destination: &Endpoint,
    payload: &[u8],
    limits: &FrameLimits,
) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = BytesMut::new();
    encode_frame(destination, payload, limits, &mut buf)?;

    writer.write_all(&buf).await?;
    writer.flush().await?;
    trace!(destination = %destination, bytes = payload.len(), "Datagram frame written");
    Ok(())
}

/// Read a single datagram frame with the default limits.
pub async fn read_datagram<R>(reader: &mut R) -> Result<Datagram>
where
    R: AsyncRead + Unpin + ?Sized,
{
    read_datagram_with_limits(reader, &FrameLimits::default()).await
}

/// Read a single datagram frame.
///
/// The whole frame is consumed before the address is decoded, so an
/// `InvalidAddress` error leaves the stream positioned at the next frame.
/// Stream errors, including end-of-file, propagate as `Io`.
pub async fn read_datagram_with_limits<R>(reader: &mut R, limits: &FrameLimits) -> Result<Datagram>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let (address_len, payload_len) = limits.check_header(header)?;

    let mut body = BytesMut::zeroed(address_len + payload_len);
    reader.read_exact(&mut body).await?;
    let address = body.split_to(address_len);
    let payload = body.freeze();

    let destination = decode_frame_address(&address)?;
    trace!(destination = %destination, bytes = payload_len, "Datagram frame read");
    Ok(Datagram {
        destination,
        payload,
    })
}
