use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::frame::{decode_frame_address, encode_frame, Datagram, FrameLimits, FRAME_HEADER_LEN};
use crate::error::ProtocolError;

/// Datagram frame codec for use with `tokio_util::codec::Framed`.
///
/// Decoding is incremental: partial frames leave the buffer untouched and the
/// payload of a complete frame is split off without copying.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatagramCodec {
    limits: FrameLimits,
}

impl DatagramCodec {
    pub fn new(limits: FrameLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &FrameLimits {
        &self.limits
    }
}

impl Decoder for DatagramCodec {
    type Item = Datagram;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let header = [src[0], src[1], src[2], src[3]];
        let (address_len, payload_len) = self.limits.check_header(header)?;

        let frame_len = FRAME_HEADER_LEN + address_len + payload_len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_LEN);
        let address = src.split_to(address_len);
        let payload = src.split_to(payload_len).freeze();

        let destination = decode_frame_address(&address)?;
        Ok(Some(Datagram {
            destination,
            payload,
        }))
    }
}

impl Encoder<Datagram> for DatagramCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Datagram, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item.destination, &item.payload, &self.limits, dst)
    }
}
