//! Length-prefixed framing for milter streams.
//!
//! [`PacketCodec`] is a tokio-util codec and can drive a `Framed` transport
//! directly. [`Framer`] wraps the same decoder around an owned buffer for the
//! session loop, which reads fixed-size chunks itself.

use crate::config::MAX_PAYLOAD_SIZE;
use crate::core::packet::{Packet, HEADER_SIZE};
use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct PacketCodec {
    max_payload_size: usize,
}

impl PacketCodec {
    pub fn new(max_payload_size: usize) -> Self {
        Self { max_payload_size }
    }
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD_SIZE)
    }
}

impl Decoder for PacketCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let len = match Packet::declared_len(src) {
            Ok(len) => len,
            Err(e) if e.is_incomplete() => return Ok(None),
            Err(e) => return Err(e),
        };

        if len > self.max_payload_size {
            warn!(
                declared = len,
                limit = self.max_payload_size,
                "{}",
                constants::ERR_OVERSIZED_PACKET
            );
            return Err(ProtocolError::OversizedPacket(len));
        }

        if src.len() < HEADER_SIZE + len {
            src.reserve(HEADER_SIZE + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Bytes> for PacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        Packet::new(item).write_to(dst)
    }
}

/// Accumulates raw transport bytes and yields complete message bodies.
#[derive(Debug, Default)]
pub struct Framer {
    codec: PacketCodec,
    buffer: BytesMut,
}

impl Framer {
    pub fn new(max_payload_size: usize) -> Self {
        Self {
            codec: PacketCodec::new(max_payload_size),
            buffer: BytesMut::new(),
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete body, or `None` when more bytes are needed.
    ///
    /// The buffer is left untouched when no complete packet is present.
    pub fn try_extract(&mut self) -> Result<Option<Bytes>> {
        self.codec.decode(&mut self.buffer)
    }

    /// Bytes buffered but not yet extracted.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_partial_header_needs_more() {
        let mut framer = Framer::default();
        framer.feed(&[0, 0]);
        assert!(framer.try_extract().unwrap().is_none());
        assert_eq!(framer.pending(), 2);
    }

    #[test]
    fn test_partial_body_leaves_buffer_untouched() {
        let mut framer = Framer::default();
        framer.feed(b"\0\0\0\x03ab");
        assert!(framer.try_extract().unwrap().is_none());
        assert_eq!(framer.pending(), 6);

        framer.feed(b"c");
        assert_eq!(&framer.try_extract().unwrap().unwrap()[..], b"abc");
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_multiple_packets_in_one_feed() {
        let mut framer = Framer::default();
        framer.feed(b"\0\0\0\x01A\0\0\0\x01Q");
        assert_eq!(&framer.try_extract().unwrap().unwrap()[..], b"A");
        assert_eq!(&framer.try_extract().unwrap().unwrap()[..], b"Q");
        assert!(framer.try_extract().unwrap().is_none());
    }

    #[test]
    fn test_zero_length_body_is_extracted() {
        let mut framer = Framer::default();
        framer.feed(&[0, 0, 0, 0]);
        assert_eq!(framer.try_extract().unwrap().unwrap().len(), 0);
    }

    #[test]
    fn test_limit_enforced() {
        let mut framer = Framer::new(8);
        framer.feed(&[0, 0, 0, 9]);
        assert!(matches!(
            framer.try_extract(),
            Err(ProtocolError::OversizedPacket(9))
        ));
    }

    #[test]
    fn test_encoder_prefixes_length() {
        let mut codec = PacketCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"r"), &mut dst).unwrap();
        assert_eq!(&dst[..], b"\0\0\0\x01r");
    }
}
