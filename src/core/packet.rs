use crate::error::{ProtocolError, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Size of the big-endian length prefix
pub const HEADER_SIZE: usize = 4;

/// One length-prefixed unit on the wire.
///
/// The declared length always equals `payload.len()`; it is computed on
/// encode rather than stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub payload: Bytes,
}

impl Packet {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Read the length prefix without consuming anything.
    pub fn declared_len(buf: &[u8]) -> Result<usize> {
        let raw: [u8; HEADER_SIZE] = buf
            .get(..HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(ProtocolError::Incomplete {
                needed: HEADER_SIZE,
                available: buf.len(),
            })?;
        Ok(u32::from_be_bytes(raw) as usize)
    }

    /// Append the framed form of this packet to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) -> Result<()> {
        let len = u32::try_from(self.payload.len())
            .map_err(|_| ProtocolError::OversizedPacket(self.payload.len()))?;
        dst.reserve(HEADER_SIZE + self.payload.len());
        dst.put_u32(len);
        dst.put_slice(&self.payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_packet_layout() {
        let mut out = BytesMut::new();
        Packet::new(Bytes::from_static(b"c")).write_to(&mut out).unwrap();
        assert_eq!(&out[..], b"\0\0\0\x01c");
    }

    #[test]
    fn test_declared_len_ignores_trailing_data() {
        assert_eq!(Packet::declared_len(b"\0\0\0\x02hiextra").unwrap(), 2);
    }

    #[test]
    fn test_short_header_is_incomplete() {
        let err = Packet::declared_len(b"\0\0").unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn test_write_appends_to_existing_buffer() {
        let mut out = BytesMut::from(&b"\0\0\0\x01c"[..]);
        Packet::new(Bytes::from_static(b"r")).write_to(&mut out).unwrap();
        assert_eq!(&out[..], b"\0\0\0\x01c\0\0\0\x01r");
    }
}
