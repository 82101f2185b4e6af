//! Framing: converts a stream of bytes into a stream of `(header, payload)`
//! pairs, and vice versa.
//!
//! The decode loop peeks the header, checks the magic, checks the length,
//! slices, and advances, enforcing an explicit `max_packet_bytes` ceiling
//! instead of trusting the 32-bit length field unconditionally.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;

use crate::header::{Header, HEADER_SIZE, PACKET_MAGIC};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    #[error("header magic did not match the expected sentinel")]
    BadMagic,
    #[error("header length {0} is smaller than the header itself")]
    HeaderTooShort(u32),
    #[error("packet length {length} exceeds the configured maximum of {max}")]
    PacketTooLarge { length: u32, max: u32 },
}

/// Encodes one packet: a 12-byte header followed by `payload`.
pub fn encode_frame(id: u16, flags: u16, payload: &[u8]) -> BytesMut {
    let header = Header::new(id, flags, payload.len() as u32);
    let mut out = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    out
}

/// Attempts to slice one complete packet off the front of `buf`.
///
/// Returns `Ok(None)` when `buf` does not yet hold a full frame (the
/// caller should read more bytes from the socket and try again). On
/// success, the consumed bytes are removed from the front of `buf`.
pub fn decode_frame(
    buf: &mut BytesMut,
    max_packet_bytes: u32,
) -> Result<Option<(Header, Bytes)>, FramingError> {
    if buf.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header_bytes = [0u8; HEADER_SIZE];
    header_bytes.copy_from_slice(&buf[..HEADER_SIZE]);
    let header = Header::from_bytes(&header_bytes);

    if header.magic != PACKET_MAGIC {
        return Err(FramingError::BadMagic);
    }

    if header.length < HEADER_SIZE as u32 {
        return Err(FramingError::HeaderTooShort(header.length));
    }

    if header.length > max_packet_bytes {
        return Err(FramingError::PacketTooLarge {
            length: header.length,
            max: max_packet_bytes,
        });
    }

    if (buf.len() as u64) < header.length as u64 {
        return Ok(None);
    }

    let mut frame = buf.split_to(header.length as usize);
    frame.advance(HEADER_SIZE);
    let payload = frame.freeze();

    Ok(Some((header, payload)))
}
