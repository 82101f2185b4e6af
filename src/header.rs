//! The 12-byte wire header shared by every packet on the stream.

/// Sentinel that identifies a well-formed header.
///
/// Pinned to the little-endian byte order of the bytes `F`, `I`, `0`, `0`
/// rather than relying on an implementation-defined multi-character literal.
pub const PACKET_MAGIC: u32 = 0x3030_4946;

/// Size in bytes of a header on the wire.
pub const HEADER_SIZE: usize = 12;

/// The read-chunk size used by the receiver loop. Distinct from
/// `max_packet_bytes`, which bounds an individual frame.
pub const RECV_CHUNK_BYTES: usize = 4096;

/// Default cap on a single packet's total length (header + payload).
pub const DEFAULT_MAX_PACKET_BYTES: u32 = 1024 * 1024;

/// Closed set of reserved packet identities. User packet ids are any value
/// strictly greater than [`NUM_PRESET_IDS`].
pub mod ids {
    /// Never appears on the wire.
    pub const ID_NONE: u16 = 0;
    pub const ID_HANDSHAKE: u16 = 1;
    pub const ID_HEARTBEAT: u16 = 2;
    pub const ID_DISCONNECT: u16 = 3;
    /// Sentinel: user ids are `> NUM_PRESET_IDS`. Whether `id ==
    /// NUM_PRESET_IDS` itself is valid is left unspecified; this crate
    /// treats it as reserved and never assigns it.
    pub const NUM_PRESET_IDS: u16 = 4;
}

/// Flag bits, combinable by bitwise OR.
pub mod flags {
    pub const FL_NONE: u16 = 0;
    pub const FL_HANDSHAKE_CLIENT: u16 = 1 << 0;
    pub const FL_HANDSHAKE_SERVER: u16 = 1 << 1;
    pub const FL_HEARTBEAT: u16 = 1 << 2;
    pub const FL_DISCONNECT: u16 = 1 << 3;
}

/// A decoded wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub id: u16,
    pub flags: u16,
    /// Total packet length, including this 12-byte header.
    pub length: u32,
}

impl Header {
    pub fn new(id: u16, flags: u16, payload_len: u32) -> Self {
        Header {
            magic: PACKET_MAGIC,
            id,
            flags,
            length: HEADER_SIZE as u32 + payload_len,
        }
    }

    /// A header-only packet (handshake, heartbeat, disconnect) carries no
    /// payload; its `length` is exactly [`HEADER_SIZE`].
    pub fn header_only(id: u16, flags: u16) -> Self {
        Header::new(id, flags, 0)
    }

    pub fn is_magic_valid(&self) -> bool {
        self.magic == PACKET_MAGIC
    }

    /// Encode this header to exactly [`HEADER_SIZE`] little-endian bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..6].copy_from_slice(&self.id.to_le_bytes());
        out[6..8].copy_from_slice(&self.flags.to_le_bytes());
        out[8..12].copy_from_slice(&self.length.to_le_bytes());
        out
    }

    /// Decode a header from exactly [`HEADER_SIZE`] bytes.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Self {
        Header {
            magic: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            id: u16::from_le_bytes(buf[4..6].try_into().unwrap()),
            flags: u16::from_le_bytes(buf[6..8].try_into().unwrap()),
            length: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let header = Header::new(42, flags::FL_NONE, 7);
        let bytes = header.to_bytes();
        assert_eq!(Header::from_bytes(&bytes), header);
    }

    #[test]
    fn header_only_has_no_payload() {
        let header = Header::header_only(ids::ID_HEARTBEAT, flags::FL_HEARTBEAT);
        assert_eq!(header.length, HEADER_SIZE as u32);
    }

    #[test]
    fn magic_is_pinned_little_endian_fi00() {
        assert_eq!(PACKET_MAGIC.to_le_bytes(), *b"FI00");
    }
}
