//! Packet model: an identity plus an ordered sequence of typed fields,
//! expressed as a trait rather than a vtable.

use crate::serializer::{SerializeError, Serializer};

/// A typed, length-delimited message body.
///
/// Implementors contribute the three behaviors the wire format needs: an
/// id, an encode order, and a decode order. User packet ids must be
/// strictly greater than [`crate::header::ids::NUM_PRESET_IDS`].
pub trait Packet: Sized {
    /// This packet type's identity on the wire.
    fn id(&self) -> u16;

    /// Write this packet's fields, in order, to `ser`.
    fn encode(&self, ser: &mut Serializer);

    /// Read this packet's fields, in the same order they were written.
    fn decode(ser: &mut Serializer) -> Result<Self, SerializeError>;
}
