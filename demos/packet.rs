//! The demo packet shared by `client_main` and `server_main`: one `u16`,
//! one array of `u8`, one array of strings. Illustrative only — not part
//! of the library.

use async_connect::{Packet, SerializeError, Serializer};

/// Wire id for this demo packet. `num_preset_ids` is 4, so this is the
/// first valid user id.
pub const ID_EXAMPLE: u16 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamplePacket {
    pub some_short: u16,
    pub some_array: Vec<u8>,
    pub some_string_array: Vec<String>,
}

impl Packet for ExamplePacket {
    fn id(&self) -> u16 {
        ID_EXAMPLE
    }

    fn encode(&self, ser: &mut Serializer) {
        ser.write_scalar(self.some_short);
        ser.write_array(&self.some_array);
        ser.write_str_array(&self.some_string_array);
    }

    fn decode(ser: &mut Serializer) -> Result<Self, SerializeError> {
        Ok(ExamplePacket {
            some_short: ser.read_scalar()?,
            some_array: ser.read_array()?,
            some_string_array: ser.read_string_array()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_wire_layout() {
        let packet = ExamplePacket {
            some_short: 128,
            some_array: vec![1, 2, 3, 4, 5],
            some_string_array: vec!["Hello".into(), "from".into(), "client!".into()],
        };

        let mut ser = Serializer::new();
        packet.encode(&mut ser);

        let mut reader = Serializer::new();
        reader.assign_buffer(ser.as_bytes());
        assert_eq!(ExamplePacket::decode(&mut reader).unwrap(), packet);
    }
}
