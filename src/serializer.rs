//! Cursor-based encoder/decoder for packet bodies: arithmetic scalars and
//! arrays are written as raw little-endian bytes, strings and string
//! arrays are length-prefixed. Every read is bounds-checked against the
//! buffer that was handed in.

use bytes::BytesMut;
use thiserror::Error;

/// A fixed-width arithmetic type that can be written and read as raw
/// little-endian bytes. Implemented for the built-in integer and float
/// types.
pub trait Scalar: Copy + Sized + 'static {
    const WIDTH: usize;

    fn write_le(&self, out: &mut BytesMut);
    fn read_le(buf: &[u8]) -> Self;
}

macro_rules! impl_scalar {
    ($t:ty, $width:expr) => {
        impl Scalar for $t {
            const WIDTH: usize = $width;

            fn write_le(&self, out: &mut BytesMut) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(buf: &[u8]) -> Self {
                let mut arr = [0u8; $width];
                arr.copy_from_slice(&buf[..$width]);
                <$t>::from_le_bytes(arr)
            }
        }
    };
}

impl_scalar!(u8, 1);
impl_scalar!(u16, 2);
impl_scalar!(u32, 4);
impl_scalar!(u64, 8);
impl_scalar!(i8, 1);
impl_scalar!(i16, 2);
impl_scalar!(i32, 4);
impl_scalar!(i64, 8);
impl_scalar!(f32, 4);
impl_scalar!(f64, 8);

/// Decoding failure modes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SerializeError {
    #[error("attempted to read past the end of the buffer")]
    TruncatedBuffer,
    #[error("a length prefix exceeded the remaining buffer size")]
    LengthOverflow,
}

/// A byte buffer plus a non-decreasing read cursor.
///
/// Writes always append to the tail; reads always advance the cursor from
/// the front. `reset` clears both; `assign_buffer` replaces the buffer
/// contents with a copy of the given bytes and resets the cursor to zero.
#[derive(Debug, Default)]
pub struct Serializer {
    buffer: BytesMut,
    cursor: usize,
}

impl Serializer {
    pub fn new() -> Self {
        Serializer {
            buffer: BytesMut::new(),
            cursor: 0,
        }
    }

    /// Clears the buffer and resets the cursor to zero.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    /// Replaces the buffer with a copy of `data` and resets the cursor.
    pub fn assign_buffer(&mut self, data: &[u8]) {
        self.buffer.clear();
        self.buffer.extend_from_slice(data);
        self.cursor = 0;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..]
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn write_scalar<T: Scalar>(&mut self, value: T) {
        value.write_le(&mut self.buffer);
    }

    pub fn write_array<T: Scalar>(&mut self, values: &[T]) {
        self.write_scalar(values.len() as u32);
        for value in values {
            value.write_le(&mut self.buffer);
        }
    }

    pub fn write_str(&mut self, value: &str) {
        let bytes = value.as_bytes();
        self.write_scalar(bytes.len() as u32);
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_str_array<S: AsRef<str>>(&mut self, values: &[S]) {
        self.write_scalar(values.len() as u32);
        for value in values {
            self.write_str(value.as_ref());
        }
    }

    pub fn read_scalar<T: Scalar>(&mut self) -> Result<T, SerializeError> {
        if self.remaining() < T::WIDTH {
            return Err(SerializeError::TruncatedBuffer);
        }
        let start = self.cursor;
        let value = T::read_le(&self.buffer[start..start + T::WIDTH]);
        self.cursor += T::WIDTH;
        Ok(value)
    }

    pub fn read_array<T: Scalar>(&mut self) -> Result<Vec<T>, SerializeError> {
        let count = self.read_scalar::<u32>()? as usize;
        let byte_len = count
            .checked_mul(T::WIDTH)
            .ok_or(SerializeError::LengthOverflow)?;
        if byte_len > self.remaining() {
            return Err(SerializeError::LengthOverflow);
        }
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_scalar::<T>()?);
        }
        Ok(out)
    }

    /// Bytes are opaque on the wire (no encoding normalization); invalid
    /// UTF-8 is replaced rather than treated as a decode failure, keeping
    /// the contract limited to the two error kinds above.
    pub fn read_string(&mut self) -> Result<String, SerializeError> {
        let len = self.read_scalar::<u32>()? as usize;
        if len > self.remaining() {
            return Err(SerializeError::LengthOverflow);
        }
        let start = self.cursor;
        let bytes = &self.buffer[start..start + len];
        let value = String::from_utf8_lossy(bytes).into_owned();
        self.cursor += len;
        Ok(value)
    }

    pub fn read_string_array(&mut self) -> Result<Vec<String>, SerializeError> {
        let count = self.read_scalar::<u32>()? as usize;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_string()?);
        }
        Ok(out)
    }
}
