//! Avro-binary (de)serialization through serde.
//!
//! The record structs in `etpkit-protocol` double as the Avro schemas: field
//! declaration order is wire order, so encoding walks the fields in order and
//! decoding is schema-driven by the target type. The mapping is:
//!
//! | Rust | Avro |
//! |------|------|
//! | `bool` | boolean (one byte) |
//! | integers | int/long (zig-zag varint) |
//! | `f32`/`f64` | float/double (little-endian) |
//! | `String`/`&str` | string (length-prefixed UTF-8) |
//! | `Bytes`/byte buffers | bytes (length-prefixed) |
//! | `Option<T>` | union `[null, T]` (index then value) |
//! | unit-only or data-carrying `enum` | enum/union (index, then value if any) |
//! | `Vec<T>` | array (block count, items, 0 terminator) |
//! | string-keyed maps | map (block count, pairs, 0 terminator) |
//! | `struct` / newtype / tuple | record (fields in order, no markers) |
//!
//! Avro binary is not self-describing, so `deserialize_any` is unsupported;
//! every decode is driven by a concrete type selected from the message
//! catalog after the header is inspected.

mod de;
mod ser;

pub use de::{AvroDeserializer, from_slice, from_slice_prefix};
pub use ser::{AvroSerializer, to_vec};

use crate::error::{CodecError, CodecResult};

/// Writes a zig-zag varint, the encoding shared by Avro int and long.
pub(crate) fn write_varint(out: &mut Vec<u8>, value: i64) {
    let mut encoded = ((value << 1) ^ (value >> 63)) as u64;
    loop {
        let mut byte = (encoded & 0x7f) as u8;
        encoded >>= 7;
        if encoded != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if encoded == 0 {
            break;
        }
    }
}

/// Reads a zig-zag varint from `input` starting at `*pos`, advancing it.
pub(crate) fn read_varint(input: &[u8], pos: &mut usize) -> CodecResult<i64> {
    let mut accumulator: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *input
            .get(*pos)
            .ok_or_else(|| CodecError::decode("unexpected end of input in varint"))?;
        *pos += 1;
        accumulator |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(CodecError::decode("varint longer than 64 bits"));
        }
    }
    Ok(((accumulator >> 1) as i64) ^ -((accumulator & 1) as i64))
}
