//! Avro-binary serializer.

use serde::{Serialize, ser};

use super::write_varint;
use crate::error::{CodecError, CodecResult};

/// Encodes a value to its Avro-binary bytes.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut serializer = AvroSerializer::new();
    value.serialize(&mut serializer)?;
    Ok(serializer.into_inner())
}

/// The serde serializer producing Avro-binary output.
#[derive(Debug, Default)]
pub struct AvroSerializer {
    out: Vec<u8>,
}

impl AvroSerializer {
    /// Creates a serializer with an empty output buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the serializer, returning the encoded bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }
}

/// In-progress compound value (record, array, or map).
pub struct Compound<'a> {
    ser: &'a mut AvroSerializer,
    // Arrays and maps are block-encoded and need a 0 terminator after a
    // non-empty block; records do not.
    close_block: bool,
}

impl<'a> ser::Serializer for &'a mut AvroSerializer {
    type Ok = ();
    type Error = CodecError;
    type SerializeSeq = Compound<'a>;
    type SerializeTuple = Compound<'a>;
    type SerializeTupleStruct = Compound<'a>;
    type SerializeTupleVariant = Compound<'a>;
    type SerializeMap = Compound<'a>;
    type SerializeStruct = Compound<'a>;
    type SerializeStructVariant = Compound<'a>;

    fn serialize_bool(self, v: bool) -> CodecResult<()> {
        self.out.push(u8::from(v));
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> CodecResult<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> CodecResult<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> CodecResult<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> CodecResult<()> {
        write_varint(&mut self.out, v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> CodecResult<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u16(self, v: u16) -> CodecResult<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u32(self, v: u32) -> CodecResult<()> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u64(self, v: u64) -> CodecResult<()> {
        let v = i64::try_from(v)
            .map_err(|_| CodecError::encode("u64 value exceeds Avro long range"))?;
        self.serialize_i64(v)
    }

    fn serialize_f32(self, v: f32) -> CodecResult<()> {
        self.out.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> CodecResult<()> {
        self.out.extend_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn serialize_char(self, v: char) -> CodecResult<()> {
        let mut buffer = [0u8; 4];
        self.serialize_str(v.encode_utf8(&mut buffer))
    }

    fn serialize_str(self, v: &str) -> CodecResult<()> {
        self.serialize_bytes(v.as_bytes())
    }

    fn serialize_bytes(self, v: &[u8]) -> CodecResult<()> {
        write_varint(&mut self.out, v.len() as i64);
        self.out.extend_from_slice(v);
        Ok(())
    }

    fn serialize_none(self) -> CodecResult<()> {
        // Union [null, T], branch 0.
        write_varint(&mut self.out, 0);
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> CodecResult<()> {
        // Union [null, T], branch 1.
        write_varint(&mut self.out, 1);
        value.serialize(self)
    }

    fn serialize_unit(self) -> CodecResult<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> CodecResult<()> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> CodecResult<()> {
        write_varint(&mut self.out, i64::from(variant_index));
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> CodecResult<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> CodecResult<()> {
        write_varint(&mut self.out, i64::from(variant_index));
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> CodecResult<Self::SerializeSeq> {
        let len = len.ok_or_else(|| CodecError::encode("sequence length must be known"))?;
        if len > 0 {
            write_varint(&mut self.out, len as i64);
        }
        Ok(Compound {
            ser: self,
            close_block: len > 0,
        })
    }

    fn serialize_tuple(self, _len: usize) -> CodecResult<Self::SerializeTuple> {
        Ok(Compound {
            ser: self,
            close_block: false,
        })
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeTupleStruct> {
        Ok(Compound {
            ser: self,
            close_block: false,
        })
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeTupleVariant> {
        write_varint(&mut self.out, i64::from(variant_index));
        Ok(Compound {
            ser: self,
            close_block: false,
        })
    }

    fn serialize_map(self, len: Option<usize>) -> CodecResult<Self::SerializeMap> {
        let len = len.ok_or_else(|| CodecError::encode("map length must be known"))?;
        if len > 0 {
            write_varint(&mut self.out, len as i64);
        }
        Ok(Compound {
            ser: self,
            close_block: len > 0,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeStruct> {
        Ok(Compound {
            ser: self,
            close_block: false,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> CodecResult<Self::SerializeStructVariant> {
        write_varint(&mut self.out, i64::from(variant_index));
        Ok(Compound {
            ser: self,
            close_block: false,
        })
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

impl Compound<'_> {
    fn end_value(self) -> CodecResult<()> {
        if self.close_block {
            write_varint(&mut self.ser.out, 0);
        }
        Ok(())
    }
}

impl ser::SerializeSeq for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> CodecResult<()> {
        self.end_value()
    }
}

impl ser::SerializeTuple for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> CodecResult<()> {
        self.end_value()
    }
}

impl ser::SerializeTupleStruct for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> CodecResult<()> {
        self.end_value()
    }
}

impl ser::SerializeTupleVariant for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> CodecResult<()> {
        self.end_value()
    }
}

impl ser::SerializeMap for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> CodecResult<()> {
        key.serialize(&mut *self.ser)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> CodecResult<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> CodecResult<()> {
        self.end_value()
    }
}

impl ser::SerializeStruct for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> CodecResult<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> CodecResult<()> {
        self.end_value()
    }
}

impl ser::SerializeStructVariant for Compound<'_> {
    type Ok = ();
    type Error = CodecError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> CodecResult<()> {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> CodecResult<()> {
        self.end_value()
    }
}
