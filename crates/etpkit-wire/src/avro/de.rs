//! Avro-binary deserializer.

use serde::de::{self, DeserializeOwned, Visitor};

use super::read_varint;
use crate::error::{CodecError, CodecResult};

/// Decodes a value from Avro-binary bytes, requiring all input be consumed.
pub fn from_slice<T: DeserializeOwned>(input: &[u8]) -> CodecResult<T> {
    let (value, consumed) = from_slice_prefix(input)?;
    if consumed != input.len() {
        return Err(CodecError::decode(format!(
            "{} trailing bytes after value",
            input.len() - consumed
        )));
    }
    Ok(value)
}

/// Decodes a value from the front of `input`, returning it together with the
/// number of bytes consumed.
///
/// This is how the binary framing splits a frame: the header is decoded as a
/// prefix and the remainder of the frame is the body.
pub fn from_slice_prefix<T: DeserializeOwned>(input: &[u8]) -> CodecResult<(T, usize)> {
    let mut deserializer = AvroDeserializer::new(input);
    let value = T::deserialize(&mut deserializer)?;
    Ok((value, deserializer.position()))
}

/// The serde deserializer reading Avro-binary input.
///
/// Avro binary carries no type tags, so decoding is driven entirely by the
/// target type; `deserialize_any` is unsupported.
#[derive(Debug)]
pub struct AvroDeserializer<'de> {
    input: &'de [u8],
    pos: usize,
}

impl<'de> AvroDeserializer<'de> {
    /// Creates a deserializer over `input`.
    pub fn new(input: &'de [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_varint(&mut self) -> CodecResult<i64> {
        read_varint(self.input, &mut self.pos)
    }

    fn read_exact(&mut self, len: usize) -> CodecResult<&'de [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| CodecError::decode("unexpected end of input"))?;
        let slice = &self.input[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_len_prefixed(&mut self) -> CodecResult<&'de [u8]> {
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| CodecError::decode("negative length prefix"))?;
        self.read_exact(len)
    }

    /// Reads one block count; a negative count is followed by a byte size and
    /// means `abs(count)` items.
    fn read_block_count(&mut self) -> CodecResult<i64> {
        let count = self.read_varint()?;
        if count < 0 {
            let _byte_size = self.read_varint()?;
            Ok(-count)
        } else {
            Ok(count)
        }
    }
}

macro_rules! deserialize_varint {
    ($($method:ident)*) => {
        $(fn $method<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
            let value = self.read_varint()?;
            visitor.visit_i64(value)
        })*
    };
}

impl<'de> de::Deserializer<'de> for &mut AvroDeserializer<'de> {
    type Error = CodecError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> CodecResult<V::Value> {
        Err(CodecError::decode(
            "Avro binary is not self-describing; a concrete type is required",
        ))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> CodecResult<V::Value> {
        Err(CodecError::decode(
            "cannot skip values in Avro binary input",
        ))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        match self.read_exact(1)?[0] {
            0 => visitor.visit_bool(false),
            1 => visitor.visit_bool(true),
            other => Err(CodecError::decode(format!("invalid boolean byte {other}"))),
        }
    }

    deserialize_varint! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        let value = self.read_varint()?;
        let value = u64::try_from(value)
            .map_err(|_| CodecError::decode("negative value for unsigned integer"))?;
        visitor.visit_u64(value)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        let bytes = self.read_exact(4)?;
        let mut buffer = [0u8; 4];
        buffer.copy_from_slice(bytes);
        visitor.visit_f32(f32::from_le_bytes(buffer))
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        let bytes = self.read_exact(8)?;
        let mut buffer = [0u8; 8];
        buffer.copy_from_slice(bytes);
        visitor.visit_f64(f64::from_le_bytes(buffer))
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        let bytes = self.read_len_prefixed()?;
        let text = std::str::from_utf8(bytes)
            .map_err(|err| CodecError::decode(err.to_string()))?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(value), None) => visitor.visit_char(value),
            _ => Err(CodecError::decode("expected a single-character string")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        let bytes = self.read_len_prefixed()?;
        let text = std::str::from_utf8(bytes)
            .map_err(|err| CodecError::decode(err.to_string()))?;
        visitor.visit_borrowed_str(text)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        let bytes = self.read_len_prefixed()?;
        visitor.visit_borrowed_bytes(bytes)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        match self.read_varint()? {
            0 => visitor.visit_none(),
            1 => visitor.visit_some(self),
            other => Err(CodecError::decode(format!(
                "invalid union branch {other} for optional value"
            ))),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> CodecResult<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> CodecResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        visitor.visit_seq(BlockAccess::new(self))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> CodecResult<V::Value> {
        visitor.visit_seq(FieldAccess {
            de: self,
            remaining: len,
        })
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> CodecResult<V::Value> {
        visitor.visit_seq(FieldAccess {
            de: self,
            remaining: len,
        })
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        visitor.visit_map(BlockAccess::new(self))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value> {
        visitor.visit_seq(FieldAccess {
            de: self,
            remaining: fields.len(),
        })
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value> {
        visitor.visit_enum(UnionAccess { de: self })
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, _visitor: V) -> CodecResult<V::Value> {
        Err(CodecError::decode(
            "identifiers are resolved positionally in Avro binary",
        ))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

/// Access for records: exactly `remaining` fields, in declaration order.
struct FieldAccess<'a, 'de> {
    de: &'a mut AvroDeserializer<'de>,
    remaining: usize,
}

impl<'de> de::SeqAccess<'de> for FieldAccess<'_, 'de> {
    type Error = CodecError;

    fn next_element_seed<T: de::DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> CodecResult<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

/// Access for block-encoded arrays and maps.
struct BlockAccess<'a, 'de> {
    de: &'a mut AvroDeserializer<'de>,
    remaining: i64,
    done: bool,
}

impl<'a, 'de> BlockAccess<'a, 'de> {
    fn new(de: &'a mut AvroDeserializer<'de>) -> Self {
        Self {
            de,
            remaining: 0,
            done: false,
        }
    }

    /// Advances to the next item slot, refilling from the next block when the
    /// current one is exhausted. Returns `false` at the 0 terminator.
    fn advance(&mut self) -> CodecResult<bool> {
        if self.done {
            return Ok(false);
        }
        if self.remaining == 0 {
            let count = self.de.read_block_count()?;
            if count == 0 {
                self.done = true;
                return Ok(false);
            }
            self.remaining = count;
        }
        self.remaining -= 1;
        Ok(true)
    }
}

impl<'de> de::SeqAccess<'de> for BlockAccess<'_, 'de> {
    type Error = CodecError;

    fn next_element_seed<T: de::DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> CodecResult<Option<T::Value>> {
        if !self.advance()? {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

impl<'de> de::MapAccess<'de> for BlockAccess<'_, 'de> {
    type Error = CodecError;

    fn next_key_seed<K: de::DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> CodecResult<Option<K::Value>> {
        if !self.advance()? {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: de::DeserializeSeed<'de>>(&mut self, seed: V) -> CodecResult<V::Value> {
        seed.deserialize(&mut *self.de)
    }
}

/// Access for enums and unions: a varint branch index, then the value.
struct UnionAccess<'a, 'de> {
    de: &'a mut AvroDeserializer<'de>,
}

impl<'de> de::EnumAccess<'de> for UnionAccess<'_, 'de> {
    type Error = CodecError;
    type Variant = Self;

    fn variant_seed<V: de::DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> CodecResult<(V::Value, Self::Variant)> {
        let index = self.de.read_varint()?;
        let index = u32::try_from(index)
            .map_err(|_| CodecError::decode(format!("invalid union branch {index}")))?;
        let value = seed.deserialize(de::value::U32Deserializer::<CodecError>::new(index))?;
        Ok((value, self))
    }
}

impl<'de> de::VariantAccess<'de> for UnionAccess<'_, 'de> {
    type Error = CodecError;

    fn unit_variant(self) -> CodecResult<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: de::DeserializeSeed<'de>>(self, seed: T) -> CodecResult<T::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> CodecResult<V::Value> {
        visitor.visit_seq(FieldAccess {
            de: self.de,
            remaining: len,
        })
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value> {
        visitor.visit_seq(FieldAccess {
            de: self.de,
            remaining: fields.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::to_vec;
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Sample {
        Unit,
        Long(i64),
        Text(String),
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Nested {
        id: i64,
        label: String,
        tags: Vec<String>,
        weight: Option<f64>,
        kind: Sample,
        attributes: HashMap<String, i64>,
    }

    fn roundtrip<T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug>(value: &T) {
        let bytes = to_vec(value).unwrap();
        let back: T = from_slice(&bytes).unwrap();
        assert_eq!(&back, value);
    }

    #[test]
    fn nested_record_roundtrips() {
        let mut attributes = HashMap::new();
        attributes.insert("depth".to_owned(), 1500i64);
        attributes.insert("run".to_owned(), 3i64);
        roundtrip(&Nested {
            id: -42,
            label: "wellbore A-12".into(),
            tags: vec!["witsml".into(), "log".into()],
            weight: Some(12.5),
            kind: Sample::Text("curve".into()),
            attributes,
        });
    }

    #[test]
    fn empty_collections_roundtrip() {
        roundtrip(&Nested {
            id: 0,
            label: String::new(),
            tags: Vec::new(),
            weight: None,
            kind: Sample::Unit,
            attributes: HashMap::new(),
        });
    }

    #[test]
    fn enum_branches_roundtrip() {
        for value in [Sample::Unit, Sample::Long(i64::MIN), Sample::Text("x".into())] {
            roundtrip(&value);
        }
    }

    #[test]
    fn prefix_decode_reports_consumed_length() {
        let bytes = {
            let mut head = to_vec(&7i64).unwrap();
            head.extend(to_vec("trailer").unwrap());
            head
        };
        let (value, consumed) = from_slice_prefix::<i64>(&bytes).unwrap();
        assert_eq!(value, 7);
        let rest: String = from_slice(&bytes[consumed..]).unwrap();
        assert_eq!(rest, "trailer");
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = to_vec(&1i64).unwrap();
        bytes.push(0);
        assert!(from_slice::<i64>(&bytes).is_err());
    }

    #[test]
    fn invalid_union_branch_is_an_error() {
        // Branch index 9 for an Option.
        let bytes = vec![18];
        assert!(from_slice::<Option<i64>>(&bytes).is_err());
    }

    #[test]
    fn negative_block_count_reads_size_then_items() {
        // One block of -2 items (zig-zag -2 = 3), byte size 2 (zig-zag 4),
        // items 1 and 2 (zig-zag 2, 4), then terminator 0.
        let bytes = vec![3, 4, 2, 4, 0];
        let values: Vec<i64> = from_slice(&bytes).unwrap();
        assert_eq!(values, vec![1, 2]);
    }
}
