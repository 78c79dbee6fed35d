/*!
 * Minimal length-prefixed tagged binary codec.
 *
 * Only the subset needed to talk to the translation endpoint is supported:
 * varint (wire type 0), fixed 64-bit (1), length-delimited (2) and
 * fixed 32-bit (5) fields. Decoding is lenient: a malformed or truncated
 * buffer yields the fields parsed before the fault.
 */

use std::collections::BTreeMap;

use crate::errors::DecodeError;

pub const WIRE_VARINT: u8 = 0;
pub const WIRE_FIXED64: u8 = 1;
pub const WIRE_LEN: u8 = 2;
pub const WIRE_FIXED32: u8 = 5;

/// Longest legal varint for a 64-bit value
const MAX_VARINT_LEN: usize = 10;

/// A single decoded field value, tagged by its wire type
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    VarInt(u64),
    Fixed64([u8; 8]),
    Fixed32([u8; 4]),
    Bytes(Vec<u8>),
}

impl WireValue {
    /// Human-readable wire type name, used in decode errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::VarInt(_) => "varint",
            Self::Fixed64(_) => "fixed64",
            Self::Fixed32(_) => "fixed32",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// Append `value` as a base-128 varint
pub fn encode_varint(value: u64, out: &mut Vec<u8>) {
    let mut value = value;
    loop {
        let bits = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(bits);
            return;
        }
        out.push(bits | 0x80);
    }
}

/// Read a varint starting at `pos`, returning the value and the next position
///
/// Returns `None` when the buffer ends mid-varint or the varint is longer
/// than ten bytes.
pub fn read_varint(buffer: &[u8], pos: usize) -> Option<(u64, usize)> {
    let mut result: u64 = 0;
    let mut pos = pos;
    for i in 0..MAX_VARINT_LEN {
        let byte = *buffer.get(pos)?;
        pos += 1;
        result |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((result, pos));
        }
    }
    None
}

/// Append the tag for `field_number` with `wire_type`
pub fn encode_tag(field_number: u32, wire_type: u8, out: &mut Vec<u8>) {
    encode_varint((u64::from(field_number) << 3) | u64::from(wire_type & 0x07), out);
}

/// Split a raw tag into (field number, wire type)
pub fn decode_tag(tag: u64) -> (u32, u8) {
    ((tag >> 3) as u32, (tag & 0x07) as u8)
}

/// Serializer producing a message body field by field, in call order
#[derive(Debug, Default, Clone)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Length-delimited UTF-8 string
    pub fn string(mut self, field_number: u32, value: &str) -> Self {
        encode_tag(field_number, WIRE_LEN, &mut self.buffer);
        encode_varint(value.len() as u64, &mut self.buffer);
        self.buffer.extend_from_slice(value.as_bytes());
        self
    }

    /// Varint 0/1
    pub fn bool(mut self, field_number: u32, value: bool) -> Self {
        encode_tag(field_number, WIRE_VARINT, &mut self.buffer);
        encode_varint(u64::from(value), &mut self.buffer);
        self
    }

    /// 8-byte little-endian IEEE-754
    pub fn double(mut self, field_number: u32, value: f64) -> Self {
        encode_tag(field_number, WIRE_FIXED64, &mut self.buffer);
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Varint; negative values wrap to their unsigned 64-bit form
    pub fn int32(mut self, field_number: u32, value: i32) -> Self {
        encode_tag(field_number, WIRE_VARINT, &mut self.buffer);
        encode_varint(i64::from(value) as u64, &mut self.buffer);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// A decoded message: field number to the last value seen for it
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WireMessage {
    fields: BTreeMap<u32, WireValue>,
}

impl WireMessage {
    /// Parse `buffer`, stopping silently at the first malformed field
    pub fn decode(buffer: &[u8]) -> Self {
        let mut fields = BTreeMap::new();
        let mut pos = 0;

        while pos < buffer.len() {
            let Some((tag, next)) = read_varint(buffer, pos) else {
                break;
            };
            let (field_number, wire_type) = decode_tag(tag);
            if field_number == 0 {
                break;
            }

            let parsed = match wire_type {
                WIRE_VARINT => read_varint(buffer, next).map(|(v, end)| (WireValue::VarInt(v), end)),
                WIRE_FIXED64 => take(buffer, next, 8).map(|(raw, end)| {
                    let mut bytes = [0u8; 8];
                    bytes.copy_from_slice(raw);
                    (WireValue::Fixed64(bytes), end)
                }),
                WIRE_LEN => read_varint(buffer, next).and_then(|(len, start)| {
                    let len = usize::try_from(len).ok()?;
                    take(buffer, start, len).map(|(raw, end)| (WireValue::Bytes(raw.to_vec()), end))
                }),
                WIRE_FIXED32 => take(buffer, next, 4).map(|(raw, end)| {
                    let mut bytes = [0u8; 4];
                    bytes.copy_from_slice(raw);
                    (WireValue::Fixed32(bytes), end)
                }),
                _ => None,
            };

            let Some((value, end)) = parsed else {
                break;
            };
            fields.insert(field_number, value);
            pos = end;
        }

        Self { fields }
    }

    pub fn get(&self, field_number: u32) -> Option<&WireValue> {
        self.fields.get(&field_number)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Length-delimited field as UTF-8 text
    pub fn get_string(&self, field_number: u32) -> Result<Option<String>, DecodeError> {
        match self.fields.get(&field_number) {
            None => Ok(None),
            Some(WireValue::Bytes(raw)) => String::from_utf8(raw.clone())
                .map(Some)
                .map_err(|_| DecodeError::InvalidUtf8 { field: field_number }),
            Some(other) => Err(mismatch(field_number, "bytes", other)),
        }
    }

    /// Varint field as an unsigned integer
    pub fn get_int(&self, field_number: u32) -> Result<Option<u64>, DecodeError> {
        match self.fields.get(&field_number) {
            None => Ok(None),
            Some(WireValue::VarInt(v)) => Ok(Some(*v)),
            Some(other) => Err(mismatch(field_number, "varint", other)),
        }
    }

    /// Fixed 64-bit field as a double
    pub fn get_double(&self, field_number: u32) -> Result<Option<f64>, DecodeError> {
        match self.fields.get(&field_number) {
            None => Ok(None),
            Some(WireValue::Fixed64(raw)) => Ok(Some(f64::from_le_bytes(*raw))),
            Some(other) => Err(mismatch(field_number, "fixed64", other)),
        }
    }
}

fn take(buffer: &[u8], start: usize, len: usize) -> Option<(&[u8], usize)> {
    let end = start.checked_add(len)?;
    buffer.get(start..end).map(|raw| (raw, end))
}

fn mismatch(field: u32, expected: &'static str, found: &WireValue) -> DecodeError {
    DecodeError::TypeMismatch {
        field,
        expected,
        found: found.type_name(),
    }
}
