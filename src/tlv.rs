//! Decoding of the attribute data carried by reports.
//!
//! The engine hands each report over as a single anonymous TLV element. How that element
//! becomes a value is left to an [`AttributeDecoder`], so callers that already have a TLV
//! codec can plug it in; [`TlvDecoder`] covers the element types attribute reports use.

use bytes::{Buf, Bytes};

use crate::{
    constants::MAX_TLV_DEPTH,
    error::{Error, Result},
};

/// Turns the raw data of an attribute report into a value.
pub trait AttributeDecoder: Send + Sync + 'static {
    fn decode(&self, data: &[u8]) -> Result<TlvValue>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TlvDecoder;

impl AttributeDecoder for TlvDecoder {
    fn decode(&self, data: &[u8]) -> Result<TlvValue> {
        decode_element(data).map(|element| element.value)
    }
}

/// Hands the undecoded bytes to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl AttributeDecoder for RawDecoder {
    fn decode(&self, data: &[u8]) -> Result<TlvValue> {
        Ok(TlvValue::OctetString(Bytes::copy_from_slice(data)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagControl {
    Anonymous,
    ContextSpecific(u8),
    CommonProfile(u32),
    ImplicitProfile(u32),
    FullyQualified {
        vendor_id: u16,
        profile_number: u16,
        tag: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TlvElement {
    pub tag: TagControl,
    pub value: TlvValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TlvValue {
    Null,
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f32),
    Double(f64),
    Utf8String(String),
    OctetString(Bytes),
    Structure(Vec<TlvElement>),
    Array(Vec<TlvElement>),
    List(Vec<TlvElement>),
}

impl TlvValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TlvValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TlvValue::Unsigned(value) => Some(*value),
            TlvValue::Signed(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TlvValue::Signed(value) => Some(*value),
            TlvValue::Unsigned(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TlvValue::Utf8String(value) => Some(value),
            _ => None,
        }
    }

    /// Members of a structure, array or list.
    pub fn elements(&self) -> Option<&[TlvElement]> {
        match self {
            TlvValue::Structure(elements) | TlvValue::Array(elements) | TlvValue::List(elements) => {
                Some(elements)
            }
            _ => None,
        }
    }

    /// Look up a structure member by its context tag.
    pub fn member(&self, context_tag: u8) -> Option<&TlvValue> {
        self.elements()?
            .iter()
            .find(|element| element.tag == TagControl::ContextSpecific(context_tag))
            .map(|element| &element.value)
    }
}

#[derive(Clone, Copy)]
enum ContainerType {
    Structure,
    Array,
    List,
}

struct OpenContainer {
    tag: TagControl,
    container_type: ContainerType,
    members: Vec<TlvElement>,
}

impl OpenContainer {
    fn close(self) -> TlvElement {
        let value = match self.container_type {
            ContainerType::Structure => TlvValue::Structure(self.members),
            ContainerType::Array => TlvValue::Array(self.members),
            ContainerType::List => TlvValue::List(self.members),
        };
        TlvElement {
            tag: self.tag,
            value,
        }
    }
}

const TYPE_STRUCTURE: u8 = 0x15;
const TYPE_ARRAY: u8 = 0x16;
const TYPE_LIST: u8 = 0x17;
const TYPE_END_OF_CONTAINER: u8 = 0x18;

/// Decode the first complete element in `buf`. Trailing bytes are ignored.
pub fn decode_element(mut buf: &[u8]) -> Result<TlvElement> {
    let mut open: heapless::Vec<OpenContainer, MAX_TLV_DEPTH> = heapless::Vec::new();
    loop {
        need(buf, 1)?;
        let control = buf.get_u8();
        let element_type = control & 0x1F;

        if element_type == TYPE_END_OF_CONTAINER {
            let container = open
                .pop()
                .ok_or_else(|| Error::Tlv("end of container outside a container".into()))?;
            let element = container.close();
            match open.last_mut() {
                Some(parent) => parent.members.push(element),
                None => return Ok(element),
            }
            continue;
        }

        let tag = read_tag(&mut buf, control >> 5)?;
        let container_type = match element_type {
            TYPE_STRUCTURE => Some(ContainerType::Structure),
            TYPE_ARRAY => Some(ContainerType::Array),
            TYPE_LIST => Some(ContainerType::List),
            _ => None,
        };
        if let Some(container_type) = container_type {
            open.push(OpenContainer {
                tag,
                container_type,
                members: vec![],
            })
            .map_err(|_| Error::Tlv(format!("containers nested deeper than {MAX_TLV_DEPTH}")))?;
            continue;
        }

        let element = TlvElement {
            tag,
            value: read_value(&mut buf, element_type)?,
        };
        match open.last_mut() {
            Some(parent) => parent.members.push(element),
            None => return Ok(element),
        }
    }
}

fn read_tag(buf: &mut &[u8], tag_control: u8) -> Result<TagControl> {
    let tag = match tag_control {
        0 => TagControl::Anonymous,
        1 => {
            need(buf, 1)?;
            TagControl::ContextSpecific(buf.get_u8())
        }
        2 => {
            need(buf, 2)?;
            TagControl::CommonProfile(buf.get_u16_le() as u32)
        }
        3 => {
            need(buf, 4)?;
            TagControl::CommonProfile(buf.get_u32_le())
        }
        4 => {
            need(buf, 2)?;
            TagControl::ImplicitProfile(buf.get_u16_le() as u32)
        }
        5 => {
            need(buf, 4)?;
            TagControl::ImplicitProfile(buf.get_u32_le())
        }
        6 => {
            need(buf, 6)?;
            TagControl::FullyQualified {
                vendor_id: buf.get_u16_le(),
                profile_number: buf.get_u16_le(),
                tag: buf.get_u16_le() as u32,
            }
        }
        _ => {
            need(buf, 8)?;
            TagControl::FullyQualified {
                vendor_id: buf.get_u16_le(),
                profile_number: buf.get_u16_le(),
                tag: buf.get_u32_le(),
            }
        }
    };
    Ok(tag)
}

fn read_value(buf: &mut &[u8], element_type: u8) -> Result<TlvValue> {
    let value = match element_type {
        0x00..=0x03 => {
            let width = 1usize << element_type;
            need(buf, width)?;
            TlvValue::Signed(buf.get_int_le(width))
        }
        0x04..=0x07 => {
            let width = 1usize << (element_type - 0x04);
            need(buf, width)?;
            TlvValue::Unsigned(buf.get_uint_le(width))
        }
        0x08 => TlvValue::Bool(false),
        0x09 => TlvValue::Bool(true),
        0x0A => {
            need(buf, 4)?;
            TlvValue::Float(buf.get_f32_le())
        }
        0x0B => {
            need(buf, 8)?;
            TlvValue::Double(buf.get_f64_le())
        }
        0x0C..=0x0F => {
            let data = read_bytes(buf, element_type - 0x0C)?;
            let value = String::from_utf8(data.to_vec())
                .map_err(|e| Error::Tlv(format!("invalid UTF-8 string: {e}")))?;
            TlvValue::Utf8String(value)
        }
        0x10..=0x13 => TlvValue::OctetString(read_bytes(buf, element_type - 0x10)?),
        0x14 => TlvValue::Null,
        t => return Err(Error::Tlv(format!("unsupported element type {t:#04x}"))),
    };
    Ok(value)
}

/// Read a length-prefixed string, where `size` selects a 1, 2, 4 or 8 byte length.
fn read_bytes(buf: &mut &[u8], size: u8) -> Result<Bytes> {
    let width = 1usize << size;
    need(buf, width)?;
    let len = usize::try_from(buf.get_uint_le(width))
        .map_err(|_| Error::Tlv("string length does not fit in memory".into()))?;
    need(buf, len)?;
    Ok(buf.copy_to_bytes(len))
}

fn need(buf: &[u8], len: usize) -> Result<()> {
    if buf.remaining() < len {
        return Err(Error::Tlv(format!(
            "element needs {len} more bytes, {} left",
            buf.remaining()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scalars() {
        let decoder = TlvDecoder;
        assert_eq!(decoder.decode(&[0x04, 0x2A]).unwrap(), TlvValue::Unsigned(42));
        assert_eq!(
            decoder.decode(&[0x05, 0x34, 0x12]).unwrap(),
            TlvValue::Unsigned(0x1234)
        );
        assert_eq!(decoder.decode(&[0x00, 0xFF]).unwrap(), TlvValue::Signed(-1));
        assert_eq!(decoder.decode(&[0x09]).unwrap(), TlvValue::Bool(true));
        assert_eq!(decoder.decode(&[0x08]).unwrap(), TlvValue::Bool(false));
        assert_eq!(decoder.decode(&[0x14]).unwrap(), TlvValue::Null);
        assert_eq!(
            decoder.decode(&hex_literal::hex!("0A 0000803F")).unwrap(),
            TlvValue::Float(1.0)
        );
    }

    #[test]
    fn test_decode_strings() {
        let value = TlvDecoder
            .decode(&hex_literal::hex!("0C 0B 54657374 2076656E646F72"))
            .unwrap();
        assert_eq!(value.as_str(), Some("Test vendor"));

        let value = TlvDecoder.decode(&hex_literal::hex!("10 03 010203")).unwrap();
        assert_eq!(value, TlvValue::OctetString(Bytes::from_static(&[1, 2, 3])));
    }

    #[test]
    fn test_decode_structure() {
        // { 0: 0xfff1, 1: "Test", 2: [true, false] }
        let buf = hex_literal::hex!("15 2500 F1FF 2C01 04 54657374 3602 09 08 18 18");
        let element = decode_element(&buf).unwrap();
        assert_eq!(element.tag, TagControl::Anonymous);
        let value = element.value;
        assert_eq!(value.member(0).and_then(TlvValue::as_u64), Some(0xFFF1));
        assert_eq!(value.member(1).and_then(TlvValue::as_str), Some("Test"));
        let flags = value.member(2).and_then(TlvValue::elements).unwrap();
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].value.as_bool(), Some(true));
        assert!(value.member(3).is_none());
    }

    #[test]
    fn test_decode_profile_tags() {
        // Fully qualified 8 byte tag followed by an implicit profile 2 byte tag
        let buf = hex_literal::hex!("15 E4 F1FF 0100 78563412 07 89 0100 18");
        let value = TlvDecoder.decode(&buf).unwrap();
        let members = value.elements().unwrap();
        assert_eq!(
            members[0].tag,
            TagControl::FullyQualified {
                vendor_id: 0xFFF1,
                profile_number: 1,
                tag: 0x12345678,
            }
        );
        assert_eq!(members[0].value, TlvValue::Unsigned(7));
        assert_eq!(members[1].tag, TagControl::ImplicitProfile(1));
        assert_eq!(members[1].value, TlvValue::Bool(true));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(TlvDecoder.decode(&[]), Err(Error::Tlv(_))));
        // Truncated 2 byte integer
        assert!(matches!(TlvDecoder.decode(&[0x05, 0x01]), Err(Error::Tlv(_))));
        // Unterminated structure
        assert!(matches!(TlvDecoder.decode(&[0x15, 0x24, 0x00, 0x01]), Err(Error::Tlv(_))));
        // Stray end of container
        assert!(matches!(TlvDecoder.decode(&[0x18]), Err(Error::Tlv(_))));
        // Reserved element type
        assert!(matches!(TlvDecoder.decode(&[0x19]), Err(Error::Tlv(_))));
        // String length past the end
        assert!(matches!(TlvDecoder.decode(&[0x0C, 0x05, 0x41]), Err(Error::Tlv(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let mut buf = vec![0x16; MAX_TLV_DEPTH + 1];
        buf.extend(std::iter::repeat(0x18).take(MAX_TLV_DEPTH + 1));
        assert!(matches!(decode_element(&buf), Err(Error::Tlv(_))));

        let mut buf = vec![0x16; MAX_TLV_DEPTH];
        buf.extend(std::iter::repeat(0x18).take(MAX_TLV_DEPTH));
        assert!(decode_element(&buf).is_ok());
    }

    #[test]
    fn test_raw_decoder() {
        let value = RawDecoder.decode(&[0x04, 0x2A]).unwrap();
        assert_eq!(value, TlvValue::OctetString(Bytes::from_static(&[0x04, 0x2A])));
    }
}
