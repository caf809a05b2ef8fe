//! Packed records exchanged with the native engine.
//!
//! All integers are little endian and the records carry no padding, so they are read and
//! written field by field rather than cast from memory.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use num::FromPrimitive;

use crate::{
    constants::{ATTRIBUTE_INFO_RECORD_LEN, COMMAND_STATUS_RECORD_LEN},
    error::{Error, Result},
};

use self::status::ImStatus;

pub mod status;

/// Status of one command within a batched invoke.
///
/// - 04 Protocol ID
/// - 02 Protocol Code
/// - 01 Endpoint ID
/// - 02 Cluster ID
/// - 01 Command ID
/// - 01 Command Index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CommandStatusRecord {
    pub protocol_id: u32,
    pub protocol_code: u16,
    pub endpoint_id: u8,
    pub cluster_id: u16,
    pub command_id: u8,
    pub command_index: u8,
}

impl CommandStatusRecord {
    pub const LEN: usize = COMMAND_STATUS_RECORD_LEN;

    pub fn from_payload(mut payload: &[u8]) -> Result<Self> {
        check_len("CommandStatus", payload, Self::LEN)?;
        Ok(Self {
            protocol_id: payload.get_u32_le(),
            protocol_code: payload.get_u16_le(),
            endpoint_id: payload.get_u8(),
            cluster_id: payload.get_u16_le(),
            command_id: payload.get_u8(),
            command_index: payload.get_u8(),
        })
    }

    pub fn to_payload(&self, out: &mut BytesMut) {
        out.put_u32_le(self.protocol_id);
        out.put_u16_le(self.protocol_code);
        out.put_u8(self.endpoint_id);
        out.put_u16_le(self.cluster_id);
        out.put_u8(self.command_id);
        out.put_u8(self.command_index);
    }

    /// The interaction model status, if the protocol code is a known one.
    pub fn im_status(&self) -> Option<ImStatus> {
        ImStatus::from_u16(self.protocol_code)
    }
}

/// Identifies one attribute instance in a read request or report.
///
/// - 02 Cluster ID
/// - 02 Attribute ID
/// - 01 Endpoint ID
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AttributeInfo {
    pub cluster_id: u16,
    pub attribute_id: u16,
    pub endpoint_id: u8,
}

impl AttributeInfo {
    pub const LEN: usize = ATTRIBUTE_INFO_RECORD_LEN;

    pub const fn new(endpoint_id: u8, cluster_id: u16, attribute_id: u16) -> Self {
        Self {
            cluster_id,
            attribute_id,
            endpoint_id,
        }
    }

    pub fn from_payload(mut payload: &[u8]) -> Result<Self> {
        check_len("AttributeInfo", payload, Self::LEN)?;
        Ok(Self {
            cluster_id: payload.get_u16_le(),
            attribute_id: payload.get_u16_le(),
            endpoint_id: payload.get_u8(),
        })
    }

    pub fn to_payload(&self, out: &mut BytesMut) {
        out.put_u16_le(self.cluster_id);
        out.put_u16_le(self.attribute_id);
        out.put_u8(self.endpoint_id);
    }
}

impl std::fmt::Display for AttributeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{:#06x}/{:#06x}",
            self.endpoint_id, self.cluster_id, self.attribute_id
        )
    }
}

/// Serialize attribute paths back to back, as the read request expects them.
/// The path count is passed to the engine separately.
pub fn encode_attribute_paths(paths: &[AttributeInfo]) -> Bytes {
    let mut out = BytesMut::with_capacity(paths.len() * AttributeInfo::LEN);
    for path in paths {
        path.to_payload(&mut out);
    }
    out.freeze()
}

fn check_len(record: &'static str, payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() < expected {
        return Err(Error::Truncated {
            record,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_command_status() {
        // Success for command 0x02 of cluster 0x0006 on endpoint 1, third in the batch
        let buf = hex_literal::hex!("01000000 0000 01 0600 02 03");
        let record = CommandStatusRecord::from_payload(&buf).unwrap();
        assert_eq!(
            record,
            CommandStatusRecord {
                protocol_id: 1,
                protocol_code: 0,
                endpoint_id: 1,
                cluster_id: 0x0006,
                command_id: 0x02,
                command_index: 3,
            }
        );
        assert_eq!(record.im_status(), Some(ImStatus::Success));

        let mut out = BytesMut::new();
        record.to_payload(&mut out);
        assert_eq!(&out[..], &buf[..]);
    }

    #[test]
    fn test_decode_command_status_unknown_code() {
        let buf = hex_literal::hex!("01000000 3412 00 0800 00 00");
        let record = CommandStatusRecord::from_payload(&buf).unwrap();
        assert_eq!(record.protocol_code, 0x1234);
        assert_eq!(record.im_status(), None);
    }

    #[test]
    fn test_truncated_records() {
        let err = CommandStatusRecord::from_payload(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            Error::Truncated {
                expected: 11,
                actual: 10,
                ..
            }
        ));
        let err = AttributeInfo::from_payload(&[0x06, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Truncated { expected: 5, .. }));
    }

    #[test]
    fn test_decode_attribute_info() {
        let buf = hex_literal::hex!("0600 0000 01");
        let info = AttributeInfo::from_payload(&buf).unwrap();
        assert_eq!(info, AttributeInfo::new(1, 0x0006, 0x0000));
        assert_eq!(info.to_string(), "1/0x0006/0x0000");
    }

    #[test]
    fn test_encode_attribute_paths() {
        let paths = [
            AttributeInfo::new(1, 0x0006, 0x0000),
            AttributeInfo::new(0, 0x0028, 0x0002),
        ];
        let buf = encode_attribute_paths(&paths);
        assert_eq!(&buf[..], &hex_literal::hex!("0600 0000 01 2800 0200 00")[..]);
        assert!(encode_attribute_paths(&[]).is_empty());
    }
}
