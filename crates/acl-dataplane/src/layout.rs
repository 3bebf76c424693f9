//! Packed byte layouts for stored records and the hash key.
//!
//! Each structure is described by a table of [`FieldSpec`]s (name, byte
//! offset, width) and has exactly one encode and one decode routine. No
//! in-memory layout is ever reinterpreted as bytes.
//!
//! Byte order:
//! - `table_id`, `hash`, table `id`: little-endian (host order of the
//!   reference loader)
//! - addresses, masks, ports: network order (big-endian)

use acl_types::{Action, PortRange};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

use crate::jhash::jhash;
use crate::rule::AclRule;
use crate::table::AclTable;

/// Position and width of one field inside a packed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl FieldSpec {
    const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
        }
    }

    /// Byte range covered by the field.
    pub const fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.width
    }

    /// Offset of the first byte after the field.
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// Errors decoding a packed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("{record} record must be {expected} bytes, got {actual}")]
    Length {
        record: &'static str,
        expected: usize,
        actual: usize,
    },
}

fn check_len(record: &'static str, bytes: &[u8], expected: usize) -> Result<(), LayoutError> {
    if bytes.len() != expected {
        return Err(LayoutError::Length {
            record,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

// ============ Rule record ============

pub mod rule_fields {
    use super::FieldSpec;

    pub const TABLE_ID: FieldSpec = FieldSpec::new("table_id", 0, 4);
    pub const HASH: FieldSpec = FieldSpec::new("hash", 4, 4);
    pub const PROTOCOL: FieldSpec = FieldSpec::new("protocol", 8, 1);
    pub const SADDR: FieldSpec = FieldSpec::new("saddr", 9, 4);
    pub const SMASK: FieldSpec = FieldSpec::new("smask", 13, 4);
    pub const DADDR: FieldSpec = FieldSpec::new("daddr", 17, 4);
    pub const DMASK: FieldSpec = FieldSpec::new("dmask", 21, 4);
    pub const SPORT_START: FieldSpec = FieldSpec::new("sport_start", 25, 2);
    pub const SPORT_END: FieldSpec = FieldSpec::new("sport_end", 27, 2);
    pub const DPORT_START: FieldSpec = FieldSpec::new("dport_start", 29, 2);
    pub const DPORT_END: FieldSpec = FieldSpec::new("dport_end", 31, 2);
    pub const ACTION: FieldSpec = FieldSpec::new("action", 33, 1);
    pub const PAD: FieldSpec = FieldSpec::new("_pad", 34, 2);

    pub const ALL: [FieldSpec; 13] = [
        TABLE_ID,
        HASH,
        PROTOCOL,
        SADDR,
        SMASK,
        DADDR,
        DMASK,
        SPORT_START,
        SPORT_END,
        DPORT_START,
        DPORT_END,
        ACTION,
        PAD,
    ];
}

/// Size of a packed rule record.
pub const RULE_RECORD_LEN: usize = rule_fields::PAD.end();

/// Encodes a rule into its packed record.
pub fn encode_rule(rule: &AclRule) -> [u8; RULE_RECORD_LEN] {
    use rule_fields::*;

    let mut buf = [0u8; RULE_RECORD_LEN];
    LittleEndian::write_u32(&mut buf[TABLE_ID.range()], rule.table_id);
    LittleEndian::write_u32(&mut buf[HASH.range()], rule.hash);
    buf[PROTOCOL.offset] = rule.protocol;
    BigEndian::write_u32(&mut buf[SADDR.range()], rule.src_addr);
    BigEndian::write_u32(&mut buf[SMASK.range()], rule.src_mask);
    BigEndian::write_u32(&mut buf[DADDR.range()], rule.dst_addr);
    BigEndian::write_u32(&mut buf[DMASK.range()], rule.dst_mask);
    BigEndian::write_u16(&mut buf[SPORT_START.range()], rule.src_ports.start);
    BigEndian::write_u16(&mut buf[SPORT_END.range()], rule.src_ports.end);
    BigEndian::write_u16(&mut buf[DPORT_START.range()], rule.dst_ports.start);
    BigEndian::write_u16(&mut buf[DPORT_END.range()], rule.dst_ports.end);
    buf[ACTION.offset] = rule.action.code();
    buf
}

/// Decodes a packed rule record.
pub fn decode_rule(bytes: &[u8]) -> Result<AclRule, LayoutError> {
    use rule_fields::*;

    check_len("rule", bytes, RULE_RECORD_LEN)?;
    Ok(AclRule {
        table_id: LittleEndian::read_u32(&bytes[TABLE_ID.range()]),
        hash: LittleEndian::read_u32(&bytes[HASH.range()]),
        protocol: bytes[PROTOCOL.offset],
        src_addr: BigEndian::read_u32(&bytes[SADDR.range()]),
        src_mask: BigEndian::read_u32(&bytes[SMASK.range()]),
        dst_addr: BigEndian::read_u32(&bytes[DADDR.range()]),
        dst_mask: BigEndian::read_u32(&bytes[DMASK.range()]),
        src_ports: PortRange {
            start: BigEndian::read_u16(&bytes[SPORT_START.range()]),
            end: BigEndian::read_u16(&bytes[SPORT_END.range()]),
        },
        dst_ports: PortRange {
            start: BigEndian::read_u16(&bytes[DPORT_START.range()]),
            end: BigEndian::read_u16(&bytes[DPORT_END.range()]),
        },
        action: Action::from_code(bytes[ACTION.offset]),
    })
}

// ============ Table record ============

pub mod table_fields {
    use super::FieldSpec;

    pub const ID: FieldSpec = FieldSpec::new("id", 0, 4);
    pub const SMASK: FieldSpec = FieldSpec::new("smask", 4, 4);
    pub const DMASK: FieldSpec = FieldSpec::new("dmask", 8, 4);

    pub const ALL: [FieldSpec; 3] = [ID, SMASK, DMASK];
}

/// Size of a packed table record.
pub const TABLE_RECORD_LEN: usize = table_fields::DMASK.end();

/// Encodes a table into its packed record.
pub fn encode_table(table: &AclTable) -> [u8; TABLE_RECORD_LEN] {
    use table_fields::*;

    let mut buf = [0u8; TABLE_RECORD_LEN];
    LittleEndian::write_u32(&mut buf[ID.range()], table.id);
    BigEndian::write_u32(&mut buf[SMASK.range()], table.src_mask);
    BigEndian::write_u32(&mut buf[DMASK.range()], table.dst_mask);
    buf
}

/// Decodes a packed table record.
pub fn decode_table(bytes: &[u8]) -> Result<AclTable, LayoutError> {
    use table_fields::*;

    check_len("table", bytes, TABLE_RECORD_LEN)?;
    Ok(AclTable {
        id: LittleEndian::read_u32(&bytes[ID.range()]),
        src_mask: BigEndian::read_u32(&bytes[SMASK.range()]),
        dst_mask: BigEndian::read_u32(&bytes[DMASK.range()]),
    })
}

// ============ Hash key ============

pub mod key_fields {
    use super::FieldSpec;

    pub const SADDR: FieldSpec = FieldSpec::new("saddr", 0, 4);
    pub const DADDR: FieldSpec = FieldSpec::new("daddr", 4, 4);
    pub const PROTOCOL: FieldSpec = FieldSpec::new("protocol", 8, 1);

    pub const ALL: [FieldSpec; 3] = [SADDR, DADDR, PROTOCOL];
}

/// Size of the masked hash key.
pub const HASH_KEY_LEN: usize = key_fields::PROTOCOL.end();

/// The masked lookup key: source address, destination address (both in
/// network byte order) and protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey([u8; HASH_KEY_LEN]);

impl HashKey {
    /// Builds the key from already-masked addresses.
    #[inline]
    pub fn new(src_addr: u32, dst_addr: u32, protocol: u8) -> Self {
        use key_fields::*;

        let mut buf = [0u8; HASH_KEY_LEN];
        BigEndian::write_u32(&mut buf[SADDR.range()], src_addr);
        BigEndian::write_u32(&mut buf[DADDR.range()], dst_addr);
        buf[PROTOCOL.offset] = protocol;
        HashKey(buf)
    }

    /// Returns the encoded key bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_KEY_LEN] {
        &self.0
    }

    /// Hashes the key with a table ID as seed.
    #[inline]
    pub fn hash(&self, seed: u32) -> u32 {
        jhash(&self.0, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_contiguous(fields: &[FieldSpec], total: usize) {
        let mut offset = 0;
        for field in fields {
            assert_eq!(field.offset, offset, "field {} misplaced", field.name);
            offset = field.end();
        }
        assert_eq!(offset, total);
    }

    #[test]
    fn test_layouts_are_contiguous() {
        assert_contiguous(&rule_fields::ALL, RULE_RECORD_LEN);
        assert_contiguous(&table_fields::ALL, TABLE_RECORD_LEN);
        assert_contiguous(&key_fields::ALL, HASH_KEY_LEN);
        assert_eq!(RULE_RECORD_LEN, 36);
        assert_eq!(TABLE_RECORD_LEN, 12);
        assert_eq!(HASH_KEY_LEN, 9);
    }

    fn sample_rule() -> AclRule {
        AclRule {
            table_id: 0x0102_0304,
            hash: 0xb2de_a0d4,
            protocol: 6,
            src_addr: 0xC0A8_0100,
            src_mask: 0xFFFF_FF00,
            dst_addr: 0x0A00_0000,
            dst_mask: 0xFF00_0000,
            src_ports: PortRange::ANY,
            dst_ports: PortRange { start: 80, end: 443 },
            action: Action::Drop,
        }
    }

    #[test]
    fn test_rule_record_round_trip() {
        let rule = sample_rule();
        let bytes = encode_rule(&rule);
        assert_eq!(decode_rule(&bytes).unwrap(), rule);
    }

    #[test]
    fn test_rule_record_field_bytes() {
        let bytes = encode_rule(&sample_rule());
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(bytes[8], 6);
        assert_eq!(&bytes[9..13], &[192, 168, 1, 0]);
        assert_eq!(&bytes[29..31], &[0, 80]);
        assert_eq!(&bytes[31..33], &[0x01, 0xBB]);
        assert_eq!(bytes[33], 1);
        assert_eq!(&bytes[34..36], &[0, 0]);
    }

    #[test]
    fn test_table_record_round_trip() {
        let table = AclTable::new(7, 0xFFFF_0000, 0xFFFF_FF00);
        let bytes = encode_table(&table);
        assert_eq!(&bytes[4..8], &[255, 255, 0, 0]);
        assert_eq!(decode_table(&bytes).unwrap(), table);
    }

    #[test]
    fn test_decode_wrong_length() {
        assert_eq!(
            decode_rule(&[0u8; 35]),
            Err(LayoutError::Length {
                record: "rule",
                expected: 36,
                actual: 35,
            })
        );
        assert!(decode_table(&[0u8; 13]).is_err());
    }

    #[test]
    fn test_hash_key_network_order() {
        let key = HashKey::new(0xC0A8_0100, 0xC0A8_0100, 1);
        assert_eq!(key.as_bytes(), &[192, 168, 1, 0, 192, 168, 1, 0, 1]);
        assert_eq!(key.hash(1), 0xb2de_a0d4);
    }
}
