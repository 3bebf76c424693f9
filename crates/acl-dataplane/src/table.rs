//! Tables and the per-table classification step.

use crate::bucket::RuleProbe;
use crate::classify::MatchState;
use crate::layout::HashKey;
use crate::packet::PacketTuple;
use crate::store::AclStore;
use crate::RULE_BUCKETS_NUM;

/// One tuple-space partition: a pair of address masks and the ID used as
/// hash seed for every rule installed under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AclTable {
    pub id: u32,
    pub src_mask: u32,
    pub dst_mask: u32,
}

impl AclTable {
    pub const fn new(id: u32, src_mask: u32, dst_mask: u32) -> Self {
        AclTable {
            id,
            src_mask,
            dst_mask,
        }
    }

    /// Masks the addresses with this table's masks and encodes the key.
    #[inline]
    pub fn masked_key(&self, src_addr: u32, dst_addr: u32, protocol: u8) -> HashKey {
        HashKey::new(src_addr & self.src_mask, dst_addr & self.dst_mask, protocol)
    }

    /// Table-scoped hash of an address pair and protocol.
    #[inline]
    pub fn hash(&self, src_addr: u32, dst_addr: u32, protocol: u8) -> u32 {
        self.masked_key(src_addr, dst_addr, protocol).hash(self.id)
    }

    /// Table-scoped hash of a packet tuple.
    #[inline]
    pub fn hash_tuple(&self, pkt: &PacketTuple) -> u32 {
        self.hash(pkt.src_addr, pkt.dst_addr, pkt.protocol)
    }
}

/// Reduces a hash to a bucket index.
#[inline(always)]
pub const fn bucket_index(hash: u32) -> usize {
    hash as usize & (RULE_BUCKETS_NUM - 1)
}

/// Runs one table against the packet in `state`.
///
/// Records the table ID and hash into `state` and scans the selected
/// bucket. Returns true on a match, with `state.action` set.
#[inline]
pub fn classify_table<P: RuleProbe + ?Sized>(
    store: &AclStore,
    table: &AclTable,
    state: &mut MatchState,
    probe: &mut P,
) -> bool {
    let hash = table.hash_tuple(&state.tuple);
    state.table_id = table.id;
    state.hash = hash;

    match store.bucket(bucket_index(hash)) {
        Some(bucket) => bucket.scan(state, probe),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bucket_index_in_range() {
        for hash in [0, 1, 0x7fff, 0x8000, 0xdead_beef, u32::MAX] {
            let index = bucket_index(hash);
            assert!(index < RULE_BUCKETS_NUM);
            assert_eq!(index, bucket_index(hash));
        }
        assert_eq!(bucket_index(0x8001), 1);
        assert_eq!(bucket_index(u32::MAX), RULE_BUCKETS_NUM - 1);
    }

    #[test]
    fn test_masking_is_idempotent() {
        let table = AclTable::new(9, 0xFFFF_FF00, 0xFFFF_0000);
        let (src, dst) = (0xC0A8_0142, 0x0A0B_0C0D);
        assert_eq!(
            table.hash(src, dst, 6),
            table.hash(src & table.src_mask, dst & table.dst_mask, 6)
        );
    }

    #[test]
    fn test_hash_uses_table_id_as_seed() {
        let table = AclTable::new(1, 0xFFFF_FF00, 0xFFFF_FF00);
        assert_eq!(table.hash(0xC0A8_0105, 0xC0A8_0109, 1), 0xb2de_a0d4);
        let other = AclTable::new(2, 0xFFFF_FF00, 0xFFFF_FF00);
        assert_ne!(other.hash(0xC0A8_0105, 0xC0A8_0109, 1), 0xb2de_a0d4);
    }

    #[test]
    fn test_empty_bucket_yields_no_match() {
        let store = AclStore::new();
        let table = AclTable::new(1, u32::MAX, u32::MAX);
        let mut state = MatchState::new(PacketTuple::icmp(1, 2));
        assert!(!classify_table(&store, &table, &mut state, &mut crate::NoProbe));
        assert_eq!(state.table_id, 1);
        assert_eq!(state.hash, table.hash(1, 2, 1));
        assert!(!state.matched);
    }
}
