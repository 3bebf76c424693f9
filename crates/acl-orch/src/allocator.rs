//! Table allocation for rules loaded without an explicit table.
//!
//! Tables are identified by their prefix-length shape `(src_len, dst_len)`
//! and enumerated in ascending shape order. A rule goes into the first
//! table that is no more specific than the rule on either address; when
//! none exists a new table is created with the rule's own shape and a
//! random, unused, non-zero ID.

use acl_dataplane::AclTable;
use acl_types::{mask_len, prefix_mask};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Prefix lengths of a table's source and destination masks.
pub fn table_shape(table: &AclTable) -> (u8, u8) {
    (
        mask_len(table.src_mask).unwrap_or(32),
        mask_len(table.dst_mask).unwrap_or(32),
    )
}

/// Returns the first table in `tables` able to hold a rule of the given
/// shape.
pub fn find_compatible(tables: &[AclTable], src_len: u8, dst_len: u8) -> Option<&AclTable> {
    tables.iter().find(|table| {
        let (s, d) = table_shape(table);
        s <= src_len && d <= dst_len
    })
}

/// Position at which a table of the given shape keeps `tables` sorted.
/// Equal shapes go after existing ones.
pub fn sorted_position(tables: &[AclTable], shape: (u8, u8)) -> usize {
    tables
        .iter()
        .position(|table| table_shape(table) > shape)
        .unwrap_or(tables.len())
}

/// Hands out table IDs.
#[derive(Debug)]
pub struct TableAllocator {
    rng: StdRng,
}

impl Default for TableAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TableAllocator {
    /// Creates an allocator seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates an allocator producing a reproducible ID sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws a random non-zero ID for which `in_use` is false.
    pub fn next_id(&mut self, in_use: impl Fn(u32) -> bool) -> u32 {
        loop {
            let id = self.rng.gen::<u32>();
            if id != 0 && !in_use(id) {
                return id;
            }
        }
    }

    /// Builds a new table for a rule shape.
    pub fn new_table(&mut self, src_len: u8, dst_len: u8, in_use: impl Fn(u32) -> bool) -> AclTable {
        AclTable::new(self.next_id(in_use), prefix_mask(src_len), prefix_mask(dst_len))
    }
}
