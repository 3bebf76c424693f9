//! Line-rate ACL classification over a two-level hashed rule store.
//!
//! A packet's 5-tuple is matched against a small, ordered set of tables.
//! Each table masks the packet addresses with its own pair of masks, hashes
//! the masked key with [`jhash`] seeded by the table ID, and selects one of
//! [`RULE_BUCKETS_NUM`] buckets. The bucket's rules are scanned with a hash
//! pre-filter followed by the full predicate; the first hit wins.
//!
//! # Execution model
//!
//! The classification path never allocates, never blocks and never takes a
//! lock. Every loop is bounded by a compile-time capacity:
//!
//! - tables: [`MAX_TABLES`]
//! - rules per bucket: [`MAX_BUCKET_RULES`]
//!
//! Malformed frames and misses are values, not errors: both resolve to the
//! fail-open [`Action::Pass`].
//!
//! # Architecture
//!
//! ```text
//! raw frame ──> packet::extract ──> PacketTuple
//!                                        │
//!                       for each table (≤ MAX_TABLES)
//!                                        │
//!              masked key ─> jhash(seed = table id) ─> bucket index
//!                                        │
//!                       RuleBucket::scan (≤ MAX_BUCKET_RULES)
//!                                        │
//!                              Verdict / Action
//! ```
//!
//! The store is populated by the control plane (`acl-orch`); the data path
//! only borrows it.

mod bucket;
mod classify;
mod jhash;
pub mod layout;
pub mod packet;
mod rule;
mod store;
mod table;

pub use acl_types::Action;
pub use bucket::{NoProbe, RuleBucket, RuleProbe};
pub use classify::{
    classify, classify_frame, classify_tuple, classify_tuple_with_probe, MatchState, Verdict,
};
pub use jhash::{jhash, jhash_checked, JHASH_INITVAL, JHASH_MAX_KEY_LEN};
pub use layout::{HashKey, LayoutError};
pub use packet::{extract, PacketTuple, Skip};
pub use rule::AclRule;
pub use store::{AclStore, StoreError};
pub use table::{bucket_index, classify_table, AclTable};

/// Number of hash buckets. Must be a power of two.
pub const RULE_BUCKETS_NUM: usize = 0x8000;

/// Maximum number of tables visited per packet.
pub const MAX_TABLES: usize = 0x80;

/// Maximum number of rules stored in a single bucket.
pub const MAX_BUCKET_RULES: usize = 16;

const _: () = assert!(RULE_BUCKETS_NUM.is_power_of_two());
