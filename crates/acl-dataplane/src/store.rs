//! The shared rule store: a table directory and the hashed bucket array.
//!
//! Writers hold the store by `&mut` (or own a private clone); readers only
//! ever see `&AclStore`. Buckets are reference counted, so cloning a store
//! to publish a snapshot copies one pointer per bucket and
//! [`AclStore::update_bucket`] rewrites a shared bucket by copying it
//! first. A reader holding an older snapshot keeps seeing the old bucket in
//! full.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::bucket::RuleBucket;
use crate::rule::AclRule;
use crate::table::AclTable;
use crate::{MAX_TABLES, RULE_BUCKETS_NUM};

/// Errors raised by store mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("table directory full ({max} tables)")]
    TableLimit { max: usize },

    #[error("table {0} already exists")]
    TableExists(u32),

    #[error("bucket full ({capacity} rules)")]
    BucketFull { capacity: usize },

    #[error("bucket index {0} out of range")]
    BucketIndex(usize),
}

/// Table directory plus per-bucket rule collections.
#[derive(Clone)]
pub struct AclStore {
    tables: [AclTable; MAX_TABLES],
    table_count: usize,
    buckets: Box<[Option<Arc<RuleBucket>>]>,
}

impl Default for AclStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AclStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AclStore")
            .field("tables", &self.tables())
            .field("buckets", &self.bucket_count())
            .field("rules", &self.rule_count())
            .finish()
    }
}

impl AclStore {
    pub fn new() -> Self {
        AclStore {
            tables: [AclTable::default(); MAX_TABLES],
            table_count: 0,
            buckets: vec![None; RULE_BUCKETS_NUM].into_boxed_slice(),
        }
    }

    // ============ Tables ============

    /// Installed tables in enumeration order.
    pub fn tables(&self) -> &[AclTable] {
        &self.tables[..self.table_count]
    }

    pub fn table(&self, id: u32) -> Option<&AclTable> {
        self.tables().iter().find(|t| t.id == id)
    }

    /// Position of a table in enumeration order.
    pub fn table_position(&self, id: u32) -> Option<usize> {
        self.tables().iter().position(|t| t.id == id)
    }

    pub fn table_count(&self) -> usize {
        self.table_count
    }

    /// Inserts a table at `pos` in enumeration order (clamped to the end).
    pub fn insert_table(&mut self, pos: usize, table: AclTable) -> Result<(), StoreError> {
        if self.table(table.id).is_some() {
            return Err(StoreError::TableExists(table.id));
        }
        if self.table_count == MAX_TABLES {
            return Err(StoreError::TableLimit { max: MAX_TABLES });
        }

        let pos = pos.min(self.table_count);
        self.tables.copy_within(pos..self.table_count, pos + 1);
        self.tables[pos] = table;
        self.table_count += 1;
        Ok(())
    }

    /// Appends a table after every existing one.
    pub fn push_table(&mut self, table: AclTable) -> Result<(), StoreError> {
        self.insert_table(self.table_count, table)
    }

    /// Removes a table from the directory. Its rules are left in place and
    /// become unreachable; the caller purges them.
    pub fn remove_table(&mut self, id: u32) -> Option<AclTable> {
        let pos = self.table_position(id)?;
        let table = self.tables[pos];
        self.tables.copy_within(pos + 1..self.table_count, pos);
        self.table_count -= 1;
        self.tables[self.table_count] = AclTable::default();
        Some(table)
    }

    // ============ Buckets ============

    /// The rule collection at `index`, if any rule is stored there.
    #[inline]
    pub fn bucket(&self, index: usize) -> Option<&RuleBucket> {
        self.buckets.get(index)?.as_deref()
    }

    /// Applies `f` to the bucket at `index`, copying it first if a snapshot
    /// still shares it. A bucket left empty is released.
    pub fn update_bucket<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut RuleBucket) -> R,
    ) -> Result<R, StoreError> {
        let slot = self
            .buckets
            .get_mut(index)
            .ok_or(StoreError::BucketIndex(index))?;

        let bucket = Arc::make_mut(slot.get_or_insert_with(Default::default));
        let result = f(bucket);
        if bucket.is_empty() {
            *slot = None;
        }
        Ok(result)
    }

    /// Non-empty buckets with their indices.
    pub fn buckets(&self) -> impl Iterator<Item = (usize, &RuleBucket)> {
        self.buckets
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_deref().map(|bucket| (index, bucket)))
    }

    /// Every stored rule, bucket by bucket.
    pub fn rules(&self) -> impl Iterator<Item = &AclRule> {
        self.buckets().flat_map(|(_, bucket)| bucket.rules().iter())
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets().count()
    }

    pub fn rule_count(&self) -> usize {
        self.buckets().map(|(_, bucket)| bucket.len()).sum()
    }

    /// Returns true if both stores share the same bucket allocation at
    /// `index`.
    pub fn shares_bucket(&self, other: &AclStore, index: usize) -> bool {
        match (self.buckets.get(index), other.buckets.get(index)) {
            (Some(Some(a)), Some(Some(b))) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
