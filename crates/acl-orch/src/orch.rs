//! AclOrch - the ACL control plane.
//!
//! The AclOrch owns the working [`AclStore`] and keeps the bookkeeping the
//! data path does not need: rule identities, priorities and the order of
//! rules inside each bucket. It handles:
//! - Table installation and removal
//! - Rule installation (hashing) and removal
//! - Table allocation for rules loaded from a rules file
//! - Publishing immutable snapshots for the data path

use std::collections::HashMap;
use std::sync::Arc;

use acl_dataplane::{bucket_index, AclRule, AclStore, AclTable, StoreError, MAX_TABLES};
use acl_types::mask_len;
use tracing::{debug, info, warn};

use crate::allocator::{find_compatible, sorted_position, table_shape, TableAllocator};
use crate::error::{AclOrchError, Result};
use crate::rule::{InstalledRule, RuleSpec};
use crate::rule_desc::RulesFile;

/// Configuration for AclOrch.
#[derive(Debug, Clone)]
pub struct AclOrchConfig {
    /// Maximum number of tables (at most [`MAX_TABLES`]).
    pub max_tables: usize,
    /// Seed for table ID allocation. `None` draws from system entropy.
    pub table_id_seed: Option<u64>,
}

impl Default for AclOrchConfig {
    fn default() -> Self {
        Self {
            max_tables: MAX_TABLES,
            table_id_seed: None,
        }
    }
}

/// Statistics for AclOrch operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclOrchStats {
    pub tables_created: u64,
    pub tables_deleted: u64,
    pub rules_created: u64,
    pub rules_deleted: u64,
}

/// A stored entry that does not satisfy the hashing invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    /// The entry's table is not installed.
    OrphanRule { bucket: usize, table_id: u32 },
    /// The stored hash differs from the recomputed one.
    HashMismatch {
        bucket: usize,
        table_id: u32,
        stored: u32,
        expected: u32,
    },
    /// The entry sits in a bucket its hash does not select.
    Misplaced { bucket: usize, hash: u32 },
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrphanRule { bucket, table_id } => {
                write!(f, "bucket {}: rule of missing table {}", bucket, table_id)
            }
            Self::HashMismatch {
                bucket,
                table_id,
                stored,
                expected,
            } => write!(
                f,
                "bucket {}: table {} rule hash {:#010x}, expected {:#010x}",
                bucket, table_id, stored, expected
            ),
            Self::Misplaced { bucket, hash } => {
                write!(f, "bucket {}: rule hash {:#010x} selects another bucket", bucket, hash)
            }
        }
    }
}

/// Recomputes the hash of every stored entry and reports those that the
/// data path can never reach.
pub fn validate_store(store: &AclStore) -> Vec<Inconsistency> {
    let mut issues = Vec::new();

    for (bucket, rules) in store.buckets() {
        for rule in rules.rules() {
            if bucket_index(rule.hash) != bucket {
                issues.push(Inconsistency::Misplaced {
                    bucket,
                    hash: rule.hash,
                });
            }

            let Some(table) = store.table(rule.table_id) else {
                issues.push(Inconsistency::OrphanRule {
                    bucket,
                    table_id: rule.table_id,
                });
                continue;
            };

            let expected = table.hash(rule.src_addr, rule.dst_addr, rule.protocol);
            if expected != rule.hash {
                issues.push(Inconsistency::HashMismatch {
                    bucket,
                    table_id: rule.table_id,
                    stored: rule.hash,
                    expected,
                });
            }
        }
    }

    issues
}

/// AclOrch - Main ACL control-plane structure.
#[derive(Debug)]
pub struct AclOrch {
    /// Configuration.
    config: AclOrchConfig,

    /// Working store; published by [`AclOrch::snapshot`].
    store: AclStore,

    /// Table ID source for allocated tables.
    allocator: TableAllocator,

    // ============ Rules ============
    /// Installed rules indexed by identity.
    rules: HashMap<String, InstalledRule>,

    /// Identities per bucket, in the bucket's enumeration order.
    bucket_members: HashMap<usize, Vec<String>>,

    // ============ State ============
    /// Statistics.
    stats: AclOrchStats,
}

impl Default for AclOrch {
    fn default() -> Self {
        Self::new(AclOrchConfig::default())
    }
}

impl AclOrch {
    /// Creates a new AclOrch with the given configuration.
    pub fn new(config: AclOrchConfig) -> Self {
        let allocator = match config.table_id_seed {
            Some(seed) => TableAllocator::with_seed(seed),
            None => TableAllocator::new(),
        };

        Self {
            config,
            store: AclStore::new(),
            allocator,
            rules: HashMap::new(),
            bucket_members: HashMap::new(),
            stats: AclOrchStats::default(),
        }
    }

    /// Returns the working store.
    pub fn store(&self) -> &AclStore {
        &self.store
    }

    /// Publishes the current rule set as an immutable snapshot.
    pub fn snapshot(&self) -> Arc<AclStore> {
        Arc::new(self.store.clone())
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &AclOrchStats {
        &self.stats
    }

    fn max_tables(&self) -> usize {
        self.config.max_tables.min(MAX_TABLES)
    }

    // ============ Table Operations ============

    /// Returns the number of tables.
    pub fn table_count(&self) -> usize {
        self.store.table_count()
    }

    /// Installed tables in enumeration order.
    pub fn tables(&self) -> &[AclTable] {
        self.store.tables()
    }

    pub fn has_table(&self, id: u32) -> bool {
        self.store.table(id).is_some()
    }

    /// Installs a table. Tables are kept in ascending order of mask
    /// lengths, which is also the data path's enumeration order.
    pub fn install_table(&mut self, id: u32, src_mask: u32, dst_mask: u32) -> Result<()> {
        if mask_len(src_mask).is_none() {
            return Err(AclOrchError::invalid_table(
                id,
                format!("non-contiguous source mask {:#010x}", src_mask),
            ));
        }
        if mask_len(dst_mask).is_none() {
            return Err(AclOrchError::invalid_table(
                id,
                format!("non-contiguous destination mask {:#010x}", dst_mask),
            ));
        }
        if self.has_table(id) {
            return Err(AclOrchError::TableExists(id));
        }
        if self.table_count() >= self.max_tables() {
            return Err(AclOrchError::TableLimit {
                max: self.max_tables(),
            });
        }

        let table = AclTable::new(id, src_mask, dst_mask);
        let pos = sorted_position(self.store.tables(), table_shape(&table));
        self.store.insert_table(pos, table).map_err(|e| match e {
            StoreError::TableExists(id) => AclOrchError::TableExists(id),
            _ => AclOrchError::TableLimit { max: MAX_TABLES },
        })?;

        self.stats.tables_created += 1;
        info!(
            table_id = id,
            src_mask = %format!("{:#010x}", src_mask),
            dst_mask = %format!("{:#010x}", dst_mask),
            "Installed ACL table"
        );
        Ok(())
    }

    /// Removes a table and every rule installed under it. Returns the
    /// removed rules.
    pub fn remove_table(&mut self, id: u32) -> Result<Vec<InstalledRule>> {
        if !self.has_table(id) {
            return Err(AclOrchError::TableNotFound(id));
        }

        let mut identities: Vec<String> = self
            .rules
            .values()
            .filter(|rule| rule.table_id() == id)
            .map(|rule| rule.identity.clone())
            .collect();
        identities.sort();

        let mut removed = Vec::with_capacity(identities.len());
        for identity in identities {
            removed.push(self.unlink_rule(&identity)?);
        }

        self.store.remove_table(id);
        self.stats.tables_deleted += 1;
        info!(table_id = id, rules = removed.len(), "Removed ACL table");
        Ok(removed)
    }

    // ============ Rule Operations ============

    /// Returns the number of installed rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Gets an installed rule by identity.
    pub fn get_rule(&self, identity: &str) -> Option<&InstalledRule> {
        self.rules.get(identity)
    }

    /// Identities in the enumeration order of `bucket`.
    pub fn bucket_members(&self, bucket: usize) -> &[String] {
        self.bucket_members
            .get(&bucket)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Installs a rule into an existing table.
    ///
    /// The stored hash is computed from the rule addresses masked with the
    /// table's masks, seeded with the table ID, so it equals the hash the
    /// data path derives for every packet the rule matches. Within its
    /// bucket the rule is placed after every rule of equal or higher
    /// priority.
    pub fn install_rule(
        &mut self,
        table_id: u32,
        identity: &str,
        spec: &RuleSpec,
    ) -> Result<InstalledRule> {
        let table = *self
            .store
            .table(table_id)
            .ok_or(AclOrchError::TableNotFound(table_id))?;

        if self.rules.contains_key(identity) {
            return Err(AclOrchError::RuleExists(identity.to_string()));
        }
        if !spec.fits(&table) {
            return Err(AclOrchError::invalid_rule(
                identity,
                format!(
                    "prefixes {} -> {} are broader than table {}",
                    spec.src, spec.dst, table_id
                ),
            ));
        }

        let entry = spec.to_entry(&table);
        let bucket = bucket_index(entry.hash);
        let members = self.bucket_members(bucket);
        let pos = members
            .iter()
            .position(|member| {
                self.rules
                    .get(member)
                    .map_or(false, |other| other.priority < spec.priority)
            })
            .unwrap_or(members.len());

        self.store
            .update_bucket(bucket, |b| b.insert(pos, entry))
            .and_then(|inserted| inserted)
            .map_err(|e| match e {
                StoreError::BucketFull { capacity } => AclOrchError::BucketFull {
                    rule: identity.to_string(),
                    index: bucket,
                    capacity,
                },
                other => AclOrchError::invalid_rule(identity, other.to_string()),
            })?;

        self.bucket_members
            .entry(bucket)
            .or_default()
            .insert(pos, identity.to_string());

        let installed = InstalledRule {
            identity: identity.to_string(),
            priority: spec.priority,
            bucket,
            entry,
        };
        self.rules.insert(identity.to_string(), installed.clone());
        self.stats.rules_created += 1;

        debug!(
            rule = identity,
            table_id,
            hash = %format!("{:#010x}", entry.hash),
            bucket,
            position = pos,
            "Installed ACL rule"
        );
        Ok(installed)
    }

    /// Removes a rule. `table_id` and `hash` must match the installed rule.
    pub fn remove_rule(&mut self, table_id: u32, hash: u32, identity: &str) -> Result<InstalledRule> {
        match self.rules.get(identity) {
            Some(rule) if rule.table_id() == table_id && rule.hash() == hash => {}
            _ => return Err(AclOrchError::RuleNotFound(identity.to_string())),
        }

        let removed = self.unlink_rule(identity)?;
        debug!(rule = identity, table_id, "Removed ACL rule");
        Ok(removed)
    }

    fn unlink_rule(&mut self, identity: &str) -> Result<InstalledRule> {
        let not_found = || AclOrchError::RuleNotFound(identity.to_string());
        let bucket = self.rules.get(identity).ok_or_else(not_found)?.bucket;

        let members = self.bucket_members.entry(bucket).or_default();
        let pos = members
            .iter()
            .position(|member| member == identity)
            .ok_or_else(not_found)?;
        members.remove(pos);
        if members.is_empty() {
            self.bucket_members.remove(&bucket);
        }

        let stored: Option<AclRule> = self
            .store
            .update_bucket(bucket, |b| b.remove(pos))
            .map_err(|_| not_found())?;
        let rule = self.rules.remove(identity).ok_or_else(not_found)?;
        if stored != Some(rule.entry) {
            warn!(rule = identity, bucket, "Bucket order out of sync");
        }

        self.stats.rules_deleted += 1;
        Ok(rule)
    }

    /// Installs a rule into the first compatible table, creating one with
    /// the rule's own masks when none fits.
    pub fn add_rule(&mut self, identity: &str, spec: &RuleSpec) -> Result<InstalledRule> {
        let (src_len, dst_len) = (spec.src.prefix_len(), spec.dst.prefix_len());

        let existing = find_compatible(self.store.tables(), src_len, dst_len).map(|t| t.id);
        let table_id = match existing {
            Some(id) => id,
            None => {
                let store = &self.store;
                let table = self
                    .allocator
                    .new_table(src_len, dst_len, |id| store.table(id).is_some());
                self.install_table(table.id, table.src_mask, table.dst_mask)?;
                table.id
            }
        };

        self.install_rule(table_id, identity, spec)
    }

    /// Installs every rule of a rules file, identified as `rule-<index>`.
    /// Returns the number of rules installed.
    ///
    /// Rules are placed broadest first, so a rule nested inside another
    /// lands in the broader rule's table and bucket, where priority decides.
    pub fn load_rules(&mut self, file: &RulesFile) -> Result<usize> {
        let mut specs = file.parse_all()?;
        specs.sort_by_key(|(_, spec)| (spec.src.prefix_len(), spec.dst.prefix_len()));
        for (identity, spec) in &specs {
            self.add_rule(identity, spec)?;
        }

        info!(
            rules = specs.len(),
            tables = self.table_count(),
            "Loaded ACL rules"
        );
        Ok(specs.len())
    }

    /// Checks every stored entry against its table.
    pub fn validate(&self) -> Vec<Inconsistency> {
        validate_store(&self.store)
    }
}
