//! ACL control plane.
//!
//! Turns operator rules into stored entries the data path can reach:
//!
//! ```text
//! rules.json ──> RulesFile ──> RuleDesc::parse ──> RuleSpec
//!                                                     │
//!                       AclOrch::add_rule (table allocation)
//!                                                     │
//!          AclOrch::install_rule: hash = jhash(masked key, seed = table id)
//!                                                     │
//!                  AclStore bucket (priority ordered) ──> snapshot()
//! ```
//!
//! # Key Types
//!
//! - [`AclOrch`]: table/rule bookkeeping over a working [`AclStore`]
//! - [`RuleSpec`]: a parsed rule, independent of any table
//! - [`RuleDesc`] / [`RulesFile`]: the JSON rules file format
//! - [`TableAllocator`]: random table IDs for allocated tables
//!
//! [`AclStore`]: acl_dataplane::AclStore

pub mod allocator;
mod error;
mod orch;
mod rule;
mod rule_desc;

pub use allocator::TableAllocator;
pub use error::{AclOrchError, Result};
pub use orch::{validate_store, AclOrch, AclOrchConfig, AclOrchStats, Inconsistency};
pub use rule::{InstalledRule, RuleSpec};
pub use rule_desc::{RuleDesc, RulesFile};
