//! Error types for control-plane operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for AclOrch operations.
pub type Result<T> = std::result::Result<T, AclOrchError>;

/// Errors raised while installing or removing tables and rules.
#[derive(Debug, Error)]
pub enum AclOrchError {
    /// Table not found.
    #[error("ACL table not found: {0}")]
    TableNotFound(u32),

    /// Table already exists.
    #[error("ACL table already exists: {0}")]
    TableExists(u32),

    /// No free table slot left.
    #[error("ACL table limit reached ({max} tables)")]
    TableLimit { max: usize },

    /// Table masks are unusable.
    #[error("Invalid ACL table {id}: {reason}")]
    InvalidTable { id: u32, reason: String },

    /// A rule with the same identity is installed.
    #[error("ACL rule already exists: {0}")]
    RuleExists(String),

    /// No rule with this identity (or with a different table/hash).
    #[error("ACL rule not found: {0}")]
    RuleNotFound(String),

    /// The bucket selected by the rule hash has no free slot.
    #[error("Bucket {index} is full ({capacity} rules), cannot install {rule}")]
    BucketFull {
        rule: String,
        index: usize,
        capacity: usize,
    },

    /// A rule description could not be turned into a rule.
    #[error("Invalid ACL rule {rule}: {reason}")]
    InvalidRule { rule: String, reason: String },

    /// Rules file is not valid JSON.
    #[error("Failed to decode rules file {}: {source}", .path.display())]
    RulesFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Rules file could not be read.
    #[error("Failed to read rules file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AclOrchError {
    /// Creates an invalid rule error.
    pub fn invalid_rule(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid table error.
    pub fn invalid_table(id: u32, reason: impl Into<String>) -> Self {
        Self::InvalidTable {
            id,
            reason: reason.into(),
        }
    }
}
