//! JSON rule descriptions and rules files.
//!
//! A rules file holds a single object:
//!
//! ```json
//! {
//!   "rules": [
//!     {"saddr": "192.168.1.0/24", "daddr": "192.168.1.0/24",
//!      "proto": "icmp", "action": "deny", "priority": 10},
//!     {"saddr": "10.0.0.0/8", "daddr": "0.0.0.0/0",
//!      "sport": "*", "dport": "80-90", "proto": "tcp", "action": "allow"}
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use acl_types::{Action, IpProtocol, Ipv4Prefix, PortRange};
use serde::{Deserialize, Serialize};

use crate::error::{AclOrchError, Result};
use crate::rule::RuleSpec;

/// One rule as written in a rules file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDesc {
    /// Source CIDR like `"192.168.0.0/24"`.
    pub saddr: String,

    /// Destination CIDR.
    pub daddr: String,

    /// Source port: `"80"`, `"80-90"`, `"*"` or `"all"`. May be empty for
    /// ICMP.
    #[serde(default)]
    pub sport: String,

    /// Destination port, same syntax as `sport`.
    #[serde(default)]
    pub dport: String,

    /// `tcp`, `udp` or `icmp`, case insensitive.
    pub proto: String,

    /// `allow` or `deny`, case insensitive.
    pub action: String,

    /// Higher values take precedence over overlapping rules that share a
    /// table. `load_rules` puts nested rules in the same table.
    #[serde(default)]
    pub priority: u64,
}

impl RuleDesc {
    /// Parses the description into a [`RuleSpec`].
    ///
    /// Port fields are only parsed for TCP and UDP.
    pub fn parse(&self) -> std::result::Result<RuleSpec, String> {
        let src: Ipv4Prefix = self
            .saddr
            .parse()
            .map_err(|e| format!("invalid saddr: {}", e))?;
        let dst: Ipv4Prefix = self
            .daddr
            .parse()
            .map_err(|e| format!("invalid daddr: {}", e))?;
        let protocol: IpProtocol = self
            .proto
            .parse()
            .map_err(|e| format!("invalid proto: {}", e))?;

        let mut spec = RuleSpec::new(protocol, src, dst);
        if protocol.has_ports() {
            let sport: PortRange = self
                .sport
                .parse()
                .map_err(|e| format!("invalid sport: {}", e))?;
            let dport: PortRange = self
                .dport
                .parse()
                .map_err(|e| format!("invalid dport: {}", e))?;
            spec = spec.with_src_ports(sport).with_dst_ports(dport);
        }

        let action: Action = self
            .action
            .parse()
            .map_err(|e| format!("invalid action: {}", e))?;

        Ok(spec.with_action(action).with_priority(self.priority))
    }
}

/// Contents of a rules file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub rules: Vec<RuleDesc>,
}

impl RulesFile {
    /// Identity given to the rule at `index` of a rules file.
    pub fn identity(index: usize) -> String {
        format!("rule-{}", index)
    }

    /// Reads and decodes a rules file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| AclOrchError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| AclOrchError::RulesFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses every rule, naming the first failure by its identity.
    pub fn parse_all(&self) -> Result<Vec<(String, RuleSpec)>> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, desc)| {
                let identity = Self::identity(index);
                desc.parse()
                    .map(|spec| (identity.clone(), spec))
                    .map_err(|reason| AclOrchError::invalid_rule(identity, reason))
            })
            .collect()
    }
}
