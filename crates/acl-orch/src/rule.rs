//! Rule specifications and installed-rule bookkeeping.

use acl_dataplane::{AclRule, AclTable};
use acl_types::{Action, IpProtocol, Ipv4Prefix, PortRange};

/// A rule as requested by the operator, before it is bound to a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub protocol: IpProtocol,
    pub src: Ipv4Prefix,
    pub dst: Ipv4Prefix,
    pub src_ports: PortRange,
    pub dst_ports: PortRange,
    pub action: Action,
    /// Higher values are enumerated first within a bucket.
    pub priority: u64,
}

impl RuleSpec {
    /// Creates a rule matching every port, with a drop action.
    pub fn new(protocol: IpProtocol, src: Ipv4Prefix, dst: Ipv4Prefix) -> Self {
        Self {
            protocol,
            src,
            dst,
            src_ports: PortRange::ANY,
            dst_ports: PortRange::ANY,
            action: Action::Drop,
            priority: 0,
        }
    }

    pub fn with_src_ports(mut self, ports: PortRange) -> Self {
        self.src_ports = ports;
        self
    }

    pub fn with_dst_ports(mut self, ports: PortRange) -> Self {
        self.dst_ports = ports;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn with_priority(mut self, priority: u64) -> Self {
        self.priority = priority;
        self
    }

    /// Returns true if the rule is at least as specific as the table on
    /// both addresses, i.e. every table mask bit is also a rule mask bit.
    pub fn fits(&self, table: &AclTable) -> bool {
        self.src.mask() & table.src_mask == table.src_mask
            && self.dst.mask() & table.dst_mask == table.dst_mask
    }

    /// Builds the stored entry for `table`, hashing the masked key with the
    /// table ID as seed. ICMP rules carry `0..=0` port ranges.
    pub fn to_entry(&self, table: &AclTable) -> AclRule {
        let protocol = self.protocol.number();
        let (src_ports, dst_ports) = if self.protocol.has_ports() {
            (self.src_ports, self.dst_ports)
        } else {
            (PortRange::single(0), PortRange::single(0))
        };

        AclRule {
            table_id: table.id,
            hash: table.hash(self.src.masked_addr(), self.dst.masked_addr(), protocol),
            protocol,
            src_addr: self.src.masked_addr(),
            src_mask: self.src.mask(),
            dst_addr: self.dst.masked_addr(),
            dst_mask: self.dst.mask(),
            src_ports,
            dst_ports,
            action: self.action,
        }
    }
}

/// A rule held by the control plane, with the data needed to find and
/// remove its stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRule {
    pub identity: String,
    pub priority: u64,
    /// Bucket index selected by `entry.hash`.
    pub bucket: usize,
    pub entry: AclRule,
}

impl InstalledRule {
    pub fn table_id(&self) -> u32 {
        self.entry.table_id
    }

    pub fn hash(&self) -> u32 {
        self.entry.hash
    }
}
