//! Stored rule entries and the exact-match predicate.

use acl_types::{Action, IpProtocol, PortRange};

use crate::packet::PacketTuple;

/// One installed ACL rule.
///
/// `src_addr`/`dst_addr` are stored already masked; `hash` is the
/// table-scoped hash computed by the control plane at install time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AclRule {
    pub table_id: u32,
    pub hash: u32,
    pub protocol: u8,
    pub src_addr: u32,
    pub src_mask: u32,
    pub dst_addr: u32,
    pub dst_mask: u32,
    pub src_ports: PortRange,
    pub dst_ports: PortRange,
    pub action: Action,
}

impl AclRule {
    /// An unused slot.
    pub const EMPTY: Self = AclRule {
        table_id: 0,
        hash: 0,
        protocol: 0,
        src_addr: 0,
        src_mask: 0,
        dst_addr: 0,
        dst_mask: 0,
        src_ports: PortRange { start: 0, end: 0 },
        dst_ports: PortRange { start: 0, end: 0 },
        action: Action::Pass,
    };

    /// Cheap rejection: the rule must belong to the table being visited and
    /// carry the hash computed for this packet.
    #[inline(always)]
    pub fn is_candidate(&self, table_id: u32, hash: u32) -> bool {
        self.table_id == table_id && self.hash == hash
    }

    /// Full predicate. Ports are not consulted for ICMP.
    #[inline(always)]
    pub fn matches(&self, pkt: &PacketTuple) -> bool {
        if self.protocol != pkt.protocol
            || self.src_addr != pkt.src_addr & self.src_mask
            || self.dst_addr != pkt.dst_addr & self.dst_mask
        {
            return false;
        }

        pkt.protocol == IpProtocol::Icmp.number()
            || (self.src_ports.contains(pkt.src_port) && self.dst_ports.contains(pkt.dst_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_rule() -> AclRule {
        AclRule {
            table_id: 1,
            hash: 0xabcd,
            protocol: 6,
            src_addr: 0x0A00_0000,
            src_mask: 0xFF00_0000,
            dst_addr: 0xC0A8_0101,
            dst_mask: u32::MAX,
            src_ports: PortRange::ANY,
            dst_ports: PortRange { start: 80, end: 90 },
            action: Action::Drop,
        }
    }

    #[test]
    fn test_candidate_filter() {
        let rule = tcp_rule();
        assert!(rule.is_candidate(1, 0xabcd));
        assert!(!rule.is_candidate(2, 0xabcd));
        assert!(!rule.is_candidate(1, 0xabce));
    }

    #[test]
    fn test_match_port_bounds_inclusive() {
        let rule = tcp_rule();
        for port in [80, 85, 90] {
            let pkt = PacketTuple::with_ports(IpProtocol::Tcp, 0x0A01_0203, 5000, 0xC0A8_0101, port);
            assert!(rule.matches(&pkt), "port {}", port);
        }
        let pkt = PacketTuple::with_ports(IpProtocol::Tcp, 0x0A01_0203, 5000, 0xC0A8_0101, 91);
        assert!(!rule.matches(&pkt));
    }

    #[test]
    fn test_host_dst_mask_rejects_other_destinations() {
        let rule = tcp_rule();
        let pkt = PacketTuple::with_ports(IpProtocol::Tcp, 0x0A00_0001, 1, 0xC0A8_0102, 80);
        assert!(!rule.matches(&pkt));
    }

    #[test]
    fn test_host_src_mask_matches_exact_address_only() {
        let rule = AclRule {
            src_addr: 0x0A01_0203,
            src_mask: u32::MAX,
            ..tcp_rule()
        };
        let from = |src| PacketTuple::with_ports(IpProtocol::Tcp, src, 5000, 0xC0A8_0101, 80);

        assert!(rule.matches(&from(0x0A01_0203)));
        assert!(!rule.matches(&from(0x0A01_0203 ^ 1)));
        assert!(!rule.matches(&from(0x0A01_0203 | 0xFF)));
    }

    #[test]
    fn test_protocol_mismatch() {
        let rule = tcp_rule();
        let pkt = PacketTuple::with_ports(IpProtocol::Udp, 0x0A00_0001, 1, 0xC0A8_0101, 80);
        assert!(!rule.matches(&pkt));
    }

    #[test]
    fn test_icmp_ignores_ports() {
        let rule = AclRule {
            protocol: 1,
            src_ports: PortRange::single(0),
            dst_ports: PortRange::single(0),
            ..tcp_rule()
        };
        let mut pkt = PacketTuple::icmp(0x0A00_0001, 0xC0A8_0101);
        pkt.src_port = 999;
        assert!(rule.matches(&pkt));
    }
}
