//! End-to-end classification tests over a hand-populated store.
//!
//! Rules are installed the way the control plane does it: hash the masked
//! key with the table ID as seed, then push into the selected bucket.

use acl_dataplane::packet::testing::{icmp_frame, ipv4_frame};
use acl_dataplane::{
    bucket_index, classify, classify_frame, classify_tuple_with_probe, AclRule, AclStore,
    AclTable, Action, PacketTuple, RuleProbe, Skip, Verdict, MAX_BUCKET_RULES,
};
use acl_types::{IpProtocol, PortRange};
use pretty_assertions::assert_eq;

const NET_192_168_1: u32 = 0xC0A8_0100;

fn install(
    store: &mut AclStore,
    table: &AclTable,
    protocol: u8,
    src: u32,
    dst: u32,
    dst_ports: PortRange,
    action: Action,
) -> AclRule {
    let hash = table.hash(src, dst, protocol);
    let rule = AclRule {
        table_id: table.id,
        hash,
        protocol,
        src_addr: src & table.src_mask,
        src_mask: table.src_mask,
        dst_addr: dst & table.dst_mask,
        dst_mask: table.dst_mask,
        src_ports: PortRange::ANY,
        dst_ports,
        action,
    };
    store
        .update_bucket(bucket_index(hash), |bucket| bucket.push(rule))
        .unwrap()
        .unwrap();
    rule
}

fn scenario_store() -> AclStore {
    let mut store = AclStore::new();
    let table = AclTable::new(1, 0xFFFF_FF00, 0xFFFF_FF00);
    store.push_table(table).unwrap();
    install(
        &mut store,
        &table,
        IpProtocol::Icmp.number(),
        NET_192_168_1,
        NET_192_168_1,
        PortRange::single(0),
        Action::Drop,
    );
    store
}

#[derive(Default)]
struct CountingProbe {
    predicates: usize,
}

impl RuleProbe for CountingProbe {
    fn on_predicate(&mut self, _rule: &AclRule) {
        self.predicates += 1;
    }
}

#[test]
fn test_end_to_end_drop_and_default_pass() {
    let store = scenario_store();

    let frame = icmp_frame(0xC0A8_0105, 0xC0A8_0109);
    assert_eq!(classify(&store, &frame), Action::Drop);
    assert_eq!(
        classify_frame(&store, &frame),
        Verdict::Matched {
            table_id: 1,
            action: Action::Drop
        }
    );

    let frame = icmp_frame(0x0A00_0005, 0xC0A8_0109);
    assert_eq!(classify(&store, &frame), Action::Pass);
    assert_eq!(classify_frame(&store, &frame), Verdict::Exhausted);
}

#[test]
fn test_same_addresses_other_protocol_pass() {
    let store = scenario_store();
    let frame = ipv4_frame(6, 0xC0A8_0105, 1000, 0xC0A8_0109, 22);
    assert_eq!(classify(&store, &frame), Action::Pass);
}

#[test]
fn test_first_match_performs_no_further_comparisons() {
    let mut store = AclStore::new();
    let table = AclTable::new(3, u32::MAX, u32::MAX);
    store.push_table(table).unwrap();

    let (src, dst) = (0x0A00_0001, 0x0A00_0002);
    install(&mut store, &table, 6, src, dst, PortRange::ANY, Action::Drop);
    install(&mut store, &table, 6, src, dst, PortRange::ANY, Action::Tx);

    let tuple = PacketTuple::with_ports(IpProtocol::Tcp, src, 1234, dst, 80);
    let mut probe = CountingProbe::default();
    assert_eq!(
        classify_tuple_with_probe(&store, &tuple, &mut probe),
        Verdict::Matched {
            table_id: 3,
            action: Action::Drop
        }
    );
    assert_eq!(probe.predicates, 1);
}

#[test]
fn test_port_ranges_checked_for_tcp() {
    let mut store = AclStore::new();
    let table = AclTable::new(9, u32::MAX, 0xFFFF_FF00);
    store.push_table(table).unwrap();
    install(
        &mut store,
        &table,
        6,
        0x0A00_0001,
        NET_192_168_1,
        PortRange { start: 80, end: 90 },
        Action::Drop,
    );

    let hit = ipv4_frame(6, 0x0A00_0001, 5555, 0xC0A8_0150, 85);
    let miss = ipv4_frame(6, 0x0A00_0001, 5555, 0xC0A8_0150, 91);
    assert_eq!(classify(&store, &hit), Action::Drop);
    assert_eq!(classify(&store, &miss), Action::Pass);
}

#[test]
fn test_truncated_frames_fail_open() {
    let store = scenario_store();
    let frame = icmp_frame(0xC0A8_0105, 0xC0A8_0109);
    for len in 0..frame.len() {
        assert_eq!(classify(&store, &frame[..len]), Action::Pass, "len={}", len);
    }
    assert_eq!(
        classify_frame(&store, &frame[..20]),
        Verdict::Skipped(Skip::Truncated)
    );
}

#[test]
fn test_unreachable_rule_with_wrong_hash() {
    let mut store = AclStore::new();
    let table = AclTable::new(1, 0xFFFF_FF00, 0xFFFF_FF00);
    store.push_table(table).unwrap();

    let mut rule = install(
        &mut store,
        &table,
        1,
        NET_192_168_1,
        NET_192_168_1,
        PortRange::single(0),
        Action::Drop,
    );
    // Same rule stored under a hash computed with the wrong seed.
    let index = bucket_index(rule.hash);
    store.update_bucket(index, |b| b.remove(0)).unwrap();
    rule.hash = AclTable::new(2, table.src_mask, table.dst_mask).hash(
        NET_192_168_1,
        NET_192_168_1,
        1,
    );
    store
        .update_bucket(index, |b| b.push(rule))
        .unwrap()
        .unwrap();

    let frame = icmp_frame(0xC0A8_0105, 0xC0A8_0109);
    assert_eq!(classify(&store, &frame), Action::Pass);
}

#[test]
fn test_bucket_capacity_shared_by_colliding_rules() {
    let mut store = AclStore::new();
    let table = AclTable::new(1, u32::MAX, u32::MAX);
    store.push_table(table).unwrap();
    for _ in 0..MAX_BUCKET_RULES {
        install(&mut store, &table, 1, 1, 2, PortRange::ANY, Action::Drop);
    }
    let hash = table.hash(1, 2, 1);
    assert!(store.bucket(bucket_index(hash)).unwrap().is_full());
}

#[test]
fn test_concurrent_readers_share_store() {
    let store = scenario_store();
    let drop_frame = icmp_frame(0xC0A8_0105, 0xC0A8_0109);
    let pass_frame = icmp_frame(0x0A00_0005, 0xC0A8_0109);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..1000 {
                    assert_eq!(classify(&store, &drop_frame), Action::Drop);
                    assert_eq!(classify(&store, &pass_frame), Action::Pass);
                }
            });
        }
    });
}
