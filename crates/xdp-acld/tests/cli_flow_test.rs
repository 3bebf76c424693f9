//! Rules file -> check / dump / classify, the way the binary drives them.

use std::fs;
use std::path::Path;

use acl_dataplane::packet::testing::{icmp_frame, ipv4_frame};
use acl_dataplane::{classify_frame, Action, Verdict};
use pretty_assertions::assert_eq;
use xdp_acld::app::{self, StoreSource};
use xdp_acld::dump::load_dump;
use xdp_acld::frames::to_hex;
use xdp_acld::DaemonConfig;

const RULES: &str = r#"{
  "rules": [
    {"saddr": "192.168.1.0/24", "daddr": "192.168.1.0/24",
     "proto": "icmp", "action": "deny", "priority": 10},
    {"saddr": "10.0.0.0/8", "daddr": "172.16.0.10/32",
     "sport": "*", "dport": "22", "proto": "tcp", "action": "deny", "priority": 5},
    {"saddr": "0.0.0.0/0", "daddr": "8.8.8.8",
     "sport": "*", "dport": "53", "proto": "udp", "action": "deny"}
  ]
}"#;

fn config(dir: &Path) -> DaemonConfig {
    let rules = dir.join("rules.json");
    fs::write(&rules, RULES).unwrap();

    let mut config = DaemonConfig::default();
    config.rules.default_file = rules;
    config.rules.table_id_seed = Some(11);
    config.dataplane.workers = 2;
    config.dataplane.batch_size = 2;
    config
}

fn write_frames(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("frames.hex");
    let lines = [
        "# icmp inside the /24".to_string(),
        to_hex(&icmp_frame(0xC0A8_0105, 0xC0A8_0109)),
        to_hex(&ipv4_frame(6, 0x0A01_0203, 40000, 0xAC10_000A, 22)),
        String::new(),
        to_hex(&ipv4_frame(6, 0x0A01_0203, 40000, 0xAC10_000A, 443)),
        to_hex(&ipv4_frame(17, 0x0B00_0001, 5353, 0x0808_0808, 53)),
        "0011".to_string(),
    ];
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

#[test]
fn test_check_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let report = app::check(&config, &config.rules.default_file).unwrap();

    assert_eq!(report.rules, 3);
    assert!(report.issues.is_empty());
    assert!(report.fullest_bucket >= 1);
    assert!(report.to_string().contains("rules: 3"));
}

#[tokio::test]
async fn test_classify_from_rules() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let frames = write_frames(dir.path());

    let source = StoreSource::resolve(&config, None, None);
    let (verdicts, stats) = app::classify(&config, &source, &frames, None)
        .await
        .unwrap();

    let lines: Vec<usize> = verdicts.iter().map(|v| v.line).collect();
    assert_eq!(lines, vec![2, 3, 5, 6, 7]);

    let actions: Vec<Action> = verdicts.iter().map(|v| v.verdict.action()).collect();
    assert_eq!(
        actions,
        vec![Action::Drop, Action::Drop, Action::Pass, Action::Drop, Action::Pass]
    );
    assert_eq!(verdicts[2].verdict, Verdict::Exhausted);
    assert!(matches!(verdicts[4].verdict, Verdict::Skipped(_)));
    assert_eq!(stats.matched, 3);
    assert_eq!(stats.batches, 3);
}

#[tokio::test]
async fn test_dump_then_classify_from_dump() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let frames = write_frames(dir.path());
    let out = dir.path().join("store.bin");

    let written = app::dump(&config, &config.rules.default_file, &out).unwrap();
    assert_eq!(fs::metadata(&out).unwrap().len() as usize, written);

    let reloaded = load_dump(&out).unwrap();
    let original = app::build_orch(&config, &config.rules.default_file)
        .unwrap()
        .snapshot();
    assert_eq!(reloaded.tables(), original.tables());

    let frame = icmp_frame(0xC0A8_0105, 0xC0A8_0109);
    assert_eq!(
        classify_frame(&reloaded, &frame),
        classify_frame(&original, &frame)
    );

    let from_rules = app::classify(&config, &StoreSource::Rules(config.rules.default_file.clone()), &frames, Some(1))
        .await
        .unwrap()
        .0;
    let from_dump = app::classify(&config, &StoreSource::Dump(out), &frames, Some(3))
        .await
        .unwrap()
        .0;
    assert_eq!(from_dump, from_rules);
}
