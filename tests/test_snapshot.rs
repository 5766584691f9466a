use approx::assert_relative_eq;
use infoset_cli::key::InfosetKey;
use infoset_cli::purify::Purifier;
use infoset_cli::snapshot::*;

#[test]
fn test_load_records() {
    let text = "1344 5000 0.5 0.1 -1.25 0.1 3 0.8\n40 12 0 0.25 0 0.75\n";
    let snapshot = Snapshot::from_reader(text.as_bytes()).unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.skipped(), 0);

    let entry = snapshot.get(InfosetKey::from_raw(1344)).unwrap();
    assert_eq!(entry.visit_count, 5000);
    assert_eq!(entry.num_actions(), 3);
    assert_relative_eq!(entry.regrets[1], -1.25);
    assert_relative_eq!(entry.probabilities[2], 0.8);
}

#[test]
fn test_malformed_lines_skipped() {
    let text = "\
1344 10 0 0.5 0 0.5
garbage
1344 10 0.1

40 x 0 1
40 10 0 0.5 0
   
48 3 0 1 0 0
";
    let snapshot = Snapshot::from_reader(text.as_bytes()).unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.skipped(), 4);
    assert!(snapshot.contains(InfosetKey::from_raw(1344)));
    assert!(snapshot.contains(InfosetKey::from_raw(48)));
    assert!(!snapshot.contains(InfosetKey::from_raw(40)));
}

#[test]
fn test_later_duplicate_wins() {
    let text = "1344 1 0 0.5 0 0.5\n1344 2 0 0.9 0 0.1\n";
    let snapshot = Snapshot::from_reader(text.as_bytes()).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get(InfosetKey::from_raw(1344)).unwrap().visit_count, 2);
}

#[test]
fn test_write_then_load() {
    let mut snapshot = Snapshot::new();
    snapshot.insert(
        InfosetKey::from_raw(1344),
        StrategyEntry::new(7, vec![0.5, -2.0], vec![0.3, 0.7]),
    );
    snapshot.insert(InfosetKey::from_raw(40), StrategyEntry::new(0, vec![0.0], vec![1.0]));

    let mut buf = Vec::new();
    snapshot.write(&mut buf).unwrap();
    let text = String::from_utf8(buf.clone()).unwrap();
    assert!(text.starts_with("40 0 0 1\n"));

    let loaded = Snapshot::from_reader(buf.as_slice()).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.get(InfosetKey::from_raw(1344)), snapshot.get(InfosetKey::from_raw(1344)));
}

#[test]
fn test_entry_purify_uses_key() {
    // Round-start preflop key: fold is index 1.
    let entry = StrategyEntry::new(1000, vec![0.0; 3], vec![0.1, 0.7, 0.2]);
    let action = entry.purify(InfosetKey::from_raw(1344), &Purifier::default()).unwrap();
    assert_eq!(action, 1);
}

#[test]
fn test_parse_record_reports_line() {
    let err = parse_record(17, "1 2 3").unwrap_err();
    assert!(err.to_string().contains("line 17"));
}

#[test]
fn test_invalid_utf8_line_skipped() {
    let bytes: &[u8] = b"1344 10 0 0.5 0 0.5\n40 10 0 \xff 0 0.5\n48 3 0 1 0 0\n";
    let snapshot = Snapshot::from_reader(bytes).unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.skipped(), 1);
    assert!(snapshot.contains(InfosetKey::from_raw(1344)));
    assert!(snapshot.contains(InfosetKey::from_raw(48)));
}

#[test]
fn test_negative_visit_count_stays_low_visit() {
    // Round-start key: the regret override still applies.
    let snapshot = Snapshot::from_reader("1344 -7 0 0.6 5 0.1 1 0.3\n".as_bytes()).unwrap();
    assert_eq!(snapshot.skipped(), 0);
    let entry = snapshot.get(InfosetKey::from_raw(1344)).unwrap();
    assert_eq!(entry.visit_count, 0);
    assert_eq!(entry.purify(InfosetKey::from_raw(1344), &Purifier::default()).unwrap(), 1);
}
