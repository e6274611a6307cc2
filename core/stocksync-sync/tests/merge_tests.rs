use pretty_assertions::assert_eq;
use stocksync_sync::{merge, merge_visible, override_merge, visible, MergeSide};
use stocksync_types::Record;

fn rec(id: &str, updated_at: i64) -> Record {
    Record::new(id).with_updated_at(updated_at)
}

fn ids(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

// ── Basic LWW ───────────────────────────────────────────────────

#[test]
fn newer_remote_wins() {
    let local = vec![rec("1", 100).with_field("qty", 5)];
    let remote = vec![rec("1", 200).with_field("qty", 7)];

    let out = merge(&local, &remote, false);
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].field("qty"), Some(&serde_json::json!(7)));
    assert_eq!(out.records[0].updated_at, Some(200));
}

#[test]
fn older_remote_loses() {
    let local = vec![rec("1", 300).with_field("qty", 5)];
    let remote = vec![rec("1", 200).with_field("qty", 7)];

    let out = merge(&local, &remote, false);
    assert_eq!(out.records[0].field("qty"), Some(&serde_json::json!(5)));
}

#[test]
fn equal_timestamps_keep_local() {
    let local = vec![rec("1", 100).with_field("name", "local")];
    let remote = vec![rec("1", 100).with_field("name", "remote")];

    let out = merge(&local, &remote, false);
    assert_eq!(out.records[0].field("name"), Some(&serde_json::json!("local")));
    assert_eq!(out.conflicts.len(), 1);
    assert_eq!(out.conflicts[0].winner, MergeSide::Local);
}

#[test]
fn missing_timestamp_counts_as_zero() {
    let local = vec![Record::new("1").with_field("v", "local")];
    let remote = vec![rec("1", 1).with_field("v", "remote")];

    let out = merge(&local, &remote, false);
    assert_eq!(out.records[0].field("v"), Some(&serde_json::json!("remote")));

    let local = vec![rec("1", 1).with_field("v", "local")];
    let remote = vec![Record::new("1").with_field("v", "remote")];
    let out = merge(&local, &remote, false);
    assert_eq!(out.records[0].field("v"), Some(&serde_json::json!("local")));
}

#[test]
fn disjoint_sets_union() {
    let local = vec![rec("a", 1), rec("b", 2)];
    let remote = vec![rec("c", 3)];

    let out = merge(&local, &remote, false);
    assert_eq!(ids(&out.records), vec!["a", "b", "c"]);
    assert!(out.conflicts.is_empty());
}

#[test]
fn local_order_is_kept_and_remote_only_appended() {
    let local = vec![rec("z", 1), rec("a", 1)];
    let remote = vec![rec("m", 1), rec("a", 5), rec("b", 1)];

    let out = merge(&local, &remote, false);
    assert_eq!(ids(&out.records), vec!["z", "a", "m", "b"]);
    assert_eq!(out.records[1].updated_at, Some(5));
}

#[test]
fn identical_records_are_not_conflicts() {
    let local = vec![rec("1", 10).with_field("x", 1)];
    let remote = local.clone();

    let out = merge(&local, &remote, false);
    assert!(out.conflicts.is_empty());
    assert_eq!(out.records, local);
}

#[test]
fn conflict_log_records_remote_winner() {
    let local = vec![rec("1", 10)];
    let remote = vec![rec("1", 20)];

    let out = merge(&local, &remote, false);
    assert_eq!(out.conflicts.len(), 1);
    let conflict = &out.conflicts[0];
    assert_eq!(conflict.id, "1");
    assert_eq!(conflict.local_updated_at, Some(10));
    assert_eq!(conflict.remote_updated_at, Some(20));
    assert_eq!(conflict.winner, MergeSide::Remote);
}

// ── Scenarios ───────────────────────────────────────────────────

#[test]
fn offline_edit_newer_than_remote_survives() {
    // Device edited offline at t=300; the remote copy was last touched at 200.
    let local = vec![rec("p1", 300).with_field("price", 12)];
    let remote = vec![rec("p1", 200).with_field("price", 10), rec("p2", 150)];

    let out = merge_visible(&local, &remote, false);
    assert_eq!(ids(&out), vec!["p1", "p2"]);
    assert_eq!(out[0].field("price"), Some(&serde_json::json!(12)));
}

#[test]
fn remote_deletion_hides_record() {
    let local = vec![rec("1", 100), rec("2", 100)];
    let remote = vec![rec("2", 200).into_tombstone()];

    let out = merge(&local, &remote, false);
    assert_eq!(out.records.len(), 2);
    assert!(out.records[1].deleted);

    let shown = out.visible();
    assert_eq!(ids(&shown), vec!["1"]);
}

#[test]
fn stale_tombstone_does_not_delete_newer_edit() {
    let local = vec![rec("1", 500).with_field("qty", 3)];
    let remote = vec![rec("1", 400).into_tombstone()];

    let out = merge_visible(&local, &remote, false);
    assert_eq!(ids(&out), vec!["1"]);
}

#[test]
fn tied_remote_tombstone_keeps_local_visible() {
    let local = vec![rec("p1", 200)];
    let remote = vec![rec("p1", 200).into_tombstone()];

    let out = merge(&local, &remote, false);
    assert_eq!(out.records.len(), 1);
    assert!(!out.records[0].deleted);
    assert_eq!(out.conflicts.len(), 1);
    assert_eq!(out.conflicts[0].winner, MergeSide::Local);
    assert_eq!(ids(&out.visible()), vec!["p1"]);
}

// ── Duplicate ids within one input ──────────────────────────────

#[test]
fn local_duplicates_collapse_to_last_at_first_position() {
    let local = vec![
        rec("a", 100).with_field("v", 1),
        rec("b", 100),
        rec("a", 50).with_field("v", 2),
    ];
    let remote = vec![rec("c", 1)];

    let out = merge(&local, &remote, false);
    assert_eq!(ids(&out.records), vec!["a", "b", "c"]);
    assert_eq!(out.records[0].field("v"), Some(&serde_json::json!(2)));
}

#[test]
fn remote_duplicates_resolve_by_timestamp() {
    let remote = vec![
        rec("a", 200).with_field("v", 1),
        rec("a", 100).with_field("v", 2),
    ];
    let out = merge(&[rec("x", 1)], &remote, false);
    assert_eq!(ids(&out.records), vec!["x", "a"]);
    assert_eq!(out.records[1].field("v"), Some(&serde_json::json!(1)));

    let remote = vec![
        rec("a", 100).with_field("v", 1),
        rec("a", 200).with_field("v", 2),
    ];
    let out = merge(&[rec("x", 1)], &remote, false);
    assert_eq!(out.records[1].field("v"), Some(&serde_json::json!(2)));

    // Equal timestamps keep the earlier occurrence.
    let remote = vec![
        rec("a", 100).with_field("v", 1),
        rec("a", 100).with_field("v", 2),
    ];
    let out = merge(&[rec("x", 1)], &remote, false);
    assert_eq!(out.records[1].field("v"), Some(&serde_json::json!(1)));
}

#[test]
fn short_circuits_keep_duplicates_verbatim() {
    let dupes = vec![rec("a", 1), rec("a", 2)];

    let out = merge(&dupes, &[], false);
    assert_eq!(out.records, dupes);

    let out = merge(&[rec("b", 9)], &dupes, true);
    assert_eq!(out.records, dupes);
}

// ── Force download / empty remote ───────────────────────────────

#[test]
fn force_download_returns_remote_verbatim() {
    let local = vec![rec("1", 999), rec("local-only", 1)];
    let remote = vec![rec("1", 1), rec("2", 1)];

    let out = merge(&local, &remote, true);
    assert_eq!(out.records, remote);
    assert!(out.conflicts.is_empty());
}

#[test]
fn force_download_with_empty_remote_keeps_local() {
    let local = vec![rec("1", 1), rec("2", 2)];

    let out = merge(&local, &[], true);
    assert_eq!(out.records, local);
}

#[test]
fn empty_remote_never_wipes_local() {
    let local = vec![rec("1", 1), rec("2", 2).into_tombstone()];

    let out = merge(&local, &[], false);
    assert_eq!(out.records, local);
}

#[test]
fn empty_local_takes_remote() {
    let remote = vec![rec("1", 1), rec("2", 2)];
    let out = merge(&[], &remote, false);
    assert_eq!(out.records, remote);
}

// ── Visibility ──────────────────────────────────────────────────

#[test]
fn visible_filters_tombstones_only() {
    let records = vec![rec("1", 1), rec("2", 1).into_tombstone(), rec("3", 1)];
    assert_eq!(ids(&visible(&records)), vec!["1", "3"]);
}

// ── Override merge ──────────────────────────────────────────────

#[test]
fn override_local_wins_even_when_older() {
    let local = vec![rec("1", 10).with_field("v", "local")];
    let remote = vec![rec("1", 9_999).with_field("v", "remote")];

    let out = override_merge(&local, &remote, 20_000, "device_a");
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].field("v"), Some(&serde_json::json!("local")));
    assert_eq!(out[0].updated_at, Some(20_000));
    assert_eq!(out[0].device_id.as_deref(), Some("device_a"));
}

#[test]
fn override_keeps_remote_only_records_untouched() {
    let local = vec![rec("a", 1)];
    let remote = vec![rec("b", 7).with_device_id("device_b")];

    let out = override_merge(&local, &remote, 50, "device_a");
    assert_eq!(ids(&out), vec!["b", "a"]);
    assert_eq!(out[0].updated_at, Some(7));
    assert_eq!(out[0].device_id.as_deref(), Some("device_b"));
}

#[test]
fn override_with_empty_remote_restamps_local() {
    let local = vec![rec("a", 1), Record::new("b")];

    let out = override_merge(&local, &[], 42, "dev");
    assert!(out.iter().all(|r| r.updated_at == Some(42)));
    assert!(out.iter().all(|r| r.device_id.as_deref() == Some("dev")));
}
