use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use stint_core::{ManualClock, RecordStore, SessionRecord};
use tempfile::tempdir;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

fn record(name: &str, created_at: DateTime<Utc>) -> SessionRecord {
    let mut record = SessionRecord::stopwatch(
        name,
        created_at - chrono::Duration::seconds(5),
        created_at,
        Duration::from_secs(5),
    );
    record.created_at = Some(created_at);
    record
}

#[test]
fn test_save_at_capacity_evicts_oldest() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("history.json");

    // Newest first on disk, as the store writes it.
    let seeded: Vec<SessionRecord> = (0..1000)
        .rev()
        .map(|i| record(&format!("Timer {}", i + 1), t0() + chrono::Duration::minutes(i)))
        .collect();
    let oldest_id = seeded[999].id.clone();
    let newest_id = seeded[0].id.clone();
    std::fs::write(&path, serde_json::to_string_pretty(&seeded).unwrap()).unwrap();

    let clock = Arc::new(ManualClock::new(t0() + chrono::Duration::days(1)));
    let store = RecordStore::with_clock(&path, clock);
    let saved = store
        .save(SessionRecord::stopwatch(
            "Timer 1001",
            t0(),
            t0() + chrono::Duration::seconds(1),
            Duration::from_secs(1),
        ))
        .unwrap();

    let listed = store.list();
    assert_eq!(listed.len(), 1000);
    assert_eq!(listed[0].id, saved.id);
    assert_eq!(listed[1].id, newest_id);
    assert!(listed.iter().all(|r| r.id != oldest_id));
}

#[test]
fn test_leftover_temp_file_does_not_affect_committed_history() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("history.json");
    let store = RecordStore::new(&path);
    let committed = store.save(record("Timer 1", t0())).unwrap();

    // Simulates a crash between writing the temp file and renaming it.
    std::fs::write(
        temp.path().join(".history.json-k3x9qa.tmp"),
        "[{\"id\":\"half-writ",
    )
    .unwrap();

    let reopened = RecordStore::new(&path);
    let listed = reopened.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], committed);
}

#[test]
fn test_replace_keeps_size_and_position() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("history.json");
    let store = RecordStore::new(&path);
    let a = store.save(record("Timer 1", t0())).unwrap();
    let mut b = store
        .save(record("Timer 2", t0() + chrono::Duration::minutes(1)))
        .unwrap();
    let c = store
        .save(record("Timer 3", t0() + chrono::Duration::minutes(2)))
        .unwrap();

    b.set_name("Design review").unwrap();
    b.add_tag("meetings");
    store.save(b.clone()).unwrap();

    let on_disk: Vec<SessionRecord> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let ids: Vec<_> = on_disk.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec![c.id, b.id.clone(), a.id]);
    assert_eq!(on_disk[1].name, "Design review");
    assert_eq!(on_disk[1].tags, vec!["meetings"]);
}

#[test]
fn test_delete_unknown_id_is_noop() {
    let temp = tempdir().unwrap();
    let store = RecordStore::new(temp.path().join("history.json"));
    store.save(record("Timer 1", t0())).unwrap();

    assert!(!store.delete("01HQ000000000000000000GONE").unwrap());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_save_list_round_trips_every_field() {
    let temp = tempdir().unwrap();
    let store = RecordStore::new(temp.path().join("history.json"));
    let mut original = SessionRecord::countdown(
        "Countdown 1",
        t0(),
        t0() + chrono::Duration::milliseconds(90_250),
        Duration::from_millis(90_250),
        Duration::from_secs(120),
    )
    .with_category("Reading");
    original.set_notes("chapter 4").unwrap();
    original.add_tag("books");
    original.created_at = Some(t0() + chrono::Duration::seconds(91));

    store.save(original.clone()).unwrap();

    let listed = RecordStore::new(store.path()).list();
    assert_eq!(listed, vec![original]);
}

#[test]
fn test_file_is_indented_and_omits_absent_target() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("history.json");
    let store = RecordStore::new(&path);
    store.save(record("Timer 1", t0())).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\n  {"));
    assert!(raw.contains("\"duration\": \"00:00:05\""));
    assert!(!raw.contains("countdownTarget"));
}
