// Tests for the persisted attendance snapshot
//
// One JSON file plays the role of a single key-value entry: overwritten
// wholesale on save, removed on clear, and treated as empty when absent or
// malformed (malformed content is additionally cleared).

use pase_lista::attendance::{AttendanceRecord, AttendanceStatus, AttendanceStore};

fn sample_records() -> Vec<AttendanceRecord> {
    vec![
        AttendanceRecord {
            name: "Ana".to_string(),
            status: AttendanceStatus::Presente,
            date: "2024-01-01".to_string(),
        },
        AttendanceRecord {
            name: "Luis".to_string(),
            status: AttendanceStatus::Ausente,
            date: "2024-01-01".to_string(),
        },
    ]
}

#[test]
fn test_missing_snapshot_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = AttendanceStore::new(dir.path().join("asistencia.json"));

    assert!(store.load().is_empty());
}

#[test]
fn test_save_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = AttendanceStore::new(dir.path().join("asistencia.json"));

    let records = sample_records();
    store.save(&records).unwrap();

    assert_eq!(store.load(), records);
}

#[test]
fn test_save_overwrites_wholesale() {
    let dir = tempfile::tempdir().unwrap();
    let store = AttendanceStore::new(dir.path().join("asistencia.json"));

    store.save(&sample_records()).unwrap();

    let replacement = vec![AttendanceRecord {
        name: "Marta".to_string(),
        status: AttendanceStatus::Presente,
        date: "2024-01-02".to_string(),
    }];
    store.save(&replacement).unwrap();

    assert_eq!(store.load(), replacement);
}

#[test]
fn test_malformed_snapshot_loads_empty_and_is_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asistencia.json");
    std::fs::write(&path, "{not valid json").unwrap();

    let store = AttendanceStore::new(&path);

    assert!(store.load().is_empty());
    assert!(!path.exists(), "malformed snapshot must be cleared");
}

#[test]
fn test_clear_removes_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asistencia.json");
    let store = AttendanceStore::new(&path);

    store.save(&sample_records()).unwrap();
    assert!(path.exists());

    store.clear().unwrap();
    assert!(!path.exists());
    assert!(store.load().is_empty());
}

#[test]
fn test_clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = AttendanceStore::new(dir.path().join("asistencia.json"));

    store.clear().unwrap();
    store.clear().unwrap();
}

#[test]
fn test_status_spanish_wire_values() {
    let json = serde_json::to_string(&sample_records()).unwrap();

    assert!(json.contains("\"Presente\""));
    assert!(json.contains("\"Ausente\""));
}
