// Tests for the CSV export layout
//
// The layout is fixed: UTF-8 BOM, plain header row, then one row per record
// with every field double-quoted and internal quotes doubled.

use chrono::NaiveDate;
use pase_lista::attendance::{
    export_filename, records_to_csv, write_csv, AttendanceRecord, AttendanceStatus,
};

fn record(name: &str, status: AttendanceStatus, date: &str) -> AttendanceRecord {
    AttendanceRecord {
        name: name.to_string(),
        status,
        date: date.to_string(),
    }
}

#[test]
fn test_single_record_exact_layout() {
    let records = vec![record("Ana", AttendanceStatus::Presente, "2024-01-01")];

    let csv = records_to_csv(&records);

    assert_eq!(
        csv,
        "\u{feff}Nombre,Estado,Fecha\n\"Ana\",\"Presente\",\"2024-01-01\""
    );
}

#[test]
fn test_starts_with_bom() {
    let csv = records_to_csv(&[]);
    assert!(csv.starts_with('\u{feff}'));
}

#[test]
fn test_empty_list_is_header_only() {
    let csv = records_to_csv(&[]);
    assert_eq!(csv, "\u{feff}Nombre,Estado,Fecha");
}

#[test]
fn test_internal_quotes_are_doubled() {
    let records = vec![record(
        "Juan \"El Rápido\" Pérez",
        AttendanceStatus::Ausente,
        "2024-02-15",
    )];

    let csv = records_to_csv(&records);

    assert!(csv.contains("\"Juan \"\"El Rápido\"\" Pérez\""));
    assert!(csv.contains("\"Ausente\""));
}

#[test]
fn test_commas_in_names_stay_inside_quotes() {
    let records = vec![record("Pérez, Ana", AttendanceStatus::Presente, "2024-03-01")];

    let csv = records_to_csv(&records);
    let data_row = csv.lines().nth(1).unwrap();

    assert_eq!(data_row, "\"Pérez, Ana\",\"Presente\",\"2024-03-01\"");
}

#[test]
fn test_duplicate_names_are_not_deduplicated() {
    let records = vec![
        record("Ana", AttendanceStatus::Presente, "2024-01-01"),
        record("Ana", AttendanceStatus::Ausente, "2024-01-01"),
    ];

    let csv = records_to_csv(&records);

    assert_eq!(csv.lines().count(), 3, "header plus both rows");
}

#[test]
fn test_export_filename_uses_iso_date() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    assert_eq!(export_filename(date), "asistencia-2024-01-05.csv");
}

#[test]
fn test_write_csv_creates_file_with_bom() {
    let dir = tempfile::tempdir().unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
    let records = vec![record("Ana", AttendanceStatus::Presente, "2024-06-30")];

    let path = write_csv(dir.path(), date, &records).unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "asistencia-2024-06-30.csv"
    );

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with('\u{feff}'));
    assert!(written.contains("\"Ana\""));
}
