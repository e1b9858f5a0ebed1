use super::AttendanceRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::info;

/// UTF-8 byte-order mark so spreadsheet apps detect the encoding
const BOM: &str = "\u{feff}";

const HEADER: &str = "Nombre,Estado,Fecha";

/// Render the attendance list as CSV text.
///
/// Layout is fixed: BOM, plain header row, then one row per record with
/// every field double-quoted (internal quotes doubled).
pub fn records_to_csv(records: &[AttendanceRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(HEADER.to_string());

    for record in records {
        lines.push(format!(
            "{},{},{}",
            quote_field(&record.name),
            quote_field(&record.status.to_string()),
            quote_field(&record.date),
        ));
    }

    format!("{}{}", BOM, lines.join("\n"))
}

/// Export filename for a given session date: `asistencia-<ISO date>.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("asistencia-{}.csv", date.format("%Y-%m-%d"))
}

/// Write the CSV export into `output_dir`, returning the file path.
pub fn write_csv(
    output_dir: impl AsRef<Path>,
    date: NaiveDate,
    records: &[AttendanceRecord],
) -> Result<PathBuf> {
    let path = output_dir.as_ref().join(export_filename(date));
    let csv = records_to_csv(records);

    std::fs::write(&path, csv)
        .with_context(|| format!("Failed to write CSV export: {}", path.display()))?;

    info!("CSV export written: {} ({} records)", path.display(), records.len());

    Ok(path)
}

fn quote_field(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
