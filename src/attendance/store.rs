use super::AttendanceRecord;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Durable snapshot of the attendance list.
///
/// One JSON file plays the role of a single key-value entry: it is
/// overwritten wholesale on every successful extraction and removed on
/// reset. There is no versioning or migration of the stored shape.
pub struct AttendanceStore {
    path: PathBuf,
}

impl AttendanceStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted attendance list.
    ///
    /// An absent snapshot yields an empty list. A malformed snapshot also
    /// yields an empty list and is cleared so the next load starts clean.
    pub fn load(&self) -> Vec<AttendanceRecord> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read attendance snapshot: {e}");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!("Malformed attendance snapshot, clearing: {e}");
                if let Err(e) = self.clear() {
                    warn!("Failed to clear malformed snapshot: {e}");
                }
                Vec::new()
            }
        }
    }

    /// Overwrite the snapshot with the full attendance list.
    pub fn save(&self, records: &[AttendanceRecord]) -> Result<()> {
        let json = serde_json::to_string(records).map_err(|e| Error::Storage(e.to_string()))?;

        std::fs::write(&self.path, json).map_err(|e| Error::Storage(e.to_string()))?;

        info!(
            "Attendance snapshot saved: {} ({} records)",
            self.path.display(),
            records.len()
        );

        Ok(())
    }

    /// Remove the snapshot entirely.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }
}
