//! JSON import/export of a student's review records.
//! Provides functionality to save and load RecordExport documents to/from JSON files.

use crate::database::db;
use crate::error::{Result, ValidationError};
use crate::models::ReviewRecord;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordExport {
    pub student_id: String,
    pub records: Vec<ReviewRecord>,
}

impl RecordExport {
    pub fn from_store(student_id: &str, conn: &Connection) -> Result<Self> {
        Ok(Self {
            student_id: student_id.to_string(),
            records: db::list_records(student_id, conn)?,
        })
    }

    /// Writes every record into the store, overwriting existing progress.
    /// Either all records are written or none are. Returns the number written.
    pub fn apply_to_store(&self, conn: &Connection) -> Result<usize> {
        let tx = conn.unchecked_transaction()?;
        for record in &self.records {
            if record.student_id != self.student_id {
                return Err(ValidationError::StudentMismatch {
                    expected: self.student_id.clone(),
                    found: record.student_id.clone(),
                }
                .into());
            }
            db::upsert_record(record, &tx)?;
        }
        tx.commit()?;
        Ok(self.records.len())
    }
}

/// Exports records to a JSON file at the specified path.
/// Returns an error if file creation or writing fails.
pub fn export_records_to_path(export: &RecordExport, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(export)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    info!(
        "Exported {} records for '{}' to {}",
        export.records.len(),
        export.student_id,
        path.display()
    );
    Ok(())
}

/// Imports records from a JSON file.
/// Returns an error if the file doesn't exist or contains invalid JSON.
pub fn import_records(path: &Path) -> Result<RecordExport> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let export: RecordExport = serde_json::from_str(&contents)?;

    info!(
        "Imported {} records for '{}' from {}",
        export.records.len(),
        export.student_id,
        path.display()
    );
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::ReviewQuality;
    use std::fs;

    fn populated_store() -> Connection {
        let mut conn = db::open_in_memory().unwrap();
        db::enroll_concept("ana", "fractions", Some("math"), &conn).unwrap();
        db::enroll_concept("ana", "verbs", None, &conn).unwrap();
        db::submit_review(
            "ana",
            "fractions",
            ReviewQuality::try_from(5).unwrap(),
            &mut conn,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_export_records_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ana.json");
        let export = RecordExport::from_store("ana", &populated_store()).unwrap();

        export_records_to_path(&export, &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["studentId"], "ana");
        assert_eq!(written["records"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_import_into_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ana.json");
        let original = RecordExport::from_store("ana", &populated_store()).unwrap();
        export_records_to_path(&original, &path).unwrap();

        let imported = import_records(&path).unwrap();
        let target = db::open_in_memory().unwrap();
        assert_eq!(imported.apply_to_store(&target).unwrap(), 2);

        let restored = RecordExport::from_store("ana", &target).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_invalid_record_rolls_back_whole_import() {
        let mut export = RecordExport::from_store("ana", &populated_store()).unwrap();
        export.records[1].repetitions = -1;

        let target = db::open_in_memory().unwrap();
        let result = export.apply_to_store(&target);
        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::NegativeRepetitions(-1)))
        ));
        assert!(db::list_records("ana", &target).unwrap().is_empty());
    }

    #[test]
    fn test_foreign_student_record_rejected() {
        let mut export = RecordExport::from_store("ana", &populated_store()).unwrap();
        export.records[1].student_id = "ben".to_string();

        let target = db::open_in_memory().unwrap();
        assert!(matches!(
            export.apply_to_store(&target),
            Err(Error::Validation(ValidationError::StudentMismatch { .. }))
        ));
        assert!(db::list_records("ana", &target).unwrap().is_empty());
        assert!(db::list_records("ben", &target).unwrap().is_empty());
    }

    #[test]
    fn test_import_nonexistent_file() {
        let result = import_records(Path::new("nonexistent_file_xyz123.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_import_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        assert!(matches!(import_records(&path), Err(Error::Json(_))));
    }
}
