//! Struct archiving functionality
//!
//! Modules hold an `Archiver` and serialise one record into it per cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::Path;
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// The default archiver is disabled and silently discards records, which
/// allows modules to be built without a session (for example in tests).
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    FileError(std::io::Error),

    #[error("Cannot write the archive record: {0}")]
    CsvError(csv::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, path: P
    ) -> Result<Self, ArchiveError> {
        let session_path = session.arch_root.join(path);

        // Create the parent directory if needed
        if let Some(parent) = session_path.parent() {
            std::fs::create_dir_all(parent).map_err(ArchiveError::FileError)?;
        }

        // Create (or truncate) the file
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(session_path)
            .map_err(ArchiveError::FileError)?;

        let w = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self {
            writer: Some(w)
        })
    }

    /// Returns true if this archiver writes to a file.
    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(
        &mut self, record: T
    ) -> Result<(), ArchiveError> {
        if let Some(ref mut w) = self.writer {
            w.serialize(record).map_err(ArchiveError::CsvError)?;
            w.flush().map_err(ArchiveError::FileError)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        lat_err_m: f64,
    }

    #[test]
    fn test_disabled_archiver() {
        let mut a = Archiver::default();
        assert!(!a.is_enabled());
        a.serialise(Row { time_s: 0.0, lat_err_m: 1.0 }).unwrap();
    }

    #[test]
    fn test_archiver_writes_csv() {
        let base = std::env::temp_dir().join("lfr_util_archive_test");
        let session = Session::new_in("archive", &base).unwrap();

        let mut a = Archiver::from_path(&session, "sub/rows.csv").unwrap();
        a.serialise(Row { time_s: 0.0, lat_err_m: 1.0 }).unwrap();
        a.serialise(Row { time_s: 0.5, lat_err_m: 0.25 }).unwrap();

        let text = std::fs::read_to_string(session.arch_root.join("sub/rows.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["time_s,lat_err_m", "0.0,1.0", "0.5,0.25"]);

        session.exit();
    }
}
