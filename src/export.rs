use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ImportError;
use crate::row::{SongRow, EXPECTED_HEADER};

/// Writes the rows that passed validation and deduplication back out as
/// CSV, with the canonical header.
pub struct CleanedWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
}

impl CleanedWriter {
    pub fn create(path: &Path) -> Result<Self, ImportError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(EXPECTED_HEADER)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub fn write(&mut self, row: &SongRow) -> Result<(), ImportError> {
        self.writer.write_record(row.to_record())?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf, ImportError> {
        self.writer.flush()?;
        info!("Cleaned data saved to {} ({} rows)", self.path.display(), self.rows);
        Ok(self.path)
    }
}
