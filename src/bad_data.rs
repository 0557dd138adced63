//! Routing of rows that failed validation, and the bad-data report file.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::error::{ImportError, RowError};
use crate::row::{MalformedRow, PartialSong};
use crate::store::{ArtistId, NewSong};

/// How rows that fail validation are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BadDataMode {
    /// Drop the row, leaving only a log entry.
    #[default]
    #[value(skip)]
    Drop,
    /// Append the row and its failure reason to the report file.
    Report,
    /// Persist the row under the "unknown" artist.
    Insert,
}

// ---------------------------------------------------------------------------
// Report file
// ---------------------------------------------------------------------------

const REPORT_HEADER: [&str; 4] = ["line", "kind", "reason", "raw"];

/// Append-only CSV listing rows that were set aside, with the reason.
pub struct ReportWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    entries: u64,
}

impl ReportWriter {
    /// Opens `bad_data_report_<timestamp>.csv` inside `dir`.
    pub fn create_in(dir: &Path) -> Result<Self, ImportError> {
        fs::create_dir_all(dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self::open(dir.join(format!("bad_data_report_{timestamp}.csv")))
    }

    pub fn open(path: PathBuf) -> Result<Self, ImportError> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::Writer::from_writer(file);
        if is_empty {
            writer.write_record(REPORT_HEADER)?;
            writer.flush()?;
        }
        Ok(Self {
            path,
            writer,
            entries: 0,
        })
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn malformed(&mut self, row: &MalformedRow) -> Result<(), ImportError> {
        self.write_entry(row.line, "malformed", &row.reason(), &row.raw_line())
    }

    pub fn duplicate(&mut self, line: u64, raw: &[String], err: &RowError) -> Result<(), ImportError> {
        self.write_entry(line, "duplicate", &err.to_string(), &raw.join(","))
    }

    fn write_entry(&mut self, line: u64, kind: &str, reason: &str, raw: &str) -> Result<(), ImportError> {
        let line = line.to_string();
        self.writer.write_record([line.as_str(), kind, reason, raw])?;
        self.entries += 1;
        Ok(())
    }

    /// Flushes and closes the file, returning its path.
    pub fn finish(mut self) -> Result<PathBuf, ImportError> {
        self.writer.flush()?;
        info!(
            "Bad data report written to {} ({} entries)",
            self.path.display(),
            self.entries
        );
        Ok(self.path)
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    Dropped,
    Reported,
    /// Persist under the sentinel artist.
    Insert(PartialSong),
}

/// Decides what happens to a malformed row. In `Report` mode the row is
/// written to `report` here; `Insert` leaves persistence to the caller.
pub fn route_bad_row(
    mode: BadDataMode,
    row: &MalformedRow,
    report: Option<&mut ReportWriter>,
) -> Result<Disposition, ImportError> {
    match mode {
        BadDataMode::Drop => {
            warn!("Dropping bad row at {}", row);
            Ok(Disposition::Dropped)
        }
        BadDataMode::Report => match report {
            Some(report) => {
                report.malformed(row)?;
                info!("Reported bad row at {}", row);
                Ok(Disposition::Reported)
            }
            None => {
                warn!("No report file open; dropping bad row at {}", row);
                Ok(Disposition::Dropped)
            }
        },
        BadDataMode::Insert => {
            if row.partial.song_raw.is_none() && row.partial.song_clean.is_none() {
                warn!("Bad row at {} has no song name; dropping", row);
                return Ok(Disposition::Dropped);
            }
            Ok(Disposition::Insert(row.partial.clone()))
        }
    }
}

/// Builds the song record for a salvaged row linked to `artist_id`.
pub fn sentinel_song(partial: PartialSong, artist_id: ArtistId) -> NewSong {
    let song_name_raw = partial
        .song_raw
        .clone()
        .or_else(|| partial.song_clean.clone())
        .unwrap_or_default();
    let song_name_clean = partial
        .song_clean
        .unwrap_or_else(|| crate::artist::normalize_name(&song_name_raw));

    NewSong {
        song_name_raw,
        song_name_clean,
        artist_id,
        callsign: partial.callsign,
        time: partial.time,
        unique_id: partial.unique_id,
        combined: partial.combined,
        first_play: partial.first_play,
    }
}
