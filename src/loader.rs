use tracing::{debug, warn};

use crate::error::{ImportError, RowError, StoreError};
use crate::row::SongRow;
use crate::store::{ArtistId, CatalogStore, NewSong};

fn non_empty(value: &str) -> Option<String> {
    Some(value.to_string()).filter(|v| !v.is_empty())
}

impl NewSong {
    pub fn from_row(row: &SongRow, artist_id: ArtistId) -> Self {
        Self {
            song_name_raw: row.song_raw.clone(),
            song_name_clean: row.song_clean.clone(),
            artist_id,
            callsign: non_empty(&row.callsign),
            time: Some(row.time),
            unique_id: Some(row.unique_id.clone()),
            combined: non_empty(&row.combined),
            first_play: Some(row.first_play),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Inserted,
    /// Rejected by storage; the batch carries on.
    Skipped(RowError),
}

/// Persists one song. A uniqueness violation skips the row; any other
/// database failure is fatal.
pub async fn load_song<S: CatalogStore>(
    store: &mut S,
    song: &NewSong,
    line: u64,
) -> Result<LoadOutcome, ImportError> {
    match store.insert_song(song).await {
        Ok(()) => {
            debug!("Inserted '{}' from line {}", song.song_name_clean, line);
            Ok(LoadOutcome::Inserted)
        }
        Err(StoreError::ConstraintViolation { constraint }) => {
            let err = RowError::ConstraintViolation { constraint };
            warn!(
                "Skipping line {} (UNIQUE_ID {}): {}",
                line,
                song.unique_id.as_deref().unwrap_or("-"),
                err
            );
            Ok(LoadOutcome::Skipped(err))
        }
        Err(StoreError::Database(e)) => Err(ImportError::Database(e)),
    }
}
