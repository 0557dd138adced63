//! Test fixtures: an in-memory [`CatalogStore`] and CSV builders.

use std::collections::HashSet;

use csv::StringRecord;

use crate::error::StoreError;
use crate::row::{SongRow, EXPECTED_HEADER};
use crate::store::{ArtistId, CatalogStore, NewSong};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtist {
    pub id: ArtistId,
    pub raw: String,
    pub clean: String,
}

/// Mirrors the uniqueness rules of the real schema: cleaned artist names
/// and song UNIQUE_IDs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub artists: Vec<StoredArtist>,
    pub songs: Vec<NewSong>,
    pub artist_lookups: u64,
    unique_ids: HashSet<String>,
}

impl MemoryStore {
    pub fn artist(&self, id: ArtistId) -> Option<&StoredArtist> {
        self.artists.iter().find(|a| a.id == id)
    }
}

impl CatalogStore for MemoryStore {
    async fn find_artist(&mut self, clean_name: &str) -> Result<Option<ArtistId>, StoreError> {
        self.artist_lookups += 1;
        Ok(self
            .artists
            .iter()
            .find(|a| a.clean == clean_name)
            .map(|a| a.id))
    }

    async fn insert_artist(
        &mut self,
        raw_name: &str,
        clean_name: &str,
    ) -> Result<ArtistId, StoreError> {
        if let Some(existing) = self.artists.iter().find(|a| a.clean == clean_name) {
            return Ok(existing.id);
        }
        let id = self.artists.len() as ArtistId + 1;
        self.artists.push(StoredArtist {
            id,
            raw: raw_name.to_string(),
            clean: clean_name.to_string(),
        });
        Ok(id)
    }

    async fn insert_song(&mut self, song: &NewSong) -> Result<(), StoreError> {
        if let Some(ref unique_id) = song.unique_id {
            if !self.unique_ids.insert(unique_id.clone()) {
                return Err(StoreError::ConstraintViolation {
                    constraint: "songs_unique_id_key".to_string(),
                });
            }
        }
        self.songs.push(song.clone());
        Ok(())
    }

    async fn count_artists(&mut self) -> Result<i64, StoreError> {
        Ok(self.artists.len() as i64)
    }

    async fn count_songs(&mut self) -> Result<i64, StoreError> {
        Ok(self.songs.len() as i64)
    }
}

pub fn header_record() -> StringRecord {
    StringRecord::from(EXPECTED_HEADER.to_vec())
}

pub fn record(fields: &[&str]) -> StringRecord {
    StringRecord::from(fields.to_vec())
}

/// A valid row with the given line, UNIQUE_ID and artist.
pub fn song_row(line: u64, unique_id: &str, artist: &str) -> SongRow {
    SongRow {
        line,
        song_raw: "Song".to_string(),
        song_clean: "song".to_string(),
        artist_raw: artist.to_string(),
        artist_clean: artist.to_string(),
        callsign: "KXYZ".to_string(),
        time: 1_400_000_000,
        unique_id: unique_id.to_string(),
        combined: format!("Song by {artist}"),
        first_play: true,
    }
}

/// CSV text with the canonical header followed by `rows`.
pub fn csv_text<R, S>(rows: &[R]) -> String
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPECTED_HEADER).unwrap();
    for row in rows {
        writer
            .write_record(AsRef::<[S]>::as_ref(row).iter().map(AsRef::<str>::as_ref))
            .unwrap();
    }
    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}
