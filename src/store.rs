//! Persistence of artists and songs.
//!
//! The pipeline only talks to [`CatalogStore`]; [`PgStore`] is the
//! PostgreSQL implementation used by the binaries.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::StoreError;

pub type ArtistId = i32;

/// A song record ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSong {
    pub song_name_raw: String,
    pub song_name_clean: String,
    pub artist_id: ArtistId,
    pub callsign: Option<String>,
    pub time: Option<i64>,
    pub unique_id: Option<String>,
    pub combined: Option<String>,
    pub first_play: Option<bool>,
}

#[allow(async_fn_in_trait)]
pub trait CatalogStore {
    async fn find_artist(&mut self, clean_name: &str) -> Result<Option<ArtistId>, StoreError>;

    /// Inserts an artist unless its cleaned name already exists, and
    /// returns the id stored for that name either way.
    async fn insert_artist(&mut self, raw_name: &str, clean_name: &str)
        -> Result<ArtistId, StoreError>;

    async fn insert_song(&mut self, song: &NewSong) -> Result<(), StoreError>;

    async fn count_artists(&mut self) -> Result<i64, StoreError>;

    async fn count_songs(&mut self) -> Result<i64, StoreError>;
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const CREATE_STATEMENTS: [&str; 2] = [
    r#"CREATE TABLE IF NOT EXISTS artists (
           artist_id SERIAL PRIMARY KEY,
           artist_name_raw TEXT NOT NULL,
           artist_name_clean TEXT NOT NULL UNIQUE
       )"#,
    r#"CREATE TABLE IF NOT EXISTS songs (
           song_id SERIAL PRIMARY KEY,
           song_name_raw TEXT,
           song_name_clean TEXT,
           artist_id INTEGER NOT NULL REFERENCES artists (artist_id),
           callsign TEXT,
           time BIGINT,
           unique_id TEXT UNIQUE,
           combined TEXT,
           first_play BOOLEAN
       )"#,
];

// Songs reference artists, so they go first.
const DROP_STATEMENTS: [&str; 2] = ["DROP TABLE IF EXISTS songs", "DROP TABLE IF EXISTS artists"];

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(config.connect_options())
            .await?;
        info!("Connection to PostgreSQL at {} successful", config.display_target());
        Ok(Self { pool })
    }

    /// Creates the `artists` and `songs` tables, dropping them first when
    /// `recreate` is set.
    pub async fn create_tables(&self, recreate: bool) -> Result<(), sqlx::Error> {
        if recreate {
            for statement in DROP_STATEMENTS {
                sqlx::query(statement).execute(&self.pool).await?;
            }
            info!("Existing tables dropped");
        }
        for statement in CREATE_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Tables created");
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Database connection closed");
    }
}

fn map_insert_error(e: sqlx::Error) -> StoreError {
    let violation = match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or("unique").to_string())
        }
        _ => None,
    };
    match violation {
        Some(constraint) => StoreError::ConstraintViolation { constraint },
        None => StoreError::Database(e),
    }
}

impl CatalogStore for PgStore {
    async fn find_artist(&mut self, clean_name: &str) -> Result<Option<ArtistId>, StoreError> {
        let existing: Option<(ArtistId,)> =
            sqlx::query_as("SELECT artist_id FROM artists WHERE artist_name_clean = $1")
                .bind(clean_name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(existing.map(|(id,)| id))
    }

    async fn insert_artist(
        &mut self,
        raw_name: &str,
        clean_name: &str,
    ) -> Result<ArtistId, StoreError> {
        sqlx::query(
            r#"INSERT INTO artists (artist_name_raw, artist_name_clean)
               VALUES ($1, $2)
               ON CONFLICT (artist_name_clean) DO NOTHING"#,
        )
        .bind(raw_name)
        .bind(clean_name)
        .execute(&self.pool)
        .await?;

        // Might be a pre-existing row if ON CONFLICT hit
        let row: (ArtistId,) =
            sqlx::query_as("SELECT artist_id FROM artists WHERE artist_name_clean = $1")
                .bind(clean_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(row.0)
    }

    async fn insert_song(&mut self, song: &NewSong) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO songs
               (song_name_raw, song_name_clean, artist_id, callsign, time, unique_id, combined, first_play)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(&song.song_name_raw)
        .bind(&song.song_name_clean)
        .bind(song.artist_id)
        .bind(&song.callsign)
        .bind(song.time)
        .bind(&song.unique_id)
        .bind(&song.combined)
        .bind(song.first_play)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(())
    }

    async fn count_artists(&mut self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM artists")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn count_songs(&mut self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM songs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_constraint_violations() {
        let err = map_insert_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn songs_are_dropped_before_artists() {
        assert!(DROP_STATEMENTS[0].ends_with("songs"));
        assert!(DROP_STATEMENTS[1].ends_with("artists"));
    }
}
