//! Artist name normalization and identity resolution.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{ArtistId, CatalogStore};

/// Name used for both the raw and cleaned name of the sentinel artist.
pub const UNKNOWN_ARTIST: &str = "unknown";

/// Trims, collapses whitespace runs to a single space and lower-cases.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Maps cleaned artist names to stable identities, creating them on
/// first sight. The cache lives for one run.
#[derive(Debug, Default)]
pub struct ArtistResolver {
    cache: HashMap<String, ArtistId>,
    created: u64,
}

impl ArtistResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artists this resolver inserted into the store.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub async fn resolve<S: CatalogStore>(
        &mut self,
        store: &mut S,
        raw_name: &str,
        clean_name: &str,
    ) -> Result<ArtistId, StoreError> {
        let key = normalize_name(clean_name);
        if let Some(&id) = self.cache.get(&key) {
            return Ok(id);
        }

        let id = match store.find_artist(&key).await? {
            Some(id) => id,
            None => {
                let id = store.insert_artist(raw_name.trim(), &key).await?;
                self.created += 1;
                debug!("Created artist '{}' (id {})", key, id);
                id
            }
        };

        self.cache.insert(key, id);
        Ok(id)
    }

    /// Identity of the placeholder artist used for rows without usable
    /// artist information.
    pub async fn sentinel<S: CatalogStore>(&mut self, store: &mut S) -> Result<ArtistId, StoreError> {
        let first_use = !self.cache.contains_key(UNKNOWN_ARTIST);
        let id = self.resolve(store, UNKNOWN_ARTIST, UNKNOWN_ARTIST).await?;
        if first_use {
            info!("Using artist id {} for rows with unknown artist", id);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryStore;

    #[test]
    fn normalization_is_case_and_space_insensitive() {
        assert_eq!(normalize_name("  The   Band "), "the band");
        assert_eq!(normalize_name("the band"), "the band");
        assert_eq!(normalize_name("MÖTLEY\tCRÜE"), "mötley crüe");
        assert_eq!(normalize_name("   "), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["The Band", " AC/DC ", "Guns N'  Roses", "Ünknown"] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[tokio::test]
    async fn resolving_same_name_twice_creates_one_artist() {
        let mut store = MemoryStore::default();
        let mut resolver = ArtistResolver::new();

        let a = resolver.resolve(&mut store, "The Band", "The Band").await.unwrap();
        let b = resolver.resolve(&mut store, "the band", "the band").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(store.artists.len(), 1);
        assert_eq!(store.artists[0].clean, "the band");
        assert_eq!(store.artists[0].raw, "The Band");
        assert_eq!(resolver.created(), 1);
    }

    #[tokio::test]
    async fn existing_artist_is_reused_across_runs() {
        let mut store = MemoryStore::default();
        let existing = store.insert_artist("Queen", "queen").await.unwrap();

        let mut resolver = ArtistResolver::new();
        let id = resolver.resolve(&mut store, "QUEEN", "QUEEN").await.unwrap();

        assert_eq!(id, existing);
        assert_eq!(resolver.created(), 0);
        assert_eq!(store.artists.len(), 1);
    }

    #[tokio::test]
    async fn cached_names_skip_the_store() {
        let mut store = MemoryStore::default();
        let mut resolver = ArtistResolver::new();

        resolver.resolve(&mut store, "Rush", "Rush").await.unwrap();
        let lookups = store.artist_lookups;
        resolver.resolve(&mut store, "Rush", "rush ").await.unwrap();

        assert_eq!(store.artist_lookups, lookups);
    }

    #[tokio::test]
    async fn sentinel_is_created_once() {
        let mut store = MemoryStore::default();
        let mut resolver = ArtistResolver::new();

        let a = resolver.sentinel(&mut store).await.unwrap();
        let b = resolver.sentinel(&mut store).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(store.artists.len(), 1);
        assert_eq!(store.artists[0].clean, UNKNOWN_ARTIST);
    }
}
