use crate::resolution_cache::ResolutionCache;
use anyhow::{Context, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use marquee_models::{ResolutionKey, ResolvedMovie};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Serialize, Deserialize)]
struct PersistedResolution {
    key: ResolutionKey,
    movie: ResolvedMovie,
}

/// On-disk copy of the resolution cache's fresh successes, so short-lived
/// processes can start warm.
///
/// bincode + gzip, written atomically. A file that no longer decodes is
/// backed up next to itself with a `.bak` extension and ignored.
pub struct ResolutionCacheStorage {
    cache_path: PathBuf,
}

impl ResolutionCacheStorage {
    /// Storage at `cache_path`, normally `PathManager::resolution_cache_file`
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Warm `cache` from disk; returns how many entries were loaded
    pub fn load_into(&self, cache: &ResolutionCache) -> Result<usize> {
        if !self.cache_path.exists() {
            debug!("No resolution cache at {:?}, starting cold", self.cache_path);
            return Ok(0);
        }

        let start = std::time::Instant::now();
        let data = std::fs::read(&self.cache_path)
            .with_context(|| format!("Failed to read resolution cache {:?}", self.cache_path))?;

        let entries = match decode(&data) {
            Ok(entries) => entries,
            Err(e) => {
                self.back_up_incompatible(&e);
                return Ok(0);
            }
        };

        let total = entries.len();
        let loaded = cache.warm(
            entries
                .into_iter()
                .map(|entry| (entry.key, entry.movie))
                .collect(),
        );
        info!(
            "Loaded resolution cache: {} of {} stored entries still fresh in {:?}",
            loaded,
            total,
            start.elapsed()
        );
        Ok(loaded)
    }

    /// Write the cache's fresh entries atomically. Returns how many were saved.
    pub fn save(&self, cache: &ResolutionCache) -> Result<usize> {
        let entries: Vec<PersistedResolution> = cache
            .export_fresh()
            .into_iter()
            .map(|(key, movie)| PersistedResolution { key, movie })
            .collect();

        let serialized = bincode::serialize(&entries).context("Failed to encode resolution cache")?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&serialized)?;
        let encoded = encoder.finish()?;

        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache directory {:?}", parent))?;
        }
        let temp_path = self.cache_path.with_extension("tmp");
        std::fs::write(&temp_path, encoded)
            .with_context(|| format!("Failed to write {:?}", temp_path))?;
        std::fs::rename(&temp_path, &self.cache_path)
            .with_context(|| format!("Failed to replace {:?}", self.cache_path))?;

        debug!("Saved {} resolutions to {:?}", entries.len(), self.cache_path);
        Ok(entries.len())
    }

    /// Delete the stored file; true when one existed
    pub fn remove(&self) -> Result<bool> {
        if !self.cache_path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.cache_path)
            .with_context(|| format!("Failed to remove {:?}", self.cache_path))?;
        Ok(true)
    }

    fn back_up_incompatible(&self, error: &anyhow::Error) {
        let backup_path = self.cache_path.with_extension("bin.bak");
        match std::fs::rename(&self.cache_path, &backup_path) {
            Ok(()) => info!(
                "Resolution cache format incompatible ({}). Moved it to {:?} and starting cold.",
                error, backup_path
            ),
            Err(backup_err) => warn!(
                "Resolution cache unreadable ({}) and could not be backed up: {}",
                error, backup_err
            ),
        }
    }
}

fn decode(data: &[u8]) -> Result<Vec<PersistedResolution>> {
    let mut decompressed = Vec::new();
    GzDecoder::new(data).read_to_end(&mut decompressed)?;
    Ok(bincode::deserialize(&decompressed)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn movie(id: u64) -> ResolvedMovie {
        ResolvedMovie {
            id,
            title: format!("Movie {}", id),
            release_year: None,
            poster_url: Some(format!("https://images.test/{}.jpg", id)),
            genres: vec!["Horror".to_string(), "Comedy".to_string()],
            director: "N/A".to_string(),
            runtime_minutes: None,
            synopsis: "A synopsis".to_string(),
            cast: vec!["Lead".to_string()],
            language: "ja".to_string(),
            countries: vec!["JP".to_string()],
            resolved_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_saved_cache_warms_a_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ResolutionCacheStorage::new(temp_dir.path().join("cache/resolutions.bin"));

        let cache = ResolutionCache::default();
        cache.warm(vec![
            (ResolutionKey::Title("house".to_string()), movie(25623)),
            (ResolutionKey::CatalogId(25623), movie(25623)),
        ]);
        assert_eq!(storage.save(&cache).unwrap(), 2);

        let restored = ResolutionCache::default();
        assert_eq!(storage.load_into(&restored).unwrap(), 2);
        let exported = restored.export_fresh();
        assert!(exported
            .iter()
            .any(|(key, m)| *key == ResolutionKey::Title("house".to_string()) && m.genres.len() == 2));
    }

    #[test]
    fn test_missing_file_loads_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ResolutionCacheStorage::new(temp_dir.path().join("resolutions.bin"));

        assert_eq!(storage.load_into(&ResolutionCache::default()).unwrap(), 0);
        assert!(!storage.remove().unwrap());
    }

    #[test]
    fn test_incompatible_file_is_backed_up() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("resolutions.bin");
        std::fs::write(&path, b"definitely not gzip").unwrap();
        let storage = ResolutionCacheStorage::new(&path);

        assert_eq!(storage.load_into(&ResolutionCache::default()).unwrap(), 0);
        assert!(!path.exists());
        assert!(temp_dir.path().join("resolutions.bin.bak").exists());
    }
}
