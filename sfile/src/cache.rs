use std::path::{Path, PathBuf};
use std::time::Duration;

use moka::future::Cache;
use sfile_tile_utils::TileCoord;
use tracing::{info, trace};

/// In-memory cache of tile payloads, bounded by the total payload size.
#[derive(Clone, Debug)]
pub struct TileCache(Cache<TileCacheKey, Vec<u8>>);

impl TileCache {
    /// Creates a new tile cache with the specified maximum size in bytes.
    ///
    /// * `expiry` - Optional maximum lifetime (TTL - time to live from creation)
    /// * `idle_timeout` - Optional idle timeout (TTI - time to idle since last access)
    #[must_use]
    pub fn new(
        max_size_bytes: u64,
        expiry: Option<Duration>,
        idle_timeout: Option<Duration>,
    ) -> Self {
        let mut builder = Cache::builder()
            .name("tile_cache")
            .weigher(|_key: &TileCacheKey, value: &Vec<u8>| -> u32 {
                value.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_size_bytes);

        if let Some(ttl) = expiry {
            builder = builder.time_to_live(ttl);
            trace!("Tile cache configured with TTL of {ttl:?}");
        }
        if let Some(tti) = idle_timeout {
            builder = builder.time_to_idle(tti);
            trace!("Tile cache configured with TTI of {tti:?}");
        }

        Self(builder.build())
    }

    /// Gets a tile from cache or fetches it using the provided function.
    ///
    /// Failed fetches are not cached.
    pub async fn get_or_insert<F, Fut, E>(
        &self,
        repository: &Path,
        xyz: TileCoord,
        fetch: F,
    ) -> Result<Vec<u8>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let key = TileCacheKey {
            repository: repository.to_path_buf(),
            xyz,
        };
        if let Some(data) = self.0.get(&key).await {
            trace!("Tile cache HIT for {key:?}");
            return Ok(data);
        }
        trace!("Tile cache MISS for {key:?}");

        let data = fetch().await?;
        self.0.insert(key, data.clone()).await;
        Ok(data)
    }

    pub fn invalidate_all(&self) {
        let count = self.entry_count();
        self.0.invalidate_all();
        info!("Invalidated {count} tile cache entries");
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.0.entry_count()
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone)]
struct TileCacheKey {
    repository: PathBuf,
    xyz: TileCoord,
}
