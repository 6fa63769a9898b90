use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::TileCache;
use crate::catalog::RepositoryCatalog;
use crate::errors::{SfileError, SfileResult};
use crate::scanner::RepositoryScanner;
use crate::store::TileStore;

#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SfileConfig {
    /// Directory holding one subdirectory per repository. Defaults to the current directory.
    pub repository_root: Option<PathBuf>,

    /// Give up analyzing a repository after this long, e.g. "30s" or "5m".
    ///
    /// If not set, analyses run to completion.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    pub scan_timeout: Option<Duration>,

    /// Maximum size of the tile cache in megabytes (0 or unset to disable)
    pub tile_cache_size_mb: Option<u64>,

    /// Maximum lifetime for cached tiles (TTL - time to live from creation).
    ///
    /// Supports human-readable formats like "1h", "30m", "1d", or "3600s".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    pub tile_cache_expiry: Option<Duration>,

    /// Maximum idle time for cached tiles (TTI - time to idle since last access).
    ///
    /// Supports human-readable formats like "5m", "300s", or "1h".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    pub tile_cache_idle_timeout: Option<Duration>,
}

impl SfileConfig {
    pub fn read(file_name: &Path) -> SfileResult<Self> {
        let contents = std::fs::read_to_string(file_name)
            .map_err(|e| SfileError::ConfigLoadError(e, file_name.into()))?;
        Self::parse(&contents, file_name)
    }

    pub fn parse(contents: &str, file_name: &Path) -> SfileResult<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| SfileError::ConfigParseError(e, file_name.into()))
    }

    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.repository_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Tile cache as configured, `None` if disabled.
    #[must_use]
    pub fn tile_cache(&self) -> Option<TileCache> {
        let size_mb = self.tile_cache_size_mb.and_then(|v| NonZeroU64::try_from(v).ok());
        if let Some(size_mb) = size_mb {
            Some(TileCache::new(
                size_mb.get().saturating_mul(1024 * 1024),
                self.tile_cache_expiry,
                self.tile_cache_idle_timeout,
            ))
        } else {
            if self.tile_cache_expiry.is_some() {
                warn!("Tile cache is not enabled, ignoring custom expiry");
            }
            if self.tile_cache_idle_timeout.is_some() {
                warn!("Tile cache is not enabled, ignoring custom idle timeout");
            }
            None
        }
    }

    #[must_use]
    pub fn tile_store(&self) -> TileStore {
        TileStore::new(self.root(), self.tile_cache())
    }

    #[must_use]
    pub fn scanner(&self) -> RepositoryScanner {
        RepositoryScanner::new(self.scan_timeout)
    }

    #[must_use]
    pub fn catalog(&self) -> RepositoryCatalog {
        RepositoryCatalog::new(self.root(), self.scanner())
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_yaml_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(yaml: &str) -> SfileConfig {
        SfileConfig::parse(yaml, Path::new("test.yaml")).unwrap()
    }

    #[test]
    fn parse_durations() {
        let cfg = parse(
            "
repository_root: /data/tiles
scan_timeout: 30s
tile_cache_size_mb: 64
tile_cache_expiry: 1h
tile_cache_idle_timeout: 5m
",
        );
        assert_eq!(
            cfg,
            SfileConfig {
                repository_root: Some(PathBuf::from("/data/tiles")),
                scan_timeout: Some(Duration::from_secs(30)),
                tile_cache_size_mb: Some(64),
                tile_cache_expiry: Some(Duration::from_secs(3600)),
                tile_cache_idle_timeout: Some(Duration::from_secs(300)),
            }
        );
        assert_eq!(cfg.root(), PathBuf::from("/data/tiles"));
        assert_eq!(cfg.scanner().timeout(), Some(Duration::from_secs(30)));
        assert!(cfg.tile_cache().is_some());
    }

    #[test]
    fn defaults() {
        let cfg = parse("{}");
        assert_eq!(cfg, SfileConfig::default());
        assert_eq!(cfg.root(), PathBuf::from("."));
        assert_eq!(cfg.scanner().timeout(), None);
        assert!(cfg.tile_cache().is_none());
    }

    #[test]
    fn zero_cache_disables() {
        let cfg = parse("tile_cache_size_mb: 0\ntile_cache_expiry: 10m");
        assert!(cfg.tile_cache().is_none());
        assert!(cfg.tile_store().cache().is_none());
    }

    #[test]
    fn serialize_skips_unset() {
        let cfg = parse("scan_timeout: 90s");
        assert_yaml_snapshot!(cfg, @"scan_timeout: 1m 30s");
    }

    #[test]
    fn errors() {
        let err = SfileConfig::parse("scan_timeout: soon", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, SfileError::ConfigParseError(..)), "{err}");

        let err = SfileConfig::read(Path::new("/nonexistent/sfile.yaml")).unwrap_err();
        assert!(matches!(err, SfileError::ConfigLoadError(..)), "{err}");
    }
}
