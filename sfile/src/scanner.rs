use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use sfile_tile_utils::mercator::tile_bound;
use sfile_tile_utils::{BoundingBox, TableName, is_shard_file_name, is_zoom_directory_name};
use size_format::SizeFormatterBinary;
use sqlx::Connection as _;
use tilejson::Bounds;
use tracing::{debug, trace, warn};

use crate::descriptor::RepositoryDescriptor;
use crate::errors::{SfileError, SfileResult};
use crate::shard::ShardFile;

/// Extent and size of the shards of one zoom letter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ZoomLevelInfo {
    pub zoom: u8,
    pub letter: char,
    pub shard_count: u64,
    pub table_count: u64,
    pub file_size: u64,
    pub bbox: BoundingBox,
}

/// Everything a repository scan learns about the stored tiles.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RepositorySummary {
    pub name: String,
    pub file_size: u64,
    pub shard_count: u64,
    pub table_count: u64,
    pub bbox: BoundingBox,
    pub zoom_info: Vec<ZoomLevelInfo>,
}

impl RepositorySummary {
    /// Bounds of all tiles, `None` if nothing was found.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        bbox_to_bounds(&self.bbox)
    }
}

fn bbox_to_bounds(bbox: &BoundingBox) -> Option<Bounds> {
    (!bbox.is_empty()).then(|| Bounds::new(bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y))
}

impl Display for RepositorySummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Repository: {}", self.name)?;
        let file_size = SizeFormatterBinary::new(self.file_size);
        writeln!(f, "File size: {file_size:.2}B")?;
        writeln!(f, "Shard files: {}", self.shard_count)?;
        writeln!(f, "Tile tables: {}", self.table_count)?;
        writeln!(f)?;
        writeln!(
            f,
            "|{:^6}|{:^8}|{:^8}|{:^8}|{:^10}| {:^30} |",
            "Zoom", "Letter", "Shards", "Tables", "Size", "BBox"
        )?;

        for l in &self.zoom_info {
            let size = SizeFormatterBinary::new(l.file_size);
            let bbox = bbox_to_bounds(&l.bbox).map_or_else(|| "-".to_string(), |b| format!("{b:.5}"));
            writeln!(
                f,
                "|{:>6}|{:>8}|{:>8}|{:>8}|{:>10}| {:<30} |",
                l.zoom,
                l.letter,
                l.shard_count,
                l.table_count,
                format!("{size:.2}B"),
                bbox,
            )?;
        }

        if let Some(bounds) = self.bounds() {
            writeln!(f)?;
            writeln!(f, "Bounds: {bounds:.5}")?;
        }
        if let Some((lng, lat)) = self.bbox.center() {
            writeln!(f, "Center: {lng:.5},{lat:.5}")?;
        }

        Ok(())
    }
}

/// Derives extent and size of repositories by reading every shard they contain.
#[derive(Clone, Debug, Default)]
pub struct RepositoryScanner {
    timeout: Option<Duration>,
}

impl RepositoryScanner {
    /// Create a scanner. An analysis running longer than `timeout` is abandoned.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Walk all zoom directories and shard files of a repository.
    ///
    /// Every shard file counts towards the size, even if it holds no tiles. The first
    /// filesystem or database error aborts the scan, and a repository without any tile
    /// fails with [`SfileError::NoTilesFound`].
    pub async fn scan(&self, repository: &Path) -> SfileResult<RepositorySummary> {
        let name = repository_name(repository);
        let mut summary = RepositorySummary {
            name,
            file_size: 0,
            shard_count: 0,
            table_count: 0,
            bbox: BoundingBox::EMPTY,
            zoom_info: Vec::new(),
        };

        // keyed by letter, in case a shard holds tables of another zoom
        let mut levels: BTreeMap<char, ZoomLevelInfo> = BTreeMap::new();

        for zoom_dir in list_entries(repository, true, is_zoom_directory_name).await? {
            let shards = list_entries(&zoom_dir, false, is_shard_file_name).await?;
            debug!(
                "Scanning {} shard files in {}",
                shards.len(),
                zoom_dir.display()
            );
            for path in shards {
                let file_size = tokio::fs::metadata(&path)
                    .await
                    .map_err(|e| SfileError::IoError(e, path.clone()))?
                    .len();
                summary.file_size += file_size;
                summary.shard_count += 1;
                if let Some(letter) = dir_letter(&zoom_dir) {
                    let level = level_entry(&mut levels, letter);
                    level.shard_count += 1;
                    level.file_size += file_size;
                }

                let shard = ShardFile::new(&path)?;
                let mut conn = shard.open_readonly().await?;
                let result = scan_shard(&shard, &mut conn, &mut levels).await;
                if let Err(e) = conn.close().await {
                    warn!("Unable to close {shard}: {e}");
                }
                let (tables, bbox) = result?;
                summary.table_count += tables;
                summary.bbox.extend(&bbox);
            }
        }

        if summary.bbox.is_empty() {
            return Err(SfileError::NoTilesFound(repository.to_path_buf()));
        }
        summary.zoom_info = levels.into_values().collect();
        Ok(summary)
    }

    /// Scan a repository, and save the resulting descriptor as its sidecar file.
    ///
    /// Fails with [`SfileError::NoTilesFound`] if the repository holds no tiles, and with
    /// [`SfileError::ScanTimeout`] if the configured timeout expires. Nothing is written
    /// in either case.
    pub async fn analyze(&self, repository: &Path) -> SfileResult<RepositoryDescriptor> {
        let summary = match self.timeout {
            Some(duration) => tokio::time::timeout(duration, self.scan(repository))
                .await
                .map_err(|_| SfileError::ScanTimeout(repository.to_path_buf(), duration))??,
            None => self.scan(repository).await?,
        };
        let descriptor = RepositoryDescriptor::from_summary(&summary)
            .ok_or_else(|| SfileError::NoTilesFound(repository.to_path_buf()))?;
        descriptor.write_sidecar(repository).await?;
        Ok(descriptor)
    }
}

/// Accumulate the extents of all tile tables of one shard.
async fn scan_shard(
    shard: &ShardFile,
    conn: &mut sqlx::SqliteConnection,
    levels: &mut BTreeMap<char, ZoomLevelInfo>,
) -> SfileResult<(u64, BoundingBox)> {
    let mut bbox = BoundingBox::EMPTY;
    let mut tables = 0;
    for table in shard.tile_tables(&mut *conn).await? {
        let Some(name) = TableName::parse(&table) else {
            continue;
        };
        tables += 1;
        let level = level_entry(levels, name.zoom_letter);
        level.table_count += 1;

        let Some(extent) = shard.tile_extent(&mut *conn, &table).await? else {
            trace!("Table {table} in {shard} has no tiles");
            continue;
        };
        trace!("Table {table} in {shard} covers {extent:?}");
        let mut table_bbox = tile_bound(extent.min_x, extent.min_y, name.zoom);
        table_bbox.extend(&tile_bound(extent.max_x, extent.max_y, name.zoom));
        level.bbox.extend(&table_bbox);
        bbox.extend(&table_bbox);
    }
    Ok((tables, bbox))
}

fn level_entry(levels: &mut BTreeMap<char, ZoomLevelInfo>, letter: char) -> &mut ZoomLevelInfo {
    levels.entry(letter).or_insert_with(|| ZoomLevelInfo {
        zoom: sfile_tile_utils::letter_zoom(letter).unwrap_or_default(),
        letter,
        shard_count: 0,
        table_count: 0,
        file_size: 0,
        bbox: BoundingBox::EMPTY,
    })
}

fn dir_letter(dir: &Path) -> Option<char> {
    dir.file_name()?.to_str()?.chars().next()
}

pub(crate) fn repository_name(repository: &Path) -> String {
    repository
        .file_name()
        .map_or_else(|| repository.to_string_lossy(), |v| v.to_string_lossy())
        .to_string()
}

/// Sorted entries of `dir` that are directories (or files) and whose name passes `filter`.
async fn list_entries(
    dir: &Path,
    directories: bool,
    filter: fn(&str) -> bool,
) -> SfileResult<Vec<PathBuf>> {
    let io_err = |e| SfileError::IoError(e, dir.to_path_buf());
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut result = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let file_type = entry.file_type().await.map_err(io_err)?;
        let matches_type = if directories {
            file_type.is_dir()
        } else {
            file_type.is_file()
        };
        if matches_type && entry.file_name().to_str().is_some_and(filter) {
            result.push(entry.path());
        }
    }
    result.sort();
    Ok(result)
}
