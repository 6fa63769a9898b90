//! Mapping of XYZ tiles onto the on-disk layout of a repository.
//!
//! A repository partitions each zoom level three times over:
//!
//! ```text
//! <repository>/<L>/<L>_<x/256>_<y/256>.s      shard file, 256x256 tiles
//!                  table <L>_<x/64>_<y/64>      table inside the shard, 64x64 tiles
//!                  row   (x%64) + 64*(y%64)     one row per tile
//! ```
//!
//! where `L` is the zoom letter `'A' + max(zoom, 9)`. This module is the only place that
//! knows this encoding; readers and scanners go through it instead of formatting names
//! themselves.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Zoom levels below this value are stored in the shards of this level.
pub const MIN_SHARD_ZOOM: u8 = 9;

/// Highest zoom whose letter is still inside `A..=Z`.
///
/// Resolving a tile above this zoom still produces an address, but its letter is no longer
/// an uppercase ASCII letter, so the repository scanner never discovers such shards.
pub const MAX_LETTER_ZOOM: u8 = 25;

/// Number of tiles along one side of a shard file.
pub const SHARD_SPAN: u32 = 256;

/// Number of tiles along one side of a table within a shard.
pub const TABLE_SPAN: u32 = 64;

/// Extension of shard files, without the leading dot.
pub const SHARD_FILE_EXTENSION: &str = "s";

/// XYZ tile coordinate, `y = 0` at the top of the map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    #[must_use]
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}/{}/{}", self.z, self.x, self.y)
        } else {
            write!(f, "{},{},{}", self.z, self.x, self.y)
        }
    }
}

/// Location of one tile inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardAddress {
    pub zoom_letter: char,
    /// Directory under the repository root, named after the zoom letter
    pub subdirectory: String,
    /// Shard file name inside [`subdirectory`](Self::subdirectory)
    pub shard_file: String,
    pub table: String,
    /// Primary key of the tile row, `0..=4095`
    pub row: u16,
}

impl ShardAddress {
    /// Full path of the shard file within the given repository directory.
    #[must_use]
    pub fn shard_path(&self, repository: &Path) -> PathBuf {
        repository.join(&self.subdirectory).join(&self.shard_file)
    }
}

/// Letter naming the shards of a zoom level, without applying the [`MIN_SHARD_ZOOM`] clamp.
#[must_use]
pub fn zoom_letter(zoom: u8) -> char {
    // 'A' + 255 is still a valid scalar value, so this never falls back
    char::from_u32(u32::from(b'A') + u32::from(zoom)).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Inverse of [`zoom_letter`] for the `A..=Z` range.
#[must_use]
pub fn letter_zoom(letter: char) -> Option<u8> {
    u8::try_from(letter)
        .ok()
        .filter(u8::is_ascii_uppercase)
        .map(|b| b - b'A')
}

/// Compute where the tile `coord` is stored.
///
/// Never fails: whether the shard, table or row actually exist is up to the reader.
#[must_use]
pub fn resolve(coord: TileCoord) -> ShardAddress {
    let zoom = coord.z.max(MIN_SHARD_ZOOM);
    let letter = zoom_letter(zoom);
    let (x, y) = (coord.x, coord.y);
    let row = (x % TABLE_SPAN) + TABLE_SPAN * (y % TABLE_SPAN);
    ShardAddress {
        zoom_letter: letter,
        subdirectory: letter.to_string(),
        shard_file: format!(
            "{letter}_{}_{}.{SHARD_FILE_EXTENSION}",
            x / SHARD_SPAN,
            y / SHARD_SPAN
        ),
        table: format!("{letter}_{}_{}", x / TABLE_SPAN, y / TABLE_SPAN),
        // always below TABLE_SPAN^2 = 4096
        row: u16::try_from(row).unwrap_or(u16::MAX),
    }
}

/// Zoom directories are named with a single uppercase letter.
#[must_use]
pub fn is_zoom_directory_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase())
}

#[must_use]
pub fn is_shard_file_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext == SHARD_FILE_EXTENSION)
        && name.len() > SHARD_FILE_EXTENSION.len() + 1
}

/// A table name following the `<L>_<bx>_<by>` convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub zoom_letter: char,
    pub zoom: u8,
}

impl TableName {
    /// Parse a table name, returning `None` for tables that do not hold tiles.
    ///
    /// Only the shape is checked: exactly three `_`-separated parts with a zoom letter first.
    /// The block indexes are not validated, the `X`/`Y` columns are authoritative.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let parts: Vec<&str> = name.split('_').collect();
        let [prefix, _, _] = parts.as_slice() else {
            return None;
        };
        let mut chars = prefix.chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else {
            return None;
        };
        Some(Self {
            zoom_letter: letter,
            zoom: letter_zoom(letter)?,
        })
    }
}
