//! Building blocks shared by the `sfile` tile store: how a tile is addressed inside a
//! repository of SQLite shards, the Web Mercator math used to turn tile indexes into
//! geographic extents, and detection of the raster format of stored tile payloads.

mod address;
pub use address::{
    MAX_LETTER_ZOOM, MIN_SHARD_ZOOM, SHARD_FILE_EXTENSION, SHARD_SPAN, ShardAddress, TABLE_SPAN,
    TableName, TileCoord, is_shard_file_name, is_zoom_directory_name, letter_zoom, resolve,
    zoom_letter,
};

mod bbox;
pub use bbox::BoundingBox;

pub mod mercator;

/// Radius of the WGS84 ellipsoid used by the spherical Web Mercator projection, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Circumference of the earth at the equator, in meters.
pub const EARTH_CIRCUMFERENCE: f64 = 2.0 * std::f64::consts::PI * EARTH_RADIUS;

/// Distance from the projection origin to the edge of the map, in meters.
pub const ORIGIN_SHIFT: f64 = EARTH_CIRCUMFERENCE / 2.0;

/// Width and height of a single tile, in pixels.
pub const TILE_SIZE: u32 = 256;

/// Raster formats a tile payload may be stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl DataFormat {
    /// Sniff the format from the leading magic bytes of a tile payload.
    #[must_use]
    pub fn detect(data: &[u8]) -> Option<Self> {
        Some(match data {
            v if v.starts_with(b"\x89\x50\x4E\x47\x0D\x0A\x1A\x0A") => Self::Png,
            v if v.starts_with(b"GIF87a") || v.starts_with(b"GIF89a") => Self::Gif,
            v if v.starts_with(b"\xFF\xD8\xFF") => Self::Jpeg,
            v if v.len() >= 12 && v.starts_with(b"RIFF") && &v[8..12] == b"WEBP" => Self::Webp,
            _ => None?,
        })
    }

    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match *self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}
