#![doc = include_str!("../README.md")]
#![allow(clippy::missing_errors_doc)]

mod cache;
pub use cache::TileCache;

mod catalog;
pub use catalog::RepositoryCatalog;

mod config;
pub use config::SfileConfig;

mod descriptor;
pub use descriptor::{
    ANALYZED_ZOOM, DEFAULT_LAT, DEFAULT_LNG, DEFAULT_ZOOM, RepositoryDescriptor, SIDECAR_FILE_NAME,
};

mod errors;
pub use errors::{SfileError, SfileResult};

mod scanner;
pub use scanner::{RepositoryScanner, RepositorySummary, ZoomLevelInfo};

mod shard;
pub use shard::{ShardFile, TileExtent};

mod store;
pub use store::{SfileRepository, TileStore};

// Re-export sqlx so fixtures and callers use a matching version
pub use sqlx;
