use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{SfileError, SfileResult};
use crate::scanner::RepositorySummary;

/// Name of the cached descriptor file inside a repository directory.
pub const SIDECAR_FILE_NAME: &str = "repository.json";

/// Center shown for repositories that could not be analyzed.
pub const DEFAULT_LNG: f64 = 113.0;
pub const DEFAULT_LAT: f64 = 40.0;
pub const DEFAULT_ZOOM: u8 = 10;

/// Display zoom suggested for analyzed repositories.
pub const ANALYZED_ZOOM: u8 = 14;

/// Listing entry of one repository, persisted as `repository.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub name: String,
    pub lng: f64,
    pub lat: f64,
    /// Zoom a map viewer should open at, unrelated to the stored tile zoom levels
    pub zoom: u8,
    #[serde(rename = "size")]
    pub size_bytes: f64,
    pub url: String,
    #[serde(rename = "pared")]
    pub analyzed: bool,
}

impl RepositoryDescriptor {
    /// Stand-in for a repository without usable tiles. Never persisted.
    #[must_use]
    pub fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_string(),
            lng: DEFAULT_LNG,
            lat: DEFAULT_LAT,
            zoom: DEFAULT_ZOOM,
            size_bytes: 0.0,
            url: name.to_string(),
            analyzed: false,
        }
    }

    /// Reduce a scan result to a descriptor. `None` if the scan found no tiles.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn from_summary(summary: &RepositorySummary) -> Option<Self> {
        let (lng, lat) = summary.bbox.center()?;
        Some(Self {
            name: summary.name.clone(),
            lng,
            lat,
            zoom: ANALYZED_ZOOM,
            size_bytes: summary.file_size as f64,
            url: summary.name.clone(),
            analyzed: true,
        })
    }

    #[must_use]
    pub fn sidecar_path(repository: &Path) -> PathBuf {
        repository.join(SIDECAR_FILE_NAME)
    }

    /// Read the cached descriptor of a repository.
    ///
    /// Returns `Ok(None)` if there is no sidecar file, and [`SfileError::MalformedSidecar`]
    /// if it exists but cannot be parsed.
    pub async fn read_sidecar(repository: &Path) -> SfileResult<Option<Self>> {
        let path = Self::sidecar_path(repository);
        let content = match tokio::fs::read(&path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SfileError::IoError(e, path)),
        };
        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| SfileError::MalformedSidecar(e, path))
    }

    /// Persist as indented JSON, replacing any existing sidecar.
    ///
    /// The content is written to a temporary file in the same directory first and renamed
    /// over the sidecar, so readers never see a partially written file.
    pub async fn write_sidecar(&self, repository: &Path) -> SfileResult<()> {
        let path = Self::sidecar_path(repository);
        let tmp = repository.join(format!(".{SIDECAR_FILE_NAME}.tmp"));
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| SfileError::IoError(e, tmp.clone()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| SfileError::IoError(e, path.clone()))?;
        info!("Saved repository descriptor {}", path.display());
        Ok(())
    }

    /// Delete the sidecar, if any.
    pub async fn remove_sidecar(repository: &Path) -> SfileResult<()> {
        let path = Self::sidecar_path(repository);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SfileError::IoError(e, path)),
        }
    }
}
