use std::path::PathBuf;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum SfileError {
    #[error("Repository {} does not exist", .0.display())]
    RepositoryNotFound(PathBuf),

    #[error("Repository path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Shard file {} does not exist", .0.display())]
    ShardNotFound(PathBuf),

    #[error("Table {1} does not exist in shard file {path}", path = .0.display())]
    TableNotFound(PathBuf, String),

    #[error("Row {2} does not exist in table {1} of shard file {path}", path = .0.display())]
    RowNotFound(PathBuf, String, u16),

    #[error("IO error {path}: {0}", path = .1.display())]
    IoError(#[source] std::io::Error, PathBuf),

    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error(transparent)]
    JsonSerdeError(#[from] serde_json::Error),

    #[error("Shard filepath contains unsupported characters: {}", .0.display())]
    UnsupportedCharsInFilepath(PathBuf),

    #[error("No tiles found in repository {}", .0.display())]
    NoTilesFound(PathBuf),

    #[error("Analysis of repository {path} did not finish within {1:?}", path = .0.display())]
    ScanTimeout(PathBuf, Duration),

    #[error("Unable to parse repository descriptor {path}: {0}", path = .1.display())]
    MalformedSidecar(#[source] serde_json::Error, PathBuf),

    #[error("Unable to load config file {path}: {0}", path = .1.display())]
    ConfigLoadError(#[source] std::io::Error, PathBuf),

    #[error("Unable to parse config file {path}: {0}", path = .1.display())]
    ConfigParseError(#[source] serde_yaml::Error, PathBuf),
}

impl SfileError {
    /// Missing repository, shard, table or row.
    ///
    /// These are expected for sparse repositories and should become a placeholder
    /// response rather than an error report.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RepositoryNotFound(_)
                | Self::ShardNotFound(_)
                | Self::TableNotFound(..)
                | Self::RowNotFound(..)
        )
    }
}

pub type SfileResult<T> = Result<T, SfileError>;
