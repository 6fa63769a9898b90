use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use sfile_tile_utils::{TileCoord, resolve};
use sqlx::Connection as _;
use tracing::{trace, warn};

use crate::cache::TileCache;
use crate::errors::{SfileError, SfileResult};
use crate::shard::ShardFile;

/// Read access to the tiles of a single repository directory.
///
/// Each lookup opens the addressed shard read-only and closes it again, nothing is kept
/// open between calls.
///
/// ```no_run
/// use sfile::SfileRepository;
/// use sfile_tile_utils::TileCoord;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = SfileRepository::new("/data/tiles/beijing").await?;
/// let tile = repo.get_tile(TileCoord::new(10, 300, 100)).await?;
/// println!("Tile size: {} bytes", tile.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SfileRepository {
    dir: PathBuf,
}

impl SfileRepository {
    /// Validates that `dir` exists and is a directory.
    pub async fn new<P: AsRef<Path>>(dir: P) -> SfileResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(Self { dir }),
            Ok(_) => Err(SfileError::NotADirectory(dir)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SfileError::RepositoryNotFound(dir)),
            Err(e) => Err(SfileError::IoError(e, dir)),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fetch the raw bytes of one tile.
    ///
    /// A missing shard file is reported as [`SfileError::ShardNotFound`] without opening
    /// any database, so SQLite never creates files in the repository.
    pub async fn get_tile(&self, xyz: TileCoord) -> SfileResult<Vec<u8>> {
        let address = resolve(xyz);
        let path = address.shard_path(&self.dir);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(SfileError::ShardNotFound(path)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SfileError::ShardNotFound(path));
            }
            Err(e) => return Err(SfileError::IoError(e, path)),
        }

        let shard = ShardFile::new(&path)?;
        let mut conn = shard.open_readonly().await?;
        let result = Self::read_row(&shard, &mut conn, &address.table, address.row).await;
        if let Err(e) = conn.close().await {
            warn!("Unable to close {shard}: {e}");
        }

        match result? {
            Some(data) => {
                trace!("Read {} bytes for {xyz} from {shard}", data.len());
                Ok(data)
            }
            None => Err(SfileError::RowNotFound(path, address.table, address.row)),
        }
    }

    async fn read_row(
        shard: &ShardFile,
        conn: &mut sqlx::SqliteConnection,
        table: &str,
        row: u16,
    ) -> SfileResult<Option<Vec<u8>>> {
        if !shard.has_table(&mut *conn, table).await? {
            return Err(SfileError::TableNotFound(
                PathBuf::from(shard.filepath()),
                table.to_string(),
            ));
        }
        shard.get_tile(&mut *conn, table, row).await
    }
}

/// Serves tiles of all repositories below a root directory, addressed by repository name.
#[derive(Clone, Debug)]
pub struct TileStore {
    root: PathBuf,
    cache: Option<TileCache>,
}

impl TileStore {
    #[must_use]
    pub fn new<P: AsRef<Path>>(root: P, cache: Option<TileCache>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            cache,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn cache(&self) -> Option<&TileCache> {
        self.cache.as_ref()
    }

    /// Path of a repository below the root.
    ///
    /// Names that are empty or would leave the root are reported as
    /// [`SfileError::RepositoryNotFound`].
    pub fn repository_path(&self, name: &str) -> SfileResult<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => {
                Ok(self.root.join(name))
            }
            _ => Err(SfileError::RepositoryNotFound(self.root.join(name))),
        }
    }

    /// Fetch one tile of the named repository, from the tile cache if possible.
    pub async fn get_tile(&self, name: &str, xyz: TileCoord) -> SfileResult<Vec<u8>> {
        let dir = self.repository_path(name)?;
        let fetch = || async {
            let repository = SfileRepository::new(&dir).await?;
            repository.get_tile(xyz).await
        };
        match &self.cache {
            Some(cache) => cache.get_or_insert(&dir, xyz, fetch).await,
            None => fetch().await,
        }
    }
}
