use std::fmt::{Display, Formatter};
use std::path::Path;

use futures::TryStreamExt as _;
use sfile_tile_utils::TableName;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection as _, SqliteConnection, SqliteExecutor, query_as, query_scalar};
use tracing::debug;

use crate::errors::{SfileError, SfileResult};

/// Inclusive range of tile indexes stored in one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileExtent {
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
}

/// A single shard file, a SQLite database holding one 256x256 block of tiles.
///
/// Creating a `ShardFile` does not touch the disk; use [`open_readonly`](Self::open_readonly)
/// to get a connection.
#[derive(Clone, Debug)]
pub struct ShardFile {
    filepath: String,
}

impl Display for ShardFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.filepath)
    }
}

impl ShardFile {
    pub fn new<P: AsRef<Path>>(filepath: P) -> SfileResult<Self> {
        let path = filepath.as_ref();
        Ok(Self {
            filepath: path
                .to_str()
                .ok_or_else(|| SfileError::UnsupportedCharsInFilepath(path.to_path_buf()))?
                .to_string(),
        })
    }

    pub async fn open_readonly(&self) -> SfileResult<SqliteConnection> {
        debug!("Opening as readonly {self}");
        let opt = SqliteConnectOptions::new()
            .filename(self.filepath())
            .read_only(true);
        Ok(SqliteConnection::connect_with(&opt).await?)
    }

    #[must_use]
    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    pub async fn has_table<T>(&self, conn: &mut T, table: &str) -> SfileResult<bool>
    where
        for<'e> &'e mut T: SqliteExecutor<'e>,
    {
        let sql = "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?";
        let count: i64 = query_scalar(sql).bind(table).fetch_one(&mut *conn).await?;
        Ok(count > 0)
    }

    /// Raw payload of one tile row. `None` if the row is missing or holds no data.
    pub async fn get_tile<T>(
        &self,
        conn: &mut T,
        table: &str,
        row: u16,
    ) -> SfileResult<Option<Vec<u8>>>
    where
        for<'e> &'e mut T: SqliteExecutor<'e>,
    {
        let sql = format!("SELECT Data FROM {} WHERE ID = ?", quote_ident(table));
        let data: Option<Option<Vec<u8>>> = query_scalar(&sql)
            .bind(i64::from(row))
            .fetch_optional(&mut *conn)
            .await?;
        Ok(data.flatten())
    }

    /// Names of all tables following the tile table naming convention, sorted.
    pub async fn tile_tables<T>(&self, conn: &mut T) -> SfileResult<Vec<String>>
    where
        for<'e> &'e mut T: SqliteExecutor<'e>,
    {
        let sql = "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name";
        let mut rows = query_scalar::<_, String>(sql).fetch(&mut *conn);
        let mut tables = Vec::new();
        while let Some(name) = rows.try_next().await? {
            if TableName::parse(&name).is_some() {
                tables.push(name);
            } else {
                debug!("Ignoring table {name} in {self}");
            }
        }
        Ok(tables)
    }

    /// Min/max of the stored `X` and `Y` tile index columns. `None` for an empty table.
    pub async fn tile_extent<T>(&self, conn: &mut T, table: &str) -> SfileResult<Option<TileExtent>>
    where
        for<'e> &'e mut T: SqliteExecutor<'e>,
    {
        let sql = format!(
            "SELECT min(X), max(X), min(Y), max(Y) FROM {}",
            quote_ident(table)
        );
        let row: (Option<i64>, Option<i64>, Option<i64>, Option<i64>) =
            query_as(&sql).fetch_one(&mut *conn).await?;
        Ok(match row {
            (Some(min_x), Some(max_x), Some(min_y), Some(max_y)) => Some(TileExtent {
                min_x,
                max_x,
                min_y,
                max_y,
            }),
            _ => None,
        })
    }
}

/// Quote a table name for interpolation into SQL.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
