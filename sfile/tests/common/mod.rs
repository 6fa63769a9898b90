#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sfile::sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use sfile::sqlx::{Connection as _, Executor as _, SqliteConnection, query};
use sfile_tile_utils::{TileCoord, resolve};

pub const PNG_TILE: &[u8] = b"\x89PNG\r\n\x1a\n-fake-png-payload";

/// Open (creating if needed) the shard file at `path` for writing.
pub async fn open_shard(path: &Path) -> SqliteConnection {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let opt = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    SqliteConnection::connect_with(&opt).await.unwrap()
}

pub async fn create_tile_table(conn: &mut SqliteConnection, table: &str) {
    conn.execute(
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (ID INTEGER PRIMARY KEY, X INTEGER, Y INTEGER, Data BLOB)"#
        )
        .as_str(),
    )
    .await
    .unwrap();
}

/// Store one tile where a reader expects it, returning the shard file path.
pub async fn write_tile(repository: &Path, xyz: TileCoord, data: Option<&[u8]>) -> PathBuf {
    let address = resolve(xyz);
    let path = address.shard_path(repository);
    let mut conn = open_shard(&path).await;
    create_tile_table(&mut conn, &address.table).await;
    query(&format!(
        r#"INSERT OR REPLACE INTO "{}" (ID, X, Y, Data) VALUES (?, ?, ?, ?)"#,
        address.table
    ))
    .bind(i64::from(address.row))
    .bind(i64::from(xyz.x))
    .bind(i64::from(xyz.y))
    .bind(data)
    .execute(&mut conn)
    .await
    .unwrap();
    conn.close().await.unwrap();
    path
}

/// Create a repository directory `name` below `root`.
pub fn repository(root: &Path, name: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Overwrite every shard file of a repository with bytes that are not a database.
pub fn corrupt_shards(repository: &Path) {
    for zoom_dir in std::fs::read_dir(repository).unwrap() {
        let zoom_dir = zoom_dir.unwrap().path();
        if !zoom_dir.is_dir() {
            continue;
        }
        for shard in std::fs::read_dir(&zoom_dir).unwrap() {
            let shard = shard.unwrap().path();
            if shard.extension().is_some_and(|e| e == "s") {
                std::fs::write(&shard, b"this is not a sqlite database").unwrap();
            }
        }
    }
}
