use std::time::Duration;

use approx::assert_relative_eq;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use sfile::sqlx::Connection as _;
use sfile::{
    ANALYZED_ZOOM, RepositoryCatalog, RepositoryDescriptor, RepositoryScanner, SIDECAR_FILE_NAME,
    SfileError,
};
use sfile_tile_utils::TileCoord;
use sfile_tile_utils::mercator::tile_bound;

mod common;
use common::{PNG_TILE, corrupt_shards, create_tile_table, open_shard, repository, write_tile};

fn catalog(root: &std::path::Path) -> RepositoryCatalog {
    RepositoryCatalog::new(root, RepositoryScanner::new(Some(Duration::from_secs(30))))
}

#[tokio::test]
async fn analyze_single_tile() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "world");
    let shard = write_tile(&dir, TileCoord::new(14, 0, 0), Some(PNG_TILE)).await;
    assert!(shard.ends_with("O/O_0_0.s"));

    let descriptor = RepositoryScanner::default().analyze(&dir).await.unwrap();
    let (lng, lat) = tile_bound(0, 0, 14).center().unwrap();
    assert_relative_eq!(descriptor.lng, lng);
    assert_relative_eq!(descriptor.lat, lat);
    assert_relative_eq!(descriptor.lng, -180.0 + 180.0 / 16384.0, epsilon = 1e-9);
    assert!(descriptor.lat > 85.0 && descriptor.lat < 85.0511);
    assert!(descriptor.analyzed);
    assert_eq!(descriptor.zoom, ANALYZED_ZOOM);
    assert_eq!(descriptor.name, "world");
    assert_eq!(descriptor.url, "world");
    #[expect(clippy::cast_precision_loss)]
    let shard_size = std::fs::metadata(&shard).unwrap().len() as f64;
    assert_relative_eq!(descriptor.size_bytes, shard_size);

    let saved = RepositoryDescriptor::read_sidecar(&dir).await.unwrap();
    assert_eq!(saved, Some(descriptor));
}

#[tokio::test]
async fn scan_summary() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "beijing");
    write_tile(&dir, TileCoord::new(12, 3000, 1500), Some(PNG_TILE)).await;
    write_tile(&dir, TileCoord::new(12, 3100, 1510), Some(PNG_TILE)).await;
    write_tile(&dir, TileCoord::new(14, 12_000, 6_000), Some(PNG_TILE)).await;

    // shard with a non-tile table and an empty tile table
    let mut conn = open_shard(&dir.join("M").join("M_0_0.s")).await;
    create_tile_table(&mut conn, "M_0_0").await;
    create_tile_table(&mut conn, "notes").await;
    create_tile_table(&mut conn, "m_1_1").await;
    conn.close().await.unwrap();

    // ignored entries
    std::fs::create_dir(dir.join("tmp")).unwrap();
    std::fs::write(dir.join("M").join("README.txt"), b"not a shard").unwrap();
    std::fs::write(dir.join("A"), b"not a zoom directory").unwrap();

    let summary = RepositoryScanner::default().scan(&dir).await.unwrap();
    assert_eq!(summary.name, "beijing");
    assert_eq!(summary.shard_count, 4);
    // M_46_23, M_48_23 and M_0_0 in M, O_187_93 in O
    assert_eq!(summary.table_count, 4);
    assert_eq!(summary.zoom_info.len(), 2);

    let m = &summary.zoom_info[0];
    assert_eq!((m.zoom, m.letter), (12, 'M'));
    assert_eq!((m.shard_count, m.table_count), (3, 3));
    let mut expected = tile_bound(3000, 1500, 12);
    expected.extend(&tile_bound(3100, 1510, 12));
    assert_relative_eq!(m.bbox.min_x, expected.min_x);
    assert_relative_eq!(m.bbox.max_x, expected.max_x);
    assert_relative_eq!(m.bbox.min_y, expected.min_y);
    assert_relative_eq!(m.bbox.max_y, expected.max_y);

    let o = &summary.zoom_info[1];
    assert_eq!((o.zoom, o.letter), (14, 'O'));
    assert_eq!((o.shard_count, o.table_count), (1, 1));
    assert_eq!(
        summary.file_size,
        summary.zoom_info.iter().map(|l| l.file_size).sum::<u64>()
    );

    let bounds = summary.bounds().unwrap();
    assert!(bounds.left < bounds.right && bounds.bottom < bounds.top);
    assert!(summary.to_string().contains("Repository: beijing"));

    // scanning never persists
    assert!(!dir.join(SIDECAR_FILE_NAME).exists());
}

#[tokio::test]
async fn scan_without_tiles() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "hollow");
    let mut conn = open_shard(&dir.join("O").join("O_0_0.s")).await;
    create_tile_table(&mut conn, "O_0_0").await;
    conn.close().await.unwrap();

    let err = RepositoryScanner::default().scan(&dir).await.unwrap_err();
    assert!(matches!(err, SfileError::NoTilesFound(_)), "{err}");
    let err = RepositoryScanner::default().analyze(&dir).await.unwrap_err();
    assert!(matches!(err, SfileError::NoTilesFound(_)), "{err}");
    assert!(!dir.join(SIDECAR_FILE_NAME).exists());
}

#[tokio::test]
async fn corrupt_shard_aborts_scan() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "broken");
    write_tile(&dir, TileCoord::new(12, 3000, 1500), Some(PNG_TILE)).await;
    corrupt_shards(&dir);

    let err = RepositoryScanner::default().scan(&dir).await.unwrap_err();
    assert!(matches!(err, SfileError::SqlxError(_)), "{err}");

    let listed = catalog(root.path()).list().await.unwrap();
    assert_eq!(listed, vec![RepositoryDescriptor::placeholder("broken")]);
    assert!(!dir.join(SIDECAR_FILE_NAME).exists());
}

#[tokio::test]
async fn timed_out_scan_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "slow");
    write_tile(&dir, TileCoord::new(12, 3000, 1500), Some(PNG_TILE)).await;
    let scanner = RepositoryScanner::new(Some(Duration::from_nanos(1)));

    let err = scanner.analyze(&dir).await.unwrap_err();
    assert!(matches!(err, SfileError::ScanTimeout(_, _)), "{err}");
    assert!(!dir.join(SIDECAR_FILE_NAME).exists());

    let listed = RepositoryCatalog::new(root.path(), scanner)
        .list()
        .await
        .unwrap();
    assert_eq!(listed, vec![RepositoryDescriptor::placeholder("slow")]);
    assert!(!dir.join(SIDECAR_FILE_NAME).exists());
}

#[tokio::test]
async fn empty_repository_gets_placeholder() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "new");
    std::fs::write(root.path().join("notes.txt"), b"not a repository").unwrap();

    let listed = catalog(root.path()).list().await.unwrap();
    assert_eq!(listed.len(), 1);
    let descriptor = &listed[0];
    assert!(!descriptor.analyzed);
    assert_eq!(descriptor.name, "new");
    assert_relative_eq!(descriptor.lng, 113.0);
    assert_relative_eq!(descriptor.lat, 40.0);
    assert!(!dir.join(SIDECAR_FILE_NAME).exists());
}

#[tokio::test]
async fn second_listing_uses_sidecar() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "beijing");
    write_tile(&dir, TileCoord::new(12, 3000, 1500), Some(PNG_TILE)).await;
    let catalog = catalog(root.path());

    let first = catalog.list().await.unwrap();
    assert!(first[0].analyzed);
    assert!(dir.join(SIDECAR_FILE_NAME).exists());

    // any attempt to open a shard would now fail
    corrupt_shards(&dir);
    let second = catalog.list().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn listing_is_sorted() {
    let root = tempfile::tempdir().unwrap();
    for name in ["c", "a", "b"] {
        let dir = repository(root.path(), name);
        write_tile(&dir, TileCoord::new(10, 300, 70), Some(PNG_TILE)).await;
    }
    repository(root.path(), "0-empty");

    let names: Vec<_> = catalog(root.path())
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|d| (d.name, d.analyzed))
        .collect();
    assert_eq!(
        names,
        vec![
            ("0-empty".to_string(), false),
            ("a".to_string(), true),
            ("b".to_string(), true),
            ("c".to_string(), true),
        ]
    );
}

#[tokio::test]
async fn malformed_sidecar_is_replaced() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "beijing");
    write_tile(&dir, TileCoord::new(12, 3000, 1500), Some(PNG_TILE)).await;
    let sidecar = dir.join(SIDECAR_FILE_NAME);
    std::fs::write(&sidecar, b"{\"name\": \"beij").unwrap();

    let descriptor = catalog(root.path()).describe(&dir).await;
    assert!(descriptor.analyzed);
    let saved = RepositoryDescriptor::read_sidecar(&dir).await.unwrap();
    assert_eq!(saved, Some(descriptor));
}

#[tokio::test]
async fn concurrent_describe() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "beijing");
    write_tile(&dir, TileCoord::new(12, 3000, 1500), Some(PNG_TILE)).await;
    write_tile(&dir, TileCoord::new(16, 50_000, 25_000), Some(PNG_TILE)).await;
    let catalog = catalog(root.path());

    let results = join_all((0..8).map(|_| catalog.describe(&dir))).await;
    let saved = RepositoryDescriptor::read_sidecar(&dir)
        .await
        .unwrap()
        .unwrap();
    assert!(saved.analyzed);
    for descriptor in results {
        assert_eq!(descriptor, saved);
    }
    assert!(!dir.join(".repository.json.tmp").exists());
}

#[tokio::test]
async fn reanalyze_replaces_sidecar() {
    let root = tempfile::tempdir().unwrap();
    let dir = repository(root.path(), "beijing");
    write_tile(&dir, TileCoord::new(12, 3000, 1500), Some(PNG_TILE)).await;

    let stale = RepositoryDescriptor {
        lng: 1.0,
        lat: 2.0,
        ..RepositoryDescriptor::placeholder("beijing")
    };
    stale.write_sidecar(&dir).await.unwrap();
    let catalog = catalog(root.path());
    assert_eq!(catalog.describe(&dir).await, stale);

    let fresh = catalog.reanalyze(&dir).await.unwrap();
    assert!(fresh.analyzed);
    assert_eq!(catalog.describe(&dir).await, fresh);
}

#[tokio::test]
async fn unreadable_root() {
    let root = tempfile::tempdir().unwrap();
    let err = catalog(&root.path().join("missing"))
        .list()
        .await
        .unwrap_err();
    assert!(matches!(err, SfileError::IoError(..)), "{err}");
}
