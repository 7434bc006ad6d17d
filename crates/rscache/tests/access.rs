#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use bytes::Bytes;
use common::{CacheBuilder, enum_bytes};
use pretty_assertions::assert_eq;
use rscache::formats::archive::join_entries;
use rscache::formats::category::{ENUMS, MUSIC, REFERENCE_TABLES};
use rscache::formats::enum_file::EnumFile;
use rscache::formats::{
    CompressionType, Container, DataCacheFile, FormatError, MasterEntry, MasterReferenceTable,
    ReferenceTable, ReferenceTableEntry,
};
use rscache::protocol::{Downloader, MASTER_TABLE_FILE_ID, MemoryTransport};
use rscache::{Cache, CacheConfig, CacheError, ExtractOutcome, LocalCache};
use std::sync::Arc;
use tempfile::TempDir;

fn local_cache() -> (TempDir, Cache<LocalCache>) {
    let mut builder = CacheBuilder::new();
    let enum_entry = enum_bytes(&[(10, "ten"), (20, "twenty")]);
    builder.add_file(ENUMS, 5, 9, &[b"\xc8 not an enum", &enum_entry, b"third"]);
    builder.add_file(ENUMS, 6, 2, &[b"only"]);
    builder.list_only(ENUMS, 8);
    builder.add_plain(MUSIC, 0, b"track zero");

    let dir = TempDir::new().unwrap();
    builder.write(dir.path());
    let cache = Cache::new(
        LocalCache::open(dir.path()).unwrap(),
        CacheConfig::new().without_output_directory(),
    );
    (dir, cache)
}

#[tokio::test]
async fn typed_entry_access() {
    let (_dir, cache) = local_cache();
    let enum_file: EnumFile = cache.get_typed(ENUMS, 5, Some(1)).await.unwrap();

    assert_eq!(enum_file.len(), 2);
    assert_eq!(enum_file.get(20).and_then(|v| v.as_str()), Some("twenty"));
    assert!(!enum_file.contains_key(30));
}

#[tokio::test]
async fn raw_file_access_is_identity() {
    let (_dir, cache) = local_cache();
    let direct = cache.get_file(ENUMS, 5, None).await.unwrap();
    let typed: DataCacheFile = cache.get_typed(ENUMS, 5, None).await.unwrap();

    assert_eq!(typed, direct);
    assert_eq!(direct.entry_count(), 3);
    assert_eq!(direct.entries[2], Bytes::from_static(b"third"));
    assert_eq!(direct.info.version, Some(9));
    assert_eq!(direct.info.crc, Some(5));
    assert_eq!(direct.info.compression, Some(CompressionType::Gzip));
}

#[tokio::test]
async fn entry_out_of_range() {
    let (_dir, cache) = local_cache();
    assert!(matches!(
        cache.get_file(ENUMS, 6, Some(1)).await,
        Err(CacheError::Format(FormatError::OutOfRange { .. }))
    ));
}

#[tokio::test]
async fn typed_decode_failure_is_a_format_error() {
    let (_dir, cache) = local_cache();
    // 0xc8 is not an enum opcode
    let err = cache
        .get_typed::<EnumFile>(ENUMS, 5, Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Format(_)));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn listed_but_not_stored_is_not_found() {
    let (_dir, cache) = local_cache();
    assert_eq!(cache.file_ids(ENUMS).await.unwrap(), vec![5, 6, 8]);

    let info = cache.get_file_info(ENUMS, 8).await.unwrap();
    assert_eq!(info.version, Some(1));
    let err = cache.get_file(ENUMS, 8, None).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn categories_without_tables_use_the_index() {
    let (_dir, cache) = local_cache();
    assert_eq!(cache.categories().await.unwrap(), vec![ENUMS, MUSIC]);
    assert_eq!(cache.file_ids(MUSIC).await.unwrap(), vec![0]);

    let file = cache.get_file(MUSIC, 0, None).await.unwrap();
    assert_eq!(file.data, Bytes::from_static(b"track zero"));
    assert_eq!(file.info.compression, Some(CompressionType::None));
    assert!(matches!(
        cache.get_file(REFERENCE_TABLES, 99, None).await,
        Err(e) if e.is_not_found()
    ));
}

fn gzip(data: Vec<u8>) -> Vec<u8> {
    Container::new(data)
        .with_compression(CompressionType::Gzip)
        .encode()
        .unwrap()
}

fn remote() -> Arc<MemoryTransport> {
    let transport = MemoryTransport::new().with_chunk_size(7);

    let mut table = ReferenceTable::default();
    let mut archive = ReferenceTableEntry::new(3, 4);
    archive.children.insert(0, None);
    archive.children.insert(1, None);
    table.insert(archive);
    let encoded = gzip(table.encode().unwrap());
    transport.insert(REFERENCE_TABLES, u32::from(ENUMS), encoded);

    let master = MasterReferenceTable {
        entries: (0..=ENUMS)
            .map(|c| MasterEntry::new(0, i32::from(c), 0, 0))
            .collect(),
        signature: vec![],
    };
    let encoded = gzip(master.encode().unwrap());
    transport.insert(REFERENCE_TABLES, MASTER_TABLE_FILE_ID, encoded);

    let entries = [
        Bytes::from(enum_bytes(&[(1, "remote")])),
        Bytes::from_static(b"OggS remote"),
    ];
    transport.insert(ENUMS, 3, gzip(join_entries(&entries)));
    Arc::new(transport)
}

#[tokio::test]
async fn downloader_backed_cache() {
    let transport = remote();
    let output = TempDir::new().unwrap();
    let cache = Cache::new(
        Downloader::new(transport.clone()),
        CacheConfig::new().with_output_directory(output.path()),
    );

    let enum_file: EnumFile = cache.get_typed(ENUMS, 3, Some(0)).await.unwrap();
    assert_eq!(enum_file.get(1).and_then(|v| v.as_str()), Some("remote"));

    let report = cache
        .extract_categories(&[ENUMS], false, None)
        .await
        .unwrap();
    assert_eq!(report.extracted, vec![(ENUMS, 3)]);
    assert_eq!(report.entries_written, 2);

    let dir = output.path().join("extracted").join(ENUMS.to_string());
    assert!(dir.join("3").is_file());
    assert_eq!(std::fs::read(dir.join("3-1.ogg")).unwrap(), b"OggS remote");

    // Reference tables are requested once for the lifetime of the downloader
    let before = transport.submissions();
    assert_eq!(
        cache.extract_file(ENUMS, 3, true).await.unwrap(),
        ExtractOutcome::Extracted(vec![dir.join("3"), dir.join("3-1.ogg")])
    );
    assert_eq!(transport.submissions(), before + 1);
}

#[tokio::test]
async fn downloader_missing_category_is_skipped_in_batches() {
    let output = TempDir::new().unwrap();
    let cache = Cache::new(
        Downloader::new(remote()),
        CacheConfig::new().with_output_directory(output.path()),
    );

    let report = cache
        .extract_categories(&[MUSIC, ENUMS], false, None)
        .await
        .unwrap();
    assert_eq!(report.skipped_categories, vec![MUSIC]);
    assert_eq!(report.extracted, vec![(ENUMS, 3)]);
}
