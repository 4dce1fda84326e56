//! Integration tests for the engine.
//!
//! These exercise whole-file behavior: chain lengths, space reuse, cache
//! eviction across reopen, locking and format checks.

use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::time::{Duration, Instant};

use blobfile::{AccessMode, Engine, EntryId, Error, PageId, StoreConfig, DATA_PER_PAGE};
use tempfile::tempdir;

fn open_rw(path: &Path) -> Engine {
    Engine::open(path, AccessMode::ReadWrite).unwrap()
}

/// Deterministic pseudo-random bytes.
fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect()
}

// ============================================================================
// Chains
// ============================================================================

/// A 1 KiB blob round-trips and fits in one page.
#[test]
fn test_small_blob_round_trip() {
    let dir = tempdir().unwrap();
    let mut engine = open_rw(&dir.path().join("small.db"));

    let data = noise(1_024, 1);
    let entry = engine.insert("small.bin", &mut data.as_slice()).unwrap();
    assert_eq!(entry.length(), 1_024);
    assert_eq!(engine.header().last_page_id(), PageId::new(1));

    let mut out = Vec::new();
    engine.read(&entry.id(), &mut out).unwrap().unwrap();
    assert_eq!(out, data);
}

/// A 10 MiB blob occupies ceil(10485760 / 4088) = 2565 pages.
#[test]
fn test_ten_mebibyte_blob_chain_length() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("large.db");
    let data = noise(10_485_760, 2);

    let id = {
        let mut engine = open_rw(&path);
        let entry = engine.insert("large.bin", &mut data.as_slice()).unwrap();
        assert_eq!(entry.length(), 10_485_760);
        assert_eq!(engine.header().last_page_id(), PageId::new(2565));
        engine.close().unwrap();
        entry.id()
    };

    let mut engine = Engine::open(&path, AccessMode::ReadOnly).unwrap();
    let mut out = Vec::with_capacity(data.len());
    let entry = engine.read(&id, &mut out).unwrap().unwrap();
    assert_eq!(entry.length(), 10_485_760);
    assert!(out == data);
}

/// An empty blob is stored as one page with no payload.
#[test]
fn test_zero_length_blob() {
    let dir = tempdir().unwrap();
    let mut engine = open_rw(&dir.path().join("empty.db"));

    let entry = engine.insert("empty.txt", &mut std::io::empty()).unwrap();
    assert_eq!(entry.length(), 0);
    assert_eq!(engine.header().last_page_id(), PageId::new(1));

    let mut out = vec![9u8];
    engine.read(&entry.id(), &mut out).unwrap().unwrap();
    assert_eq!(out, vec![9u8]);

    let mut reader = engine.open_read(&entry.id()).unwrap().unwrap();
    let mut streamed = Vec::new();
    reader.read_to_end(&mut streamed).unwrap();
    assert!(streamed.is_empty());
}

// ============================================================================
// Space reuse
// ============================================================================

/// Deleting A and inserting an equal-sized B does not grow the file.
#[test]
fn test_delete_then_insert_reuses_pages() {
    let dir = tempdir().unwrap();
    let mut engine = open_rw(&dir.path().join("reuse.db"));

    let size = 3 * DATA_PER_PAGE + 10;
    let a = engine.insert("x.txt", &mut noise(size, 3).as_slice()).unwrap();
    let before = engine.header().last_page_id();

    assert!(engine.delete(&a.id()).unwrap());
    let b_data = noise(size, 4);
    let b = engine.insert("y.txt", &mut b_data.as_slice()).unwrap();

    assert_eq!(engine.header().last_page_id(), before);
    assert_eq!(engine.header().free_data_head(), None);

    let mut out = Vec::new();
    engine.read(&b.id(), &mut out).unwrap().unwrap();
    assert_eq!(out, b_data);
}

/// A smaller replacement leaves the unused pages on the free list.
#[test]
fn test_smaller_insert_keeps_remainder_free() {
    let dir = tempdir().unwrap();
    let mut engine = open_rw(&dir.path().join("remainder.db"));

    let a = engine.insert("a.bin", &mut noise(5 * DATA_PER_PAGE, 5).as_slice()).unwrap();
    engine.delete(&a.id()).unwrap();
    engine.insert("b.bin", &mut noise(2 * DATA_PER_PAGE, 6).as_slice()).unwrap();

    // Pages 1..=5 held A; B took 1 and 2.
    assert_eq!(engine.header().free_data_head(), Some(PageId::new(3)));
    assert_eq!(engine.header().free_data_tail(), Some(PageId::new(5)));

    // The remainder is consumed by the next insert before the file grows.
    engine.insert("c.bin", &mut noise(3 * DATA_PER_PAGE, 7).as_slice()).unwrap();
    assert_eq!(engine.header().last_page_id(), PageId::new(5));
    assert_eq!(engine.header().free_data_head(), None);
}

/// Free list state survives a reopen.
#[test]
fn test_free_list_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("free.db");

    {
        let mut engine = open_rw(&path);
        let a = engine.insert("a.bin", &mut noise(2 * DATA_PER_PAGE, 8).as_slice()).unwrap();
        engine.delete(&a.id()).unwrap();
        engine.close().unwrap();
    }

    let mut engine = open_rw(&path);
    assert_eq!(engine.header().free_data_head(), Some(PageId::new(1)));
    engine.insert("b.bin", &mut noise(DATA_PER_PAGE, 9).as_slice()).unwrap();
    assert_eq!(engine.header().last_page_id(), PageId::new(2));
}

// ============================================================================
// Listing and lookup
// ============================================================================

/// 5000 entries are listed once each, in allocation order.
#[test]
fn test_list_five_thousand_entries() {
    let dir = tempdir().unwrap();
    let mut engine = open_rw(&dir.path().join("many.db"));

    let ids: Vec<EntryId> = (0..5_000)
        .map(|i| {
            let name = format!("file{i}.dat");
            engine.insert(&name, &mut &b"x"[..]).unwrap().id()
        })
        .collect();

    let listed = engine.list().unwrap();
    assert_eq!(listed.len(), 5_000);

    let unique: HashSet<EntryId> = listed.iter().map(|e| e.id()).collect();
    assert_eq!(unique.len(), 5_000);

    let listed_ids: Vec<EntryId> = listed.iter().map(|e| e.id()).collect();
    assert_eq!(listed_ids, ids);
}

/// Deleted entries disappear from listings but keep their slot.
#[test]
fn test_list_excludes_deleted() {
    let dir = tempdir().unwrap();
    let mut engine = open_rw(&dir.path().join("listing.db"));

    let ids: Vec<EntryId> = (0..10)
        .map(|i| engine.insert("f.txt", &mut noise(i * 100, i as u64).as_slice()).unwrap().id())
        .collect();
    for id in ids.iter().step_by(2) {
        assert!(engine.delete(id).unwrap());
    }

    let listed: Vec<EntryId> = engine.list().unwrap().iter().map(|e| e.id()).collect();
    let expected: Vec<EntryId> = ids.iter().skip(1).step_by(2).copied().collect();
    assert_eq!(listed, expected);
}

/// Lookups of unknown ids report absence and change nothing.
#[test]
fn test_not_found_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.db");
    let mut engine = open_rw(&path);
    engine.insert("a.txt", &mut &b"a"[..]).unwrap();
    engine.persist().unwrap();

    let snapshot = fs::read(&path).unwrap();
    let last_page = engine.header().last_page_id();
    let unknown = EntryId::generate();

    for _ in 0..3 {
        assert_eq!(engine.search(&unknown).unwrap(), None);
        let mut out = Vec::new();
        assert_eq!(engine.read(&unknown, &mut out).unwrap(), None);
        assert!(out.is_empty());
        assert!(engine.open_read(&unknown).unwrap().is_none());
        assert!(!engine.delete(&unknown).unwrap());
    }

    assert!(!engine.header().is_dirty());
    assert_eq!(engine.header().last_page_id(), last_page);
    engine.persist().unwrap();
    assert_eq!(fs::read(&path).unwrap(), snapshot);
}

// ============================================================================
// Cache
// ============================================================================

/// A tiny cache evicts constantly without losing writes.
#[test]
fn test_cache_eviction_keeps_writes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("evict.db");
    let config = StoreConfig::builder()
        .cache_capacity(2)
        .sync_on_persist(false)
        .build();

    let ids: Vec<EntryId> = {
        let mut engine = Engine::open_with_config(&path, AccessMode::ReadWrite, config.clone()).unwrap();
        let ids = (0..600)
            .map(|i| {
                let data = noise(i % 50, i as u64);
                engine.insert("e.bin", &mut data.as_slice()).unwrap().id()
            })
            .collect();

        let stats = engine.cache_stats();
        assert!(stats.evictions > 0, "{stats}");
        engine.persist().unwrap();
        engine.close().unwrap();
        ids
    };

    let mut engine = Engine::open_with_config(&path, AccessMode::ReadOnly, config).unwrap();
    for (i, id) in ids.iter().enumerate() {
        let mut out = Vec::new();
        let entry = engine.read(id, &mut out).unwrap().unwrap();
        assert_eq!(out, noise(i % 50, i as u64));
        assert_eq!(entry.length(), (i % 50) as u64);
    }
    assert_eq!(engine.list().unwrap().len(), 600);
}

/// Id whose value grows with `n`. Its leading fields are zero, so it
/// sorts below the root sentinel.
fn sequential_id(n: u64) -> EntryId {
    format!("00000000-0000-0000-0000-{n:012x}").parse().unwrap()
}

/// Sorted ids degenerate the tree into one long chain that crosses many
/// index pages; every link must survive eviction and reopen.
#[test]
fn test_sorted_ids_across_index_pages() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sorted.db");
    let config = StoreConfig::builder()
        .cache_capacity(2)
        .sync_on_persist(false)
        .build();

    let ascending: Vec<EntryId> = (1..=150).map(sequential_id).collect();
    let descending: Vec<EntryId> = (1_001..=1_100).rev().map(sequential_id).collect();
    let inserted: Vec<EntryId> = ascending.iter().chain(&descending).copied().collect();
    assert!(ascending.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(descending.windows(2).all(|pair| pair[0] > pair[1]));

    {
        let mut engine =
            Engine::open_with_config(&path, AccessMode::ReadWrite, config.clone()).unwrap();
        for (i, id) in inserted.iter().enumerate() {
            let data = noise(i % 7, i as u64);
            engine.insert_with_id(*id, "s.bin", &mut data.as_slice()).unwrap();
        }
        // 250 nodes + sentinel over 50-slot index pages.
        assert!(engine.cache_stats().evictions > 0);
        engine.close().unwrap();
    }

    let mut engine = Engine::open_with_config(&path, AccessMode::ReadWrite, config).unwrap();
    for (i, id) in inserted.iter().enumerate() {
        let entry = engine.search(id).unwrap().unwrap();
        assert_eq!(entry.length(), (i % 7) as u64);
        let mut out = Vec::new();
        engine.read(id, &mut out).unwrap().unwrap();
        assert_eq!(out, noise(i % 7, i as u64));
    }
    assert!(engine.search(&sequential_id(500)).unwrap().is_none());

    let listed: Vec<EntryId> = engine.list().unwrap().iter().map(|e| e.id()).collect();
    assert_eq!(listed, inserted);

    // Still insertable after reopen, between existing keys.
    let between = sequential_id(600);
    engine.insert_with_id(between, "s.bin", &mut &b"x"[..]).unwrap();
    assert!(engine.search(&between).unwrap().is_some());
}

// ============================================================================
// Locking
// ============================================================================

/// A second writer retries with growing delays, then times out.
#[cfg(any(target_os = "linux", windows))]
#[test]
fn test_second_writer_times_out() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("locked.db");
    let _writer = open_rw(&path);

    let config = StoreConfig::builder()
        .lock_retry_limit(3)
        .lock_retry_delay(Duration::from_millis(20))
        .build();

    let start = Instant::now();
    let err = Engine::open_with_config(&path, AccessMode::ReadWrite, config)
        .err()
        .unwrap();
    assert!(matches!(err, Error::LockTimeout { attempts: 3 }));
    // Sleeps of 20 ms and 40 ms between the three attempts.
    assert!(start.elapsed() >= Duration::from_millis(60));
}

/// Closing the writer releases the lock.
#[test]
fn test_lock_released_on_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("relock.db");

    open_rw(&path).close().unwrap();
    let config = StoreConfig::builder().lock_retry_limit(1).build();
    assert!(Engine::open_with_config(&path, AccessMode::ReadWrite, config).is_ok());
}

/// Readers take no lock and can open a file held by a writer.
#[test]
fn test_reader_opens_while_writer_holds_lock() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let mut writer = open_rw(&path);
    let id = writer.insert("w.txt", &mut &b"written"[..]).unwrap().id();
    writer.persist().unwrap();

    let mut reader = Engine::open(&path, AccessMode::ReadOnly).unwrap();
    let mut out = Vec::new();
    reader.read(&id, &mut out).unwrap().unwrap();
    assert_eq!(out, b"written");
}

// ============================================================================
// Format
// ============================================================================

/// Opening a missing file read-only fails with NotFound.
#[test]
fn test_read_only_missing_file() {
    let dir = tempdir().unwrap();
    let err = Engine::open(dir.path().join("missing.db"), AccessMode::ReadOnly)
        .err()
        .unwrap();
    assert!(matches!(err, Error::Io(ref e) if e.kind() == ErrorKind::NotFound));
    assert!(!dir.path().join("missing.db").exists());
}

/// A file that is not a store is rejected as a format error.
#[test]
fn test_bad_magic_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.db");
    fs::write(&path, vec![0x42u8; 8_192]).unwrap();

    let err = Engine::open(&path, AccessMode::ReadOnly).err().unwrap();
    assert!(err.is_format(), "{err}");
}

/// A header with another version is rejected.
#[test]
fn test_unknown_version_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("version.db");
    open_rw(&path).close().unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[6..8].copy_from_slice(&2u16.to_le_bytes());
    fs::write(&path, bytes).unwrap();

    let err = Engine::open(&path, AccessMode::ReadOnly).err().unwrap();
    assert!(matches!(err, Error::UnsupportedVersion { found: 2 }));
}

/// A new file holds the header and the root index page, and starts with
/// the magic.
#[test]
fn test_new_file_layout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fresh.db");
    open_rw(&path).close().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..6], b"FileDB");
    assert_eq!(u16::from_le_bytes([bytes[6], bytes[7]]), 1);
    // Root index page tag.
    assert_eq!(bytes[100], 2);
}
