//! Tests for BlockStore
//!
//! These tests verify:
//! - Blocks land at index * BLOCK_SIZE and read back unchanged
//! - Reads past the end fail with FileReadError
//! - block_count / truncate track whole blocks

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

use blockarc::block::{Block, BlockStore, BLOCK_SIZE};
use blockarc::ArchiveError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> (TempDir, PathBuf, BlockStore) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.arc");
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    (temp_dir, path, BlockStore::new(file))
}

fn block_for(name: &str, byte: u8) -> Block {
    let mut block = Block::initialize(name, 0, 1, 10, 42).unwrap();
    block.set_payload(&[byte; 10]).unwrap();
    block
}

// =============================================================================
// Read / Write Tests
// =============================================================================

#[test]
fn test_write_then_read() {
    let (_temp, _path, mut store) = setup_store();
    let block = block_for("a", 0xAB);

    store.write_block(0, &block).unwrap();
    let read = store.read_block(0).unwrap();

    assert_eq!(read, block);
}

#[test]
fn test_write_at_offset() {
    let (_temp, path, mut store) = setup_store();

    store.write_block(2, &block_for("c", 3)).unwrap();
    store.sync().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 3 * BLOCK_SIZE);
    assert!(bytes[..2 * BLOCK_SIZE].iter().all(|&b| b == 0));
    assert_eq!(bytes[2 * BLOCK_SIZE], 1); // mode = in-use
    assert_eq!(store.block_count().unwrap(), 3);

    // Gap blocks decode as free
    assert!(store.read_block(1).unwrap().is_free());
}

#[test]
fn test_overwrite_block() {
    let (_temp, _path, mut store) = setup_store();

    store.write_block(0, &block_for("a", 1)).unwrap();
    store.write_block(0, &block_for("b", 2)).unwrap();

    assert_eq!(store.read_block(0).unwrap().file_name, "b");
    assert_eq!(store.block_count().unwrap(), 1);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_read_past_end() {
    let (_temp, _path, mut store) = setup_store();
    store.write_block(0, &block_for("a", 1)).unwrap();

    let result = store.read_block(1);
    assert!(matches!(result, Err(ArchiveError::FileReadError(_))));
}

#[test]
fn test_partial_block_length_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.arc");
    fs::write(&path, vec![0u8; BLOCK_SIZE + 5]).unwrap();

    let store = BlockStore::new(File::open(&path).unwrap());
    assert!(matches!(store.block_count(), Err(ArchiveError::BadBlock(_))));
}

// =============================================================================
// Truncate Tests
// =============================================================================

#[test]
fn test_truncate() {
    let (_temp, _path, mut store) = setup_store();
    for i in 0..4 {
        store.write_block(i, &block_for("a", i as u8)).unwrap();
    }

    store.truncate(2).unwrap();

    assert_eq!(store.block_count().unwrap(), 2);
    assert!(store.read_block(2).is_err());
}
