//! Tests for the chunker
//!
//! These tests verify:
//! - Chunk counts and sizes at payload boundaries
//! - Chunks concatenate back to the source
//! - Reassembly trims the zero padding of the last block

use blockarc::block::{Block, PAYLOAD_SIZE};
use blockarc::chunker::{blocks_needed, Assembler, Chunker};

// =============================================================================
// Helper Functions
// =============================================================================

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Chunk `data` into blocks the way the archive does
fn to_blocks(data: &[u8]) -> Vec<Block> {
    let chunker = Chunker::new(data.to_vec());
    let count = chunker.block_count() as u32;
    chunker
        .chunks()
        .enumerate()
        .map(|(i, chunk)| {
            let mut block = Block::initialize("f", i as u32, count, data.len() as u32, 0).unwrap();
            block.set_payload(&chunk).unwrap();
            block
        })
        .collect()
}

// =============================================================================
// Split Tests
// =============================================================================

#[test]
fn test_empty_source_yields_one_empty_chunk() {
    let chunker = Chunker::new(Vec::new());
    let chunks: Vec<_> = chunker.chunks().collect();

    assert_eq!(chunker.block_count(), 1);
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_empty());
}

#[test]
fn test_chunk_sizes_at_boundaries() {
    for (len, expected) in [
        (1, vec![1]),
        (PAYLOAD_SIZE - 1, vec![PAYLOAD_SIZE - 1]),
        (PAYLOAD_SIZE, vec![PAYLOAD_SIZE]),
        (PAYLOAD_SIZE + 1, vec![PAYLOAD_SIZE, 1]),
        (3 * PAYLOAD_SIZE + 7, vec![PAYLOAD_SIZE, PAYLOAD_SIZE, PAYLOAD_SIZE, 7]),
    ] {
        let chunker = Chunker::new(pattern(len));
        let sizes: Vec<usize> = chunker.chunks().map(|c| c.len()).collect();

        assert_eq!(sizes, expected, "len = {}", len);
        assert_eq!(chunker.block_count(), blocks_needed(len));
    }
}

#[test]
fn test_chunks_concatenate_to_source() {
    let data = pattern(5 * PAYLOAD_SIZE + 123);
    let chunker = Chunker::new(data.clone());

    let joined: Vec<u8> = chunker.chunks().flat_map(|c| c.to_vec()).collect();
    assert_eq!(joined, data);
}

#[test]
fn test_chunks_exact_size() {
    let chunker = Chunker::new(pattern(2 * PAYLOAD_SIZE + 1));
    let mut chunks = chunker.chunks();

    assert_eq!(chunks.len(), 3);
    chunks.next();
    assert_eq!(chunks.len(), 2);
}

// =============================================================================
// Reassembly Tests
// =============================================================================

#[test]
fn test_reassemble_trims_padding() {
    let data = pattern(PAYLOAD_SIZE + 10);
    let blocks = to_blocks(&data);

    let mut assembler = Assembler::new(data.len());
    let mut out = Vec::new();
    let written: Vec<usize> = blocks
        .iter()
        .map(|b| assembler.push(b, &mut out).unwrap())
        .collect();

    assert_eq!(written, vec![PAYLOAD_SIZE, 10]);
    assert!(assembler.is_complete());
    assert_eq!(out, data);
}

#[test]
fn test_reassemble_empty_file() {
    let blocks = to_blocks(&[]);
    let mut assembler = Assembler::new(0);
    let mut out = Vec::new();

    assert_eq!(assembler.push(&blocks[0], &mut out).unwrap(), 0);
    assert!(assembler.is_complete());
    assert!(out.is_empty());
}

#[test]
fn test_reassemble_incomplete() {
    let data = pattern(2 * PAYLOAD_SIZE);
    let blocks = to_blocks(&data);

    let mut assembler = Assembler::new(data.len());
    let mut out = Vec::new();
    assembler.push(&blocks[0], &mut out).unwrap();

    assert!(!assembler.is_complete());
    assert_eq!(assembler.remaining(), PAYLOAD_SIZE);
    assert_eq!(assembler.written(), PAYLOAD_SIZE);
}
