//! Tests for the block codec
//!
//! These tests verify:
//! - Encoded blocks are exactly BLOCK_SIZE bytes with the payload at HEADER_SIZE
//! - Decoding restores header fields and payload
//! - Structural errors (length, mode, type, name, sequence) are BadBlock

use blockarc::block::{Block, BlockMode, BlockType, BLOCK_SIZE, HEADER_SIZE, MAX_NAME_LEN, PAYLOAD_SIZE};
use blockarc::ArchiveError;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_block() -> Block {
    let mut block = Block::initialize("report.pdf", 1, 3, 2000, 1_700_000_000).unwrap();
    block.set_payload(b"payload bytes").unwrap();
    block
}

// =============================================================================
// Encode / Decode Tests
// =============================================================================

#[test]
fn test_encode_size_and_split() {
    let bytes = sample_block().encode();

    assert_eq!(bytes.len(), BLOCK_SIZE);
    assert_eq!(HEADER_SIZE + PAYLOAD_SIZE, BLOCK_SIZE);
    assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 13], b"payload bytes");
    assert!(bytes[HEADER_SIZE + 13..].iter().all(|&b| b == 0));
}

#[test]
fn test_decode_restores_fields() {
    let block = sample_block();
    let decoded = Block::decode(&block.encode()).unwrap();

    assert_eq!(decoded.mode, BlockMode::InUse);
    assert_eq!(decoded.block_type, BlockType::Data);
    assert_eq!(decoded.sequence_index, 1);
    assert_eq!(decoded.sequence_count, 3);
    assert_eq!(decoded.file_name, "report.pdf");
    assert_eq!(decoded.file_size, 2000);
    assert_eq!(decoded.created_at, 1_700_000_000);
    assert_eq!(decoded, block);
}

#[test]
fn test_decode_free_block() {
    let decoded = Block::decode(&[0u8; BLOCK_SIZE]).unwrap();

    assert!(decoded.is_free());
    assert_eq!(decoded, Block::free());
}

#[test]
fn test_initialize_leaves_payload_zeroed() {
    let block = Block::initialize("x", 0, 1, 0, 0).unwrap();
    assert!(block.payload().iter().all(|&b| b == 0));
    assert_eq!(block.payload().len(), PAYLOAD_SIZE);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_decode_wrong_length() {
    let result = Block::decode(&[0u8; BLOCK_SIZE - 1]);
    assert!(matches!(result, Err(ArchiveError::BadBlock(_))));

    let result = Block::decode(&[0u8; BLOCK_SIZE + 1]);
    assert!(matches!(result, Err(ArchiveError::BadBlock(_))));
}

#[test]
fn test_decode_unknown_mode() {
    let mut bytes = sample_block().encode();
    bytes[0] = 7;

    assert!(matches!(Block::decode(&bytes), Err(ArchiveError::BadBlock(_))));
}

#[test]
fn test_decode_unknown_type() {
    let mut bytes = sample_block().encode();
    bytes[1] = 2;

    assert!(matches!(Block::decode(&bytes), Err(ArchiveError::BadBlock(_))));
}

#[test]
fn test_decode_unterminated_name() {
    let mut bytes = sample_block().encode();
    bytes[10..90].fill(b'a');

    assert!(matches!(Block::decode(&bytes), Err(ArchiveError::BadBlock(_))));
}

#[test]
fn test_decode_sequence_index_out_of_range() {
    let mut bytes = sample_block().encode();
    bytes[2..6].copy_from_slice(&3u32.to_le_bytes());

    assert!(matches!(Block::decode(&bytes), Err(ArchiveError::BadBlock(_))));
}

#[test]
fn test_initialize_rejects_bad_names() {
    let too_long = "x".repeat(MAX_NAME_LEN + 1);

    assert!(matches!(
        Block::initialize(&too_long, 0, 1, 0, 0),
        Err(ArchiveError::BadFilename(_))
    ));
    assert!(matches!(
        Block::initialize("", 0, 1, 0, 0),
        Err(ArchiveError::BadFilename(_))
    ));
    assert!(matches!(
        Block::initialize("a\0b", 0, 1, 0, 0),
        Err(ArchiveError::BadFilename(_))
    ));
}

#[test]
fn test_set_payload_too_large() {
    let mut block = Block::initialize("x", 0, 1, 0, 0).unwrap();
    let result = block.set_payload(&vec![1u8; PAYLOAD_SIZE + 1]);

    assert!(matches!(result, Err(ArchiveError::BadBlock(_))));
}
