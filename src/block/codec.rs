//! Block codec
//!
//! Serializes a [`Block`] to exactly [`BLOCK_SIZE`] bytes and back.
//!
//! ## Header Layout (little-endian)
//! ```text
//! ┌──────────┬──────────┬───────────┬───────────┬────────────┬──────────┬────────────┬──────────┐
//! │ Mode (1) │ Type (1) │ SeqIdx(4) │ SeqCnt(4) │ Name (80)  │ Size (4) │ Created(4) │ Rsvd (2) │
//! └──────────┴──────────┴───────────┴───────────┴────────────┴──────────┴────────────┴──────────┘
//! ```

use crate::error::{ArchiveError, Result};

use super::{BLOCK_SIZE, HEADER_SIZE, PAYLOAD_SIZE};

/// Size of the NUL-terminated name field
pub const NAME_CAPACITY: usize = 80;

/// Longest storable file name (one byte goes to the terminator)
pub const MAX_NAME_LEN: usize = NAME_CAPACITY - 1;

const MODE_OFFSET: usize = 0;
const TYPE_OFFSET: usize = 1;
const SEQ_INDEX_OFFSET: usize = 2;
const SEQ_COUNT_OFFSET: usize = 6;
const NAME_OFFSET: usize = 10;
const SIZE_OFFSET: usize = NAME_OFFSET + NAME_CAPACITY;
const CREATED_OFFSET: usize = SIZE_OFFSET + 4;

/// Allocation state of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    Free = 0,
    InUse = 1,
}

/// Block content type. Only `Data` is written today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Data = 0,
    Meta = 1,
}

impl TryFrom<u8> for BlockMode {
    type Error = ArchiveError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(BlockMode::Free),
            1 => Ok(BlockMode::InUse),
            other => Err(ArchiveError::BadBlock(format!(
                "Unknown block mode: 0x{:02x}",
                other
            ))),
        }
    }
}

impl TryFrom<u8> for BlockType {
    type Error = ArchiveError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(BlockType::Data),
            1 => Ok(BlockType::Meta),
            other => Err(ArchiveError::BadBlock(format!(
                "Unknown block type: 0x{:02x}",
                other
            ))),
        }
    }
}

/// One fixed-size storage unit: metadata header plus payload
///
/// `file_size` and `created_at` are replicated in every block of a file so
/// any single block identifies the file it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub mode: BlockMode,
    pub block_type: BlockType,
    /// 0-based position of this block within its file
    pub sequence_index: u32,
    /// Total blocks of the owning file
    pub sequence_count: u32,
    pub file_name: String,
    /// Original byte length of the owning file
    pub file_size: u32,
    /// Unix seconds
    pub created_at: u32,
    payload: [u8; PAYLOAD_SIZE],
}

impl Default for Block {
    fn default() -> Self {
        Self::free()
    }
}

impl Block {
    /// An empty free block (encodes to all zero bytes)
    pub fn free() -> Self {
        Self {
            mode: BlockMode::Free,
            block_type: BlockType::Data,
            sequence_index: 0,
            sequence_count: 0,
            file_name: String::new(),
            file_size: 0,
            created_at: 0,
            payload: [0u8; PAYLOAD_SIZE],
        }
    }

    /// Build an in-use data block carrying the given file metadata
    ///
    /// The payload is left zeroed; fill it with [`Block::set_payload`].
    pub fn initialize(
        file_name: &str,
        sequence_index: u32,
        sequence_count: u32,
        file_size: u32,
        created_at: u32,
    ) -> Result<Self> {
        validate_name(file_name)?;
        if sequence_index >= sequence_count {
            return Err(ArchiveError::BadBlock(format!(
                "sequence index {} not below count {}",
                sequence_index, sequence_count
            )));
        }

        Ok(Self {
            mode: BlockMode::InUse,
            block_type: BlockType::Data,
            sequence_index,
            sequence_count,
            file_name: file_name.to_string(),
            file_size,
            created_at,
            payload: [0u8; PAYLOAD_SIZE],
        })
    }

    pub fn is_free(&self) -> bool {
        self.mode == BlockMode::Free
    }

    /// Full payload area, including zero padding
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Copy `data` into the payload, zero-filling the remainder
    pub fn set_payload(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > PAYLOAD_SIZE {
            return Err(ArchiveError::BadBlock(format!(
                "payload of {} bytes exceeds capacity {}",
                data.len(),
                PAYLOAD_SIZE
            )));
        }
        self.payload[..data.len()].copy_from_slice(data);
        self.payload[data.len()..].fill(0);
        Ok(())
    }

    /// Encode to exactly [`BLOCK_SIZE`] bytes
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut bytes = [0u8; BLOCK_SIZE];

        bytes[MODE_OFFSET] = self.mode as u8;
        bytes[TYPE_OFFSET] = self.block_type as u8;
        bytes[SEQ_INDEX_OFFSET..SEQ_INDEX_OFFSET + 4]
            .copy_from_slice(&self.sequence_index.to_le_bytes());
        bytes[SEQ_COUNT_OFFSET..SEQ_COUNT_OFFSET + 4]
            .copy_from_slice(&self.sequence_count.to_le_bytes());

        // Names are validated on construction; clamp anyway so the
        // terminator always survives.
        let name = self.file_name.as_bytes();
        let len = name.len().min(MAX_NAME_LEN);
        bytes[NAME_OFFSET..NAME_OFFSET + len].copy_from_slice(&name[..len]);

        bytes[SIZE_OFFSET..SIZE_OFFSET + 4].copy_from_slice(&self.file_size.to_le_bytes());
        bytes[CREATED_OFFSET..CREATED_OFFSET + 4].copy_from_slice(&self.created_at.to_le_bytes());

        bytes[HEADER_SIZE..].copy_from_slice(&self.payload);
        bytes
    }

    /// Decode one block from exactly [`BLOCK_SIZE`] bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BLOCK_SIZE {
            return Err(ArchiveError::BadBlock(format!(
                "expected {} bytes, got {}",
                BLOCK_SIZE,
                bytes.len()
            )));
        }

        let mode = BlockMode::try_from(bytes[MODE_OFFSET])?;
        let block_type = BlockType::try_from(bytes[TYPE_OFFSET])?;
        let sequence_index = read_u32(bytes, SEQ_INDEX_OFFSET);
        let sequence_count = read_u32(bytes, SEQ_COUNT_OFFSET);

        let name_field = &bytes[NAME_OFFSET..NAME_OFFSET + NAME_CAPACITY];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| ArchiveError::BadBlock("file name not terminated".to_string()))?;
        let file_name = std::str::from_utf8(&name_field[..name_len])
            .map_err(|e| ArchiveError::BadBlock(format!("file name not UTF-8: {}", e)))?
            .to_string();

        let file_size = read_u32(bytes, SIZE_OFFSET);
        let created_at = read_u32(bytes, CREATED_OFFSET);

        if mode == BlockMode::InUse && sequence_index >= sequence_count {
            return Err(ArchiveError::BadBlock(format!(
                "sequence index {} not below count {} for {:?}",
                sequence_index, sequence_count, file_name
            )));
        }

        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[HEADER_SIZE..]);

        Ok(Self {
            mode,
            block_type,
            sequence_index,
            sequence_count,
            file_name,
            file_size,
            created_at,
            payload,
        })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}

/// Check that a name fits the fixed, NUL-terminated header field
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ArchiveError::BadFilename("empty name".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ArchiveError::BadFilename(format!(
            "{:?} is {} bytes (max {})",
            name,
            name.len(),
            MAX_NAME_LEN
        )));
    }
    if name.as_bytes().contains(&0) {
        return Err(ArchiveError::BadFilename(format!("{:?} contains NUL", name)));
    }
    Ok(())
}
