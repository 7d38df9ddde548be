//! Block Store
//!
//! Positional read/write of single blocks in the backing file.
//!
//! No caching: every call seeks and touches the file directly. Seek/read
//! pairs take `&mut self`, so two in-flight operations on one store can
//! never interleave.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{ArchiveError, Result};

use super::{Block, BLOCK_SIZE};

/// Owns the backing file of an archive
pub struct BlockStore {
    file: File,
}

impl BlockStore {
    /// Wrap an already opened read/write file handle
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// Read and decode the block at `index`
    pub fn read_block(&mut self, index: usize) -> Result<Block> {
        let offset = Self::offset(index);
        self.file.seek(SeekFrom::Start(offset)).map_err(|e| {
            ArchiveError::FileReadError(format!("seek to block {} failed: {}", index, e))
        })?;

        let mut bytes = [0u8; BLOCK_SIZE];
        self.file.read_exact(&mut bytes).map_err(|e| {
            ArchiveError::FileReadError(format!("read of block {} failed: {}", index, e))
        })?;

        Block::decode(&bytes)
    }

    /// Encode and write `block` at `index`
    ///
    /// Writing past the current end of file extends it.
    pub fn write_block(&mut self, index: usize, block: &Block) -> Result<()> {
        let offset = Self::offset(index);
        self.file.seek(SeekFrom::Start(offset)).map_err(|e| {
            ArchiveError::FileWriteError(format!("seek to block {} failed: {}", index, e))
        })?;

        self.file.write_all(&block.encode()).map_err(|e| {
            ArchiveError::FileWriteError(format!("write of block {} failed: {}", index, e))
        })?;

        Ok(())
    }

    /// Number of whole blocks in the backing file
    ///
    /// A length that is not a multiple of [`BLOCK_SIZE`] means the file is
    /// not an archive (or was cut short).
    pub fn block_count(&self) -> Result<usize> {
        let len = self.file.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(ArchiveError::BadBlock(format!(
                "archive length {} is not a multiple of {}",
                len, BLOCK_SIZE
            )));
        }
        Ok((len / BLOCK_SIZE as u64) as usize)
    }

    /// Cut the file down to exactly `count` blocks
    pub fn truncate(&mut self, count: usize) -> Result<()> {
        self.file.set_len(Self::offset(count))?;
        Ok(())
    }

    /// Flush file contents to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }

    fn offset(index: usize) -> u64 {
        index as u64 * BLOCK_SIZE as u64
    }
}
