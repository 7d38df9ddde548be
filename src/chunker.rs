//! Chunker
//!
//! Splits a source buffer into payload-sized pieces for writing, and
//! reassembles the original bytes from an ordered run of blocks.

use std::io::Write;

use bytes::Bytes;

use crate::block::{Block, PAYLOAD_SIZE};
use crate::error::{ArchiveError, Result};

/// Blocks needed to store `len` bytes. An empty file still takes one block.
pub fn blocks_needed(len: usize) -> usize {
    len.div_ceil(PAYLOAD_SIZE).max(1)
}

/// Write-side splitter over an in-memory source
///
/// Cloning a `Bytes` is a refcount bump, so `chunks()` can be called any
/// number of times.
#[derive(Debug, Clone)]
pub struct Chunker {
    source: Bytes,
}

impl Chunker {
    pub fn new(source: impl Into<Bytes>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Length of the source in bytes
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Number of chunks `chunks()` will yield
    pub fn block_count(&self) -> usize {
        blocks_needed(self.source.len())
    }

    /// Lazy sequence of ≤ [`PAYLOAD_SIZE`] slices in source order
    pub fn chunks(&self) -> Chunks {
        Chunks {
            source: self.source.clone(),
            position: 0,
            remaining: self.block_count(),
        }
    }
}

/// Iterator returned by [`Chunker::chunks`]
pub struct Chunks {
    source: Bytes,
    position: usize,
    remaining: usize,
}

impl Iterator for Chunks {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let end = (self.position + PAYLOAD_SIZE).min(self.source.len());
        let chunk = self.source.slice(self.position..end);
        self.position = end;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Chunks {}

/// Read-side reassembly of one file
///
/// Each pushed block contributes `min(PAYLOAD_SIZE, remaining)` bytes, so
/// the zero padding of the last block never reaches the output.
#[derive(Debug)]
pub struct Assembler {
    remaining: usize,
    written: usize,
}

impl Assembler {
    pub fn new(file_size: usize) -> Self {
        Self {
            remaining: file_size,
            written: 0,
        }
    }

    /// Append the useful part of `payload` to `out`
    pub fn push_payload<W: Write>(&mut self, payload: &[u8], out: &mut W) -> Result<usize> {
        let take = PAYLOAD_SIZE.min(self.remaining).min(payload.len());
        out.write_all(&payload[..take])
            .map_err(|e| ArchiveError::FileWriteError(format!("output write failed: {}", e)))?;

        self.remaining -= take;
        self.written += take;
        Ok(take)
    }

    /// Append the useful part of `block`'s payload to `out`
    pub fn push<W: Write>(&mut self, block: &Block, out: &mut W) -> Result<usize> {
        self.push_payload(block.payload(), out)
    }

    /// Bytes still expected
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    pub fn written(&self) -> usize {
        self.written
    }
}
