//! Block Module
//!
//! Fixed-size block format, positional block I/O and the allocation map.
//!
//! ## Responsibilities
//! - Encode/decode 1 KiB blocks (header + payload)
//! - Read/write a block at an index of the backing file
//! - Track free/used blocks and the file name → block sequence index
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Block 0 (1024 bytes)                                     │
//! │ ┌──────────────────────────────┬───────────────────────┐ │
//! │ │ Header (100)                 │ Payload (924)         │ │
//! │ └──────────────────────────────┴───────────────────────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Block 1 (1024 bytes)                                     │
//! ├──────────────────────────────────────────────────────────┤
//! │ ... no file header, no footer ...                        │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod codec;
mod manager;
mod store;

pub use codec::{Block, BlockMode, BlockType, MAX_NAME_LEN, NAME_CAPACITY};
pub(crate) use codec::validate_name;
pub use manager::{BlockManager, RebuildResult};
pub use store::BlockStore;

// =============================================================================
// Shared Constants (used by codec, store, chunker)
// =============================================================================

/// Total on-disk size of one block
pub const BLOCK_SIZE: usize = 1024;

/// Bytes reserved for the block header
pub const HEADER_SIZE: usize = 100;

/// Maximum data bytes carried by one block
pub const PAYLOAD_SIZE: usize = BLOCK_SIZE - HEADER_SIZE;
