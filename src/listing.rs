//! Listing and dump rows
//!
//! Structured rows produced by `list` and `debug_dump`, with the text
//! rendering used when they are written to an output stream.

use std::fmt;

use chrono::DateTime;

/// Timestamp format used for listings (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One file in an archive listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// 1-based position in the listing
    pub ordinal: usize,
    pub name: String,
    /// Original size in bytes
    pub size: u64,
    /// Unix seconds
    pub created_at: u32,
}

impl ListEntry {
    pub fn created_at_display(&self) -> String {
        format_timestamp(self.created_at)
    }
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4}. {:<40} {:>12} {}",
            self.ordinal,
            self.name,
            self.size,
            self.created_at_display()
        )
    }
}

/// Allocation state of one block as reported by a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    Free,
    InUse,
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockStatus::Free => f.pad("free"),
            BlockStatus::InUse => f.pad("in-use"),
        }
    }
}

/// One block in an integrity dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRow {
    pub index: usize,
    pub status: BlockStatus,
    /// Owning file, for in-use blocks
    pub owner: Option<String>,
    /// CRC32 of the stored payload, for in-use blocks
    pub checksum: Option<u32>,
}

impl fmt::Display for DumpRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}  {:<6}", self.index, self.status)?;
        if let Some(owner) = &self.owner {
            write!(f, "  {}", owner)?;
        }
        if let Some(crc) = self.checksum {
            write!(f, "  crc32={:08x}", crc)?;
        }
        Ok(())
    }
}

/// Render unix seconds as a UTC timestamp
pub fn format_timestamp(secs: u32) -> String {
    match DateTime::from_timestamp(i64::from(secs), 0) {
        Some(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        None => secs.to_string(),
    }
}
