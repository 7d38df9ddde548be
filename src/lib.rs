//! # blockarc
//!
//! A single-file archive that stores many named files in fixed 1 KiB blocks:
//! - First-fit block allocation that refills holes before growing
//! - Files spread over non-contiguous blocks, recovered in order
//! - Compaction that rewrites the container without free blocks
//! - Observer notifications after every operation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Archive                              │
//! │     add / extract / remove / list / debug_dump / compact     │
//! └──────┬──────────────────────┬──────────────────────┬────────┘
//!        │                      │                      │
//!        ▼                      ▼                      ▼
//!  ┌─────────────┐       ┌─────────────┐        ┌─────────────┐
//!  │   Chunker   │       │BlockManager │        │  Observers  │
//!  │ split/join  │       │ map + index │        │  (notify)   │
//!  └──────┬──────┘       └─────────────┘        └─────────────┘
//!         │
//!         ▼
//!  ┌─────────────┐       ┌─────────────┐
//!  │ Block codec │──────▶│ BlockStore  │──────▶  name.arc
//!  └─────────────┘       └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use blockarc::Archive;
//!
//! let mut archive = Archive::create_path("photos")?;
//! archive.add("holiday.jpg")?;
//! archive.extract("holiday.jpg", "/tmp/holiday.jpg")?;
//! archive.close()?;
//! # Ok::<(), blockarc::ArchiveError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod block;
pub mod chunker;
pub mod transform;
pub mod observer;
pub mod listing;
pub mod archive;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use archive::{AccessMode, Archive};
pub use config::{Config, SyncStrategy};
pub use error::{ArchiveError, Result};
pub use listing::{BlockStatus, DumpRow, ListEntry};
pub use observer::{ArchiveAction, ArchiveEvent, ArchiveObserver, ChannelObserver, EventLog, TracingObserver};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of blockarc
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
