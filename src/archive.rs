//! Archive Module
//!
//! The archive handle that coordinates all components.
//!
//! ## Responsibilities
//! - Create or open the container file
//! - add / extract / remove / list / debug_dump / compact
//! - Notify observers after every operation
//!
//! ## Limitations
//! - No write-ahead log: an interrupted `compact` leaves the container
//!   inconsistent, and an interrupted `add` may leave stale blocks on disk
//!   (they are never indexed and are reclaimed on reopen or compaction)
//! - One handle per container; no locking against other processes

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;

use crate::block::{validate_name, Block, BlockManager, BlockMode, BlockStore, PAYLOAD_SIZE};
use crate::chunker::{Assembler, Chunker};
use crate::config::{Config, SyncStrategy};
use crate::error::{ArchiveError, Result};
use crate::listing::{BlockStatus, DumpRow, ListEntry};
use crate::observer::{ArchiveAction, ArchiveObserver};
use crate::transform::{PayloadTransform, TransformChain};

/// Whether the handle created a fresh container or attached to one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    AsNew,
    AsExisting,
}

/// An open archive container
///
/// ## Ownership
/// - The backing file and the block manager belong to this handle alone
/// - Observers are shared (`Arc`); the archive only calls them
/// - Mutating operations take `&mut self`, so seek/read pairs on the
///   backing file can never interleave
///
/// The file is synced and closed when the handle is dropped or closed.
pub struct Archive {
    /// Archive configuration
    config: Config,

    /// Container path, `.arc` suffix applied
    path: PathBuf,

    /// New vs. existing container
    mode: AccessMode,

    /// Positional block I/O on the backing file
    store: BlockStore,

    /// Free/used map and file index
    manager: BlockManager,

    /// Notified after every operation
    observers: Vec<Arc<dyn ArchiveObserver>>,

    /// Applied to each chunk around storage
    transforms: TransformChain,

    /// Set by `close()` so drop does not sync twice
    closed: bool,
}

impl Archive {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create a new, empty container (truncates an existing file)
    pub fn create(config: Config) -> Result<Self> {
        let path = config.archive_path();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| ArchiveError::FileOpenError {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), "Created archive");

        Ok(Self::from_parts(
            config,
            path,
            AccessMode::AsNew,
            BlockStore::new(file),
            BlockManager::new(0),
        ))
    }

    /// Open an existing container
    ///
    /// On open:
    /// 1. Check the container exists
    /// 2. Read every block header
    /// 3. Rebuild the free/used map and file index from them
    pub fn open(config: Config) -> Result<Self> {
        let path = config.archive_path();
        if !path.exists() {
            return Err(ArchiveError::FileNotFound(path.display().to_string()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| ArchiveError::FileOpenError {
                path: path.clone(),
                source,
            })?;

        let mut store = BlockStore::new(file);
        let total = store.block_count()?;

        let mut blocks = Vec::with_capacity(total);
        for index in 0..total {
            blocks.push((index, store.read_block(index)?));
        }

        let (manager, result) = BlockManager::rebuild(total, blocks)?;

        tracing::info!(
            path = %path.display(),
            blocks = total,
            files = result.files_recovered,
            orphaned = result.blocks_orphaned,
            "Opened archive"
        );

        Ok(Self::from_parts(
            config,
            path,
            AccessMode::AsExisting,
            store,
            manager,
        ))
    }

    /// Create with a path (convenience method)
    pub fn create_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::create(Config::for_path(path))
    }

    /// Open with a path (convenience method)
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(Config::for_path(path))
    }

    fn from_parts(
        config: Config,
        path: PathBuf,
        mode: AccessMode,
        store: BlockStore,
        manager: BlockManager,
    ) -> Self {
        Self {
            config,
            path,
            mode,
            store,
            manager,
            observers: Vec::new(),
            transforms: TransformChain::new(),
            closed: false,
        }
    }

    /// Sync and close the container
    pub fn close(mut self) -> Result<()> {
        self.store.sync()?;
        self.closed = true;
        Ok(())
    }

    /// Register an observer
    pub fn add_observer(&mut self, observer: Arc<dyn ArchiveObserver>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    /// Append a payload transform stage
    ///
    /// Stages encode in the order they were added and decode in reverse. The
    /// chain as a whole must be length-preserving.
    pub fn add_transform(&mut self, stage: Arc<dyn PayloadTransform>) -> &mut Self {
        self.transforms.push(stage);
        self
    }

    /// Drop every transform stage; payloads are stored unchanged again
    pub fn clear_transforms(&mut self) -> &mut Self {
        self.transforms.clear();
        self
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Add the file at `source`, stored under its final path component
    pub fn add(&mut self, source: impl AsRef<Path>) -> Result<()> {
        let source = source.as_ref();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = self.add_file(source, &name);
        self.notify(ArchiveAction::Added, &name, result.is_ok());
        result
    }

    /// Add an in-memory buffer under `name`
    pub fn add_bytes(&mut self, name: &str, data: impl Into<Bytes>) -> Result<()> {
        let result = self.store_bytes(name, data.into());
        self.notify(ArchiveAction::Added, name, result.is_ok());
        result
    }

    /// Extract `name` to the file at `destination`
    pub fn extract(&mut self, name: &str, destination: impl AsRef<Path>) -> Result<()> {
        let result = self.extract_file(name, destination.as_ref());
        self.notify(ArchiveAction::Extracted, name, result.is_ok());
        result
    }

    /// Extract `name` into memory
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let result = self.read_into(name, &mut out).map(|_| out);
        self.notify(ArchiveAction::Extracted, name, result.is_ok());
        result
    }

    /// Remove `name`, freeing its blocks
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let result = self.remove_file(name);
        self.notify(ArchiveAction::Removed, name, result.is_ok());
        result
    }

    /// Write one line per file to `out`; returns the number of files
    pub fn list<W: Write>(&mut self, out: &mut W) -> Result<usize> {
        let result = self.entries().and_then(|entries| {
            for entry in &entries {
                writeln!(out, "{}", entry).map_err(output_error)?;
            }
            Ok(entries.len())
        });
        self.notify(ArchiveAction::Listed, "", result.is_ok());
        result
    }

    /// Write one line per block to `out`; returns the total block count
    pub fn debug_dump<W: Write>(&mut self, out: &mut W) -> Result<usize> {
        let result = self.dump_rows().and_then(|rows| {
            for row in &rows {
                writeln!(out, "{}", row).map_err(output_error)?;
            }
            Ok(rows.len())
        });
        self.notify(ArchiveAction::Dumped, "", result.is_ok());
        result
    }

    /// Rewrite the container with no free blocks; returns the new block count
    pub fn compact(&mut self) -> Result<usize> {
        let result = self.compact_blocks();
        self.notify(ArchiveAction::Compacted, "", result.is_ok());
        result
    }

    /// Listing rows, one per file in name order
    ///
    /// Only the first block of each file is read.
    pub fn entries(&mut self) -> Result<Vec<ListEntry>> {
        let mut entries = Vec::with_capacity(self.manager.file_count());

        for (position, (name, indices)) in self.manager.files().enumerate() {
            let first = *indices
                .first()
                .ok_or_else(|| ArchiveError::BadBlock(format!("{} has no blocks", name)))?;
            let block = self.store.read_block(first)?;

            entries.push(ListEntry {
                ordinal: position + 1,
                name: name.to_string(),
                size: u64::from(block.file_size),
                created_at: block.created_at,
            });
        }

        Ok(entries)
    }

    /// Dump rows, one per block index
    pub fn dump_rows(&mut self) -> Result<Vec<DumpRow>> {
        let total = self.manager.total_blocks();
        let mut rows = Vec::with_capacity(total);

        for index in 0..total {
            let row = match self.manager.mode_of(index) {
                Some(BlockMode::InUse) => {
                    let owner = self.manager.owner_of(index).map(str::to_string);
                    let checksum = match owner {
                        Some(_) => {
                            let block = self.store.read_block(index)?;
                            Some(crc32fast::hash(block.payload()))
                        }
                        None => None,
                    };
                    DumpRow {
                        index,
                        status: BlockStatus::InUse,
                        owner,
                        checksum,
                    }
                }
                _ => DumpRow {
                    index,
                    status: BlockStatus::Free,
                    owner: None,
                    checksum: None,
                },
            };
            rows.push(row);
        }

        Ok(rows)
    }

    // =========================================================================
    // Internal Operation Bodies
    // =========================================================================

    fn add_file(&mut self, source: &Path, name: &str) -> Result<()> {
        validate_name(name)?;
        if self.manager.contains(name) {
            return Err(ArchiveError::FileExists(name.to_string()));
        }

        let mut file = File::open(source).map_err(|e| ArchiveError::FileOpenError {
            path: source.to_path_buf(),
            source: e,
        })?;

        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| {
            ArchiveError::FileReadError(format!("{}: {}", source.display(), e))
        })?;

        self.store_bytes(name, Bytes::from(data))
    }

    /// Steps:
    /// 1. Reject duplicates before touching any state
    /// 2. Allocate free blocks, growing for the shortfall
    /// 3. Write one block per chunk, then sync per the sync strategy
    /// 4. Index the file only once every block is written and synced
    ///
    /// If step 3 fails the allocation is undone on disk and in the map.
    fn store_bytes(&mut self, name: &str, data: Bytes) -> Result<()> {
        validate_name(name)?;
        if self.manager.contains(name) {
            return Err(ArchiveError::FileExists(name.to_string()));
        }

        let file_size = u32::try_from(data.len()).map_err(|_| ArchiveError::FileTooLarge {
            name: name.to_string(),
            size: data.len() as u64,
            max: u64::from(u32::MAX),
        })?;

        let chunker = Chunker::new(data);
        let count = chunker.block_count();
        let previous_total = self.manager.total_blocks();
        let indices = self.manager.allocate(count);
        let created_at = unix_now();

        let written = self
            .write_chunks(name, &chunker, &indices, file_size, created_at)
            .and_then(|()| self.sync_after_write());
        if let Err(e) = written {
            if let Err(undo) = self.roll_back_allocation(&indices, previous_total) {
                tracing::warn!(file = name, error = %undo, "Failed to roll back allocation");
            }
            return Err(e);
        }

        self.manager.add_file_entry(name, indices)?;

        tracing::debug!(file = name, size = file_size, blocks = count, "Added file");
        Ok(())
    }

    fn write_chunks(
        &mut self,
        name: &str,
        chunker: &Chunker,
        indices: &[usize],
        file_size: u32,
        created_at: u32,
    ) -> Result<()> {
        let sequence_count = indices.len() as u32;

        for ((position, chunk), &index) in chunker.chunks().enumerate().zip(indices) {
            let raw_len = chunk.len();
            let payload = self.transforms.encode(chunk);
            if payload.len() != raw_len {
                return Err(ArchiveError::BadBlock(format!(
                    "transform changed chunk length from {} to {}",
                    raw_len,
                    payload.len()
                )));
            }

            let mut block =
                Block::initialize(name, position as u32, sequence_count, file_size, created_at)?;
            block.set_payload(&payload)?;
            self.store.write_block(index, &block)?;
        }

        Ok(())
    }

    /// Undo an allocation that never got indexed
    ///
    /// Reused blocks get their free headers back and grown blocks are cut off
    /// the end of the file, so no stale in-use header survives to be merged
    /// with a later file of the same name on reopen.
    fn roll_back_allocation(&mut self, indices: &[usize], previous_total: usize) -> Result<()> {
        let reused: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&index| index < previous_total)
            .collect();

        self.manager.release(&reused)?;
        self.manager.shrink_to(previous_total)?;

        let free = Block::free();
        for &index in &reused {
            self.store.write_block(index, &free)?;
        }
        self.store.truncate(previous_total)?;

        tracing::debug!(
            released = reused.len(),
            trimmed = indices.len() - reused.len(),
            "Rolled back failed allocation"
        );
        Ok(())
    }

    /// The destination is removed again if extraction fails part way
    fn extract_file(&mut self, name: &str, destination: &Path) -> Result<()> {
        // Resolve the entry before creating the destination
        self.manager.find_file_entry(name)?;

        let file = File::create(destination).map_err(|e| ArchiveError::FileOpenError {
            path: destination.to_path_buf(),
            source: e,
        })?;

        let mut out = BufWriter::new(file);
        let result = self
            .read_into(name, &mut out)
            .and_then(|written| out.flush().map(|()| written).map_err(output_error));
        drop(out);

        let written = match result {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(destination) {
                    tracing::warn!(
                        to = %destination.display(),
                        error = %cleanup,
                        "Failed to remove partial extract"
                    );
                }
                return Err(e);
            }
        };

        tracing::debug!(file = name, bytes = written, to = %destination.display(), "Extracted file");
        Ok(())
    }

    /// Stream the blocks of `name`, in recorded order, into `out`
    fn read_into<W: Write>(&mut self, name: &str, out: &mut W) -> Result<usize> {
        let indices = self.manager.find_file_entry(name)?.to_vec();
        if indices.is_empty() {
            return Err(ArchiveError::BadBlock(format!("{} has no blocks", name)));
        }

        let mut assembler: Option<Assembler> = None;

        for (position, &index) in indices.iter().enumerate() {
            let block = self.store.read_block(index).map_err(|e| match e {
                ArchiveError::BadBlock(msg) => ArchiveError::BadBlock(msg),
                other => ArchiveError::BadBlock(format!("block {} of {}: {}", index, name, other)),
            })?;

            if block.is_free() || block.file_name != name || block.sequence_index as usize != position
            {
                return Err(ArchiveError::BadBlock(format!(
                    "block {} does not hold part {} of {}",
                    index, position, name
                )));
            }

            let assembler =
                assembler.get_or_insert_with(|| Assembler::new(block.file_size as usize));

            let take = assembler.remaining().min(PAYLOAD_SIZE);
            let payload = self
                .transforms
                .decode(Bytes::copy_from_slice(&block.payload()[..take]));
            if payload.len() != take {
                return Err(ArchiveError::BadBlock(format!(
                    "transform changed payload length of block {} from {} to {}",
                    index,
                    take,
                    payload.len()
                )));
            }
            assembler.push_payload(&payload, out)?;
        }

        match assembler {
            Some(assembler) if assembler.is_complete() => Ok(assembler.written()),
            _ => Err(ArchiveError::BadBlock(format!("{} is truncated", name))),
        }
    }

    fn remove_file(&mut self, name: &str) -> Result<()> {
        let indices = self.manager.find_file_entry(name)?.to_vec();

        // Clear the headers on disk so a reopen does not bring the file back
        let free = Block::free();
        for &index in &indices {
            self.store.write_block(index, &free)?;
        }

        self.manager.remove_file_entry(name)?;
        self.sync_after_write()?;

        tracing::debug!(file = name, blocks = indices.len(), "Removed file");
        Ok(())
    }

    /// Steps:
    /// 1. Read every file's blocks in recorded order, numbering them from 0
    /// 2. Truncate the container and write the blocks back in that order
    /// 3. Replace the manager state with the new layout
    fn compact_blocks(&mut self) -> Result<usize> {
        let before = self.manager.total_blocks();
        let mut blocks = Vec::with_capacity(before);
        let mut files = BTreeMap::new();

        for (name, indices) in self.manager.files() {
            let start = blocks.len();
            for &index in indices {
                blocks.push(self.store.read_block(index)?);
            }
            files.insert(name.to_string(), (start..blocks.len()).collect::<Vec<_>>());
        }

        self.store.truncate(0)?;
        for (index, block) in blocks.iter().enumerate() {
            self.store.write_block(index, block)?;
        }

        let count = blocks.len();
        self.manager.replace(count, files);
        self.sync_after_write()?;

        tracing::info!(before, after = count, "Compacted archive");
        Ok(count)
    }

    fn notify(&self, action: ArchiveAction, name: &str, success: bool) {
        for observer in &self.observers {
            observer.notify(action, name, success);
        }
    }

    fn sync_after_write(&mut self) -> Result<()> {
        if self.config.sync_strategy == SyncStrategy::EveryOperation {
            self.store.sync()?;
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Container path, including the `.arc` suffix
    pub fn full_path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Size of the free/used map
    pub fn block_count(&self) -> usize {
        self.manager.total_blocks()
    }

    pub fn free_block_count(&self) -> usize {
        self.manager.free_count()
    }

    pub fn file_count(&self) -> usize {
        self.manager.file_count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.manager.contains(name)
    }

    /// Ordered block indices holding `name`
    pub fn file_blocks(&self, name: &str) -> Result<&[usize]> {
        self.manager.find_file_entry(name)
    }

    /// On-disk size of the container in bytes
    pub fn disk_size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.store.sync() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to sync archive on drop");
        }
    }
}

fn output_error(e: std::io::Error) -> ArchiveError {
    ArchiveError::FileWriteError(format!("output write failed: {}", e))
}

fn unix_now() -> u32 {
    u32::try_from(Utc::now().timestamp()).unwrap_or(0)
}
