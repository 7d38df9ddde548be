//! Block Manager
//!
//! Owns the free/used map and the file index.
//!
//! ## Responsibilities
//! - First-fit allocation of free blocks, growing only for the shortfall
//! - Track file name → ordered block indices
//! - Rebuild both structures from the blocks of an existing archive
//!
//! Both structures are plain in-memory scans (a status vector and a
//! `BTreeMap`). That is fine for one user and one archive at a time; it does
//! not scale to very large block counts.

use std::collections::{BTreeMap, HashMap};

use crate::error::{ArchiveError, Result};

use super::{Block, BlockMode};

/// Allocation policy and file index for one archive
#[derive(Debug, Clone, Default)]
pub struct BlockManager {
    /// One entry per block index in the backing file
    status: Vec<BlockMode>,

    /// File name → block indices, position i holds sequence index i
    files: BTreeMap<String, Vec<usize>>,
}

/// Outcome of rebuilding a manager from on-disk blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildResult {
    /// Files whose blocks formed a complete sequence
    pub files_recovered: usize,

    /// In-use blocks that belong to no complete file; treated as free
    pub blocks_orphaned: usize,
}

/// In-use blocks sharing one (name, created_at) pairing
struct PendingFile {
    sequence_count: u32,
    file_size: u32,
    consistent: bool,
    members: Vec<(u32, usize)>,
}

impl BlockManager {
    /// A manager for `total_blocks` blocks, all free
    pub fn new(total_blocks: usize) -> Self {
        Self {
            status: vec![BlockMode::Free; total_blocks],
            files: BTreeMap::new(),
        }
    }

    /// Rebuild from every block of an existing archive
    ///
    /// Blocks are grouped by name and creation time. A group becomes a file
    /// entry only if its sequence indices cover `[0, sequence_count)` exactly.
    /// When two complete groups share a name, the newest one wins. Everything
    /// else is left free so the space gets reused.
    pub fn rebuild(
        total_blocks: usize,
        blocks: impl IntoIterator<Item = (usize, Block)>,
    ) -> Result<(Self, RebuildResult)> {
        let mut manager = Self::new(total_blocks);
        let mut pending: HashMap<(String, u32), PendingFile> = HashMap::new();
        let mut in_use = 0usize;

        for (index, block) in blocks {
            manager.check_index(index)?;
            if block.is_free() {
                continue;
            }
            in_use += 1;

            let group = pending
                .entry((block.file_name.clone(), block.created_at))
                .or_insert_with(|| PendingFile {
                    sequence_count: block.sequence_count,
                    file_size: block.file_size,
                    consistent: true,
                    members: Vec::new(),
                });

            if group.sequence_count != block.sequence_count || group.file_size != block.file_size {
                group.consistent = false;
            }
            group.members.push((block.sequence_index, index));
        }

        // name → (created_at, indices) of the newest complete group
        let mut chosen: BTreeMap<String, (u32, Vec<usize>)> = BTreeMap::new();

        for ((name, created_at), mut group) in pending {
            group.members.sort_unstable();
            let complete = group.consistent
                && group.members.len() == group.sequence_count as usize
                && group
                    .members
                    .iter()
                    .enumerate()
                    .all(|(position, &(seq, _))| seq as usize == position);

            if !complete {
                tracing::warn!(
                    file = %name,
                    blocks = group.members.len(),
                    expected = group.sequence_count,
                    "Skipping incomplete block sequence"
                );
                continue;
            }

            let indices: Vec<usize> = group.members.into_iter().map(|(_, idx)| idx).collect();
            match chosen.get(&name) {
                Some((existing, _)) if *existing >= created_at => {
                    tracing::warn!(file = %name, created_at, "Skipping older duplicate of file");
                }
                _ => {
                    chosen.insert(name, (created_at, indices));
                }
            }
        }

        for (name, (_, indices)) in chosen {
            manager.add_file_entry(&name, indices)?;
        }

        let result = RebuildResult {
            files_recovered: manager.file_count(),
            blocks_orphaned: in_use - (total_blocks - manager.free_count()),
        };
        Ok((manager, result))
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Up to `count` free indices, lowest first
    ///
    /// Returns fewer than `count` when the map runs out; the caller extends
    /// the archive for the rest (see [`BlockManager::grow`]).
    pub fn find_free_blocks(&self, count: usize) -> Vec<usize> {
        self.status
            .iter()
            .enumerate()
            .filter(|(_, mode)| **mode == BlockMode::Free)
            .map(|(index, _)| index)
            .take(count)
            .collect()
    }

    /// Append `count` new indices past the end, already marked in-use
    pub fn grow(&mut self, count: usize) -> Vec<usize> {
        let start = self.status.len();
        self.status.resize(start + count, BlockMode::InUse);
        (start..start + count).collect()
    }

    /// Reserve `count` blocks: free ones first, new ones for the shortfall
    ///
    /// Every returned index is marked in-use before this returns, so a later
    /// allocation can never hand out the same index.
    pub fn allocate(&mut self, count: usize) -> Vec<usize> {
        let mut indices = self.find_free_blocks(count);
        for &index in &indices {
            self.status[index] = BlockMode::InUse;
        }

        let shortfall = count - indices.len();
        if shortfall > 0 {
            indices.extend(self.grow(shortfall));
        }
        indices
    }

    /// Give back indices from [`BlockManager::allocate`] that never got indexed
    pub fn release(&mut self, indices: &[usize]) -> Result<()> {
        self.mark_free(indices)
    }

    /// Drop every index at or past `total_blocks` (undoes a [`BlockManager::grow`])
    ///
    /// Fails with `BadBlockIndex` if a dropped index is still owned by a file.
    pub fn shrink_to(&mut self, total_blocks: usize) -> Result<()> {
        if total_blocks >= self.status.len() {
            return Ok(());
        }
        if let Some(index) = self
            .files
            .values()
            .flatten()
            .copied()
            .find(|&index| index >= total_blocks)
        {
            return Err(ArchiveError::BadBlockIndex {
                index,
                total: total_blocks,
            });
        }
        self.status.truncate(total_blocks);
        Ok(())
    }

    pub fn mark_used(&mut self, indices: &[usize]) -> Result<()> {
        self.set_mode(indices, BlockMode::InUse)
    }

    pub fn mark_free(&mut self, indices: &[usize]) -> Result<()> {
        self.set_mode(indices, BlockMode::Free)
    }

    fn set_mode(&mut self, indices: &[usize], mode: BlockMode) -> Result<()> {
        // Validate everything first so a bad index leaves the map untouched
        for &index in indices {
            self.check_index(index)?;
        }
        for &index in indices {
            self.status[index] = mode;
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.status.len() {
            return Err(ArchiveError::BadBlockIndex {
                index,
                total: self.status.len(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // File Index
    // =========================================================================

    /// Record `name` → `indices` and mark them in-use
    pub fn add_file_entry(&mut self, name: &str, indices: Vec<usize>) -> Result<()> {
        if self.files.contains_key(name) {
            return Err(ArchiveError::FileExists(name.to_string()));
        }
        self.mark_used(&indices)?;
        self.files.insert(name.to_string(), indices);
        Ok(())
    }

    /// Drop the entry for `name`, freeing its blocks. Returns the freed indices.
    pub fn remove_file_entry(&mut self, name: &str) -> Result<Vec<usize>> {
        let indices = self
            .files
            .remove(name)
            .ok_or_else(|| ArchiveError::FileNotFound(name.to_string()))?;
        self.mark_free(&indices)?;
        Ok(indices)
    }

    /// Ordered block indices of `name`
    pub fn find_file_entry(&self, name: &str) -> Result<&[usize]> {
        self.files
            .get(name)
            .map(|indices| indices.as_slice())
            .ok_or_else(|| ArchiveError::FileNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Name of the file owning `index`, by reverse scan of the index
    pub fn owner_of(&self, index: usize) -> Option<&str> {
        self.files
            .iter()
            .find(|(_, indices)| indices.contains(&index))
            .map(|(name, _)| name.as_str())
    }

    /// File entries in name order
    pub fn files(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.files
            .iter()
            .map(|(name, indices)| (name.as_str(), indices.as_slice()))
    }

    /// Swap in a freshly laid out state (after compaction)
    ///
    /// The map is sized to `total_blocks` and fully in-use.
    pub fn replace(&mut self, total_blocks: usize, files: BTreeMap<String, Vec<usize>>) {
        self.status = vec![BlockMode::InUse; total_blocks];
        self.files = files;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current capacity of the free/used map
    pub fn total_blocks(&self) -> usize {
        self.status.len()
    }

    pub fn free_count(&self) -> usize {
        self.status.iter().filter(|m| **m == BlockMode::Free).count()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Status of `index`, or `None` past the end of the map
    pub fn mode_of(&self, index: usize) -> Option<BlockMode> {
        self.status.get(index).copied()
    }
}
