//! Internal list storage.
//!
//! A collection view keeps its own ordered copy of the source items. Two
//! backends are available, selected through [`StorageHint`]:
//! - [`VecStore`]: contiguous vector, O(1) access, O(N) insert/delete
//! - [`BlockStore`]: sqrt decomposition, O(log √N) access, O(√N) insert/delete

use crate::error::{Result, ViewError};
use crate::value::ItemRef;
use serde::Deserialize;

/// Ordered item storage used as a view's internal list.
pub trait ItemStore: std::fmt::Debug {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Option<&ItemRef>;

    /// Inserts at `index`, shifting subsequent items. `index == len` appends.
    fn insert(&mut self, index: usize, item: ItemRef) -> Result<()>;

    fn remove(&mut self, index: usize) -> Result<ItemRef>;

    fn iter(&self) -> Box<dyn Iterator<Item = &ItemRef> + '_>;

    /// Replaces the whole content.
    fn replace_all(&mut self, items: Vec<ItemRef>);

    /// Position of the item by identity.
    fn index_of(&self, item: &ItemRef) -> Option<usize> {
        self.iter().position(|i| i == item)
    }

    fn to_vec(&self) -> Vec<ItemRef> {
        self.iter().cloned().collect()
    }
}

/// Storage strategy for a view's internal list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageHint {
    /// Optimized for read-heavy views that are rarely patched (default).
    ///
    /// - O(1) random access
    /// - O(N) insert/delete in the middle
    #[default]
    FastReads,

    /// Optimized for large views with frequent sorted inserts and removals.
    ///
    /// - O(log √N) random access
    /// - O(√N) insert/delete anywhere
    FastUpdates,
}

impl StorageHint {
    /// Parse a storage hint from a string.
    ///
    /// Accepts: "fast_reads", "fast_updates"
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fast_reads" | "fastreads" => Ok(StorageHint::FastReads),
            "fast_updates" | "fastupdates" => Ok(StorageHint::FastUpdates),
            _ => Err(ViewError::UnknownStorageHint(s.to_string())),
        }
    }

    pub(crate) fn create_store(&self) -> Box<dyn ItemStore> {
        match self {
            StorageHint::FastReads => Box::new(VecStore::new()),
            StorageHint::FastUpdates => Box::new(BlockStore::new()),
        }
    }
}

/// Construction options for a collection view.
///
/// # Examples
///
/// ```
/// use livegroup::{StorageHint, ViewOptions};
///
/// let options = ViewOptions::from_json(r#"{ "storage": "fast_updates" }"#).unwrap();
/// assert_eq!(options.storage, StorageHint::FastUpdates);
///
/// let defaults = ViewOptions::from_json("{}").unwrap();
/// assert_eq!(defaults.storage, StorageHint::FastReads);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub storage: StorageHint,
}

impl ViewOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_storage(storage: StorageHint) -> Self {
        ViewOptions { storage }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VecStore {
    data: Vec<ItemRef>,
}

impl VecStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemStore for VecStore {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: usize) -> Option<&ItemRef> {
        self.data.get(index)
    }

    fn insert(&mut self, index: usize, item: ItemRef) -> Result<()> {
        if index > self.data.len() {
            return Err(ViewError::IndexOutOfRange {
                index,
                len: self.data.len(),
            });
        }
        self.data.insert(index, item);
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<ItemRef> {
        if index >= self.data.len() {
            return Err(ViewError::IndexOutOfRange {
                index,
                len: self.data.len(),
            });
        }
        Ok(self.data.remove(index))
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &ItemRef> + '_> {
        Box::new(self.data.iter())
    }

    fn replace_all(&mut self, items: Vec<ItemRef>) {
        self.data = items;
    }
}

/// Blocked storage using sqrt decomposition.
///
/// `block_starts[i]` is the global index where block `i` begins, so locating
/// an index is a binary search over block boundaries. Blocks are split when
/// they grow past twice the ideal size and dropped when they become empty.
#[derive(Debug, Clone, Default)]
pub struct BlockStore {
    blocks: Vec<Vec<ItemRef>>,
    block_starts: Vec<usize>,
    size: usize,
}

impl BlockStore {
    const MIN_BLOCK_SIZE: usize = 16;
    const MAX_BLOCK_SIZE: usize = 4096;

    pub fn new() -> Self {
        Self::default()
    }

    fn ideal_block_size(&self) -> usize {
        let sqrt = (self.size as f64).sqrt() as usize;
        sqrt.clamp(Self::MIN_BLOCK_SIZE, Self::MAX_BLOCK_SIZE)
    }

    /// Returns (block_index, offset_within_block) for an existing index.
    fn find_block(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.size {
            return None;
        }
        let block = match self.block_starts.binary_search(&index) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        Some((block, index - self.block_starts[block]))
    }

    fn shift_starts_after(&mut self, block: usize, delta: isize) {
        for start in self.block_starts.iter_mut().skip(block + 1) {
            *start = (*start as isize + delta) as usize;
        }
    }

    fn maybe_split(&mut self, block: usize) {
        if self.blocks[block].len() <= 2 * self.ideal_block_size() {
            return;
        }
        let mid = self.blocks[block].len() / 2;
        let tail = self.blocks[block].split_off(mid);
        let tail_start = self.block_starts[block] + mid;
        self.blocks.insert(block + 1, tail);
        self.block_starts.insert(block + 1, tail_start);
    }
}

impl ItemStore for BlockStore {
    fn len(&self) -> usize {
        self.size
    }

    fn get(&self, index: usize) -> Option<&ItemRef> {
        self.find_block(index)
            .map(|(block, offset)| &self.blocks[block][offset])
    }

    fn insert(&mut self, index: usize, item: ItemRef) -> Result<()> {
        if index > self.size {
            return Err(ViewError::IndexOutOfRange {
                index,
                len: self.size,
            });
        }

        let (block, offset) = if self.blocks.is_empty() {
            self.blocks.push(Vec::new());
            self.block_starts.push(0);
            (0, 0)
        } else if index == self.size {
            let last = self.blocks.len() - 1;
            (last, self.blocks[last].len())
        } else {
            // index < size, so find_block succeeds
            self.find_block(index).unwrap_or((0, 0))
        };

        self.blocks[block].insert(offset, item);
        self.size += 1;
        self.shift_starts_after(block, 1);
        self.maybe_split(block);
        Ok(())
    }

    fn remove(&mut self, index: usize) -> Result<ItemRef> {
        let (block, offset) = self.find_block(index).ok_or(ViewError::IndexOutOfRange {
            index,
            len: self.size,
        })?;

        let item = self.blocks[block].remove(offset);
        self.size -= 1;
        self.shift_starts_after(block, -1);

        if self.blocks[block].is_empty() {
            self.blocks.remove(block);
            self.block_starts.remove(block);
        }
        Ok(item)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &ItemRef> + '_> {
        Box::new(self.blocks.iter().flat_map(|b| b.iter()))
    }

    fn replace_all(&mut self, items: Vec<ItemRef>) {
        self.blocks.clear();
        self.block_starts.clear();
        self.size = items.len();
        if items.is_empty() {
            return;
        }

        let block_size = self.ideal_block_size();
        let mut start = 0;
        let mut rest = items.into_iter().peekable();
        while rest.peek().is_some() {
            let block: Vec<ItemRef> = rest.by_ref().take(block_size).collect();
            self.block_starts.push(start);
            start += block.len();
            self.blocks.push(block);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<ItemRef> {
        (0..n).map(|i| ItemRef::value(i as i64)).collect()
    }

    fn check_store(store: &mut dyn ItemStore) {
        let all = items(200);
        for (i, item) in all.iter().enumerate() {
            store.insert(i, item.clone()).unwrap();
        }
        assert_eq!(store.len(), 200);

        // insert in the middle and at the front
        let middle = ItemRef::value("middle");
        let front = ItemRef::value("front");
        store.insert(100, middle.clone()).unwrap();
        store.insert(0, front.clone()).unwrap();
        assert_eq!(store.get(0), Some(&front));
        assert_eq!(store.get(101), Some(&middle));
        assert_eq!(store.index_of(&middle), Some(101));
        assert_eq!(store.get(202), None);

        assert_eq!(store.remove(101).unwrap(), middle);
        assert_eq!(store.remove(0).unwrap(), front);
        assert_eq!(store.to_vec(), all);

        for _ in 0..200 {
            store.remove(0).unwrap();
        }
        assert!(store.is_empty());
        assert!(store.remove(0).is_err());
        assert!(store.insert(1, ItemRef::value(1)).is_err());
    }

    #[test]
    fn test_vec_store() {
        check_store(&mut VecStore::new());
    }

    #[test]
    fn test_block_store() {
        check_store(&mut BlockStore::new());
    }

    #[test]
    fn test_block_store_replace_all() {
        let mut store = BlockStore::new();
        let all = items(1000);
        store.replace_all(all.clone());
        assert_eq!(store.len(), 1000);
        assert_eq!(store.get(999), Some(&all[999]));
        assert_eq!(store.get(517), Some(&all[517]));
        assert_eq!(store.to_vec(), all);
    }

    #[test]
    fn test_storage_hint_from_str() {
        assert_eq!(StorageHint::from_str("fast_reads").unwrap(), StorageHint::FastReads);
        assert_eq!(StorageHint::from_str("FastUpdates").unwrap(), StorageHint::FastUpdates);
        assert!(matches!(
            StorageHint::from_str("tiered"),
            Err(ViewError::UnknownStorageHint(_))
        ));
    }

    #[test]
    fn test_options_from_json() {
        let options = ViewOptions::from_json(r#"{"storage":"fast_updates"}"#).unwrap();
        assert_eq!(options.storage, StorageHint::FastUpdates);
        assert!(matches!(
            ViewOptions::from_json(r#"{"storage":"nope"}"#),
            Err(ViewError::Config(_))
        ));
    }
}
