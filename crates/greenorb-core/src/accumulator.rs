//! A deduplicating, bounded collection of keyed records.
//!
//! Insertion order is preserved. When the collection grows past its cap the
//! oldest entries are dropped, regardless of how recently they were read.

use std::collections::{HashSet, VecDeque};

use crate::record::{Keyed, NameKey};

/// What a merge or upsert did to the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Merge {
  /// Entries appended (or replaced, for upserts).
  pub added:   usize,
  /// Entries evicted from the front to respect the cap.
  pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct Accumulator<T> {
  items: VecDeque<T>,
  seen:  HashSet<NameKey>,
  cap:   usize,
}

impl<T: Keyed> Accumulator<T> {
  /// An empty collection holding at most `cap` entries (minimum 1).
  pub fn new(cap: usize) -> Self {
    Self { items: VecDeque::new(), seen: HashSet::new(), cap: cap.max(1) }
  }

  pub fn cap(&self) -> usize { self.cap }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  pub fn contains(&self, key: &NameKey) -> bool { self.seen.contains(key) }

  pub fn get(&self, key: &NameKey) -> Option<&T> {
    if !self.seen.contains(key) {
      return None;
    }
    self.items.iter().find(|item| item.key() == *key)
  }

  /// Oldest first.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator { self.items.iter() }

  pub fn clear(&mut self) {
    self.items.clear();
    self.seen.clear();
  }

  /// Append every candidate whose key is not already present, then trim.
  ///
  /// Duplicates inside `batch` collapse to their first occurrence, and
  /// candidates with an empty name are ignored. Merging the same batch twice
  /// leaves the collection as merging it once did.
  pub fn merge(&mut self, batch: impl IntoIterator<Item = T>) -> Merge {
    let mut added = 0;
    for item in batch {
      let key = item.key();
      if key.is_empty() || self.seen.contains(&key) {
        continue;
      }
      self.seen.insert(key);
      self.items.push_back(item);
      added += 1;
    }
    Merge { added, dropped: self.trim() }
  }

  /// Replace the entry with the same key in place, or append and trim.
  pub fn upsert(&mut self, item: T) -> Merge {
    let key = item.key();
    if key.is_empty() {
      return Merge::default();
    }
    if self.seen.contains(&key)
      && let Some(slot) = self.items.iter_mut().find(|existing| existing.key() == key)
    {
      *slot = item;
      return Merge { added: 1, dropped: 0 };
    }
    self.seen.insert(key);
    self.items.push_back(item);
    Merge { added: 1, dropped: self.trim() }
  }

  fn trim(&mut self) -> usize {
    let mut dropped = 0;
    while self.items.len() > self.cap {
      if let Some(oldest) = self.items.pop_front() {
        self.seen.remove(&oldest.key());
        dropped += 1;
      }
    }
    dropped
  }
}
